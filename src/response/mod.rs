use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::store::{NewSurveyResponse, StorageFailure, StoreError};
use crate::types::{AnswerMap, CampaignStatus, SurveyResponse};
use crate::AppState;

pub mod collector;
pub mod funnel;
pub mod score;

mod test;

use collector::{missing_required, ResponseCollector};
use funnel::{promotion_stage, stage_after_submission, BusinessCard, FunnelStage};
use score::score_response;

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) enum ResponseError {
    #[schema(example = "This survey is not active or does not exist.")]
    NotFound(String),
    #[schema(example = "This promotional offer has expired")]
    Conflict(String),
}

fn survey_not_available() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ResponseError::NotFound(
            "This survey is not active or does not exist.".to_string(),
        )),
    )
        .into_response()
}

/// Unanswered required questions, reported the way the paged form recovers:
/// jump back to the first invalid question.
#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct ValidationFailure {
    #[schema(example = "Please answer every required question.")]
    pub message: String,
    pub missing_question_ids: Vec<Uuid>,
    pub first_invalid_index: usize,
}

#[utoipa::path(
    get,
    path = "/s/{campaign_id}",
    responses(
        (status = 200, description = "The survey in its collecting stage", body = FunnelStage),
        (status = 404, description = "Campaign missing, inactive, or without a survey", body = ResponseError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("campaign_id" = Uuid, Path, description = "Campaign id from the share link")
    )
)]
pub(super) async fn get_public_survey(
    Path(campaign_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Response, StoreError> {
    let Some(campaign) = state.store.campaign(campaign_id).await? else {
        return Ok(survey_not_available());
    };
    if campaign.status != CampaignStatus::Active {
        return Ok(survey_not_available());
    }

    let Some(profile) = state.store.profile(campaign.profile_id).await? else {
        return Ok(survey_not_available());
    };

    let Some(survey) = state.store.survey_by_campaign(campaign_id).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(ResponseError::NotFound(
                "Survey not found. It may have been removed.".to_string(),
            )),
        )
            .into_response());
    };

    let questions = state.store.questions_by_survey(survey.id).await?;
    let has_promotion = !state
        .store
        .promotions_by_campaign(campaign_id)
        .await?
        .is_empty();

    Ok(Json(FunnelStage::Collecting {
        survey,
        questions,
        business: BusinessCard::from_profile(&profile),
        max_review_score: campaign.max_review_score,
        has_promotion,
    })
    .into_response())
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct SubmitAnswersPayload {
    /// Question id → answer value; shape depends on the question type.
    #[schema(value_type = Object)]
    pub answers: AnswerMap,
}

#[derive(Serialize, ToSchema)]
pub(super) struct SubmitResult {
    pub response_id: Uuid,
    /// Mean of the rating answers; null when the survey has none.
    pub score: Option<f64>,
    pub next: FunnelStage,
}

#[utoipa::path(
    post,
    path = "/s/{campaign_id}/responses",
    request_body = SubmitAnswersPayload,
    responses(
        (status = 201, description = "Response stored; the next funnel stage follows", body = SubmitResult),
        (status = 404, description = "Campaign missing, inactive, or without a survey", body = ResponseError),
        (status = 409, description = "The survey has no questions to answer", body = ResponseError),
        (status = 422, description = "Required questions unanswered", body = ValidationFailure),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("campaign_id" = Uuid, Path, description = "Campaign id from the share link")
    )
)]
#[axum::debug_handler]
pub(super) async fn submit_response(
    Path(campaign_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAnswersPayload>,
) -> Result<Response, StoreError> {
    let Some(campaign) = state.store.campaign(campaign_id).await? else {
        return Ok(survey_not_available());
    };
    if campaign.status != CampaignStatus::Active {
        return Ok(survey_not_available());
    }

    let Some(profile) = state.store.profile(campaign.profile_id).await? else {
        return Ok(survey_not_available());
    };

    let Some(survey) = state.store.survey_by_campaign(campaign_id).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(ResponseError::NotFound(
                "Survey not found. It may have been removed.".to_string(),
            )),
        )
            .into_response());
    };

    let questions = state.store.questions_by_survey(survey.id).await?;
    if questions.is_empty() {
        return Ok((
            StatusCode::CONFLICT,
            Json(ResponseError::Conflict(
                "This survey doesn't have any questions yet.".to_string(),
            )),
        )
            .into_response());
    }

    // Per-step checks already happened on the client's pages; this run of
    // the same validation is the authoritative one.
    let mut collector = ResponseCollector::new(&questions);
    for (question_id, value) in payload.answers {
        collector.record_answer(question_id, value);
    }
    let answers = match collector.submit() {
        Ok(answers) => answers,
        Err(first_invalid_index) => {
            let missing = missing_required(&questions, collector.answers());
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationFailure {
                    message: "Please answer every required question.".to_string(),
                    missing_question_ids: missing,
                    first_invalid_index,
                }),
            )
                .into_response());
        }
    };

    let score = score_response(&questions, &answers);
    let prompted_review = funnel::should_prompt_review(score, campaign.review_threshold);

    let response = state
        .store
        .insert_response(NewSurveyResponse {
            survey_id: survey.id,
            answers,
            score: score.persisted(),
            prompted_review,
        })
        .await?;

    tracing::info!(
        response_id = %response.id,
        campaign_id = %campaign_id,
        score = ?response.score,
        prompted_review,
        "survey response recorded"
    );

    let latest_promotion = state
        .store
        .promotions_by_campaign(campaign_id)
        .await?
        .into_iter()
        .next();
    let next = stage_after_submission(
        response.id,
        prompted_review,
        &profile,
        &survey,
        latest_promotion,
        Utc::now(),
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitResult {
            response_id: response.id,
            score: response.score,
            next,
        }),
    )
        .into_response())
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct ReviewChoicePayload {
    /// True when the customer clicked through to the review page. The click
    /// is recorded as a submitted review without confirming one was posted.
    pub clicked: bool,
}

#[utoipa::path(
    post,
    path = "/response/{id}/review",
    request_body = ReviewChoicePayload,
    responses(
        (status = 200, description = "Choice recorded; the promotion stage follows", body = FunnelStage),
        (status = 404, description = "Response ID doesn't exist", body = ResponseError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Survey response id")
    )
)]
pub(super) async fn record_review_choice(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ReviewChoicePayload>,
) -> Result<Response, StoreError> {
    let Some(response) = state
        .store
        .set_submitted_review(id, payload.clicked)
        .await?
    else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(ResponseError::NotFound(format!(
                "Response ID {id} doesn't exist"
            ))),
        )
            .into_response());
    };

    let Some(survey) = state.store.survey(response.survey_id).await? else {
        return Ok(survey_not_available());
    };
    let latest_promotion = state
        .store
        .promotions_by_campaign(survey.campaign_id)
        .await?
        .into_iter()
        .next();

    Ok(Json(promotion_stage(
        response.id,
        latest_promotion,
        &survey,
        Utc::now(),
    ))
    .into_response())
}

/// Copying the code is the claim signal. An expired or missing offer is a
/// conflict and leaves `promotion_claimed` untouched.
#[utoipa::path(
    post,
    path = "/response/{id}/promotion",
    responses(
        (status = 200, description = "Promotion marked claimed on the response", body = SurveyResponse),
        (status = 404, description = "Response ID doesn't exist", body = ResponseError),
        (status = 409, description = "No claimable promotion", body = ResponseError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Survey response id")
    )
)]
pub(super) async fn claim_promotion(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Response, StoreError> {
    let Some(response) = state.store.response(id).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(ResponseError::NotFound(format!(
                "Response ID {id} doesn't exist"
            ))),
        )
            .into_response());
    };

    let Some(survey) = state.store.survey(response.survey_id).await? else {
        return Ok(survey_not_available());
    };
    let latest_promotion = state
        .store
        .promotions_by_campaign(survey.campaign_id)
        .await?
        .into_iter()
        .next();

    let Some(promotion) = latest_promotion else {
        return Ok((
            StatusCode::CONFLICT,
            Json(ResponseError::Conflict(
                "This campaign has no promotion to claim.".to_string(),
            )),
        )
            .into_response());
    };
    if crate::promotion::code::is_promotion_expired(promotion.expiry_date, Utc::now()) {
        return Ok((
            StatusCode::CONFLICT,
            Json(ResponseError::Conflict(
                "This promotional offer has expired.".to_string(),
            )),
        )
            .into_response());
    }

    match state.store.set_promotion_claimed(id).await? {
        Some(updated) => Ok(Json(updated).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ResponseError::NotFound(format!(
                "Response ID {id} doesn't exist"
            ))),
        )
            .into_response()),
    }
}
