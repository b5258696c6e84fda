use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::store::{
    NewQuestion, NewSurvey, QuestionChanges, StorageFailure, StoreError, SurveyChanges,
};
use crate::types::{Question, QuestionOptions, QuestionType, Survey};
use crate::AppState;


const DEFAULT_SURVEY_TITLE: &str = "Customer Satisfaction Survey";
const DEFAULT_QUESTION_TEXT: &str = "New Question";

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) enum SurveyError {
    #[schema(example = "Campaign ID doesn't exist")]
    NotFound(String),
    #[schema(example = "Question list doesn't match the survey")]
    Conflict(String),
}

#[derive(Serialize, ToSchema)]
pub(super) struct SurveyWithQuestions {
    pub survey: Survey,
    pub questions: Vec<Question>,
}

#[utoipa::path(
    get,
    path = "/campaign/{id}/survey",
    responses(
        (status = 200, description = "The campaign's survey with its questions in order", body = SurveyWithQuestions),
        (status = 404, description = "Campaign or survey doesn't exist", body = SurveyError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Campaign id")
    )
)]
pub(super) async fn get_survey(
    Path(campaign_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Response, StoreError> {
    let Some(survey) = state.store.survey_by_campaign(campaign_id).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(SurveyError::NotFound(format!(
                "Campaign {campaign_id} has no survey yet"
            ))),
        )
            .into_response());
    };

    let questions = state.store.questions_by_survey(survey.id).await?;
    Ok(Json(SurveyWithQuestions { survey, questions }).into_response())
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct UpsertSurveyPayload {
    #[schema(example = "How was your visit?")]
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(example = "Thanks for helping us improve!")]
    pub thank_you_message: Option<String>,
}

/// The survey row is created the first time the owner edits it; campaigns
/// start without one.
#[utoipa::path(
    put,
    path = "/campaign/{id}/survey",
    request_body = UpsertSurveyPayload,
    responses(
        (status = 200, description = "Survey created or updated", body = Survey),
        (status = 404, description = "Campaign ID doesn't exist", body = SurveyError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Campaign id")
    )
)]
pub(super) async fn upsert_survey(
    Path(campaign_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpsertSurveyPayload>,
) -> Result<Response, StoreError> {
    if state.store.campaign(campaign_id).await?.is_none() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(SurveyError::NotFound(format!(
                "Campaign ID {campaign_id} doesn't exist"
            ))),
        )
            .into_response());
    }

    let survey = match state.store.survey_by_campaign(campaign_id).await? {
        Some(existing) => {
            let changes = SurveyChanges {
                title: payload.title,
                description: payload.description,
                thank_you_message: payload.thank_you_message,
            };
            state
                .store
                .update_survey(existing.id, changes)
                .await?
                .unwrap_or(existing)
        }
        None => {
            state
                .store
                .insert_survey(NewSurvey {
                    campaign_id,
                    title: payload
                        .title
                        .unwrap_or_else(|| DEFAULT_SURVEY_TITLE.to_string()),
                    description: payload.description,
                    thank_you_message: payload.thank_you_message,
                })
                .await?
        }
    };

    Ok(Json(survey).into_response())
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct AddQuestionPayload {
    #[schema(example = "How satisfied were you with the service?")]
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    #[schema(value_type = Option<Object>)]
    pub options: Option<QuestionOptions>,
    pub required: Option<bool>,
}

/// New questions default to a required 1-5 rating appended at the end, the
/// same starting point the survey editor offers.
#[utoipa::path(
    post,
    path = "/survey/{id}/questions",
    request_body = AddQuestionPayload,
    responses(
        (status = 201, description = "Question appended to the survey", body = Question),
        (status = 404, description = "Survey ID doesn't exist", body = SurveyError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Survey id")
    )
)]
#[axum::debug_handler]
pub(super) async fn add_question(
    Path(survey_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<AddQuestionPayload>,
) -> Result<Response, StoreError> {
    if state.store.survey(survey_id).await?.is_none() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(SurveyError::NotFound(format!(
                "Survey ID {survey_id} doesn't exist"
            ))),
        )
            .into_response());
    }

    let next_index = state.store.questions_by_survey(survey_id).await?.len() as i32;
    let question_type = payload.question_type.unwrap_or(QuestionType::Rating);
    let options = payload.options.or(match question_type {
        QuestionType::Rating => Some(QuestionOptions::Rating {
            min: 1,
            max: 5,
            step: 1,
        }),
        _ => None,
    });

    let question = state
        .store
        .insert_question(NewQuestion {
            survey_id,
            text: payload
                .text
                .unwrap_or_else(|| DEFAULT_QUESTION_TEXT.to_string()),
            question_type,
            options,
            required: payload.required.unwrap_or(true),
            order_index: next_index,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(question)).into_response())
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct UpdateQuestionPayload {
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    #[schema(value_type = Option<Object>)]
    pub options: Option<QuestionOptions>,
    pub required: Option<bool>,
}

#[utoipa::path(
    patch,
    path = "/question/{id}",
    request_body = UpdateQuestionPayload,
    responses(
        (status = 200, description = "Question updated successfully", body = Question),
        (status = 404, description = "Question ID doesn't exist", body = SurveyError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Question id")
    )
)]
pub(super) async fn update_question(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateQuestionPayload>,
) -> Result<Response, StoreError> {
    let changes = QuestionChanges {
        text: payload.text,
        question_type: payload.question_type,
        options: payload.options,
        required: payload.required,
    };

    match state.store.update_question(id, changes).await? {
        Some(question) => Ok(Json(question).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(SurveyError::NotFound(format!(
                "Question ID {id} doesn't exist"
            ))),
        )
            .into_response()),
    }
}

/// Deleting renumbers the surviving questions so order stays contiguous
/// from 0.
#[utoipa::path(
    delete,
    path = "/question/{id}",
    responses(
        (status = 200, description = "Question deleted and survivors renumbered"),
        (status = 404, description = "Question ID doesn't exist", body = SurveyError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Question id")
    )
)]
pub(super) async fn delete_question(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Response, StoreError> {
    let Some(deleted) = state.store.delete_question(id).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(SurveyError::NotFound(format!(
                "Question ID {id} doesn't exist"
            ))),
        )
            .into_response());
    };

    let remaining: Vec<Uuid> = state
        .store
        .questions_by_survey(deleted.survey_id)
        .await?
        .iter()
        .map(|question| question.id)
        .collect();
    state
        .store
        .set_question_order(deleted.survey_id, &remaining)
        .await?;

    Ok(StatusCode::OK.into_response())
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct ReorderQuestionsPayload {
    /// Every question of the survey, in the desired display order.
    pub question_ids: Vec<Uuid>,
}

#[utoipa::path(
    put,
    path = "/survey/{id}/questions/order",
    request_body = ReorderQuestionsPayload,
    responses(
        (status = 200, description = "Questions renumbered in the given order", body = [Question]),
        (status = 404, description = "Survey ID doesn't exist", body = SurveyError),
        (status = 409, description = "The id list doesn't name exactly the survey's questions", body = SurveyError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Survey id")
    )
)]
pub(super) async fn reorder_questions(
    Path(survey_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ReorderQuestionsPayload>,
) -> Result<Response, StoreError> {
    if state.store.survey(survey_id).await?.is_none() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(SurveyError::NotFound(format!(
                "Survey ID {survey_id} doesn't exist"
            ))),
        )
            .into_response());
    }

    let questions = state.store.questions_by_survey(survey_id).await?;
    let mut current_ids: Vec<Uuid> = questions.iter().map(|question| question.id).collect();
    let mut requested_ids = payload.question_ids.clone();
    current_ids.sort();
    requested_ids.sort();
    if current_ids != requested_ids {
        return Ok((
            StatusCode::CONFLICT,
            Json(SurveyError::Conflict(
                "The id list doesn't name exactly the survey's questions".to_string(),
            )),
        )
            .into_response());
    }

    state
        .store
        .set_question_order(survey_id, &payload.question_ids)
        .await?;

    let reordered = state.store.questions_by_survey(survey_id).await?;
    Ok(Json(reordered).into_response())
}
