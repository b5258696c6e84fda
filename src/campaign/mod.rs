use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::store::{CampaignChanges, NewCampaign, StorageFailure, StoreError};
use crate::types::{Campaign, CampaignStatus};
use crate::AppState;


#[derive(Serialize, Deserialize, ToSchema)]
pub(super) enum CampaignError {
    #[schema(example = "Campaign ID doesn't exist")]
    NotFound(String),
}

fn not_found(id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(CampaignError::NotFound(format!(
            "Campaign ID {id} doesn't exist"
        ))),
    )
        .into_response()
}

#[derive(Deserialize, IntoParams)]
pub(super) struct ListCampaignsParams {
    /// Owning business profile.
    pub profile_id: Uuid,
}

#[utoipa::path(
    get,
    path = "/campaigns",
    params(ListCampaignsParams),
    responses(
        (status = 200, description = "List the profile's campaigns, newest first", body = [Campaign]),
        (status = 500, description = "Storage failure", body = StorageFailure)
    )
)]
pub(super) async fn list_campaigns(
    Query(params): Query<ListCampaignsParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Campaign>>, StoreError> {
    let campaigns = state.store.campaigns_by_profile(params.profile_id).await?;
    Ok(Json(campaigns))
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct CreateCampaignPayload {
    pub profile_id: Uuid,
    #[schema(example = "Spring customer check-in")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 4.0)]
    pub review_threshold: Option<f64>,
    #[schema(example = 5.0)]
    pub max_review_score: Option<f64>,
}

#[utoipa::path(
    post,
    path = "/campaign",
    request_body = CreateCampaignPayload,
    responses(
        (status = 201, description = "Campaign created in draft status", body = Campaign),
        (status = 404, description = "Owning profile doesn't exist", body = CampaignError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    )
)]
#[axum::debug_handler]
pub(super) async fn create_campaign(
    State(state): State<AppState>,
    Json(payload): Json<CreateCampaignPayload>,
) -> Result<Response, StoreError> {
    if state.store.profile(payload.profile_id).await?.is_none() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(CampaignError::NotFound(format!(
                "Profile ID {} doesn't exist",
                payload.profile_id
            ))),
        )
            .into_response());
    }

    // The id is minted here so the public share link can embed it.
    let id = Uuid::new_v4();
    let share_link = format!(
        "{}/s/{id}",
        state.config.public_base_url.trim_end_matches('/')
    );
    let qr_code_url = format!(
        "https://api.qrserver.com/v1/create-qr-code/?size=240x240&data={}",
        urlencoding::encode(&share_link)
    );

    let campaign = state
        .store
        .insert_campaign(NewCampaign {
            id,
            profile_id: payload.profile_id,
            name: payload.name,
            description: payload.description,
            review_threshold: payload.review_threshold.unwrap_or(4.0),
            max_review_score: payload.max_review_score.unwrap_or(5.0),
            share_link,
            qr_code_url,
        })
        .await?;

    tracing::info!(campaign_id = %campaign.id, "campaign created");
    Ok((StatusCode::CREATED, Json(campaign)).into_response())
}

#[utoipa::path(
    get,
    path = "/campaign/{id}",
    responses(
        (status = 200, description = "Get information about the campaign successfully", body = Campaign),
        (status = 404, description = "Campaign ID doesn't exist", body = CampaignError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Campaign id")
    )
)]
pub(super) async fn get_campaign(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Response, StoreError> {
    match state.store.campaign(id).await? {
        Some(campaign) => Ok(Json(campaign).into_response()),
        None => Ok(not_found(id)),
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct UpdateCampaignPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Status only ever changes through this explicit call.
    pub status: Option<CampaignStatus>,
    pub review_threshold: Option<f64>,
    pub max_review_score: Option<f64>,
}

#[utoipa::path(
    patch,
    path = "/campaign/{id}",
    request_body = UpdateCampaignPayload,
    responses(
        (status = 200, description = "Campaign updated successfully", body = Campaign),
        (status = 404, description = "Campaign ID doesn't exist", body = CampaignError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Campaign id")
    )
)]
pub(super) async fn update_campaign(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateCampaignPayload>,
) -> Result<Response, StoreError> {
    let changes = CampaignChanges {
        name: payload.name,
        description: payload.description,
        status: payload.status,
        review_threshold: payload.review_threshold,
        max_review_score: payload.max_review_score,
    };

    match state.store.update_campaign(id, changes).await? {
        Some(campaign) => Ok(Json(campaign).into_response()),
        None => Ok(not_found(id)),
    }
}

#[utoipa::path(
    delete,
    path = "/campaign/{id}",
    responses(
        (status = 200, description = "Delete campaign successfully"),
        (status = 404, description = "Campaign ID doesn't exist", body = CampaignError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Campaign id")
    )
)]
pub(super) async fn delete_campaign(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Response, StoreError> {
    if state.store.delete_campaign(id).await? {
        Ok(StatusCode::OK.into_response())
    } else {
        Ok(not_found(id))
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct CampaignStats {
    pub response_count: usize,
    /// Mean of the scored responses; null until one exists.
    pub average_score: Option<f64>,
    pub reviews_prompted: usize,
    pub reviews_submitted: usize,
    pub promotions_claimed: usize,
}

#[utoipa::path(
    get,
    path = "/campaign/{id}/stats",
    responses(
        (status = 200, description = "Aggregate response figures for the campaign", body = CampaignStats),
        (status = 404, description = "Campaign ID doesn't exist", body = CampaignError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Campaign id")
    )
)]
pub(super) async fn campaign_stats(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Response, StoreError> {
    if state.store.campaign(id).await?.is_none() {
        return Ok(not_found(id));
    }

    let responses = match state.store.survey_by_campaign(id).await? {
        Some(survey) => state.store.responses_by_survey(survey.id).await?,
        None => vec![],
    };

    let scores: Vec<f64> = responses.iter().filter_map(|r| r.score).collect();
    let average_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    Ok(Json(CampaignStats {
        response_count: responses.len(),
        average_score,
        reviews_prompted: responses.iter().filter(|r| r.prompted_review).count(),
        reviews_submitted: responses.iter().filter(|r| r.submitted_review).count(),
        promotions_claimed: responses.iter().filter(|r| r.promotion_claimed).count(),
    })
    .into_response())
}
