use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::store::{NewPromotion, PromotionChanges, StorageFailure, StoreError};
use crate::types::Promotion;
use crate::AppState;

pub mod code;


use code::{format_promotion_code, generate_random_code, DEFAULT_CODE_LENGTH};

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) enum PromotionError {
    #[schema(example = "Promotion ID doesn't exist")]
    NotFound(String),
}

fn not_found(id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(PromotionError::NotFound(format!(
            "Promotion ID {id} doesn't exist"
        ))),
    )
        .into_response()
}

#[derive(Deserialize, IntoParams)]
pub(super) struct ListPromotionsParams {
    pub campaign_id: Uuid,
}

#[utoipa::path(
    get,
    path = "/promotions",
    params(ListPromotionsParams),
    responses(
        (status = 200, description = "List the campaign's promotions, newest first", body = [Promotion]),
        (status = 500, description = "Storage failure", body = StorageFailure)
    )
)]
pub(super) async fn list_promotions(
    Query(params): Query<ListPromotionsParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Promotion>>, StoreError> {
    let promotions = state
        .store
        .promotions_by_campaign(params.campaign_id)
        .await?;
    Ok(Json(promotions))
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct CreatePromotionPayload {
    pub campaign_id: Uuid,
    #[schema(example = "10% off your next visit")]
    pub name: String,
    pub description: Option<String>,
    /// Generated when omitted.
    #[schema(example = "BK81-DNFJ")]
    pub code: Option<String>,
    pub is_unique: Option<bool>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
}

#[utoipa::path(
    post,
    path = "/promotion",
    request_body = CreatePromotionPayload,
    responses(
        (status = 201, description = "Promotion created successfully", body = Promotion),
        (status = 404, description = "Campaign ID doesn't exist", body = PromotionError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    )
)]
pub(super) async fn create_promotion(
    State(state): State<AppState>,
    Json(payload): Json<CreatePromotionPayload>,
) -> Result<Response, StoreError> {
    if state.store.campaign(payload.campaign_id).await?.is_none() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(PromotionError::NotFound(format!(
                "Campaign ID {} doesn't exist",
                payload.campaign_id
            ))),
        )
            .into_response());
    }

    let code = match payload.code {
        Some(code) => format_promotion_code(&code),
        None => generate_random_code(DEFAULT_CODE_LENGTH),
    };

    let promotion = state
        .store
        .insert_promotion(NewPromotion {
            campaign_id: payload.campaign_id,
            name: payload.name,
            description: payload.description,
            code,
            is_unique: payload.is_unique.unwrap_or(false),
            expiry_date: payload.expiry_date,
            max_uses: payload.max_uses,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(promotion)).into_response())
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct UpdatePromotionPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub is_unique: Option<bool>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
}

#[utoipa::path(
    patch,
    path = "/promotion/{id}",
    request_body = UpdatePromotionPayload,
    responses(
        (status = 200, description = "Promotion updated successfully", body = Promotion),
        (status = 404, description = "Promotion ID doesn't exist", body = PromotionError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Promotion id")
    )
)]
pub(super) async fn update_promotion(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePromotionPayload>,
) -> Result<Response, StoreError> {
    let changes = PromotionChanges {
        name: payload.name,
        description: payload.description,
        code: payload.code.as_deref().map(format_promotion_code),
        is_unique: payload.is_unique,
        expiry_date: payload.expiry_date,
        max_uses: payload.max_uses,
    };

    match state.store.update_promotion(id, changes).await? {
        Some(promotion) => Ok(Json(promotion).into_response()),
        None => Ok(not_found(id)),
    }
}

#[utoipa::path(
    delete,
    path = "/promotion/{id}",
    responses(
        (status = 200, description = "Delete promotion successfully"),
        (status = 404, description = "Promotion ID doesn't exist", body = PromotionError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Promotion id")
    )
)]
pub(super) async fn delete_promotion(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Response, StoreError> {
    if state.store.delete_promotion(id).await? {
        Ok(StatusCode::OK.into_response())
    } else {
        Ok(not_found(id))
    }
}
