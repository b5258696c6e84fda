use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::store::{NewProfile, ProfileChanges, StorageFailure, StoreError};
use crate::types::Profile;
use crate::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) enum ProfileError {
    #[schema(example = "Profile already exists")]
    Conflict(String),
    #[schema(example = "id = 7b0a...")]
    NotFound(String),
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct CreateProfilePayload {
    #[schema(example = "owner@acme-cafe.example")]
    pub email: String,
    #[schema(example = "Acme Cafe")]
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
    pub phone: Option<String>,
    #[schema(example = "https://g.page/r/acme-cafe/review")]
    pub google_review_link: Option<String>,
}

#[utoipa::path(
    post,
    path = "/profile",
    request_body = CreateProfilePayload,
    responses(
        (status = 201, description = "Profile created successfully", body = Profile),
        (status = 409, description = "A profile with this email already exists", body = ProfileError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    )
)]
pub(super) async fn create_profile(
    State(state): State<AppState>,
    Json(payload): Json<CreateProfilePayload>,
) -> Result<Response, StoreError> {
    let new = NewProfile {
        email: payload.email.clone(),
        company_name: payload.company_name,
        logo_url: payload.logo_url,
        phone: payload.phone,
        google_review_link: payload.google_review_link,
    };

    match state.store.insert_profile(new).await {
        Ok(profile) => Ok((StatusCode::CREATED, Json(profile)).into_response()),
        Err(StoreError::Conflict(_)) => Ok((
            StatusCode::CONFLICT,
            Json(ProfileError::Conflict(format!(
                "profile already exists: {}",
                payload.email
            ))),
        )
            .into_response()),
        Err(other) => Err(other),
    }
}

#[utoipa::path(
    get,
    path = "/profile/{id}",
    responses(
        (status = 200, description = "Get the business profile successfully", body = Profile),
        (status = 404, description = "Profile not found", body = ProfileError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Profile id")
    )
)]
pub(super) async fn get_profile(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Response, StoreError> {
    match state.store.profile(id).await? {
        Some(profile) => Ok(Json(profile).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ProfileError::NotFound(format!("id = {id}"))),
        )
            .into_response()),
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub(super) struct UpdateProfilePayload {
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
    pub phone: Option<String>,
    #[schema(example = "https://g.page/r/acme-cafe/review")]
    pub google_review_link: Option<String>,
}

#[utoipa::path(
    patch,
    path = "/profile/{id}",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Profile updated successfully", body = Profile),
        (status = 404, description = "Profile not found", body = ProfileError),
        (status = 500, description = "Storage failure", body = StorageFailure)
    ),
    params(
        ("id" = Uuid, Path, description = "Profile id")
    )
)]
pub(super) async fn update_profile(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Response, StoreError> {
    let changes = ProfileChanges {
        company_name: payload.company_name,
        logo_url: payload.logo_url,
        phone: payload.phone,
        google_review_link: payload.google_review_link,
    };

    match state.store.update_profile(id, changes).await? {
        Some(profile) => Ok(Json(profile).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ProfileError::NotFound(format!("id = {id}"))),
        )
            .into_response()),
    }
}
