use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use axum::{routing, Router, Server};
use dotenv::dotenv;
use hyper::Error;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::response::funnel::{BusinessCard, FunnelStage, PromotionOffer};
use crate::store::{PgStore, StorageFailure, Store};
use crate::types::{
    Campaign, CampaignStatus, Profile, Promotion, Question, QuestionType, Survey, SurveyResponse,
};

use campaign::{
    CampaignError, CampaignStats, CreateCampaignPayload, UpdateCampaignPayload,
};
use profile::{CreateProfilePayload, ProfileError, UpdateProfilePayload};
use promotion::{CreatePromotionPayload, PromotionError, UpdatePromotionPayload};
use response::{
    ResponseError, ReviewChoicePayload, SubmitAnswersPayload, SubmitResult, ValidationFailure,
};
use survey::{
    AddQuestionPayload, ReorderQuestionsPayload, SurveyError, SurveyWithQuestions,
    UpdateQuestionPayload, UpsertSurveyPayload,
};

mod campaign;
mod profile;
mod promotion;
mod response;
mod survey;

mod store;
mod types;

/// Everything the handlers need, built once at startup and injected through
/// router state; no module-level clients.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

pub struct AppConfig {
    /// Base for customer-facing share links, e.g. `https://app.example.com`.
    pub public_base_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    #[derive(OpenApi)]
    #[openapi(
        paths(
            profile::create_profile,
            profile::get_profile,
            profile::update_profile,
            campaign::list_campaigns,
            campaign::create_campaign,
            campaign::get_campaign,
            campaign::update_campaign,
            campaign::delete_campaign,
            campaign::campaign_stats,
            survey::get_survey,
            survey::upsert_survey,
            survey::add_question,
            survey::update_question,
            survey::delete_question,
            survey::reorder_questions,
            promotion::list_promotions,
            promotion::create_promotion,
            promotion::update_promotion,
            promotion::delete_promotion,
            response::get_public_survey,
            response::submit_response,
            response::record_review_choice,
            response::claim_promotion,
        ),
        components(
            schemas(Profile, Campaign, CampaignStatus, Survey, Question, QuestionType, Promotion, SurveyResponse),
            schemas(StorageFailure),
            schemas(ProfileError, CreateProfilePayload, UpdateProfilePayload),
            schemas(CampaignError, CreateCampaignPayload, UpdateCampaignPayload, CampaignStats),
            schemas(SurveyError, SurveyWithQuestions, UpsertSurveyPayload, AddQuestionPayload, UpdateQuestionPayload, ReorderQuestionsPayload),
            schemas(PromotionError, CreatePromotionPayload, UpdatePromotionPayload),
            schemas(ResponseError, ValidationFailure, SubmitAnswersPayload, SubmitResult, ReviewChoicePayload),
            schemas(FunnelStage, PromotionOffer, BusinessCard),
        ),
        tags(
            (name = "profile", description = "Business profile API"),
            (name = "campaign", description = "Campaign management API"),
            (name = "survey", description = "Survey and question editing API"),
            (name = "promotion", description = "Promotion management API"),
            (name = "response", description = "Public survey funnel API")
        )
    )]
    struct ApiDoc;

    let config = Arc::new(AppConfig {
        public_base_url: std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string()),
    });
    let store = create_store().await;

    let app = create_app(AppState { store, config })
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
        .merge(RapiDoc::new("/api-docs/openapi.json").path("/rapidoc"));

    let address: SocketAddr = std::env::var("BIND_ADDR")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)));
    tracing::info!("listening on {address}; API playgrounds at /swagger-ui, /redoc and /rapidoc");

    Server::bind(&address).serve(app.into_make_service()).await
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/profile",
            routing::post(profile::create_profile),
        )
        .route(
            "/profile/:id",
            routing::get(profile::get_profile).patch(profile::update_profile),
        )
        .route("/campaigns", routing::get(campaign::list_campaigns))
        .route("/campaign", routing::post(campaign::create_campaign))
        .route(
            "/campaign/:id",
            routing::get(campaign::get_campaign)
                .patch(campaign::update_campaign)
                .delete(campaign::delete_campaign),
        )
        .route("/campaign/:id/stats", routing::get(campaign::campaign_stats))
        .route(
            "/campaign/:id/survey",
            routing::get(survey::get_survey).put(survey::upsert_survey),
        )
        .route("/survey/:id/questions", routing::post(survey::add_question))
        .route(
            "/survey/:id/questions/order",
            routing::put(survey::reorder_questions),
        )
        .route(
            "/question/:id",
            routing::patch(survey::update_question).delete(survey::delete_question),
        )
        .route("/promotions", routing::get(promotion::list_promotions))
        .route("/promotion", routing::post(promotion::create_promotion))
        .route(
            "/promotion/:id",
            routing::patch(promotion::update_promotion).delete(promotion::delete_promotion),
        )
        .route("/s/:campaign_id", routing::get(response::get_public_survey))
        .route(
            "/s/:campaign_id/responses",
            routing::post(response::submit_response),
        )
        .route(
            "/response/:id/review",
            routing::post(response::record_review_choice),
        )
        .route(
            "/response/:id/promotion",
            routing::post(response::claim_promotion),
        )
        .with_state(state)
}

pub async fn create_store() -> Arc<dyn Store> {
    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL missing in .env");
    let db_pool = sqlx::postgres::PgPool::connect(&db_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to migrate DB");

    Arc::new(PgStore::new(db_pool))
}
