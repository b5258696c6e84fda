use async_trait::async_trait;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use sqlx::pool::Pool;
use sqlx::postgres::Postgres;
use sqlx::types::Json as Jsonb;
use sqlx::FromRow;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::types::{
    AnswerMap, Campaign, CampaignStatus, Profile, Promotion, Question, QuestionOptions,
    QuestionType, Survey, SurveyResponse,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct StorageFailure {
    #[schema(example = "A temporary storage problem occurred. Please try again.")]
    pub error: String,
}

/// Storage failures are never surfaced verbatim: log the cause, answer with a
/// generic retryable message. Conflicts keep their text since they describe
/// the caller's own request.
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        match self {
            StoreError::Conflict(reason) => (
                StatusCode::CONFLICT,
                Json(StorageFailure { error: reason }),
            )
                .into_response(),
            StoreError::Database(err) => {
                tracing::error!("storage call failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(StorageFailure {
                        error: "A temporary storage problem occurred. Please try again."
                            .to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

pub struct NewProfile {
    pub email: String,
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
    pub phone: Option<String>,
    pub google_review_link: Option<String>,
}

#[derive(Default)]
pub struct ProfileChanges {
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
    pub phone: Option<String>,
    pub google_review_link: Option<String>,
}

/// The id is chosen by the caller so the share link can embed it before the
/// row exists.
pub struct NewCampaign {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub review_threshold: f64,
    pub max_review_score: f64,
    pub share_link: String,
    pub qr_code_url: String,
}

#[derive(Default)]
pub struct CampaignChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<CampaignStatus>,
    pub review_threshold: Option<f64>,
    pub max_review_score: Option<f64>,
}

pub struct NewSurvey {
    pub campaign_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thank_you_message: Option<String>,
}

#[derive(Default)]
pub struct SurveyChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thank_you_message: Option<String>,
}

pub struct NewQuestion {
    pub survey_id: Uuid,
    pub text: String,
    pub question_type: QuestionType,
    pub options: Option<QuestionOptions>,
    pub required: bool,
    pub order_index: i32,
}

#[derive(Default)]
pub struct QuestionChanges {
    pub text: Option<String>,
    pub question_type: Option<QuestionType>,
    pub options: Option<QuestionOptions>,
    pub required: Option<bool>,
}

pub struct NewPromotion {
    pub campaign_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub code: String,
    pub is_unique: bool,
    pub expiry_date: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
}

#[derive(Default)]
pub struct PromotionChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub is_unique: Option<bool>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
}

pub struct NewSurveyResponse {
    pub survey_id: Uuid,
    pub answers: AnswerMap,
    pub score: Option<f64>,
    pub prompted_review: bool,
}

/// The storage boundary: single-row fetch/insert/update/delete per entity,
/// plus the foreign-key listings the handlers need. Constructed once and
/// passed into the router; handlers never reach for a global client.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_profile(&self, new: NewProfile) -> Result<Profile, StoreError>;
    async fn profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;
    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<Profile>, StoreError>;

    async fn insert_campaign(&self, new: NewCampaign) -> Result<Campaign, StoreError>;
    async fn campaign(&self, id: Uuid) -> Result<Option<Campaign>, StoreError>;
    /// Newest first.
    async fn campaigns_by_profile(&self, profile_id: Uuid) -> Result<Vec<Campaign>, StoreError>;
    async fn update_campaign(
        &self,
        id: Uuid,
        changes: CampaignChanges,
    ) -> Result<Option<Campaign>, StoreError>;
    async fn delete_campaign(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn insert_survey(&self, new: NewSurvey) -> Result<Survey, StoreError>;
    async fn survey(&self, id: Uuid) -> Result<Option<Survey>, StoreError>;
    async fn survey_by_campaign(&self, campaign_id: Uuid) -> Result<Option<Survey>, StoreError>;
    async fn update_survey(
        &self,
        id: Uuid,
        changes: SurveyChanges,
    ) -> Result<Option<Survey>, StoreError>;

    async fn insert_question(&self, new: NewQuestion) -> Result<Question, StoreError>;
    /// Ordered by `order_index`.
    async fn questions_by_survey(&self, survey_id: Uuid) -> Result<Vec<Question>, StoreError>;
    async fn update_question(
        &self,
        id: Uuid,
        changes: QuestionChanges,
    ) -> Result<Option<Question>, StoreError>;
    async fn delete_question(&self, id: Uuid) -> Result<Option<Question>, StoreError>;
    /// Rewrites `order_index` to the position of each id in `ordered_ids`.
    async fn set_question_order(
        &self,
        survey_id: Uuid,
        ordered_ids: &[Uuid],
    ) -> Result<(), StoreError>;

    async fn insert_promotion(&self, new: NewPromotion) -> Result<Promotion, StoreError>;
    async fn promotion(&self, id: Uuid) -> Result<Option<Promotion>, StoreError>;
    /// Newest first; the funnel only ever shows the most recent one.
    async fn promotions_by_campaign(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<Promotion>, StoreError>;
    async fn update_promotion(
        &self,
        id: Uuid,
        changes: PromotionChanges,
    ) -> Result<Option<Promotion>, StoreError>;
    async fn delete_promotion(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn insert_response(
        &self,
        new: NewSurveyResponse,
    ) -> Result<SurveyResponse, StoreError>;
    async fn response(&self, id: Uuid) -> Result<Option<SurveyResponse>, StoreError>;
    async fn responses_by_survey(
        &self,
        survey_id: Uuid,
    ) -> Result<Vec<SurveyResponse>, StoreError>;
    async fn set_submitted_review(
        &self,
        id: Uuid,
        submitted: bool,
    ) -> Result<Option<SurveyResponse>, StoreError>;
    async fn set_promotion_claimed(&self, id: Uuid)
        -> Result<Option<SurveyResponse>, StoreError>;
}

pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    survey_id: Uuid,
    text: String,
    #[sqlx(rename = "type")]
    question_type: QuestionType,
    options: Option<Jsonb<QuestionOptions>>,
    required: bool,
    order_index: i32,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            survey_id: row.survey_id,
            text: row.text,
            question_type: row.question_type,
            options: row.options.map(|options| options.0),
            required: row.required,
            order_index: row.order_index,
        }
    }
}

#[derive(FromRow)]
struct SurveyResponseRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    survey_id: Uuid,
    answers: Jsonb<AnswerMap>,
    score: Option<f64>,
    prompted_review: bool,
    submitted_review: bool,
    promotion_claimed: bool,
}

impl From<SurveyResponseRow> for SurveyResponse {
    fn from(row: SurveyResponseRow) -> Self {
        SurveyResponse {
            id: row.id,
            created_at: row.created_at,
            survey_id: row.survey_id,
            answers: row.answers.0,
            score: row.score,
            prompted_review: row.prompted_review,
            submitted_review: row.submitted_review,
            promotion_claimed: row.promotion_claimed,
        }
    }
}

fn insert_error(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("{what} already exists"))
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_profile(&self, new: NewProfile) -> Result<Profile, StoreError> {
        let q = "--sql
            insert into profiles (id, email, company_name, logo_url, phone, google_review_link)
            values ($1, $2, $3, $4, $5, $6)
            returning *;
        ";

        sqlx::query_as::<_, Profile>(q)
            .bind(Uuid::new_v4())
            .bind(&new.email)
            .bind(&new.company_name)
            .bind(&new.logo_url)
            .bind(&new.phone)
            .bind(&new.google_review_link)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| insert_error(err, "profile"))
    }

    async fn profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        let q = "--sql
            select *
            from profiles
            where id = $1;
        ";

        Ok(sqlx::query_as::<_, Profile>(q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<Profile>, StoreError> {
        let q = "--sql
            update profiles
            set company_name = coalesce($2, company_name),
                logo_url = coalesce($3, logo_url),
                phone = coalesce($4, phone),
                google_review_link = coalesce($5, google_review_link),
                updated_at = now()
            where id = $1
            returning *;
        ";

        Ok(sqlx::query_as::<_, Profile>(q)
            .bind(id)
            .bind(&changes.company_name)
            .bind(&changes.logo_url)
            .bind(&changes.phone)
            .bind(&changes.google_review_link)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_campaign(&self, new: NewCampaign) -> Result<Campaign, StoreError> {
        let q = "--sql
            insert into campaigns
                (id, profile_id, name, description, status, review_threshold, max_review_score, share_link, qr_code_url)
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            returning *;
        ";

        Ok(sqlx::query_as::<_, Campaign>(q)
            .bind(new.id)
            .bind(new.profile_id)
            .bind(&new.name)
            .bind(&new.description)
            .bind(CampaignStatus::Draft)
            .bind(new.review_threshold)
            .bind(new.max_review_score)
            .bind(&new.share_link)
            .bind(&new.qr_code_url)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn campaign(&self, id: Uuid) -> Result<Option<Campaign>, StoreError> {
        let q = "--sql
            select *
            from campaigns
            where id = $1;
        ";

        Ok(sqlx::query_as::<_, Campaign>(q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn campaigns_by_profile(&self, profile_id: Uuid) -> Result<Vec<Campaign>, StoreError> {
        let q = "--sql
            select *
            from campaigns
            where profile_id = $1
            order by created_at desc;
        ";

        Ok(sqlx::query_as::<_, Campaign>(q)
            .bind(profile_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_campaign(
        &self,
        id: Uuid,
        changes: CampaignChanges,
    ) -> Result<Option<Campaign>, StoreError> {
        let q = "--sql
            update campaigns
            set name = coalesce($2, name),
                description = coalesce($3, description),
                status = coalesce($4, status),
                review_threshold = coalesce($5, review_threshold),
                max_review_score = coalesce($6, max_review_score),
                updated_at = now()
            where id = $1
            returning *;
        ";

        Ok(sqlx::query_as::<_, Campaign>(q)
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.description)
            .bind(changes.status)
            .bind(changes.review_threshold)
            .bind(changes.max_review_score)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_campaign(&self, id: Uuid) -> Result<bool, StoreError> {
        let q = "--sql
            delete from campaigns
            where id = $1;
        ";

        let result = sqlx::query(q).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_survey(&self, new: NewSurvey) -> Result<Survey, StoreError> {
        let q = "--sql
            insert into surveys (id, campaign_id, title, description, thank_you_message)
            values ($1, $2, $3, $4, $5)
            returning *;
        ";

        sqlx::query_as::<_, Survey>(q)
            .bind(Uuid::new_v4())
            .bind(new.campaign_id)
            .bind(&new.title)
            .bind(&new.description)
            .bind(&new.thank_you_message)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| insert_error(err, "survey for this campaign"))
    }

    async fn survey(&self, id: Uuid) -> Result<Option<Survey>, StoreError> {
        let q = "--sql
            select *
            from surveys
            where id = $1;
        ";

        Ok(sqlx::query_as::<_, Survey>(q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn survey_by_campaign(&self, campaign_id: Uuid) -> Result<Option<Survey>, StoreError> {
        let q = "--sql
            select *
            from surveys
            where campaign_id = $1;
        ";

        Ok(sqlx::query_as::<_, Survey>(q)
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_survey(
        &self,
        id: Uuid,
        changes: SurveyChanges,
    ) -> Result<Option<Survey>, StoreError> {
        let q = "--sql
            update surveys
            set title = coalesce($2, title),
                description = coalesce($3, description),
                thank_you_message = coalesce($4, thank_you_message),
                updated_at = now()
            where id = $1
            returning *;
        ";

        Ok(sqlx::query_as::<_, Survey>(q)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.description)
            .bind(&changes.thank_you_message)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_question(&self, new: NewQuestion) -> Result<Question, StoreError> {
        let q = "--sql
            insert into questions (id, survey_id, text, type, options, required, order_index)
            values ($1, $2, $3, $4, $5, $6, $7)
            returning *;
        ";

        let row = sqlx::query_as::<_, QuestionRow>(q)
            .bind(Uuid::new_v4())
            .bind(new.survey_id)
            .bind(&new.text)
            .bind(new.question_type)
            .bind(new.options.map(Jsonb))
            .bind(new.required)
            .bind(new.order_index)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn questions_by_survey(&self, survey_id: Uuid) -> Result<Vec<Question>, StoreError> {
        let q = "--sql
            select *
            from questions
            where survey_id = $1
            order by order_index;
        ";

        let rows = sqlx::query_as::<_, QuestionRow>(q)
            .bind(survey_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Question::from).collect())
    }

    async fn update_question(
        &self,
        id: Uuid,
        changes: QuestionChanges,
    ) -> Result<Option<Question>, StoreError> {
        let q = "--sql
            update questions
            set text = coalesce($2, text),
                type = coalesce($3, type),
                options = coalesce($4, options),
                required = coalesce($5, required),
                updated_at = now()
            where id = $1
            returning *;
        ";

        let row = sqlx::query_as::<_, QuestionRow>(q)
            .bind(id)
            .bind(&changes.text)
            .bind(changes.question_type)
            .bind(changes.options.map(Jsonb))
            .bind(changes.required)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Question::from))
    }

    async fn delete_question(&self, id: Uuid) -> Result<Option<Question>, StoreError> {
        let q = "--sql
            delete from questions
            where id = $1
            returning *;
        ";

        let row = sqlx::query_as::<_, QuestionRow>(q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Question::from))
    }

    async fn set_question_order(
        &self,
        survey_id: Uuid,
        ordered_ids: &[Uuid],
    ) -> Result<(), StoreError> {
        let q = "--sql
            update questions
            set order_index = $3, updated_at = now()
            where id = $1 and survey_id = $2;
        ";

        let mut tx = self.pool.begin().await?;
        for (index, id) in ordered_ids.iter().enumerate() {
            sqlx::query(q)
                .bind(id)
                .bind(survey_id)
                .bind(index as i32)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_promotion(&self, new: NewPromotion) -> Result<Promotion, StoreError> {
        let q = "--sql
            insert into promotions
                (id, campaign_id, name, description, code, is_unique, expiry_date, max_uses)
            values ($1, $2, $3, $4, $5, $6, $7, $8)
            returning *;
        ";

        Ok(sqlx::query_as::<_, Promotion>(q)
            .bind(Uuid::new_v4())
            .bind(new.campaign_id)
            .bind(&new.name)
            .bind(&new.description)
            .bind(&new.code)
            .bind(new.is_unique)
            .bind(new.expiry_date)
            .bind(new.max_uses)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn promotion(&self, id: Uuid) -> Result<Option<Promotion>, StoreError> {
        let q = "--sql
            select *
            from promotions
            where id = $1;
        ";

        Ok(sqlx::query_as::<_, Promotion>(q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn promotions_by_campaign(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<Promotion>, StoreError> {
        let q = "--sql
            select *
            from promotions
            where campaign_id = $1
            order by created_at desc;
        ";

        Ok(sqlx::query_as::<_, Promotion>(q)
            .bind(campaign_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_promotion(
        &self,
        id: Uuid,
        changes: PromotionChanges,
    ) -> Result<Option<Promotion>, StoreError> {
        let q = "--sql
            update promotions
            set name = coalesce($2, name),
                description = coalesce($3, description),
                code = coalesce($4, code),
                is_unique = coalesce($5, is_unique),
                expiry_date = coalesce($6, expiry_date),
                max_uses = coalesce($7, max_uses),
                updated_at = now()
            where id = $1
            returning *;
        ";

        Ok(sqlx::query_as::<_, Promotion>(q)
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.description)
            .bind(&changes.code)
            .bind(changes.is_unique)
            .bind(changes.expiry_date)
            .bind(changes.max_uses)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_promotion(&self, id: Uuid) -> Result<bool, StoreError> {
        let q = "--sql
            delete from promotions
            where id = $1;
        ";

        let result = sqlx::query(q).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_response(
        &self,
        new: NewSurveyResponse,
    ) -> Result<SurveyResponse, StoreError> {
        let q = "--sql
            insert into survey_responses (id, survey_id, answers, score, prompted_review)
            values ($1, $2, $3, $4, $5)
            returning *;
        ";

        let row = sqlx::query_as::<_, SurveyResponseRow>(q)
            .bind(Uuid::new_v4())
            .bind(new.survey_id)
            .bind(Jsonb(new.answers))
            .bind(new.score)
            .bind(new.prompted_review)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn response(&self, id: Uuid) -> Result<Option<SurveyResponse>, StoreError> {
        let q = "--sql
            select *
            from survey_responses
            where id = $1;
        ";

        let row = sqlx::query_as::<_, SurveyResponseRow>(q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(SurveyResponse::from))
    }

    async fn responses_by_survey(
        &self,
        survey_id: Uuid,
    ) -> Result<Vec<SurveyResponse>, StoreError> {
        let q = "--sql
            select *
            from survey_responses
            where survey_id = $1
            order by created_at desc;
        ";

        let rows = sqlx::query_as::<_, SurveyResponseRow>(q)
            .bind(survey_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(SurveyResponse::from).collect())
    }

    async fn set_submitted_review(
        &self,
        id: Uuid,
        submitted: bool,
    ) -> Result<Option<SurveyResponse>, StoreError> {
        let q = "--sql
            update survey_responses
            set submitted_review = $2
            where id = $1
            returning *;
        ";

        let row = sqlx::query_as::<_, SurveyResponseRow>(q)
            .bind(id)
            .bind(submitted)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(SurveyResponse::from))
    }

    async fn set_promotion_claimed(
        &self,
        id: Uuid,
    ) -> Result<Option<SurveyResponse>, StoreError> {
        let q = "--sql
            update survey_responses
            set promotion_claimed = true
            where id = $1
            returning *;
        ";

        let row = sqlx::query_as::<_, SurveyResponseRow>(q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(SurveyResponse::from))
    }
}
