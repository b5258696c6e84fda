use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A business account that owns campaigns. Auth and subscription handling live
/// outside this service; the profile only carries what the funnel and the
/// dashboard need.
#[derive(Serialize, Deserialize, ToSchema, Clone, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[schema(example = "owner@acme-cafe.example")]
    pub email: String,
    #[schema(example = "Acme Cafe")]
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
    #[schema(example = r"+852 1234 5678")]
    pub phone: Option<String>,
    #[schema(example = "https://g.page/r/acme-cafe/review")]
    pub google_review_link: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Debug, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "campaign_status", rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
}

/// A survey + promotion bundle shown to customers. Created in `draft`; the
/// owner moves it through the other statuses explicitly, it never
/// auto-transitions.
#[derive(Serialize, Deserialize, ToSchema, Clone, FromRow)]
pub struct Campaign {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub profile_id: Uuid,
    #[schema(example = "Spring customer check-in")]
    pub name: String,
    pub description: Option<String>,
    pub status: CampaignStatus,
    /// Minimum average rating score required to prompt for a public review.
    #[schema(example = 4.0)]
    pub review_threshold: f64,
    #[schema(example = 5.0)]
    pub max_review_score: f64,
    pub share_link: Option<String>,
    pub qr_code_url: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, FromRow)]
pub struct Survey {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub campaign_id: Uuid,
    #[schema(example = "How was your visit?")]
    pub title: String,
    pub description: Option<String>,
    pub thank_you_message: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Debug, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "question_type", rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Textarea,
    Rating,
    MultipleChoice,
    Checkbox,
    Dropdown,
}

/// Type-specific question configuration: a scale for rating questions, a
/// choice list for the selection types.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(untagged)]
pub enum QuestionOptions {
    Rating { min: i32, max: i32, step: i32 },
    Choice { choices: Vec<String> },
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct Question {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub survey_id: Uuid,
    #[schema(example = "How satisfied were you with the service?")]
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[schema(value_type = Option<Object>)]
    pub options: Option<QuestionOptions>,
    pub required: bool,
    /// Display and scoring position, contiguous from 0 within a survey.
    pub order_index: i32,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, FromRow)]
pub struct Promotion {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub campaign_id: Uuid,
    #[schema(example = "10% off your next visit")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "BK81-DNFJ")]
    pub code: String,
    /// When set, customers get a per-customer code derived from `code`
    /// instead of the shared one.
    pub is_unique: bool,
    pub expiry_date: Option<DateTime<Utc>>,
    /// Stored for reporting only; redemption caps are not enforced here.
    pub max_uses: Option<i32>,
}

/// One customer's answer to one question. The wire shape depends on the
/// question type: a number for ratings, a string for text and single-choice
/// types, a string list for checkboxes.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Text(String),
    Selection(Vec<String>),
}

impl AnswerValue {
    /// Empty means "not really answered" for required-field checks: blank
    /// text or an empty selection. A number always counts as answered.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Number(_) => false,
            AnswerValue::Text(text) => text.is_empty(),
            AnswerValue::Selection(choices) => choices.is_empty(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AnswerValue::Number(value) => Some(*value),
            _ => None,
        }
    }
}

pub type AnswerMap = HashMap<Uuid, AnswerValue>;

/// One customer submission. Created exactly once; the review and promotion
/// steps that follow each flip their own flag and nothing else.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub survey_id: Uuid,
    #[schema(value_type = Object)]
    pub answers: AnswerMap,
    /// Arithmetic mean of the rating answers; null when the survey has no
    /// rating questions.
    pub score: Option<f64>,
    pub prompted_review: bool,
    pub submitted_review: bool,
    pub promotion_claimed: bool,
}
