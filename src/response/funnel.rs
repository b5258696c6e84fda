use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::promotion::code::{format_promotion_code, generate_unique_code, is_promotion_expired};
use crate::types::{Profile, Promotion, Question, Survey};

use super::score::RatingScore;

pub const DEFAULT_THANK_YOU: &str = "Your feedback has been submitted successfully.";

/// What the customer sees about the business while taking the survey.
#[derive(Serialize, ToSchema, Clone, Debug)]
pub struct BusinessCard {
    #[schema(example = "Acme Cafe")]
    pub company_name: String,
    pub logo_url: Option<String>,
}

impl BusinessCard {
    pub fn from_profile(profile: &Profile) -> Self {
        BusinessCard {
            company_name: business_name(profile),
            logo_url: profile.logo_url.clone(),
        }
    }
}

pub fn business_name(profile: &Profile) -> String {
    profile
        .company_name
        .clone()
        .unwrap_or_else(|| "this business".to_string())
}

/// What the promotion step shows: a claimable code, or an expired-offer
/// notice that can never be claimed.
#[derive(Serialize, ToSchema, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromotionOffer {
    Code {
        promotion_id: Uuid,
        name: String,
        description: Option<String>,
        code: String,
        expiry_date: Option<DateTime<Utc>>,
    },
    Expired {
        name: String,
    },
}

/// The discriminated state handed to the rendering boundary. The funnel only
/// ever moves forward: collecting, then (maybe) the review prompt, then the
/// promotion or a plain thank-you.
#[derive(Serialize, ToSchema, Debug)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum FunnelStage {
    Collecting {
        survey: Survey,
        questions: Vec<Question>,
        business: BusinessCard,
        max_review_score: f64,
        has_promotion: bool,
    },
    ReviewPrompt {
        response_id: Uuid,
        business_name: String,
        review_link: String,
    },
    Promotion {
        response_id: Uuid,
        offer: PromotionOffer,
    },
    ThankYou {
        response_id: Uuid,
        message: String,
    },
}

/// Decided exactly once, at submission time, and persisted on the response.
/// A submission with no rating answers never prompts, whatever the
/// threshold.
pub fn should_prompt_review(score: RatingScore, review_threshold: f64) -> bool {
    score.rating_count > 0 && score.average >= review_threshold
}

/// Stage following a freshly stored submission: the review prompt when the
/// response was flagged for one AND the business actually has somewhere to
/// send the reviewer; otherwise straight to the promotion step.
pub fn stage_after_submission(
    response_id: Uuid,
    prompted_review: bool,
    profile: &Profile,
    survey: &Survey,
    latest_promotion: Option<Promotion>,
    now: DateTime<Utc>,
) -> FunnelStage {
    if prompted_review {
        if let Some(link) = profile
            .google_review_link
            .as_deref()
            .filter(|link| !link.is_empty())
        {
            return FunnelStage::ReviewPrompt {
                response_id,
                business_name: business_name(profile),
                review_link: link.to_string(),
            };
        }
    }

    promotion_stage(response_id, latest_promotion, survey, now)
}

/// Terminal stage. No promotion configured → plain thank-you. The most
/// recently created promotion decides the offer; an expired one is shown as
/// expired rather than falling back to an older code.
pub fn promotion_stage(
    response_id: Uuid,
    latest_promotion: Option<Promotion>,
    survey: &Survey,
    now: DateTime<Utc>,
) -> FunnelStage {
    let Some(promotion) = latest_promotion else {
        return FunnelStage::ThankYou {
            response_id,
            message: survey
                .thank_you_message
                .clone()
                .unwrap_or_else(|| DEFAULT_THANK_YOU.to_string()),
        };
    };

    if is_promotion_expired(promotion.expiry_date, now) {
        return FunnelStage::Promotion {
            response_id,
            offer: PromotionOffer::Expired {
                name: promotion.name,
            },
        };
    }

    let code = if promotion.is_unique {
        generate_unique_code(&promotion.code, &response_id.to_string())
    } else {
        format_promotion_code(&promotion.code)
    };

    FunnelStage::Promotion {
        response_id,
        offer: PromotionOffer::Code {
            promotion_id: promotion.id,
            name: promotion.name,
            description: promotion.description,
            code,
            expiry_date: promotion.expiry_date,
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn profile(review_link: Option<&str>) -> Profile {
        let now = Utc::now();
        Profile {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            email: "owner@example.com".to_string(),
            company_name: Some("Acme Cafe".to_string()),
            logo_url: None,
            phone: None,
            google_review_link: review_link.map(str::to_string),
        }
    }

    fn survey(thank_you: Option<&str>) -> Survey {
        let now = Utc::now();
        Survey {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            campaign_id: Uuid::new_v4(),
            title: "How was your visit?".to_string(),
            description: None,
            thank_you_message: thank_you.map(str::to_string),
        }
    }

    fn promotion(expiry: Option<DateTime<Utc>>, is_unique: bool) -> Promotion {
        let now = Utc::now();
        Promotion {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            campaign_id: Uuid::new_v4(),
            name: "10% off".to_string(),
            description: None,
            code: "SAVE-MORE".to_string(),
            is_unique,
            expiry_date: expiry,
            max_uses: None,
        }
    }

    #[test]
    fn prompts_at_and_above_the_threshold() {
        let hit = RatingScore {
            average: 4.0,
            rating_count: 1,
        };
        let miss = RatingScore {
            average: 3.9,
            rating_count: 1,
        };
        assert!(should_prompt_review(hit, 4.0));
        assert!(!should_prompt_review(miss, 4.0));
    }

    #[test]
    fn never_prompts_without_rating_answers() {
        let unscored = RatingScore {
            average: 0.0,
            rating_count: 0,
        };
        assert!(!should_prompt_review(unscored, 1.0));
        assert!(!should_prompt_review(unscored, 0.0));
    }

    #[test]
    fn review_prompt_requires_a_configured_link() {
        let response_id = Uuid::new_v4();
        let survey = survey(None);
        let now = Utc::now();

        let with_link = stage_after_submission(
            response_id,
            true,
            &profile(Some("https://g.page/r/acme/review")),
            &survey,
            Some(promotion(None, false)),
            now,
        );
        assert!(matches!(with_link, FunnelStage::ReviewPrompt { .. }));

        let without_link = stage_after_submission(
            response_id,
            true,
            &profile(None),
            &survey,
            Some(promotion(None, false)),
            now,
        );
        assert!(matches!(without_link, FunnelStage::Promotion { .. }));

        let blank_link = stage_after_submission(
            response_id,
            true,
            &profile(Some("")),
            &survey,
            None,
            now,
        );
        assert!(matches!(blank_link, FunnelStage::ThankYou { .. }));
    }

    #[test]
    fn unprompted_submission_skips_the_review_stage() {
        let stage = stage_after_submission(
            Uuid::new_v4(),
            false,
            &profile(Some("https://g.page/r/acme/review")),
            &survey(None),
            None,
            Utc::now(),
        );
        assert!(matches!(stage, FunnelStage::ThankYou { .. }));
    }

    #[test]
    fn no_promotion_falls_back_to_the_survey_thank_you() {
        let stage = promotion_stage(
            Uuid::new_v4(),
            None,
            &survey(Some("See you soon!")),
            Utc::now(),
        );
        match stage {
            FunnelStage::ThankYou { message, .. } => assert_eq!(message, "See you soon!"),
            other => panic!("expected thank-you, got {other:?}"),
        }
    }

    #[test]
    fn expired_promotion_shows_no_code() {
        let now = Utc::now();
        let stage = promotion_stage(
            Uuid::new_v4(),
            Some(promotion(Some(now - Duration::days(1)), false)),
            &survey(None),
            now,
        );
        match stage {
            FunnelStage::Promotion {
                offer: PromotionOffer::Expired { name },
                ..
            } => assert_eq!(name, "10% off"),
            other => panic!("expected expired offer, got {other:?}"),
        }
    }

    #[test]
    fn shared_code_is_formatted_for_display() {
        let stage = promotion_stage(
            Uuid::new_v4(),
            Some(promotion(None, false)),
            &survey(None),
            Utc::now(),
        );
        match stage {
            FunnelStage::Promotion {
                offer: PromotionOffer::Code { code, .. },
                ..
            } => assert_eq!(code, "SAVE-MORE"),
            other => panic!("expected code offer, got {other:?}"),
        }
    }

    #[test]
    fn unique_codes_are_stable_per_response() {
        let response_id = Uuid::new_v4();
        let offer_code = |response_id| {
            match promotion_stage(
                response_id,
                Some(promotion(None, true)),
                &survey(None),
                Utc::now(),
            ) {
                FunnelStage::Promotion {
                    offer: PromotionOffer::Code { code, .. },
                    ..
                } => code,
                other => panic!("expected code offer, got {other:?}"),
            }
        };

        assert_eq!(offer_code(response_id), offer_code(response_id));
        assert!(offer_code(response_id).starts_with("SAVE"));
    }
}
