#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{self, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::store::memory::MemoryStore;
    use crate::{create_app, AppConfig, AppState};

    fn app() -> Router {
        create_app(AppState {
            store: Arc::new(MemoryStore::new()),
            config: Arc::new(AppConfig {
                public_base_url: "http://testserver".to_string(),
            }),
        })
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().uri(uri).method(method);
        let request = match body {
            Some(json) => builder
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(Body::from(serde_json::to_string(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    struct Setup {
        campaign_id: String,
        survey_id: String,
    }

    /// Active campaign with an editable survey, the shape a business has
    /// after walking through the dashboard.
    async fn setup_campaign(app: &Router, review_link: Option<&str>, threshold: f64) -> Setup {
        let (_, profile) = send(
            app,
            Method::POST,
            "/profile",
            Some(json!({
                "email": "owner@acme-cafe.example",
                "company_name": "Acme Cafe",
                "google_review_link": review_link
            })),
        )
        .await;

        let (_, campaign) = send(
            app,
            Method::POST,
            "/campaign",
            Some(json!({
                "profile_id": profile["id"],
                "name": "Spring check-in",
                "review_threshold": threshold
            })),
        )
        .await;
        let campaign_id = campaign["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            app,
            Method::PATCH,
            &format!("/campaign/{campaign_id}"),
            Some(json!({ "status": "active" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, survey) = send(
            app,
            Method::PUT,
            &format!("/campaign/{campaign_id}/survey"),
            Some(json!({ "title": "How was your visit?" })),
        )
        .await;
        let survey_id = survey["id"].as_str().unwrap().to_string();

        Setup {
            campaign_id,
            survey_id,
        }
    }

    async fn add_question(app: &Router, survey_id: &str, body: Value) -> String {
        let (status, question) = send(
            app,
            Method::POST,
            &format!("/survey/{survey_id}/questions"),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        question["id"].as_str().unwrap().to_string()
    }

    async fn stats(app: &Router, campaign_id: &str) -> Value {
        let (status, stats) = send(
            app,
            Method::GET,
            &format!("/campaign/{campaign_id}/stats"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        stats
    }

    #[tokio::test]
    async fn high_score_walks_the_whole_funnel() {
        let app = app();
        let setup = setup_campaign(&app, Some("https://g.page/r/acme/review"), 4.0).await;
        let question_id = add_question(&app, &setup.survey_id, json!({})).await;
        send(
            &app,
            Method::POST,
            "/promotion",
            Some(json!({
                "campaign_id": setup.campaign_id,
                "name": "10% off",
                "code": "SAVE-2024"
            })),
        )
        .await;

        let (status, collecting) = send(
            &app,
            Method::GET,
            &format!("/s/{}", setup.campaign_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(collecting["stage"], "collecting");
        assert_eq!(collecting["business"]["company_name"], "Acme Cafe");
        assert_eq!(collecting["has_promotion"], true);
        assert_eq!(collecting["questions"].as_array().unwrap().len(), 1);

        let (status, submitted) = send(
            &app,
            Method::POST,
            &format!("/s/{}/responses", setup.campaign_id),
            Some(json!({ "answers": { (question_id.as_str()): 5 } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(submitted["score"], 5.0);
        assert_eq!(submitted["next"]["stage"], "review_prompt");
        assert_eq!(
            submitted["next"]["review_link"],
            "https://g.page/r/acme/review"
        );
        let response_id = submitted["response_id"].as_str().unwrap().to_string();

        let (status, promotion_stage) = send(
            &app,
            Method::POST,
            &format!("/response/{response_id}/review"),
            Some(json!({ "clicked": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(promotion_stage["stage"], "promotion");
        assert_eq!(promotion_stage["offer"]["kind"], "code");
        assert_eq!(promotion_stage["offer"]["code"], "SAVE-2024");

        let (status, claimed) = send(
            &app,
            Method::POST,
            &format!("/response/{response_id}/promotion"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(claimed["promotion_claimed"], true);
        assert_eq!(claimed["submitted_review"], true);

        let stats = stats(&app, &setup.campaign_id).await;
        assert_eq!(stats["response_count"], 1);
        assert_eq!(stats["average_score"], 5.0);
        assert_eq!(stats["reviews_prompted"], 1);
        assert_eq!(stats["reviews_submitted"], 1);
        assert_eq!(stats["promotions_claimed"], 1);
    }

    #[tokio::test]
    async fn below_threshold_skips_the_review_prompt() {
        let app = app();
        let setup = setup_campaign(&app, Some("https://g.page/r/acme/review"), 4.0).await;
        let question_id = add_question(&app, &setup.survey_id, json!({})).await;
        send(
            &app,
            Method::POST,
            "/promotion",
            Some(json!({
                "campaign_id": setup.campaign_id,
                "name": "10% off",
                "code": "SAVE-2024"
            })),
        )
        .await;

        let (status, submitted) = send(
            &app,
            Method::POST,
            &format!("/s/{}/responses", setup.campaign_id),
            Some(json!({ "answers": { (question_id.as_str()): 3 } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(submitted["score"], 3.0);
        assert_eq!(submitted["next"]["stage"], "promotion");

        let stats = stats(&app, &setup.campaign_id).await;
        assert_eq!(stats["reviews_prompted"], 0);
    }

    #[tokio::test]
    async fn declining_the_review_still_reaches_the_promotion() {
        let app = app();
        let setup = setup_campaign(&app, Some("https://g.page/r/acme/review"), 4.0).await;
        let question_id = add_question(&app, &setup.survey_id, json!({})).await;

        let (_, submitted) = send(
            &app,
            Method::POST,
            &format!("/s/{}/responses", setup.campaign_id),
            Some(json!({ "answers": { (question_id.as_str()): 5 } })),
        )
        .await;
        let response_id = submitted["response_id"].as_str().unwrap().to_string();

        let (status, next) = send(
            &app,
            Method::POST,
            &format!("/response/{response_id}/review"),
            Some(json!({ "clicked": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(next["stage"], "thank_you");

        let stats = stats(&app, &setup.campaign_id).await;
        assert_eq!(stats["reviews_prompted"], 1);
        assert_eq!(stats["reviews_submitted"], 0);
    }

    #[tokio::test]
    async fn surveys_without_rating_questions_never_prompt() {
        let app = app();
        let setup = setup_campaign(&app, Some("https://g.page/r/acme/review"), 1.0).await;
        let question_id = add_question(
            &app,
            &setup.survey_id,
            json!({ "text": "Tell us more", "type": "text" }),
        )
        .await;

        let (status, submitted) = send(
            &app,
            Method::POST,
            &format!("/s/{}/responses", setup.campaign_id),
            Some(json!({ "answers": { (question_id.as_str()): "lovely staff" } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(submitted["score"], Value::Null);
        assert_eq!(submitted["next"]["stage"], "thank_you");

        let stats = stats(&app, &setup.campaign_id).await;
        assert_eq!(stats["average_score"], Value::Null);
        assert_eq!(stats["reviews_prompted"], 0);
    }

    #[tokio::test]
    async fn no_promotion_ends_in_a_thank_you() {
        let app = app();
        let setup = setup_campaign(&app, None, 4.0).await;
        let question_id = add_question(&app, &setup.survey_id, json!({})).await;

        let (_, submitted) = send(
            &app,
            Method::POST,
            &format!("/s/{}/responses", setup.campaign_id),
            Some(json!({ "answers": { (question_id.as_str()): 5 } })),
        )
        .await;
        assert_eq!(submitted["next"]["stage"], "thank_you");
        let response_id = submitted["response_id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/response/{response_id}/promotion"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let stats = stats(&app, &setup.campaign_id).await;
        assert_eq!(stats["promotions_claimed"], 0);
    }

    #[tokio::test]
    async fn expired_promotions_are_shown_but_never_claimable() {
        let app = app();
        let setup = setup_campaign(&app, None, 4.0).await;
        let question_id = add_question(&app, &setup.survey_id, json!({})).await;
        send(
            &app,
            Method::POST,
            "/promotion",
            Some(json!({
                "campaign_id": setup.campaign_id,
                "name": "Bygone bargain",
                "code": "SAVE-2024",
                "expiry_date": "2020-01-01T00:00:00Z"
            })),
        )
        .await;

        let (_, submitted) = send(
            &app,
            Method::POST,
            &format!("/s/{}/responses", setup.campaign_id),
            Some(json!({ "answers": { (question_id.as_str()): 2 } })),
        )
        .await;
        assert_eq!(submitted["next"]["stage"], "promotion");
        assert_eq!(submitted["next"]["offer"]["kind"], "expired");
        assert_eq!(submitted["next"]["offer"].get("code"), None);
        let response_id = submitted["response_id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/response/{response_id}/promotion"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let stats = stats(&app, &setup.campaign_id).await;
        assert_eq!(stats["promotions_claimed"], 0);
    }

    #[tokio::test]
    async fn unique_promotions_derive_a_stable_per_response_code() {
        let app = app();
        let setup = setup_campaign(&app, None, 4.0).await;
        let question_id = add_question(&app, &setup.survey_id, json!({})).await;
        send(
            &app,
            Method::POST,
            "/promotion",
            Some(json!({
                "campaign_id": setup.campaign_id,
                "name": "Personal treat",
                "code": "SAVE-2024",
                "is_unique": true
            })),
        )
        .await;

        let (_, submitted) = send(
            &app,
            Method::POST,
            &format!("/s/{}/responses", setup.campaign_id),
            Some(json!({ "answers": { (question_id.as_str()): 5 } })),
        )
        .await;
        let first_code = submitted["next"]["offer"]["code"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(first_code.starts_with("SAVE-"));
        assert_eq!(first_code.len(), 9);
        let response_id = submitted["response_id"].as_str().unwrap().to_string();

        // Revisiting the promotion stage re-derives the same code.
        let (_, next) = send(
            &app,
            Method::POST,
            &format!("/response/{response_id}/review"),
            Some(json!({ "clicked": false })),
        )
        .await;
        assert_eq!(next["offer"]["code"], first_code.as_str());
    }

    #[tokio::test]
    async fn missing_required_answers_jump_back_to_the_first_invalid() {
        let app = app();
        let setup = setup_campaign(&app, None, 4.0).await;
        let rating_id = add_question(&app, &setup.survey_id, json!({})).await;
        let text_id = add_question(
            &app,
            &setup.survey_id,
            json!({ "text": "Tell us more", "type": "text" }),
        )
        .await;

        let (status, failure) = send(
            &app,
            Method::POST,
            &format!("/s/{}/responses", setup.campaign_id),
            Some(json!({ "answers": { (text_id.as_str()): "just the text one" } })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(failure["first_invalid_index"], 0);
        assert_eq!(
            failure["missing_question_ids"],
            json!([rating_id])
        );

        let stats = stats(&app, &setup.campaign_id).await;
        assert_eq!(stats["response_count"], 0);
    }

    #[tokio::test]
    async fn inactive_campaigns_are_not_public() {
        let app = app();
        let (_, profile) = send(
            &app,
            Method::POST,
            "/profile",
            Some(json!({ "email": "owner@acme-cafe.example" })),
        )
        .await;
        let (_, campaign) = send(
            &app,
            Method::POST,
            "/campaign",
            Some(json!({ "profile_id": profile["id"], "name": "Still drafting" })),
        )
        .await;
        let campaign_id = campaign["id"].as_str().unwrap();

        let (status, _) = send(&app, Method::GET, &format!("/s/{campaign_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/s/{campaign_id}/responses"),
            Some(json!({ "answers": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn surveys_with_no_questions_reject_submissions() {
        let app = app();
        let setup = setup_campaign(&app, None, 4.0).await;

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/s/{}/responses", setup.campaign_id),
            Some(json!({ "answers": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
