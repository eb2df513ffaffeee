// tests/api_tests.rs

use std::{collections::HashSet, sync::Arc};

use serde_json::{Value, json};
use surveys::{config::Config, routes, seed::seed_admin_user, state::AppState, store::MemoryStore};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-password";

struct TestApp {
    address: String,
    store: Arc<MemoryStore>,
    client: reqwest::Client,
}

/// Spawns the app on a random port, backed by an in-memory store and a
/// fixed sampler seed.
async fn spawn_app(questions_per_survey: usize) -> TestApp {
    let config = Config {
        database_url: String::new(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        questions_per_survey,
        sampler_seed: Some(7),
        listen_addr: "127.0.0.1:0".to_string(),
    };

    let store = Arc::new(MemoryStore::new());
    seed_admin_user(store.as_ref(), &config)
        .await
        .expect("Failed to seed admin");

    let state = AppState::new(store.clone(), store.clone(), config);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    /// Adds a question with `answers` answers; the first answer is the right one.
    async fn question_with_answers(&self, text: &str, answers: usize) -> (i64, Vec<i64>) {
        let q = self.store.add_question(text, 0).await;
        let mut ids = Vec::new();
        for i in 0..answers {
            ids.push(self.store.add_answer(q, &format!("{} #{}", text, i)).await.unwrap());
        }
        if let Some(&first) = ids.first() {
            self.store.set_right_answer(q, first).await.unwrap();
        }
        (q, ids)
    }

    async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/auth/register", self.address))
            .json(&json!({ "email": email, "username": "tester", "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let resp: Value = self
            .client
            .post(format!("{}/api/auth/login", self.address))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .expect("Failed to parse login json");
        resp["token"].as_str().expect("Token not found").to_string()
    }

    async fn user_token(&self) -> String {
        self.register("user@example.com", "password123").await;
        self.login("user@example.com", "password123").await
    }

    async fn create_survey(&self, token: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/surveys", self.address))
            .bearer_auth(token)
            .send()
            .await
            .expect("Create survey failed")
    }

    async fn submit(&self, token: &str, survey_id: i64, body: Value) -> reqwest::Response {
        self.client
            .put(format!("{}/api/surveys/{}", self.address, survey_id))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Submit failed")
    }

    async fn get_json(&self, token: &str, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Request failed");
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app(3).await;

    let response = app
        .client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    let app = spawn_app(3).await;

    let response = app.register("new@example.com", "password123").await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], "new@example.com");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app(3).await;

    // Password shorter than 8 characters
    let short = app.register("short@example.com", "pw").await;
    assert_eq!(short.status().as_u16(), 400);

    // Not an email
    let bad_email = app.register("not-an-email", "password123").await;
    assert_eq!(bad_email.status().as_u16(), 400);

    // Missing fields
    let missing = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({ "email": "missing@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 400);
}

#[tokio::test]
async fn register_duplicate_email_is_rejected() {
    let app = spawn_app(3).await;

    assert_eq!(app.register("dup@example.com", "password123").await.status().as_u16(), 201);
    assert_eq!(app.register("dup@example.com", "password456").await.status().as_u16(), 400);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = spawn_app(3).await;
    app.register("user@example.com", "password123").await;

    let response = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "email": "user@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn survey_routes_require_token() {
    let app = spawn_app(3).await;

    let response = app
        .client
        .post(format!("{}/api/surveys", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let bogus = app.create_survey("not-a-jwt").await;
    assert_eq!(bogus.status().as_u16(), 401);
}

#[tokio::test]
async fn create_survey_samples_distinct_eligible_questions() {
    let app = spawn_app(3).await;
    let mut eligible = HashSet::new();
    for i in 0..5 {
        eligible.insert(app.question_with_answers(&format!("Q{}", i), 3).await.0);
    }
    let (no_answers, _) = app.question_with_answers("Empty", 0).await;
    let token = app.user_token().await;

    let response = app.create_survey(&token).await;
    assert_eq!(response.status().as_u16(), 201);
    let survey: Value = response.json().await.unwrap();

    assert_eq!(survey["status"], "open");
    let results = survey["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    let question_ids: HashSet<i64> = results
        .iter()
        .map(|r| r["question_id"].as_i64().unwrap())
        .collect();
    assert_eq!(question_ids.len(), 3);
    assert!(question_ids.is_subset(&eligible));
    assert!(!question_ids.contains(&no_answers));

    for r in results {
        assert_eq!(r["answered"], false);
        assert_eq!(r["answered_id"], 0);
        assert!(r.get("right_answered").is_none());
    }
    for q in survey["questions"].as_array().unwrap() {
        assert!(q.get("right_answer").is_none());
        assert_eq!(q["answers"].as_array().unwrap().len(), 3);
    }
}

#[tokio::test]
async fn create_survey_is_capped_at_eligible_population() {
    let app = spawn_app(5).await;
    app.question_with_answers("Q1", 2).await;
    app.question_with_answers("Q2", 1).await;
    let token = app.user_token().await;

    let survey: Value = app.create_survey(&token).await.json().await.unwrap();
    assert_eq!(survey["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn create_survey_with_empty_bank_has_no_slots() {
    let app = spawn_app(3).await;
    let token = app.user_token().await;

    let response = app.create_survey(&token).await;
    assert_eq!(response.status().as_u16(), 201);
    let survey: Value = response.json().await.unwrap();
    assert!(survey["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn submit_scores_closes_and_conflicts_on_resubmit() {
    let app = spawn_app(1).await;
    let (q1, answers) = app.question_with_answers("Q1", 3).await;
    let right = answers[0];
    let token = app.user_token().await;

    let survey: Value = app.create_survey(&token).await.json().await.unwrap();
    let survey_id = survey["id"].as_i64().unwrap();
    let r1 = survey["results"][0]["id"].as_i64().unwrap();
    assert_eq!(survey["results"][0]["question_id"], q1);

    // Not closed yet: the review endpoint is empty
    let (status, review) = app.get_json(&token, &format!("/api/results/{}", survey_id)).await;
    assert_eq!(status, 200);
    assert_eq!(review, json!([]));

    let response = app
        .submit(
            &token,
            survey_id,
            json!({ "results": [{ "result_id": r1, "chosen_answer_id": right }] }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let closed: Value = response.json().await.unwrap();
    assert_eq!(closed["status"], "closed");
    assert_eq!(closed["results"][0]["answered"], true);
    assert_eq!(closed["results"][0]["right_answered"], true);
    assert_eq!(closed["results"][0]["answered_id"], right);
    assert_eq!(closed["questions"][0]["right_answer"], right);

    // Second submission is rejected and leaves R1 untouched
    let again = app
        .submit(
            &token,
            survey_id,
            json!({ "results": [{ "result_id": r1, "chosen_answer_id": answers[1] }] }),
        )
        .await;
    assert_eq!(again.status().as_u16(), 409);
    let err: Value = again.json().await.unwrap();
    assert!(err["error"].as_str().is_some());

    let (_, slot) = app.get_json(&token, &format!("/api/slots/{}", r1)).await;
    assert_eq!(slot["answered_id"], right);
    assert_eq!(slot["answered"], true);

    let (status, review) = app.get_json(&token, &format!("/api/results/{}", survey_id)).await;
    assert_eq!(status, 200);
    assert_eq!(review.as_array().unwrap().len(), 1);
    assert_eq!(review[0]["results"][0]["right_answered"], true);

    // The plain view still hides correctness
    let (_, plain) = app.get_json(&token, &format!("/api/surveys/{}", survey_id)).await;
    assert_eq!(plain["status"], "closed");
    assert!(plain["results"][0].get("right_answered").is_none());
}

#[tokio::test]
async fn submit_wrong_answer_and_partial_submission() {
    let app = spawn_app(2).await;
    app.question_with_answers("Q1", 2).await;
    app.question_with_answers("Q2", 2).await;
    let token = app.user_token().await;

    let survey: Value = app.create_survey(&token).await.json().await.unwrap();
    let survey_id = survey["id"].as_i64().unwrap();
    let first_id = survey["results"][0]["id"].as_i64().unwrap();

    // Questions follow slot order; the second answer is never the right one.
    assert_eq!(survey["questions"][0]["id"], survey["results"][0]["question_id"]);
    let wrong = survey["questions"][0]["answers"][1]["id"].as_i64().unwrap();

    let closed: Value = app
        .submit(
            &token,
            survey_id,
            json!({ "simple_survey_result": [{ "id": first_id, "answered_id": wrong }] }),
        )
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(closed["status"], "closed");
    assert_eq!(closed["results"][0]["answered"], true);
    assert_eq!(closed["results"][0]["right_answered"], false);
    // Untouched slot stays unanswered
    assert_eq!(closed["results"][1]["answered"], false);
    assert_eq!(closed["results"][1]["answered_id"], 0);
}

#[tokio::test]
async fn submit_foreign_result_is_not_found_and_mutates_nothing() {
    let app = spawn_app(1).await;
    let (_, answers) = app.question_with_answers("Q1", 2).await;
    let token = app.user_token().await;

    let first: Value = app.create_survey(&token).await.json().await.unwrap();
    let second: Value = app.create_survey(&token).await.json().await.unwrap();
    let first_id = first["id"].as_i64().unwrap();
    let own_slot = first["results"][0]["id"].as_i64().unwrap();
    let foreign_slot = second["results"][0]["id"].as_i64().unwrap();

    let response = app
        .submit(
            &token,
            first_id,
            json!({ "results": [
                { "result_id": own_slot, "chosen_answer_id": answers[0] },
                { "result_id": foreign_slot, "chosen_answer_id": answers[0] }
            ] }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 404);

    let (_, survey) = app.get_json(&token, &format!("/api/surveys/{}", first_id)).await;
    assert_eq!(survey["status"], "open");
    assert_eq!(survey["results"][0]["answered"], false);
}

#[tokio::test]
async fn submit_to_unknown_survey_is_not_found() {
    let app = spawn_app(3).await;
    let token = app.user_token().await;

    let response = app.submit(&token, 9999, json!({ "results": [] })).await;
    assert_eq!(response.status().as_u16(), 404);

    let (status, _) = app.get_json(&token, "/api/surveys/9999").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn submit_malformed_payload_is_bad_request() {
    let app = spawn_app(1).await;
    app.question_with_answers("Q1", 2).await;
    let token = app.user_token().await;
    let survey: Value = app.create_survey(&token).await.json().await.unwrap();
    let survey_id = survey["id"].as_i64().unwrap();

    let response = app
        .submit(&token, survey_id, json!({ "results": [{ "result_id": 1 }] }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let (_, after) = app.get_json(&token, &format!("/api/surveys/{}", survey_id)).await;
    assert_eq!(after["status"], "open");
}

#[tokio::test]
async fn question_lookup_hides_right_answer() {
    let app = spawn_app(3).await;
    let (q, answers) = app.question_with_answers("Q1", 2).await;

    let (status, question) = app.get_json("", &format!("/api/questions/{}", q)).await;
    assert_eq!(status, 200);
    assert_eq!(question["question"], "Q1");
    assert!(question.get("right_answer").is_none());

    let (_, list) = app.get_json("", &format!("/api/questions/{}/answers", q)).await;
    assert_eq!(list.as_array().unwrap().len(), 2);

    let (_, answer) = app.get_json("", &format!("/api/answers/{}", answers[1])).await;
    assert_eq!(answer["id"], answers[1]);

    let (status, _) = app.get_json("", "/api/questions/9999").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn user_management_requires_admin() {
    let app = spawn_app(3).await;
    let created: Value = app
        .register("victim@example.com", "password123")
        .await
        .json()
        .await
        .unwrap();
    let victim_id = created["id"].as_i64().unwrap();

    let user_token = app.user_token().await;
    let forbidden = app
        .client
        .patch(format!("{}/api/users/{}", app.address, victim_id))
        .bearer_auth(&user_token)
        .json(&json!({ "username": "hacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);

    let admin_token = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let patched = app
        .client
        .patch(format!("{}/api/users/{}", app.address, victim_id))
        .bearer_auth(&admin_token)
        .json(&json!({ "username": "renamed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(patched.status().as_u16(), 200);
    let body: Value = patched.json().await.unwrap();
    assert_eq!(body["username"], "renamed");

    let replaced = app
        .client
        .put(format!("{}/api/users/{}", app.address, victim_id))
        .bearer_auth(&admin_token)
        .json(&json!({
            "email": "victim@example.com",
            "username": "replaced",
            "password": "new-password"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(replaced.status().as_u16(), 200);
    // New password is effective
    app.login("victim@example.com", "new-password").await;

    let deleted = app
        .client
        .delete(format!("{}/api/users/{}", app.address, victim_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 200);

    let missing = app
        .client
        .delete(format!("{}/api/users/{}", app.address, victim_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}
