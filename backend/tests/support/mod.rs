#![allow(dead_code)]
use std::{env, sync::Arc, time::Duration as StdDuration};

use attendance_backend::{
    config::Config,
    routes::build_router,
    state::AppState,
    utils::{jwt::create_access_token, time::FixedClock},
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;

pub const T0: i64 = 1_700_000_000_000;
pub const MINUTE_MS: i64 = 60_000;
pub const CLASSROOM: (f64, f64) = (14.5995, 120.9842);

const SECRET: &str = "test-secret";

pub fn test_config() -> Config {
    Config {
        database_url: "memory://".into(),
        jwt_secret: SECRET.into(),
        time_zone: chrono_tz::Asia::Manila,
        bind_addr: "127.0.0.1:0".into(),
        qr_default_expiration_minutes: 5,
        geofence_radius_meters: 100.0,
        session_retention_days: 30,
        cors_allow_origins: vec!["*".into()],
    }
}

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<FixedClock>,
    pub state: AppState,
}

pub fn test_app() -> TestApp {
    let clock = Arc::new(FixedClock::new(T0));
    let state = AppState::in_memory(test_config(), clock.clone());
    TestApp {
        router: build_router(state.clone()),
        clock,
        state,
    }
}

pub fn teacher_token(id: &str) -> String {
    create_access_token(id.into(), format!("Teacher {id}"), "teacher".into(), SECRET, 1)
        .expect("teacher token")
}

pub fn student_token(id: &str, name: &str) -> String {
    create_access_token(id.into(), name.into(), "student".into(), SECRET, 1)
        .expect("student token")
}

/// Point roughly `meters` north of the classroom.
pub fn near_classroom(meters: f64) -> (f64, f64) {
    (CLASSROOM.0 + meters / 111_195.0, CLASSROOM.1)
}

pub fn location_json((latitude, longitude): (f64, f64)) -> Value {
    json!({ "latitude": latitude, "longitude": longitude, "accuracy_meters": 8.0 })
}

/// Migrated pool on `TEST_DATABASE_URL`, or `None` when it is unset so the
/// Postgres-backed tests skip.
pub async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping Postgres repository test");
        return None;
    };
    let mut retry_count = 0;
    let max_retries = 3;

    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(StdDuration::from_secs(30))
            .connect(&database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) if retry_count < max_retries => {
                retry_count += 1;
                eprintln!(
                    "Retrying DB connection (attempt {}/{}): {}",
                    retry_count, max_retries, e
                );
                tokio::time::sleep(StdDuration::from_secs(2)).await;
            }
            Err(e) => panic!(
                "Failed to connect to test database after {} retries: {}",
                max_retries, e
            ),
        }
    };
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    /// Issues a session for `teacher`/`schedule_id` and returns the response body.
    pub async fn issue(
        &self,
        teacher: &str,
        schedule_id: &str,
        location: Option<(f64, f64)>,
    ) -> Value {
        let mut body = json!({
            "schedule_id": schedule_id,
            "subject": "Mathematics",
            "section": "Grade 10 - A",
        });
        if let Some(location) = location {
            body["location"] = location_json(location);
        }
        let (status, json) = self
            .send(
                Method::POST,
                "/api/sessions",
                Some(&teacher_token(teacher)),
                Some(body),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "issue failed: {json}");
        json
    }

    pub async fn scan(
        &self,
        student_id: &str,
        qr_text: &str,
        location: Option<(f64, f64)>,
    ) -> (StatusCode, Value) {
        let mut body = json!({ "qr_text": qr_text });
        if let Some(location) = location {
            body["location"] = location_json(location);
        }
        self.send(
            Method::POST,
            "/api/attendance/scan",
            Some(&student_token(student_id, &format!("Student {student_id}"))),
            Some(body),
        )
        .await
    }
}
