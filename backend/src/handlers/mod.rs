use axum::Json;
use serde_json::{json, Value};

pub mod reports;
pub mod roll;
pub mod scan;
pub mod sessions;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
