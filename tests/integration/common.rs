//! Shared fixtures: payload builders and test parameters

use geosweep::crawler::{RetryPolicy, ThrottlePolicy};
use geosweep::model::{AreaTarget, SearchParams, Sector};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use wiremock::MockServer;

/// One result entry as the backend nests it
pub fn business_entry(name: &str, cid: &str, rating: f64, lat: f64, lng: f64) -> Value {
    let mut biz = vec![Value::Null; 79];
    biz[4] = json!([null, null, null, null, null, null, null, rating, 12]);
    biz[9] = json!([null, null, lat, lng]);
    biz[10] = json!(cid);
    biz[11] = json!(name);
    biz[78] = json!(format!("place-{}", cid));

    let mut entry = vec![Value::Null; 15];
    entry[14] = Value::Array(biz);
    Value::Array(entry)
}

/// Full response body with the guard line and leading metadata entry
pub fn payload(entries: Vec<Value>) -> String {
    let mut all = vec![json!(["metadata"])];
    all.extend(entries);
    format!(")]}}'\n{}", json!([[null, all]]))
}

/// Two businesses near Madrid
pub fn madrid_payload() -> String {
    payload(vec![
        business_entry("Cafe Central", "1001", 4.5, 40.4168, -3.7038),
        business_entry("Cafe Norte", "1002", 3.5, 40.4200, -3.7000),
    ])
}

pub fn sectors(n: u32) -> Vec<Sector> {
    (0..n)
        .map(|i| Sector {
            lat: 40.40 + 0.01 * f64::from(i),
            lng: -3.70,
            span: 0.0103,
            row: i,
            col: 0,
        })
        .collect()
}

/// Parameters tuned for fast tests against a mock server
pub fn test_params(server: &MockServer, db_path: &Path) -> SearchParams {
    let mut params = SearchParams::new(
        vec!["cafes".to_string()],
        AreaTarget::Radius {
            lat: 40.4168,
            lng: -3.7038,
            radius_km: 1.0,
        },
        db_path,
    );

    params.client.search_url = format!("{}/search", server.uri());
    params.client.request_timeout = Duration::from_secs(5);
    params.client.retry = RetryPolicy {
        max_attempts: 1,
        base_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(10),
        jitter_factor: 0.0,
    };
    params.throttle = ThrottlePolicy {
        step_up: Duration::from_millis(1),
        step_down: Duration::from_millis(1),
        ceiling: Duration::from_millis(5),
        block_threshold: 50,
    };
    params.concurrency = 4;
    params.shutdown_grace = Duration::from_millis(100);
    params
}

pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}
