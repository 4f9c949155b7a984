//! Config file to finished crawl

use crate::common::{madrid_payload, request_count};
use geosweep::area::{plan_sectors, BoundaryStore, Geocoder};
use geosweep::config::load_config_with_hash;
use geosweep::crawler::{run, RunOptions, Termination};
use geosweep::storage::SqliteStorage;
use std::io::Write;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_radius_session_from_config_file() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("results.db");

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("hl", "es"))
        .respond_with(ResponseTemplate::new(200).set_body_string(madrid_payload()))
        .mount(&mock_server)
        .await;

    let config_file = write_config(&format!(
        r#"
[search]
queries = ["cafes"]
concurrency = 3
lang = "es"

[area]
lat = 40.4168
lng = -3.7038
radius-km = 1.0

[client]
search-url = "{}/search"
max-attempts = 1

[throttle]
step-up-ms = 1
step-down-ms = 1
ceiling-ms = 5

[output]
database-path = "{}"
"#,
        mock_server.uri(),
        db_path.display()
    ));

    let (config, hash) = load_config_with_hash(config_file.path()).unwrap();
    assert_eq!(hash.len(), 64);

    let params = config.to_search_params();
    let boundaries = BoundaryStore::global().unwrap();
    let geocoder = Geocoder::new().unwrap();
    let plan = plan_sectors(&params, boundaries, &geocoder).await.unwrap();
    assert!(!plan.sectors.is_empty());
    assert!(plan.polygon.is_none());

    let sector_count = plan.sectors.len();
    let storage = Arc::new(SqliteStorage::open(&params.db_path).unwrap());
    let options = RunOptions {
        suppress_progress: true,
        ..Default::default()
    };

    let report = run(plan.sectors, &params, storage.clone(), options)
        .await
        .unwrap();

    assert_eq!(report.termination, Termination::Finished);
    assert_eq!(report.stats.jobs_done, sector_count as u64);
    assert_eq!(request_count(&mock_server).await, sector_count);
    assert_eq!(storage.count().unwrap(), 2);
}
