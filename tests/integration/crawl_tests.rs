//! End-to-end crawl tests against a mock search backend

use crate::common::{
    business_entry, madrid_payload, payload, request_count, sectors, test_params,
};
use geo::{polygon, MultiPolygon};
use geosweep::crawler::{run, RunOptions, Termination};
use geosweep::model::Business;
use geosweep::storage::SqliteStorage;
use geosweep::SweepError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn quiet() -> RunOptions {
    RunOptions {
        suppress_progress: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_full_crawl_stores_deduplicated_results() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("results.db");

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("tbm", "map"))
        .and(query_param("q", "cafes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(madrid_payload()))
        .mount(&mock_server)
        .await;

    let params = test_params(&mock_server, &db_path);
    let storage = Arc::new(SqliteStorage::open(&db_path).unwrap());

    let report = run(sectors(3), &params, storage.clone(), quiet())
        .await
        .unwrap();

    assert_eq!(report.termination, Termination::Finished);
    assert_eq!(report.stats.total_jobs, 3);
    assert_eq!(report.stats.jobs_done, 3);
    assert_eq!(report.stats.businesses_found, 6);
    assert_eq!(report.stats.businesses_stored, 2);
    assert_eq!(report.stats.errors, 0);
    assert_eq!(request_count(&mock_server).await, 3);

    let stored = storage.list_businesses(Some("cafes")).unwrap();
    let mut names: Vec<&str> = stored.iter().map(|b| b.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Cafe Central", "Cafe Norte"]);
    assert!(stored[0].map_url.contains("place_id:place-"));
}

#[tokio::test]
async fn test_every_query_runs_over_every_sector() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("results.db");

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(madrid_payload()))
        .mount(&mock_server)
        .await;

    let mut params = test_params(&mock_server, &db_path);
    params.queries = vec!["cafes".to_string(), "bars".to_string()];
    let storage = Arc::new(SqliteStorage::open(&db_path).unwrap());

    let report = run(sectors(2), &params, storage.clone(), quiet())
        .await
        .unwrap();

    assert_eq!(report.stats.total_jobs, 4);
    assert_eq!(request_count(&mock_server).await, 4);
    // Same cid under two queries is two rows
    assert_eq!(storage.count().unwrap(), 4);
}

#[tokio::test]
async fn test_rerun_against_same_database_adds_nothing() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("results.db");

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(madrid_payload()))
        .mount(&mock_server)
        .await;

    let params = test_params(&mock_server, &db_path);

    {
        let storage = Arc::new(SqliteStorage::open(&db_path).unwrap());
        run(sectors(2), &params, storage.clone(), quiet())
            .await
            .unwrap();
        storage.close().unwrap();
    }

    let storage = Arc::new(SqliteStorage::open(&db_path).unwrap());
    let report = run(sectors(2), &params, storage.clone(), quiet())
        .await
        .unwrap();

    assert_eq!(report.stats.businesses_found, 4);
    assert_eq!(report.stats.businesses_stored, 0);
    assert_eq!(storage.count().unwrap(), 2);
}

#[tokio::test]
async fn test_rating_and_polygon_filters() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("results.db");

    let body = payload(vec![
        business_entry("Inside Good", "1", 4.6, 0.5, 0.5),
        business_entry("Inside Poor", "2", 3.1, 0.5, 0.5),
        business_entry("Outside Good", "3", 4.8, 2.0, 2.0),
        business_entry("Null Island", "4", 4.9, 0.0, 0.0),
    ]);
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let mut params = test_params(&mock_server, &db_path);
    params.min_rating = Some(4.0);
    let storage = Arc::new(SqliteStorage::open(&db_path).unwrap());

    let seen: Arc<Mutex<Vec<Business>>> = Arc::new(Mutex::new(Vec::new()));
    let observer_seen = Arc::clone(&seen);

    let square: MultiPolygon<f64> = MultiPolygon::new(vec![polygon![
        (x: 0.0, y: 0.0),
        (x: 1.0, y: 0.0),
        (x: 1.0, y: 1.0),
        (x: 0.0, y: 1.0),
        (x: 0.0, y: 0.0),
    ]]);

    let options = RunOptions {
        on_batch: Some(Arc::new(move |batch: &[Business]| {
            observer_seen.lock().unwrap().extend_from_slice(batch);
        })),
        suppress_progress: true,
        geo_filter: Some(square),
        ..Default::default()
    };

    let report = run(sectors(1), &params, storage.clone(), options)
        .await
        .unwrap();

    assert_eq!(report.stats.businesses_found, 4);
    assert_eq!(report.stats.businesses_stored, 1);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].name, "Inside Good");
    assert_eq!(storage.count().unwrap(), 1);
}

#[tokio::test]
async fn test_pagination_follows_full_pages() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("results.db");

    let full_page = payload(
        (0..20)
            .map(|i| business_entry(&format!("Cafe {}", i), &format!("p1-{}", i), 4.0, 40.4, -3.7))
            .collect(),
    );
    let last_page = payload(vec![business_entry("Cafe Last", "p2-0", 4.0, 40.4, -3.7)]);

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(full_page))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(last_page))
        .mount(&mock_server)
        .await;

    let mut params = test_params(&mock_server, &db_path);
    params.max_pages = 5;
    let storage = Arc::new(SqliteStorage::open(&db_path).unwrap());

    let report = run(sectors(1), &params, storage.clone(), quiet())
        .await
        .unwrap();

    assert_eq!(request_count(&mock_server).await, 2);
    assert_eq!(report.stats.businesses_found, 21);
    assert_eq!(storage.count().unwrap(), 21);
}

#[tokio::test]
async fn test_server_errors_counted_and_crawl_continues() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("results.db");

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let params = test_params(&mock_server, &db_path);
    let storage = Arc::new(SqliteStorage::open(&db_path).unwrap());

    let report = run(sectors(4), &params, storage, quiet()).await.unwrap();

    assert_eq!(report.termination, Termination::Finished);
    assert_eq!(report.stats.jobs_done, 4);
    assert_eq!(report.stats.errors, 4);
    assert_eq!(report.stats.rate_limits, 0);
}

#[tokio::test]
async fn test_persistent_rate_limiting_aborts() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("results.db");

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let mut params = test_params(&mock_server, &db_path);
    params.concurrency = 2;
    params.throttle.block_threshold = 5;
    let storage = Arc::new(SqliteStorage::open(&db_path).unwrap());

    let report = run(sectors(40), &params, storage, quiet()).await.unwrap();

    assert!(matches!(report.termination, Termination::Blocked { .. }));
    assert!(report.stats.jobs_done < 40);
    assert_eq!(report.stats.errors, report.stats.rate_limits);

    let requests = request_count(&mock_server).await;
    assert!(requests <= 2 * (5 + 3), "sent {} requests", requests);

    assert!(matches!(
        report.into_result(),
        Err(SweepError::PersistentBlock { .. })
    ));
}

#[tokio::test]
async fn test_cancellation_stops_dispatch() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("results.db");

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(madrid_payload())
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&mock_server)
        .await;

    let mut params = test_params(&mock_server, &db_path);
    params.concurrency = 2;
    params.shutdown_grace = Duration::from_millis(50);
    let storage = Arc::new(SqliteStorage::open(&db_path).unwrap());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let options = RunOptions {
        suppress_progress: true,
        cancel,
        ..Default::default()
    };
    let report = run(sectors(20), &params, storage.clone(), options)
        .await
        .unwrap();

    assert_eq!(report.termination, Termination::Cancelled);
    assert!(report.stats.jobs_done < 20);
    assert!(matches!(report.into_result(), Err(SweepError::Cancelled)));

    let count_at_return = storage.count().unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(storage.count().unwrap(), count_at_return);
    assert!(request_count(&mock_server).await <= 2);
}

#[tokio::test]
async fn test_debug_mode_dumps_payloads() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("results.db");

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(madrid_payload()))
        .mount(&mock_server)
        .await;

    let mut params = test_params(&mock_server, &db_path);
    params.debug = true;
    params.debug_dir = temp_dir.path().to_path_buf();
    let storage = Arc::new(SqliteStorage::open(&db_path).unwrap());

    run(sectors(2), &params, storage, quiet()).await.unwrap();

    for row in 0..2 {
        let dump = temp_dir
            .path()
            .join(format!("debug_sector_{}_0_page_0.json", row));
        let content = std::fs::read_to_string(&dump).unwrap();
        assert_eq!(content, madrid_payload());
    }
}

#[tokio::test]
async fn test_external_stats_are_updated() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("results.db");

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(madrid_payload()))
        .mount(&mock_server)
        .await;

    let params = test_params(&mock_server, &db_path);
    let storage = Arc::new(SqliteStorage::open(&db_path).unwrap());
    let stats = Arc::new(geosweep::CrawlStats::new());

    let options = RunOptions {
        suppress_progress: true,
        stats: Some(Arc::clone(&stats)),
        ..Default::default()
    };
    run(sectors(2), &params, storage, options).await.unwrap();

    assert_eq!(stats.jobs_done(), 2);
    assert_eq!(stats.businesses_stored(), 2);
}
