//! Crawl coordinator - main crawl orchestration logic
//!
//! This module contains the dispatch loop that drives a session:
//! - Building the job list (every query over every sector)
//! - Bounded concurrent dispatch with cancellation and block detection
//! - Per-job pagination, parsing, filtering and storage
//! - Shared statistics and the progress sidecar

use crate::area::{filter_by_polygon, filter_by_rating};
use crate::crawler::client::{FetchError, SearchClient};
use crate::crawler::parser::parse_map_response;
use crate::crawler::pb::PAGE_SIZE;
use crate::crawler::throttle::Throttle;
use crate::model::{Business, SearchParams, Sector};
use crate::output::{CrawlStats, ProgressReporter, StatsSnapshot};
use crate::storage::Storage;
use crate::{Result, SweepError};
use geo::MultiPolygon;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Callback receiving each filtered, non-empty batch before it is stored
pub type BatchObserver = Arc<dyn Fn(&[Business]) + Send + Sync>;

/// Optional hooks and shared state for a crawl
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Called with every batch that survives filtering
    pub on_batch: Option<BatchObserver>,

    /// Disables the stderr status line (the `PROGRESS` log line remains)
    pub suppress_progress: bool,

    /// Externally owned counters for live display; created if absent
    pub stats: Option<Arc<CrawlStats>>,

    /// Businesses outside this polygon are discarded
    pub geo_filter: Option<MultiPolygon<f64>>,

    /// Cancels the crawl cooperatively
    pub cancel: CancellationToken,
}

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every job was dispatched and finished
    Finished,

    /// The cancellation token fired
    Cancelled,

    /// Dispatch stopped after too many consecutive rate limits
    Blocked { consecutive_rate_limits: u64 },
}

/// Outcome of a crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub stats: StatsSnapshot,
    pub termination: Termination,
    pub elapsed: Duration,
}

impl CrawlReport {
    /// Maps a cancelled or blocked crawl to its error
    pub fn into_result(self) -> Result<StatsSnapshot> {
        match self.termination {
            Termination::Finished => Ok(self.stats),
            Termination::Cancelled => Err(SweepError::Cancelled),
            Termination::Blocked {
                consecutive_rate_limits,
            } => Err(SweepError::PersistentBlock {
                consecutive_rate_limits,
            }),
        }
    }
}

/// One (sector, query) unit of work
#[derive(Debug, Clone)]
struct Job {
    sector: Sector,
    query: String,
}

/// State shared by all jobs of a crawl
struct JobContext {
    client: SearchClient,
    storage: Arc<dyn Storage>,
    throttle: Throttle,
    stats: Arc<CrawlStats>,
    params: SearchParams,
    on_batch: Option<BatchObserver>,
    geo_filter: Option<MultiPolygon<f64>>,
    cancel: CancellationToken,
}

/// Runs a crawl over the given sectors
///
/// Jobs are the cartesian product of queries and sectors, dispatched in
/// order with at most `params.concurrency` in flight.
///
/// # Arguments
///
/// * `sectors` - Sectors to crawl, usually from `plan_sectors`
/// * `params` - Session parameters
/// * `storage` - Result store shared by all workers
/// * `options` - Hooks, shared stats, geo filter and cancellation
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl ran; check `termination` for how it ended
/// * `Err(SweepError::NoSectors)` - Nothing to crawl
/// * `Err(SweepError::Fetch)` - The HTTP client could not be built
pub async fn run(
    sectors: Vec<Sector>,
    params: &SearchParams,
    storage: Arc<dyn Storage>,
    options: RunOptions,
) -> Result<CrawlReport> {
    if sectors.is_empty() {
        return Err(SweepError::NoSectors);
    }

    let client = SearchClient::new(
        &params.client,
        &params.lang,
        params.zoom,
        params.proxy.as_deref(),
    )?;

    let jobs: Vec<Job> = params
        .queries
        .iter()
        .flat_map(|query| {
            sectors.iter().map(move |sector| Job {
                sector: *sector,
                query: query.clone(),
            })
        })
        .collect();

    let stats = options.stats.unwrap_or_default();
    stats.set_total_jobs(jobs.len() as u64);

    let cancel = options.cancel;
    let ctx = Arc::new(JobContext {
        client,
        storage,
        throttle: Throttle::new(params.throttle.clone()),
        stats: Arc::clone(&stats),
        params: params.clone(),
        on_batch: options.on_batch,
        geo_filter: options.geo_filter,
        cancel: cancel.clone(),
    });

    tracing::info!(
        "Crawling: {} jobs ({} queries x {} sectors), concurrency={}",
        jobs.len(),
        params.queries.len(),
        sectors.len(),
        params.concurrency
    );

    let reporter = ProgressReporter::spawn(Arc::clone(&stats), !options.suppress_progress);
    let semaphore = Arc::new(Semaphore::new(params.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut termination = Termination::Finished;

    for job in jobs {
        if let Some(stop) = dispatch_check(&ctx) {
            termination = stop;
            break;
        }

        let permit = tokio::select! {
            _ = cancel.cancelled() => {
                termination = Termination::Cancelled;
                break;
            }
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        // Re-check: the streak may have grown while waiting for a slot
        if let Some(stop) = dispatch_check(&ctx) {
            termination = stop;
            break;
        }

        let job_ctx = Arc::clone(&ctx);
        tasks.spawn(async move {
            let _permit = permit;
            process_job(&job_ctx, job).await;
        });

        while let Some(joined) = tasks.try_join_next() {
            log_join_error(joined);
        }
    }

    if let Termination::Blocked {
        consecutive_rate_limits,
    } = termination
    {
        tracing::error!(
            "ABORT: persistent rate limiting ({} consecutive), stopping",
            consecutive_rate_limits
        );
        if !options.suppress_progress {
            eprintln!(
                "\n[!] Persistent rate limiting detected, aborting. Try again later or reduce concurrency/zoom."
            );
        }
    }

    drain(&mut tasks, &cancel, params.shutdown_grace).await;

    if termination == Termination::Finished && cancel.is_cancelled() {
        termination = Termination::Cancelled;
    }

    let elapsed = reporter.elapsed();
    reporter.finish().await;

    let snapshot = stats.snapshot();
    tracing::info!(
        "Done: found={} stored={} errors={} rate_limits={} termination={:?}",
        snapshot.businesses_found,
        snapshot.businesses_stored,
        snapshot.errors,
        snapshot.rate_limits,
        termination
    );

    Ok(CrawlReport {
        stats: snapshot,
        termination,
        elapsed,
    })
}

/// Returns why dispatch must stop, if it must
fn dispatch_check(ctx: &JobContext) -> Option<Termination> {
    if ctx.cancel.is_cancelled() {
        return Some(Termination::Cancelled);
    }
    if ctx.throttle.is_blocked() {
        return Some(Termination::Blocked {
            consecutive_rate_limits: ctx.throttle.consecutive_rate_limits(),
        });
    }
    None
}

/// Waits for in-flight jobs; after cancellation they get `grace` to finish
async fn drain(tasks: &mut JoinSet<()>, cancel: &CancellationToken, grace: Duration) {
    tokio::select! {
        _ = join_all(tasks) => return,
        _ = cancel.cancelled() => {}
    }

    if tokio::time::timeout(grace, join_all(tasks)).await.is_err() {
        tracing::warn!(
            "{} jobs still running after {:?} grace period, aborting",
            tasks.len(),
            grace
        );
        tasks.abort_all();
        join_all(tasks).await;
    }
}

async fn join_all(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        log_join_error(joined);
    }
}

fn log_join_error(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!("Crawl job panicked: {}", e);
        }
    }
}

/// Runs one job through up to `max_pages` pages
async fn process_job(ctx: &JobContext, job: Job) {
    let max_pages = ctx.params.max_pages.max(1);

    for page in 0..max_pages {
        if ctx.cancel.is_cancelled() || !ctx.throttle.wait(&ctx.cancel).await {
            break;
        }

        let offset = page * PAGE_SIZE;
        let body = match ctx
            .client
            .search_map(&job.sector, &job.query, offset, &ctx.cancel)
            .await
        {
            Ok(body) => body,
            Err(FetchError::Cancelled) => break,
            Err(e) => {
                record_failure(ctx, &job, page, &e);
                break;
            }
        };

        ctx.throttle.record_success();

        if ctx.params.debug {
            dump_payload(ctx, &job.sector, page, &body).await;
        }

        let (businesses, has_more) = parse_map_response(&body, &job.query);
        ctx.stats.add_found(businesses.len() as u64);

        let mut businesses =
            filter_by_rating(businesses, ctx.params.min_rating, ctx.params.max_rating);
        if let Some(polygon) = &ctx.geo_filter {
            businesses = filter_by_polygon(businesses, polygon);
        }

        if !businesses.is_empty() {
            if let Some(on_batch) = &ctx.on_batch {
                on_batch(&businesses);
            }
            store_batch(ctx, businesses).await;
        }

        if !has_more {
            break;
        }
    }

    ctx.stats.record_job_done();
}

fn record_failure(ctx: &JobContext, job: &Job, page: u32, error: &FetchError) {
    if let FetchError::RateLimited { status } = error {
        ctx.stats.record_rate_limit();
        ctx.throttle.record_rate_limit();
        tracing::warn!(
            "RATE_LIMIT sector={} status={} query={:?}",
            job.sector,
            status,
            job.query
        );
    } else {
        tracing::warn!("ERROR sector={} page={} err={}", job.sector, page, error);
    }
    ctx.stats.record_error();
}

async fn store_batch(ctx: &JobContext, businesses: Vec<Business>) {
    let storage = Arc::clone(&ctx.storage);
    let result = tokio::task::spawn_blocking(move || storage.insert_batch(&businesses)).await;

    match result {
        Ok(Ok(inserted)) => ctx.stats.add_stored(inserted as u64),
        Ok(Err(e)) => {
            tracing::error!("Failed to store batch: {}", e);
            ctx.stats.record_error();
        }
        Err(e) => {
            tracing::error!("Storage task failed: {}", e);
            ctx.stats.record_error();
        }
    }
}

async fn dump_payload(ctx: &JobContext, sector: &Sector, page: u32, body: &[u8]) {
    let path = ctx.params.debug_dir.join(format!(
        "debug_sector_{}_{}_page_{}.json",
        sector.row, sector.col, page
    ));
    if let Err(e) = tokio::fs::write(&path, body).await {
        tracing::warn!("Failed to write debug payload {}: {}", path.display(), e);
    }
}
