//! End-to-end update jobs over a fake site
mod common;

use common::{FakeSite, TestEnv, dekalb_site};
use parostok_catalog::application::{CatalogService, SourceRegistry};
use parostok_catalog::domain::{CatalogSnapshot, Run, RunStatus, UpdateRequest};
use std::time::Duration;

const POLL: Duration = Duration::from_millis(20);

async fn service(env: &TestEnv, site: FakeSite) -> CatalogService {
    CatalogService::open(
        &env.db,
        site.into_fetcher(),
        SourceRegistry::standard().unwrap(),
        env.snapshot_writer(),
    )
    .await
    .unwrap()
}

async fn run_to_completion(service: &CatalogService, request: UpdateRequest) -> Run {
    let job_id = service.request_update(request).await.unwrap();
    tokio::time::timeout(Duration::from_secs(10), service.wait_for_update(&job_id, POLL))
        .await
        .expect("job finished in time")
        .unwrap()
        .expect("job is known")
}

fn messages(run: &Run) -> Vec<&str> {
    run.step_logs.iter().map(|entry| entry.message.as_str()).collect()
}

fn ua_only() -> UpdateRequest {
    UpdateRequest {
        markets: vec!["UA".into()],
        sources: vec!["bayer_ua_dekalb".into()],
        dry_run: false,
    }
}

#[tokio::test]
async fn zero_source_run_still_completes() {
    let env = TestEnv::new().await;
    let service = service(&env, FakeSite::default()).await;

    let run = run_to_completion(
        &service,
        UpdateRequest {
            sources: vec!["bayer_us_dekalb".into()],
            ..UpdateRequest::default()
        },
    )
    .await;

    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.finished_at.is_some());
    let counts = run.counts;
    assert_eq!(
        (counts.discovered, counts.parsed, counts.added, counts.updated, counts.unchanged),
        (0, 0, 0, 0, 0)
    );
    assert_eq!(
        messages(&run),
        vec![
            "Starting catalog sync job.",
            "Source bayer_us_dekalb disabled: Network scraping not configured in this starter; use manual import.",
            "No enabled sources. Nothing fetched.",
        ]
    );
    assert!(env.snapshot_path.exists());
}

#[tokio::test]
async fn full_crawl_populates_catalog_and_replay_is_unchanged() {
    let env = TestEnv::new().await;
    let service = service(&env, dekalb_site()).await;

    let first = run_to_completion(&service, ua_only()).await;
    assert_eq!(first.status, RunStatus::Completed);
    assert_eq!(first.counts.discovered, 2);
    assert_eq!(first.counts.parsed, 2);
    assert_eq!(first.counts.added, 2);
    assert_eq!(first.counts.errors, 0);
    assert_eq!(
        messages(&first),
        vec![
            "Starting catalog sync job.",
            "Fetching bayer_ua_dekalb start page.",
            "Discovered catalog pages: 1",
            "Discovered product pages: 2",
            "Parsed products: 2",
            "DB changes: added=2 updated=0 unchanged=0",
        ]
    );

    let catalog = service.read_catalog().await.unwrap();
    let corn: Vec<&str> = catalog.crops["corn"].iter().map(|h| h.hybrid.name.as_str()).collect();
    assert_eq!(corn, vec!["DKC4351", "ДКС 3747"]);
    let dks = catalog.find("ДКС 3747").unwrap();
    assert!(dks.attributes.iter().any(|a| a.key == "rating.Холодостійкість" && a.value == "9"));
    assert!(dks
        .attributes
        .iter()
        .any(|a| a.key == "positioning.Зона вирощування" && a.value == "усі зони"));

    let second = run_to_completion(&service, ua_only()).await;
    assert_eq!(second.counts.added, 0);
    assert_eq!(second.counts.updated, 0);
    assert_eq!(second.counts.unchanged, 2);

    let on_disk: CatalogSnapshot =
        serde_json::from_str(&std::fs::read_to_string(&env.snapshot_path).unwrap()).unwrap();
    assert_eq!(on_disk.hybrid_count(), 2);
}

#[tokio::test]
async fn dry_run_parses_without_writing() {
    let env = TestEnv::new().await;
    let service = service(&env, dekalb_site()).await;

    let run = run_to_completion(
        &service,
        UpdateRequest {
            dry_run: true,
            ..ua_only()
        },
    )
    .await;

    assert_eq!(run.counts.parsed, 2);
    assert_eq!(run.counts.added, 0);
    assert!(messages(&run).contains(&"Dry-run enabled. Skipping database writes."));
    assert_eq!(service.read_catalog().await.unwrap().hybrid_count(), 0);
}

#[tokio::test]
async fn unreachable_start_page_counts_an_error_and_completes() {
    let env = TestEnv::new().await;
    let service = service(&env, FakeSite::default()).await;

    let run = run_to_completion(&service, ua_only()).await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.counts.errors, 1);
    let last = messages(&run).last().copied().unwrap();
    assert!(last.starts_with("Source bayer_ua_dekalb failed: start page unavailable"), "{last}");
}

#[tokio::test]
async fn missing_product_page_is_logged_and_skipped() {
    let env = TestEnv::new().await;
    let site = dekalb_site().page(
        "/Products/Dekalb/Corn",
        r#"<a href="/Products/Dekalb/Corn/DKS3747">a</a><a href="/Products/Dekalb/Corn/Gone">b</a>"#,
    );
    let service = service(&env, site).await;

    let run = run_to_completion(&service, ua_only()).await;

    assert_eq!(run.counts.discovered, 2);
    assert_eq!(run.counts.parsed, 1);
    assert_eq!(run.counts.errors, 0);
    assert!(messages(&run).iter().any(|m| m.starts_with(
        "Skipped product page https://www.cropscience.bayer.ua/Products/Dekalb/Corn/Gone"
    )));
}

#[tokio::test]
async fn market_filter_skips_sources_outside_request() {
    let env = TestEnv::new().await;
    let service = service(&env, dekalb_site()).await;

    let run = run_to_completion(
        &service,
        UpdateRequest {
            markets: vec!["US".into()],
            ..ua_only()
        },
    )
    .await;

    assert_eq!(run.counts.discovered, 0);
    assert!(messages(&run).contains(&"Source bayer_ua_dekalb skipped: market UA not requested."));
    assert!(messages(&run).contains(&"No enabled sources. Nothing fetched."));
}

#[tokio::test]
async fn finished_runs_are_served_from_history() {
    let env = TestEnv::new().await;
    let first_service = service(&env, dekalb_site()).await;
    let run = run_to_completion(&first_service, ua_only()).await;

    // A fresh service has an empty job store and must fall back to the runs table
    let restarted = service(&env, dekalb_site()).await;
    let from_history = restarted.poll_update(&run.job_id).await.unwrap().unwrap();
    assert_eq!(from_history.status, RunStatus::Completed);
    assert_eq!(from_history.counts, run.counts);
    assert_eq!(from_history.step_logs.len(), run.step_logs.len());

    assert!(restarted.poll_update("no-such-job").await.unwrap().is_none());

    let overview = restarted.list_sources().await.unwrap();
    assert_eq!(overview.sources.len(), 2);
    assert_eq!(overview.latest_run.unwrap().job_id, run.job_id);
}
