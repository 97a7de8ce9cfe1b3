//! Poll loop tests against scripted backends on a paused clock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use roomforge::api::v1::phone_upload::{PhoneUploadStatusResponse, UploadStatus};
use roomforge::api::v1::project::{ProjectStatus, ProjectStatusResponse};
use roomforge_client::poll::{
    watch_project, watch_upload, PollConfig, ProjectOutcome, UploadOutcome,
};

fn upload_config() -> PollConfig {
    PollConfig {
        interval: Duration::from_secs(3),
        immediate_first: false,
        max_consecutive_failures: 5,
        max_polls: None,
    }
}

fn project_config() -> PollConfig {
    PollConfig {
        interval: Duration::from_secs(5),
        immediate_first: true,
        max_consecutive_failures: 5,
        max_polls: Some(360),
    }
}

fn upload(status: UploadStatus) -> Result<PhoneUploadStatusResponse> {
    Ok(PhoneUploadStatusResponse {
        status,
        files: Vec::new(),
    })
}

fn project(status: &str, path: Option<&str>) -> Result<ProjectStatusResponse> {
    Ok(ProjectStatusResponse {
        status: ProjectStatus::new(status),
        room_model_path: path.map(str::to_owned),
    })
}

/// Builds a query closure that pops scripted responses and counts calls.
fn scripted<T: Send + 'static>(
    responses: Vec<Result<T>>,
) -> (
    impl FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T>> + Send>>,
    Arc<AtomicUsize>,
) {
    let script = Arc::new(Mutex::new(VecDeque::from(responses)));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let query = move || {
        let script = Arc::clone(&script);
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("script exhausted")))
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = Result<T>> + Send>>
    };
    (query, calls)
}

#[tokio::test(start_paused = true)]
async fn upload_poll_stops_exactly_at_completion() {
    let (query, calls) = scripted(vec![
        upload(UploadStatus::Pending),
        upload(UploadStatus::Pending),
        upload(UploadStatus::Completed),
    ]);

    let outcome = watch_upload(upload_config(), CancellationToken::new(), query).await;

    assert_eq!(outcome, UploadOutcome::Completed(Vec::new()));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn upload_poll_stops_at_failure() {
    let (query, calls) = scripted(vec![upload(UploadStatus::Failed)]);

    let outcome = watch_upload(upload_config(), CancellationToken::new(), query).await;

    assert_eq!(outcome, UploadOutcome::Failed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn upload_poll_rides_out_transient_failures() {
    let (query, calls) = scripted(vec![
        Err(anyhow!("connection refused")),
        Err(anyhow!("connection refused")),
        upload(UploadStatus::Pending),
        upload(UploadStatus::Completed),
    ]);

    let outcome = watch_upload(upload_config(), CancellationToken::new(), query).await;

    assert_eq!(outcome, UploadOutcome::Completed(Vec::new()));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn upload_poll_gives_up_after_the_failure_bound() {
    let (query, calls) = scripted(vec![
        Err(anyhow!("boom")),
        Err(anyhow!("boom")),
        Err(anyhow!("boom")),
        Err(anyhow!("boom")),
        Err(anyhow!("boom")),
        upload(UploadStatus::Completed),
    ]);

    let outcome = watch_upload(upload_config(), CancellationToken::new(), query).await;

    assert_eq!(outcome, UploadOutcome::GaveUp);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn cancellation_freezes_the_upload_poll() {
    let (query, calls) = scripted(vec![
        upload(UploadStatus::Pending),
        upload(UploadStatus::Pending),
        upload(UploadStatus::Pending),
        upload(UploadStatus::Pending),
    ]);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watch_upload(upload_config(), cancel.clone(), query));

    // Two full intervals, then tear down
    tokio::time::sleep(Duration::from_millis(6500)).await;
    cancel.cancel();

    let outcome = handle.await.unwrap();
    assert_eq!(outcome, UploadOutcome::Cancelled);

    let frozen = calls.load(Ordering::SeqCst);
    assert_eq!(frozen, 2);

    // No stray query after the outcome is in
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(calls.load(Ordering::SeqCst), frozen);
}

#[tokio::test(start_paused = true)]
async fn project_poll_queries_immediately_and_resolves_the_model() {
    let (query, calls) = scripted(vec![project(
        "completed",
        Some("projects/p1/model/room_model.glb"),
    )]);

    let base = Url::parse("http://127.0.0.1:8000").unwrap();
    let outcome = watch_project(project_config(), base, CancellationToken::new(), query).await;

    match outcome {
        ProjectOutcome::Ready(url) => {
            assert!(url
                .as_str()
                .ends_with("/project_files/p1/model/room_model.glb"));
        }
        other => panic!("expected Ready, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn project_poll_keeps_going_until_the_path_materializes() {
    let (query, calls) = scripted(vec![
        project("created", None),
        project("photogrammetry_running", None),
        project("photogrammetry_complete", Some("")),
        project("detection_complete", Some("projects/p1/model/room_model.glb")),
    ]);

    let base = Url::parse("http://127.0.0.1:8000").unwrap();
    let outcome = watch_project(project_config(), base, CancellationToken::new(), query).await;

    assert!(matches!(outcome, ProjectOutcome::Ready(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn project_poll_surfaces_pipeline_failure() {
    let (query, _calls) = scripted(vec![
        project("photogrammetry_running", None),
        project("photogrammetry_failed", None),
    ]);

    let base = Url::parse("http://127.0.0.1:8000").unwrap();
    let outcome = watch_project(project_config(), base, CancellationToken::new(), query).await;

    assert_eq!(
        outcome,
        ProjectOutcome::Failed(ProjectStatus::new("photogrammetry_failed"))
    );
}

#[tokio::test(start_paused = true)]
async fn project_poll_times_out_when_the_budget_runs_out() {
    let config = PollConfig {
        max_polls: Some(3),
        ..project_config()
    };
    let (query, calls) = scripted(vec![
        project("created", None),
        project("created", None),
        project("created", None),
        project("created", None),
    ]);

    let base = Url::parse("http://127.0.0.1:8000").unwrap();
    let outcome = watch_project(config, base, CancellationToken::new(), query).await;

    assert_eq!(outcome, ProjectOutcome::TimedOut);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
