//! End-to-end extraction flow over the in-memory store and mock source.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use cutover_ado::{MockArtifactSource, MockFailure};
use cutover_core::{
    ArtifactKind, CreateProjectRequest, Error, JobStatus, RepositoryRecord, WorkItemRecord,
};
use cutover_jobs::{ExtractionManager, ManagerConfig};
use cutover_store::Store;

async fn seed(source: MockArtifactSource) -> (Arc<ExtractionManager>, Store, Uuid) {
    let store = Store::in_memory();
    let project_id = store
        .projects
        .insert(CreateProjectRequest {
            external_id: "ext-alpha".into(),
            name: "Alpha".into(),
            description: Some("migration candidate".into()),
            process_template: Some("Agile".into()),
            source_control: Some("Git".into()),
            visibility: Some("private".into()),
        })
        .await
        .unwrap();
    let manager = Arc::new(ExtractionManager::new(store.clone(), Arc::new(source)));
    (manager, store, project_id)
}

async fn wait_terminal(
    manager: &ExtractionManager,
    job_id: Uuid,
) -> cutover_core::ExtractionJob {
    for _ in 0..500 {
        let job = manager.job_status(job_id).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("job {} never reached a terminal state", job_id);
}

fn work_item(id: i64, title: &str) -> WorkItemRecord {
    WorkItemRecord {
        id,
        fields: json!({
            "System.Title": title,
            "System.WorkItemType": "User Story",
            "System.State": "New",
        }),
    }
}

#[tokio::test]
async fn test_work_item_extraction_end_to_end() {
    let source = MockArtifactSource::new().with_work_items(
        vec![1, 2, 3],
        vec![work_item(1, "a"), work_item(2, "b"), work_item(3, "c")],
    );
    let (manager, store, project_id) = seed(source).await;

    let job_id = manager
        .start(project_id, ArtifactKind::WorkItems)
        .await
        .unwrap();
    let job = wait_terminal(&manager, job_id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.extracted_items, 3);
    assert_eq!(job.progress_percent, 100);
    assert!(job.completed_at.is_some());
    assert!(job.error_message.is_none());

    let project = store.projects.get(project_id).await.unwrap();
    let summary = &project.artifact_summaries[&ArtifactKind::WorkItems];
    assert!(summary.extracted);
    assert_eq!(summary.count, job.extracted_items);
    assert_eq!(summary.items.len(), 3);
    assert_eq!(summary.items[0]["title"], "a");
    assert_eq!(project.work_item_count, 3);

    let history = store.jobs.list_for_project(project_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, job_id);
}

#[tokio::test]
async fn test_sequential_success_then_failure_regresses_summary() {
    // First extraction of area paths succeeds with five nodes; the source
    // then starts timing out, and the re-extraction overwrites the summary
    // with the error state.
    let nodes: Vec<_> = (1..=5)
        .map(|i| cutover_core::ClassificationNode {
            id: i.to_string(),
            name: format!("Area {}", i),
            path: format!("\\Migrated\\Area {}", i),
            has_children: false,
            start_date: None,
            end_date: None,
        })
        .collect();

    let healthy = MockArtifactSource::new().with_area_paths(nodes.clone());
    let (manager, store, project_id) = seed(healthy).await;

    let first = manager
        .start(project_id, ArtifactKind::AreaPaths)
        .await
        .unwrap();
    let first = wait_terminal(&manager, first).await;
    assert_eq!(first.status, JobStatus::Completed);
    assert_eq!(first.extracted_items, 5);

    let project = store.projects.get(project_id).await.unwrap();
    assert!(project.artifact_summaries[&ArtifactKind::AreaPaths].extracted);

    // Same store, new manager whose source now fails.
    let failing = MockArtifactSource::new()
        .with_failure("area_paths", MockFailure::timeout("connect timed out"));
    let manager = ExtractionManager::new(store.clone(), Arc::new(failing));

    let second = manager
        .start(project_id, ArtifactKind::AreaPaths)
        .await
        .unwrap();
    let second = wait_terminal(&manager, second).await;
    assert_eq!(second.status, JobStatus::Failed);

    let project = store.projects.get(project_id).await.unwrap();
    let summary = &project.artifact_summaries[&ArtifactKind::AreaPaths];
    assert!(!summary.extracted);
    assert!(summary.error.as_deref().unwrap().contains("timeout"));

    // Both extractions remain in history, newest first.
    let history = store.jobs.list_for_project(project_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, JobStatus::Failed);
    assert_eq!(history[1].status, JobStatus::Completed);
}

#[tokio::test]
async fn test_duplicate_start_rejected_for_every_kind() {
    let source =
        MockArtifactSource::new().with_latency(std::time::Duration::from_millis(150));
    let (manager, _store, project_id) = seed(source).await;

    for kind in [
        ArtifactKind::AreaPaths,
        ArtifactKind::WorkItems,
        ArtifactKind::Repositories,
    ] {
        let job_id = manager.start(project_id, kind).await.unwrap();
        let second = manager.start(project_id, kind).await;
        assert!(
            matches!(second, Err(Error::Conflict(_))),
            "expected conflict for {}",
            kind
        );
        wait_terminal(&manager, job_id).await;
    }
}

#[tokio::test]
async fn test_batch_start_reports_per_kind_outcomes() {
    let source = MockArtifactSource::new()
        .with_repositories(vec![RepositoryRecord {
            id: "r1".into(),
            name: "api".into(),
            web_url: "https://example.com/api".into(),
            default_branch: Some("refs/heads/main".into()),
            size: 10,
        }])
        .with_failure("wiki_pages", MockFailure::auth("PAT lacks wiki scope"));
    let (manager, store, project_id) = seed(source).await;

    let outcomes = manager
        .start_batch(
            project_id,
            &[
                ArtifactKind::Repositories,
                ArtifactKind::WikiPages,
                // Duplicate kind in one request: second entry conflicts.
                ArtifactKind::Repositories,
            ],
        )
        .await;

    assert_eq!(outcomes.len(), 3);
    let repos_job = *outcomes[0].result.as_ref().unwrap();
    let wiki_job = *outcomes[1].result.as_ref().unwrap();
    assert!(matches!(outcomes[2].result, Err(Error::Conflict(_))));

    let repos = wait_terminal(&manager, repos_job).await;
    let wiki = wait_terminal(&manager, wiki_job).await;
    assert_eq!(repos.status, JobStatus::Completed);
    assert_eq!(repos.extracted_items, 1);
    assert_eq!(wiki.status, JobStatus::Failed);

    // Partial failure is surfaced per artifact, not as one blanket failure.
    let project = store.projects.get(project_id).await.unwrap();
    assert!(project.artifact_summaries[&ArtifactKind::Repositories].extracted);
    assert!(!project.artifact_summaries[&ArtifactKind::WikiPages].extracted);
    assert_eq!(project.repo_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_deadline_closes_hung_job() {
    let source = MockArtifactSource::new().with_latency(std::time::Duration::from_secs(3600));
    let store = Store::in_memory();
    let project_id = store
        .projects
        .insert(CreateProjectRequest {
            external_id: "e".into(),
            name: "Alpha".into(),
            description: None,
            process_template: None,
            source_control: None,
            visibility: None,
        })
        .await
        .unwrap();
    let manager = ExtractionManager::new(store.clone(), Arc::new(source))
        .with_config(ManagerConfig::default().with_fetch_timeout(2));

    let job_id = manager
        .start(project_id, ArtifactKind::TestPlans)
        .await
        .unwrap();
    let job = wait_terminal(&manager, job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.as_deref().unwrap().contains("timed out"));
    assert!(job.completed_at.is_some());
}
