//! End-to-end tests of the registry, pipeline, and state store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::tempdir;

use ticketflow::error::{StepError, WorkflowError};
use ticketflow::pipeline::{FailureCheckpoint, FnStep, Pipeline};
use ticketflow::store::{state_key, ContextRecord, DiskBlobStore, MemoryBlobStore, StateStore};
use ticketflow::workflow::{ContextHeader, WorkflowContext, WorkflowRegistry, WorkflowStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DemoContext {
    header: ContextHeader,
    input: String,
    looked_up: Option<String>,
    enriched: Option<String>,
    rendered: Option<String>,
}

impl DemoContext {
    fn new(ticket: &str, input: &str) -> Self {
        Self {
            header: ContextHeader::with_claim_ticket("demo", ticket),
            input: input.to_string(),
            looked_up: None,
            enriched: None,
            rendered: None,
        }
    }
}

impl WorkflowContext for DemoContext {
    const TYPE_TAG: &'static str = "demo";

    fn header(&self) -> &ContextHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ContextHeader {
        &mut self.header
    }
}

/// `lookup`, `enrich`, `render`; `enrich` fails when the input is "boom".
fn demo_pipeline(store: StateStore, policy: FailureCheckpoint) -> Pipeline<DemoContext> {
    Pipeline::builder(store)
        .step(FnStep::new("lookup", |mut ctx: DemoContext| async move {
            ctx.looked_up = Some(format!("record:{}", ctx.input));
            Ok::<_, StepError>(ctx)
        }))
        .step(FnStep::new("enrich", |mut ctx: DemoContext| async move {
            if ctx.input == "boom" {
                return Err::<DemoContext, StepError>("enrichment service unavailable".into());
            }
            ctx.enriched = ctx.looked_up.as_ref().map(|r| r.to_uppercase());
            Ok(ctx)
        }))
        .step(FnStep::new("render", |mut ctx: DemoContext| async move {
            ctx.rendered = ctx.enriched.as_ref().map(|e| format!("<p>{}</p>", e));
            Ok::<_, StepError>(ctx)
        }))
        .failure_checkpoint(policy)
        .build()
}

fn setup(policy: FailureCheckpoint) -> (Arc<MemoryBlobStore>, WorkflowRegistry) {
    let blobs = Arc::new(MemoryBlobStore::with_history());
    let store = StateStore::new(blobs.clone());
    let mut registry = WorkflowRegistry::new(store.clone());
    registry.register("DemoWorkflow", demo_pipeline(store, policy));
    (blobs, registry)
}

async fn history(blobs: &MemoryBlobStore, ticket: &str) -> Vec<DemoContext> {
    blobs
        .history(&state_key(ticket))
        .await
        .iter()
        .map(|bytes| ContextRecord::from_bytes(bytes).unwrap().decode().unwrap())
        .collect()
}

#[tokio::test]
async fn demo_pipeline_completes_with_checkpoint_per_step() {
    let (blobs, registry) = setup(FailureCheckpoint::default());

    let done = registry.run(DemoContext::new("T1", "song")).await.unwrap();
    assert_eq!(done.status(), Some(WorkflowStatus::Completed));
    assert_eq!(done.rendered.as_deref(), Some("<p>RECORD:SONG</p>"));

    let status = registry.status("T1").await.unwrap();
    assert_eq!(status.claim_ticket, "T1");
    assert_eq!(status.status, Some(WorkflowStatus::Completed));

    let checkpoints = history(&blobs, "T1").await;
    assert_eq!(checkpoints.len(), 5);
    assert!(checkpoints[0].looked_up.is_none());
    assert_eq!(checkpoints[1].looked_up.as_deref(), Some("record:song"));
    assert!(checkpoints[1].enriched.is_none());
    assert_eq!(checkpoints[2].enriched.as_deref(), Some("RECORD:SONG"));
    assert!(checkpoints[2].rendered.is_none());
    assert_eq!(checkpoints[3].rendered, done.rendered);

    let mut expected_final = checkpoints[3].clone();
    expected_final.header = done.header.clone();
    assert_eq!(checkpoints[4], expected_final);
    assert_eq!(checkpoints[4], done);
}

#[tokio::test]
async fn failure_leaving_running_keeps_last_good_checkpoint() {
    let (_, registry) = setup(FailureCheckpoint::LeaveRunning);

    let err = registry.run(DemoContext::new("T1", "boom")).await.unwrap_err();
    match &err {
        WorkflowError::ExecutionFailure { step, .. } => assert_eq!(step.as_deref(), Some("enrich")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!err.is_user_error());

    let stored: DemoContext = registry.content("T1").await.unwrap();
    assert_eq!(stored.status(), Some(WorkflowStatus::Running));
    assert_eq!(stored.looked_up.as_deref(), Some("record:boom"));
    assert!(stored.enriched.is_none());
    assert!(stored.rendered.is_none());
}

#[tokio::test]
async fn failure_marking_failed_keeps_last_good_data() {
    let (blobs, registry) = setup(FailureCheckpoint::MarkFailed);

    let err = registry.run(DemoContext::new("T1", "boom")).await.unwrap_err();
    let diagnostic: DemoContext = err.context_as().unwrap();
    assert_eq!(diagnostic.status(), Some(WorkflowStatus::Failed));

    let stored: DemoContext = registry.content("T1").await.unwrap();
    assert_eq!(stored, diagnostic);
    assert_eq!(stored.looked_up.as_deref(), Some("record:boom"));
    assert!(stored.enriched.is_none());

    // RUNNING, lookup, FAILED
    assert_eq!(history(&blobs, "T1").await.len(), 3);
}

#[tokio::test]
async fn find_is_idempotent() {
    let store = StateStore::in_memory();
    let ctx = DemoContext::new("T1", "song");
    store.save("T1", &ctx).await.unwrap();

    let first: DemoContext = store.find("T1").await.unwrap();
    let second: DemoContext = store.find("T1").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, ctx);
}

#[tokio::test]
async fn delete_requires_owning_workflow() {
    let (_, registry) = setup(FailureCheckpoint::default());
    registry.run(DemoContext::new("T1", "song")).await.unwrap();

    let err = registry.delete("song-export", "T1").await.unwrap_err();
    assert_eq!(err.code(), "WFE-003");
    assert!(err.is_user_error());
    assert!(registry.status("T1").await.is_ok());

    registry.delete("demo", "T1").await.unwrap();
    let err = registry.status("T1").await.unwrap_err();
    assert_eq!(err.code(), "WFE-002");
}

#[tokio::test]
async fn alias_runs_same_pipeline() {
    let (_, mut registry) = setup(FailureCheckpoint::default());
    registry.alias("legacy-demo", "DemoWorkflow");

    let canonical = registry.resolve::<DemoContext>("demo").unwrap();
    let aliased = registry.resolve::<DemoContext>("legacy-demo").unwrap();
    assert!(Arc::ptr_eq(&canonical, &aliased));

    let mut initial = DemoContext::new("T1", "song");
    initial.header = ContextHeader::with_claim_ticket("legacy-demo", "T1");
    let done = registry.run(initial).await.unwrap();
    assert_eq!(done.status(), Some(WorkflowStatus::Completed));
}

#[tokio::test]
async fn unknown_workflow_is_rejected() {
    let (_, registry) = setup(FailureCheckpoint::default());
    let mut initial = DemoContext::new("T1", "song");
    initial.header = ContextHeader::with_claim_ticket("missing", "T1");

    let err = registry.run(initial).await.unwrap_err();
    assert_eq!(err.code(), "WFE-004");
    assert!(registry.status("T1").await.is_err());
}

#[tokio::test]
async fn disk_store_end_to_end() {
    let dir = tempdir().unwrap();
    let state_dir = dir.path().join("state");
    let store = StateStore::new(Arc::new(DiskBlobStore::new(&state_dir)));
    let mut registry = WorkflowRegistry::new(store.clone());
    registry.register("demo", demo_pipeline(store, FailureCheckpoint::default()));

    registry.run(DemoContext::new("T1", "song")).await.unwrap();

    let path = state_dir.join("T1_state.json");
    assert!(path.exists());
    let record = ContextRecord::from_bytes(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(record.type_tag, "demo");
    assert_eq!(record.workflow_name, "demo");
    assert_eq!(record.status, Some(WorkflowStatus::Completed));

    // A fresh registry over the same directory sees the stored run
    let reopened = WorkflowRegistry::new(StateStore::new(Arc::new(DiskBlobStore::new(&state_dir))));
    let status = reopened.status("T1").await.unwrap();
    assert_eq!(status.status, Some(WorkflowStatus::Completed));

    reopened.delete("demo", "T1").await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn distinct_tickets_run_concurrently() {
    let (_, registry) = setup(FailureCheckpoint::default());
    let registry = Arc::new(registry);

    let handles: Vec<_> = (0..16)
        .map(|n| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let ticket = format!("T{}", n);
                registry.run(DemoContext::new(&ticket, &format!("song{}", n))).await
            })
        })
        .collect();

    for handle in handles {
        let done = handle.await.unwrap().unwrap();
        assert_eq!(done.status(), Some(WorkflowStatus::Completed));
    }

    for n in 0..16 {
        let stored: DemoContext = registry.content(&format!("T{}", n)).await.unwrap();
        assert_eq!(stored.looked_up, Some(format!("record:song{}", n)));
    }
}

#[tokio::test]
async fn delete_abandons_running_ticket() {
    let (_, registry) = setup(FailureCheckpoint::LeaveRunning);
    registry.run(DemoContext::new("T1", "boom")).await.unwrap_err();

    let deleted = registry.delete("demo", "T1").await.unwrap();
    assert_eq!(deleted.claim_ticket, "T1");
    assert_eq!(deleted.status, Some(WorkflowStatus::Running));

    let err = registry.status("T1").await.unwrap_err();
    assert_eq!(err.code(), "WFE-002");
}

#[tokio::test]
async fn delete_removes_failed_ticket() {
    let (_, registry) = setup(FailureCheckpoint::MarkFailed);
    registry.run(DemoContext::new("T1", "boom")).await.unwrap_err();

    let deleted = registry.delete("demo", "T1").await.unwrap();
    assert_eq!(deleted.status, Some(WorkflowStatus::Failed));

    let err = registry.status("T1").await.unwrap_err();
    assert_eq!(err.code(), "WFE-002");
}

#[tokio::test]
async fn disk_store_accepts_dotted_ticket() {
    let dir = tempdir().unwrap();
    let mut registry = WorkflowRegistry::new(StateStore::new(Arc::new(DiskBlobStore::new(dir.path()))));
    let pipeline = registry
        .pipeline::<DemoContext>()
        .step(FnStep::new("lookup", |mut ctx: DemoContext| async move {
            ctx.looked_up = Some(ctx.input.clone());
            Ok::<_, StepError>(ctx)
        }))
        .build();
    registry.register("demo", pipeline);

    let done = registry.run(DemoContext::new("release..1", "song")).await.unwrap();
    assert_eq!(done.status(), Some(WorkflowStatus::Completed));
    assert!(dir.path().join("release..1_state.json").exists());

    let status = registry.status("release..1").await.unwrap();
    assert_eq!(status.status, Some(WorkflowStatus::Completed));
}
