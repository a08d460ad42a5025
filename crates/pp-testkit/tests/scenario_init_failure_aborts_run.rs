use pp_fuelcheck::FuelCheckError;
use pp_schemas::Collection;
use pp_store::MemoryDocumentStore;
use pp_sync::{RunStatus, SyncRunner};
use pp_testkit::{brands, fixed_now, FlakyDocumentStore, FlakyRealtimeStore, StaticUpstream};

#[tokio::test]
async fn every_init_failure_is_collected_and_nothing_is_written() {
    let upstream = StaticUpstream::new()
        .with_brands(brands(&["Shell"]))
        .failing(FuelCheckError::Unauthorized("invalid client".into()));
    let document = FlakyDocumentStore::new(
        MemoryDocumentStore::new().with_entities(&brands(&["Caltex"])),
    )
    .failing_init("connection refused");
    let realtime = FlakyRealtimeStore::new();
    let doc_handle = document.handle();
    let rt_handle = realtime.handle();

    let mut runner = SyncRunner::new(Box::new(upstream), Box::new(document))
        .with_realtime(Box::new(realtime))
        .at(fixed_now());
    let report = runner.run().await;

    assert_eq!(report.status(), RunStatus::InitFailed);
    assert_eq!(report.exit_code(false), 2);
    assert!(report.results.is_empty());

    let collaborators: Vec<&str> = report
        .init_errors
        .iter()
        .map(|e| e.collaborator.as_str())
        .collect();
    assert_eq!(collaborators, vec!["static-upstream", "flaky-document"]);
    assert!(report.init_errors[0].message.contains("invalid client"));
    assert!(report.init_errors[1].message.contains("connection refused"));

    assert!(doc_handle.writes().await.is_empty());
    assert!(rt_handle.writes().await.is_empty());
}

#[tokio::test]
async fn realtime_failure_alone_aborts_the_run() {
    let document = MemoryDocumentStore::new();
    let doc_handle = document.handle();

    let mut runner = SyncRunner::new(
        Box::new(StaticUpstream::new().with_brands(brands(&["Shell"]))),
        Box::new(document),
    )
    .with_realtime(Box::new(FlakyRealtimeStore::new().failing_init("401 Permission denied")))
    .at(fixed_now());
    let report = runner.run().await;

    assert_eq!(report.init_errors.len(), 1);
    assert_eq!(report.init_errors[0].collaborator, "flaky-realtime");
    assert!(report.result(Collection::Brands).is_none());
    assert!(doc_handle.writes().await.is_empty());
}
