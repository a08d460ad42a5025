use pp_schemas::Collection;
use pp_store::{MemoryDocumentStore, MemoryRealtimeStore};
use pp_sync::SyncRunner;
use pp_testkit::{brands, fixed_now, price, StaticUpstream};

#[tokio::test]
async fn dry_run_reports_the_diff_without_writing() {
    let upstream = StaticUpstream::new()
        .with_brands(brands(&["Shell"]))
        .with_prices(vec![price("1", "E10", 179.9, 0)]);
    let document = MemoryDocumentStore::new()
        .with_entities(&brands(&["Caltex"]))
        .with_prices(&[price("2", "E10", 169.9, 31)]);
    let realtime = MemoryRealtimeStore::new();
    let doc_handle = document.handle();
    let rt_handle = realtime.handle();

    let mut runner = SyncRunner::new(Box::new(upstream), Box::new(document))
        .with_realtime(Box::new(realtime))
        .dry_run(true)
        .at(fixed_now());
    let report = runner.run().await;

    assert!(report.dry_run);
    let b = report.result(Collection::Brands).unwrap();
    assert_eq!(b.enabled.len(), 1);
    assert_eq!(b.disabled.len(), 1);
    let p = report.result(Collection::Prices).unwrap();
    assert_eq!((p.updated, p.expired), (1, 1));

    assert!(doc_handle.writes().await.is_empty());
    assert!(rt_handle.writes().await.is_empty());
    assert_eq!(doc_handle.documents(Collection::Prices).await.len(), 1);
}
