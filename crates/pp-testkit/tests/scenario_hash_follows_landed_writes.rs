use serde_json::json;

use pp_schemas::Collection;
use pp_store::{hash_key, MemoryDocumentStore, MemoryHandle};
use pp_sync::SyncRunner;
use pp_testkit::{brands, fixed_now, FlakyDocumentStore, StaticUpstream};

fn upstream() -> StaticUpstream {
    StaticUpstream::new().with_brands(brands(&["Shell", "BP", "Ampol"]))
}

async fn copy_of(handle: &MemoryHandle) -> MemoryDocumentStore {
    let mut store = MemoryDocumentStore::new();
    for c in [Collection::Brands, Collection::Hash] {
        for (key, doc) in handle.documents(c).await {
            store = store.with_document(c, &key, doc);
        }
    }
    store
}

#[tokio::test]
async fn rejected_write_keeps_previous_hash_until_a_clean_run() {
    let brands_hash = hash_key(Collection::Brands);
    let seeded = MemoryDocumentStore::new().with_document(
        Collection::Hash,
        &brands_hash,
        json!({ "hash": "previous" }),
    );
    let document = FlakyDocumentStore::new(seeded).failing_key(Collection::Brands, "BP");
    let handle = document.handle();

    let mut first = SyncRunner::new(Box::new(upstream()), Box::new(document)).at(fixed_now());
    let r1 = first.run().await;

    let b1 = r1.result(Collection::Brands).unwrap();
    assert_eq!(b1.write_failures.len(), 1);
    assert_eq!(b1.hash, None);
    assert_eq!(
        handle.documents(Collection::Hash).await[&brands_hash],
        json!({ "hash": "previous" })
    );

    // Second run against what actually landed, with the fault cleared.
    let retry = copy_of(&handle).await;
    let retry_handle = retry.handle();
    let mut second = SyncRunner::new(Box::new(upstream()), Box::new(retry)).at(fixed_now());
    let r2 = second.run().await;

    let b2 = r2.result(Collection::Brands).unwrap();
    assert!(b2.write_failures.is_empty());
    assert_eq!(b2.enabled, vec![json!({"name": "BP", "active": true, "order": 1})]);
    let written = b2.hash.clone().unwrap();
    assert_ne!(written, "previous");
    assert_eq!(
        retry_handle.documents(Collection::Hash).await[&brands_hash],
        json!({ "hash": written })
    );

    // A clean first run over the same upstream ends on the same hash.
    let mut clean = SyncRunner::new(Box::new(upstream()), Box::new(MemoryDocumentStore::new()))
        .at(fixed_now());
    let r3 = clean.run().await;
    assert_eq!(r3.result(Collection::Brands).unwrap().hash, Some(written));
}
