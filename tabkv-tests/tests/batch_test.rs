/// Batch operation tests
///
/// Result lists must line up with request lists one to one, with failures
/// isolated to the items that caused them.

use proptest::prelude::*;
use tabkv_client::{BatchRequest, Error, RejectRules, Status, TableId, WriteItem};
use tabkv_test_utils::{populate, MockDataGenerator, TestCluster};

#[test]
fn test_empty_batch() {
    let cluster = TestCluster::new();
    let mut client = cluster.client();
    assert!(client.batch(BatchRequest::new()).unwrap().is_empty());
    assert!(client.multi_read(&[]).unwrap().is_empty());
    assert!(client.multi_write(&[]).unwrap().is_empty());
}

#[test]
fn test_multi_read_matches_single_reads() {
    let cluster = TestCluster::new();
    let table = cluster.table("multi", 8);
    let mut client = cluster.client();
    let expected = populate(&mut client, table, 300);

    let keys: Vec<(TableId, &[u8])> = expected.keys().map(|k| (table, k.as_bytes())).collect();
    let objects = client.multi_read(&keys).unwrap();

    assert_eq!(objects.len(), expected.len());
    for ((key, value), object) in expected.iter().zip(&objects) {
        let object = object.as_ref().unwrap();
        assert_eq!(&object.key_str(), key);
        assert_eq!(&object.value_str(), value);
        assert_eq!(client.read(table, key).unwrap().version, object.version);
    }
}

#[test]
fn test_failures_are_isolated() {
    let cluster = TestCluster::new();
    let table = cluster.table("isolated", 4);
    let mut client = cluster.client();
    client.write(table, "existing", "v").unwrap();
    let v2 = client.write(table, "existing", "v2").unwrap();

    let request = BatchRequest::new()
        .write(table, "fresh", "1")
        .write_with_rules(table, "existing", "x", RejectRules::new().reject_if_exists())
        .read(table, "missing")
        .read_with_rules(table, "existing", RejectRules::new().reject_if_version_eq(v2))
        .read(TableId(9999), "k")
        .read(table, "existing");
    let results = client.batch(request).unwrap();

    assert_eq!(results.len(), 6);
    assert_eq!(results[0].status, Status::Ok);
    assert_eq!(results[0].version, 1);
    assert_eq!(results[1].status, Status::ObjectExists);
    assert_eq!(results[1].version, v2);
    assert_eq!(results[2].status, Status::ObjectDoesntExist);
    assert_eq!(results[3].status, Status::WrongVersion);
    assert!(results[3].object.is_none());
    assert_eq!(results[4].status, Status::TableDoesntExist);
    assert_eq!(results[5].object.as_ref().unwrap().value_str(), "v2");

    // The rejected write left the stored object alone
    assert_eq!(client.read(table, "existing").unwrap().version, v2);
}

#[test]
fn test_all_unknown_tables_fail_whole_batch() {
    let cluster = TestCluster::new();
    let mut client = cluster.client();
    let request = BatchRequest::new().read(TableId(41), "a").write(TableId(42), "b", "c");
    assert!(matches!(client.batch(request), Err(Error::TableDoesntExist(_))));
}

#[test]
fn test_batch_spans_tables() {
    let cluster = TestCluster::new();
    let users = cluster.table("users", 2);
    let orders = cluster.table("orders", 3);
    let mut client = cluster.client();

    let items = [
        WriteItem::new(users, b"u1", b"alice"),
        WriteItem::new(orders, b"o1", b"book"),
        WriteItem::new(users, b"u2", b"bob"),
    ];
    assert!(client.multi_write(&items).unwrap().iter().all(|r| r.is_ok()));

    let keys: [(TableId, &[u8]); 3] = [(orders, &b"o1"[..]), (users, &b"u2"[..]), (orders, &b"u1"[..])];
    let objects = client.multi_read(&keys).unwrap();
    assert_eq!(objects[0].as_ref().unwrap().value_str(), "book");
    assert_eq!(objects[1].as_ref().unwrap().value_str(), "bob");
    assert!(objects[2].is_none());
}

#[test]
fn test_invalid_items_fail_individually() {
    let cluster = TestCluster::new();
    let table = cluster.table("invalid", 1);
    let mut client = cluster.client();

    let request = BatchRequest::new().write(table, "", "empty key").write(table, "ok", "v");
    let results = client.batch(request).unwrap();
    assert_eq!(results[0].status, Status::InvalidArgument);
    assert_eq!(results[1].status, Status::Ok);
}

#[test]
fn test_large_batch_conditional_writes() {
    let cluster = TestCluster::new();
    let table = cluster.table("large", 16);
    let mut client = cluster.client();
    let mut gen = MockDataGenerator::new();
    let keys: Vec<String> = (0..500).map(|_| gen.simple_key()).collect();

    let create_once = RejectRules::new().reject_if_exists();
    let build = |keys: &[String]| {
        keys.iter().fold(BatchRequest::with_capacity(keys.len()), |req, k| {
            req.write_with_rules(table, k, MockDataGenerator::value_for(k), create_once)
        })
    };

    let first = client.batch(build(&keys)).unwrap();
    assert!(first.iter().all(|r| r.status == Status::Ok && r.version == 1));

    let second = client.batch(build(&keys)).unwrap();
    assert_eq!(second.len(), keys.len());
    assert!(second.iter().all(|r| r.status == Status::ObjectExists && r.version == 1));
    assert_eq!(cluster.object_count(table), 500);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_results_align_with_requests(present in prop::collection::vec(any::<bool>(), 0..80)) {
        let cluster = TestCluster::new();
        let table = cluster.table("prop-batch", 4);
        let mut client = cluster.client();

        let keys: Vec<String> = (0..present.len()).map(|i| format!("k{}", i)).collect();
        for (key, _) in keys.iter().zip(&present).filter(|(_, p)| **p) {
            client.write(table, key, key).unwrap();
        }

        let request = keys
            .iter()
            .fold(BatchRequest::new(), |req, k| req.read(table, k));
        let results = client.batch(request).unwrap();

        prop_assert_eq!(results.len(), keys.len());
        for ((key, present), result) in keys.iter().zip(&present).zip(&results) {
            if *present {
                prop_assert_eq!(result.object.as_ref().map(|o| o.value_str()), Some(key.clone()));
            } else {
                prop_assert_eq!(result.status, Status::ObjectDoesntExist);
            }
        }
    }
}
