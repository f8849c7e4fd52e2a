/// Table enumeration tests
///
/// Every object in a table must be returned exactly once, across tablet
/// boundaries, empty tablets and page-size splits, and the scan must end
/// with the terminal token.

use proptest::prelude::*;
use std::collections::BTreeMap;
use tabkv_client::{ContinuationToken, EnumeratorState, Error};
use tabkv_test_utils::{populate, scan_all, MockDataGenerator, TestCluster};

#[test]
fn test_enumerate_empty_table() {
    let cluster = TestCluster::new();
    let table = cluster.table("empty", 16);
    let client = cluster.client();

    let mut scan = client.enumerate(table);
    assert!(!scan.has_next().unwrap());
    assert_eq!(scan.state(), EnumeratorState::Exhausted);
    assert_eq!(scan.next_token(), ContinuationToken::END);
    assert!(scan.next().is_none());
}

#[test]
fn test_enumerate_every_object_once() {
    for span in [1, 2, 7, 32] {
        let cluster = TestCluster::with_page_bytes(256);
        let table = cluster.table("scan", span);
        let mut client = cluster.client();
        let expected = populate(&mut client, table, 400);

        assert_eq!(scan_all(&client, table), expected, "span {}", span);
    }
}

#[test]
fn test_sparse_table_skips_empty_tablets() {
    let cluster = TestCluster::new();
    let table = cluster.table("sparse", 64);
    let mut client = cluster.client();
    client.write(table, "lonely", "object").unwrap();

    let objects: Vec<_> = client.enumerate(table).collect::<Result<_, _>>().unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].key_str(), "lonely");
    assert_eq!(objects[0].version, 1);
}

#[test]
fn test_bulk_fetch_pages() {
    let cluster = TestCluster::with_page_bytes(512);
    let table = cluster.table("bulk", 4);
    let mut client = cluster.client();
    let expected = populate(&mut client, table, 250);

    let mut seen = BTreeMap::new();
    let mut token = ContinuationToken::START;
    let mut pages = 0;
    loop {
        let page = client.get_table_objects(table, token).unwrap();
        if !page.is_last() {
            assert!(!page.objects.is_empty(), "only the last page may be empty");
        }
        for object in page.objects {
            assert!(seen.insert(object.key_str(), object.value_str()).is_none());
        }
        pages += 1;
        if page.next_token.is_end() {
            break;
        }
        token = page.next_token;
        assert!(pages < 10_000, "scan did not terminate");
    }

    assert!(pages > 4);
    assert_eq!(seen, expected);
}

#[test]
fn test_resume_from_saved_token() {
    let cluster = TestCluster::with_page_bytes(200);
    let table = cluster.table("resume", 3);
    let mut client = cluster.client();
    let expected = populate(&mut client, table, 120);

    // Read a little, save the position, then finish with a new enumerator.
    let first = client.get_table_objects(table, ContinuationToken::START).unwrap();
    let second = client.get_table_objects(table, first.next_token).unwrap();
    let mut seen: BTreeMap<String, String> = first
        .objects
        .iter()
        .chain(&second.objects)
        .map(|o| (o.key_str(), o.value_str()))
        .collect();

    for object in client.enumerate_from(table, second.next_token) {
        let object = object.unwrap();
        assert!(seen.insert(object.key_str(), object.value_str()).is_none());
    }
    assert_eq!(seen, expected);
}

#[test]
fn test_removed_objects_not_enumerated() {
    let cluster = TestCluster::new();
    let table = cluster.table("removed", 4);
    let mut client = cluster.client();
    let mut expected = populate(&mut client, table, 50);

    let doomed: Vec<String> = expected.keys().step_by(3).cloned().collect();
    for key in &doomed {
        client.remove(table, key).unwrap();
        expected.remove(key);
    }
    assert_eq!(scan_all(&client, table), expected);
}

#[test]
fn test_oversized_object_gets_own_page() {
    let cluster = TestCluster::with_page_bytes(64);
    let table = cluster.table("big", 1);
    let mut client = cluster.client();
    let big = MockDataGenerator::sized_value(1000);
    client.write(table, "big", &big).unwrap();
    client.write(table, "small", "s").unwrap();

    let objects: Vec<_> = client.enumerate(table).collect::<Result<_, _>>().unwrap();
    assert_eq!(objects.len(), 2);
    let big_obj = objects.iter().find(|o| o.key_str() == "big").unwrap();
    assert_eq!(big_obj.value.len(), 1000);
}

#[test]
fn test_next_object_after_exhaustion() {
    let cluster = TestCluster::new();
    let table = cluster.table("drain", 2);
    let mut client = cluster.client();
    populate(&mut client, table, 3);

    let mut scan = client.enumerate(table);
    for _ in 0..3 {
        assert!(scan.has_next().unwrap());
        scan.next_object().unwrap();
    }
    assert!(!scan.has_next().unwrap());
    assert_eq!(scan.next_object(), Err(Error::IterationExhausted));
    assert_eq!(scan.next_object(), Err(Error::IterationExhausted));
}

#[test]
fn test_enumerate_dropped_table() {
    let cluster = TestCluster::new();
    let table = cluster.table("dropped", 2);
    let mut client = cluster.client();
    client.drop_table("dropped").unwrap();

    let mut scan = client.enumerate(table);
    assert!(matches!(scan.next(), Some(Err(Error::TableDoesntExist(_)))));
    assert!(scan.next().is_none());
}

#[test]
fn test_invalid_token_rejected() {
    let cluster = TestCluster::new();
    let table = cluster.table("tokens", 1);
    let mut client = cluster.client();
    assert!(matches!(
        client.get_table_objects(table, ContinuationToken(u64::MAX - 1)),
        Err(Error::InvalidArgument(_))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_scan_returns_each_object_once(
        count in 0usize..200,
        span in 1u32..20,
        page_bytes in 40usize..600,
    ) {
        let cluster = TestCluster::with_page_bytes(page_bytes);
        let table = cluster.table("prop-scan", span);
        let mut client = cluster.client();
        let expected = populate(&mut client, table, count);

        prop_assert_eq!(scan_all(&client, table), expected);
    }
}
