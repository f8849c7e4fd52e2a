/// Integration tests for the TabKV client
///
/// These tests drive a `Client` session end to end against an in-process
/// cluster.

use std::sync::Arc;
use tabkv_client::{BatchRequest, Client, ContinuationToken, Error, RejectRules, Status, WriteItem};
use tabkv_core::{counter_value, ClientConfig, ClusterConfig, MemoryCluster};

fn test_client() -> Client {
    Client::with_cluster(Arc::new(MemoryCluster::new()))
}

#[test]
fn test_write_read_remove() {
    let mut client = test_client();
    let table = client.create_table("users").unwrap();

    let version = client.write(table, "user#123", "Alice").unwrap();
    let obj = client.read(table, "user#123").unwrap();
    assert_eq!(obj.value_str(), "Alice");
    assert_eq!(obj.version, version);

    assert_eq!(client.remove(table, "user#123").unwrap(), version);
    assert_eq!(client.read(table, "user#123"), Err(Error::ObjectDoesntExist));
}

#[test]
fn test_conditional_write() {
    let mut client = test_client();
    let table = client.create_table("cas").unwrap();
    let v1 = client.write(table, "k", "one").unwrap();

    let absent = RejectRules::new().reject_if_exists();
    assert_eq!(client.write_with_rules(table, "k", "two", &absent), Err(Error::ObjectExists));
    assert_eq!(client.read(table, "k").unwrap().version, v1);

    let not_v1 = RejectRules::new().reject_if_version_eq(v1);
    assert_eq!(client.write_with_rules(table, "k", "two", &not_v1), Err(Error::WrongVersion));

    let not_other = RejectRules::new().reject_if_version_eq(v1 + 10);
    let v2 = client.write_with_rules(table, "k", "two", &not_other).unwrap();
    assert!(v2 > v1);
}

#[test]
fn test_conditional_read_and_remove() {
    let mut client = test_client();
    let table = client.create_table("t").unwrap();
    client.write(table, "k", "v").unwrap();

    let exists = RejectRules::new().reject_if_exists();
    assert_eq!(client.read_with_rules(table, "k", &exists), Err(Error::ObjectExists));

    let must_exist = RejectRules::new().reject_if_doesnt_exist();
    assert_eq!(
        client.remove_with_rules(table, "missing", &must_exist),
        Err(Error::ObjectDoesntExist)
    );
    assert_eq!(client.remove_with_rules(table, "k", &must_exist).unwrap(), 1);
}

#[test]
fn test_increment() {
    let mut client = test_client();
    let table = client.create_table("counters").unwrap();
    client.write(table, "hits", counter_value(41)).unwrap();

    assert_eq!(client.increment(table, "hits", 1).unwrap(), 42);
    assert_eq!(client.read(table, "hits").unwrap().as_counter(), Some(42));
}

#[test]
fn test_table_admin() {
    let mut client = test_client();
    let id = client.create_table("admin").unwrap();
    assert_eq!(client.get_table_id("admin").unwrap(), id);
    assert_eq!(client.create_table("admin").unwrap(), id);

    client.drop_table("admin").unwrap();
    assert!(matches!(client.get_table_id("admin"), Err(Error::TableDoesntExist(_))));
    client.drop_table("admin").unwrap();
}

#[test]
fn test_batch_mixed() {
    let mut client = test_client();
    let table = client.create_table_with_span("batch", 4).unwrap();
    client.write(table, "a", "1").unwrap();

    let request = BatchRequest::new()
        .read(table, "a")
        .write_with_rules(table, "a", "x", RejectRules::new().reject_if_exists())
        .write(table, "b", "2")
        .read(table, "c");
    let results = client.batch(request).unwrap();

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].object.as_ref().unwrap().value_str(), "1");
    assert_eq!(results[1].status, Status::ObjectExists);
    assert_eq!(results[1].version, 1);
    assert_eq!(results[2].status, Status::Ok);
    assert_eq!(results[3].status, Status::ObjectDoesntExist);
    assert_eq!(client.read(table, "a").unwrap().value_str(), "1");
}

#[test]
fn test_multi_read_write() {
    let mut client = test_client();
    let table = client.create_table("multi").unwrap();

    let items = [
        WriteItem::new(table, b"k1", b"v1"),
        WriteItem::new(table, b"k2", b"v2"),
        WriteItem::new(table, b"k1", b"again").with_rules(RejectRules::new().reject_if_exists()),
    ];
    let written = client.multi_write(&items).unwrap();
    assert!(written[0].is_ok());
    assert!(written[1].is_ok());
    assert_eq!(written[2].status, Status::ObjectExists);

    let keys: [(_, &[u8]); 3] = [(table, &b"k1"[..]), (table, &b"nope"[..]), (table, &b"k2"[..])];
    let objects = client.multi_read(&keys).unwrap();
    assert_eq!(objects[0].as_ref().unwrap().value_str(), "v1");
    assert!(objects[1].is_none());
    assert_eq!(objects[2].as_ref().unwrap().value_str(), "v2");
}

#[test]
fn test_enumerate_and_resume() {
    let cluster = MemoryCluster::with_config(ClusterConfig::new().with_max_page_bytes(128));
    let mut client = Client::with_cluster(Arc::new(cluster));
    let table = client.create_table_with_span("scan", 3).unwrap();
    for i in 0..50 {
        client.write(table, format!("key{:03}", i), format!("value{}", i)).unwrap();
    }

    let mut keys: Vec<String> = client
        .enumerate(table)
        .map(|o| o.unwrap().key_str())
        .collect();
    keys.sort();
    let expected: Vec<String> = (0..50).map(|i| format!("key{:03}", i)).collect();
    assert_eq!(keys, expected);

    // Page by page with explicit tokens covers the same objects.
    let first = client.get_table_objects(table, ContinuationToken::START).unwrap();
    assert!(!first.objects.is_empty());
    assert!(!first.is_last());
    let rest: Vec<_> = client
        .enumerate_from(table, first.next_token)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(first.objects.len() + rest.len(), 50);
}

#[test]
fn test_enumerate_empty_table() {
    let mut client = test_client();
    let table = client.create_table_with_span("empty", 8).unwrap();

    let page = client.get_table_objects(table, ContinuationToken::START).unwrap();
    assert!(page.objects.is_empty());
    assert!(page.is_last());

    let mut scan = client.enumerate(table);
    assert!(!scan.has_next().unwrap());
    assert_eq!(scan.next_object(), Err(Error::IterationExhausted));
    assert!(scan.next_token().is_end());
}

#[test]
fn test_connect_named_cluster() {
    let config = ClientConfig::new().with_cluster_name("client-integration");
    let mut writer = Client::connect(config.clone()).unwrap();
    let table = writer.create_table("shared").unwrap();
    writer.write(table, "k", "v").unwrap();

    let mut reader = Client::connect(config).unwrap();
    assert_eq!(reader.get_table_id("shared").unwrap(), table);
    assert_eq!(reader.read(table, "k").unwrap().value_str(), "v");
}

#[test]
fn test_connect_rejects_remote_locator() {
    let result = Client::connect_locator("tcp:host=10.0.0.1,port=12246");
    assert!(matches!(result, Err(Error::SystemicFailure(_))));
}
