/// End-to-end smoke test of a client session

use anyhow::Result;
use tabkv_client::{BatchRequest, Client, Error, RejectRules, Status, TableId, WriteItem};
use tabkv_core::counter_value;
use tracing::{debug, warn};

/// Outcome of one smoke step
#[derive(Debug, Clone)]
pub struct SmokeStep {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

struct Recorder {
    steps: Vec<SmokeStep>,
}

impl Recorder {
    fn record(&mut self, name: &'static str, outcome: tabkv_core::Result<String>) {
        let step = match outcome {
            Ok(detail) => SmokeStep {
                name,
                passed: true,
                detail,
            },
            Err(e) => {
                warn!("Smoke step '{}' failed: {}", name, e);
                SmokeStep {
                    name,
                    passed: false,
                    detail: format!("{} ({})", e, e.code()),
                }
            }
        };
        debug!("Smoke step '{}' passed={}", step.name, step.passed);
        self.steps.push(step);
    }
}

/// Expect `outcome` to be rejected with `expected`.
fn expect_err<T>(outcome: tabkv_core::Result<T>, expected: Error) -> tabkv_core::Result<String> {
    match outcome {
        Err(e) if e == expected => Ok(format!("rejected with {}", e.code())),
        Err(e) => Err(e),
        Ok(_) => Err(Error::SystemicFailure(format!(
            "expected {} but the operation succeeded",
            expected.code()
        ))),
    }
}

/// Run every step against `table_name`. Fails only if the table cannot be set up.
pub fn run(client: &mut Client, table_name: &str) -> Result<Vec<SmokeStep>> {
    let table = client.create_table(table_name)?;
    let mut rec = Recorder { steps: Vec::new() };

    rec.record("create_table", Ok(format!("table {} = id {}", table_name, table)));
    rec.record(
        "get_table_id",
        client.get_table_id(table_name).and_then(|id| {
            if id == table {
                Ok(format!("id {}", id))
            } else {
                Err(Error::SystemicFailure(format!("expected id {}, got {}", table, id)))
            }
        }),
    );

    single_object_steps(client, table, &mut rec);
    batch_steps(client, table, &mut rec);
    enumeration_steps(client, table, &mut rec);

    rec.record(
        "drop_table",
        client.drop_table(table_name).and_then(|_| {
            expect_err(
                client.get_table_id(table_name),
                Error::TableDoesntExist(table_name.to_string()),
            )
        }),
    );

    Ok(rec.steps)
}

fn single_object_steps(client: &mut Client, table: TableId, rec: &mut Recorder) {
    let written = client.write(table, "smoke:key", "value-1");
    let version = written.as_ref().copied().unwrap_or_default();
    rec.record("write", written.map(|v| format!("version {}", v)));

    rec.record(
        "read",
        client.read(table, "smoke:key").map(|o| format!("{} @ version {}", o.value_str(), o.version)),
    );

    rec.record(
        "write_if_absent",
        expect_err(
            client.write_with_rules(table, "smoke:key", "x", &RejectRules::new().reject_if_exists()),
            Error::ObjectExists,
        ),
    );

    let stale = RejectRules::new().reject_if_version_eq(version);
    rec.record(
        "write_if_changed",
        expect_err(client.write_with_rules(table, "smoke:key", "x", &stale), Error::WrongVersion),
    );

    let guard = RejectRules::new().reject_if_version_greater(version);
    rec.record(
        "compare_and_swap",
        client
            .write_with_rules(table, "smoke:key", "value-2", &guard)
            .map(|v| format!("version {} -> {}", version, v)),
    );

    rec.record(
        "increment",
        client
            .write(table, "smoke:counter", counter_value(0))
            .and_then(|_| client.increment(table, "smoke:counter", 5))
            .and_then(|_| client.increment(table, "smoke:counter", -2))
            .map(|value| format!("counter = {}", value)),
    );

    rec.record(
        "remove",
        client
            .remove(table, "smoke:key")
            .and_then(|v| expect_err(client.read(table, "smoke:key"), Error::ObjectDoesntExist).map(|_| v))
            .map(|v| format!("removed version {}", v)),
    );
}

fn batch_steps(client: &mut Client, table: TableId, rec: &mut Recorder) {
    let items: Vec<(String, String)> = (0..10)
        .map(|i| (format!("smoke:batch:{}", i), format!("value-{}", i)))
        .collect();
    let writes: Vec<WriteItem<'_>> = items
        .iter()
        .map(|(k, v)| WriteItem::new(table, k.as_bytes(), v.as_bytes()))
        .collect();

    rec.record(
        "multi_write",
        client.multi_write(&writes).and_then(|results| {
            let ok = results.iter().filter(|r| r.is_ok()).count();
            if ok == results.len() {
                Ok(format!("{} objects", ok))
            } else {
                Err(Error::SystemicFailure(format!("{} of {} writes failed", results.len() - ok, results.len())))
            }
        }),
    );

    let keys: Vec<(TableId, &[u8])> = items.iter().map(|(k, _)| (table, k.as_bytes())).collect();
    rec.record(
        "multi_read",
        client.multi_read(&keys).map(|objects| {
            let found = objects.iter().filter(|o| o.is_some()).count();
            format!("{} of {} found", found, objects.len())
        }),
    );

    let request = BatchRequest::new()
        .read(table, "smoke:batch:0")
        .read(table, "smoke:batch:missing")
        .write_with_rules(table, "smoke:batch:1", "x", RejectRules::new().reject_if_exists());
    rec.record(
        "batch_partial_failure",
        client.batch(request).and_then(|results| {
            let statuses: Vec<Status> = results.iter().map(|r| r.status).collect();
            if statuses == [Status::Ok, Status::ObjectDoesntExist, Status::ObjectExists] {
                Ok("failures isolated per item".to_string())
            } else {
                Err(Error::SystemicFailure(format!("unexpected statuses {:?}", statuses)))
            }
        }),
    );
}

fn enumeration_steps(client: &mut Client, table: TableId, rec: &mut Recorder) {
    let scanned = client.enumerate(table).collect::<tabkv_core::Result<Vec<_>>>();
    rec.record("enumerate", scanned.map(|objects| format!("{} objects", objects.len())));

    let mut token = tabkv_client::ContinuationToken::START;
    let mut pages = 0;
    let mut objects = 0;
    let bulk = loop {
        match client.get_table_objects(table, token) {
            Ok(page) => {
                objects += page.objects.len();
                if !page.objects.is_empty() {
                    pages += 1;
                }
                if page.is_last() {
                    break Ok(format!("{} objects in {} pages", objects, pages));
                }
                token = page.next_token;
            }
            Err(e) => break Err(e),
        }
    };
    rec.record("get_table_objects", bulk);
}
