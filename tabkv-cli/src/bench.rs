/// Read-path benchmark: multi-read vs. per-object enumeration vs. bulk page fetch

use anyhow::{ensure, Result};
use std::time::{Duration, Instant};
use tabkv_client::{Client, ContinuationToken, TableId, WriteItem};
use tracing::info;

/// Writes per populate batch
const POPULATE_CHUNK: usize = 1000;

#[derive(Debug, Clone)]
pub struct BenchParams {
    pub objects: usize,
    pub rounds: usize,
    pub value_size: usize,
}

/// Timing of one read method across all rounds
#[derive(Debug, Clone)]
pub struct BenchRow {
    pub method: &'static str,
    pub objects_read: usize,
    pub elapsed: Duration,
}

impl BenchRow {
    pub fn objects_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.objects_read as f64 / secs
    }
}

fn bench_key(i: usize) -> String {
    format!("bench:{:010}", i)
}

fn populate(client: &mut Client, table: TableId, params: &BenchParams) -> Result<()> {
    let value = vec![b'x'; params.value_size];
    let keys: Vec<String> = (0..params.objects).map(bench_key).collect();

    for chunk in keys.chunks(POPULATE_CHUNK) {
        let items: Vec<WriteItem<'_>> = chunk
            .iter()
            .map(|k| WriteItem::new(table, k.as_bytes(), &value))
            .collect();
        let results = client.multi_write(&items)?;
        let failed = results.iter().filter(|r| !r.is_ok()).count();
        ensure!(failed == 0, "{} populate writes failed", failed);
    }
    info!("Populated {} objects of {} bytes", params.objects, params.value_size);
    Ok(())
}

fn time_rounds<F>(method: &'static str, rounds: usize, mut pass: F) -> Result<BenchRow>
where
    F: FnMut() -> Result<usize>,
{
    let mut objects_read = 0;
    let start = Instant::now();
    for _ in 0..rounds {
        objects_read += pass()?;
    }
    let row = BenchRow {
        method,
        objects_read,
        elapsed: start.elapsed(),
    };
    info!("{}: {} objects in {:?}", method, row.objects_read, row.elapsed);
    Ok(row)
}

/// Populate a fresh table and time each read method over it.
pub fn run(client: &mut Client, params: &BenchParams) -> Result<Vec<BenchRow>> {
    ensure!(params.objects > 0, "objects must be greater than 0");
    ensure!(params.rounds > 0, "rounds must be greater than 0");

    let table_name = "bench";
    client.drop_table(table_name)?;
    let table = client.create_table(table_name)?;
    populate(client, table, params)?;

    let keys: Vec<String> = (0..params.objects).map(bench_key).collect();
    let mut rows = Vec::new();

    rows.push(time_rounds("multi_read", params.rounds, || {
        let mut found = 0;
        for chunk in keys.chunks(POPULATE_CHUNK) {
            let batch: Vec<(TableId, &[u8])> = chunk.iter().map(|k| (table, k.as_bytes())).collect();
            found += client.multi_read(&batch)?.iter().flatten().count();
        }
        Ok(found)
    })?);

    rows.push(time_rounds("enumerate", params.rounds, || {
        let mut count = 0;
        for object in client.enumerate(table) {
            object?;
            count += 1;
        }
        Ok(count)
    })?);

    rows.push(time_rounds("get_table_objects", params.rounds, || {
        let mut count = 0;
        let mut token = ContinuationToken::START;
        loop {
            let page = client.get_table_objects(table, token)?;
            count += page.objects.len();
            if page.is_last() {
                break;
            }
            token = page.next_token;
        }
        Ok(count)
    })?);

    client.drop_table(table_name)?;

    for row in &rows {
        ensure!(
            row.objects_read == params.objects * params.rounds,
            "{} read {} objects, expected {}",
            row.method,
            row.objects_read,
            params.objects * params.rounds
        );
    }
    Ok(rows)
}
