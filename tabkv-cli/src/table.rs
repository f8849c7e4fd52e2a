/// Table formatting for CLI reports using comfy-table

use crate::bench::BenchRow;
use crate::smoke::SmokeStep;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(Cell::new).collect::<Vec<_>>());
    table
}

/// Format smoke steps, one row per step
pub fn format_smoke_table(steps: &[SmokeStep]) -> String {
    if steps.is_empty() {
        return "No steps run".to_string();
    }

    let mut table = new_table(&["Step", "Result", "Detail"]);
    for step in steps {
        table.add_row(vec![
            Cell::new(step.name),
            Cell::new(if step.passed { "ok" } else { "FAILED" }),
            Cell::new(&step.detail),
        ]);
    }
    table.to_string()
}

/// Format benchmark timings, one row per read method
pub fn format_bench_table(rows: &[BenchRow]) -> String {
    if rows.is_empty() {
        return "No results".to_string();
    }

    let mut table = new_table(&["Method", "Objects", "Elapsed (ms)", "Objects/sec"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(row.method),
            Cell::new(row.objects_read),
            Cell::new(format!("{:.2}", row.elapsed.as_secs_f64() * 1000.0)),
            Cell::new(format!("{:.0}", row.objects_per_sec())),
        ]);
    }
    table.to_string()
}
