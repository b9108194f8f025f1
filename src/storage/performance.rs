//! Performance record persistence

use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;
use crate::types::PerformanceRecord;

pub fn save_performance_record(record: &PerformanceRecord) -> Result<()> {
    let filename = format!(
        "output/performance/performance_{}.jsonl",
        Utc::now().format("%Y-%m-%d")
    );

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)?;

    writeln!(file, "{}", serde_json::to_string(record)?)?;

    debug!(
        execution_id = %record.execution_id,
        success = record.success,
        "Saved performance record"
    );

    Ok(())
}
