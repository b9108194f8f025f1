//! Execution record persistence

use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::info;
use crate::types::Execution;

pub fn save_execution(execution: &Execution) -> Result<()> {
    let filename = format!(
        "output/executions/executions_{}.jsonl",
        Utc::now().format("%Y-%m-%d")
    );

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)?;

    writeln!(file, "{}", serde_json::to_string(execution)?)?;

    info!(
        execution_id = %execution.id,
        status = ?execution.status,
        realized_profit = ?execution.realized_profit,
        "Saved execution record"
    );

    Ok(())
}
