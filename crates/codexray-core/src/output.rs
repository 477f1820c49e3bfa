use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::str::FromStr;

use crate::types::AnalysisRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    Jsonl,
    #[default]
    Text,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::Jsonl),
            "text" | "txt" => Ok(OutputFormat::Text),
            _ => Err(anyhow!("unknown format: {s}")),
        }
    }
}

pub fn write_json<T: Serialize>(value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    println!("{data}");
    Ok(())
}

#[derive(Serialize)]
struct JsonlEvent<'a, T> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: &'a T,
}

pub fn write_jsonl<T: Serialize>(kind: &str, data: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    let line = serde_json::to_string(&JsonlEvent { kind, data })?;
    stdout.write_all(line.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}

/// One line per record: id, timestamp, provider and a preview of the input.
pub fn summary_line(record: &AnalysisRecord) -> String {
    let preview: String = record
        .input_text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(60)
        .collect();
    let created = record
        .created_at
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    format!(
        "{}  {}  {}  {}",
        record.id, created, record.model_selection.provider, preview
    )
}

pub fn render_record(record: &AnalysisRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "id: {}", record.id);
    let _ = writeln!(out, "provider: {}", record.model_selection.provider);
    if let Some(model) = &record.model_selection.model {
        let _ = writeln!(out, "model: {model}");
    }
    if !record.user_instruction.trim().is_empty() {
        let _ = writeln!(out, "instruction: {}", record.user_instruction.trim());
    }
    out.push('\n');
    out.push_str(&record.result_text);
    if !record.result_text.ends_with('\n') {
        out.push('\n');
    }
    out
}
