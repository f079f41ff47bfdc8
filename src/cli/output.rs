//! Output formatting for CLI commands
//!
//! Properties print as JSON or YAML, or as a `key = value` listing. Values are
//! redacted unless the caller asks to reveal them.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;

use crate::aggregator::Properties;

const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "table" => Ok(OutputFormat::Table),
            _ => anyhow::bail!("Unsupported output format: '{}'. Use 'json', 'yaml', or 'table'.", s),
        }
    }
}

/// Replace every value with a placeholder, keeping the keys.
pub fn redact(properties: &Properties) -> Properties {
    properties.keys().map(|key| (key.clone(), Value::String(REDACTED.to_string()))).collect()
}

/// Render properties in `format`. `Table` produces one `key = value` line per property.
pub fn render_properties(properties: &Properties, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(properties),
        OutputFormat::Yaml => to_yaml(properties),
        OutputFormat::Table => Ok(properties
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{} = {}", key, s),
                other => format!("{} = {}", key, other),
            })
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

pub fn to_json<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data).context("Failed to serialize to JSON")
}

pub fn to_yaml<T: Serialize>(data: &T) -> Result<String> {
    serde_yaml::to_string(data).context("Failed to serialize to YAML")
}

/// Print a table header followed by a separator line
pub fn print_table_header(columns: &[(&str, usize)]) {
    let mut header = String::new();
    for (name, width) in columns {
        header.push_str(&format!("{:<width$} ", name, width = width));
    }
    println!("{}", header.trim());

    let total_width: usize = columns.iter().map(|(_, w)| w + 1).sum();
    println!("{}", "-".repeat(total_width.saturating_sub(1)));
}
