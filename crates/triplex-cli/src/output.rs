//! Output formatting for CLI

use console::{style, StyledObject};
use serde::Serialize;
use triplex_core::SlotStatus;

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// Print `data` as pretty JSON
pub fn print_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Render a status lamp in the color the panel views use
pub fn styled_status(status: SlotStatus) -> StyledObject<String> {
    let text = status.to_string();
    match status.color() {
        "red" => style(text).red(),
        "yellow" => style(text).yellow(),
        "green" => style(text).green(),
        "blue" => style(text).blue(),
        _ => style(text).dim(),
    }
}
