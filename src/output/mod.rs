pub mod console;
pub mod json;
pub mod report;

use crate::classify::Classification;
use crate::error::Result;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Console,
    Json,
}

impl OutputFormat {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Some(Self::Console),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Render the run verdict in the specified format.
pub fn render(
    classification: &Classification,
    format: OutputFormat,
    detailed: bool,
) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render(classification, detailed)),
        OutputFormat::Json => json::render(classification),
    }
}
