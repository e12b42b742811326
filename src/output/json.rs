use crate::classify::Classification;
use crate::error::Result;

/// Render the run verdict as a JSON report: groups, passes and summary.
pub fn render(classification: &Classification) -> Result<String> {
    let mut json = serde_json::to_string_pretty(classification)?;
    json.push('\n');
    Ok(json)
}
