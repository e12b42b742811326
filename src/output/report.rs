//! File sinks: policy templates and engine-rendered report artifacts.

use std::path::Path;

use tracing::info;

use crate::classify::is_excluded;
use crate::engine::Rule;
use crate::error::Result;
use crate::policy;

/// Write a starter policy file for the given catalog, minus excluded rules.
pub fn write_policy_template(rules: &[Rule], path: &Path) -> Result<()> {
    let kept: Vec<Rule> = rules
        .iter()
        .filter(|r| !is_excluded(&r.rule_id))
        .cloned()
        .collect();
    std::fs::write(path, policy::render_template(&kept))?;
    info!(path = %path.display(), rules = kept.len(), "wrote policy template");
    Ok(())
}

/// Persist an engine-rendered report verbatim. No transformation of the
/// bytes happens here.
pub fn write_report_artifact(bytes: &[u8], path: &Path) -> Result<()> {
    std::fs::write(path, bytes)?;
    info!(path = %path.display(), size = bytes.len(), "wrote report artifact");
    Ok(())
}
