//! Policy source loading.
//!
//! A policy document is line-oriented UTF-8 text, local or remote. Each
//! non-comment line is `rule_id<TAB>action<TAB>remainder`, where the
//! remainder is either a bare placeholder (usually the rule name in
//! parentheses) or `placeholder<TAB>message` with a user-supplied message.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::engine::Rule;
use crate::error::{Result, ScanError};

/// What to do with findings for one rule. Serialized into the JSON report
/// as the policy tokens themselves (WARN, FAIL, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Ignore,
    Info,
    Warn,
    Fail,
}

impl Action {
    /// Recognise the four policy tokens. Tokens are exact-match uppercase;
    /// anything else is unrecognised and handled by the caller.
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "IGNORE" => Some(Self::Ignore),
            "INFO" => Some(Self::Info),
            "WARN" => Some(Self::Warn),
            "FAIL" => Some(Self::Fail),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ignore => write!(f, "IGNORE"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// A user override for one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    pub action: Action,
    /// Free-text message the user attached to the rule, if any.
    pub message: String,
}

/// Mapping of rule id to policy entry, immutable for the run.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    entries: HashMap<String, PolicyEntry>,
}

impl PolicySet {
    pub fn get(&self, rule_id: &str) -> Option<&PolicyEntry> {
        self.entries.get(rule_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Parse a policy document. Never fails: unknown action tokens degrade
    /// to WARN and malformed lines are skipped, both with a warning, so a
    /// single bad line cannot abort an entire run.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in text.lines() {
            if line.starts_with('#') || line.len() < 2 {
                continue;
            }
            let mut fields = line.splitn(3, '\t');
            let (rule_id, token) = match (fields.next(), fields.next()) {
                (Some(id), Some(token)) => (id, token),
                _ => {
                    warn!(line, "skipping malformed policy line");
                    continue;
                }
            };
            let action = Action::from_token(token).unwrap_or_else(|| {
                warn!(rule_id, token, "unknown policy action, treating as WARN");
                Action::Warn
            });
            // The remainder holds a placeholder; a second embedded tab
            // separates it from the user's message.
            let message = fields
                .next()
                .and_then(|rest| rest.trim_end().split_once('\t'))
                .map(|(_, msg)| msg.to_string())
                .unwrap_or_default();
            // Last entry wins on duplicate rule ids.
            entries.insert(rule_id.to_string(), PolicyEntry { action, message });
        }
        Self { entries }
    }

    /// Load a policy document from a local file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ScanError::PolicySource {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::parse(&text))
    }

    /// Fetch and parse a policy document from a URL.
    pub fn load_url(url: &str) -> Result<Self> {
        let fetch = || -> std::result::Result<String, reqwest::Error> {
            reqwest::blocking::get(url)?.error_for_status()?.text()
        };
        let text = fetch().map_err(|e| ScanError::PolicySource {
            source_name: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::parse(&text))
    }
}

/// Render a starter policy document: every catalog rule set to WARN, sorted
/// by rule id. The caller is expected to have dropped excluded rules.
pub fn render_template(rules: &[Rule]) -> String {
    let mut sorted: Vec<&Rule> = rules.iter().collect();
    sorted.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));

    let mut out = String::new();
    out.push_str("# baseline scan rule configuration file\n");
    out.push_str("# Change WARN to IGNORE to ignore rule or FAIL to fail if rule matches\n");
    out.push_str("# Only the rule identifiers are used - the names are just for info\n");
    out.push_str(
        "# You can add your own messages to each rule by appending them after a tab on each line.\n",
    );
    for rule in sorted {
        out.push_str(&format!("{}\tWARN\t({})\n", rule.rule_id, rule.display_name));
    }
    out
}
