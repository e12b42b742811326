pub mod http;
pub mod launch;

use serde::Serialize;

use crate::error::Result;

pub use http::HttpEngineClient;

/// One reported issue instance, as retrieved from the engine.
///
/// Immutable once retrieved; the classifier only ever reads `rule_id`,
/// `title` and `target_url`, the rest of the engine's alert object is kept
/// opaque in `raw`.
#[derive(Debug, Clone)]
pub struct Finding {
    /// Rule identifier (the engine calls this the plugin id).
    pub rule_id: String,
    /// Display name of the alert.
    pub title: String,
    /// URL the issue was observed on.
    pub target_url: String,
    /// Full engine-defined alert payload.
    pub raw: serde_json::Value,
}

/// A catalog entry for one check the engine can perform. Serialized into
/// the JSON report's pass list.
#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub rule_id: String,
    pub display_name: String,
}

/// Call surface over the external scanning engine's control API.
///
/// Every operation is a remote call with no local caching; the finding list
/// and rule catalog can change between calls while the crawl is running.
pub trait EngineClient {
    /// Probe whether the engine is up. Transient transport errors while the
    /// engine is still starting are swallowed and reported as `false`.
    fn probe_ready(&self) -> bool;

    /// Ask the engine to access the target once, priming its site tree.
    fn open(&self, target: &str) -> Result<()>;

    /// Start the crawl and return the engine's scan handle.
    fn start_crawl(&self, target: &str) -> Result<String>;

    /// Crawl completion percentage, 0..=100.
    fn crawl_progress(&self, handle: &str) -> Result<u8>;

    /// Number of records still queued for passive analysis.
    fn passive_backlog(&self) -> Result<u64>;

    /// All findings discovered so far.
    fn list_findings(&self) -> Result<Vec<Finding>>;

    /// The engine's passive rule catalog.
    fn list_rules(&self) -> Result<Vec<Rule>>;

    /// Every distinct URL the engine has visited.
    fn visited_urls(&self) -> Result<Vec<String>>;

    /// Engine-rendered HTML report, verbatim bytes.
    fn render_html_report(&self) -> Result<Vec<u8>>;

    /// Engine-rendered XML report, verbatim bytes.
    fn render_xml_report(&self) -> Result<Vec<u8>>;

    /// Ask the engine to shut itself down.
    fn shutdown(&self) -> Result<()>;
}
