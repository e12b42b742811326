//! Baseline security scan driver.
//!
//! Drives an external scanning engine against a target URL: waits for the
//! engine to come up, crawls the target, waits out passive analysis, then
//! grades the findings against a user policy into a deterministic
//! pass/warn/fail outcome for CI pipelines.
//!
//! Exit codes: 0 success, 1 at least one FAIL, 2 at least one WARN and no
//! FAILs, 3 any tooling failure (including nothing evaluated at all).

pub mod classify;
pub mod engine;
pub mod error;
pub mod output;
pub mod policy;
pub mod scan;

use std::path::PathBuf;

use tracing::{error, warn};

use classify::RunSummary;
use engine::{EngineClient, HttpEngineClient};
use error::{Result, ScanError};
use output::OutputFormat;
use policy::{Action, PolicySet};
use scan::{Orchestrator, ScanConfig};

/// Options for one scan run.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Target URL including the protocol.
    pub target: String,
    /// Policy file to load, relative to the work directory.
    pub policy_file: Option<PathBuf>,
    /// URL of a policy file to fetch instead of a local one.
    pub policy_url: Option<String>,
    /// Write a starter policy file (all rules WARN) to this path.
    pub generate: Option<PathBuf>,
    /// Crawl duration in minutes.
    pub crawl_mins: u64,
    /// Persist the engine's HTML report to this path.
    pub report_html: Option<PathBuf>,
    /// Persist the engine's XML report to this path.
    pub report_xml: Option<PathBuf>,
    /// Install the engine's alpha passive rules as well.
    pub include_alpha: bool,
    /// Rules without a policy entry resolve to INFO instead of WARN.
    pub info_unspecified: bool,
    /// Show PASS lines and example URLs.
    pub detailed_output: bool,
    /// Verdict output format.
    pub format: OutputFormat,
    /// Directory for all file-based options.
    pub work_dir: PathBuf,
    /// Command used to launch the engine daemon.
    pub engine_cmd: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            target: String::new(),
            policy_file: None,
            policy_url: None,
            generate: None,
            crawl_mins: 1,
            report_html: None,
            report_xml: None,
            include_alpha: false,
            info_unspecified: false,
            detailed_output: true,
            format: OutputFormat::Console,
            work_dir: PathBuf::from("."),
            engine_cmd: "zap.sh".into(),
        }
    }
}

impl ScanOptions {
    fn uses_files(&self) -> bool {
        self.policy_file.is_some()
            || self.generate.is_some()
            || self.report_html.is_some()
            || self.report_xml.is_some()
    }

    fn validate(&self) -> Result<()> {
        if self.target.is_empty() {
            return Err(ScanError::Config("no target specified".into()));
        }
        if !(self.target.starts_with("http://") || self.target.starts_with("https://")) {
            return Err(ScanError::Config(
                "target must start with 'http://' or 'https://'".into(),
            ));
        }
        url::Url::parse(&self.target)
            .map_err(|e| ScanError::Config(format!("invalid target URL: {}", e)))?;
        if self.uses_files() && !self.work_dir.is_dir() {
            return Err(ScanError::Config(format!(
                "a file based option has been specified but the work directory '{}' does not exist",
                self.work_dir.display()
            )));
        }
        Ok(())
    }

    fn default_action(&self) -> Action {
        if self.info_unspecified {
            Action::Info
        } else {
            Action::Warn
        }
    }

    fn load_policy(&self) -> Result<PolicySet> {
        if let Some(file) = &self.policy_file {
            PolicySet::load_file(&self.work_dir.join(file))
        } else if let Some(url) = &self.policy_url {
            PolicySet::load_url(url)
        } else {
            Ok(PolicySet::default())
        }
    }
}

/// Run a complete baseline scan and return the process exit code.
///
/// Configuration problems (bad target, unreadable policy, missing work
/// directory) and a failed engine launch abort with an error. Faults inside
/// the scan body are caught, logged, and folded into the exit code instead:
/// whatever counts were computed before the fault still decide the outcome.
pub fn run(options: &ScanOptions) -> Result<i32> {
    options.validate()?;
    // An unreadable policy cannot be trusted to mean "no policy".
    let policy = options.load_policy()?;

    let port = engine::launch::reserve_port()?;
    let _engine_proc = engine::launch::launch(
        &options.engine_cmd,
        port,
        options.crawl_mins,
        options.include_alpha,
        &options.work_dir,
    )?;
    let client = HttpEngineClient::new(port)?;

    let config = ScanConfig::with_crawl_mins(options.crawl_mins);
    let summary = match scan_body(&client, config, options, &policy) {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "scan aborted");
            // Best-effort: ask the daemon to exit so it does not linger.
            if let Err(e) = client.shutdown() {
                warn!(error = %e, "engine shutdown failed after fault");
            }
            RunSummary::default()
        }
    };

    Ok(summary.exit_code())
}

/// The scan body proper: orchestrate the engine, classify, emit outputs.
///
/// Prints the console report as a side effect; returns the run summary the
/// exit code is computed from.
fn scan_body<C: EngineClient + ?Sized>(
    client: &C,
    config: ScanConfig,
    options: &ScanOptions,
    policy: &PolicySet,
) -> Result<RunSummary> {
    let mut orchestrator = Orchestrator::new(client, config);
    let data = orchestrator.run(&options.target)?;

    let mut summary = RunSummary::default();

    if data.urls.is_empty() {
        warn!(
            "no URLs found - is the target URL accessible? \
             Local services may not be accessible from the engine container"
        );
    } else {
        if let Some(name) = &options.generate {
            output::report::write_policy_template(&data.rules, &options.work_dir.join(name))?;
        }

        let mut classification =
            classify::classify(&data.findings, &data.rules, policy, options.default_action());
        classification.summary.urls_visited = data.urls.len();

        print!(
            "{}",
            output::render(&classification, options.format, options.detailed_output)?
        );
        summary = classification.summary;

        // Report artifacts are written after counting; a failed write is
        // logged but no longer changes the verdict.
        if let Some(name) = &options.report_html {
            let path = options.work_dir.join(name);
            if let Err(e) = client
                .render_html_report()
                .and_then(|bytes| output::report::write_report_artifact(&bytes, &path))
            {
                warn!(error = %e, "failed to write HTML report");
            }
        }
        if let Some(name) = &options.report_xml {
            let path = options.work_dir.join(name);
            if let Err(e) = client
                .render_xml_report()
                .and_then(|bytes| output::report::write_report_artifact(&bytes, &path))
            {
                warn!(error = %e, "failed to write XML report");
            }
        }
    }

    if let Err(e) = client.shutdown() {
        warn!(error = %e, "engine shutdown failed");
    }

    Ok(summary)
}
