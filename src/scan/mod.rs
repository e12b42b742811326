//! Scan lifecycle orchestration.
//!
//! Drives the engine through its phases with blocking sleep-and-repoll:
//! `Starting → Ready → Crawling → DrainingPassive → Done`, with `Failed`
//! terminal from any state. Waiting is a fixed-interval spin; only the
//! crawl loop carries a hard ceiling, because the engine's progress signal
//! is known to occasionally stall short of 100 after the configured crawl
//! duration has elapsed.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::engine::{EngineClient, Finding, Rule};
use crate::error::{Result, ScanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Ready,
    Crawling,
    DrainingPassive,
    Done,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Ready => write!(f, "ready"),
            Self::Crawling => write!(f, "crawling"),
            Self::DrainingPassive => write!(f, "draining-passive"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Timing knobs for one run. The defaults are the baseline policy; tests
/// zero the sleeps to drive a scripted engine without wall-clock delays.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Total crawl budget; the engine is configured with the same duration.
    pub crawl_budget: Duration,
    /// Extra slack past the crawl budget before the stalled-progress escape.
    pub crawl_grace: Duration,
    /// Bound on waiting for the engine to become ready.
    pub ready_timeout: Duration,
    pub ready_poll: Duration,
    pub crawl_poll: Duration,
    pub drain_poll: Duration,
    /// Pause after priming the target, before the crawl starts.
    pub open_settle: Duration,
    /// Pause after the crawl is kicked off, before the first progress poll.
    pub crawl_settle: Duration,
}

impl ScanConfig {
    pub fn with_crawl_mins(mins: u64) -> Self {
        Self {
            crawl_budget: Duration::from_secs(mins * 60),
            crawl_grace: Duration::from_secs(10),
            ready_timeout: Duration::from_secs(120),
            ready_poll: Duration::from_secs(1),
            crawl_poll: Duration::from_secs(5),
            drain_poll: Duration::from_secs(2),
            open_settle: Duration::from_secs(2),
            crawl_settle: Duration::from_secs(5),
        }
    }
}

/// Terminal engine state for one run, collected only after the passive
/// backlog drained to zero.
#[derive(Debug, Clone)]
pub struct ScanData {
    pub urls: Vec<String>,
    pub findings: Vec<Finding>,
    pub rules: Vec<Rule>,
}

pub struct Orchestrator<'a, C: EngineClient + ?Sized> {
    client: &'a C,
    config: ScanConfig,
    phase: Phase,
}

impl<'a, C: EngineClient + ?Sized> Orchestrator<'a, C> {
    pub fn new(client: &'a C, config: ScanConfig) -> Self {
        Self {
            client,
            config,
            phase: Phase::Starting,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
    }

    /// Drive the engine to completion and return its terminal state.
    pub fn run(&mut self, target: &str) -> Result<ScanData> {
        match self.drive(target) {
            Ok(data) => Ok(data),
            Err(e) => {
                self.enter(Phase::Failed);
                Err(e)
            }
        }
    }

    fn drive(&mut self, target: &str) -> Result<ScanData> {
        self.await_ready()?;
        self.enter(Phase::Ready);

        // An engine that cannot reach the target is not itself a hard
        // failure; the absence of discovered URLs is reported downstream.
        if let Err(e) = self.client.open(target) {
            warn!(target, error = %e, "target not reachable from engine");
        }
        std::thread::sleep(self.config.open_settle);

        let handle = self.client.start_crawl(target)?;
        debug!(%handle, target, "crawl started");
        std::thread::sleep(self.config.crawl_settle);

        self.enter(Phase::Crawling);
        self.await_crawl(&handle)?;

        self.enter(Phase::DrainingPassive);
        self.drain_passive()?;

        self.enter(Phase::Done);
        Ok(ScanData {
            urls: self.client.visited_urls()?,
            findings: self.client.list_findings()?,
            rules: self.client.list_rules()?,
        })
    }

    fn await_ready(&self) -> Result<()> {
        let start = Instant::now();
        loop {
            if self.client.probe_ready() {
                return Ok(());
            }
            if start.elapsed() >= self.config.ready_timeout {
                return Err(ScanError::EngineUnavailable(format!(
                    "engine did not become ready within {:?}",
                    self.config.ready_timeout
                )));
            }
            std::thread::sleep(self.config.ready_poll);
        }
    }

    fn await_crawl(&self, handle: &str) -> Result<()> {
        let ceiling = self.config.crawl_budget + self.config.crawl_grace;
        let start = Instant::now();
        loop {
            let progress = self.client.crawl_progress(handle)?;
            if progress >= 100 {
                debug!("crawl complete");
                return Ok(());
            }
            if start.elapsed() > ceiling {
                // The engine sometimes never reports 100 after its crawl
                // duration elapses; past the grace period the crawl is
                // treated as complete rather than failed.
                debug!(progress, "crawl progress stalled, proceeding after grace period");
                return Ok(());
            }
            debug!(progress, "crawl progress");
            std::thread::sleep(self.config.crawl_poll);
        }
    }

    fn drain_passive(&self) -> Result<()> {
        // No ceiling here: the passive backlog always drains eventually.
        loop {
            let backlog = self.client.passive_backlog()?;
            if backlog == 0 {
                debug!("passive analysis complete");
                return Ok(());
            }
            debug!(backlog, "records awaiting passive analysis");
            std::thread::sleep(self.config.drain_poll);
        }
    }
}
