//! Engine daemon startup: port reservation and process spawn.

use std::fs::File;
use std::net::TcpListener;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use tracing::debug;

use crate::error::{Result, ScanError};

/// Pick a free ephemeral port on the loopback interface.
///
/// The listener is dropped before the engine starts, so another process
/// could grab the port in between. Acceptable for a single local run; there
/// is no conflict recovery beyond this one reservation check.
pub fn reserve_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let port = listener.local_addr()?.port();
    debug!(port, "reserved engine port");
    Ok(port)
}

/// Spawn the engine daemon, logging its stdout to `engine.out` in the work
/// directory. A failed spawn means the engine binary is missing or broken.
pub fn launch(
    engine_cmd: &str,
    port: u16,
    crawl_mins: u64,
    include_alpha: bool,
    work_dir: &Path,
) -> Result<Child> {
    let mut cmd = Command::new(engine_cmd);
    cmd.arg("-daemon")
        .arg("-port")
        .arg(port.to_string())
        .arg("-host")
        .arg("0.0.0.0")
        .arg("-config")
        .arg("api.disablekey=true")
        .arg("-config")
        .arg(format!("spider.maxDuration={}", crawl_mins));

    if include_alpha {
        cmd.arg("-addoninstall").arg("pscanrulesAlpha");
    }

    let outfile = File::create(work_dir.join("engine.out"))?;
    cmd.stdout(Stdio::from(outfile)).stderr(Stdio::null());

    debug!(%engine_cmd, port, "starting engine daemon");
    cmd.spawn()
        .map_err(|e| ScanError::EngineUnavailable(format!("failed to start '{}': {}", engine_cmd, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_port_returns_nonzero() {
        let port = reserve_port().unwrap();
        assert!(port > 0);
    }

    #[test]
    fn launch_missing_binary_is_engine_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = launch("definitely-not-a-real-engine", 8080, 1, false, dir.path()).unwrap_err();
        assert!(matches!(err, ScanError::EngineUnavailable(_)));
    }
}
