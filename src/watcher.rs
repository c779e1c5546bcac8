//! Background poll for "the real display stack is up".
//!
//! The watcher shares nothing with the script thread. When the probe reports active it runs
//! its termination hook, which in production exits the process immediately, even mid-draw
//! and without releasing the surface.

use std::{
    path::PathBuf,
    process::{Command, Stdio},
    thread::JoinHandle,
    time::Duration,
};

use anyhow::Context;

use crate::foundation::{config::Config, error::SplashResult};

/// Smallest accepted poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A readiness query. Returns `true` once the target is active.
pub trait ReadinessProbe: Send + 'static {
    fn is_active(&mut self) -> bool;
}

impl<F> ReadinessProbe for F
where
    F: FnMut() -> bool + Send + 'static,
{
    fn is_active(&mut self) -> bool {
        self()
    }
}

/// `systemctl is-active --quiet <unit>`: exit status 0 means active, anything else
/// (including failure to spawn) means not yet.
#[derive(Clone, Debug)]
pub struct SystemctlProbe {
    program: PathBuf,
    unit: String,
}

impl SystemctlProbe {
    pub fn new(program: impl Into<PathBuf>, unit: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            unit: unit.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.systemctl.clone(), cfg.ready_unit.clone())
    }
}

impl ReadinessProbe for SystemctlProbe {
    fn is_active(&mut self) -> bool {
        Command::new(&self.program)
            .args(["is-active", "--quiet"])
            .arg(&self.unit)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

pub struct ReadinessWatcher<P> {
    probe: P,
    interval: Duration,
}

impl<P: ReadinessProbe> ReadinessWatcher<P> {
    pub fn new(probe: P, interval: Duration) -> Self {
        Self {
            probe,
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until the probe reports active. Returns the number of probe calls.
    pub fn wait_until_active(&mut self) -> u64 {
        let mut attempts = 0u64;
        loop {
            attempts += 1;
            if self.probe.is_active() {
                return attempts;
            }
            std::thread::sleep(self.interval);
        }
    }

    /// Run the poll loop on a named thread and call `on_ready` once active.
    pub fn spawn<F>(mut self, on_ready: F) -> SplashResult<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = std::thread::Builder::new()
            .name("readiness-watcher".to_string())
            .spawn(move || {
                let attempts = self.wait_until_active();
                tracing::info!(attempts, "display stack is active");
                on_ready();
            })
            .context("spawn readiness watcher thread")?;
        Ok(handle)
    }
}

/// Production termination hook: end the whole process with success status.
pub fn terminate_process() {
    tracing::info!("terminating splash");
    std::process::exit(0);
}
