use std::path::Path;

use crate::{
    assets::{Bundle, SCRIPT_ENTRY},
    bindings::{self, SplashContext},
    foundation::{
        config::Config,
        error::{SplashError, SplashResult},
    },
    render::{FbDevSurface, Surface},
    script::Interpreter,
    watcher::{ReadinessWatcher, SystemctlProbe, terminate_process},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Init,
    SurfaceReady,
    ScriptLoaded,
    Running,
    Terminated(Outcome),
}

/// Sequences one splash run over an opened bundle and an acquired surface.
///
/// The surface is released exactly once, when the driver reaches `Terminated`, on both the
/// success and the failure path.
pub struct SplashDriver<S: Surface> {
    bundle: Bundle,
    surface: S,
    script: Option<String>,
    state: DriverState,
}

impl<S: Surface> SplashDriver<S> {
    pub fn new(bundle: Bundle, surface: S) -> Self {
        tracing::debug!(
            width = surface.width(),
            height = surface.height(),
            "surface ready"
        );
        Self {
            bundle,
            surface,
            script: None,
            state: DriverState::SurfaceReady,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Read the script entry into memory.
    ///
    /// A missing or unreadable script is fatal: the surface is released and the driver ends in
    /// `Terminated(Failure)`.
    pub fn load_script(&mut self) -> SplashResult<()> {
        self.expect_state(DriverState::SurfaceReady)?;
        match self.bundle.script() {
            Ok(text) => {
                tracing::debug!(bytes = text.len(), entry = SCRIPT_ENTRY, "script loaded");
                self.script = Some(text);
                self.state = DriverState::ScriptLoaded;
                Ok(())
            }
            Err(e) => {
                self.finish(Outcome::Failure);
                Err(e)
            }
        }
    }

    /// Start the watcher through `launch_watcher`, evaluate the script, then release the
    /// surface.
    ///
    /// The watcher is launched before the first statement runs. A script error does not skip
    /// the release; it is returned after it.
    #[tracing::instrument(skip_all)]
    pub fn run<W>(&mut self, launch_watcher: W) -> SplashResult<()>
    where
        W: FnOnce() -> SplashResult<()>,
    {
        self.expect_state(DriverState::ScriptLoaded)?;
        let script = self.script.take().unwrap_or_default();

        let mut vm: Interpreter<SplashContext<'_, S>> = Interpreter::new();
        bindings::register(&mut vm);

        if let Err(e) = launch_watcher() {
            self.finish(Outcome::Failure);
            return Err(e);
        }

        self.state = DriverState::Running;
        tracing::info!("running splash script");
        let result = {
            let mut ctx = SplashContext::new(&self.bundle, &mut self.surface);
            vm.eval(&script, &mut ctx)
        };
        drop(vm);

        if let Err(e) = &result {
            // Reported once by the caller.
            tracing::debug!(error = %e, "splash script failed");
        }
        let outcome = if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        let released = self.finish(outcome);
        result.and(released)
    }

    fn expect_state(&self, expected: DriverState) -> SplashResult<()> {
        if self.state != expected {
            return Err(SplashError::Other(anyhow::anyhow!(
                "driver is in state {:?}, expected {expected:?}",
                self.state
            )));
        }
        Ok(())
    }

    fn finish(&mut self, outcome: Outcome) -> SplashResult<()> {
        if matches!(self.state, DriverState::Terminated(_)) {
            return Ok(());
        }
        self.state = DriverState::Terminated(outcome);
        let released = self.surface.release();
        if let Err(e) = &released {
            tracing::warn!(error = %e, "surface release failed");
        }
        tracing::info!(?outcome, "splash finished");
        released
    }
}

/// Full production run: open `bundle_path`, take over the framebuffer, run the script and
/// exit early when the display manager becomes active.
#[tracing::instrument(skip(cfg))]
pub fn run_splash(bundle_path: &Path, cfg: &Config) -> SplashResult<()> {
    let bundle = Bundle::open(bundle_path)?;
    let surface = FbDevSurface::open(&cfg.fb_device, &cfg.fb_sysfs, cfg.fb_channel_order)?;

    let mut driver = SplashDriver::new(bundle, surface);
    driver.load_script()?;

    let watcher = ReadinessWatcher::new(SystemctlProbe::from_config(cfg), cfg.poll_interval);
    driver.run(move || {
        // The handle is dropped: the watcher thread is never joined.
        watcher.spawn(terminate_process).map(drop)
    })
}
