use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

/// Show a scripted boot splash on the framebuffer until the display manager is up.
#[derive(Parser, Debug)]
#[command(name = "splashd", disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Splash bundle: a zip archive or directory containing `splash.sls`.
    #[arg(allow_hyphen_values = true)]
    bundle: PathBuf,
}

fn main() -> anyhow::Result<()> {
    // Anything but exactly one argument: leave quietly.
    let Ok(cli) = Cli::try_parse() else {
        return Ok(());
    };

    let cfg = splashd::Config::from_env();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(cfg.log_level)
        .init();

    splashd::run_splash(&cli.bundle, &cfg)
        .with_context(|| format!("splash from '{}'", cli.bundle.display()))?;
    Ok(())
}
