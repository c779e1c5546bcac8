//! The `clear`, `sleep` and `draw` script commands.

use std::time::Duration;

use crate::{
    assets::{Bundle, decode_image},
    foundation::error::{SplashError, SplashResult},
    render::{Surface, center_offset},
    resolve::{resolve_int, resolve_str},
    script::{CommandToken, Environment, Interpreter},
};

/// Pixel written by `clear`.
pub const CLEAR_PIXEL: [u8; 4] = [0, 0, 0, 0];

/// State the commands operate on for one script run.
pub struct SplashContext<'a, S: Surface> {
    pub bundle: &'a Bundle,
    pub surface: &'a mut S,
}

impl<'a, S: Surface> SplashContext<'a, S> {
    pub fn new(bundle: &'a Bundle, surface: &'a mut S) -> Self {
        Self { bundle, surface }
    }
}

/// Register `clear`, `sleep` and `draw` on `vm`.
pub fn register<S: Surface>(vm: &mut Interpreter<SplashContext<'_, S>>) {
    vm.register("clear", clear::<S>);
    vm.register("sleep", sleep::<S>);
    vm.register("draw", draw::<S>);
}

fn expect_arity(command: &'static str, args: &[CommandToken], n: usize) -> SplashResult<()> {
    if args.len() != n {
        return Err(SplashError::arity(command, n, args.len()));
    }
    Ok(())
}

pub fn clear<S: Surface>(
    ctx: &mut SplashContext<'_, S>,
    _env: &Environment,
    args: &[CommandToken],
) -> SplashResult<()> {
    expect_arity("clear", args, 0)?;
    ctx.surface.fill(CLEAR_PIXEL)
}

/// Blocks the evaluating thread; the readiness watcher keeps running on its own thread.
pub fn sleep<S: Surface>(
    _ctx: &mut SplashContext<'_, S>,
    env: &Environment,
    args: &[CommandToken],
) -> SplashResult<()> {
    expect_arity("sleep", args, 1)?;
    let ms = resolve_int(&args[0], env, "an integer duration")?;
    if ms < 0 {
        tracing::warn!(ms, "negative sleep duration, not sleeping");
        return Ok(());
    }
    std::thread::sleep(Duration::from_millis(ms as u64));
    Ok(())
}

pub fn draw<S: Surface>(
    ctx: &mut SplashContext<'_, S>,
    env: &Environment,
    args: &[CommandToken],
) -> SplashResult<()> {
    expect_arity("draw", args, 1)?;
    let filename = resolve_str(&args[0], env, "a string filename")?;

    let bytes = ctx.bundle.entry(&filename)?;
    let image = decode_image(&bytes)?;

    let x = center_offset(ctx.surface.width(), image.width);
    let y = center_offset(ctx.surface.height(), image.height);
    tracing::debug!(
        file = %filename,
        w = image.width,
        h = image.height,
        x,
        y,
        "draw"
    );
    ctx.surface.blit(x, y, &image)
}
