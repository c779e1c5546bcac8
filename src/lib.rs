#![forbid(unsafe_code)]

pub mod assets;
pub mod bindings;
pub mod driver;
pub mod foundation;
pub mod render;
pub mod resolve;
pub mod script;
pub mod watcher;

pub use assets::{Bundle, DecodedImage, SCRIPT_ENTRY, decode_image};
pub use bindings::{CLEAR_PIXEL, SplashContext};
pub use driver::{DriverState, Outcome, SplashDriver, run_splash};
pub use foundation::{
    config::Config,
    error::{SplashError, SplashResult},
};
pub use render::{ChannelOrder, FbDevSurface, MemorySurface, Surface};
pub use resolve::{resolve, resolve_int, resolve_str};
pub use script::{CommandToken, Environment, Interpreter, Value, ValueKind};
pub use watcher::{ReadinessProbe, ReadinessWatcher, SystemctlProbe, terminate_process};
