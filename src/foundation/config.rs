use std::{path::PathBuf, time::Duration};

use crate::render::ChannelOrder;

/// Runtime settings, read once from `SPLASHD_*` environment variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Framebuffer character device.
    pub fb_device: PathBuf,
    /// sysfs directory describing `fb_device` (`mode`/`modes`, `virtual_size`,
    /// `bits_per_pixel`, `stride`).
    pub fb_sysfs: PathBuf,
    /// Colour byte order of 24 and 32 bpp framebuffers.
    pub fb_channel_order: ChannelOrder,
    /// systemd unit whose activation ends the splash.
    pub ready_unit: String,
    pub systemctl: PathBuf,
    pub poll_interval: Duration,
    pub log_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fb_device: PathBuf::from("/dev/fb0"),
            fb_sysfs: PathBuf::from("/sys/class/graphics/fb0"),
            fb_channel_order: ChannelOrder::Bgr,
            ready_unit: "display-manager.service".to_string(),
            systemctl: PathBuf::from("/usr/bin/systemctl"),
            poll_interval: Duration::from_millis(50),
            log_level: tracing::Level::INFO,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset or unparsable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            fb_device: non_empty("SPLASHD_FB_DEVICE")
                .map(PathBuf::from)
                .unwrap_or(defaults.fb_device),
            fb_sysfs: non_empty("SPLASHD_FB_SYSFS")
                .map(PathBuf::from)
                .unwrap_or(defaults.fb_sysfs),
            fb_channel_order: non_empty("SPLASHD_FB_CHANNEL_ORDER")
                .and_then(|v| v.parse::<ChannelOrder>().ok())
                .unwrap_or(defaults.fb_channel_order),
            ready_unit: non_empty("SPLASHD_READY_UNIT").unwrap_or(defaults.ready_unit),
            systemctl: non_empty("SPLASHD_SYSTEMCTL")
                .map(PathBuf::from)
                .unwrap_or(defaults.systemctl),
            poll_interval: non_empty("SPLASHD_POLL_INTERVAL_MS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|&ms| ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            log_level: non_empty("SPLASHD_LOG")
                .and_then(|v| v.trim().parse::<tracing::Level>().ok())
                .unwrap_or(defaults.log_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(Config::from_lookup(|_| None), Config::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = Config::from_lookup(lookup(&[
            ("SPLASHD_FB_DEVICE", "/dev/fb1"),
            ("SPLASHD_READY_UNIT", "weston.service"),
            ("SPLASHD_POLL_INTERVAL_MS", "250"),
            ("SPLASHD_LOG", "debug"),
        ]));
        assert_eq!(cfg.fb_device, PathBuf::from("/dev/fb1"));
        assert_eq!(cfg.ready_unit, "weston.service");
        assert_eq!(cfg.poll_interval, Duration::from_millis(250));
        assert_eq!(cfg.log_level, tracing::Level::DEBUG);
        assert_eq!(cfg.systemctl, Config::default().systemctl);
    }

    #[test]
    fn zero_or_garbage_poll_interval_keeps_default() {
        let zero = Config::from_lookup(lookup(&[("SPLASHD_POLL_INTERVAL_MS", "0")]));
        assert_eq!(zero.poll_interval, Duration::from_millis(50));

        let junk = Config::from_lookup(lookup(&[("SPLASHD_POLL_INTERVAL_MS", "soon")]));
        assert_eq!(junk.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn channel_order_is_configurable() {
        let rgb = Config::from_lookup(lookup(&[("SPLASHD_FB_CHANNEL_ORDER", "rgba")]));
        assert_eq!(rgb.fb_channel_order, ChannelOrder::Rgb);

        let junk = Config::from_lookup(lookup(&[("SPLASHD_FB_CHANNEL_ORDER", "argb")]));
        assert_eq!(junk.fb_channel_order, ChannelOrder::Bgr);
    }
}
