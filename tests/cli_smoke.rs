use std::{
    io::Cursor,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    process::{Command, Output},
    time::{Duration, Instant},
};

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "splashd_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_splashd")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("target").join("debug").join("splashd"))
}

fn png(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Fake 8x4 32bpp framebuffer plus a `systemctl` stand-in that succeeds once `ready` exists.
struct Rig {
    dir: PathBuf,
}

impl Rig {
    fn new(name: &str, script: &str) -> Self {
        let dir = temp_dir(name);
        let bundle = dir.join("bundle");
        let sysfs = dir.join("sysfs");
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::create_dir_all(&sysfs).unwrap();

        std::fs::write(bundle.join("splash.sls"), script).unwrap();
        std::fs::write(bundle.join("logo.png"), png(2, 2, [255, 0, 0, 255])).unwrap();
        std::fs::write(sysfs.join("virtual_size"), "8,4\n").unwrap();
        std::fs::write(sysfs.join("bits_per_pixel"), "32\n").unwrap();
        std::fs::write(dir.join("fb0"), b"").unwrap();

        let probe = dir.join("systemctl");
        std::fs::write(
            &probe,
            format!("#!/bin/sh\ntest -e '{}'\n", dir.join("ready").display()),
        )
        .unwrap();
        std::fs::set_permissions(&probe, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self { dir }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(exe());
        cmd.arg(self.dir.join("bundle"))
            .env("SPLASHD_FB_DEVICE", self.dir.join("fb0"))
            .env("SPLASHD_FB_SYSFS", self.dir.join("sysfs"))
            .env("SPLASHD_SYSTEMCTL", self.dir.join("systemctl"))
            .env("SPLASHD_POLL_INTERVAL_MS", "10")
            .env("SPLASHD_LOG", "error");
        cmd
    }

    fn framebuffer(&self) -> Vec<u8> {
        std::fs::read(self.dir.join("fb0")).unwrap()
    }

    fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let fb = self.framebuffer();
        let i = (y * 8 + x) * 4;
        [fb[i], fb[i + 1], fb[i + 2], fb[i + 3]]
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

fn assert_silent_success(out: &Output) {
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    assert!(out.stderr.is_empty());
}

#[test]
fn wrong_argument_count_exits_silently() {
    assert_silent_success(&Command::new(exe()).output().unwrap());
    assert_silent_success(&Command::new(exe()).args(["a.zip", "b.zip"]).output().unwrap());
}

#[test]
fn missing_bundle_is_reported() {
    let out = Command::new(exe())
        .arg(Path::new("/nonexistent/splash.zip"))
        .env("SPLASHD_LOG", "error")
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(!out.stderr.is_empty());
}

#[test]
fn draws_to_framebuffer_and_exits() {
    let rig = Rig::new("cli_draw", "clear\ndraw \"logo.png\"\n");
    let out = rig.command().output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    // Logo is 2x2 centered on 8x4: columns 3..5, rows 1..3; device order is BGRA.
    assert_eq!(rig.pixel(3, 1), [0, 0, 255, 255]);
    assert_eq!(rig.pixel(4, 2), [0, 0, 255, 255]);
    assert_eq!(rig.pixel(2, 1), [0, 0, 0, 0]);
    assert_eq!(rig.pixel(3, 0), [0, 0, 0, 0]);
}

#[test]
fn script_error_exits_with_failure() {
    let rig = Rig::new("cli_script_error", "clear\ndraw \"missing.png\"\n");
    let out = rig.command().output().unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("missing.png"), "{stderr}");
    assert_eq!(stderr.matches("line 2: draw").count(), 1, "{stderr}");
}

#[test]
fn unusable_framebuffer_is_fatal_before_script_runs() {
    let rig = Rig::new("cli_no_sysfs", "clear\ndraw \"never.png\"\n");
    let out = rig
        .command()
        .env("SPLASHD_FB_SYSFS", rig.path("no-such-sysfs"))
        .output()
        .unwrap();

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("no-such-sysfs"), "{stderr}");
    assert!(!stderr.contains("never.png"), "{stderr}");
    assert!(rig.framebuffer().is_empty());
}

#[test]
fn centers_on_visible_mode_of_panning_framebuffer() {
    let rig = Rig::new("cli_panning", "clear\ndraw \"logo.png\"\n");
    std::fs::write(rig.path("sysfs").join("virtual_size"), "8,8\n").unwrap();
    std::fs::write(rig.path("sysfs").join("modes"), "U:8x4p-0\n").unwrap();
    let out = rig.command().output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    assert_eq!(rig.framebuffer().len(), 4 * 8 * 4);
    assert_eq!(rig.pixel(3, 1), [0, 0, 255, 255]);
    assert_eq!(rig.pixel(4, 2), [0, 0, 255, 255]);
    assert_eq!(rig.pixel(3, 3), [0, 0, 0, 0]);
}

#[test]
fn rgb_channel_order_is_honoured() {
    let rig = Rig::new("cli_rgb", "clear\ndraw \"logo.png\"\n");
    let out = rig
        .command()
        .env("SPLASHD_FB_CHANNEL_ORDER", "rgb")
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(rig.pixel(3, 1), [255, 0, 0, 255]);
}

#[test]
fn readiness_mid_sleep_terminates_immediately() {
    let rig = Rig::new("cli_ready", "draw \"logo.png\"\nsleep 20000\nclear\n");
    let mut child = rig.command().spawn().unwrap();

    std::thread::sleep(Duration::from_millis(300));
    std::fs::write(rig.path("ready"), b"").unwrap();
    let signalled = Instant::now();

    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if signalled.elapsed() > Duration::from_secs(10) {
            child.kill().ok();
            panic!("splash did not exit after readiness");
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    assert!(status.success());
    // `clear` after the sleep never ran, so the logo is still on screen.
    assert_eq!(rig.pixel(3, 1), [0, 0, 255, 255]);
}
