//! Linux fbdev output.
//!
//! Geometry comes from the device's sysfs directory; pixels are kept in a premultiplied shadow
//! buffer and pushed to the character device with positional writes after every change.

use std::{
    fs::{File, OpenOptions},
    os::unix::fs::FileExt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;

use crate::{
    assets::DecodedImage,
    foundation::error::{SplashError, SplashResult},
    render::{
        composite::{PremulRgba8, RowSpan},
        surface::{PixelBuffer, Surface},
    },
};

/// Order of the colour bytes for 24 and 32 bpp devices. sysfs does not publish it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Blue first, the layout of most PC and DRM-emulated framebuffers.
    #[default]
    Bgr,
    Rgb,
}

impl FromStr for ChannelOrder {
    type Err = SplashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bgr" | "bgra" => Ok(Self::Bgr),
            "rgb" | "rgba" => Ok(Self::Rgb),
            other => Err(SplashError::surface(format!(
                "unknown channel order '{other}' (expected 'bgr' or 'rgb')"
            ))),
        }
    }
}

/// Pixel layout of the device memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32 bpp, bytes B, G, R, A.
    Bgra8888,
    /// 32 bpp, bytes R, G, B, A.
    Rgba8888,
    /// 24 bpp, bytes B, G, R.
    Bgr888,
    /// 24 bpp, bytes R, G, B.
    Rgb888,
    /// 16 bpp little-endian 5-6-5.
    Rgb565,
}

impl PixelFormat {
    pub fn from_bits_per_pixel(bpp: u32, order: ChannelOrder) -> SplashResult<Self> {
        match (bpp, order) {
            (32, ChannelOrder::Bgr) => Ok(Self::Bgra8888),
            (32, ChannelOrder::Rgb) => Ok(Self::Rgba8888),
            (24, ChannelOrder::Bgr) => Ok(Self::Bgr888),
            (24, ChannelOrder::Rgb) => Ok(Self::Rgb888),
            (16, _) => Ok(Self::Rgb565),
            (other, _) => Err(SplashError::surface(format!(
                "unsupported framebuffer depth: {other} bpp"
            ))),
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra8888 | Self::Rgba8888 => 4,
            Self::Bgr888 | Self::Rgb888 => 3,
            Self::Rgb565 => 2,
        }
    }

    /// Append the device encoding of `px` to `out`.
    pub fn encode(self, px: PremulRgba8, out: &mut Vec<u8>) {
        let [r, g, b, a] = px;
        match self {
            Self::Bgra8888 => out.extend_from_slice(&[b, g, r, a]),
            Self::Rgba8888 => out.extend_from_slice(&[r, g, b, a]),
            Self::Bgr888 => out.extend_from_slice(&[b, g, r]),
            Self::Rgb888 => out.extend_from_slice(&[r, g, b]),
            Self::Rgb565 => {
                let v = (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3);
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
}

/// Mode information as exposed under `/sys/class/graphics/fbN`.
///
/// `width` and `height` are the visible resolution. The virtual buffer may be larger (drivers
/// often allocate a second page for panning); it only bounds the visible mode and the stride.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FbGeometry {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Bytes per scanline in device memory.
    pub stride: usize,
}

impl FbGeometry {
    pub fn from_sysfs(dir: &Path, order: ChannelOrder) -> SplashResult<Self> {
        let size = read_attr(dir, "virtual_size")?;
        let (w, h) = size
            .split_once(',')
            .ok_or_else(|| SplashError::surface(format!("malformed virtual_size '{size}'")))?;
        let virtual_width = parse_u32(w, "virtual_size width")?;
        let virtual_height = parse_u32(h, "virtual_size height")?;

        let (width, height) = visible_mode(dir)?.unwrap_or((virtual_width, virtual_height));
        if width > virtual_width || height > virtual_height {
            return Err(SplashError::surface(format!(
                "mode {width}x{height} exceeds virtual size {virtual_width}x{virtual_height}"
            )));
        }

        let bpp = parse_u32(&read_attr(dir, "bits_per_pixel")?, "bits_per_pixel")?;
        let format = PixelFormat::from_bits_per_pixel(bpp, order)?;

        let min_stride = virtual_width as usize * format.bytes_per_pixel();
        // Older drivers do not expose `stride`; assume tightly packed rows.
        let stride = match std::fs::read_to_string(dir.join("stride")) {
            Ok(s) => parse_u32(&s, "stride")? as usize,
            Err(_) => min_stride,
        };
        if stride < min_stride {
            return Err(SplashError::surface(format!(
                "stride {stride} is smaller than a {virtual_width}px row"
            )));
        }

        Ok(Self {
            width,
            height,
            format,
            stride,
        })
    }
}

/// Visible resolution from the current `mode`, else the first entry of `modes`.
fn visible_mode(dir: &Path) -> SplashResult<Option<(u32, u32)>> {
    for attr in ["mode", "modes"] {
        let Ok(text) = std::fs::read_to_string(dir.join(attr)) else {
            continue;
        };
        if let Some(line) = text.lines().map(str::trim).find(|l| !l.is_empty()) {
            return parse_mode(line).map(Some);
        }
    }
    Ok(None)
}

/// Parse a sysfs mode line such as `U:800x480p-60` or `1920x1080i`.
fn parse_mode(line: &str) -> SplashResult<(u32, u32)> {
    let spec = line.split_once(':').map_or(line, |(_, rest)| rest);
    let (w, rest) = spec
        .split_once('x')
        .ok_or_else(|| SplashError::surface(format!("malformed mode '{line}'")))?;
    let h = rest
        .find(|c: char| !c.is_ascii_digit())
        .map_or(rest, |end| &rest[..end]);
    Ok((parse_u32(w, "mode width")?, parse_u32(h, "mode height")?))
}

fn read_attr(dir: &Path, name: &str) -> SplashResult<String> {
    let path = dir.join(name);
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("read framebuffer attribute '{}'", path.display()))?;
    Ok(s.trim().to_string())
}

fn parse_u32(s: &str, what: &str) -> SplashResult<u32> {
    s.trim()
        .parse::<u32>()
        .map_err(|_| SplashError::surface(format!("invalid {what}: '{}'", s.trim())))
}

pub struct FbDevSurface {
    device: Option<File>,
    path: PathBuf,
    geometry: FbGeometry,
    shadow: PixelBuffer,
    scratch: Vec<u8>,
}

impl FbDevSurface {
    /// Open `device` using the geometry published in `sysfs_dir`.
    #[tracing::instrument]
    pub fn open(device: &Path, sysfs_dir: &Path, order: ChannelOrder) -> SplashResult<Self> {
        let geometry = FbGeometry::from_sysfs(sysfs_dir, order)?;
        Self::with_geometry(device, geometry)
    }

    pub fn with_geometry(device: &Path, geometry: FbGeometry) -> SplashResult<Self> {
        let file = OpenOptions::new()
            .write(true)
            .open(device)
            .with_context(|| format!("open framebuffer '{}'", device.display()))?;
        tracing::info!(
            width = geometry.width,
            height = geometry.height,
            format = ?geometry.format,
            "framebuffer opened"
        );
        Ok(Self {
            device: Some(file),
            path: device.to_path_buf(),
            shadow: PixelBuffer::new(geometry.width, geometry.height)?,
            geometry,
            scratch: Vec::new(),
        })
    }

    pub fn geometry(&self) -> FbGeometry {
        self.geometry
    }

    fn flush_rows(&mut self, rows: RowSpan) -> SplashResult<()> {
        let Some(device) = self.device.as_ref() else {
            return Err(SplashError::surface("framebuffer already released"));
        };
        let format = self.geometry.format;
        for y in rows.start..rows.end {
            self.scratch.clear();
            for px in self.shadow.row(y).chunks_exact(4) {
                format.encode([px[0], px[1], px[2], px[3]], &mut self.scratch);
            }
            let offset = (y as u64) * (self.geometry.stride as u64);
            device
                .write_all_at(&self.scratch, offset)
                .with_context(|| format!("write row {y} to '{}'", self.path.display()))?;
        }
        Ok(())
    }

    fn ensure_open(&self) -> SplashResult<()> {
        if self.device.is_none() {
            return Err(SplashError::surface("framebuffer already released"));
        }
        Ok(())
    }
}

impl Surface for FbDevSurface {
    fn width(&self) -> u32 {
        self.geometry.width
    }

    fn height(&self) -> u32 {
        self.geometry.height
    }

    fn fill(&mut self, px: PremulRgba8) -> SplashResult<()> {
        self.ensure_open()?;
        self.shadow.fill(px);
        self.flush_rows(RowSpan {
            start: 0,
            end: self.geometry.height,
        })
    }

    fn blit(&mut self, x: i64, y: i64, image: &DecodedImage) -> SplashResult<()> {
        self.ensure_open()?;
        match self.shadow.blit(x, y, image) {
            Some(rows) => self.flush_rows(rows),
            None => Ok(()),
        }
    }

    fn release(&mut self) -> SplashResult<()> {
        if let Some(device) = self.device.take() {
            device
                .sync_data()
                .or_else(|e| {
                    // Character devices commonly reject fsync; the writes are already visible.
                    if e.kind() == std::io::ErrorKind::InvalidInput {
                        Ok(())
                    } else {
                        Err(e)
                    }
                })
                .with_context(|| format!("sync '{}'", self.path.display()))?;
            tracing::debug!(device = %self.path.display(), "framebuffer released");
        }
        Ok(())
    }
}
