use crate::foundation::error::{SplashError, SplashResult};

/// Decoded raster, premultiplied RGBA8, row-major with no padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Vec<u8>,
}

impl DecodedImage {
    /// Wrap already-premultiplied pixels. `rgba8_premul` must hold exactly `width * height * 4` bytes.
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> SplashResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| SplashError::decode("image size overflow"))?;
        if rgba8_premul.len() != expected {
            return Err(SplashError::decode(format!(
                "expected {expected} bytes for {width}x{height} rgba8, got {}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = &self.rgba8_premul[idx..idx + 4];
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Decode PNG, JPEG, GIF or BMP bytes; the format is sniffed from the content.
pub fn decode_image(bytes: &[u8]) -> SplashResult<DecodedImage> {
    let dyn_img =
        image::load_from_memory(bytes).map_err(|e| SplashError::decode(e.to_string()))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(DecodedImage {
        width,
        height,
        rgba8_premul,
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
