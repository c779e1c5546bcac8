use crate::{
    assets::DecodedImage,
    foundation::error::{SplashError, SplashResult},
    render::composite::{PremulRgba8, RowSpan, blit_over},
};

/// A display the splash can draw on.
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Set every pixel to `px`.
    fn fill(&mut self, px: PremulRgba8) -> SplashResult<()>;

    /// Composite `image` with its top-left corner at `(x, y)`, clipping to the surface.
    fn blit(&mut self, x: i64, y: i64, image: &DecodedImage) -> SplashResult<()>;

    /// Give the display back. The driver calls this exactly once.
    fn release(&mut self) -> SplashResult<()>;
}

impl<S: Surface + ?Sized> Surface for Box<S> {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }

    fn fill(&mut self, px: PremulRgba8) -> SplashResult<()> {
        (**self).fill(px)
    }

    fn blit(&mut self, x: i64, y: i64, image: &DecodedImage) -> SplashResult<()> {
        (**self).blit(x, y, image)
    }

    fn release(&mut self) -> SplashResult<()> {
        (**self).release()
    }
}

/// Premultiplied RGBA8 pixel store shared by the concrete surfaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> SplashResult<Self> {
        if width == 0 || height == 0 {
            return Err(SplashError::surface("surface width/height must be non-zero"));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| SplashError::surface("surface size overflow"))?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * 4;
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<PremulRgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    pub fn fill(&mut self, px: PremulRgba8) {
        for d in self.data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
    }

    pub fn blit(&mut self, x: i64, y: i64, image: &DecodedImage) -> Option<RowSpan> {
        blit_over(&mut self.data, self.width, self.height, image, x, y)
    }
}

/// Off-screen surface. Used for tests and for rendering without a framebuffer.
#[derive(Clone, Debug)]
pub struct MemorySurface {
    buf: PixelBuffer,
    released: bool,
}

impl MemorySurface {
    pub fn new(width: u32, height: u32) -> SplashResult<Self> {
        Ok(Self {
            buf: PixelBuffer::new(width, height)?,
            released: false,
        })
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buf
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<PremulRgba8> {
        self.buf.pixel(x, y)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Return `true` when every pixel equals `px`.
    pub fn is_uniform(&self, px: PremulRgba8) -> bool {
        self.buf.data().chunks_exact(4).all(|d| d == px)
    }

    fn ensure_live(&self) -> SplashResult<()> {
        if self.released {
            return Err(SplashError::surface("surface already released"));
        }
        Ok(())
    }
}

impl Surface for MemorySurface {
    fn width(&self) -> u32 {
        self.buf.width()
    }

    fn height(&self) -> u32 {
        self.buf.height()
    }

    fn fill(&mut self, px: PremulRgba8) -> SplashResult<()> {
        self.ensure_live()?;
        self.buf.fill(px);
        Ok(())
    }

    fn blit(&mut self, x: i64, y: i64, image: &DecodedImage) -> SplashResult<()> {
        self.ensure_live()?;
        self.buf.blit(x, y, image);
        Ok(())
    }

    fn release(&mut self) -> SplashResult<()> {
        self.released = true;
        Ok(())
    }
}
