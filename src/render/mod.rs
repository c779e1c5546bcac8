pub mod composite;
pub mod fbdev;
pub mod surface;

pub use composite::{PremulRgba8, RowSpan, blit_over, center_offset, over};
pub use fbdev::{ChannelOrder, FbDevSurface, FbGeometry, PixelFormat};
pub use surface::{MemorySurface, PixelBuffer, Surface};
