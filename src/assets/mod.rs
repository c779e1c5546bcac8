pub mod bundle;
pub mod decode;

pub use bundle::{Bundle, SCRIPT_ENTRY, normalize_entry_name};
pub use decode::{DecodedImage, decode_image};
