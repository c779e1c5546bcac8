use crate::assets::DecodedImage;

pub type PremulRgba8 = [u8; 4];

/// Source-over for premultiplied pixels.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    match src[3] {
        255 => return src,
        0 => return dst,
        _ => {}
    }

    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(src[i], dc);
    }
    out
}

/// Rows touched by a blit, half-open `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowSpan {
    pub start: u32,
    pub end: u32,
}

/// Composite `src` over `dst` (a `width`x`height` premultiplied buffer) with its top-left
/// corner at `(x, y)`.
///
/// Any part of `src` falling outside `dst` is dropped, so offsets may be negative or beyond
/// the buffer. Returns the touched rows, or `None` when nothing overlaps.
pub fn blit_over(
    dst: &mut [u8],
    width: u32,
    height: u32,
    src: &DecodedImage,
    x: i64,
    y: i64,
) -> Option<RowSpan> {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + i64::from(src.width)).min(i64::from(width));
    let y1 = (y + i64::from(src.height)).min(i64::from(height));
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let dst_stride = width as usize * 4;
    let src_stride = src.width as usize * 4;
    let run = (x1 - x0) as usize * 4;

    for dy in y0..y1 {
        let sy = (dy - y) as usize;
        let sx = (x0 - x) as usize;
        let s_off = sy * src_stride + sx * 4;
        let d_off = dy as usize * dst_stride + x0 as usize * 4;
        let s_row = &src.rgba8_premul[s_off..s_off + run];
        let d_row = &mut dst[d_off..d_off + run];
        for (d, s) in d_row.chunks_exact_mut(4).zip(s_row.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
            d.copy_from_slice(&out);
        }
    }

    Some(RowSpan {
        start: y0 as u32,
        end: y1 as u32,
    })
}

/// Offset that centers a `inner` extent inside `outer`, truncating toward zero.
///
/// Negative when `inner` is larger than `outer`.
pub fn center_offset(outer: u32, inner: u32) -> i64 {
    (i64::from(outer) - i64::from(inner)) / 2
}

fn mul_div255(x: u16, y: u16) -> u8 {
    let prod = u32::from(x) * u32::from(y);
    ((prod + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}
