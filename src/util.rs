use glam::Vec3A;

/// RGB colour with float channels, nominally in [0, 1].
pub type Color = Vec3A;

pub fn rgba8_pack_u8(r: u8, g: u8, b: u8, a: u8) -> u32 {
    ((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32)
}

pub fn rgba8_unpack_u8(rgba8: u32) -> (u8, u8, u8, u8) {
    let r = ((rgba8 >> 24) & 0xFF) as u8;
    let g = ((rgba8 >> 16) & 0xFF) as u8;
    let b = ((rgba8 >> 8) & 0xFF) as u8;
    let a = (rgba8 & 0xFF) as u8;
    (r, g, b, a)
}

/// Quantizes a colour to 8 bits per channel: clamp to [0, 1], then floor(c * 255).
#[inline]
pub fn color_to_rgb8(color: Color) -> [u8; 3] {
    let c = color.clamp(Vec3A::ZERO, Vec3A::ONE) * 255.0;
    [c.x.floor() as u8, c.y.floor() as u8, c.z.floor() as u8]
}
