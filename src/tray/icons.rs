//! Icon generation for system tray
//!
//! Draws the dimmer glyph programmatically: a disc whose right half darkens
//! with the strongest dimming level currently applied.

use image::{ImageBuffer, Rgba};

use crate::menu::OpacityBucket;

/// Icon edge length in pixels
pub const ICON_SIZE: u32 = 16;

const LIT: (u8, u8, u8) = (250, 210, 80);

/// Generate a 16x16 dimmer icon for the given dimming level
pub fn generate_icon(dim: OpacityBucket) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
    let mut img = ImageBuffer::new(ICON_SIZE, ICON_SIZE);

    let center = ICON_SIZE as f32 / 2.0;
    let radius = 6.0;
    let keep = 1.0 - dim.opacity();
    let shaded = (
        (f32::from(LIT.0) * keep) as u8,
        (f32::from(LIT.1) * keep) as u8,
        (f32::from(LIT.2) * keep) as u8,
    );

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let dx = x as f32 + 0.5 - center;
        let dy = y as f32 + 0.5 - center;

        *pixel = if (dx * dx + dy * dy).sqrt() > radius {
            Rgba([0, 0, 0, 0])
        } else if dx < 0.0 {
            Rgba([LIT.0, LIT.1, LIT.2, 255])
        } else {
            Rgba([shaded.0, shaded.1, shaded.2, 255])
        };
    }

    img
}

/// Generate icon and return as RGBA bytes
pub fn generate_icon_bytes(dim: OpacityBucket) -> Vec<u8> {
    generate_icon(dim).into_raw()
}
