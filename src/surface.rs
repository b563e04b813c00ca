use crate::error::RenderError;
use crate::util::*;
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

/// Where rasterized pixels end up.
///
/// `draw` takes `&self` because every rasterizer thread of a frame writes through the same
/// surface at once. Pixels are addressed row-major, `index = y * width + x`.
pub trait Surface: Sync {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn clear(&mut self);
    fn present(&mut self);
    fn draw(&self, index: usize, rgb: [u8; 3]);
}

/// In-memory surface with an atomic back buffer and a plain front buffer.
///
/// Pixels are packed RGBA8. A cleared pixel is 0, and every drawn pixel carries alpha
/// 0xFF, so a drawn black pixel still differs from the background.
pub struct Framebuffer {
    width: usize,
    height: usize,
    back: Vec<AtomicU32>,
    front: Vec<u32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Result<Self, RenderError> {
        let len = width.checked_mul(height).ok_or(RenderError::Allocation {
            what: "framebuffer",
            cells: usize::MAX,
        })?;
        let mut back = Vec::new();
        back.try_reserve_exact(len)
            .map_err(|_| RenderError::Allocation {
                what: "framebuffer",
                cells: len,
            })?;
        back.extend((0..len).map(|_| AtomicU32::new(0)));
        let mut front = Vec::new();
        front
            .try_reserve_exact(len)
            .map_err(|_| RenderError::Allocation {
                what: "framebuffer",
                cells: len,
            })?;
        front.resize(len, 0);
        Ok(Self {
            width,
            height,
            back,
            front,
        })
    }

    /// Packed RGBA8 value of a back buffer pixel.
    pub fn pixel(&self, index: usize) -> u32 {
        self.back[index].load(Ordering::Relaxed)
    }

    pub fn rgb(&self, index: usize) -> [u8; 3] {
        let (r, g, b, _) = rgba8_unpack_u8(self.pixel(index));
        [r, g, b]
    }

    /// Copy of the back buffer, for comparing frames.
    pub fn snapshot(&self) -> Vec<u32> {
        self.back.iter().map(|p| p.load(Ordering::Relaxed)).collect()
    }

    /// The last presented frame.
    pub fn front(&self) -> &[u32] {
        &self.front
    }

    /// Writes the last presented frame as a PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        let mut image = image::RgbaImage::new(self.width as u32, self.height as u32);
        let buffer: &mut [u8] = &mut image;
        buffer
            .par_chunks_exact_mut(4)
            .zip(self.front.par_iter())
            .for_each(|(pixel, packed)| {
                let (r, g, b, a) = rgba8_unpack_u8(*packed);
                pixel[0] = r;
                pixel[1] = g;
                pixel[2] = b;
                pixel[3] = a;
            });
        image.save(path)?;
        Ok(())
    }
}

impl Surface for Framebuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn clear(&mut self) {
        self.back
            .par_iter()
            .with_min_len(self.width.max(1))
            .for_each(|p| p.store(0, Ordering::Relaxed));
    }

    fn present(&mut self) {
        // Exclusive access here, so the relaxed loads see every write of the frame
        let back = &self.back;
        self.front
            .par_chunks_mut(self.width.max(1))
            .enumerate()
            .for_each(|(y, row)| {
                let start = y * row.len();
                for (x, out) in row.iter_mut().enumerate() {
                    *out = back[start + x].load(Ordering::Relaxed);
                }
            });
    }

    #[inline]
    fn draw(&self, index: usize, rgb: [u8; 3]) {
        self.back[index].store(rgba8_pack_u8(rgb[0], rgb[1], rgb[2], 0xFF), Ordering::Relaxed);
    }
}
