//! Fixed-size RGB drawing surface

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::{Error, Result};

/// Surface width in pixels
pub const SURFACE_WIDTH: u32 = 800;
/// Surface height in pixels
pub const SURFACE_HEIGHT: u32 = 600;

/// Plotters drawing area over a surface's pixel buffer
pub type Root<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// An RGB pixel buffer that a rendering engine draws onto.
///
/// Acquired and dropped within a single render; never shared or reused.
#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    /// A white surface of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![255; (width as usize) * (height as usize) * 3],
        }
    }

    /// The 800x600 surface used for every raster render
    pub fn standard() -> Self {
        Self::new(SURFACE_WIDTH, SURFACE_HEIGHT)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB bytes, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Borrow the buffer as a plotters drawing area.
    ///
    /// The area must be dropped before the surface is encoded.
    pub fn drawing_area(&mut self) -> Root<'_> {
        BitMapBackend::with_buffer(&mut self.pixels, (self.width, self.height)).into_drawing_area()
    }

    /// Encode the current contents as PNG
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        // RGB PNGs of chart-like content usually land well under a tenth of raw size
        let mut encoded = Vec::with_capacity(self.pixels.len() / 10);
        PngEncoder::new(&mut encoded)
            .write_image(&self.pixels, self.width, self.height, ExtendedColorType::Rgb8)
            .map_err(|e| Error::EncodeError(e.to_string()))?;
        Ok(encoded)
    }
}
