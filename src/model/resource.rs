//! Raster images embedded in page resources.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};

use crate::error::{Error, Result};

/// How an embedded image stream is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageEncoding {
    /// DCTDecode stream, a complete JPEG file
    Jpeg,
    /// JPXDecode stream, a complete JPEG 2000 file
    Jpeg2000,
    /// Decoded sample data that still needs a container
    Raw {
        color_space: String,
        bits_per_component: u8,
    },
    /// Palette indices into `palette`, whose entries are `base` samples
    Indexed {
        base: String,
        bits_per_component: u8,
        palette: Vec<u8>,
    },
}

/// An image XObject taken from a page's resources.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// Resource name in the page's XObject dictionary
    pub name: String,
    pub data: Vec<u8>,
    pub encoding: ImageEncoding,
    pub width: u32,
    pub height: u32,
}

impl EmbeddedImage {
    pub fn new(name: impl Into<String>, data: Vec<u8>, encoding: ImageEncoding) -> Self {
        Self {
            name: name.into(),
            data,
            encoding,
            width: 0,
            height: 0,
        }
    }

    /// Set image dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// File extension used when the image is persisted.
    ///
    /// Raw sample data is re-encoded as PNG.
    pub fn extension(&self) -> &'static str {
        match self.encoding {
            ImageEncoding::Jpeg => "jpg",
            ImageEncoding::Jpeg2000 => "jp2",
            ImageEncoding::Raw { .. } | ImageEncoding::Indexed { .. } => "png",
        }
    }

    /// Bytes to write to disk, matching [`extension`](Self::extension).
    pub fn file_bytes(&self) -> Result<Vec<u8>> {
        match self.encoding {
            ImageEncoding::Jpeg | ImageEncoding::Jpeg2000 => Ok(self.data.clone()),
            ImageEncoding::Raw { .. } | ImageEncoding::Indexed { .. } => {
                let mut out = Cursor::new(Vec::new());
                self.decode()?.write_to(&mut out, ImageFormat::Png)?;
                Ok(out.into_inner())
            }
        }
    }

    /// Decode into pixels for OCR.
    pub fn decode(&self) -> Result<DynamicImage> {
        match &self.encoding {
            ImageEncoding::Jpeg => Ok(image::load_from_memory_with_format(
                &self.data,
                ImageFormat::Jpeg,
            )?),
            ImageEncoding::Jpeg2000 => Err(Error::ImageExtract(format!(
                "{}: JPEG 2000 images cannot be decoded",
                self.name
            ))),
            ImageEncoding::Raw {
                color_space,
                bits_per_component,
            } => self.decode_raw(color_space, *bits_per_component, &self.data),
            ImageEncoding::Indexed {
                base,
                bits_per_component,
                palette,
            } => {
                let samples = self.expand_palette(base, *bits_per_component, palette)?;
                self.decode_raw(base, 8, &samples)
            }
        }
    }

    /// Replace each palette index with its 8-bit `base` samples.
    fn expand_palette(&self, base: &str, bits: u8, palette: &[u8]) -> Result<Vec<u8>> {
        if !matches!(bits, 1 | 2 | 4 | 8) {
            return Err(Error::ImageExtract(format!(
                "{}: unsupported palette depth {} bpc",
                self.name, bits
            )));
        }
        let comps = components(base).unwrap_or(3);
        let (w, h) = (self.width as usize, self.height as usize);
        let row_bytes = (w * bits as usize).div_ceil(8);
        let mask = (1u16 << bits) - 1;

        let mut samples = Vec::with_capacity(w * h * comps);
        for row in self.data.chunks(row_bytes).take(h) {
            for x in 0..w {
                let bit = x * bits as usize;
                let byte = row.get(bit / 8).copied().unwrap_or(0) as u16;
                let index = (byte >> (8 - bits as usize - bit % 8)) & mask;
                let start = index as usize * comps;
                match palette.get(start..start + comps) {
                    Some(entry) => samples.extend_from_slice(entry),
                    None => samples.extend(std::iter::repeat(0).take(comps)),
                }
            }
        }
        Ok(samples)
    }

    fn decode_raw(&self, color_space: &str, bits: u8, data: &[u8]) -> Result<DynamicImage> {
        let (w, h) = (self.width, self.height);
        let pixels = w as usize * h as usize;
        let unsupported = || {
            Error::ImageExtract(format!(
                "{}: unsupported raw layout {} / {} bpc",
                self.name, color_space, bits
            ))
        };

        // Unknown families at 8 bpc are read by their sample count.
        let comps = match (components(color_space), bits) {
            (Some(n), _) => n,
            (None, 8) if pixels > 0 => match data.len() / pixels {
                n @ (1 | 3 | 4) => n,
                _ => return Err(unsupported()),
            },
            _ => return Err(unsupported()),
        };

        let image = match (comps, bits) {
            (1, 8) => GrayImage::from_raw(w, h, data[..data.len().min(pixels)].to_vec())
                .map(DynamicImage::ImageLuma8),
            (1, 1) => {
                let row_bytes = (w as usize).div_ceil(8);
                let mut samples = Vec::with_capacity(pixels);
                for row in data.chunks(row_bytes).take(h as usize) {
                    for x in 0..w as usize {
                        let bit = (row.get(x / 8).copied().unwrap_or(0) >> (7 - x % 8)) & 1;
                        samples.push(if bit == 1 { 255 } else { 0 });
                    }
                }
                GrayImage::from_raw(w, h, samples).map(DynamicImage::ImageLuma8)
            }
            (3, 8) => RgbImage::from_raw(w, h, data[..data.len().min(pixels * 3)].to_vec())
                .map(DynamicImage::ImageRgb8),
            (4, 8) => {
                let rgb: Vec<u8> = data
                    .chunks_exact(4)
                    .take(pixels)
                    .flat_map(|p| {
                        let k = 255 - p[3] as u16;
                        [p[0], p[1], p[2]].map(|c| ((255 - c as u16) * k / 255) as u8)
                    })
                    .collect();
                RgbImage::from_raw(w, h, rgb).map(DynamicImage::ImageRgb8)
            }
            _ => return Err(unsupported()),
        };

        image.ok_or_else(|| {
            Error::ImageExtract(format!(
                "{}: sample data does not match {}x{}",
                self.name, w, h
            ))
        })
    }
}

/// Samples per pixel of a device colour space.
fn components(color_space: &str) -> Option<usize> {
    match color_space {
        "DeviceGray" | "CalGray" | "G" => Some(1),
        "DeviceRGB" | "CalRGB" | "RGB" => Some(3),
        "DeviceCMYK" | "CMYK" => Some(4),
        _ => None,
    }
}
