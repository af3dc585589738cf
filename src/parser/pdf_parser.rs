//! lopdf-backed [`DocumentSource`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::detect::sniff_path;
use crate::error::{Error, Result};
use crate::model::{EmbeddedImage, ImageEncoding};
use crate::pipeline::page_rotation;

use super::layout::{extract_page_spans, TextSpan};
use super::source::DocumentSource;

/// Default page size (US Letter) when no MediaBox can be found.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// A PDF file opened with lopdf.
pub struct PdfSource {
    path: PathBuf,
    doc: LopdfDocument,
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfSource {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let header = sniff_path(path)?;

        let doc = LopdfDocument::load(path).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }

        let pages = doc.get_pages();
        log::debug!(
            "Opened {} ({}, {} pages)",
            path.display(),
            header,
            pages.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            doc,
            pages,
        })
    }

    /// PDF version from the file header.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(Error::PageOutOfRange(page, self.pages.len() as u32))
    }

    /// Look up a page attribute, following `/Parent` for inheritable keys.
    fn inherited<'a>(&'a self, mut dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        for _ in 0..32 {
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            let parent = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
            dict = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    /// Resolve an object that may be an indirect reference to a dictionary.
    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match obj {
            Object::Reference(r) => self.doc.get_dictionary(*r).ok(),
            Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// `(name, object id)` of every image XObject on a page.
    fn image_xobjects(&self, page: u32) -> Result<Vec<(String, ObjectId)>> {
        let page_dict = self.doc.get_dictionary(self.page_id(page)?)?;
        let Some(resources) = self
            .inherited(page_dict, b"Resources")
            .and_then(|r| self.resolve_dict(r))
        else {
            return Ok(Vec::new());
        };
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|x| self.resolve_dict(x))
        else {
            return Ok(Vec::new());
        };

        let images = xobjects
            .iter()
            .filter_map(|(name, obj)| {
                let id = obj.as_reference().ok()?;
                let stream = self.doc.get_object(id).ok()?.as_stream().ok()?;
                let is_image = stream
                    .dict
                    .get(b"Subtype")
                    .and_then(Object::as_name_str)
                    .map(|s| s == "Image")
                    .unwrap_or(false);
                is_image.then(|| (String::from_utf8_lossy(name).to_string(), id))
            })
            .collect();
        Ok(images)
    }

    /// Read one image XObject into an [`EmbeddedImage`].
    ///
    /// JPEG and JPEG 2000 streams are kept in their container after any
    /// leading filters are undone. Fax and JBIG2 streams are rejected.
    fn extract_image(&self, name: &str, id: ObjectId) -> Result<EmbeddedImage> {
        let stream = self
            .doc
            .get_object(id)
            .and_then(Object::as_stream)
            .map_err(|e| Error::ImageExtract(format!("{}: {}", name, e)))?;
        let dict = &stream.dict;

        let int = |key: &[u8]| dict.get(key).and_then(Object::as_i64).ok();
        let width = int(b"Width").unwrap_or(0).max(0) as u32;
        let height = int(b"Height").unwrap_or(0).max(0) as u32;
        let bits = int(b"BitsPerComponent").unwrap_or(8) as u8;

        let filters = stream_filters(stream);
        let fail = |what: String| Error::ImageExtract(format!("{}: {}", name, what));

        let encoding = match filters.last().map(Vec::as_slice) {
            Some(b"DCTDecode") => Some(ImageEncoding::Jpeg),
            Some(b"JPXDecode") => Some(ImageEncoding::Jpeg2000),
            Some(f @ (b"CCITTFaxDecode" | b"JBIG2Decode")) => {
                return Err(fail(format!(
                    "{} images are not supported",
                    String::from_utf8_lossy(f)
                )));
            }
            _ => None,
        };

        let image = match encoding {
            Some(encoding) => {
                let data = decode_filters(stream, &filters[..filters.len() - 1])
                    .map_err(|e| fail(e.to_string()))?;
                EmbeddedImage::new(name, data, encoding)
            }
            None => {
                let data = decode_filters(stream, &filters).map_err(|e| fail(e.to_string()))?;
                let (color_space, palette) = match dict.get(b"ColorSpace") {
                    Ok(obj) => self.color_space(obj, 0),
                    Err(_) => ("DeviceGray".to_string(), None),
                };
                let encoding = match palette {
                    Some(palette) => ImageEncoding::Indexed {
                        base: color_space,
                        bits_per_component: bits,
                        palette,
                    },
                    None => ImageEncoding::Raw {
                        color_space,
                        bits_per_component: bits,
                    },
                };
                EmbeddedImage::new(name, data, encoding)
            }
        };
        Ok(image.with_dimensions(width, height))
    }

    /// Device colour space behind `obj`, plus the lookup table of an
    /// indexed space.
    ///
    /// ICC profiles resolve to the device space with the same number of
    /// components (`/N`), falling back to `/Alternate`.
    fn color_space(&self, obj: &Object, depth: u8) -> (String, Option<Vec<u8>>) {
        let fallback = || ("DeviceRGB".to_string(), None);
        if depth > 8 {
            return fallback();
        }
        let arr = match obj {
            Object::Name(n) => return (String::from_utf8_lossy(n).to_string(), None),
            Object::Reference(r) => {
                return match self.doc.get_object(*r) {
                    Ok(target) => self.color_space(target, depth + 1),
                    Err(_) => fallback(),
                }
            }
            Object::Array(arr) => arr,
            _ => return fallback(),
        };
        let Some(family) = arr.first().and_then(|o| o.as_name().ok()) else {
            return fallback();
        };

        match family {
            b"ICCBased" => {
                let Some(profile) = arr
                    .get(1)
                    .and_then(|o| o.as_reference().ok())
                    .and_then(|id| self.doc.get_object(id).ok())
                    .and_then(|o| o.as_stream().ok())
                else {
                    return fallback();
                };
                match profile.dict.get(b"N").and_then(Object::as_i64) {
                    Ok(1) => ("DeviceGray".to_string(), None),
                    Ok(3) => ("DeviceRGB".to_string(), None),
                    Ok(4) => ("DeviceCMYK".to_string(), None),
                    _ => match profile.dict.get(b"Alternate") {
                        Ok(alt) => self.color_space(alt, depth + 1),
                        Err(_) => fallback(),
                    },
                }
            }
            b"Indexed" | b"I" => {
                let base = arr
                    .get(1)
                    .map(|b| self.color_space(b, depth + 1).0)
                    .unwrap_or_else(|| fallback().0);
                let lookup = match arr.get(3) {
                    Some(Object::String(bytes, _)) => Some(bytes.clone()),
                    Some(Object::Reference(r)) => self
                        .doc
                        .get_object(*r)
                        .ok()
                        .and_then(|o| o.as_stream().ok())
                        .and_then(|s| decode_filters(s, &stream_filters(s)).ok()),
                    _ => None,
                };
                (base, Some(lookup.unwrap_or_default()))
            }
            other => (String::from_utf8_lossy(other).to_string(), None),
        }
    }
}

/// Filter names of a stream, in application order.
fn stream_filters(stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(n)) => vec![n.clone()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Undo the first `filters` of `stream`, leaving any later ones applied.
fn decode_filters(stream: &Stream, filters: &[Vec<u8>]) -> Result<Vec<u8>> {
    if filters.is_empty() {
        return Ok(stream.content.clone());
    }

    // lopdf declines to decompress image streams, so decode a plain copy.
    let mut dict = Dictionary::new();
    dict.set(
        "Filter",
        Object::Array(filters.iter().cloned().map(Object::Name).collect()),
    );
    if let Ok(Object::Array(parms)) = stream.dict.get(b"DecodeParms") {
        dict.set(
            "DecodeParms",
            Object::Array(parms.iter().take(filters.len()).cloned().collect()),
        );
    } else if let Ok(parms) = stream.dict.get(b"DecodeParms") {
        if stream_filters(stream).len() == 1 {
            dict.set("DecodeParms", parms.clone());
        }
    }
    Ok(Stream::new(dict, stream.content.clone()).decompressed_content()?)
}

impl DocumentSource for PdfSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_numbers(&self) -> Vec<u32> {
        self.pages.keys().copied().collect()
    }

    fn page_size(&self, page: u32) -> Result<(f32, f32)> {
        let page_dict = self.doc.get_dictionary(self.page_id(page)?)?;
        let size = self
            .inherited(page_dict, b"MediaBox")
            .and_then(|b| b.as_array().ok())
            .filter(|arr| arr.len() >= 4)
            .and_then(|arr| {
                let n: Vec<f32> = arr.iter().filter_map(|o| o.as_float().ok()).collect();
                (n.len() >= 4).then(|| ((n[2] - n[0]).abs(), (n[3] - n[1]).abs()))
            });
        Ok(size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    fn page_rotation(&self, page: u32) -> Result<u16> {
        let angle = page_rotation(&self.doc, self.page_id(page)?);
        Ok((angle.rem_euclid(360) / 90 * 90) as u16)
    }

    fn native_text(&self, page: u32) -> Result<String> {
        self.page_id(page)?;
        self.doc
            .extract_text(&[page])
            .map_err(|e| Error::PdfParse(format!("Page {}: {}", page, e)))
    }

    fn text_spans(&self, page: u32) -> Result<Vec<TextSpan>> {
        extract_page_spans(&self.doc, self.page_id(page)?)
    }

    fn embedded_images(&self, page: u32) -> Result<Vec<EmbeddedImage>> {
        let mut images = Vec::new();
        for (name, id) in self.image_xobjects(page)? {
            match self.extract_image(&name, id) {
                Ok(image) => images.push(image),
                Err(e) => log::warn!("Page {}: skipping image {}: {}", page, name, e),
            }
        }
        Ok(images)
    }

    fn embedded_image_count(&self, page: u32) -> Result<usize> {
        Ok(self.image_xobjects(page)?.len())
    }
}
