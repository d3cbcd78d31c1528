//! Decoding image XObjects into 8-bit pixel buffers.
//!
//! Only what embedded figures actually use is supported: Flate/LZW/ASCII
//! filters via lopdf, baseline JPEG via the `image` crate, 1/2/4/8/16-bit
//! samples, device and calibrated colour spaces, `ICCBased` by component
//! count, `Indexed`, `Separation`, `/Decode` inversion and stencil masks.
//! JPEG 2000, JBIG2 and CCITT data are passed through undecoded by
//! [`crate::pdf::recover`] instead.

use crate::error::RecoverError;
use crate::pdf::objects::{get_int, get_resolved, resolve};
use image::{DynamicImage, ImageBuffer, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;

/// A decoded image: interleaved 8-bit samples, colour first, alpha last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    pub width: u32,
    pub height: u32,
    /// Colour components per pixel, alpha excluded: 1 gray, 3 RGB, 4 CMYK.
    pub n: u8,
    pub alpha: bool,
    pub samples: Vec<u8>,
}

impl Pixmap {
    pub fn new(
        width: u32,
        height: u32,
        n: u8,
        alpha: bool,
        samples: Vec<u8>,
    ) -> Result<Self, RecoverError> {
        let pix = Self {
            width,
            height,
            n,
            alpha,
            samples,
        };
        let expected = pix
            .pixel_count()
            .and_then(|count| count.checked_mul(pix.stride()))
            .ok_or(RecoverError::ImageTooLarge { width, height })?;
        if pix.samples.len() != expected {
            return Err(RecoverError::ShortSampleData {
                expected,
                actual: pix.samples.len(),
            });
        }
        Ok(pix)
    }

    /// Bytes per pixel.
    pub fn stride(&self) -> usize {
        self.n as usize + usize::from(self.alpha)
    }

    fn pixel_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Copy with the alpha channel dropped.
    pub fn without_alpha(&self) -> Pixmap {
        if !self.alpha {
            return self.clone();
        }
        let n = self.n as usize;
        let samples = self
            .samples
            .chunks_exact(self.stride())
            .flat_map(|px| px[..n].iter().copied())
            .collect();
        Pixmap {
            samples,
            alpha: false,
            ..*self
        }
    }

    /// Use the first channel of `mask` as this image's alpha.
    pub fn with_mask(&self, mask: &Pixmap) -> Result<Pixmap, RecoverError> {
        if (self.width, self.height) != (mask.width, mask.height) {
            return Err(RecoverError::MaskMismatch {
                base_w: self.width,
                base_h: self.height,
                mask_w: mask.width,
                mask_h: mask.height,
            });
        }
        let base = self.without_alpha();
        let n = base.n as usize;
        let mut samples = Vec::with_capacity(base.samples.len() / n.max(1) * (n + 1));
        for (px, m) in base
            .samples
            .chunks_exact(n)
            .zip(mask.samples.chunks_exact(mask.stride()))
        {
            samples.extend_from_slice(px);
            samples.push(m[0]);
        }
        Pixmap::new(base.width, base.height, base.n, true, samples)
    }

    /// Convert to RGB, keeping alpha if present.
    pub fn to_rgb(&self) -> Pixmap {
        let stride = self.stride();
        let mut samples =
            Vec::with_capacity(self.samples.len() / stride.max(1) * (3 + usize::from(self.alpha)));
        for px in self.samples.chunks_exact(stride) {
            let rgb = match self.n {
                1 => [px[0], px[0], px[0]],
                4 => cmyk_to_rgb(px[0], px[1], px[2], px[3]),
                _ => [px[0], px[1], px[2]],
            };
            samples.extend_from_slice(&rgb);
            if self.alpha {
                samples.push(px[stride - 1]);
            }
        }
        Pixmap {
            samples,
            n: 3,
            ..*self
        }
    }

    pub fn to_dynamic(&self) -> Result<DynamicImage, RecoverError> {
        let short = || RecoverError::ShortSampleData {
            expected: self
                .pixel_count()
                .map_or(usize::MAX, |count| count.saturating_mul(self.stride())),
            actual: self.samples.len(),
        };
        let (w, h) = (self.width, self.height);
        let data = self.samples.clone();
        let img = match (self.n, self.alpha) {
            (1, false) => DynamicImage::ImageLuma8(ImageBuffer::from_raw(w, h, data).ok_or_else(short)?),
            (1, true) => DynamicImage::ImageLumaA8(ImageBuffer::from_raw(w, h, data).ok_or_else(short)?),
            (3, false) => DynamicImage::ImageRgb8(ImageBuffer::from_raw(w, h, data).ok_or_else(short)?),
            (3, true) => DynamicImage::ImageRgba8(ImageBuffer::from_raw(w, h, data).ok_or_else(short)?),
            _ => return self.to_rgb().to_dynamic(),
        };
        Ok(img)
    }

    pub fn from_dynamic(img: DynamicImage) -> Pixmap {
        let (width, height) = (img.width(), img.height());
        let (n, alpha, samples) = match img {
            DynamicImage::ImageLuma8(b) => (1, false, b.into_raw()),
            DynamicImage::ImageLumaA8(b) => (1, true, b.into_raw()),
            DynamicImage::ImageRgb8(b) => (3, false, b.into_raw()),
            DynamicImage::ImageRgba8(b) => (3, true, b.into_raw()),
            other if other.color().has_alpha() => (3, true, other.to_rgba8().into_raw()),
            other => (3, false, other.to_rgb8().into_raw()),
        };
        Pixmap {
            width,
            height,
            n,
            alpha,
            samples,
        }
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, RecoverError> {
        let img = self.to_dynamic()?;
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(buf)
    }

    /// Netpbm PAM (`P7`) encoding. Unlike PNG it carries CMYK as-is.
    pub fn encode_pam(&self) -> Vec<u8> {
        let tupltype = match (self.n, self.alpha) {
            (1, false) => "GRAYSCALE",
            (1, true) => "GRAYSCALE_ALPHA",
            (3, false) => "RGB",
            (3, true) => "RGB_ALPHA",
            (4, false) => "CMYK",
            _ => "CMYK_ALPHA",
        };
        let mut out = format!(
            "P7\nWIDTH {}\nHEIGHT {}\nDEPTH {}\nMAXVAL 255\nTUPLTYPE {}\nENDHDR\n",
            self.width,
            self.height,
            self.stride(),
            tupltype
        )
        .into_bytes();
        out.extend_from_slice(&self.samples);
        out
    }
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let ink = |v: u8| ((255 - v as u16) * (255 - k as u16) / 255) as u8;
    [ink(c), ink(m), ink(y)]
}

// ── Streams ──────────────────────────────────────────────────────────────

/// Names in the stream's `/Filter` entry, in application order.
pub fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match get_resolved(doc, dict, b"Filter") {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| resolve(doc, o).ok()?.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Stream payload with its filters removed.
pub fn stream_data(doc: &Document, stream: &Stream) -> Result<Vec<u8>, RecoverError> {
    if filter_names(doc, &stream.dict).is_empty() {
        Ok(stream.content.clone())
    } else {
        Ok(stream.decompressed_content()?)
    }
}

/// Decode the image XObject `id`.
pub fn decode_image(doc: &Document, id: ObjectId) -> Result<Pixmap, RecoverError> {
    let stream = doc.get_object(id)?.as_stream()?;
    decode_stream(doc, stream)
}

pub fn decode_stream(doc: &Document, stream: &Stream) -> Result<Pixmap, RecoverError> {
    let filters = filter_names(doc, &stream.dict);
    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode" | b"DCT") => {
            if filters.len() > 1 {
                return Err(RecoverError::UnsupportedFilter(joined(&filters)));
            }
            let img = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)?;
            Ok(Pixmap::from_dynamic(img))
        }
        Some(
            name @ (b"JPXDecode" | b"JBIG2Decode" | b"CCITTFaxDecode" | b"CCF"),
        ) => Err(RecoverError::UnsupportedFilter(
            String::from_utf8_lossy(name).into_owned(),
        )),
        _ => {
            let data = stream_data(doc, stream)?;
            decode_samples(doc, &stream.dict, &data)
        }
    }
}

fn joined(filters: &[Vec<u8>]) -> String {
    filters
        .iter()
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Raw samples ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Single tint channel; full tint is dark.
    Separation,
    Indexed {
        base_n: u8,
        hival: usize,
        lookup: Vec<u8>,
    },
    /// `/ImageMask true`: 1-bit, painted samples become opaque.
    Stencil,
}

impl ColorSpace {
    fn parse(doc: &Document, obj: &Object) -> Result<Self, RecoverError> {
        match resolve(doc, obj)? {
            Object::Name(name) => Self::from_family(name),
            Object::Array(items) => {
                let family = items
                    .first()
                    .and_then(|o| resolve(doc, o).ok())
                    .and_then(|o| o.as_name().ok())
                    .ok_or(RecoverError::MissingKey("ColorSpace"))?;
                match family {
                    b"ICCBased" => {
                        let n = items
                            .get(1)
                            .and_then(|o| resolve(doc, o).ok())
                            .and_then(|o| o.as_stream().ok())
                            .and_then(|s| get_int(doc, &s.dict, b"N"));
                        match n {
                            Some(1) => Ok(Self::Gray),
                            Some(3) => Ok(Self::Rgb),
                            Some(4) => Ok(Self::Cmyk),
                            other => Err(RecoverError::UnsupportedColorSpace(format!(
                                "ICCBased with /N {other:?}"
                            ))),
                        }
                    }
                    b"Indexed" | b"I" => Self::parse_indexed(doc, items),
                    b"Separation" => Ok(Self::Separation),
                    other => Self::from_family(other),
                }
            }
            other => Err(RecoverError::UnsupportedColorSpace(format!("{other:?}"))),
        }
    }

    fn from_family(name: &[u8]) -> Result<Self, RecoverError> {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => Ok(Self::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(Self::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(Self::Cmyk),
            other => Err(RecoverError::UnsupportedColorSpace(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    fn parse_indexed(doc: &Document, items: &[Object]) -> Result<Self, RecoverError> {
        let base = items
            .get(1)
            .ok_or(RecoverError::MissingKey("ColorSpace"))?;
        let base_n = match Self::parse(doc, base)? {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
            other => {
                return Err(RecoverError::UnsupportedColorSpace(format!(
                    "Indexed over {other:?}"
                )))
            }
        };
        let hival = items
            .get(2)
            .and_then(|o| resolve(doc, o).ok())
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(255)
            .clamp(0, 255) as usize;
        let lookup = match items.get(3).map(|o| resolve(doc, o)).transpose()? {
            Some(Object::String(bytes, _)) => bytes.clone(),
            Some(Object::Stream(s)) => stream_data(doc, s)?,
            _ => return Err(RecoverError::MissingKey("Lookup")),
        };
        Ok(Self::Indexed {
            base_n,
            hival,
            lookup,
        })
    }

    /// Components per source sample.
    fn components(&self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Cmyk => 4,
            _ => 1,
        }
    }

    /// Components per decoded pixel.
    fn output_n(&self) -> u8 {
        match self {
            Self::Rgb => 3,
            Self::Cmyk => 4,
            Self::Indexed { base_n, .. } => *base_n,
            _ => 1,
        }
    }
}

fn decode_samples(doc: &Document, dict: &Dictionary, data: &[u8]) -> Result<Pixmap, RecoverError> {
    let width = positive(doc, dict, b"Width", "Width")?;
    let height = positive(doc, dict, b"Height", "Height")?;

    let stencil = matches!(get_resolved(doc, dict, b"ImageMask"), Some(Object::Boolean(true)));
    let (space, bpc) = if stencil {
        (ColorSpace::Stencil, 1)
    } else {
        let space = get_resolved(doc, dict, b"ColorSpace")
            .ok_or(RecoverError::MissingKey("ColorSpace"))
            .and_then(|cs| ColorSpace::parse(doc, cs))?;
        let bpc = get_int(doc, dict, b"BitsPerComponent").unwrap_or(8);
        (space, bpc)
    };
    let bpc = match bpc {
        1 | 2 | 4 | 8 | 16 => bpc as u8,
        other => return Err(RecoverError::UnsupportedBitDepth(other)),
    };

    let raw = unpack(data, width, height, space.components(), bpc)?;
    let inverted = decode_inverted(doc, dict);
    let max_raw: u16 = if bpc == 16 { u16::MAX } else { (1u16 << bpc) - 1 };

    let n = space.output_n();
    let mut samples = Vec::with_capacity(raw.len() / space.components() * n as usize);
    match &space {
        ColorSpace::Indexed {
            base_n,
            hival,
            lookup,
        } => {
            let base_n = *base_n as usize;
            for &v in &raw {
                let v = if inverted { max_raw - v } else { v };
                let start = (v as usize).min(*hival) * base_n;
                samples.extend((start..start + base_n).map(|i| lookup.get(i).copied().unwrap_or(0)));
            }
        }
        ColorSpace::Stencil => {
            samples.extend(raw.iter().map(|&v| if (v == 0) != inverted { 255 } else { 0 }));
        }
        ColorSpace::Separation => {
            samples.extend(raw.iter().map(|&v| {
                let tint = scale(v, bpc);
                if inverted {
                    tint
                } else {
                    255 - tint
                }
            }));
        }
        _ => {
            samples.extend(raw.iter().map(|&v| {
                let s = scale(v, bpc);
                if inverted {
                    255 - s
                } else {
                    s
                }
            }));
        }
    }

    Pixmap::new(width, height, n, false, samples)
}

fn positive(doc: &Document, dict: &Dictionary, key: &[u8], name: &'static str) -> Result<u32, RecoverError> {
    get_int(doc, dict, key)
        .filter(|&v| v > 0)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or(RecoverError::MissingKey(name))
}

/// True when `/Decode` maps the first component high-to-low, e.g. `[1 0]`.
fn decode_inverted(doc: &Document, dict: &Dictionary) -> bool {
    let Some(Object::Array(range)) = get_resolved(doc, dict, b"Decode") else {
        return false;
    };
    let number = |o: &Object| match o {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    };
    match (range.first().and_then(number), range.get(1).and_then(number)) {
        (Some(lo), Some(hi)) => lo > hi,
        _ => false,
    }
}

/// Split packed rows into one value per component. Rows are byte-aligned.
///
/// Dimensions whose packed size overflows `usize` are rejected before
/// anything is allocated.
fn unpack(
    data: &[u8],
    width: u32,
    height: u32,
    comps: usize,
    bpc: u8,
) -> Result<Vec<u16>, RecoverError> {
    let too_large = || RecoverError::ImageTooLarge { width, height };
    let per_row = (width as usize).checked_mul(comps).ok_or_else(too_large)?;
    let row_bytes = per_row
        .checked_mul(bpc as usize)
        .ok_or_else(too_large)?
        .div_ceil(8);
    let height = height as usize;
    let expected = row_bytes.checked_mul(height).ok_or_else(too_large)?;
    if data.len() < expected {
        return Err(RecoverError::ShortSampleData {
            expected,
            actual: data.len(),
        });
    }

    let mut out = Vec::with_capacity(per_row * height);
    for row in data.chunks_exact(row_bytes).take(height) {
        match bpc {
            8 => out.extend(row.iter().map(|&b| b as u16)),
            16 => out.extend(row.chunks_exact(2).map(|p| u16::from_be_bytes([p[0], p[1]]))),
            _ => {
                let bits = bpc as usize;
                let mask = (1u16 << bpc) - 1;
                out.extend((0..per_row).map(|i| {
                    let bit = i * bits;
                    let shift = 8 - bits - bit % 8;
                    (row[bit / 8] as u16 >> shift) & mask
                }));
            }
        }
    }
    Ok(out)
}

fn scale(v: u16, bpc: u8) -> u8 {
    match bpc {
        16 => (v >> 8) as u8,
        8 => v as u8,
        _ => (v as u32 * 255 / ((1u32 << bpc) - 1)) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, StringFormat};

    fn decode(dict: Dictionary, content: Vec<u8>) -> Result<Pixmap, RecoverError> {
        let doc = Document::with_version("1.5");
        decode_stream(&doc, &Stream::new(dict, content))
    }

    #[test]
    fn one_bit_gray_unpacks_msb_first() {
        let dict = dictionary! {
            "Width" => 10,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 1,
        };
        // 10 samples in 2 bytes: 1010000011 + 6 padding bits
        let pix = decode(dict, vec![0b1010_0000, 0b1100_0000]).unwrap();
        assert_eq!(pix.n, 1);
        assert_eq!(pix.samples, vec![255, 0, 255, 0, 0, 0, 0, 0, 255, 255]);
    }

    #[test]
    fn decode_array_inverts_gray() {
        let dict = dictionary! {
            "Width" => 2,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Decode" => vec![1.into(), 0.into()],
        };
        assert_eq!(decode(dict, vec![0, 200]).unwrap().samples, vec![255, 55]);
    }

    #[test]
    fn indexed_rgb_expands_through_lookup() {
        let palette = vec![255, 0, 0, 0, 0, 255];
        let dict = dictionary! {
            "Width" => 3,
            "Height" => 1,
            "ColorSpace" => vec![
                "Indexed".into(),
                "DeviceRGB".into(),
                1.into(),
                Object::String(palette, StringFormat::Hexadecimal),
            ],
            "BitsPerComponent" => 8,
        };
        let pix = decode(dict, vec![1, 0, 7]).unwrap();
        assert_eq!(pix.n, 3);
        // index 7 clamps to hival
        assert_eq!(pix.samples, vec![0, 0, 255, 255, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn stencil_mask_paints_zero_bits() {
        let dict = dictionary! {
            "Width" => 4,
            "Height" => 1,
            "ImageMask" => true,
        };
        assert_eq!(decode(dict, vec![0b0101_0000]).unwrap().samples, vec![255, 0, 255, 0]);
    }

    #[test]
    fn sixteen_bit_rgb_keeps_high_byte() {
        let dict = dictionary! {
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 16,
        };
        let pix = decode(dict, vec![0x12, 0x34, 0xAB, 0xCD, 0xFF, 0x00]).unwrap();
        assert_eq!(pix.n, 3);
        assert_eq!(pix.samples, vec![0x12, 0xAB, 0xFF]);
    }

    #[test]
    fn two_bit_gray_scales_to_full_range() {
        let dict = dictionary! {
            "Width" => 4,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 2,
        };
        let pix = decode(dict, vec![0b00_01_10_11]).unwrap();
        assert_eq!(pix.samples, vec![0, 85, 170, 255]);
    }

    #[test]
    fn four_bit_gray_rows_are_byte_aligned() {
        let dict = dictionary! {
            "Width" => 3,
            "Height" => 2,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 4,
        };
        // each 3-sample row takes 2 bytes, the last nibble is padding
        let pix = decode(dict, vec![0x0F, 0x8A, 0xF0, 0x5C]).unwrap();
        assert_eq!(pix.samples, vec![0, 255, 136, 255, 0, 85]);
    }

    fn icc_space(doc: &mut Document, n: Option<i64>) -> Object {
        let mut profile = Dictionary::new();
        if let Some(n) = n {
            profile.set("N", n);
        }
        let id = doc.add_object(Stream::new(profile, Vec::new()));
        Object::Array(vec!["ICCBased".into(), Object::Reference(id)])
    }

    #[test]
    fn icc_based_follows_component_count() {
        let mut doc = Document::with_version("1.5");
        let rgb = icc_space(&mut doc, Some(3));
        let cmyk = icc_space(&mut doc, Some(4));

        let dict = dictionary! {
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => rgb,
            "BitsPerComponent" => 8,
        };
        let pix = decode_stream(&doc, &Stream::new(dict, vec![1, 2, 3])).unwrap();
        assert_eq!((pix.n, pix.samples.as_slice()), (3, &[1, 2, 3][..]));

        let dict = dictionary! {
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => cmyk,
            "BitsPerComponent" => 8,
        };
        let pix = decode_stream(&doc, &Stream::new(dict, vec![0, 0, 0, 255])).unwrap();
        assert_eq!(pix.n, 4);
        assert_eq!(pix.to_rgb().samples, vec![0, 0, 0]);
    }

    #[test]
    fn icc_based_without_n_is_rejected() {
        let mut doc = Document::with_version("1.5");
        let space = icc_space(&mut doc, None);
        let dict = dictionary! {
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => space,
            "BitsPerComponent" => 8,
        };
        assert!(matches!(
            decode_stream(&doc, &Stream::new(dict, vec![0; 3])),
            Err(RecoverError::UnsupportedColorSpace(_))
        ));
    }

    fn separation(decode_range: Option<Vec<Object>>) -> Dictionary {
        let mut dict = dictionary! {
            "Width" => 3,
            "Height" => 1,
            "ColorSpace" => vec![
                "Separation".into(),
                "Spot".into(),
                "DeviceCMYK".into(),
                Object::Null,
            ],
            "BitsPerComponent" => 8,
        };
        if let Some(range) = decode_range {
            dict.set("Decode", range);
        }
        dict
    }

    #[test]
    fn separation_tint_is_inverted_gray() {
        let pix = decode(separation(None), vec![0, 255, 128]).unwrap();
        assert_eq!(pix.n, 1);
        assert_eq!(pix.samples, vec![255, 0, 127]);

        let pix = decode(separation(Some(vec![1.into(), 0.into()])), vec![0, 255, 128]).unwrap();
        assert_eq!(pix.samples, vec![0, 255, 128]);
    }

    #[test]
    fn calibrated_spaces_decode_as_device_spaces() {
        let dict = dictionary! {
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => vec![
                "CalRGB".into(),
                Object::Dictionary(dictionary! {
                    "WhitePoint" => vec![Object::Real(0.9505), 1.into(), Object::Real(1.089)],
                }),
            ],
            "BitsPerComponent" => 8,
        };
        let pix = decode(dict, vec![10, 20, 30]).unwrap();
        assert_eq!((pix.n, pix.samples.as_slice()), (3, &[10, 20, 30][..]));

        let dict = dictionary! {
            "Width" => 2,
            "Height" => 1,
            "ColorSpace" => "CalGray",
            "BitsPerComponent" => 8,
        };
        assert_eq!(decode(dict, vec![7, 9]).unwrap().samples, vec![7, 9]);
    }

    #[test]
    fn huge_dimensions_are_rejected_not_allocated() {
        let dict = dictionary! {
            "Width" => u32::MAX as i64,
            "Height" => u32::MAX as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        assert!(matches!(
            decode(dict, vec![0; 3]),
            Err(RecoverError::ImageTooLarge { .. })
        ));

        let err = Pixmap::new(u32::MAX, u32::MAX, 4, true, Vec::new()).unwrap_err();
        assert!(matches!(err, RecoverError::ImageTooLarge { .. }), "{err:?}");
    }

    #[test]
    fn short_data_is_an_error() {
        let dict = dictionary! {
            "Width" => 4,
            "Height" => 4,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        let err = decode(dict, vec![0; 10]).unwrap_err();
        assert!(matches!(err, RecoverError::ShortSampleData { expected: 48, actual: 10 }));
    }

    #[test]
    fn unknown_colour_space_is_reported() {
        let dict = dictionary! {
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "Lab",
            "BitsPerComponent" => 8,
        };
        assert!(matches!(
            decode(dict, vec![0; 3]),
            Err(RecoverError::UnsupportedColorSpace(_))
        ));
    }

    #[test]
    fn flate_stream_is_decompressed() {
        let mut stream = Stream::new(
            dictionary! {
                "Width" => 8,
                "Height" => 8,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            (0..64u8).collect(),
        );
        stream.compress().unwrap();
        assert!(stream.dict.has(b"Filter"));

        let doc = Document::with_version("1.5");
        let pix = decode_stream(&doc, &stream).unwrap();
        assert_eq!(pix.samples, (0..64u8).collect::<Vec<_>>());
    }

    #[test]
    fn jpeg_stream_decodes_with_image_crate() {
        let src = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(16, 8, image::Rgb([10, 200, 30])));
        let mut jpeg = Vec::new();
        src.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg).unwrap();

        let dict = dictionary! {
            "Width" => 16,
            "Height" => 8,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        let pix = decode(dict, jpeg).unwrap();
        assert_eq!((pix.width, pix.height, pix.n), (16, 8, 3));
    }

    #[test]
    fn mask_must_match_base_size() {
        let base = Pixmap::new(2, 2, 3, false, vec![0; 12]).unwrap();
        let mask = Pixmap::new(1, 2, 1, false, vec![255; 2]).unwrap();
        assert!(matches!(base.with_mask(&mask), Err(RecoverError::MaskMismatch { .. })));

        let mask = Pixmap::new(2, 2, 1, false, vec![1, 2, 3, 4]).unwrap();
        let out = base.with_mask(&mask).unwrap();
        assert!(out.alpha);
        assert_eq!(out.stride(), 4);
        assert_eq!(out.samples[3], 1);
        assert_eq!(out.samples[15], 4);
    }

    #[test]
    fn cmyk_converts_to_rgb() {
        let pix = Pixmap::new(2, 1, 4, false, vec![0, 0, 0, 0, 0, 0, 0, 255]).unwrap();
        let rgb = pix.to_rgb();
        assert_eq!(rgb.n, 3);
        assert_eq!(rgb.samples, vec![255, 255, 255, 0, 0, 0]);
    }

    #[test]
    fn pam_header_describes_cmyk_alpha() {
        let pix = Pixmap::new(1, 1, 4, true, vec![1, 2, 3, 4, 5]).unwrap();
        let pam = pix.encode_pam();
        let text = String::from_utf8_lossy(&pam);
        assert!(text.starts_with("P7\nWIDTH 1\nHEIGHT 1\nDEPTH 5\n"));
        assert!(text.contains("TUPLTYPE CMYK_ALPHA\nENDHDR\n"));
        assert_eq!(&pam[pam.len() - 5..], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn png_encoding_round_trips_dimensions() {
        let pix = Pixmap::new(3, 2, 1, true, vec![9; 12]).unwrap();
        let png = pix.encode_png().unwrap();
        let back = image::load_from_memory(&png).unwrap();
        assert_eq!((back.width(), back.height()), (3, 2));
        assert!(back.color().has_alpha());
    }
}
