//! Turning one image XObject into a standalone image file.
//!
//! The output format follows the image's shape:
//!
//! | source                         | output                         |
//! |--------------------------------|--------------------------------|
//! | has an `/SMask` / stencil mask | base + mask as alpha, PNG (PAM for CMYK) |
//! | has a `/ColorSpace`            | converted to RGB, PNG          |
//! | JPEG / JPEG 2000 / JBIG2       | stream bytes unchanged         |
//! | anything else                  | decoded, PNG                   |
//!
//! If the mask cannot be applied the base image is used on its own.

use crate::error::RecoverError;
use crate::pdf::decode::{decode_image, decode_stream, filter_names, Pixmap};
use crate::pdf::objects::ImageRef;
use image::codecs::jpeg::JpegDecoder;
use image::ImageDecoder;
use lopdf::{Document, Stream};
use std::io::Cursor;
use tracing::debug;

/// An image ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredImage {
    /// File extension without the dot: `png`, `pam`, `jpeg`, `jpx` or `jb2`.
    pub ext: &'static str,
    /// Colour channels of the encoded image.
    pub channels: u8,
    pub data: Vec<u8>,
}

impl RecoveredImage {
    fn png(pix: &Pixmap) -> Result<Self, RecoverError> {
        Ok(Self {
            ext: "png",
            channels: pix.n,
            data: pix.encode_png()?,
        })
    }
}

/// Reconstruct `image` as an encoded file.
pub fn recover_image(doc: &Document, image: &ImageRef) -> Result<RecoveredImage, RecoverError> {
    if let Some(mask_id) = image.smask {
        let base = decode_image(doc, image.id)?.without_alpha();
        let composite = decode_image(doc, mask_id).and_then(|mask| base.with_mask(&mask));
        let pix = match composite {
            Ok(pix) => pix,
            Err(e) => {
                debug!("image {:?}: mask not applied ({e}), using base image", image.id);
                base
            }
        };
        // PNG has no CMYK
        if pix.n > 3 {
            return Ok(RecoveredImage {
                ext: "pam",
                channels: pix.n,
                data: pix.encode_pam(),
            });
        }
        return RecoveredImage::png(&pix);
    }

    let stream = doc.get_object(image.id)?.as_stream()?;
    if stream.dict.has(b"ColorSpace") {
        let pix = decode_stream(doc, stream)?.to_rgb();
        return RecoveredImage::png(&pix);
    }
    native(doc, stream)
}

/// Keep encoded formats as they are; decode the rest.
fn native(doc: &Document, stream: &Stream) -> Result<RecoveredImage, RecoverError> {
    let filters = filter_names(doc, &stream.dict);
    if filters.len() == 1 {
        let passthrough = match filters[0].as_slice() {
            b"DCTDecode" | b"DCT" => Some(("jpeg", jpeg_channels(&stream.content)?)),
            b"JPXDecode" => Some(("jpx", jpx_channels(&stream.content).unwrap_or(3))),
            b"JBIG2Decode" => Some(("jb2", 1)),
            _ => None,
        };
        if let Some((ext, channels)) = passthrough {
            return Ok(RecoveredImage {
                ext,
                channels,
                data: stream.content.clone(),
            });
        }
    }
    RecoveredImage::png(&decode_stream(doc, stream)?)
}

fn jpeg_channels(data: &[u8]) -> Result<u8, RecoverError> {
    let decoder = JpegDecoder::new(Cursor::new(data))?;
    Ok(decoder.color_type().channel_count())
}

/// Component count from a JP2 `ihdr` box or a raw codestream `SIZ` marker.
fn jpx_channels(data: &[u8]) -> Option<u8> {
    let be16 = |at: usize| data.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]));
    if data.starts_with(&[0xFF, 0x4F, 0xFF, 0x51]) {
        // SOC, SIZ marker, Lsiz, Rsiz, 8 x 32-bit sizes, then Csiz
        return be16(40).and_then(|c| u8::try_from(c).ok());
    }
    let at = data.windows(4).position(|w| w == b"ihdr")?;
    be16(at + 12).and_then(|c| u8::try_from(c).ok())
}
