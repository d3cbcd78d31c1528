//! Synthetic PDFs for integration tests, built with lopdf.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::path::Path;

/// Deterministic noise so encoded images don't compress below the byte threshold.
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut buf);
    buf
}

pub struct PdfBuilder {
    pub doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    seed: u64,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            seed: 1,
        }
    }

    fn gray_stream(w: u32, h: u32, data: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w as i64,
                "Height" => h as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            data,
        )
    }

    /// 8-bit gray image filled with noise.
    pub fn noisy_image(&mut self, w: u32, h: u32) -> ObjectId {
        self.seed += 1;
        let data = noise((w * h) as usize, self.seed);
        self.doc.add_object(Self::gray_stream(w, h, data))
    }

    /// 8-bit gray image of a single value.
    pub fn flat_image(&mut self, w: u32, h: u32) -> ObjectId {
        self.doc
            .add_object(Self::gray_stream(w, h, vec![200; (w * h) as usize]))
    }

    /// Noisy image with a soft mask of `mask_w`×`mask_h`.
    pub fn masked_image(&mut self, w: u32, h: u32, mask_w: u32, mask_h: u32) -> ObjectId {
        let mask = self.doc.add_object(Self::gray_stream(
            mask_w,
            mask_h,
            vec![128; (mask_w * mask_h) as usize],
        ));
        self.seed += 1;
        let mut stream = Self::gray_stream(w, h, noise((w * h) as usize, self.seed));
        stream.dict.set("SMask", Object::Reference(mask));
        self.doc.add_object(stream)
    }

    /// US Letter page drawing `images`.
    pub fn page(&mut self, images: &[ObjectId]) -> ObjectId {
        let mut xobjects = lopdf::Dictionary::new();
        let mut ops = String::new();
        for (i, id) in images.iter().enumerate() {
            let name = format!("Im{i}");
            xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
            ops.push_str(&format!("q 200 0 0 100 50 {} cm /{name} Do Q\n", 600 - 110 * i as i64));
        }
        let contents = self
            .doc
            .add_object(Stream::new(lopdf::Dictionary::new(), ops.into_bytes()));
        let page = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => contents,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        self.kids.push(page.into());
        page
    }

    pub fn save(mut self, path: &Path) {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog);
        self.doc.save(path).unwrap();
    }
}
