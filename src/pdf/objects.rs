//! Object-level access to image XObjects via lopdf.
//!
//! pdfium renders pages well but hides the object graph: it exposes neither
//! object numbers nor `/SMask` links. The extractor needs both (object numbers
//! for de-duplication and file names, masks for compositing), so image
//! discovery walks the page resources with lopdf directly.

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;

/// Limit on `/Parent` hops when looking for inherited resources.
const MAX_INHERITANCE_DEPTH: usize = 64;

/// One image XObject referenced from a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageRef {
    /// Object id of the image stream.
    pub id: ObjectId,
    /// Object id of its `/SMask` (or stencil `/Mask`) stream, if any.
    pub smask: Option<ObjectId>,
    /// Declared `/Width`.
    pub width: u32,
    /// Declared `/Height`.
    pub height: u32,
}

/// Follow a single indirect reference.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> lopdf::Result<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id),
        other => Ok(other),
    }
}

/// Look up `key` in `dict` and resolve it if it is a reference.
pub fn get_resolved<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|o| resolve(doc, o).ok())
}

/// Integer entry of `dict`, resolving references.
pub fn get_int(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    get_resolved(doc, dict, key).and_then(|o| o.as_i64().ok())
}

/// Resources of a page, honouring inheritance from ancestor `/Pages` nodes.
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Some(res) = get_resolved(doc, node, b"Resources") {
            return res.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// All image XObjects drawn by a page, in resource order.
///
/// Images inside form XObjects are included; each form is visited once.
/// An image listed under several names appears once.
pub fn page_images(doc: &Document, page_id: ObjectId) -> Vec<ImageRef> {
    let mut images = Vec::new();
    let mut forms = HashSet::new();
    if let Some(resources) = page_resources(doc, page_id) {
        collect_images(doc, resources, &mut images, &mut forms);
    }
    images
}

fn collect_images(
    doc: &Document,
    resources: &Dictionary,
    images: &mut Vec<ImageRef>,
    forms: &mut HashSet<ObjectId>,
) {
    let Some(xobjects) = get_resolved(doc, resources, b"XObject").and_then(|o| o.as_dict().ok())
    else {
        return;
    };

    for (_name, value) in xobjects.iter() {
        let Ok(id) = value.as_reference() else {
            continue;
        };
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            continue;
        };
        let dict = &stream.dict;

        match dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => {
                if images.iter().any(|r| r.id == id) {
                    continue;
                }
                images.push(ImageRef {
                    id,
                    smask: mask_reference(dict),
                    width: dimension(doc, dict, b"Width"),
                    height: dimension(doc, dict, b"Height"),
                });
            }
            Ok(b"Form") => {
                if !forms.insert(id) {
                    continue;
                }
                if let Some(inner) = get_resolved(doc, dict, b"Resources").and_then(|o| o.as_dict().ok()) {
                    collect_images(doc, inner, images, forms);
                }
            }
            _ => {}
        }
    }
}

/// `/SMask`, or `/Mask` when it points at a stencil stream.
///
/// A `/Mask` array is a colour-key range, not an image, and is ignored.
fn mask_reference(dict: &Dictionary) -> Option<ObjectId> {
    dict.get(b"SMask")
        .and_then(Object::as_reference)
        .or_else(|_| dict.get(b"Mask").and_then(Object::as_reference))
        .ok()
}

fn dimension(doc: &Document, dict: &Dictionary, key: &[u8]) -> u32 {
    get_int(doc, dict, key)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn image_stream(w: i64, h: i64) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w,
                "Height" => h,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0u8; (w * h) as usize],
        )
    }

    /// A document with one page whose resources live on the parent node.
    fn doc_with_inherited_resources() -> (Document, ObjectId, ObjectId, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mask_id = doc.add_object(image_stream(2, 2));
        let mut img = image_stream(2, 2);
        img.dict.set("SMask", Object::Reference(mask_id));
        let img_id = doc.add_object(img);

        let form_img_id = doc.add_object(image_stream(3, 1));
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 10.into(), 10.into()],
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Im9" => form_img_id },
                },
            },
            Vec::new(),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => dictionary! {
                    "XObject" => dictionary! {
                        "Im1" => img_id,
                        "Im2" => img_id,
                        "Fm1" => form_id,
                    },
                },
            }),
        );
        (doc, page_id, img_id, form_img_id)
    }

    #[test]
    fn finds_inherited_and_nested_images_once() {
        let (doc, page_id, img_id, form_img_id) = doc_with_inherited_resources();
        let images = page_images(&doc, page_id);

        assert_eq!(images.len(), 2, "got {images:?}");
        let top = images.iter().find(|r| r.id == img_id).unwrap();
        assert!(top.smask.is_some());
        assert_eq!((top.width, top.height), (2, 2));

        let nested = images.iter().find(|r| r.id == form_img_id).unwrap();
        assert_eq!(nested.smask, None);
        assert_eq!((nested.width, nested.height), (3, 1));
    }

    #[test]
    fn page_without_resources_has_no_images() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });
        assert!(page_images(&doc, page_id).is_empty());
    }

    #[test]
    fn colour_key_mask_is_not_a_reference() {
        let dict = dictionary! {
            "Mask" => vec![0.into(), 10.into()],
        };
        assert_eq!(mask_reference(&dict), None);
    }
}
