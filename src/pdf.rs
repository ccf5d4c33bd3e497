//! PDF assembly for generated coloring books
//!
//! A4 portrait, one JPEG per page, placed in a 4:3 box inside a 15 mm side
//! margin and centred vertically. The cover is page 1.

use std::io::Cursor;

use base64::Engine;
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use thiserror::Error;
use tracing::{debug, info};

const MM_TO_PT: f32 = 72.0 / 25.4;

pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 15.0;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Image {index} is not valid base64: {source}")]
    InvalidBase64 {
        index: usize,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Image {index} is not a readable JPEG: {reason}")]
    InvalidImage { index: usize, reason: String },

    #[error("Failed to write PDF: {0}")]
    Write(#[from] lopdf::Error),
}

/// Where the image lands on every page, in PDF points (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageLayout {
    pub fn a4() -> Self {
        let image_width = A4_WIDTH_MM - MARGIN_MM * 2.0;
        let image_height = image_width / 4.0 * 3.0;
        let v_offset = (A4_HEIGHT_MM - image_height) / 2.0;

        Self {
            page_width: A4_WIDTH_MM * MM_TO_PT,
            page_height: A4_HEIGHT_MM * MM_TO_PT,
            x: MARGIN_MM * MM_TO_PT,
            y: v_offset * MM_TO_PT,
            width: image_width * MM_TO_PT,
            height: image_height * MM_TO_PT,
        }
    }
}

/// Decoded JPEG ready to embed as a DCTDecode XObject
struct JpegImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    color_space: &'static str,
}

impl JpegImage {
    fn from_base64(index: usize, encoded: &str) -> Result<Self, PdfError> {
        // Tolerate data URLs as well as bare base64
        let payload = match encoded.find(";base64,") {
            Some(pos) => &encoded[pos + ";base64,".len()..],
            None => encoded,
        };
        let data = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|source| PdfError::InvalidBase64 { index, source })?;

        let ((width, height), color_type) = {
            let decoder = JpegDecoder::new(Cursor::new(data.as_slice())).map_err(|e| {
                PdfError::InvalidImage {
                    index,
                    reason: e.to_string(),
                }
            })?;
            (decoder.dimensions(), decoder.color_type())
        };
        let color_space = match color_type {
            ColorType::L8 | ColorType::L16 => "DeviceGray",
            _ => "DeviceRGB",
        };

        Ok(Self {
            data,
            width,
            height,
            color_space,
        })
    }
}

/// Build the PDF bytes for a cover and its pages (all base64 JPEG).
pub fn assemble(cover_image: &str, pages: &[String]) -> Result<Vec<u8>, PdfError> {
    let layout = PageLayout::a4();
    let images = std::iter::once(cover_image)
        .chain(pages.iter().map(String::as_str))
        .enumerate()
        .map(|(index, encoded)| JpegImage::from_base64(index, encoded))
        .collect::<Result<Vec<_>, _>>()?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(images.len());
    for image in images {
        let page_id = add_image_page(&mut doc, pages_id, &layout, image)?;
        kids.push(Object::Reference(page_id));
    }
    let page_count = kids.len() as i64;

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(layout.page_width),
                Object::Real(layout.page_height),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfError::Write(e.into()))?;

    info!("Assembled PDF: {} pages, {} bytes", page_count, buffer.len());
    Ok(buffer)
}

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    layout: &PageLayout,
    image: JpegImage,
) -> Result<ObjectId, PdfError> {
    debug!(
        "Embedding {}x{} {} image",
        image.width, image.height, image.color_space
    );

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => image.color_space,
            "BitsPerComponent" => 8i64,
            "Filter" => "DCTDecode",
        },
        image.data,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(layout.width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(layout.height),
                    Object::Real(layout.x),
                    Object::Real(layout.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    });
    Ok(page_id)
}
