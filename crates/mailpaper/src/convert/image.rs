use image::{ColorType, DynamicImage, GenericImageView, RgbImage};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::ConvertError;

/// Builds a single-page PDF whose page is exactly the image's pixel size,
/// with the image drawn at the origin and no margins.
pub fn image_to_pdf(image_data: &[u8], is_jpeg: bool) -> Result<Vec<u8>, ConvertError> {
    let _span = tracing::info_span!("convert.image").entered();

    let img = image::load_from_memory(image_data)
        .map_err(|e| ConvertError::ImageProcessing(format!("Failed to load image: {}", e)))?;

    let (width, height) = img.dimensions();
    tracing::debug!(width, height, "Decoded image");

    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let resources_id = doc.new_object_id();
    let content_id = doc.new_object_id();
    let page_id = doc.new_object_id();
    let image_id = doc.new_object_id();

    doc.objects
        .insert(image_id, Object::Stream(image_stream(&img, image_data, is_jpeg)));

    doc.objects.insert(
        resources_id,
        Object::Dictionary(dictionary! {
            "XObject" => dictionary! {
                "Im1" => image_id,
            },
        }),
    );

    // One PDF unit per pixel, image fills the page from (0,0).
    let content = format!("q\n{} 0 0 {} 0 0 cm\n/Im1 Do\nQ\n", width, height);
    let content_stream = Stream::new(dictionary! {}, content.into_bytes());
    doc.objects
        .insert(content_id, Object::Stream(content_stream));

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (width as i64).into(), (height as i64).into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        }),
    );

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ConvertError::PdfProcessing(e.to_string()))?;

    Ok(buffer)
}

fn image_stream(img: &DynamicImage, image_data: &[u8], is_jpeg: bool) -> Stream {
    let (width, height) = img.dimensions();

    // JPEG data can be embedded as is when its colour model maps onto a PDF
    // device space. The decoder converts CMYK and YCCK to RGB, so the
    // component count has to come from the frame header itself.
    let jpeg_color_space = match (jpeg_components(image_data), img.color()) {
        (Some(3), ColorType::Rgb8) => Some("DeviceRGB"),
        (Some(1), ColorType::L8) => Some("DeviceGray"),
        _ => None,
    };

    match (is_jpeg, jpeg_color_space) {
        (true, Some(color_space)) => Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            image_data.to_vec(),
        ),
        _ => Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            flatten_onto_white(img).into_raw(),
        ),
    }
}

/// Number of colour components declared in the JPEG start-of-frame header.
fn jpeg_components(data: &[u8]) -> Option<u8> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    loop {
        if *data.get(pos)? != 0xFF {
            return None;
        }
        let marker = *data.get(pos + 1)?;
        match marker {
            // Fill byte before a marker.
            0xFF => {
                pos += 1;
                continue;
            }
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // Start of scan or end of image before any frame header.
            0xDA | 0xD9 => return None,
            _ => {}
        }

        let length = u16::from_be_bytes([*data.get(pos + 2)?, *data.get(pos + 3)?]) as usize;
        let is_frame_header =
            matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame_header {
            // length(2) precision(1) height(2) width(2) components(1)
            return data.get(pos + 9).copied();
        }
        pos += 2 + length;
    }
}

/// Drops the alpha channel, compositing transparent pixels onto white paper.
fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    rgb
}
