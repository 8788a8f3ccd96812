//! Format sniffing and conversion dispatch.
//!
//! Every accepted buffer ends up as PDF bytes: images are laid out on a page
//! of their own size, office documents go through an [`OfficeConverter`],
//! and PDFs pass through untouched.

pub mod image;
pub mod office;
pub mod sniff;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ConvertError;

pub use office::{LibreOfficeConverter, OfficeConverter};
pub use sniff::{sniff, FileType};

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "tif", "tiff", "bmp", "jpg", "jpeg", "gif", "png", "eps", "webp", "jpe", "jif", "jfif", "jfi",
    "dib", "heif", "heic", "svg", "svgz",
];

pub const OFFICE_EXTENSIONS: &[&str] = &["doc", "docx", "xls", "xlsx", "ppt", "pptx"];

/// Which conversion strategy a sniffed type is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Image,
    Office,
    PassThrough,
}

impl Route {
    pub fn for_type(file_type: FileType) -> Option<Route> {
        let ext = file_type.ext;
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(Route::Image)
        } else if OFFICE_EXTENSIONS.contains(&ext) {
            Some(Route::Office)
        } else if ext == "pdf" {
            Some(Route::PassThrough)
        } else {
            None
        }
    }
}

/// The PDF produced for one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPdf {
    pub bytes: Vec<u8>,
    /// The sniffed type of the source buffer.
    pub source: FileType,
}

pub struct Converter {
    office: Arc<dyn OfficeConverter>,
}

impl Converter {
    pub fn new(office: Arc<dyn OfficeConverter>) -> Self {
        Self { office }
    }

    pub async fn convert(&self, bytes: &[u8]) -> Result<ConvertedPdf, ConvertError> {
        let source = sniff(bytes).ok_or(ConvertError::UnsupportedFileType)?;
        let route = Route::for_type(source).ok_or(ConvertError::UnsupportedFileType)?;

        debug!(ext = source.ext, ?route, "Sniffed attachment");

        let pdf = match route {
            Route::Image => {
                let data = bytes.to_vec();
                let is_jpeg = source.ext == "jpg";
                tokio::task::spawn_blocking(move || image::image_to_pdf(&data, is_jpeg))
                    .await
                    .map_err(|e| ConvertError::ImageProcessing(e.to_string()))??
            }
            Route::Office => self.office.to_pdf(bytes, source.ext).await?,
            Route::PassThrough => bytes.to_vec(),
        };

        info!(ext = source.ext, bytes = pdf.len(), "Converted to PDF");

        Ok(ConvertedPdf { bytes: pdf, source })
    }
}

/// Converts a local file and writes the PDF. Nothing is written on failure.
pub async fn convert_file(
    converter: &Converter,
    input: &Path,
    output: &Path,
) -> Result<ConvertedPdf, ConvertError> {
    let bytes = tokio::fs::read(input).await.map_err(|e| ConvertError::Io {
        path: input.to_path_buf(),
        source: e,
    })?;

    let pdf = converter.convert(&bytes).await?;

    tokio::fs::write(output, &pdf.bytes)
        .await
        .map_err(|e| ConvertError::Io {
            path: output.to_path_buf(),
            source: e,
        })?;

    info!("Wrote {}", output.display());
    Ok(pdf)
}

/// `<stem>.pdf` next to the input, or `<stem>.converted.pdf` if that is the input itself.
pub fn default_output_path(input: &Path) -> PathBuf {
    let candidate = input.with_extension("pdf");
    if candidate == input {
        input.with_extension("converted.pdf")
    } else {
        candidate
    }
}
