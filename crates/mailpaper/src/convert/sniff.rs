//! Content-based file type detection.
//!
//! Only the leading bytes are inspected, plus the archive directory of ZIP
//! containers and the directory of OLE compound files. File names never
//! influence the result.

use std::io::Cursor;

use image::ImageFormat;

/// A sniffed file type, identified by its canonical extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileType {
    pub ext: &'static str,
    pub mime: &'static str,
}

impl FileType {
    const fn new(ext: &'static str, mime: &'static str) -> Self {
        Self { ext, mime }
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const EPS_BINARY_MAGIC: &[u8] = &[0xC5, 0xD0, 0xD3, 0xC6];
const EPS_TEXT_MAGIC: &[u8] = b"%!PS-Adobe-";

const CFB_HEADER_LEN: usize = 512;
const CFB_DIFAT_IN_HEADER: usize = 109;
const CFB_DIR_ENTRY_LEN: usize = 128;
/// Special sector ids are all at or above this value.
const CFB_MAX_REGULAR_SECTOR: u32 = 0xFFFF_FFFA;

/// Returns the detected type, or `None` for empty or unrecognized buffers.
pub fn sniff(bytes: &[u8]) -> Option<FileType> {
    if bytes.is_empty() {
        return None;
    }

    if bytes.starts_with(PDF_MAGIC) {
        return Some(FileType::new("pdf", "application/pdf"));
    }

    if bytes.starts_with(ZIP_MAGIC) {
        return Some(sniff_zip(bytes));
    }

    if bytes.starts_with(CFB_MAGIC) {
        return Some(sniff_compound_file(bytes));
    }

    if let Some(file_type) = sniff_iso_bmff(bytes) {
        return Some(file_type);
    }

    if bytes.starts_with(EPS_BINARY_MAGIC) || is_text_eps(bytes) {
        return Some(FileType::new("eps", "application/eps"));
    }

    image::guess_format(bytes).ok().and_then(image_file_type)
}

fn image_file_type(format: ImageFormat) -> Option<FileType> {
    let file_type = match format {
        ImageFormat::Png => FileType::new("png", "image/png"),
        ImageFormat::Jpeg => FileType::new("jpg", "image/jpeg"),
        ImageFormat::Gif => FileType::new("gif", "image/gif"),
        ImageFormat::WebP => FileType::new("webp", "image/webp"),
        ImageFormat::Tiff => FileType::new("tif", "image/tiff"),
        ImageFormat::Bmp => FileType::new("bmp", "image/bmp"),
        ImageFormat::Ico => FileType::new("ico", "image/x-icon"),
        ImageFormat::Avif => FileType::new("avif", "image/avif"),
        ImageFormat::Pnm => FileType::new("pnm", "image/x-portable-anymap"),
        ImageFormat::Tga => FileType::new("tga", "image/x-tga"),
        ImageFormat::Dds => FileType::new("dds", "image/vnd-ms.dds"),
        ImageFormat::Hdr => FileType::new("hdr", "image/vnd.radiance"),
        ImageFormat::OpenExr => FileType::new("exr", "image/x-exr"),
        ImageFormat::Farbfeld => FileType::new("ff", "image/farbfeld"),
        ImageFormat::Qoi => FileType::new("qoi", "image/qoi"),
        _ => return None,
    };
    Some(file_type)
}

/// OOXML documents are ZIP archives whose top-level folder names the application.
fn sniff_zip(bytes: &[u8]) -> FileType {
    let generic = FileType::new("zip", "application/zip");

    let archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(_) => return generic,
    };

    let mut found = generic;
    for name in archive.file_names() {
        if name.starts_with("word/") {
            return FileType::new(
                "docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            );
        }
        if name.starts_with("xl/") {
            found = FileType::new(
                "xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            );
        } else if name.starts_with("ppt/") {
            found = FileType::new(
                "pptx",
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            );
        }
    }
    found
}

/// Legacy office formats share the OLE compound file container; the names
/// of the streams in its directory tell them apart.
fn sniff_compound_file(bytes: &[u8]) -> FileType {
    let names = CompoundFile::parse(bytes)
        .map(|file| file.stream_names())
        .unwrap_or_default();
    let has = |name: &str| names.iter().any(|n| n == name);

    if has("WordDocument") {
        FileType::new("doc", "application/msword")
    } else if has("Workbook") || has("Book") {
        FileType::new("xls", "application/vnd.ms-excel")
    } else if has("PowerPoint Document") {
        FileType::new("ppt", "application/vnd.ms-powerpoint")
    } else {
        FileType::new("cfb", "application/x-cfb")
    }
}

/// Just enough of the compound file layout to list directory entry names.
struct CompoundFile<'a> {
    bytes: &'a [u8],
    sector_size: usize,
    fat_sectors: Vec<u32>,
    first_dir_sector: u32,
}

impl<'a> CompoundFile<'a> {
    fn parse(bytes: &'a [u8]) -> Option<Self> {
        if bytes.len() < CFB_HEADER_LEN {
            return None;
        }

        let sector_shift = read_u16(bytes, 0x1E)?;
        if !(7..=16).contains(&sector_shift) {
            return None;
        }
        let sector_size = 1usize << sector_shift;

        let mut file = Self {
            bytes,
            sector_size,
            fat_sectors: Vec::new(),
            first_dir_sector: read_u32(bytes, 0x30)?,
        };

        for index in 0..CFB_DIFAT_IN_HEADER {
            let sector = read_u32(bytes, 0x4C + index * 4)?;
            if sector < CFB_MAX_REGULAR_SECTOR {
                file.fat_sectors.push(sector);
            }
        }

        // Files with more FAT sectors than the header holds chain extra DIFAT sectors.
        let per_sector = sector_size / 4;
        let mut difat_sector = read_u32(bytes, 0x44)?;
        let mut remaining = read_u32(bytes, 0x48)?;
        while remaining > 0 && difat_sector < CFB_MAX_REGULAR_SECTOR {
            let sector = file.sector(difat_sector)?;
            for index in 0..per_sector - 1 {
                let fat_sector = read_u32(sector, index * 4)?;
                if fat_sector < CFB_MAX_REGULAR_SECTOR {
                    file.fat_sectors.push(fat_sector);
                }
            }
            difat_sector = read_u32(sector, (per_sector - 1) * 4)?;
            remaining -= 1;
        }

        Some(file)
    }

    fn sector(&self, id: u32) -> Option<&'a [u8]> {
        let start = (id as usize + 1).checked_mul(self.sector_size)?;
        self.bytes.get(start..start.checked_add(self.sector_size)?)
    }

    fn next_sector(&self, id: u32) -> Option<u32> {
        let per_sector = self.sector_size / 4;
        let fat_sector = *self.fat_sectors.get(id as usize / per_sector)?;
        read_u32(self.sector(fat_sector)?, (id as usize % per_sector) * 4)
    }

    /// Names of all directory entries, following the directory's sector chain.
    /// A truncated or cyclic chain ends the walk early.
    fn stream_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let max_sectors = self.bytes.len() / self.sector_size;
        let mut current = self.first_dir_sector;

        for _ in 0..max_sectors {
            if current >= CFB_MAX_REGULAR_SECTOR {
                break;
            }
            let Some(sector) = self.sector(current) else {
                break;
            };
            names.extend(sector.chunks_exact(CFB_DIR_ENTRY_LEN).filter_map(entry_name));
            match self.next_sector(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        names
    }
}

/// A directory entry's name: UTF-16LE, its byte length (with terminator) at 0x40.
fn entry_name(entry: &[u8]) -> Option<String> {
    let length = read_u16(entry, 0x40)? as usize;
    if length < 2 || length > 64 {
        return None;
    }
    let units: Vec<u16> = entry[..length - 2]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw = bytes.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// HEIF family images are ISO base media files with an `ftyp` box.
fn sniff_iso_bmff(bytes: &[u8]) -> Option<FileType> {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return None;
    }
    match &bytes[8..12] {
        b"heic" | b"heix" | b"hevc" | b"hevx" => Some(FileType::new("heic", "image/heic")),
        b"mif1" | b"msf1" => Some(FileType::new("heif", "image/heif")),
        _ => None,
    }
}

fn is_text_eps(bytes: &[u8]) -> bool {
    if !bytes.starts_with(EPS_TEXT_MAGIC) {
        return false;
    }
    let first_line = bytes
        .split(|b| *b == b'\n' || *b == b'\r')
        .next()
        .unwrap_or_default();
    first_line.windows(5).any(|w| w == b"EPSF-")
}
