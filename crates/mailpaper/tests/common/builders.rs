//! Builders for messages and attachment contents.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use image::{DynamicImage, ImageFormat, RgbImage};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use mailpaper::mail::api::MessagePartBody;
use mailpaper::mail::{AttachmentBody, Header, Message, MessagePart};

/// Start time used by the harness; messages must be dated after it to be handled.
pub fn run_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn after_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
}

pub fn before_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 30, 9, 0, 0).unwrap()
}

/// Builds `format=full` messages the way Gmail returns them.
pub struct MessageBuilder {
    id: String,
    date: DateTime<Utc>,
    attachments: Vec<(String, String)>,
    multipart: bool,
}

impl MessageBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            date: after_start(),
            attachments: Vec::new(),
            multipart: true,
        }
    }

    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn attachment(mut self, filename: &str, attachment_id: &str) -> Self {
        self.attachments
            .push((filename.to_string(), attachment_id.to_string()));
        self
    }

    pub fn single_part(mut self) -> Self {
        self.multipart = false;
        self
    }

    pub fn build(self) -> Message {
        let headers = vec![
            header("From", "Alice Example <alice@example.com>"),
            header("To", "paper@example.com"),
            header("Subject", "Scans"),
            header("Message-ID", &format!("<{}@mail.example.com>", self.id)),
            header("Date", &self.date.to_rfc2822()),
        ];

        let parts = if self.multipart {
            let mut parts = vec![MessagePart {
                part_id: Some("0".to_string()),
                mime_type: Some("text/plain".to_string()),
                body: Some(MessagePartBody {
                    data: Some(URL_SAFE_NO_PAD.encode("see attached")),
                    size: 12,
                    ..Default::default()
                }),
                ..Default::default()
            }];
            for (index, (filename, attachment_id)) in self.attachments.into_iter().enumerate() {
                parts.push(MessagePart {
                    part_id: Some((index + 1).to_string()),
                    mime_type: Some("application/octet-stream".to_string()),
                    filename,
                    body: Some(MessagePartBody {
                        attachment_id: Some(attachment_id),
                        ..Default::default()
                    }),
                    ..Default::default()
                });
            }
            Some(parts)
        } else {
            None
        };

        Message {
            thread_id: format!("thread-{}", self.id),
            id: self.id,
            internal_date: Some(self.date.timestamp_millis().to_string()),
            payload: Some(MessagePart {
                mime_type: Some("multipart/mixed".to_string()),
                headers,
                parts,
                ..Default::default()
            }),
        }
    }
}

fn header(name: &str, value: &str) -> Header {
    Header {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Attachment payload as `users.messages.attachments.get` returns it.
pub fn attachment_body(bytes: &[u8]) -> AttachmentBody {
    AttachmentBody {
        data: URL_SAFE_NO_PAD.encode(bytes),
        size: bytes.len() as u64,
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// A minimal OOXML word-processing container.
pub fn docx_bytes() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(b"<Types/>").unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(b"<w:document/>").unwrap();
    zip.finish().unwrap().into_inner()
}

pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n".to_vec()
}

/// Page size of the first page of a PDF.
pub fn media_box(pdf: &[u8]) -> Vec<i64> {
    let doc = lopdf::Document::load_mem(pdf).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    doc.get_dictionary(page_id)
        .unwrap()
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o.as_i64().unwrap())
        .collect()
}
