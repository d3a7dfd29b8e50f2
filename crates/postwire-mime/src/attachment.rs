//! Attachment extraction from a parsed MIME tree.

use crate::content_type::DispositionKind;
use crate::message::{Body, Part};

/// An attachment found in a parsed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Resolved filename.
    pub filename: String,
    /// MIME type, `type/subtype`.
    pub content_type: String,
    /// Transfer-decoded content.
    pub data: Vec<u8>,
    /// True for `Content-Disposition: inline` parts.
    pub inline: bool,
    /// Content-ID without angle brackets, used by `cid:` references.
    pub content_id: Option<String>,
    /// Size of `data` in bytes.
    pub size: usize,
}

/// Common file extensions by MIME type, used when a part has no filename.
const EXTENSIONS: &[(&str, &str)] = &[
    ("application/gzip", "gz"),
    ("application/json", "json"),
    ("application/msword", "doc"),
    ("application/octet-stream", "bin"),
    ("application/pdf", "pdf"),
    ("application/pgp-signature", "asc"),
    ("application/rtf", "rtf"),
    ("application/vnd.ms-excel", "xls"),
    ("application/vnd.ms-powerpoint", "ppt"),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pptx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    ("application/xml", "xml"),
    ("application/zip", "zip"),
    ("audio/mpeg", "mp3"),
    ("audio/ogg", "ogg"),
    ("audio/wav", "wav"),
    ("image/bmp", "bmp"),
    ("image/gif", "gif"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/svg+xml", "svg"),
    ("image/tiff", "tiff"),
    ("image/webp", "webp"),
    ("message/rfc822", "eml"),
    ("text/calendar", "ics"),
    ("text/csv", "csv"),
    ("text/html", "html"),
    ("text/plain", "txt"),
    ("text/vcard", "vcf"),
    ("video/mp4", "mp4"),
    ("video/quicktime", "mov"),
];

/// Returns the conventional file extension for a MIME type.
#[must_use]
pub fn extension_for(mime_type: &str) -> &'static str {
    EXTENSIONS
        .iter()
        .find(|(ty, _)| ty.eq_ignore_ascii_case(mime_type))
        .map_or("bin", |(_, ext)| ext)
}

/// Guesses a MIME type from a filename's extension.
///
/// Unknown extensions map to `application/octet-stream`.
#[must_use]
pub fn mime_type_for(filename: &str) -> &'static str {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return "application/octet-stream";
    };
    let lower = ext.to_ascii_lowercase();
    let ext = match lower.as_str() {
        "jpeg" => "jpg",
        "htm" => "html",
        "tif" => "tiff",
        other => other,
    };
    EXTENSIONS
        .iter()
        .find(|(_, known)| *known == ext)
        .map_or("application/octet-stream", |(ty, _)| ty)
}

/// Returns true if a leaf part should be treated as an attachment.
///
/// A `Content-Disposition` of `attachment` or `inline` marks an attachment,
/// except for an inline text or HTML body without a filename. Without a
/// disposition, anything other than `text/plain` or `text/html` is an
/// attachment.
#[must_use]
pub fn is_attachment(part: &Part) -> bool {
    if part.is_multipart() {
        return false;
    }
    let is_body_type = part.content_type.is_text_plain() || part.content_type.is_text_html();

    match part.disposition() {
        Some(disposition) => match disposition.kind {
            DispositionKind::Attachment => true,
            DispositionKind::Inline => {
                !is_body_type
                    || disposition.filename().is_some()
                    || part.content_type.name().is_some()
            }
            DispositionKind::Other(_) => !is_body_type,
        },
        None => !is_body_type,
    }
}

/// Walks a MIME tree and collects every attachment in order.
#[must_use]
pub fn extract_attachments(root: &Part) -> Vec<Attachment> {
    let mut attachments = Vec::new();
    collect(root, &mut attachments);
    attachments
}

fn collect(part: &Part, out: &mut Vec<Attachment>) {
    if let Body::Multipart(children) = &part.body {
        for child in children {
            collect(child, out);
        }
        return;
    }
    if !is_attachment(part) {
        return;
    }

    let disposition = part.disposition();
    let mime_type = part.content_type.mime_type();
    let filename = disposition
        .as_ref()
        .and_then(|d| d.filename())
        .or_else(|| part.content_type.name())
        .map(|name| crate::encoding::decode_rfc2047(name))
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| {
            format!("attachment-{}.{}", out.len() + 1, extension_for(&mime_type))
        });

    out.push(Attachment {
        filename,
        content_type: mime_type,
        size: part.data.len(),
        data: part.data.clone(),
        inline: disposition.is_some_and(|d| d.kind == DispositionKind::Inline),
        content_id: part.content_id().map(ToString::to_string),
    });
}
