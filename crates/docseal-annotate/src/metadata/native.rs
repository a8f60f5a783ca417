//! In-process comment editing for JPEG, PNG and PDF containers.

use std::path::Path;

use lopdf::{dictionary, Object};

use super::MetadataWriter;
use crate::error::MetadataError;
use crate::fsutil::replace_file;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_COM: u8 = 0xFE;
const JPEG_SOS: u8 = 0xDA;
const JPEG_EOI: u8 = 0xD9;
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const PNG_COMMENT_KEYWORD: &[u8] = b"Comment";
const PDF_COMMENT_KEY: &str = "UserComment";

/// Container formats the native writer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Jpeg,
    Png,
    Pdf,
}

impl Container {
    fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&JPEG_SOI) {
            Some(Self::Jpeg)
        } else if data.starts_with(&PNG_SIGNATURE) {
            Some(Self::Png)
        } else if data.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else {
            None
        }
    }
}

/// Edits the comment slot directly in the file bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeMetadataWriter;

impl NativeMetadataWriter {
    pub fn new() -> Self {
        Self
    }

    fn rewrite(&self, path: &Path, comment: Option<&str>) -> Result<(), MetadataError> {
        let data = std::fs::read(path)?;
        let rewritten = match sniff(&data)? {
            Container::Jpeg => jpeg::rewrite(&data, comment)?,
            Container::Png => png::rewrite(&data, comment)?,
            Container::Pdf => pdf::rewrite(&data, comment)?,
        };
        if let Some(bytes) = rewritten {
            replace_file(path, &bytes)?;
        }
        Ok(())
    }
}

impl MetadataWriter for NativeMetadataWriter {
    fn clear_comment(&self, path: &Path) -> Result<(), MetadataError> {
        self.rewrite(path, None)
    }

    fn set_comment(&self, path: &Path, comment: &str) -> Result<(), MetadataError> {
        self.rewrite(path, Some(comment))
    }

    fn read_comment(&self, path: &Path) -> Result<Option<String>, MetadataError> {
        let data = std::fs::read(path)?;
        match sniff(&data)? {
            Container::Jpeg => jpeg::read(&data),
            Container::Png => png::read(&data),
            Container::Pdf => pdf::read(&data),
        }
    }

    fn name(&self) -> &str {
        "native"
    }
}

fn sniff(data: &[u8]) -> Result<Container, MetadataError> {
    Container::sniff(data).ok_or_else(|| {
        MetadataError::Unsupported("container is not JPEG, PNG or PDF".to_string())
    })
}

// ─── JPEG ───────────────────────────────────────────────────────────

mod jpeg {
    use super::*;

    /// One marker segment before the first scan.
    struct Segment<'a> {
        marker: u8,
        /// Length field plus payload, absent for standalone markers.
        body: &'a [u8],
    }

    /// Walk the header segments. Returns them together with the offset
    /// of the entropy-coded data that follows SOS (or the end of the file
    /// when there is no scan).
    fn header_segments(data: &[u8]) -> Result<(Vec<Segment<'_>>, usize), MetadataError> {
        let malformed = |what: &str| MetadataError::Malformed(format!("JPEG: {what}"));
        let mut segments = Vec::new();
        let mut pos = JPEG_SOI.len();
        loop {
            if pos >= data.len() {
                return Err(malformed("truncated before start of scan"));
            }
            if data[pos] != 0xFF {
                return Err(malformed("expected marker"));
            }
            while pos < data.len() && data[pos] == 0xFF {
                pos += 1;
            }
            let Some(&marker) = data.get(pos) else {
                return Err(malformed("truncated marker"));
            };
            pos += 1;
            if marker == JPEG_EOI {
                segments.push(Segment { marker, body: &[] });
                return Ok((segments, pos));
            }
            if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
                segments.push(Segment { marker, body: &[] });
                continue;
            }
            if pos + 2 > data.len() {
                return Err(malformed("truncated segment length"));
            }
            let len = usize::from(u16::from_be_bytes([data[pos], data[pos + 1]]));
            if len < 2 || pos + len > data.len() {
                return Err(malformed("segment length out of range"));
            }
            segments.push(Segment {
                marker,
                body: &data[pos..pos + len],
            });
            pos += len;
            if marker == JPEG_SOS {
                return Ok((segments, pos));
            }
        }
    }

    fn com_segment(comment: &str) -> Result<Vec<u8>, MetadataError> {
        let payload = comment.as_bytes();
        let len = u16::try_from(payload.len() + 2).map_err(|_| {
            MetadataError::InvalidComment("comment exceeds JPEG segment size".to_string())
        })?;
        let mut out = Vec::with_capacity(payload.len() + 4);
        out.extend_from_slice(&[0xFF, JPEG_COM]);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(payload);
        Ok(out)
    }

    /// Drop every header COM segment and, if `comment` is given, insert
    /// one after SOI and the leading APPn segments.
    pub(super) fn rewrite(
        data: &[u8],
        comment: Option<&str>,
    ) -> Result<Option<Vec<u8>>, MetadataError> {
        let (segments, scan_start) = header_segments(data)?;
        if comment.is_none() && !segments.iter().any(|s| s.marker == JPEG_COM) {
            return Ok(None);
        }
        let mut pending = comment.map(com_segment).transpose()?;
        let mut out = Vec::with_capacity(data.len() + 64);
        out.extend_from_slice(&JPEG_SOI);
        for segment in &segments {
            let is_app = (0xE0..=0xEF).contains(&segment.marker);
            if !is_app {
                if let Some(com) = pending.take() {
                    out.extend_from_slice(&com);
                }
            }
            if segment.marker == JPEG_COM {
                continue;
            }
            out.extend_from_slice(&[0xFF, segment.marker]);
            out.extend_from_slice(segment.body);
        }
        if let Some(com) = pending.take() {
            out.extend_from_slice(&com);
        }
        out.extend_from_slice(&data[scan_start..]);
        Ok(Some(out))
    }

    pub(super) fn read(data: &[u8]) -> Result<Option<String>, MetadataError> {
        let (segments, _) = header_segments(data)?;
        Ok(segments
            .iter()
            .find(|s| s.marker == JPEG_COM)
            .map(|s| decode_text(&s.body[2..])))
    }
}

// ─── PNG ────────────────────────────────────────────────────────────

mod png {
    use super::*;

    struct Chunk<'a> {
        kind: [u8; 4],
        data: &'a [u8],
        /// Length, type, data and CRC as they appear in the file.
        raw: &'a [u8],
    }

    fn chunks(data: &[u8]) -> Result<Vec<Chunk<'_>>, MetadataError> {
        let malformed = |what: &str| MetadataError::Malformed(format!("PNG: {what}"));
        let mut out = Vec::new();
        let mut pos = PNG_SIGNATURE.len();
        while pos < data.len() {
            if pos + 8 > data.len() {
                return Err(malformed("truncated chunk header"));
            }
            let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
            let len = usize::try_from(len).map_err(|_| malformed("chunk too large"))?;
            let end = pos
                .checked_add(12)
                .and_then(|n| n.checked_add(len))
                .filter(|&end| end <= data.len())
                .ok_or_else(|| malformed("chunk length out of range"))?;
            let kind = [data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]];
            out.push(Chunk {
                kind,
                data: &data[pos + 8..pos + 8 + len],
                raw: &data[pos..end],
            });
            pos = end;
            if &kind == b"IEND" {
                break;
            }
        }
        if !out.iter().any(|c| &c.kind == b"IEND") {
            return Err(malformed("missing IEND"));
        }
        Ok(out)
    }

    fn is_comment(chunk: &Chunk<'_>) -> bool {
        matches!(&chunk.kind, b"tEXt" | b"zTXt" | b"iTXt")
            && keyword(chunk.data) == Some(PNG_COMMENT_KEYWORD)
    }

    fn keyword(data: &[u8]) -> Option<&[u8]> {
        data.iter().position(|&b| b == 0).map(|n| &data[..n])
    }

    fn text_chunk(comment: &str) -> Result<Vec<u8>, MetadataError> {
        if comment.contains('\0') {
            return Err(MetadataError::InvalidComment(
                "comment contains a NUL byte".to_string(),
            ));
        }
        let mut payload = Vec::with_capacity(PNG_COMMENT_KEYWORD.len() + 1 + comment.len());
        payload.extend_from_slice(PNG_COMMENT_KEYWORD);
        payload.push(0);
        payload.extend_from_slice(comment.as_bytes());
        let len = u32::try_from(payload.len()).map_err(|_| {
            MetadataError::InvalidComment("comment exceeds PNG chunk size".to_string())
        })?;

        let mut crc = crc32fast::Hasher::new();
        crc.update(b"tEXt");
        crc.update(&payload);

        let mut out = Vec::with_capacity(payload.len() + 12);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(b"tEXt");
        out.extend_from_slice(&payload);
        out.extend_from_slice(&crc.finalize().to_be_bytes());
        Ok(out)
    }

    /// Drop every `Comment` text chunk and, if `comment` is given, add a
    /// fresh `tEXt` chunk right before IEND.
    pub(super) fn rewrite(
        data: &[u8],
        comment: Option<&str>,
    ) -> Result<Option<Vec<u8>>, MetadataError> {
        let chunks = chunks(data)?;
        if comment.is_none() && !chunks.iter().any(is_comment) {
            return Ok(None);
        }
        let mut out = Vec::with_capacity(data.len() + 64);
        out.extend_from_slice(&PNG_SIGNATURE);
        for chunk in &chunks {
            if is_comment(chunk) {
                continue;
            }
            if &chunk.kind == b"IEND" {
                if let Some(text) = comment {
                    out.extend_from_slice(&text_chunk(text)?);
                }
            }
            out.extend_from_slice(chunk.raw);
        }
        Ok(Some(out))
    }

    pub(super) fn read(data: &[u8]) -> Result<Option<String>, MetadataError> {
        for chunk in chunks(data)? {
            if !is_comment(&chunk) {
                continue;
            }
            let rest = &chunk.data[PNG_COMMENT_KEYWORD.len() + 1..];
            match &chunk.kind {
                b"tEXt" => return Ok(Some(decode_text(rest))),
                // compression flag, method, language tag, translated keyword
                b"iTXt" if rest.first() == Some(&0) && rest.len() >= 2 => {
                    let mut fields = rest[2..].splitn(3, |&b| b == 0);
                    let _language = fields.next();
                    let _translated = fields.next();
                    if let Some(text) = fields.next() {
                        return Ok(Some(decode_text(text)));
                    }
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

// ─── PDF ────────────────────────────────────────────────────────────

mod pdf {
    use super::*;

    fn load(data: &[u8]) -> Result<lopdf::Document, MetadataError> {
        lopdf::Document::load_mem(data).map_err(|e| MetadataError::Malformed(format!("PDF: {e}")))
    }

    fn info_dict(doc: &lopdf::Document) -> Option<&lopdf::Dictionary> {
        match doc.trailer.get(b"Info").ok()? {
            Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    fn info_dict_mut(doc: &mut lopdf::Document) -> Option<&mut lopdf::Dictionary> {
        let reference = match doc.trailer.get(b"Info").ok()? {
            Object::Reference(id) => Some(*id),
            _ => None,
        };
        match reference {
            Some(id) => doc.get_object_mut(id).ok()?.as_dict_mut().ok(),
            None => doc.trailer.get_mut(b"Info").ok()?.as_dict_mut().ok(),
        }
    }

    /// Set or remove `UserComment` in the document information dictionary,
    /// creating the dictionary when needed.
    pub(super) fn rewrite(
        data: &[u8],
        comment: Option<&str>,
    ) -> Result<Option<Vec<u8>>, MetadataError> {
        let mut doc = load(data)?;
        match (info_dict_mut(&mut doc), comment) {
            (Some(info), Some(text)) => {
                info.set(PDF_COMMENT_KEY, Object::string_literal(text));
            }
            (Some(info), None) => {
                if info.remove(PDF_COMMENT_KEY.as_bytes()).is_none() {
                    return Ok(None);
                }
            }
            (None, Some(text)) => {
                let id = doc.add_object(dictionary! {
                    PDF_COMMENT_KEY => Object::string_literal(text),
                });
                doc.trailer.set("Info", id);
            }
            (None, None) => return Ok(None),
        }
        let mut out = Vec::with_capacity(data.len() + 128);
        doc.save_to(&mut out)?;
        Ok(Some(out))
    }

    pub(super) fn read(data: &[u8]) -> Result<Option<String>, MetadataError> {
        let doc = load(data)?;
        Ok(info_dict(&doc)
            .and_then(|info| info.get(PDF_COMMENT_KEY.as_bytes()).ok())
            .and_then(|value| value.as_str().ok())
            .map(decode_pdf_string))
    }

    /// PDF text strings are either UTF-16BE with a byte order mark or a
    /// single-byte encoding.
    fn decode_pdf_string(bytes: &[u8]) -> String {
        match bytes.strip_prefix(&[0xFE, 0xFF]) {
            Some(utf16) => {
                let units: Vec<u16> = utf16
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            None => decode_text(bytes),
        }
    }
}

/// Decode a stored comment, tolerating trailing NULs and non-UTF-8 bytes.
fn decode_text(bytes: &[u8]) -> String {
    let trimmed = match bytes.iter().rposition(|&b| b != 0) {
        Some(last) => &bytes[..=last],
        None => &[],
    };
    String::from_utf8_lossy(trimmed).into_owned()
}
