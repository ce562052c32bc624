//! Files attached to the next user turn.
//!
//! Text files are inlined into the prompt; images travel as base64 data URLs
//! and are only sent to multimodal models. PDF and DOCX text comes from a
//! [`DocumentExtractor`], which the core treats as an opaque collaborator.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::constants::FILE_CONTEXT_LABEL;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Text { name: String, text: String },
    Image { name: String, data_url: String },
}

impl Attachment {
    pub fn name(&self) -> &str {
        match self {
            Attachment::Text { name, .. } | Attachment::Image { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

#[derive(Debug)]
pub enum AttachmentError {
    Io { path: PathBuf, source: io::Error },
    Unsupported { path: PathBuf },
    NotUtf8 { path: PathBuf },
    Extraction { path: PathBuf, message: String },
}

impl fmt::Display for AttachmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentError::Io { path, source } => {
                write!(f, "Failed to read {}: {source}", path.display())
            }
            AttachmentError::Unsupported { path } => write!(
                f,
                "Unsupported attachment {} (expected .txt, .md, .pdf, .docx, .png, .jpg or .jpeg)",
                path.display()
            ),
            AttachmentError::NotUtf8 { path } => {
                write!(f, "{} is not valid UTF-8 text", path.display())
            }
            AttachmentError::Extraction { path, message } => {
                write!(f, "Could not extract text from {}: {message}", path.display())
            }
        }
    }
}

impl StdError for AttachmentError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AttachmentError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub trait DocumentExtractor: Send + Sync {
    fn extract_text(&self, kind: DocumentKind, bytes: &[u8]) -> Result<String, String>;
}

/// Extractor used when no document backend is configured.
pub struct NoDocumentSupport;

impl DocumentExtractor for NoDocumentSupport {
    fn extract_text(&self, kind: DocumentKind, _bytes: &[u8]) -> Result<String, String> {
        Err(format!("no {kind:?} extractor is available"))
    }
}

enum FileKind {
    Text,
    Document(DocumentKind),
    Image(&'static str),
}

fn classify(path: &Path) -> Option<FileKind> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "txt" | "md" => Some(FileKind::Text),
        "pdf" => Some(FileKind::Document(DocumentKind::Pdf)),
        "docx" => Some(FileKind::Document(DocumentKind::Docx)),
        "png" => Some(FileKind::Image("image/png")),
        "jpg" | "jpeg" => Some(FileKind::Image("image/jpeg")),
        _ => None,
    }
}

pub fn read_attachment(
    path: &Path,
    extractor: &dyn DocumentExtractor,
) -> Result<Attachment, AttachmentError> {
    let kind = classify(path).ok_or_else(|| AttachmentError::Unsupported {
        path: path.to_path_buf(),
    })?;
    let bytes = fs::read(path).map_err(|source| AttachmentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match kind {
        FileKind::Text => {
            let text = String::from_utf8(bytes).map_err(|_| AttachmentError::NotUtf8 {
                path: path.to_path_buf(),
            })?;
            Ok(Attachment::Text { name, text })
        }
        FileKind::Document(kind) => {
            let text = extractor
                .extract_text(kind, &bytes)
                .map_err(|message| AttachmentError::Extraction {
                    path: path.to_path_buf(),
                    message,
                })?;
            Ok(Attachment::Text { name, text })
        }
        FileKind::Image(mime) => Ok(Attachment::Image {
            name,
            data_url: format!("data:{mime};base64,{}", STANDARD.encode(&bytes)),
        }),
    }
}

/// Attached text joined into one context block plus the image data URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAttachments {
    pub file_context: String,
    pub images: Vec<String>,
}

pub fn combine(attachments: &[Attachment]) -> ParsedAttachments {
    let mut texts = Vec::new();
    let mut images = Vec::new();
    for attachment in attachments {
        match attachment {
            Attachment::Text { text, .. } => texts.push(text.as_str()),
            Attachment::Image { data_url, .. } => images.push(data_url.clone()),
        }
    }
    ParsedAttachments {
        file_context: texts.join("\n").trim().to_string(),
        images,
    }
}

/// The prompt with attached file text appended under a label.
pub fn compose_prompt(prompt: &str, file_context: &str) -> String {
    let file_context = file_context.trim();
    if file_context.is_empty() {
        prompt.to_string()
    } else {
        format!("{prompt}\n\n{FILE_CONTEXT_LABEL}\n{file_context}")
    }
}
