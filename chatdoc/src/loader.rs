//! Document loaders.
//!
//! [`FileLoader`] turns text, HTML and (with the `pdf` feature) PDF files into
//! plain-text [`Document`]s.

use std::fs;
use std::path::Path;

use tracing::{debug, error};

use crate::document::{Document, DocumentFormat};
use crate::error::{ChatError, Result};

/// Loads a file of a declared format into a [`Document`].
pub trait DocumentLoader: Send + Sync {
    /// Load the file at `path` as `format`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::UnsupportedFormat`] if this loader cannot handle
    /// `format`, and [`ChatError::DocumentLoad`] if reading or parsing fails.
    fn load(&self, path: &Path, format: DocumentFormat) -> Result<Document>;

    /// Load a file, picking the format from its extension.
    fn load_path(&self, path: &Path) -> Result<Document> {
        let format = DocumentFormat::from_path(path)?;
        self.load(path, format)
    }
}

/// Reads documents from the local filesystem.
///
/// The document ID is the path as given; metadata records `source` and `format`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    /// Create a new `FileLoader`.
    pub fn new() -> Self {
        Self
    }
}

fn load_error(path: &Path, message: impl ToString) -> ChatError {
    ChatError::DocumentLoad { path: path.display().to_string(), message: message.to_string() }
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to read document");
        load_error(path, e)
    })
}

#[cfg(feature = "pdf")]
fn extract_pdf(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to extract PDF text");
        load_error(path, e)
    })
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(path: &Path) -> Result<String> {
    Err(ChatError::UnsupportedFormat(format!(
        "{} (PDF support not enabled, rebuild with the `pdf` feature)",
        path.display()
    )))
}

impl DocumentLoader for FileLoader {
    fn load(&self, path: &Path, format: DocumentFormat) -> Result<Document> {
        let text = match format {
            DocumentFormat::Text => read_to_string(path)?,
            DocumentFormat::Html => html_to_text(&read_to_string(path)?),
            DocumentFormat::Pdf => extract_pdf(path)?,
        };

        let source = path.display().to_string();
        debug!(path = %source, %format, text_len = text.len(), "loaded document");

        Ok(Document::new(source.clone(), text, format)
            .with_metadata("source", source)
            .with_metadata("format", format.as_str()))
    }
}

/// Elements whose boundaries become line breaks.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "title", "tr", "ul",
];

/// Elements whose content is dropped entirely.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Strip markup from HTML, keeping block structure as line breaks.
///
/// Source whitespace is collapsed the way a browser would; a blank line
/// separates block elements so paragraph boundaries survive for chunking.
pub fn html_to_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        push_collapsed(&mut text, &rest[..open]);
        let after = &rest[open + 1..];

        // A bare `<` in prose ("a < b") is text, not the start of a tag.
        if !after.starts_with(|c: char| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?')) {
            text.push('<');
            rest = after;
            continue;
        }

        if let Some(comment) = after.strip_prefix("!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }

        let Some(close) = after.find('>') else {
            rest = "";
            break;
        };
        let tag = &after[..close];
        rest = &after[close + 1..];

        let closing = tag.starts_with('/');
        let name = tag_name(tag);

        if !closing && SKIPPED_TAGS.contains(&name.as_str()) {
            let end_marker = format!("</{name}");
            let skipped = rest;
            rest = skipped.to_ascii_lowercase().find(&end_marker).map_or("", |pos| &skipped[pos..]);
        } else if BLOCK_TAGS.contains(&name.as_str()) {
            text.push('\n');
        } else if name == "td" || name == "th" {
            text.push(' ');
        }
    }
    push_collapsed(&mut text, rest);

    normalize_lines(&html_escape::decode_html_entities(&text))
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn push_collapsed(out: &mut String, text: &str) {
    out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
}

/// Collapse spaces within lines and runs of blank lines into one blank line.
fn normalize_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_blank = false;

    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            pending_blank = true;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if pending_blank { "\n\n" } else { "\n" });
        }
        out.push_str(&line);
        pending_blank = false;
    }

    out
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn html_to_text_keeps_blocks_and_drops_scripts() {
        let html = "<html><head><title>T</title><style>p{color:red}</style></head>\
                    <body><h1>Header</h1><p>Hello &amp; welcome</p>\
                    <script>var x = '<b>';</script><p>Second\n   line</p></body></html>";
        assert_eq!(html_to_text(html), "T\n\nHeader\n\nHello & welcome\n\nSecond line");
    }

    #[test]
    fn html_to_text_handles_comments_breaks_and_cells() {
        let html = "<!-- a > b -->one<br>two<table><tr><td>x</td><td>y</td></tr></table>";
        assert_eq!(html_to_text(html), "one\ntwo\n\nx y");
    }

    #[test]
    fn html_to_text_is_case_insensitive_for_skipped_tags() {
        assert_eq!(html_to_text("<SCRIPT>alert(1)</SCRIPT><P>kept</P>"), "kept");
    }

    #[test]
    fn html_to_text_keeps_bare_angle_brackets() {
        assert_eq!(html_to_text("<p>if a < b then stop</p><p>next</p>"), "if a < b then stop\n\nnext");
        assert_eq!(html_to_text("<p>x < y</p>"), "x < y");
        assert_eq!(html_to_text("trailing <"), "trailing <");
        assert_eq!(html_to_text("1 <2 and 3<= 4"), "1 <2 and 3<= 4");
    }

    #[test]
    fn loads_text_file_verbatim() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "line one\n\nline two").unwrap();

        let document = FileLoader.load_path(file.path()).unwrap();
        assert_eq!(document.text, "line one\n\nline two");
        assert_eq!(document.format, DocumentFormat::Text);
        assert_eq!(document.id, file.path().display().to_string());
        assert_eq!(document.metadata.get("format").map(String::as_str), Some("text"));
    }

    #[test]
    fn loads_html_file_as_plain_text() {
        let mut file = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
        write!(file, "<p>Atopic dermatitis &lt;AD&gt;</p>").unwrap();

        let document = FileLoader.load_path(file.path()).unwrap();
        assert_eq!(document.text, "Atopic dermatitis <AD>");
        assert_eq!(document.format, DocumentFormat::Html);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = FileLoader.load(Path::new("/nonexistent/paper.txt"), DocumentFormat::Text).unwrap_err();
        assert!(matches!(err, ChatError::DocumentLoad { path, .. } if path == "/nonexistent/paper.txt"));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = FileLoader.load_path(Path::new("song.mp3")).unwrap_err();
        assert!(matches!(err, ChatError::UnsupportedFormat(_)));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn corrupt_pdf_is_a_load_error() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        write!(file, "this is not a pdf").unwrap();

        let err = FileLoader.load_path(file.path()).unwrap_err();
        assert!(matches!(err, ChatError::DocumentLoad { path, .. } if path == file.path().display().to_string()));
    }

    #[cfg(not(feature = "pdf"))]
    #[test]
    fn pdf_without_feature_is_unsupported() {
        let err = FileLoader.load_path(Path::new("paper.pdf")).unwrap_err();
        assert!(matches!(err, ChatError::UnsupportedFormat(msg) if msg.contains("pdf")));
    }
}
