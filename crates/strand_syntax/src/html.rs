//! Scanner for HTML companion files.
//!
//! Only `<script src="...">` tags matter to the analysis engine; everything
//! else in the document is ignored.

use serde::{Deserialize, Serialize};
use strand_source::{FileId, Span};

/// A `<script src="...">` reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRef {
    /// The `src` attribute value.
    pub uri: String,
    /// Location of the attribute value.
    pub span: Span,
}

/// The scanned form of an HTML file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlUnit {
    /// Script references in document order.
    pub scripts: Vec<ScriptRef>,
}

/// Collects the script references of an HTML document.
pub fn scan_html(text: &str, file: FileId) -> HtmlUnit {
    let lower = text.to_ascii_lowercase();
    let mut scripts = Vec::new();
    let mut from = 0;
    while let Some(offset) = lower[from..].find("<script") {
        let tag_start = from + offset + "<script".len();
        let Some(tag_len) = lower[tag_start..].find('>') else {
            break;
        };
        let tag_end = tag_start + tag_len;
        if let Some((start, end)) = src_attribute(&lower[tag_start..tag_end]) {
            let (start, end) = (tag_start + start, tag_start + end);
            scripts.push(ScriptRef {
                uri: text[start..end].to_string(),
                span: Span::new(file, start as u32, end as u32),
            });
        }
        from = tag_end;
    }
    HtmlUnit { scripts }
}

/// Byte range of the `src` value inside a tag's attribute text.
fn src_attribute(attrs: &str) -> Option<(usize, usize)> {
    let mut search = 0;
    while let Some(offset) = attrs[search..].find("src") {
        let name_start = search + offset;
        search = name_start + 3;
        let preceded_by_space = attrs[..name_start]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_ascii_whitespace());
        if !preceded_by_space {
            continue;
        }
        let rest = attrs[search..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let value = rest.trim_start();
        let value_start = attrs.len() - value.len();
        let quote = value.chars().next()?;
        if quote == '"' || quote == '\'' {
            let len = value[1..].find(quote)?;
            return Some((value_start + 1, value_start + 1 + len));
        }
        let len = value
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(value.len());
        return Some((value_start, value_start + len));
    }
    None
}
