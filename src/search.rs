//! Structural search for sentinel markers across paragraphs, table cells and
//! table-of-contents content.

use crate::docs::Document;
use crate::docs::model::{Paragraph, StructuralElement};
use crate::patch::doc_len;

pub const SENTINEL_PREFIX: &str = "__REPLACE";
pub const SENTINEL_SUFFIX: &str = "__";

/// Stand-in for non-text paragraph elements so offsets stay aligned.
const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// One sentinel occurrence, `[start, end)` in document offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelMatch {
    pub sentinel: String,
    /// The alphanumeric key embedded in the sentinel.
    pub token: String,
    pub start: usize,
    pub end: usize,
}

/// Every sentinel in `document`, in document order.
pub fn find_sentinels(document: &Document) -> Vec<SentinelMatch> {
    let mut out = Vec::new();
    walk(document.content(), &mut out);
    out
}

fn walk(elements: &[StructuralElement], out: &mut Vec<SentinelMatch>) {
    for element in elements {
        if let Some(paragraph) = &element.paragraph {
            search_paragraph(paragraph, out);
        }
        if let Some(table) = &element.table {
            for row in &table.table_rows {
                for cell in &row.table_cells {
                    walk(&cell.content, out);
                }
            }
        }
        if let Some(toc) = &element.table_of_contents {
            walk(&toc.content, out);
        }
    }
}

/// Searches the paragraph's runs as one string so a sentinel split across
/// differently styled runs is still found.
fn search_paragraph(paragraph: &Paragraph, out: &mut Vec<SentinelMatch>) {
    let Some(first) = paragraph.elements.first() else {
        return;
    };
    let base = first.start_index;
    let mut cursor = base;
    let mut text = String::new();

    for element in &paragraph.elements {
        if element.start_index > cursor {
            pad(&mut text, element.start_index - cursor);
            cursor = element.start_index;
        }
        match &element.text_run {
            Some(run) => {
                text.push_str(&run.content);
                cursor += doc_len(&run.content);
            }
            None => {
                let len = element
                    .end_index
                    .map(|end| end.saturating_sub(element.start_index))
                    .unwrap_or(0);
                pad(&mut text, len);
                cursor += len;
            }
        }
    }

    for (byte_start, byte_end, token) in scan_sentinels(&text) {
        let start = base + doc_len(&text[..byte_start]);
        let sentinel = &text[byte_start..byte_end];
        out.push(SentinelMatch {
            sentinel: sentinel.to_owned(),
            token: token.to_owned(),
            start,
            end: start + doc_len(sentinel),
        });
    }
}

fn pad(text: &mut String, len: usize) {
    text.extend(std::iter::repeat_n(OBJECT_REPLACEMENT, len));
}

/// Byte ranges of `__REPLACE<alnum>__` occurrences plus the alphanumeric part.
pub fn scan_sentinels(text: &str) -> Vec<(usize, usize, &str)> {
    let mut found = Vec::new();
    let mut cursor = 0usize;

    while let Some(rel) = text[cursor..].find(SENTINEL_PREFIX) {
        let start = cursor + rel;
        let token_start = start + SENTINEL_PREFIX.len();
        let token_len = text[token_start..]
            .bytes()
            .take_while(u8::is_ascii_alphanumeric)
            .count();
        let token_end = token_start + token_len;

        if token_len > 0 && text[token_end..].starts_with(SENTINEL_SUFFIX) {
            let end = token_end + SENTINEL_SUFFIX.len();
            found.push((start, end, &text[token_start..token_end]));
            cursor = end;
        } else {
            cursor = token_start;
        }
    }

    found
}
