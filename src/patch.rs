use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::markdown::tokenize;
use crate::normalize::normalize;
use crate::style::{Segment, StyleAttrs, build};

/// Length of `text` in the document's offset unit (UTF-16 code units).
pub fn doc_len(text: &str) -> usize {
    text.encode_utf16().count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleField {
    Bold,
    Italic,
    Link,
}

impl StyleField {
    pub fn as_str(self) -> &'static str {
        match self {
            StyleField::Bold => "bold",
            StyleField::Italic => "italic",
            StyleField::Link => "link",
        }
    }

    /// Attributes set on `style`, in the fixed `bold, italic, link` order.
    pub fn present_in(style: &StyleAttrs) -> Vec<StyleField> {
        let mut fields = Vec::with_capacity(3);
        if style.bold {
            fields.push(StyleField::Bold);
        }
        if style.italic {
            fields.push(StyleField::Italic);
        }
        if style.link.is_some() {
            fields.push(StyleField::Link);
        }
        fields
    }
}

impl fmt::Display for StyleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchOperation {
    InsertText {
        offset: usize,
        text: String,
    },
    UpdateStyle {
        range: Range<usize>,
        style: StyleAttrs,
        fields: Vec<StyleField>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub operations: Vec<PatchOperation>,
    /// Length of the inserted text; everything after the anchor shifts by this much.
    pub length: usize,
}

/// Turns normalized segments into one insertion plus style updates anchored
/// at `start`.
pub fn compile(segments: &[Segment], start: usize) -> Patch {
    let full_text: String = segments.iter().map(|segment| segment.text.as_str()).collect();
    if full_text.is_empty() {
        return Patch::default();
    }

    let length = doc_len(&full_text);
    let mut operations = vec![PatchOperation::InsertText {
        offset: start,
        text: full_text,
    }];

    let mut offset = start;
    for segment in segments {
        let len = doc_len(&segment.text);
        let fields = StyleField::present_in(&segment.style);
        if !fields.is_empty() && len > 0 {
            operations.push(PatchOperation::UpdateStyle {
                range: offset..offset + len,
                style: segment.style.clone(),
                fields,
            });
        }
        offset += len;
    }

    Patch { operations, length }
}

/// Full pipeline: tokenize, flatten, normalize, compile.
pub fn compile_markdown(markdown: &str, start: usize) -> Patch {
    let segments = normalize(build(&tokenize(markdown)));
    compile(&segments, start)
}

/// An edit addressed by absolute position in one linear document.
pub trait Anchored {
    fn anchor(&self) -> usize;
}

/// Orders positional edits so that applying them front to back never moves a
/// position that is still pending: highest anchor first.
pub fn order_for_application<T: Anchored>(edits: &mut [T]) {
    edits.sort_by(|a, b| b.anchor().cmp(&a.anchor()));
}
