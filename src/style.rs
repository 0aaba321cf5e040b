use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::markdown::Token;

const BULLET: &str = "• ";
const BLOCK_SEPARATOR: &str = "\n\n";
const INDENT: &str = "  ";

/// Character style resolved for one segment. Inherited top-down: a child
/// scope may add attributes but never removes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleAttrs {
    pub bold: bool,
    pub italic: bool,
    pub link: Option<String>,
}

impl StyleAttrs {
    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && self.link.is_none()
    }

    fn with_bold(&self) -> Self {
        Self {
            bold: true,
            ..self.clone()
        }
    }

    fn with_italic(&self) -> Self {
        Self {
            italic: true,
            ..self.clone()
        }
    }

    fn with_link(&self, href: &str) -> Self {
        Self {
            link: Some(href.to_owned()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub style: StyleAttrs,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: StyleAttrs::default(),
        }
    }

    pub fn styled(text: impl Into<String>, style: StyleAttrs) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// Structural separator: one or more newlines and no style at all.
    pub fn is_blank(&self) -> bool {
        !self.text.is_empty() && self.text.bytes().all(|b| b == b'\n') && self.style.is_plain()
    }
}

/// Flattens a token tree into segments in reading order.
pub fn build(tokens: &[Token]) -> Vec<Segment> {
    let mut builder = RunBuilder::default();
    builder.visit_all(tokens, &StyleAttrs::default());
    builder.segments
}

#[derive(Debug, Default)]
struct RunBuilder {
    segments: Vec<Segment>,
    list_depth: usize,
}

impl RunBuilder {
    fn visit_all(&mut self, tokens: &[Token], style: &StyleAttrs) {
        for token in tokens {
            self.visit(token, style);
        }
    }

    fn visit(&mut self, token: &Token, style: &StyleAttrs) {
        match token {
            Token::Text(content) => {
                let text = unescape_entities(content);
                self.segments
                    .push(Segment::styled(text.into_owned(), style.clone()));
            }
            Token::Strong(children) => self.visit_all(children, &style.with_bold()),
            Token::Emphasis(children) => self.visit_all(children, &style.with_italic()),
            Token::Link { href, children } => self.visit_all(children, &style.with_link(href)),
            Token::Paragraph(children) => {
                self.visit_all(children, style);
                self.separator(BLOCK_SEPARATOR);
            }
            Token::Heading { children, .. } => {
                self.visit_all(children, &style.with_bold());
                self.separator(BLOCK_SEPARATOR);
            }
            Token::List { start, items } => self.visit_list(*start, items, style),
            // Items only appear under a list; a stray one renders as an unordered item.
            Token::ListItem(children) => {
                self.segments.push(Segment::plain(BULLET));
                self.visit_all(children, style);
                self.separator(BLOCK_SEPARATOR);
            }
            Token::LineBreak => self.separator("\n"),
            Token::BlankSpace => self.separator(BLOCK_SEPARATOR),
            Token::Raw(raw) => self.segments.push(Segment::plain(raw.as_str())),
        }
    }

    fn visit_list(&mut self, start: Option<u64>, items: &[Token], style: &StyleAttrs) {
        if self.list_depth > 0 && self.last_is_inline() {
            self.separator("\n");
        }

        let indent = INDENT.repeat(self.list_depth);
        self.list_depth += 1;
        for (idx, item) in items.iter().enumerate() {
            let glyph = match start {
                Some(first) => format!("{indent}{}. ", first + idx as u64),
                None => format!("{indent}{BULLET}"),
            };
            self.segments.push(Segment::plain(glyph));
            match item {
                Token::ListItem(children) => self.visit_all(children, style),
                other => self.visit(other, style),
            }
            self.separator(BLOCK_SEPARATOR);
        }
        self.list_depth -= 1;
    }

    fn separator(&mut self, text: &str) {
        self.segments.push(Segment::plain(text));
    }

    fn last_is_inline(&self) -> bool {
        self.segments
            .iter()
            .rev()
            .find(|segment| !segment.text.is_empty())
            .is_some_and(|segment| !segment.is_blank())
    }
}

/// Decodes the handful of HTML entities markdown tokenizers leave in text.
pub fn unescape_entities(input: &str) -> Cow<'_, str> {
    const ENTITIES: [(&str, char); 5] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#39;", '\''),
    ];

    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES
            .iter()
            .find(|(entity, _)| rest.starts_with(entity))
        {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
