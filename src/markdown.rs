use std::ops::Range;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag};

/// Markdown parsed into the small set of constructs the patch engine knows
/// how to render. Anything else is carried as [`Token::Raw`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Strong(Vec<Token>),
    Emphasis(Vec<Token>),
    Link { href: String, children: Vec<Token> },
    Paragraph(Vec<Token>),
    /// `start` is `Some` for ordered lists.
    List { start: Option<u64>, items: Vec<Token> },
    ListItem(Vec<Token>),
    Heading { level: u8, children: Vec<Token> },
    LineBreak,
    BlankSpace,
    Raw(String),
}

#[derive(Debug)]
enum FrameKind {
    Root,
    Strong,
    Emphasis,
    Link(String),
    Paragraph,
    List(Option<u64>),
    Item,
    Heading(u8),
    /// Unsupported container; its whole source slice becomes one raw token.
    Raw { block: bool },
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    range: Range<usize>,
    children: Vec<Token>,
    last_block_end: Option<usize>,
}

impl Frame {
    fn new(kind: FrameKind, range: Range<usize>) -> Self {
        Self {
            kind,
            range,
            children: Vec::new(),
            last_block_end: None,
        }
    }

    fn tracks_blank_space(&self) -> bool {
        matches!(self.kind, FrameKind::Root | FrameKind::Item)
    }
}

impl FrameKind {
    fn is_block(&self) -> bool {
        matches!(
            self,
            FrameKind::Paragraph
                | FrameKind::List(_)
                | FrameKind::Heading(_)
                | FrameKind::Raw { block: true }
        )
    }
}

pub fn tokenize(markdown: &str) -> Vec<Token> {
    let parser = Parser::new_ext(markdown, Options::empty());
    let mut stack = vec![Frame::new(FrameKind::Root, 0..markdown.len())];

    for (event, range) in parser.into_offset_iter() {
        let inside_raw = stack
            .last()
            .is_some_and(|frame| matches!(frame.kind, FrameKind::Raw { .. }));
        if inside_raw {
            match event {
                Event::Start(_) => {
                    stack.push(Frame::new(FrameKind::Raw { block: false }, range));
                }
                Event::End(_) => close_frame(&mut stack, markdown),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(tag) => {
                let kind = frame_kind(tag);
                if kind.is_block()
                    && let Some(parent) = stack.last_mut()
                {
                    note_block_start(parent, markdown, range.start);
                }
                stack.push(Frame::new(kind, range));
            }
            Event::End(_) => close_frame(&mut stack, markdown),
            Event::Text(text) => push_child(&mut stack, Token::Text(text.into_string())),
            Event::Code(code) => push_child(&mut stack, Token::Raw(code.into_string())),
            Event::SoftBreak => push_child(&mut stack, Token::Text("\n".to_owned())),
            Event::HardBreak => push_child(&mut stack, Token::LineBreak),
            Event::Html(_) | Event::Rule | Event::DisplayMath(_) => {
                if let Some(parent) = stack.last_mut() {
                    note_block_start(parent, markdown, range.start);
                }
                let raw = markdown[range.clone()].trim_end_matches('\n').to_owned();
                push_block(&mut stack, Token::Raw(raw), range.end);
            }
            _ => {
                push_child(&mut stack, Token::Raw(markdown[range].to_owned()));
            }
        }
    }

    match stack.pop() {
        Some(root) => root.children,
        None => Vec::new(),
    }
}

fn frame_kind(tag: Tag<'_>) -> FrameKind {
    match tag {
        Tag::Paragraph => FrameKind::Paragraph,
        Tag::Heading { level, .. } => FrameKind::Heading(heading_level(level)),
        Tag::List(start) => FrameKind::List(start),
        Tag::Item => FrameKind::Item,
        Tag::Emphasis => FrameKind::Emphasis,
        Tag::Strong => FrameKind::Strong,
        Tag::Link { dest_url, .. } => FrameKind::Link(dest_url.into_string()),
        Tag::BlockQuote(_)
        | Tag::CodeBlock(_)
        | Tag::HtmlBlock
        | Tag::FootnoteDefinition(_)
        | Tag::Table(_)
        | Tag::MetadataBlock(_)
        | Tag::DefinitionList => FrameKind::Raw { block: true },
        _ => FrameKind::Raw { block: false },
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Inserts a [`Token::BlankSpace`] when the source between the previous block
/// sibling and the block starting at `start` contains a blank line.
fn note_block_start(parent: &mut Frame, source: &str, start: usize) {
    if !parent.tracks_blank_space() {
        return;
    }
    let Some(prev_end) = parent.last_block_end else {
        return;
    };
    let content_end = source[..prev_end.min(start)].trim_end().len();
    let gap = &source[content_end..start];
    if gap.matches('\n').count() >= 2 {
        parent.children.push(Token::BlankSpace);
    }
}

fn push_child(stack: &mut [Frame], token: Token) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(token);
    }
}

fn push_block(stack: &mut [Frame], token: Token, end: usize) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(token);
        parent.last_block_end = Some(end);
    }
}

fn close_frame(stack: &mut Vec<Frame>, source: &str) {
    if stack.len() <= 1 {
        return;
    }
    let Some(frame) = stack.pop() else {
        return;
    };

    if let Some(parent) = stack.last()
        && matches!(parent.kind, FrameKind::Raw { .. })
    {
        return;
    }

    let end = frame.range.end;
    let block = frame.kind.is_block();
    let token = match frame.kind {
        FrameKind::Root => return,
        FrameKind::Strong => Token::Strong(frame.children),
        FrameKind::Emphasis => Token::Emphasis(frame.children),
        FrameKind::Link(href) => Token::Link {
            href,
            children: frame.children,
        },
        FrameKind::Paragraph => Token::Paragraph(frame.children),
        FrameKind::List(start) => Token::List {
            start,
            items: frame.children,
        },
        FrameKind::Item => Token::ListItem(frame.children),
        FrameKind::Heading(level) => Token::Heading {
            level,
            children: frame.children,
        },
        FrameKind::Raw { .. } => {
            Token::Raw(source[frame.range].trim_end_matches('\n').to_owned())
        }
    };

    if block {
        push_block(stack, token, end);
    } else {
        push_child(stack, token);
    }
}
