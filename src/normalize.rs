use crate::style::Segment;

/// Longest run of newlines allowed between blocks.
pub const MAX_BLANK_RUN: usize = 2;

/// Rewrites inter-block spacing: adjacent separators are merged, no run of
/// newlines in the joined text exceeds [`MAX_BLANK_RUN`], and the joined text
/// neither starts nor ends with a newline. Styled segments are never merged,
/// only trimmed.
pub fn normalize(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment.text.is_empty() {
            continue;
        }
        if segment.is_blank()
            && let Some(last) = merged.last_mut()
            && last.is_blank()
        {
            last.text.push_str(&segment.text);
            continue;
        }
        merged.push(segment);
    }

    let mut out: Vec<Segment> = Vec::with_capacity(merged.len());
    let mut run = 0usize;
    for mut segment in merged {
        segment.text = cap_newline_runs(&segment.text, &mut run);
        if !segment.text.is_empty() {
            out.push(segment);
        }
    }

    trim_edges(&mut out);
    out
}

/// `run` carries the newline count ending the previous segment.
fn cap_newline_runs(text: &str, run: &mut usize) -> String {
    let mut capped = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\n' {
            if *run >= MAX_BLANK_RUN {
                continue;
            }
            *run += 1;
        } else {
            *run = 0;
        }
        capped.push(ch);
    }
    capped
}

fn trim_edges(segments: &mut Vec<Segment>) {
    while let Some(first) = segments.first() {
        let cut = first.text.len() - first.text.trim_start_matches('\n').len();
        if cut == first.text.len() {
            segments.remove(0);
            continue;
        }
        segments[0].text.drain(..cut);
        break;
    }

    while let Some(last) = segments.last() {
        let kept = last.text.trim_end_matches('\n').len();
        if kept == 0 {
            segments.pop();
            continue;
        }
        if let Some(last) = segments.last_mut() {
            last.text.truncate(kept);
        }
        break;
    }
}
