// src/merge/xml.rs
//! Marker substitution over WordprocessingML parts.
//!
//! Word freely splits text into several runs (spell-checking, edits, mixed
//! formatting), so a marker may start in one `w:t` and end in another. Each
//! paragraph is cut into segments at tabs, line breaks and nested paragraphs;
//! inside a segment a marker is matched on the joined text and only the runs it
//! actually covers are touched. The value goes into the run holding the `{`,
//! the text after the `}` stays in its own run.

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// One `w:t` text event inside a paragraph: (index of its `<w:t>` start, index of the text).
type TextSlot = (usize, usize);

/// Elements that separate the text of a paragraph.
const BOUNDARIES: &[&[u8]] = &[b"w:tab", b"w:ptab", b"w:br", b"w:cr"];

/// Text slots of one `w:p`, grouped into runs of uninterrupted text.
#[derive(Debug, Default)]
struct Paragraph {
    segments: Vec<Vec<TextSlot>>,
}

impl Paragraph {
    fn push(&mut self, slot: TextSlot) {
        match self.segments.last_mut() {
            Some(segment) => segment.push(slot),
            None => self.segments.push(vec![slot]),
        }
    }

    fn boundary(&mut self) {
        if self.segments.last().is_some_and(|s| !s.is_empty()) {
            self.segments.push(Vec::new());
        }
    }
}

fn is_boundary(e: &BytesStart<'_>) -> bool {
    BOUNDARIES.contains(&e.name().as_ref())
}

/// Substitute `markers` (`("{key}", value)` pairs) in every paragraph of `xml`.
///
/// Returns `None` when nothing in the part changed, so callers can keep the
/// original bytes untouched.
pub fn substitute_part(xml: &[u8], markers: &[(String, String)]) -> Result<Option<Vec<u8>>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);

    let mut buf = Vec::new();
    let mut events: Vec<Event<'static>> = Vec::new();
    // open paragraphs, innermost last (text boxes nest paragraphs inside runs)
    let mut paragraphs: Vec<Paragraph> = Vec::new();
    let mut open_t: Option<usize> = None;
    let mut changed = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .with_context(|| format!("malformed XML near byte {}", reader.buffer_position()))?;

        match &event {
            Event::Eof => break,
            Event::Start(e) if e.name().as_ref() == b"w:p" => {
                if let Some(outer) = paragraphs.last_mut() {
                    outer.boundary();
                }
                paragraphs.push(Paragraph::default());
            }
            Event::Start(e) if e.name().as_ref() == b"w:t" => open_t = Some(events.len()),
            Event::End(e) if e.name().as_ref() == b"w:t" => open_t = None,
            Event::Start(e) | Event::Empty(e) if is_boundary(e) => {
                if let Some(paragraph) = paragraphs.last_mut() {
                    paragraph.boundary();
                }
            }
            Event::Text(_) => {
                if let (Some(start), Some(paragraph)) = (open_t, paragraphs.last_mut()) {
                    paragraph.push((start, events.len()));
                }
            }
            Event::End(e) if e.name().as_ref() == b"w:p" => {
                if let Some(paragraph) = paragraphs.pop() {
                    changed |= rewrite_paragraph(&mut events, &paragraph, markers)?;
                }
                if let Some(outer) = paragraphs.last_mut() {
                    outer.boundary();
                }
            }
            _ => {}
        }

        events.push(event.into_owned());
        buf.clear();
    }

    if !changed {
        return Ok(None);
    }

    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    for event in events {
        writer.write_event(event)?;
    }
    Ok(Some(writer.into_inner()))
}

/// Returns whether any text of the paragraph changed.
fn rewrite_paragraph(
    events: &mut [Event<'static>],
    paragraph: &Paragraph,
    markers: &[(String, String)],
) -> Result<bool> {
    let mut changed = false;
    for segment in &paragraph.segments {
        let mut texts = Vec::with_capacity(segment.len());
        for &(_, idx) in segment {
            match &events[idx] {
                Event::Text(t) => texts.push(t.unescape()?.into_owned()),
                _ => texts.push(String::new()),
            }
        }
        if !texts.iter().any(|t| t.contains('{')) {
            continue;
        }

        let before = texts.clone();
        if !substitute_segment(&mut texts, markers) {
            continue;
        }
        changed = true;

        for ((&(start, idx), old), new) in segment.iter().zip(&before).zip(&texts) {
            if old == new {
                continue;
            }
            events[idx] = Event::Text(BytesText::new(new).into_owned());
            if !new.is_empty() {
                preserve_space(&mut events[start]);
            }
        }
    }
    Ok(changed)
}

/// Replace every marker in the joined text of `texts`, editing only the
/// pieces a match covers. Inserted values are not searched again.
fn substitute_segment(texts: &mut [String], markers: &[(String, String)]) -> bool {
    let mut changed = false;
    let mut from = 0;
    loop {
        let joined = texts.concat();
        let hit = markers
            .iter()
            .filter_map(|(marker, value)| {
                joined[from..]
                    .find(marker.as_str())
                    .map(|pos| (from + pos, marker.len(), value))
            })
            .min_by_key(|(pos, _, _)| *pos);
        let Some((start, len, value)) = hit else {
            break;
        };

        // markers begin with `{` and end with `}`, so both offsets sit on char boundaries
        let (Some((first, first_off)), Some((last, last_off))) =
            (locate(texts, start), locate(texts, start + len - 1))
        else {
            break;
        };
        if first == last {
            texts[first].replace_range(first_off..=last_off, value);
        } else {
            texts[first].truncate(first_off);
            texts[first].push_str(value);
            for t in &mut texts[first + 1..last] {
                t.clear();
            }
            texts[last].replace_range(..=last_off, "");
        }

        from = start + value.len();
        changed = true;
    }
    changed
}

/// (piece index, byte offset within it) of byte `pos` of the joined text.
fn locate(texts: &[String], pos: usize) -> Option<(usize, usize)> {
    let mut acc = 0;
    for (i, t) in texts.iter().enumerate() {
        if pos < acc + t.len() {
            return Some((i, pos - acc));
        }
        acc += t.len();
    }
    None
}

/// Keep leading/trailing spaces of substituted values.
fn preserve_space(event: &mut Event<'static>) {
    if let Event::Start(start) = event {
        let preserved = start
            .attributes()
            .flatten()
            .any(|a| a.key.as_ref() == b"xml:space");
        if !preserved {
            start.push_attribute(("xml:space", "preserve"));
        }
    }
}
