//! Turns raw message text into lines of plain and link segments.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One run of text inside a rendered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Text(String),
    /// An `http://` or `https://` run that the front end should make activatable.
    Link(String),
}

impl Segment {
    pub fn as_str(&self) -> &str {
        match self {
            Segment::Text(text) | Segment::Link(text) => text,
        }
    }
}

/// Message text split into lines, each a sequence of segments.
///
/// Joining every segment of a line and the lines with `'\n'` yields the
/// original input byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderedText {
    lines: Vec<Vec<Segment>>,
}

impl RenderedText {
    pub fn lines(&self) -> &[Vec<Segment>] {
        &self.lines
    }

    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().flatten().filter_map(|segment| match segment {
            Segment::Link(url) => Some(url.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.is_empty())
    }

    /// Reassemble the source text.
    pub fn to_plain(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.iter().map(Segment::as_str).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| Regex::new(r"https?://\S+").expect("url regex should compile"))
}

/// Render `text` into lines, marking URL-shaped runs as links.
pub fn render(text: &str) -> RenderedText {
    let lines = text.split('\n').map(render_line).collect();
    RenderedText { lines }
}

fn render_line(line: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for found in url_regex().find_iter(line) {
        if found.start() > last {
            segments.push(Segment::Text(line[last..found.start()].to_string()));
        }
        segments.push(Segment::Link(found.as_str().to_string()));
        last = found.end();
    }

    if last < line.len() {
        segments.push(Segment::Text(line[last..].to_string()));
    }

    segments
}
