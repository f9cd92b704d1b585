//! The host page: a course chapter wrapped to the pane width, with
//! mouse-driven text selection.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// One display row of the wrapped chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLine {
    pub text: String,
    /// Row continues the previous source line (soft wrap)
    pub continuation: bool,
    pub heading: bool,
}

/// Position on the wrapped page, in display rows and characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TextPoint {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSelection {
    pub anchor: TextPoint,
    pub head: TextPoint,
}

impl PageSelection {
    pub fn at(point: TextPoint) -> Self {
        Self {
            anchor: point,
            head: point,
        }
    }

    /// Ordered endpoints, both inclusive.
    pub fn bounds(&self) -> (TextPoint, TextPoint) {
        if self.anchor <= self.head {
            (self.anchor, self.head)
        } else {
            (self.head, self.anchor)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Character range of `line` covered by this selection, end exclusive.
    pub fn columns_on(&self, line: usize, line_len: usize) -> Option<(usize, usize)> {
        if self.is_empty() {
            return None;
        }
        let (start, end) = self.bounds();
        if line < start.line || line > end.line {
            return None;
        }
        let from = if line == start.line { start.col } else { 0 };
        let to = if line == end.line { end.col + 1 } else { line_len };
        let (from, to) = (from.min(line_len), to.min(line_len));
        (from < to).then_some((from, to))
    }
}

pub struct Page {
    pub title: String,
    source: String,
    lines: Vec<PageLine>,
    wrap_width: usize,
}

impl Page {
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading chapter {}", path.display()))?;
        let fallback = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Chapter".to_string());
        Ok(Self::from_text(&fallback, source))
    }

    /// Build a page; the first `#` heading becomes the title when present.
    pub fn from_text(fallback_title: &str, source: String) -> Self {
        let title = source
            .lines()
            .find_map(|l| l.strip_prefix("# "))
            .map(|t| t.trim().to_string())
            .unwrap_or_else(|| fallback_title.to_string());

        let mut page = Self {
            title,
            source,
            lines: Vec::new(),
            wrap_width: 0,
        };
        page.rewrap(80);
        page
    }

    pub fn lines(&self) -> &[PageLine] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Re-wrap for a new pane width. Returns `true` if the layout changed.
    pub fn rewrap(&mut self, width: usize) -> bool {
        let width = width.max(10);
        if width == self.wrap_width {
            return false;
        }
        self.wrap_width = width;
        self.lines.clear();

        for source_line in self.source.lines() {
            let heading = source_line.starts_with('#');
            for (i, text) in wrap_text_to_width(source_line, width).into_iter().enumerate() {
                self.lines.push(PageLine {
                    text,
                    continuation: i > 0,
                    heading,
                });
            }
        }
        true
    }

    /// Clamp a screen-derived point onto existing text.
    pub fn clamp_point(&self, point: TextPoint) -> TextPoint {
        let Some(last) = self.lines.len().checked_sub(1) else {
            return TextPoint { line: 0, col: 0 };
        };
        let line = point.line.min(last);
        let len = self.lines[line].text.chars().count();
        TextPoint {
            line,
            col: point.col.min(len.saturating_sub(1)),
        }
    }

    /// Text covered by `selection`. Soft-wrapped rows are joined with a
    /// space, separate source lines with a newline.
    pub fn selected_text(&self, selection: &PageSelection) -> String {
        let mut out = String::new();
        let (start, end) = selection.bounds();

        for idx in start.line..=end.line.min(self.lines.len().saturating_sub(1)) {
            let Some(line) = self.lines.get(idx) else { break };
            let len = line.text.chars().count();
            let Some((from, to)) = selection.columns_on(idx, len) else {
                continue;
            };
            if idx > start.line {
                out.push(if line.continuation { ' ' } else { '\n' });
            }
            out.extend(line.text.chars().skip(from).take(to - from));
        }
        out
    }
}

/// Wrap text to fit within a given width, breaking at word boundaries.
pub fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len == 0 {
            current_line = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
            current_len = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
