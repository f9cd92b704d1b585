//! Lightweight markdown for assistant replies
//!
//! A small line-oriented block parser plus a recursive inline parser over a
//! fixed grammar: `#`..`###` headings, `**strong**`/`__strong__`,
//! `*em*`/`_em_`, fenced and inline code, `[label](url)` links and bullet or
//! numbered list items. Anything that doesn't match is kept as text, so
//! parsing never fails.
//!
//! [`render_html`] emits a restricted HTML subset with all text escaped.
//! Hosts that don't speak HTML can walk the [`Block`] tree from [`parse`].

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    /// Consecutive text lines
    Paragraph(Vec<Vec<Inline>>),
    CodeBlock { language: Option<String>, code: String },
    /// Contiguous bullet or numbered items
    List(Vec<Vec<Inline>>),
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Code(String),
    Link { label: Vec<Inline>, url: String },
}

const FENCE: &str = "```";

pub fn parse(text: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));

    while let Some(line) = lines.next() {
        if let Some(info) = line.trim_start().strip_prefix(FENCE) {
            // ```code``` on a single line
            if let Some(end) = info.find(FENCE) {
                blocks.push(Block::CodeBlock {
                    language: None,
                    code: info[..end].to_string(),
                });
                continue;
            }
            let language = Some(info.trim().to_string()).filter(|l| !l.is_empty());
            let mut code_lines = Vec::new();
            // An unterminated fence runs to the end of the text
            for inner in lines.by_ref() {
                if inner.trim_start().starts_with(FENCE) {
                    break;
                }
                code_lines.push(inner);
            }
            blocks.push(Block::CodeBlock {
                language,
                code: code_lines.join("\n"),
            });
            continue;
        }

        if let Some((level, rest)) = heading(line) {
            blocks.push(Block::Heading {
                level,
                content: parse_inlines(rest.trim_end()),
            });
            continue;
        }

        if let Some(item) = list_item(line) {
            let item = parse_inlines(item);
            match blocks.last_mut() {
                Some(Block::List(items)) => items.push(item),
                _ => blocks.push(Block::List(vec![item])),
            }
            continue;
        }

        if line.trim().is_empty() {
            blocks.push(Block::Blank);
            continue;
        }

        let inlines = parse_inlines(line);
        match blocks.last_mut() {
            Some(Block::Paragraph(para)) => para.push(inlines),
            _ => blocks.push(Block::Paragraph(vec![inlines])),
        }
    }

    blocks
}

/// `#`, `##` or `###` followed by a space.
fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if !(1..=3).contains(&level) {
        return None;
    }
    line[level..].strip_prefix(' ').map(|rest| (level as u8, rest))
}

/// `* item`, `- item` or `12. item`, optionally indented.
fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let after_marker = if let Some(rest) = trimmed.strip_prefix(['*', '-']) {
        rest
    } else {
        let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        trimmed[digits..].strip_prefix('.')?
    };
    after_marker.strip_prefix([' ', '\t'])
}

pub fn parse_inlines(text: &str) -> Vec<Inline> {
    let chars: Vec<char> = text.chars().collect();
    parse_span(&chars)
}

fn parse_span(chars: &[char]) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        let parsed = match chars[i] {
            '`' => code_span(chars, i),
            '*' | '_' => emphasis(chars, i),
            '[' => link(chars, i),
            _ => None,
        };
        match parsed {
            Some((inline, next)) => {
                if !text.is_empty() {
                    out.push(Inline::Text(std::mem::take(&mut text)));
                }
                out.push(inline);
                i = next;
            }
            None => {
                text.push(chars[i]);
                i += 1;
            }
        }
    }

    if !text.is_empty() {
        out.push(Inline::Text(text));
    }
    out
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

fn code_span(chars: &[char], start: usize) -> Option<(Inline, usize)> {
    let end = (start + 1..chars.len()).find(|&k| chars[k] == '`')?;
    if end == start + 1 {
        return None;
    }
    Some((Inline::Code(collect(&chars[start + 1..end])), end + 1))
}

fn emphasis(chars: &[char], start: usize) -> Option<(Inline, usize)> {
    let delim = chars[start];
    // `snake_case` identifiers are not emphasis
    if delim == '_' && start > 0 && chars[start - 1].is_alphanumeric() {
        return None;
    }

    if chars.get(start + 1) == Some(&delim) {
        let end = find_closer(chars, start + 2, delim, true)?;
        return Some((Inline::Strong(parse_span(&chars[start + 2..end])), end + 2));
    }

    let end = find_closer(chars, start + 1, delim, false)?;
    Some((Inline::Emphasis(parse_span(&chars[start + 1..end])), end + 1))
}

/// Index of the closing delimiter for content starting at `from`. Content
/// must be non-empty and may not start or end with whitespace.
fn find_closer(chars: &[char], from: usize, delim: char, double: bool) -> Option<usize> {
    if chars.get(from).map_or(true, |c| c.is_whitespace() || *c == delim) {
        return None;
    }
    let width = if double { 2 } else { 1 };
    let closes_word = |after: usize| {
        delim != '_' || chars.get(after).map_or(true, |c| !c.is_alphanumeric())
    };

    let mut k = from + 1;
    while k < chars.len() {
        let c = chars[k];
        if c == '`' {
            // skip over code spans so their contents can't close emphasis
            if let Some((_, next)) = code_span(chars, k) {
                k = next;
                continue;
            }
        }
        if c == delim {
            let is_double = chars.get(k + 1) == Some(&delim);
            if is_double != double {
                k += if is_double { 2 } else { 1 };
                continue;
            }
            if !chars[k - 1].is_whitespace() && closes_word(k + width) {
                return Some(k);
            }
            k += width;
            continue;
        }
        k += 1;
    }
    None
}

fn link(chars: &[char], start: usize) -> Option<(Inline, usize)> {
    let label_end = (start + 1..chars.len()).find(|&k| chars[k] == ']')?;
    if label_end == start + 1 || chars.get(label_end + 1) != Some(&'(') {
        return None;
    }
    let url_start = label_end + 2;
    let url_end = (url_start..chars.len()).find(|&k| chars[k] == ')')?;
    let url = collect(&chars[url_start..url_end]).trim().to_string();
    if url.is_empty() {
        return None;
    }
    Some((
        Inline::Link {
            label: parse_span(&chars[start + 1..label_end]),
            url,
        },
        url_end + 1,
    ))
}

/// Parse `text` and render it as restricted HTML.
pub fn render_html(text: &str) -> String {
    blocks_to_html(&parse(text))
}

pub fn blocks_to_html(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(block_to_html)
        .collect::<Vec<_>>()
        .join("<br>")
}

fn block_to_html(block: &Block) -> String {
    match block {
        Block::Heading { level, content } => {
            format!("<h{level}>{}</h{level}>", inlines_to_html(content))
        }
        Block::Paragraph(lines) => lines
            .iter()
            .map(|line| inlines_to_html(line))
            .collect::<Vec<_>>()
            .join("<br>"),
        Block::CodeBlock { language, code } => match language {
            Some(lang) => format!(
                "<pre><code class=\"language-{}\">{}</code></pre>",
                escape(lang),
                escape(code)
            ),
            None => format!("<pre><code>{}</code></pre>", escape(code)),
        },
        Block::List(items) => {
            let mut html = String::from("<ul>");
            for item in items {
                html.push_str("<li>");
                html.push_str(&inlines_to_html(item));
                html.push_str("</li>");
            }
            html.push_str("</ul>");
            html
        }
        Block::Blank => String::new(),
    }
}

fn inlines_to_html(inlines: &[Inline]) -> String {
    let mut html = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => html.push_str(&escape(text)),
            Inline::Strong(inner) => {
                html.push_str("<strong>");
                html.push_str(&inlines_to_html(inner));
                html.push_str("</strong>");
            }
            Inline::Emphasis(inner) => {
                html.push_str("<em>");
                html.push_str(&inlines_to_html(inner));
                html.push_str("</em>");
            }
            Inline::Code(code) => {
                html.push_str("<code>");
                html.push_str(&escape(code));
                html.push_str("</code>");
            }
            Inline::Link { label, url } if is_safe_url(url) => {
                html.push_str(&format!(
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                    escape(url),
                    inlines_to_html(label)
                ));
            }
            Inline::Link { label, .. } => html.push_str(&inlines_to_html(label)),
        }
    }
    html
}

pub fn is_safe_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    !["javascript:", "data:", "vbscript:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
