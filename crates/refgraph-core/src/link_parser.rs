
use crate::page_name::{clean_name, split_attachment_name};
use regex::Regex;
use std::sync::LazyLock;

// Compile regex once, reuse across calls
static CAMEL_CASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\p{Lu}+\p{Ll}+\p{Lu}+[\p{L}\p{Nd}]*").unwrap()
});

static INTERWIKI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]+:").unwrap()
});

/// One piece of page text, in source order. Concatenating the `as_str()` of
/// every segment reproduces the input exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Ordinary text between links.
    Text(&'a str),
    /// Literal text the author does not want treated as a link: `~[...]`,
    /// `[[...]`, `[{...}]` and `{{{ ... }}}` blocks.
    Escaped(&'a str),
    Link(LinkOccurrence<'a>),
}

impl<'a> Segment<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Segment::Text(s) | Segment::Escaped(s) => s,
            Segment::Link(occ) => occ.raw,
        }
    }
}

/// A bracketed link: `[text]`, `[text|link]` or `[text|link|attributes]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOccurrence<'a> {
    /// The whole occurrence including brackets.
    pub raw: &'a str,
    /// Byte offset of the opening bracket in the source.
    pub start: usize,
    /// Display text (first field).
    pub text: &'a str,
    /// Second field, `None` when the occurrence has no `|`.
    pub link: Option<&'a str>,
    /// Third field, e.g. `target='_new'`.
    pub attributes: Option<&'a str>,
}

impl<'a> LinkOccurrence<'a> {
    fn parse(source: &'a str, start: usize, close: usize) -> Option<Self> {
        let body = &source[start + 1..close];
        let mut fields = body.split('|');
        let text = fields.next().unwrap_or_default();
        let link = fields.next();
        let attributes = fields.next();
        if fields.next().is_some() {
            return None;
        }
        Some(LinkOccurrence {
            raw: &source[start..=close],
            start,
            text,
            link,
            attributes,
        })
    }

    /// True when the display text doubles as the target: `[Foo]` or `[Foo|]`.
    pub fn is_implicit(&self) -> bool {
        self.link.map_or(true, str::is_empty)
    }

    /// The field naming the referenced page, as written. `[Foo|]` has an
    /// explicit but empty target and therefore references nothing.
    pub fn reference(&self) -> &'a str {
        match self.link {
            Some(link) => link,
            None => self.text,
        }
    }
}

/// Split page text into text, escaped and link segments.
pub fn tokenize(source: &str) -> Vec<Segment<'_>> {
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    // Only ASCII markers are inspected, so every index below is a char boundary.
    while i < bytes.len() {
        let literal_end = match bytes[i] {
            b'{' if source[i..].starts_with("{{{") => Some(
                source[i + 3..]
                    .find("}}}")
                    .map(|p| i + 3 + p + 3)
                    .unwrap_or(bytes.len()),
            ),
            b'~' if bytes.get(i + 1) == Some(&b'[') => find_close(source, i + 1).map(|c| c + 1),
            b'[' if matches!(bytes.get(i + 1), Some(b'[') | Some(b'{')) => {
                find_close(source, i + 1).map(|c| c + 1)
            }
            _ => None,
        };

        if let Some(end) = literal_end {
            if text_start < i {
                segments.push(Segment::Text(&source[text_start..i]));
            }
            segments.push(Segment::Escaped(&source[i..end]));
            i = end;
            text_start = end;
            continue;
        }

        if bytes[i] == b'[' {
            // A stray `[` before a real link stays text; the scan resumes at the inner one.
            let close = find_close(source, i).filter(|&c| !source[i + 1..c].contains('['));
            if let Some(occ) = close.and_then(|c| LinkOccurrence::parse(source, i, c)) {
                if text_start < i {
                    segments.push(Segment::Text(&source[text_start..i]));
                }
                i += occ.raw.len();
                text_start = i;
                segments.push(Segment::Link(occ));
                continue;
            }
        }

        i += 1;
    }

    if text_start < bytes.len() {
        segments.push(Segment::Text(&source[text_start..]));
    }
    segments
}

/// Byte offset of the first `]` after the `[` at `open`.
fn find_close(source: &str, open: usize) -> Option<usize> {
    source[open + 1..].find(']').map(|p| open + 1 + p)
}

/// Byte ranges of bare CamelCase words in a text segment that act as links.
///
/// A word counts when it is not glued to a preceding letter, digit or `~`,
/// is not inside an unclosed `[`, and is not part of a URL.
pub fn camel_case_links(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    CAMEL_CASE_RE.find_iter(text).filter_map(move |m| {
        let before = &text[..m.start()];
        if let Some(prev) = before.chars().next_back() {
            if prev.is_alphanumeric() || prev == '~' {
                return None;
            }
        }
        if before.rfind(']') < before.rfind('[') {
            return None;
        }
        let token_start = before
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(p, c)| p + c.len_utf8())
            .unwrap_or(0);
        let token_end = text[m.end()..]
            .find(char::is_whitespace)
            .map(|p| m.end() + p)
            .unwrap_or(text.len());
        if is_external(&text[token_start..token_end]) {
            return None;
        }
        Some((m.start(), m.end()))
    })
}

fn is_external(target: &str) -> bool {
    target.contains("://") || target.starts_with("mailto:")
}

/// Normalize a link target into the page (or attachment) name it references.
/// Returns `None` for targets that are not page references.
fn page_reference(target: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty()
        || target.starts_with('#')
        || target.chars().all(|c| c.is_ascii_digit())
        || is_external(target)
        || INTERWIKI_RE.is_match(target)
    {
        return None;
    }

    let target = target.split('#').next().unwrap_or_default();
    let name = match split_attachment_name(target) {
        Some((parent, file)) => {
            let parent = clean_name(parent);
            if parent.is_empty() {
                return None;
            }
            format!("{}/{}", parent, file.trim())
        }
        None => clean_name(target),
    };
    (!name.is_empty()).then_some(name)
}

/// Extract referenced page names from page text, in order of appearance.
/// Duplicates are kept. Bare CamelCase words count only when
/// `camel_case_links` is set.
pub fn extract_page_links(text: &str, camel_case_links_enabled: bool) -> Vec<String> {
    let mut names = Vec::new();
    for segment in tokenize(text) {
        match segment {
            Segment::Link(occ) => {
                if let Some(name) = page_reference(occ.reference()) {
                    names.push(name);
                }
            }
            Segment::Text(t) if camel_case_links_enabled => {
                names.extend(camel_case_links(t).map(|(s, e)| t[s..e].to_string()));
            }
            _ => {}
        }
    }
    names
}

/// Produces the names a page refers to. Called after every save.
pub trait LinkExtractor: Send + Sync {
    fn scan(&self, page: &str, text: &str) -> Vec<String>;
}

/// Extractor for the bracket link syntax understood by [`tokenize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WikiLinkExtractor {
    camel_case_links: bool,
}

impl WikiLinkExtractor {
    pub fn new(camel_case_links: bool) -> Self {
        Self { camel_case_links }
    }
}

impl LinkExtractor for WikiLinkExtractor {
    fn scan(&self, page: &str, text: &str) -> Vec<String> {
        let names = extract_page_links(text, self.camel_case_links);
        tracing::debug!("Page {}: content length={}, links={:?}", page, text.len(), names);
        names
    }
}
