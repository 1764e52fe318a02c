//! Document sectioning.
//!
//! Splits a document into typed [`Section`]s. Structured scholarly markup
//! (JATS) maps onto section codes; body text outside any recognised section
//! is kept under the whole-document code, and anything else becomes a single
//! whole-document section. Sectioning never fails: markup that does not pass
//! the tag-balance check degrades to tag-stripped whole-document text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, warn};

use docscope_core::{Error, Result, Section, SectionCode};

use crate::normalize_whitespace;

static MARKUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[A-Za-z!?/][^<>]*>").expect("valid regex"));

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>|<![^>]*>|<\?.*?\?>|<(/?)([A-Za-z][A-Za-z0-9:._-]*)([^<>]*?)(/?)>",
    )
    .expect("valid regex")
});

static SELF_CLOSING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z][A-Za-z0-9:._-]*)(\s[^<>]*?)?\s*/>").expect("valid regex")
});

static RAW_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>").expect("valid regex")
});

/// `<body>` is renamed before parsing; the HTML parser folds a second
/// `<body>` into the implied one and loses the JATS body boundary.
static BODY_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)body\b").expect("valid regex"));

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z]+);").expect("valid regex")
});

static ARTICLE_TITLE_SEL: Lazy<Selector> = Lazy::new(|| sel("title-group article-title"));
static CONTRIB_SEL: Lazy<Selector> = Lazy::new(|| sel("contrib"));
static AFF_SEL: Lazy<Selector> = Lazy::new(|| sel("aff"));
static KWD_SEL: Lazy<Selector> = Lazy::new(|| sel("kwd-group kwd"));
static ABSTRACT_SEL: Lazy<Selector> = Lazy::new(|| sel("abstract"));
static SEC_SEL: Lazy<Selector> = Lazy::new(|| sel("sec"));
static BODY_SEL: Lazy<Selector> = Lazy::new(|| sel("jats-body"));
static ACK_SEL: Lazy<Selector> = Lazy::new(|| sel("ack"));
static FIG_SEL: Lazy<Selector> = Lazy::new(|| sel("fig"));
static TABLE_WRAP_SEL: Lazy<Selector> = Lazy::new(|| sel("table-wrap"));

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("valid selector")
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose end tag HTML lets authors omit.
const OPTIONAL_END_ELEMENTS: &[&str] = &[
    "p", "li", "dt", "dd", "tr", "td", "th", "thead", "tbody", "tfoot", "option", "optgroup",
    "colgroup", "caption", "rt", "rp", "html", "head", "body",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Floats kept out of their enclosing section's text.
const FLOAT_ELEMENTS: &[&str] = &["fig", "fig-group", "table-wrap", "table-wrap-group"];

/// Elements that run into the surrounding text without a separator.
const INLINE_ELEMENTS: &[&str] = &[
    "italic", "bold", "sup", "sub", "sc", "underline", "monospace", "xref", "ext-link",
    "named-content", "styled-content", "inline-formula", "b", "i", "em", "strong", "span",
    "a", "u", "small", "code", "abbr",
];

/// A body `sec` nested under one of these is not a top-level body section.
const NON_BODY_ANCESTORS: &[&str] = &["sec", "abstract", "back", "front", "ack"];

/// Body children captured by their own selectors, not as loose body text.
const CAPTURED_BLOCKS: &[&str] = &["sec", "abstract", "ack"];

/// Keyword → code, checked in order against `sec-type` and then the title.
const SEC_KEYWORDS: &[(&str, SectionCode)] = &[
    ("intro", SectionCode::Introduction),
    ("background", SectionCode::Introduction),
    ("method", SectionCode::Methods),
    ("material", SectionCode::Methods),
    ("result", SectionCode::Results),
    ("discuss", SectionCode::Discussion),
    ("conclu", SectionCode::Conclusion),
    ("ethic", SectionCode::Ethics),
    ("acknowledg", SectionCode::Acknowledgments),
];

/// What the file extension says about the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentHint {
    Markup,
    PlainText,
    Unknown,
}

impl ContentHint {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "xml" | "html" | "htm" | "nxml" | "xhtml" => ContentHint::Markup,
            "txt" | "text" => ContentHint::PlainText,
            _ => ContentHint::Unknown,
        }
    }
}

/// Sections of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionedDocument {
    pub sections: Vec<Section>,
    /// Parse failure that forced whole-document fallback, if any.
    pub fallback: Option<String>,
}

impl SectionedDocument {
    fn whole(text: String, fallback: Option<String>) -> Self {
        Self {
            sections: vec![Section::whole_document(text)],
            fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn codes(&self) -> Vec<SectionCode> {
        self.sections.iter().map(|s| s.code).collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sectioner;

impl Sectioner {
    pub fn new() -> Self {
        Self
    }

    /// Split `content` into sections. Always yields at least one section.
    pub fn section(&self, content: &str, hint: ContentHint) -> SectionedDocument {
        let is_markup = match hint {
            ContentHint::PlainText => false,
            ContentHint::Markup | ContentHint::Unknown => MARKUP_RE.is_match(content),
        };
        if !is_markup {
            return SectionedDocument::whole(normalize_whitespace(content), None);
        }

        if let Err(e) = check_balance(content) {
            warn!(error = %e, "Markup failed balance check, sectioning as whole document");
            return SectionedDocument::whole(strip_tags(content), Some(e.to_string()));
        }

        let prepared = BODY_TAG_RE.replace_all(content, "<${1}jats-body");
        let document = Html::parse_document(&expand_self_closing(&prepared));
        let sections = jats_sections(&document);
        if sections.is_empty() {
            let text = normalize_whitespace(&element_text(document.root_element(), false));
            debug!("No structured sections recognised");
            return SectionedDocument::whole(text, None);
        }

        debug!(section_count = sections.len(), "Sectioned structured document");
        SectionedDocument {
            sections,
            fallback: None,
        }
    }
}

/// Verify that every opened element is closed in order.
///
/// Void elements, self-closing tags, comments, CDATA, doctype and
/// processing instructions are exempt. Elements with optional end tags are
/// closed implicitly by their parent's end tag.
pub fn check_balance(content: &str) -> Result<()> {
    let lowered = content.to_ascii_lowercase();
    let mut stack: Vec<String> = Vec::new();
    let mut pos = 0;

    while let Some(caps) = TAG_RE.captures_at(content, pos) {
        let whole = caps.get(0).map(|m| m.end()).unwrap_or(content.len());
        pos = whole;
        let Some(name) = caps.get(2) else {
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).map_or(false, |m| !m.as_str().is_empty());
        let self_closing = caps.get(4).map_or(false, |m| !m.as_str().is_empty());

        if closing {
            loop {
                match stack.last() {
                    Some(top) if *top == name => {
                        stack.pop();
                        break;
                    }
                    Some(top) if OPTIONAL_END_ELEMENTS.contains(&top.as_str()) => {
                        stack.pop();
                    }
                    Some(top) => {
                        return Err(Error::Parse(format!(
                            "unexpected </{}> while <{}> is open",
                            name, top
                        )));
                    }
                    None if VOID_ELEMENTS.contains(&name.as_str()) => break,
                    None => {
                        return Err(Error::Parse(format!(
                            "unexpected </{}> with no open element",
                            name
                        )));
                    }
                }
            }
        } else if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
            continue;
        } else if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            let close = format!("</{}", name);
            match lowered[pos..].find(&close) {
                Some(offset) => {
                    let after = pos + offset;
                    pos = lowered[after..]
                        .find('>')
                        .map(|gt| after + gt + 1)
                        .unwrap_or(content.len());
                }
                None => return Err(Error::Parse(format!("unclosed <{}>", name))),
            }
        } else {
            stack.push(name);
        }

        if pos >= content.len() {
            break;
        }
    }

    match stack
        .iter()
        .rev()
        .find(|name| !OPTIONAL_END_ELEMENTS.contains(&name.as_str()))
    {
        Some(name) => Err(Error::Parse(format!("unclosed <{}>", name))),
        None => Ok(()),
    }
}

/// Tag-stripped, entity-decoded, whitespace-collapsed text.
pub fn strip_tags(content: &str) -> String {
    let without_raw = RAW_BLOCK_RE.replace_all(content, " ");
    let without_tags = TAG_RE.replace_all(&without_raw, " ");
    normalize_whitespace(&decode_entities(&without_tags))
}

fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// `<xref rid="b1"/>` → `<xref rid="b1"></xref>`; the HTML parser ignores
/// the self-closing flag on non-void elements.
fn expand_self_closing(content: &str) -> String {
    SELF_CLOSING_RE
        .replace_all(content, |caps: &Captures<'_>| {
            let name = &caps[1];
            if VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
                return caps[0].to_string();
            }
            let attrs = caps.get(2).map_or("", |m| m.as_str());
            format!("<{}{}></{}>", name, attrs, name)
        })
        .into_owned()
}

fn jats_sections(document: &Html) -> Vec<Section> {
    let mut builder = SectionBuilder::default();

    if let Some(title) = document.select(&ARTICLE_TITLE_SEL).next() {
        builder.push(SectionCode::Title, element_text(title, true));
    }
    builder.push_all(SectionCode::Authors, document.select(&CONTRIB_SEL));
    builder.push_all(SectionCode::Affiliations, document.select(&AFF_SEL));
    builder.push_all(SectionCode::Keywords, document.select(&KWD_SEL));
    builder.push_all(SectionCode::Abstract, document.select(&ABSTRACT_SEL));

    for body in document.select(&BODY_SEL) {
        let mut text = String::new();
        collect_loose_text(body, &mut text);
        builder.push(SectionCode::WholeDocument, text);
    }

    for sec in document.select(&SEC_SEL).filter(|s| is_top_level_body_sec(*s)) {
        let code = classify_sec(sec).unwrap_or(SectionCode::WholeDocument);
        builder.push(code, element_text(sec, true));
    }

    builder.push_all(SectionCode::Acknowledgments, document.select(&ACK_SEL));
    builder.push_all(SectionCode::Figures, document.select(&FIG_SEL));
    builder.push_all(SectionCode::Tables, document.select(&TABLE_WRAP_SEL));

    let sections = builder.finish();
    // Without any typed section this is not JATS; the caller sections it whole.
    if sections.iter().all(|s| s.code == SectionCode::WholeDocument) {
        return Vec::new();
    }
    sections
}

/// Accumulates text per code, keeping the first-seen order of codes.
#[derive(Default)]
struct SectionBuilder {
    parts: Vec<(SectionCode, Vec<String>)>,
}

impl SectionBuilder {
    fn push(&mut self, code: SectionCode, raw: String) {
        let text = normalize_whitespace(&raw);
        if text.is_empty() {
            return;
        }
        match self.parts.iter_mut().find(|(c, _)| *c == code) {
            Some((_, texts)) => texts.push(text),
            None => self.parts.push((code, vec![text])),
        }
    }

    fn push_all<'a>(&mut self, code: SectionCode, elements: impl Iterator<Item = ElementRef<'a>>) {
        let skip_floats = !matches!(code, SectionCode::Figures | SectionCode::Tables);
        for element in elements {
            let mut text = String::new();
            collect_text(element, true, skip_floats, &mut text);
            self.push(code, text);
        }
    }

    fn finish(self) -> Vec<Section> {
        self.parts
            .into_iter()
            .map(|(code, texts)| Section::new(code, texts.join("; ")))
            .collect()
    }
}

fn is_top_level_body_sec(sec: ElementRef<'_>) -> bool {
    !sec.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| NON_BODY_ANCESTORS.contains(&a.value().name()))
}

fn classify_sec(sec: ElementRef<'_>) -> Option<SectionCode> {
    let lookup = |text: &str| {
        let text = text.to_lowercase();
        SEC_KEYWORDS
            .iter()
            .find(|(keyword, _)| text.contains(keyword))
            .map(|(_, code)| *code)
    };

    if let Some(code) = sec.value().attr("sec-type").and_then(lookup) {
        return Some(code);
    }
    sec.children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "title")
        .and_then(|title| lookup(&title.text().collect::<String>()))
}

/// Body text outside sections, floats and separately captured blocks.
fn collect_loose_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child.value().name();
                if CAPTURED_BLOCKS.contains(&name)
                    || FLOAT_ELEMENTS.contains(&name)
                    || RAW_TEXT_ELEMENTS.contains(&name)
                {
                    continue;
                }
                let block = !INLINE_ELEMENTS.contains(&name);
                if block {
                    out.push(' ');
                }
                collect_loose_text(child, out);
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Text of an element with floats excluded.
fn element_text(element: ElementRef<'_>, skip_heading: bool) -> String {
    let mut out = String::new();
    collect_text(element, skip_heading, true, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, skip_heading: bool, skip_floats: bool, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child.value().name();
                if RAW_TEXT_ELEMENTS.contains(&name)
                    || (skip_floats && FLOAT_ELEMENTS.contains(&name))
                    || (skip_heading && (name == "title" || name == "label"))
                {
                    continue;
                }
                let block = !INLINE_ELEMENTS.contains(&name);
                if block {
                    out.push(' ');
                }
                collect_text(child, false, skip_floats, out);
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}
