//! HTML to plain-text extraction.
//!
//! Pages are parsed into a tree, non-content elements are detached by tag name,
//! and the remaining text nodes are joined and whitespace-collapsed.
//!
//! `scraper::Html` is not `Send`, so everything here is synchronous and returns
//! owned data; callers never hold a parse tree across an `.await`.

use std::sync::LazyLock;

use dossier_shared::clean_text;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Elements removed before text extraction on every page.
pub const CHROME_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe",
];

/// Removal list for third-party pages, which also carry ad containers.
pub const EXTERNAL_CHROME_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "ads",
];

/// Which part of the page the text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextScope {
    /// All text in `<body>`.
    WholePage,
    /// The first article/main/content container, falling back to the whole page.
    PreferMainContent,
}

/// Everything a gathering stage needs from one HTML document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    /// `<title>` text.
    pub title: Option<String>,
    /// `<meta name="description">` content.
    pub meta_description: Option<String>,
    /// Plain text after chrome removal.
    pub text: String,
    /// Absolute http(s) anchor targets, fragments removed, in document order.
    pub links: Vec<Url>,
}

/// Parse `html` and extract title, description, links and text.
///
/// Links are collected before chrome removal so navigation menus still feed
/// the crawl frontier.
pub fn extract_page(html: &str, base_url: &Url, strip: &[&str], scope: TextScope) -> ExtractedPage {
    let mut doc = Html::parse_document(html);

    let title = extract_title(&doc);
    let meta_description = extract_meta_description(&doc);
    let links = extract_links(&doc, base_url);

    strip_elements(&mut doc, strip);

    let text = match scope {
        TextScope::WholePage => page_text(&doc),
        TextScope::PreferMainContent => main_content_text(&doc).unwrap_or_else(|| page_text(&doc)),
    };

    ExtractedPage {
        title,
        meta_description,
        text,
        links,
    }
}

/// Detach every element whose tag name is in `tags`. Returns the number removed.
pub fn strip_elements(doc: &mut Html, tags: &[&str]) -> usize {
    if tags.is_empty() {
        return 0;
    }
    let Ok(selector) = Selector::parse(&tags.join(", ")) else {
        return 0;
    };

    let ids: Vec<_> = doc.select(&selector).map(|el| el.id()).collect();
    for id in &ids {
        if let Some(mut node) = doc.tree.get_mut(*id) {
            node.detach();
        }
    }
    ids.len()
}

/// Whitespace-collapsed text of `<body>` (or the whole document if there is none).
pub fn page_text(doc: &Html) -> String {
    static BODY_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("body").expect("valid selector"));

    let root = doc
        .select(&BODY_SEL)
        .next()
        .unwrap_or_else(|| doc.root_element());
    element_text(root)
}

/// Text of the main content container, if the page has one with any text.
///
/// Lookup order: `<article>`, `<main>`, then the first element with a class
/// containing `article`, `content` or `post`.
pub fn main_content_text(doc: &Html) -> Option<String> {
    static ARTICLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("article").expect("valid selector"));
    static MAIN_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("main").expect("valid selector"));
    static CLASSED_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("[class]").expect("valid selector"));
    static CONTENT_CLASS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"article|content|post").expect("valid regex"));

    let container = doc
        .select(&ARTICLE_SEL)
        .next()
        .or_else(|| doc.select(&MAIN_SEL).next())
        .or_else(|| {
            doc.select(&CLASSED_SEL)
                .find(|el| el.value().classes().any(|c| CONTENT_CLASS_RE.is_match(c)))
        })?;

    let text = element_text(container);
    (!text.is_empty()).then_some(text)
}

fn element_text(el: ElementRef<'_>) -> String {
    let joined = el.text().collect::<Vec<_>>().join(" ");
    clean_text(&joined)
}

fn extract_title(doc: &Html) -> Option<String> {
    static TITLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("title").expect("valid selector"));

    doc.select(&TITLE_SEL)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

fn extract_meta_description(doc: &Html) -> Option<String> {
    static META_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("meta[name][content]").expect("valid selector"));

    doc.select(&META_SEL)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.eq_ignore_ascii_case("description"))
        })
        .and_then(|el| el.value().attr("content"))
        .map(clean_text)
        .filter(|d| !d.is_empty())
}

/// Extract all http(s) links from a document, resolved against the base URL.
fn extract_links(doc: &Html, base_url: &Url) -> Vec<Url> {
    static LINK_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

    let mut links = Vec::new();

    for el in doc.select(&LINK_SEL) {
        let Some(href) = el.value().attr("href").map(str::trim) else {
            continue;
        };

        // Skip anchors, javascript:, mailto:, tel:
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        if let Ok(mut resolved) = base_url.join(href) {
            if resolved.scheme() != "http" && resolved.scheme() != "https" {
                continue;
            }
            resolved.set_fragment(None);
            links.push(resolved);
        }
    }

    links
}
