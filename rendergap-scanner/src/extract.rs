//! Text and link extraction from captured markup.

use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: [&str; 3] = ["script", "style", "template"];

/// Elements laid out on their own line. Their text is kept apart from the
/// text around them; inline elements join their neighbours directly.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "details", "dialog", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "td",
    "th", "tr", "ul",
];

/// Visible text of the document body with whitespace runs collapsed to a
/// single space and the ends trimmed. Empty when there is no body.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Some(body) = document.select(&BODY).next() else {
        return String::new();
    };

    let mut raw = String::new();
    collect_text(body, &mut raw);
    collapse_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()) => {}
            Node::Element(el) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = el.name() == "noscript" || BLOCK_ELEMENTS.contains(&el.name());
                if block {
                    out.push(' ');
                }
                if el.name() == "noscript" {
                    collect_noscript_text(child_el, out);
                } else {
                    collect_text(child_el, out);
                }
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

// The document parser runs with scripting on, so `noscript` holds its markup
// as raw text. Parse it again to get at the text a non-scripting reader sees.
fn collect_noscript_text(noscript: ElementRef<'_>, out: &mut String) {
    let markup: String = noscript.text().collect();
    let fragment = Html::parse_fragment(&markup);
    collect_text(fragment.root_element(), out);
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Every root-relative anchor (`href="/..."`) resolved against `base`,
/// deduplicated with first-seen order kept. Protocol-relative hrefs
/// (`//host/...`) point off-site and are skipped.
pub fn root_relative_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&ANCHORS) {
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        if !href.starts_with('/') || href.starts_with("//") {
            continue;
        }
        if let Ok(resolved) = base.join(href) {
            let absolute = resolved.to_string();
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    }

    links
}
