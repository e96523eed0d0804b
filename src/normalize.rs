//! HTML to text flattening
//!
//! Reduces a page to the readable text of its block, heading and list
//! elements, in document order, separated by blank lines. No attempt is made
//! to decide which part of the page describes the event.

use scraper::{ElementRef, Html, Selector};

/// Elements whose text is emitted as one line each
const CONTENT_SELECTOR: &str = "p, div, h1, h2, h3, h4, h5, h6, li";

/// Elements that never contribute text
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Separator between emitted lines
pub const LINE_SEPARATOR: &str = "\n\n";

/// Flattens raw HTML into an LLM-friendly text stream
///
/// # Rules
///
/// - `script`/`style` (and `noscript`/`template`) subtrees are ignored
/// - every `p`, `div`, `h1`-`h6` and `li` yields one line: its text
///   fragments, each trimmed, joined by a single space
/// - empty lines are dropped
/// - nested matches each produce their own line
///
/// # Example
///
/// ```
/// use linkcal::normalize::normalize;
///
/// let html = "<h1>Launch Party</h1><script>x()</script><p>Join us at HQ</p>";
/// assert_eq!(normalize(html), "Launch Party\n\nJoin us at HQ");
/// ```
pub fn normalize(raw_html: &str) -> String {
    let document = Html::parse_document(raw_html);
    let lines = extract_lines(&document);
    lines.join(LINE_SEPARATOR)
}

/// Extracts one trimmed line per content element
pub fn extract_lines(document: &Html) -> Vec<String> {
    let selector = match Selector::parse(CONTENT_SELECTOR) {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter(|element| !inside_skipped(element))
        .map(element_text)
        .filter(|line| !line.is_empty())
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut fragments = Vec::new();
    collect_fragments(element, &mut fragments);
    fragments.join(" ")
}

fn collect_fragments(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !is_skipped(child_element.value().name()) {
                collect_fragments(child_element, out);
            }
        }
    }
}

fn inside_skipped(element: &ElementRef<'_>) -> bool {
    element.ancestors().any(|ancestor| {
        ancestor
            .value()
            .as_element()
            .map_or(false, |e| is_skipped(e.name()))
    })
}

fn is_skipped(name: &str) -> bool {
    SKIPPED_ELEMENTS.contains(&name)
}
