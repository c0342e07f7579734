//! Flattened page text and heading-delimited blocks
//!
//! Product pages carry their facts as labelled lines rather than structured
//! markup, so extraction works on the visible text of the page with one
//! non-empty line per text fragment.

use regex::Regex;
use scraper::{Html, Node};

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text of the document, one trimmed non-empty line per line of text
pub fn visible_text(document: &Html) -> String {
    let mut lines: Vec<String> = Vec::new();

    for node in document.tree.nodes() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
            Node::Element(element) => HIDDEN_ELEMENTS.contains(&element.name()),
            _ => false,
        });
        if hidden {
            continue;
        }

        for line in text.split('\n') {
            let line = line.replace('\u{a0}', " ");
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
    }

    lines.join("\n")
}

/// Collapse every whitespace run to a single space and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text following `heading` up to the next heading-like line.
///
/// The heading must be followed by whitespace. The first line after it always
/// belongs to the block; a later line matching `heading_like` ends the block
/// unless it is the final line of the text.
pub fn heading_block(text: &str, heading: &str, heading_like: &Regex) -> Option<String> {
    let rest = text
        .match_indices(heading)
        .map(|(start, _)| &text[start + heading.len()..])
        .find(|rest| rest.starts_with(char::is_whitespace))?
        .trim_start();

    let lines: Vec<&str> = rest.split('\n').collect();
    let mut block: Vec<&str> = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let is_last = index + 1 == lines.len();
        if index > 0 && !is_last && heading_like.is_match(line) {
            break;
        }
        block.push(line);
    }

    let block = block.join("\n").trim().to_string();
    if block.is_empty() { None } else { Some(block) }
}

/// `key: value` lines of a block, split on the first colon.
///
/// Lines without a colon or with an empty side are skipped. A repeated key
/// keeps its first position and takes the later value.
pub fn key_value_lines(block: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();

    for line in block.lines() {
        let line = collapse_whitespace(line);
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        match pairs.iter_mut().find(|(existing, _)| existing == key) {
            Some(pair) => pair.1 = value.to_string(),
            None => pairs.push((key.to_string(), value.to_string())),
        }
    }

    pairs
}
