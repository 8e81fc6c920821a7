use anyhow::{Context, Result};
use regex::{Captures, Regex};

use super::text::normalize_whitespace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<'h> {
    pub attributes: &'h str,
    pub inner: &'h str,
}

// Single-pass regex scanning; no DOM is built and nesting is not tracked.
#[derive(Debug)]
pub struct HtmlScanner {
    table_body: Regex,
    table: Regex,
    heading: Regex,
    row: Regex,
    cell: Regex,
    anchor: Regex,
    anchor_open: Regex,
    attribute: Regex,
    span: Regex,
    tag: Regex,
    entity: Regex,
    script_or_style: Regex,
}

impl HtmlScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            table_body: Regex::new(r"(?is)<tbody\b[^>]*>(.*?)</tbody\s*>")
                .context("failed to compile table body regex")?,
            table: Regex::new(r"(?is)<table\b[^>]*>(.*?)</table\s*>")
                .context("failed to compile table regex")?,
            heading: Regex::new(r"(?is)<h[1-6]\b[^>]*>(.*?)</h[1-6]\s*>")
                .context("failed to compile heading regex")?,
            row: Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>")
                .context("failed to compile table row regex")?,
            cell: Regex::new(r"(?is)<td\b[^>]*>(.*?)</td\s*>")
                .context("failed to compile table cell regex")?,
            anchor: Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>")
                .context("failed to compile anchor regex")?,
            anchor_open: Regex::new(r"(?is)<a\b([^>]*)>")
                .context("failed to compile anchor open-tag regex")?,
            attribute: Regex::new(
                r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
            )
            .context("failed to compile attribute regex")?,
            span: Regex::new(r"(?is)<span\b([^>]*)>(.*?)</span\s*>")
                .context("failed to compile span regex")?,
            tag: Regex::new(r"<[^>]+>").context("failed to compile tag regex")?,
            entity: Regex::new(r"&(#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z]+);")
                .context("failed to compile entity regex")?,
            script_or_style: Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>")
                .context("failed to compile script/style regex")?,
        })
    }

    pub fn first_table_body<'h>(&self, html: &'h str) -> Option<&'h str> {
        self.table_body
            .captures(html)
            .and_then(|captures| captures.get(1))
            .map(|inner| inner.as_str())
    }

    // The table must come after the heading with no other heading in between.
    pub fn section_table_by_heading<'h>(&self, html: &'h str, heading_text: &str) -> Option<&'h str> {
        for heading in self.heading.captures_iter(html) {
            let (Some(whole), Some(inner)) = (heading.get(0), heading.get(1)) else {
                continue;
            };
            if !self.html_to_text(inner.as_str()).contains(heading_text) {
                continue;
            }

            let rest = &html[whole.end()..];
            let Some(table) = self.table.captures(rest) else {
                continue;
            };
            let (Some(table_match), Some(table_inner)) = (table.get(0), table.get(1)) else {
                continue;
            };
            let interrupted = self
                .heading
                .find(rest)
                .map(|next| next.start() < table_match.start())
                .unwrap_or(false);
            if interrupted {
                continue;
            }

            return Some(table_inner.as_str());
        }

        None
    }

    pub fn rows<'h>(&self, table_html: &'h str) -> Vec<&'h str> {
        inner_fragments(&self.row, table_html)
    }

    pub fn cells<'h>(&self, row_html: &'h str) -> Vec<&'h str> {
        inner_fragments(&self.cell, row_html)
    }

    pub fn spans<'h>(&self, fragment: &'h str) -> Vec<Span<'h>> {
        self.span
            .captures_iter(fragment)
            .filter_map(|captures| {
                Some(Span {
                    attributes: captures.get(1)?.as_str(),
                    inner: captures.get(2)?.as_str(),
                })
            })
            .collect()
    }

    // Returns the raw href and the anchor's inner markup.
    pub fn first_link<'h>(&self, fragment: &'h str) -> Option<(String, &'h str)> {
        self.anchor.captures_iter(fragment).find_map(|captures| {
            let href = self.attribute_value(captures.get(1)?.as_str(), "href")?;
            let href = href.trim().to_string();
            if href.is_empty() {
                return None;
            }
            Some((href, captures.get(2)?.as_str()))
        })
    }

    pub fn anchors(&self, html: &str) -> Vec<Anchor> {
        self.anchor_open
            .captures_iter(html)
            .filter_map(|captures| {
                let attributes = captures.get(1)?.as_str();
                let href = self.attribute_value(attributes, "href")?;
                let title = self.attribute_value(attributes, "title").unwrap_or_default();
                Some(Anchor {
                    href: self.decode_entities(href.trim()),
                    title: self.decode_entities(&title),
                })
            })
            .collect()
    }

    pub fn attribute_value(&self, attributes: &str, name: &str) -> Option<String> {
        self.attribute.captures_iter(attributes).find_map(|captures| {
            let key = captures.get(1)?.as_str();
            if !key.eq_ignore_ascii_case(name) {
                return None;
            }
            captures
                .get(2)
                .or_else(|| captures.get(3))
                .or_else(|| captures.get(4))
                .map(|value| value.as_str().to_string())
        })
    }

    pub fn decode_entities(&self, value: &str) -> String {
        self.entity
            .replace_all(value, |captures: &Captures<'_>| {
                let reference = &captures[1];
                decode_reference(reference).unwrap_or_else(|| captures[0].to_string())
            })
            .into_owned()
    }

    pub fn strip_tags(&self, value: &str) -> String {
        self.tag.replace_all(value, " ").into_owned()
    }

    pub fn html_to_text(&self, value: &str) -> String {
        normalize_whitespace(&self.decode_entities(&self.strip_tags(value)))
    }

    pub fn page_text(&self, html: &str) -> String {
        let without_scripts = self.script_or_style.replace_all(html, " ");
        self.html_to_text(&without_scripts)
    }
}

fn inner_fragments<'h>(regex: &Regex, html: &'h str) -> Vec<&'h str> {
    regex
        .captures_iter(html)
        .filter_map(|captures| captures.get(1).map(|inner| inner.as_str()))
        .collect()
}

fn decode_reference(reference: &str) -> Option<String> {
    if let Some(numeric) = reference.strip_prefix('#') {
        let code_point = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => numeric.parse::<u32>().ok(),
        };
        // Unrepresentable code points decode to nothing.
        return Some(
            code_point
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default(),
        );
    }

    let decoded = match reference {
        "nbsp" => " ",
        "amp" => "&",
        "quot" => "\"",
        "apos" => "'",
        "lt" => "<",
        "gt" => ">",
        _ => return None,
    };
    Some(decoded.to_string())
}
