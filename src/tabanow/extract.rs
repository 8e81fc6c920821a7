use anyhow::{Context, Result};
use regex::Regex;

use super::html::HtmlScanner;
use super::search::absolute_url;
use super::text::{is_ascii_digits, normalize_numeric_token};
use super::types::{MAX_FLOORS_CEILING, MAX_LOT_SIZE_SQM, ParcelRow, PlanDetail, SearchRow};

pub const PARCEL_TABLE_HEADING: &str = "גושים וחלקות";
const TAKANON_HREF_MARKER: &str = "takanon";
const TAKANON_TITLE_MARKER: &str = "תקנון";
const SUPERSEDED_TAKANON_HREF_MARKER: &str = "takanonim-h";
const NOT_APPROVED_TITLE_MARKER: &str = "לא מאושר";
const SEARCH_ROW_MIN_CELLS: usize = 5;

#[derive(Debug)]
pub struct PlanPageParser {
    html: HtmlScanner,
    directional_floors: Regex,
    bare_floors: Regex,
    area: Regex,
    pagination: Regex,
    cancelled_span: Regex,
}

impl PlanPageParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            html: HtmlScanner::new()?,
            directional_floors: Regex::new(r"(?:עד|ל-?)\s*([0-9]+)\s*קומ(?:ה|ות)")
                .context("failed to compile directional floors regex")?,
            bare_floors: Regex::new(r"([0-9]+)\s*קומ(?:ה|ות)")
                .context("failed to compile floors regex")?,
            area: Regex::new(
                r#"([0-9]{1,3}(?:,[0-9]{3})+(?:\.[0-9]+)?|[0-9]{2,7}(?:[.,][0-9]+)?)\s*מ["״'׳]?ר(?:[^\p{Hebrew}]|$)"#,
            )
            .context("failed to compile area regex")?,
            pagination: Regex::new(r"(?:[?&]|&amp;)page=([0-9]+)")
                .context("failed to compile pagination regex")?,
            cancelled_span: Regex::new(r"(?i)\b(?:cancell?ed|strike|line-through)\b")
                .context("failed to compile cancelled span regex")?,
        })
    }

    #[cfg(test)]
    pub fn html(&self) -> &HtmlScanner {
        &self.html
    }

    pub fn search_rows(&self, html: &str) -> Vec<SearchRow> {
        let Some(body) = self.html.first_table_body(html) else {
            return Vec::new();
        };

        let mut rows = Vec::new();
        for row_html in self.html.rows(body) {
            let cells = self.html.cells(row_html);
            if cells.len() < SEARCH_ROW_MIN_CELLS {
                continue;
            }

            let Some((href, link_inner)) = self.html.first_link(cells[1]) else {
                continue;
            };
            let href = self.html.decode_entities(&href);
            let plan_number = self.html.html_to_text(link_inner);
            if plan_number.is_empty() {
                continue;
            }

            rows.push(SearchRow {
                locality: self.html.html_to_text(cells[0]),
                plan_number,
                status: self.html.html_to_text(cells[2]),
                description: self.html.html_to_text(cells[3]),
                place: self.html.html_to_text(cells[4]),
                href,
            });
        }

        rows
    }

    pub fn pagination_max_page(&self, html: &str) -> usize {
        self.pagination
            .captures_iter(html)
            .filter_map(|captures| captures.get(1)?.as_str().parse::<usize>().ok())
            .fold(1, usize::max)
    }

    pub fn plan_detail(&self, html: &str, base_url: &str) -> PlanDetail {
        let text = self.html.page_text(html);
        PlanDetail {
            takanon_url: self.takanon_url(html, base_url),
            lot_size_sqm: self.lot_size_sqm(&text),
            max_floors: self.max_floors(&text),
            parcel_rows: self.parcel_rows(html),
        }
    }

    pub fn max_floors(&self, text: &str) -> Option<u32> {
        self.directional_floors
            .captures_iter(text)
            .chain(self.bare_floors.captures_iter(text))
            .filter_map(|captures| captures.get(1)?.as_str().parse::<u32>().ok())
            .filter(|value| *value > 0 && *value <= MAX_FLOORS_CEILING)
            .max()
    }

    // The largest area on a plan page is usually the summary figure.
    pub fn lot_size_sqm(&self, text: &str) -> Option<f64> {
        self.area
            .captures_iter(text)
            .filter_map(|captures| {
                captures
                    .get(1)?
                    .as_str()
                    .replace(',', "")
                    .parse::<f64>()
                    .ok()
            })
            .filter(|value| value.is_finite() && *value > 0.0 && *value <= MAX_LOT_SIZE_SQM)
            .reduce(f64::max)
    }

    pub fn takanon_url(&self, html: &str, base_url: &str) -> Option<String> {
        let links = self
            .html
            .anchors(html)
            .into_iter()
            .filter(|anchor| {
                anchor.href.contains(TAKANON_HREF_MARKER)
                    || anchor.title.contains(TAKANON_TITLE_MARKER)
            })
            .collect::<Vec<_>>();

        let preferred = links
            .iter()
            .find(|anchor| {
                !anchor.href.contains(SUPERSEDED_TAKANON_HREF_MARKER)
                    && !anchor.title.contains(NOT_APPROVED_TITLE_MARKER)
            })
            .or_else(|| links.first())?;

        Some(absolute_url(base_url, &preferred.href))
    }

    pub fn parcel_rows(&self, html: &str) -> Vec<ParcelRow> {
        let Some(table) = self.html.section_table_by_heading(html, PARCEL_TABLE_HEADING) else {
            return Vec::new();
        };

        let mut rows = Vec::new();
        for row_html in self.html.rows(table) {
            let cells = self.html.cells(row_html);
            if cells.len() < 2 {
                continue;
            }

            let gush = normalize_numeric_token(&self.html.html_to_text(cells[0]));
            if !is_ascii_digits(&gush) {
                continue;
            }

            rows.push(ParcelRow {
                gush,
                helka_tokens: self.helka_tokens(cells[1]),
            });
        }

        rows
    }

    pub fn helka_tokens(&self, cell_html: &str) -> Vec<String> {
        // Cancelled spans still count as span-delimited, so they never reappear via the plain text.
        let span_tokens = self
            .html
            .spans(cell_html)
            .into_iter()
            .map(|span| {
                (
                    self.cancelled_span.is_match(span.attributes),
                    self.html.html_to_text(span.inner),
                )
            })
            .filter(|(_, token)| !token.is_empty())
            .collect::<Vec<(bool, String)>>();
        if !span_tokens.is_empty() {
            return span_tokens
                .into_iter()
                .filter(|(cancelled, _)| !cancelled)
                .map(|(_, token)| token)
                .collect();
        }

        self.html
            .html_to_text(cell_html)
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    }
}
