use reqwest::Url;
use tracing::{info, warn};

use crate::fetch::FetchError;

use super::client::TabanowClient;
use super::text::normalize_plan_code;
use super::types::{SEARCH_PATH, SearchRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchQuery<'a> {
    Number(&'a str),
    Block(&'a str),
}

pub fn build_search_url(
    base_url: &str,
    query: SearchQuery<'_>,
    page: usize,
) -> Result<String, FetchError> {
    let mut url = Url::parse(base_url)
        .and_then(|base| base.join(SEARCH_PATH))
        .map_err(|err| FetchError::InvalidUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;

    {
        let mut pairs = url.query_pairs_mut();
        match query {
            SearchQuery::Number(number) => pairs.append_pair("number", number),
            SearchQuery::Block(block) => pairs.append_pair("block", block),
        };
        if page > 1 {
            pairs.append_pair("page", &page.to_string());
        }
    }

    Ok(url.to_string())
}

// Unparseable combinations fall back to the raw href.
pub fn absolute_url(base_url: &str, href: &str) -> String {
    Url::parse(base_url)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}

impl TabanowClient {
    pub async fn search_by_number(&self, plan_number: &str) -> Result<Vec<SearchRow>, FetchError> {
        let url = build_search_url(&self.config.base_url, SearchQuery::Number(plan_number), 1)?;
        let html = self.fetch_html(&url).await?;
        let rows = self.parser.search_rows(&html);
        if rows.is_empty() {
            return Ok(rows);
        }

        let wanted = normalize_plan_code(plan_number);
        let exact = rows
            .iter()
            .filter(|row| normalize_plan_code(&row.plan_number) == wanted)
            .cloned()
            .collect::<Vec<SearchRow>>();

        if exact.is_empty() {
            info!(
                plan_number = %plan_number,
                rows = rows.len(),
                "no exact plan number match, keeping all search rows"
            );
            return Ok(rows);
        }
        Ok(exact)
    }

    pub async fn search_by_block(&self, gush: &str) -> Result<Vec<SearchRow>, FetchError> {
        let first_url = build_search_url(&self.config.base_url, SearchQuery::Block(gush), 1)?;
        let first_page = self.fetch_html(&first_url).await?;
        let mut rows = self.parser.search_rows(&first_page);

        let advertised_pages = self.parser.pagination_max_page(&first_page);
        let total_pages = advertised_pages.min(self.config.max_block_pages);

        let mut fetched_pages = 1;
        for page in 2..=total_pages {
            let url = build_search_url(&self.config.base_url, SearchQuery::Block(gush), page)?;
            match self.fetch_html(&url).await {
                Ok(html) => {
                    fetched_pages += 1;
                    rows.extend(self.parser.search_rows(&html));
                }
                Err(err) => {
                    warn!(gush = %gush, page, error = %err, "block search page failed, stopping pagination");
                    break;
                }
            }
        }

        info!(
            gush = %gush,
            advertised_pages,
            fetched_pages,
            rows = rows.len(),
            "block search complete"
        );
        Ok(rows)
    }
}
