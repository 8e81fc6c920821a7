use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::events::EventSink;
use crate::fetch::{FetchError, PageFetcher};

use super::extract::PlanPageParser;
use super::search::absolute_url;
use super::types::{PlanDetail, TabanowConfig};

pub struct TabanowClient {
    pub(super) fetcher: Arc<dyn PageFetcher>,
    pub(super) parser: PlanPageParser,
    pub(super) config: TabanowConfig,
    pub(super) events: Arc<dyn EventSink>,
}

impl TabanowClient {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        config: TabanowConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        Ok(Self {
            fetcher,
            parser: PlanPageParser::new()?,
            config,
            events,
        })
    }

    pub fn config(&self) -> &TabanowConfig {
        &self.config
    }

    pub(super) async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        debug!(
            url = %url,
            timeout_ms = self.config.request_timeout.as_millis() as u64,
            "fetching tabanow page"
        );
        self.fetcher
            .fetch_text(url, self.config.request_timeout)
            .await
    }

    pub(super) async fn fetch_plan_detail(&self, href: &str) -> Result<PlanDetail, FetchError> {
        let url = absolute_url(&self.config.base_url, href);
        let html = self.fetch_html(&url).await?;
        Ok(self.parser.plan_detail(&html, &self.config.base_url))
    }
}
