pub mod discover;
pub mod enrich;
pub mod events;
pub mod inspect;
pub mod lookup;
pub mod parcel;
pub mod regulations;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::{EventArgs, ScraperArgs, TabanowArgs};
use crate::events::{EventSink, MemoryEventLog};
use crate::fetch::HttpFetcher;
use crate::scraper_api::{ProviderError, ScraperApi};
use crate::tabanow::TabanowClient;
use crate::util::{print_json_pretty, write_json_pretty};

pub(crate) struct Session {
    pub client: TabanowClient,
    pub events: Arc<MemoryEventLog>,
}

pub(crate) fn open_session(tabanow: &TabanowArgs, events: &EventArgs) -> Result<Session> {
    let log = Arc::new(MemoryEventLog::new(
        events.event_capacity,
        events.event_log.clone(),
    ));
    let fetcher = HttpFetcher::new().context("failed to build http client")?;
    let sink: Arc<dyn EventSink> = log.clone();
    let client = TabanowClient::new(Arc::new(fetcher), tabanow.to_config(), sink)?;

    Ok(Session {
        client,
        events: log,
    })
}

/// `Ok(None)` when the scraper api has no base url or key.
pub(crate) fn open_scraper(args: &ScraperArgs, request_timeout: Duration) -> Result<Option<ScraperApi>, ProviderError> {
    match args.to_config(request_timeout).and_then(ScraperApi::new) {
        Ok(api) => Ok(Some(api)),
        Err(ProviderError::NotConfigured(setting)) => {
            info!(setting, "scraper api not configured, skipping");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

pub(crate) fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        write_json_pretty(path, value)?;
    }
    print_json_pretty(value)
}
