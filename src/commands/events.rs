use anyhow::Result;
use tracing::info;

use crate::cli::EventsArgs;
use crate::commands::emit;
use crate::events::MemoryEventLog;
use crate::model::{EventListing, EventStatus, LookupEvent};

pub fn run(args: EventsArgs) -> Result<()> {
    let log = MemoryEventLog::with_history(args.event_capacity, args.event_log.clone())?;
    let status = args.status.map(EventStatus::from);
    let listing = list_events(&log, args.action.as_deref(), status);
    info!(
        path = %args.event_log.display(),
        count = listing.count,
        "event log listed"
    );
    emit(&listing, None)?;

    if args.clear {
        log.clear()?;
        info!(path = %args.event_log.display(), "event log cleared");
    }
    Ok(())
}

// Newest first.
pub(crate) fn list_events(
    log: &MemoryEventLog,
    action: Option<&str>,
    status: Option<EventStatus>,
) -> EventListing {
    let mut events: Vec<LookupEvent> = match action {
        Some(action) => log.by_action(action),
        None => match status {
            Some(status) => log.by_status(status),
            None => log.snapshot(),
        },
    };
    if let Some(status) = status {
        events.retain(|event| event.status == status);
    }
    events.reverse();

    EventListing {
        count: events.len(),
        events,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::events::EventSink;

    #[test]
    fn list_events_filters_and_orders_newest_first() {
        let log = MemoryEventLog::new(10, None);
        for (action, status) in [
            ("tabanow.discover", EventStatus::Success),
            ("tabanow.discover", EventStatus::Error),
            ("lookup.taba_info", EventStatus::Success),
        ] {
            log.record(LookupEvent::new(action, json!({}), json!(null), status));
        }

        let all = list_events(&log, None, None);
        assert_eq!(all.count, 3);
        assert_eq!(all.events[0].action, "lookup.taba_info");

        let discover_errors = list_events(&log, Some("tabanow.discover"), Some(EventStatus::Error));
        assert_eq!(discover_errors.count, 1);

        let successes = list_events(&log, None, Some(EventStatus::Success));
        assert_eq!(successes.count, 2);
        assert_eq!(successes.events[1].action, "tabanow.discover");
    }
}
