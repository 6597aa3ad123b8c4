use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    classify,
    config::PipelineConfig,
    domain::{ActivityItem, ItemKind, RawItem},
};

/// Collapses the concatenated results of one kind's queries into a list of
/// unique, in-scope items.
///
/// Each raw item is classified first, then normalized, then checked against
/// the ids already kept. The first version of an id wins and later copies are
/// dropped without touching it. Output keeps encounter order.
pub fn dedupe<I>(
    raws: I,
    kind: ItemKind,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Vec<ActivityItem>
where
    I: IntoIterator<Item = RawItem>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for raw in raws {
        if let Some(reason) = classify::exclusion(&raw, kind, config, now) {
            debug!(kind = kind.label(), id = %raw.id, reason = reason.as_str(), "item filtered");
            continue;
        }

        let item = match ActivityItem::from_raw(raw, kind) {
            Ok(item) => item,
            Err(err) => {
                warn!(kind = kind.label(), "dropping malformed item: {err}");
                continue;
            }
        };

        if !seen.insert(item.id.clone()) {
            continue;
        }
        unique.push(item);
    }

    unique
}
