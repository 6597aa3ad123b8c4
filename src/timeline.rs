use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{config::PipelineConfig, domain::ActivityItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
    LastHour,
    LastDay,
}

impl Bucket {
    pub const ALL: [Bucket; 2] = [Bucket::LastHour, Bucket::LastDay];

    pub fn label(&self) -> &'static str {
        match self {
            Bucket::LastHour => "Last hour",
            Bucket::LastDay => "Last 24 hours",
        }
    }
}

/// Bucket an update time falls into, or `None` once it is past the activity
/// window.
pub fn bucket_for(
    updated_at: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &PipelineConfig,
) -> Option<Bucket> {
    if updated_at < now - config.activity_window {
        None
    } else if updated_at >= now - config.recent_window {
        Some(Bucket::LastHour)
    } else {
        Some(Bucket::LastDay)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RepoGroup {
    pub repository: String,
    pub items: Vec<ActivityItem>,
}

/// Items of one bucket keyed by repository.
///
/// Repositories keep the position they were first seen at, but only the
/// ordering inside a repository is part of the contract.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RepoGroups {
    groups: Vec<RepoGroup>,
    index: HashMap<String, usize>,
}

impl RepoGroups {
    fn push(&mut self, item: ActivityItem) {
        match self.index.get(&item.repository) {
            Some(&slot) => self.groups[slot].items.push(item),
            None => {
                self.index.insert(item.repository.clone(), self.groups.len());
                self.groups.push(RepoGroup {
                    repository: item.repository.clone(),
                    items: vec![item],
                });
            }
        }
    }

    fn sort_newest_first(&mut self) {
        for group in &mut self.groups {
            // `sort_by` is stable, so equal timestamps keep encounter order.
            group.items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        }
    }

    pub fn get(&self, repository: &str) -> Option<&[ActivityItem]> {
        self.index
            .get(repository)
            .map(|&slot| self.groups[slot].items.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepoGroup> {
        self.groups.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|group| group.items.len()).sum()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    pub last_hour: RepoGroups,
    pub last_day: RepoGroups,
}

impl Timeline {
    pub fn bucket(&self, bucket: Bucket) -> &RepoGroups {
        match bucket {
            Bucket::LastHour => &self.last_hour,
            Bucket::LastDay => &self.last_day,
        }
    }

    pub fn item_count(&self) -> usize {
        self.last_hour.item_count() + self.last_day.item_count()
    }

    pub fn is_empty(&self) -> bool {
        self.last_hour.is_empty() && self.last_day.is_empty()
    }
}

/// Splits items into the last-hour and last-day buckets, grouped by
/// repository and ordered newest first. Items past the activity window are
/// dropped.
pub fn bucket_and_group<I>(items: I, now: DateTime<Utc>, config: &PipelineConfig) -> Timeline
where
    I: IntoIterator<Item = ActivityItem>,
{
    let mut timeline = Timeline::default();

    for item in items {
        match bucket_for(item.updated_at, now, config) {
            Some(Bucket::LastHour) => timeline.last_hour.push(item),
            Some(Bucket::LastDay) => timeline.last_day.push(item),
            None => {}
        }
    }

    timeline.last_hour.sort_newest_first();
    timeline.last_day.sort_newest_first();
    timeline
}
