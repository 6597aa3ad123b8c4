use crate::domain::ActivityItem;

/// Highest total that still counts as low activity.
pub const LOW_ACTIVITY_MAX: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityLevel {
    None,
    Low,
    High,
}

impl ActivityLevel {
    pub fn from_count(total: usize) -> Self {
        match total {
            0 => ActivityLevel::None,
            1..=LOW_ACTIVITY_MAX => ActivityLevel::Low,
            _ => ActivityLevel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::None => "none",
            ActivityLevel::Low => "low",
            ActivityLevel::High => "high",
        }
    }
}

pub fn summarize(
    pull_requests: &[ActivityItem],
    issues: &[ActivityItem],
    mentions: &[ActivityItem],
) -> (usize, ActivityLevel) {
    let total = pull_requests.len() + issues.len() + mentions.len();
    (total, ActivityLevel::from_count(total))
}
