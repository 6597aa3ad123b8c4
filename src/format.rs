use chrono::{DateTime, Utc};

const ELLIPSIS: &str = "...";

/// Compact age such as `now`, `30m`, `1h30m`, `2d` or `1d5h`.
///
/// Units are floor-truncated; timestamps ahead of `now` render as `future`.
pub fn format_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if now < timestamp {
        return "future".to_owned();
    }

    let elapsed = (now - timestamp).num_seconds();
    let days = elapsed / 86_400;
    let hours = (elapsed % 86_400) / 3_600;
    let minutes = (elapsed % 3_600) / 60;

    if days > 0 {
        if hours > 0 {
            format!("{days}d{hours}h")
        } else {
            format!("{days}d")
        }
    } else if hours > 0 {
        if minutes > 0 {
            format!("{hours}h{minutes}m")
        } else {
            format!("{hours}h")
        }
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        "now".to_owned()
    }
}

/// Shortens `text` to exactly `max_length` characters, ending in `...`, when
/// it is longer than that. Lengths are counted in characters.
///
/// # Panics
///
/// Panics if `max_length` is below 4.
pub fn truncate(text: &str, max_length: usize) -> String {
    assert!(
        max_length > ELLIPSIS.len(),
        "truncate needs room for at least one character before the ellipsis (got {max_length})"
    );

    if text.chars().count() <= max_length {
        return text.to_owned();
    }

    let mut shortened: String = text.chars().take(max_length - ELLIPSIS.len()).collect();
    shortened.push_str(ELLIPSIS);
    shortened
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::fixtures::now;

    fn age(delta: Duration) -> String {
        format_age(now() - delta, now())
    }

    #[test]
    fn age_table() {
        assert_eq!(age(Duration::zero()), "now");
        assert_eq!(age(Duration::seconds(59)), "now");
        assert_eq!(age(Duration::minutes(30)), "30m");
        assert_eq!(age(Duration::minutes(90)), "1h30m");
        assert_eq!(age(Duration::hours(2)), "2h");
        assert_eq!(age(Duration::hours(29)), "1d5h");
        assert_eq!(age(Duration::days(2)), "2d");
        assert_eq!(age(Duration::hours(-1)), "future");
    }

    #[test]
    fn age_components_are_floored() {
        assert_eq!(age(Duration::minutes(119) + Duration::seconds(59)), "1h59m");
        assert_eq!(age(Duration::days(1) + Duration::minutes(59)), "1d");
    }

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(truncate("Fix login", 50), "Fix login");
        assert_eq!(truncate("exactly", 7), "exactly");
    }

    #[test]
    fn long_text_is_cut_to_exact_length() {
        let title = "Refactor the notification fetcher to share pagination helpers";
        let cut = truncate(title, 50);
        assert_eq!(cut.chars().count(), 50);
        assert!(cut.ends_with("..."));
        assert!(title.starts_with(cut.trim_end_matches("...")));

        assert_eq!(truncate("abcdef", 4), "a...");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let cut = truncate("日本語のタイトルです", 6);
        assert_eq!(cut, "日本語...");
        assert_eq!(cut.chars().count(), 6);
    }

    #[test]
    #[should_panic(expected = "room for at least one character")]
    fn tiny_max_length_is_a_contract_violation() {
        truncate("hello", 3);
    }
}
