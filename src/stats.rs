//! Daily practice aggregates and streaks

use crate::models::UserStatsDaily;

/// Fold one closed session into today's aggregate row.
///
/// A session reported as 0 minutes still counts as 1. The streak continues only
/// when the learner had at least one session yesterday.
#[must_use]
pub fn next_daily_stats(
    user_id: &str,
    today: chrono::NaiveDate,
    existing_today: Option<&UserStatsDaily>,
    yesterday: Option<&UserStatsDaily>,
    minutes: u32,
) -> UserStatsDaily {
    let minutes = minutes.max(1);
    let streak_count = match yesterday {
        Some(prev) if prev.sessions_count >= 1 => prev.streak_count.saturating_add(1),
        _ => 1,
    };

    UserStatsDaily {
        user_id: user_id.to_string(),
        date: today,
        minutes: existing_today.map_or(0, |row| row.minutes).saturating_add(minutes),
        streak_count,
        sessions_count: existing_today.map_or(0, |row| row.sessions_count).saturating_add(1),
    }
}
