use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{MistakeCategory, UserStatsDaily, VocabItem};
use crate::repository::TutorRepository;

const HISTORY_DAYS: u64 = 7;
const MISTAKE_WINDOW_DAYS: u64 = 30;
const TOP_MISTAKES: usize = 5;
const DUE_LIMIT: usize = 20;
const UPCOMING_LIMIT: usize = 10;

/// Today's numbers; zeros when the learner has not practiced yet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailySnapshot {
    pub minutes: u32,
    pub sessions_count: u32,
    pub streak_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MistakeCount {
    pub category: MistakeCategory,
    pub count: usize,
}

/// Everything the progress page shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub date: NaiveDate,
    pub today: DailySnapshot,
    pub daily_goal_minutes: u32,
    pub week: u32,
    /// Newest first
    pub recent_days: Vec<UserStatsDaily>,
    pub top_mistakes: Vec<MistakeCount>,
    pub vocab_due: Vec<VocabItem>,
    pub vocab_upcoming: Vec<VocabItem>,
}

#[derive(Clone)]
pub struct ProgressService {
    repository: Arc<dyn TutorRepository>,
}

impl ProgressService {
    pub fn new(repository: Arc<dyn TutorRepository>) -> Self {
        Self { repository }
    }

    pub async fn report(&self, user_id: &str) -> Result<ProgressReport> {
        self.report_at(user_id, Utc::now()).await
    }

    pub async fn report_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<ProgressReport> {
        let today = now.date_naive();
        let profile = self.repository.get_profile(user_id).await?;

        let today_stats = self.repository.daily_stats(user_id, today).await?;
        let history_start = today.checked_sub_days(Days::new(HISTORY_DAYS - 1)).unwrap_or(today);
        let recent_days = self.repository.daily_stats_since(user_id, history_start).await?;

        let mistake_start = now.checked_sub_days(Days::new(MISTAKE_WINDOW_DAYS)).unwrap_or(now);
        let categories = self.repository.mistake_categories_since(user_id, mistake_start).await?;

        Ok(ProgressReport {
            date: today,
            today: today_stats
                .map(|row| DailySnapshot {
                    minutes: row.minutes,
                    sessions_count: row.sessions_count,
                    streak_count: row.streak_count,
                })
                .unwrap_or_default(),
            daily_goal_minutes: profile.as_ref().map_or(30, |p| p.daily_goal_minutes),
            week: profile.as_ref().map_or(1, |p| p.week),
            recent_days,
            top_mistakes: top_mistakes(&categories, TOP_MISTAKES),
            vocab_due: self.repository.vocab_due(user_id, today, DUE_LIMIT).await?,
            vocab_upcoming: self.repository.vocab_upcoming(user_id, today, UPCOMING_LIMIT).await?,
        })
    }
}

/// Most frequent categories, ties broken by name
fn top_mistakes(categories: &[MistakeCategory], limit: usize) -> Vec<MistakeCount> {
    let mut counts: BTreeMap<&'static str, (MistakeCategory, usize)> = BTreeMap::new();
    for category in categories {
        counts.entry(category.as_str()).or_insert((*category, 0)).1 += 1;
    }

    let mut ranked: Vec<MistakeCount> = counts
        .into_values()
        .map(|(category, count)| MistakeCount { category, count })
        .collect();
    // BTreeMap yields name order; a stable sort keeps it within equal counts.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}
