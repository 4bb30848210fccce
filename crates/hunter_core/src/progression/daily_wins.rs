//! Daily win tracker.
//!
//! Counters roll over lazily: the first touch of a category on a new day
//! resets it before applying the win. There is no background timer.

use crate::model::user::{DailyWinCategory, DailyWinProgress, User, ALL_DAILY_WIN_CATEGORIES};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Wins needed for a category to count as completed for the day.
const COMPLETION_THRESHOLD: u32 = 1;

/// Result of recording one win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinRecorded {
    pub user: User,
    pub progress: DailyWinProgress,
    /// True only on the call that flipped the category to completed today.
    pub newly_completed: bool,
}

/// Records one win for `category` on `today` against a copy of `user`.
pub fn record_win(user: &User, category: DailyWinCategory, today: NaiveDate) -> WinRecorded {
    let mut updated = user.clone();
    let current = rolled_over(user.daily_win(category), today);
    let was_completed = current.is_completed;

    let count = current.count.saturating_add(1);
    let progress = DailyWinProgress {
        count,
        is_completed: count >= COMPLETION_THRESHOLD,
        last_updated: Some(today),
    };
    updated.daily_wins.insert(category, progress);

    WinRecorded {
        user: updated,
        progress,
        newly_completed: progress.is_completed && !was_completed,
    }
}

/// Read model of every category as of `today`, without mutating `user`.
pub fn view(user: &User, today: NaiveDate) -> BTreeMap<DailyWinCategory, DailyWinProgress> {
    ALL_DAILY_WIN_CATEGORIES
        .iter()
        .map(|category| (*category, rolled_over(user.daily_win(*category), today)))
        .collect()
}

fn rolled_over(progress: DailyWinProgress, today: NaiveDate) -> DailyWinProgress {
    if progress.last_updated == Some(today) {
        progress
    } else {
        DailyWinProgress {
            count: 0,
            is_completed: false,
            last_updated: progress.last_updated,
        }
    }
}
