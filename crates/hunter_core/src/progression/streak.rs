//! Streak tracker.
//!
//! # Invariants
//! - Comparisons use calendar dates only, never elapsed hours.
//! - `longest_streak >= streak_days` after every touch.
//! - A date earlier than `last_active` is ignored.

use crate::model::user::User;
use chrono::NaiveDate;

/// What a touch did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// Already counted today, or the date went backwards.
    Unchanged,
    /// First qualifying activity ever.
    Started,
    /// Consecutive day.
    Extended,
    /// A gap reset the streak to 1.
    Broken { previous_days: u32 },
}

/// Result of one touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakTouch {
    pub user: User,
    pub change: StreakChange,
}

/// Counts `today` as an active day for a copy of `user`.
pub fn touch(user: &User, today: NaiveDate) -> StreakTouch {
    let mut updated = user.clone();
    let change = match user.last_active {
        None => StreakChange::Started,
        Some(last) if today <= last => StreakChange::Unchanged,
        Some(last) if last.succ_opt() == Some(today) => StreakChange::Extended,
        Some(_) => StreakChange::Broken {
            previous_days: user.streak_days,
        },
    };

    match change {
        StreakChange::Unchanged => {}
        StreakChange::Extended => updated.streak_days = updated.streak_days.saturating_add(1),
        StreakChange::Started | StreakChange::Broken { .. } => updated.streak_days = 1,
    }
    if change != StreakChange::Unchanged {
        updated.last_active = Some(today);
        updated.days_active = updated.days_active.saturating_add(1);
    }
    updated.longest_streak = updated.longest_streak.max(updated.streak_days);

    StreakTouch {
        user: updated,
        change,
    }
}

#[cfg(test)]
mod tests {
    use super::{touch, StreakChange};
    use crate::model::user::User;
    use chrono::NaiveDate;

    fn jan(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).expect("valid date")
    }

    fn active_user(last_active: NaiveDate, streak_days: u32, longest_streak: u32) -> User {
        let mut user = User::new("Jin", jan(1));
        user.last_active = Some(last_active);
        user.streak_days = streak_days;
        user.longest_streak = longest_streak;
        user.days_active = streak_days;
        user
    }

    #[test]
    fn first_touch_starts_streak() {
        let result = touch(&User::new("Jin", jan(1)), jan(1));
        assert_eq!(result.change, StreakChange::Started);
        assert_eq!(result.user.streak_days, 1);
        assert_eq!(result.user.longest_streak, 1);
        assert_eq!(result.user.days_active, 1);
        assert_eq!(result.user.last_active, Some(jan(1)));
    }

    #[test]
    fn same_day_touch_is_a_no_op() {
        let user = active_user(jan(4), 3, 3);
        let result = touch(&user, jan(4));
        assert_eq!(result.change, StreakChange::Unchanged);
        assert_eq!(result.user, user);
    }

    #[test]
    fn consecutive_day_extends_and_raises_longest() {
        let result = touch(&active_user(jan(4), 3, 3), jan(5));
        assert_eq!(result.change, StreakChange::Extended);
        assert_eq!(result.user.streak_days, 4);
        assert_eq!(result.user.longest_streak, 4);
        assert_eq!(result.user.days_active, 4);
    }

    #[test]
    fn gap_resets_streak_but_keeps_longest() {
        let result = touch(&active_user(jan(1), 5, 5), jan(3));
        assert_eq!(result.change, StreakChange::Broken { previous_days: 5 });
        assert_eq!(result.user.streak_days, 1);
        assert_eq!(result.user.longest_streak, 5);
        assert_eq!(result.user.last_active, Some(jan(3)));
    }

    #[test]
    fn month_boundary_counts_as_consecutive() {
        let feb_first = NaiveDate::from_ymd_opt(2026, 2, 1).expect("valid date");
        let result = touch(&active_user(jan(31), 2, 7), feb_first);
        assert_eq!(result.change, StreakChange::Extended);
        assert_eq!(result.user.streak_days, 3);
        assert_eq!(result.user.longest_streak, 7);
    }

    #[test]
    fn earlier_date_is_ignored() {
        let user = active_user(jan(10), 2, 2);
        let result = touch(&user, jan(8));
        assert_eq!(result.change, StreakChange::Unchanged);
        assert_eq!(result.user.last_active, Some(jan(10)));
    }
}
