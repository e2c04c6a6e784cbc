//! Daily-entry streaks.
//!
//! A streak counts consecutive calendar days with an entry, ending either
//! today or, when today has no entry yet, yesterday. Keeping yesterday as an
//! anchor means a streak survives until the user misses a full day.

use chrono::{Days, NaiveDate};

use crate::models::Entry;

/// Counts the streak given entry dates ordered newest first.
///
/// Dates after the anchor are skipped until the streak starts. Once it has
/// started, the first date that is not the expected day ends it, which means a
/// second entry on an already-counted day also ends it.
pub fn compute_streak<I>(dates_desc: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let dates: Vec<NaiveDate> = dates_desc.into_iter().collect();
    if dates.is_empty() {
        return 0;
    }

    let mut anchor = if dates.contains(&today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) => yesterday,
            None => return 0,
        }
    };

    let mut streak = 0;
    for date in dates {
        if date == anchor {
            streak += 1;
            anchor = match anchor.checked_sub_days(Days::new(1)) {
                Some(previous) => previous,
                None => break,
            };
        } else if streak > 0 {
            break;
        }
    }
    streak
}

/// Streak for a journal's entries, which may be in any order.
pub fn journal_streak(entries: &[Entry], today: NaiveDate) -> u32 {
    let mut dates: Vec<NaiveDate> = entries.iter().map(|e| e.created_on).collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    compute_streak(dates, today)
}
