//! Leaderboard ranking for the dashboard.

use serde::Serialize;
use uuid::Uuid;

use crate::models::ProfileStanding;

/// How many profiles the dashboard shows.
pub const LEADERBOARD_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaderboard {
    pub top: Vec<ProfileStanding>,
    /// 1-based rank of the viewer, only when they are outside `top`.
    pub viewer_rank: Option<usize>,
}

impl Leaderboard {
    /// Orders by level, then experience, both descending. Equal standings
    /// fall back to the username so the order is stable between requests.
    pub fn build(mut standings: Vec<ProfileStanding>, viewer: Uuid) -> Self {
        standings.sort_by(|a, b| {
            b.level
                .cmp(&a.level)
                .then_with(|| b.experience.cmp(&a.experience))
                .then_with(|| a.username.cmp(&b.username))
        });

        let position = standings.iter().position(|s| s.user_id == viewer);
        let viewer_rank = position.filter(|p| *p >= LEADERBOARD_SIZE).map(|p| p + 1);
        standings.truncate(LEADERBOARD_SIZE);
        Self {
            top: standings,
            viewer_rank,
        }
    }

    pub fn includes(&self, user_id: Uuid) -> bool {
        self.top.iter().any(|s| s.user_id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(username: &str, level: u32, experience: u32) -> ProfileStanding {
        ProfileStanding {
            user_id: Uuid::new_v4(),
            username: username.into(),
            level,
            experience,
        }
    }

    #[test]
    fn orders_by_level_then_experience() {
        let standings = vec![
            standing("@low", 1, 40),
            standing("@high", 3, 10),
            standing("@mid", 3, 90),
        ];
        let viewer = standings[0].user_id;
        let board = Leaderboard::build(standings, viewer);
        let names: Vec<&str> = board.top.iter().map(|s| s.username.as_str()).collect();
        assert_eq!(names, vec!["@mid", "@high", "@low"]);
        assert!(board.includes(viewer));
        assert_eq!(board.viewer_rank, None);
    }

    #[test]
    fn equal_standings_order_by_username() {
        let standings = vec![
            standing("@zoe", 2, 30),
            standing("@adam", 2, 30),
            standing("@mia", 2, 30),
            standing("@top", 2, 31),
        ];
        let viewer = standings[0].user_id;
        let board = Leaderboard::build(standings.clone(), viewer);
        let names: Vec<&str> = board.top.iter().map(|s| s.username.as_str()).collect();
        assert_eq!(names, vec!["@top", "@adam", "@mia", "@zoe"]);

        let mut reversed = standings;
        reversed.reverse();
        assert_eq!(Leaderboard::build(reversed, viewer), board);
    }

    #[test]
    fn viewer_outside_top_ten_gets_a_rank() {
        let mut standings: Vec<ProfileStanding> =
            (0..12).map(|i| standing(&format!("@user{i:02}"), 20 - i, 0)).collect();
        let viewer = standings[11].user_id;
        standings.reverse();
        let board = Leaderboard::build(standings, viewer);
        assert_eq!(board.top.len(), LEADERBOARD_SIZE);
        assert!(!board.includes(viewer));
        assert_eq!(board.viewer_rank, Some(12));
    }
}
