use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::game::{Game, ScoringFamily};

/// Base points by finishing position, indexed by placement. Index 0 and
/// anything past the table are worth nothing.
pub const PLACEMENT_POINTS: [u32; 11] = [0, 10, 6, 5, 4, 3, 2, 1, 1, 1, 1];

/// Points for a head-to-head win.
pub const WIN_POINTS: u32 = 3;

/// Raw outcome fields of one result. Which fields matter depends on the
/// game's scoring family; the others are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub placement: u32,
    pub kills: u32,
    pub did_win: bool,
}

/// Contribution of results to a team's standing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub points: u32,
    pub matches: u32,
    pub wins: u32,
}

impl AddAssign for Score {
    fn add_assign(&mut self, rhs: Self) {
        self.points = self.points.saturating_add(rhs.points);
        self.matches = self.matches.saturating_add(rhs.matches);
        self.wins = self.wins.saturating_add(rhs.wins);
    }
}

pub fn placement_points(placement: u32) -> u32 {
    PLACEMENT_POINTS
        .get(placement as usize)
        .copied()
        .unwrap_or(0)
}

/// Score a single match result.
///
/// Scoring rules:
/// - Elimination (BGMI, Free Fire): placement table + 1 per kill, never a win
/// - Head-to-head (Clash Royale): 3 points and a win for the winner, 0 for the loser
/// - Every result counts as one match played
pub fn score_result(game: Game, outcome: &Outcome) -> Score {
    match game.family() {
        ScoringFamily::HeadToHead => {
            let wins = u32::from(outcome.did_win);
            Score {
                points: wins * WIN_POINTS,
                matches: 1,
                wins,
            }
        },
        ScoringFamily::Elimination => Score {
            points: placement_points(outcome.placement).saturating_add(outcome.kills),
            matches: 1,
            wins: 0,
        },
    }
}
