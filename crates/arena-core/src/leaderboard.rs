use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::game::Game;
use crate::team::{Team, TeamStatus};

/// A team's position on a game's leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    #[serde(flatten)]
    pub team: Team,
    pub win_rate: String,
}

/// Headline numbers for the landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub teams: usize,
    pub matches: u64,
    pub games: usize,
}

/// Points desc, then wins desc, then name ascending.
pub fn standing_order(a: &Team, b: &Team) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.wins.cmp(&a.wins))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Rounded percentage, `0%` before the first match.
pub fn win_rate(wins: u32, matches: u32) -> String {
    if matches == 0 {
        return "0%".to_string();
    }
    let pct = (f64::from(wins) / f64::from(matches) * 100.0).round();
    format!("{pct:.0}%")
}

fn listed(team: &Team) -> bool {
    team.status != TeamStatus::Archived
}

pub fn leaderboard(teams: &[Team], game: Game) -> Vec<LeaderboardRow> {
    let mut rows: Vec<&Team> = teams
        .iter()
        .filter(|t| t.game == game && listed(t))
        .collect();
    rows.sort_by(|a, b| standing_order(a, b));
    rows.into_iter()
        .enumerate()
        .map(|(i, t)| LeaderboardRow {
            rank: i + 1,
            win_rate: win_rate(t.wins, t.matches),
            team: t.clone(),
        })
        .collect()
}

pub fn counts(teams: &[Team]) -> Counts {
    let games: BTreeSet<Game> = teams.iter().map(|t| t.game).collect();
    Counts {
        teams: teams.len(),
        matches: teams.iter().map(|t| u64::from(t.matches)).sum(),
        games: games.len(),
    }
}

/// Current leader of each game that has at least one listed team.
pub fn winners(teams: &[Team]) -> BTreeMap<Game, Team> {
    let mut best: BTreeMap<Game, &Team> = BTreeMap::new();
    for team in teams.iter().filter(|t| listed(t)) {
        match best.get(&team.game) {
            Some(prev) if standing_order(team, prev) != Ordering::Less => {},
            _ => {
                best.insert(team.game, team);
            },
        }
    }
    best.into_iter().map(|(g, t)| (g, t.clone())).collect()
}
