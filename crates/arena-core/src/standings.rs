//! Folding result rows into per-team totals.
//!
//! Everything here is pure: the caller reads the Teams and Results tabs,
//! hands the rows in, and writes the returned block back. Running the fold
//! twice over the same rows yields the same block.

use std::collections::HashMap;

use serde::Serialize;

use crate::cell::{Cell, Grid, Row, cell_at};
use crate::game::Game;
use crate::layout::team_col;
use crate::result::MatchResult;
use crate::scoring::Score;

/// Sum the scores of every result in scope, keyed by team id.
pub fn tally(result_rows: &[Row], filter: Option<Game>) -> HashMap<String, Score> {
    let mut totals: HashMap<String, Score> = HashMap::new();
    for result in result_rows.iter().filter_map(MatchResult::from_row) {
        if filter.is_some_and(|g| g != result.game) {
            continue;
        }
        *totals.entry(result.team_id.clone()).or_default() += result.score();
    }
    totals
}

/// Build the points/matches/wins block aligned to `team_rows`.
///
/// Teams in scope get their tallied totals (zero when they have no
/// results). Rows out of scope, meaning blank rows or teams of another game
/// while a filter is set, keep whatever the sheet already holds.
pub fn totals_block(
    team_rows: &[Row],
    totals: &HashMap<String, Score>,
    filter: Option<Game>,
) -> Grid {
    team_rows
        .iter()
        .map(|row| {
            let id = cell_at(row, team_col::ID).text();
            let in_scope = !id.is_empty()
                && match filter {
                    None => true,
                    Some(g) => cell_at(row, team_col::GAME).text().parse::<Game>().ok() == Some(g),
                };
            if in_scope {
                let s = totals.get(&id).copied().unwrap_or_default();
                vec![s.points.into(), s.matches.into(), s.wins.into()]
            } else {
                existing_totals(row)
            }
        })
        .collect()
}

fn existing_totals(row: &Row) -> Row {
    [team_col::POINTS, team_col::MATCHES, team_col::WINS]
        .into_iter()
        .map(|i| match cell_at(row, i) {
            Cell::Empty => Cell::from(""),
            other => other.clone(),
        })
        .collect()
}

/// Recompute the totals block from raw rows.
pub fn recompute(team_rows: &[Row], result_rows: &[Row], filter: Option<Game>) -> Grid {
    let totals = tally(result_rows, filter);
    totals_block(team_rows, &totals, filter)
}

/// Notification published after a successful standings write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingsUpdate {
    /// Game that was recomputed, or `None` for all games.
    pub game: Option<Game>,
    /// Number of team rows written.
    pub teams: usize,
}
