use serde::{Deserialize, Serialize};

use crate::cell::{Cell, Row, cell_at};
use crate::game::{Game, ScoringFamily};
use crate::layout::result_col;
use crate::scoring::{Outcome, Score, score_result};

/// One match outcome for one team. Results are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: String,
    pub team_id: String,
    pub game: Game,
    /// Finishing position, elimination games only.
    pub placement: Option<u32>,
    /// Kill count, elimination games only.
    pub kills: Option<u32>,
    pub did_win: bool,
    pub points: u32,
    pub created_at: String,
}

impl MatchResult {
    /// Build an elimination result and score it.
    pub fn elimination(
        match_id: &str,
        team_id: &str,
        game: Game,
        placement: u32,
        kills: u32,
        created_at: &str,
    ) -> Self {
        let score = score_result(game, &Outcome {
            placement,
            kills,
            did_win: false,
        });
        Self {
            match_id: match_id.to_string(),
            team_id: team_id.to_string(),
            game,
            placement: Some(placement),
            kills: Some(kills),
            did_win: false,
            points: score.points,
            created_at: created_at.to_string(),
        }
    }

    /// Build one side of a head-to-head match.
    pub fn head_to_head(
        match_id: &str,
        team_id: &str,
        game: Game,
        did_win: bool,
        created_at: &str,
    ) -> Self {
        let score = score_result(game, &Outcome {
            did_win,
            ..Outcome::default()
        });
        Self {
            match_id: match_id.to_string(),
            team_id: team_id.to_string(),
            game,
            placement: None,
            kills: None,
            did_win,
            points: score.points,
            created_at: created_at.to_string(),
        }
    }

    /// Parse a Results row. Rows without a team id or with an unrecognised
    /// game carry no standing and yield `None`.
    pub fn from_row(row: &Row) -> Option<Self> {
        let team_id = cell_at(row, result_col::TEAM_ID).text();
        if team_id.is_empty() {
            return None;
        }
        let game = cell_at(row, result_col::GAME).text().parse::<Game>().ok()?;
        let optional_count = |idx: usize| {
            let cell = cell_at(row, idx);
            (!cell.is_blank()).then(|| cell.count())
        };
        Some(Self {
            match_id: cell_at(row, result_col::MATCH_ID).text(),
            team_id,
            game,
            placement: optional_count(result_col::PLACEMENT),
            kills: optional_count(result_col::KILLS),
            did_win: cell_at(row, result_col::DID_WIN).is_true(),
            points: cell_at(row, result_col::POINTS).count(),
            created_at: cell_at(row, result_col::CREATED_AT).text(),
        })
    }

    pub fn to_row(&self) -> Row {
        let optional = |v: Option<u32>| v.map(Cell::from).unwrap_or_else(|| Cell::from(""));
        vec![
            self.match_id.as_str().into(),
            self.team_id.as_str().into(),
            self.game.as_str().into(),
            optional(self.placement),
            optional(self.kills),
            self.did_win.into(),
            self.points.into(),
            self.created_at.as_str().into(),
        ]
    }

    pub fn outcome(&self) -> Outcome {
        Outcome {
            placement: self.placement.unwrap_or(0),
            kills: self.kills.unwrap_or(0),
            did_win: self.did_win,
        }
    }

    /// Score recomputed from the raw outcome. The stored `points` column is
    /// informational; standings always rescore.
    pub fn score(&self) -> Score {
        score_result(self.game, &self.outcome())
    }

    pub fn family(&self) -> ScoringFamily {
        self.game.family()
    }
}
