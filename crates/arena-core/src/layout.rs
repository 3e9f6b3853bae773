use serde::Deserialize;

use crate::range::{A1Range, column_letters};

/// Column positions on the Teams tab.
pub mod team_col {
    pub const ID: usize = 0;
    pub const NAME: usize = 1;
    pub const GAME: usize = 2;
    pub const COLLEGE: usize = 3;
    pub const CAPTAIN_NAME: usize = 4;
    pub const CAPTAIN_EMAIL: usize = 5;
    pub const STATUS: usize = 6;
    pub const POINTS: usize = 7;
    pub const MATCHES: usize = 8;
    pub const WINS: usize = 9;
    pub const CAPTAIN_PHONE: usize = 10;
    pub const PLAYER2: usize = 11;
    pub const PLAYER5: usize = 14;
    pub const COUNT: usize = 15;
}

/// Column positions on the Results tab.
pub mod result_col {
    pub const MATCH_ID: usize = 0;
    pub const TEAM_ID: usize = 1;
    pub const GAME: usize = 2;
    pub const PLACEMENT: usize = 3;
    pub const KILLS: usize = 4;
    pub const DID_WIN: usize = 5;
    pub const POINTS: usize = 6;
    pub const CREATED_AT: usize = 7;
    pub const COUNT: usize = 8;
}

pub const TEAM_HEADER: [&str; team_col::COUNT] = [
    "id",
    "team_name",
    "game",
    "college",
    "captain_name",
    "captain_email",
    "status",
    "points",
    "matches",
    "wins",
    "captain_phone",
    "player2",
    "player3",
    "player4",
    "player5",
];

pub const RESULT_HEADER: [&str; result_col::COUNT] = [
    "match_id",
    "team_id",
    "game",
    "placement",
    "kills",
    "did_win",
    "points",
    "created_at",
];

/// Where teams and results live in the backing spreadsheet. Row 1 of each
/// tab is a header; data starts on row 2.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub teams_tab: String,
    pub results_tab: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            teams_tab: "Teams".to_string(),
            results_tab: "Results".to_string(),
        }
    }
}

impl SheetLayout {
    fn data_range(tab: &str, columns: usize) -> A1Range {
        A1Range::new(tab, format!("A2:{}", column_letters(columns - 1)))
    }

    fn append_range(tab: &str, columns: usize) -> A1Range {
        A1Range::new(tab, format!("A:{}", column_letters(columns - 1)))
    }

    pub fn teams_data(&self) -> A1Range {
        Self::data_range(&self.teams_tab, team_col::COUNT)
    }

    pub fn teams_append(&self) -> A1Range {
        Self::append_range(&self.teams_tab, team_col::COUNT)
    }

    pub fn results_data(&self) -> A1Range {
        Self::data_range(&self.results_tab, result_col::COUNT)
    }

    pub fn results_append(&self) -> A1Range {
        Self::append_range(&self.results_tab, result_col::COUNT)
    }

    /// The points/matches/wins block for `rows` team rows, e.g. `Teams!H2:J41`.
    pub fn totals_block(&self, rows: usize) -> A1Range {
        A1Range::new(
            &self.teams_tab,
            format!(
                "{}2:{}{}",
                column_letters(team_col::POINTS),
                column_letters(team_col::WINS),
                rows + 1
            ),
        )
    }

    /// Header row for a tab managed by this layout.
    pub fn header_for(&self, tab: &str) -> Option<&'static [&'static str]> {
        if tab == self.teams_tab {
            Some(&TEAM_HEADER[..])
        } else if tab == self.results_tab {
            Some(&RESULT_HEADER[..])
        } else {
            None
        }
    }
}
