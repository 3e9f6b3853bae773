use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, Row, cell_at};
use crate::game::Game;
use crate::layout::team_col;
use crate::scoring::Score;

/// Registration state of a team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamStatus {
    #[default]
    Active,
    Archived,
    Withdrawn,
    Disqualified,
}

impl TeamStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Withdrawn => "withdrawn",
            Self::Disqualified => "disqualified",
        }
    }

    /// Status from a sheet cell. Organisers edit this column by hand, so
    /// anything unrecognised (including blank) counts as active.
    pub fn from_cell(cell: &Cell) -> Self {
        match cell.text().to_ascii_lowercase().as_str() {
            "archived" => Self::Archived,
            "withdrawn" => Self::Withdrawn,
            "disqualified" => Self::Disqualified,
            _ => Self::Active,
        }
    }
}

impl fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered team as stored on the Teams tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub game: Game,
    pub college: String,
    pub captain_name: String,
    pub captain_email: String,
    #[serde(default)]
    pub captain_phone: String,
    pub status: TeamStatus,
    #[serde(default)]
    pub players: Vec<String>,
    pub points: u32,
    pub matches: u32,
    pub wins: u32,
}

impl Team {
    /// Parse a Teams row. Rows with a blank id or an unrecognised game are
    /// not teams and yield `None`.
    pub fn from_row(row: &Row) -> Option<Self> {
        let id = cell_at(row, team_col::ID).text();
        if id.is_empty() {
            return None;
        }
        let game = cell_at(row, team_col::GAME).text().parse::<Game>().ok()?;
        let players = (team_col::PLAYER2..=team_col::PLAYER5)
            .map(|i| cell_at(row, i).text())
            .filter(|p| !p.is_empty())
            .collect();
        Some(Self {
            id,
            name: cell_at(row, team_col::NAME).text(),
            game,
            college: cell_at(row, team_col::COLLEGE).text(),
            captain_name: cell_at(row, team_col::CAPTAIN_NAME).text(),
            captain_email: cell_at(row, team_col::CAPTAIN_EMAIL).text(),
            captain_phone: cell_at(row, team_col::CAPTAIN_PHONE).text(),
            status: TeamStatus::from_cell(cell_at(row, team_col::STATUS)),
            players,
            points: cell_at(row, team_col::POINTS).count(),
            matches: cell_at(row, team_col::MATCHES).count(),
            wins: cell_at(row, team_col::WINS).count(),
        })
    }

    /// Full Teams row in column order.
    pub fn to_row(&self) -> Row {
        let mut row: Row = vec![
            self.id.as_str().into(),
            self.name.as_str().into(),
            self.game.as_str().into(),
            self.college.as_str().into(),
            self.captain_name.as_str().into(),
            self.captain_email.as_str().into(),
            self.status.as_str().into(),
            self.points.into(),
            self.matches.into(),
            self.wins.into(),
            self.captain_phone.as_str().into(),
        ];
        for i in 0..=(team_col::PLAYER5 - team_col::PLAYER2) {
            row.push(
                self.players
                    .get(i)
                    .map(|p| Cell::from(p.as_str()))
                    .unwrap_or_else(|| Cell::from("")),
            );
        }
        row
    }

    pub fn score(&self) -> Score {
        Score {
            points: self.points,
            matches: self.matches,
            wins: self.wins,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TeamStatus::Active
    }
}

/// Parse every team on the tab, skipping rows that are not teams.
pub fn teams_from_grid(rows: &[Row]) -> Vec<Team> {
    rows.iter().filter_map(Team::from_row).collect()
}
