pub mod cell;
pub mod game;
pub mod intake;
pub mod layout;
pub mod leaderboard;
pub mod range;
pub mod registration;
pub mod result;
pub mod scoring;
pub mod standings;
pub mod store;
pub mod team;
pub mod time;
pub mod tournament;

pub use game::Game;
pub use store::{MemoryStore, RangeStore, StoreError};
pub use tournament::{Tournament, TournamentError};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::cell::{Cell, Grid, Row};
    use crate::game::Game;
    use crate::layout::{RESULT_HEADER, SheetLayout, TEAM_HEADER};
    use crate::registration::TeamRegistration;
    use crate::store::MemoryStore;
    use crate::team::{Team, TeamStatus};
    use crate::tournament::Tournament;

    /// An active team with zeroed counters.
    pub fn make_team(id: &str, name: &str, game: Game) -> Team {
        Team {
            id: id.to_string(),
            name: name.to_string(),
            game,
            college: "Test College".to_string(),
            captain_name: "Captain".to_string(),
            captain_email: "captain@example.com".to_string(),
            captain_phone: "9000000000".to_string(),
            status: TeamStatus::Active,
            players: vec![],
            points: 0,
            matches: 0,
            wins: 0,
        }
    }

    /// A registration that passes validation for any game.
    pub fn make_registration(team_name: &str, game: Game) -> TeamRegistration {
        TeamRegistration {
            team_name: team_name.to_string(),
            college: "Test College".to_string(),
            game,
            captain_name: "Captain".to_string(),
            captain_email: "captain@example.com".to_string(),
            captain_phone: "9000000000".to_string(),
            player2: Some("Player Two".to_string()),
            player3: Some("Player Three".to_string()),
            player4: Some("Player Four".to_string()),
            player5: None,
        }
    }

    fn header_row(header: &[&str]) -> Row {
        header.iter().map(|h| Cell::from(*h)).collect()
    }

    /// A store with both tabs and their headers, holding `teams`.
    pub fn seeded_store(teams: &[Team]) -> MemoryStore {
        let mut team_grid: Grid = vec![header_row(&TEAM_HEADER)];
        team_grid.extend(teams.iter().map(Team::to_row));
        MemoryStore::with_sheets([
            ("Teams", team_grid),
            ("Results", vec![header_row(&RESULT_HEADER)]),
        ])
    }

    /// A tournament over [`seeded_store`] with the default layout.
    pub fn seeded_tournament(teams: &[Team]) -> Tournament<MemoryStore> {
        Tournament::new(seeded_store(teams), SheetLayout::default())
    }
}
