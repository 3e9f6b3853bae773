use serde::Deserialize;

use crate::game::{Game, ScoringFamily};
use crate::intake::normalize_name;
use crate::scoring::Score;
use crate::team::{Team, TeamStatus};

const MIN_NAME_LEN: usize = 2;
const MIN_PHONE_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: &'static str,
    },
    #[error("a team named {name:?} is already registered for {game}")]
    DuplicateName { name: String, game: Game },
}

/// A team sign-up as submitted by a captain.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamRegistration {
    pub team_name: String,
    pub college: String,
    pub game: Game,
    pub captain_name: String,
    pub captain_email: String,
    pub captain_phone: String,
    #[serde(default)]
    pub player2: Option<String>,
    #[serde(default)]
    pub player3: Option<String>,
    #[serde(default)]
    pub player4: Option<String>,
    #[serde(default)]
    pub player5: Option<String>,
}

fn invalid(field: &'static str, message: &'static str) -> RegistrationError {
    RegistrationError::Invalid { field, message }
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

impl TeamRegistration {
    /// Field checks from the sign-up form. Squad games need players 2-4;
    /// Clash Royale is solo.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.team_name.trim().chars().count() < MIN_NAME_LEN {
            return Err(invalid("team_name", "Team name is required"));
        }
        if self.college.trim().chars().count() < MIN_NAME_LEN {
            return Err(invalid("college", "College is required"));
        }
        if self.captain_name.trim().chars().count() < MIN_NAME_LEN {
            return Err(invalid("captain_name", "Captain name is required"));
        }
        if !looks_like_email(self.captain_email.trim()) {
            return Err(invalid("captain_email", "Valid email required"));
        }
        if self.captain_phone.trim().chars().count() < MIN_PHONE_LEN {
            return Err(invalid("captain_phone", "Phone required"));
        }
        if self.game.family() == ScoringFamily::Elimination {
            for (field, value) in [
                ("player2", &self.player2),
                ("player3", &self.player3),
                ("player4", &self.player4),
            ] {
                let ok = value
                    .as_deref()
                    .is_some_and(|v| v.trim().chars().count() >= MIN_NAME_LEN);
                if !ok {
                    return Err(invalid(field, "Required for squad games"));
                }
            }
        }
        Ok(())
    }

    /// Reject a name already taken by an active team in the same game.
    pub fn check_unique(&self, existing: &[Team]) -> Result<(), RegistrationError> {
        let wanted = normalize_name(&self.team_name);
        let taken = existing
            .iter()
            .any(|t| t.game == self.game && t.is_active() && normalize_name(&t.name) == wanted);
        if taken {
            return Err(RegistrationError::DuplicateName {
                name: self.team_name.trim().to_string(),
                game: self.game,
            });
        }
        Ok(())
    }

    /// Build the team row to store, with zeroed counters.
    pub fn into_team(self, id: String) -> Team {
        let players = if self.game.family() == ScoringFamily::Elimination {
            [self.player2, self.player3, self.player4, self.player5]
                .into_iter()
                .flatten()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        } else {
            Vec::new()
        };
        let score = Score::default();
        Team {
            id,
            name: self.team_name.trim().to_string(),
            game: self.game,
            college: self.college.trim().to_string(),
            captain_name: self.captain_name.trim().to_string(),
            captain_email: self.captain_email.trim().to_string(),
            captain_phone: self.captain_phone.trim().to_string(),
            status: TeamStatus::Active,
            players,
            points: score.points,
            matches: score.matches,
            wins: score.wins,
        }
    }
}

/// Team id such as `FF-3f9a1c2b`.
pub fn new_team_id(game: Game) -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", game.code(), &uuid[..8])
}
