use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::game::{Game, ScoringFamily};
use crate::team::Team;

/// Errors that reject a result submission outright.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("match id is required")]
    MissingMatchId,
    #[error("no result rows provided")]
    NoEntries,
    #[error("batch too large: {len} rows (max {max})")]
    BatchTooLarge { len: usize, max: usize },
    #[error("{game} is not scored by {expected}")]
    WrongFamily { game: Game, expected: &'static str },
    #[error("winner and loser must be different teams")]
    SameTeam,
    #[error("unknown team {id:?} for {game}")]
    UnknownTeam { id: String, game: Game },
}

/// The one place team names are normalised for matching.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A single row of a batch submission as typed by an organiser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub team_name: String,
    #[serde(default)]
    pub placement: u32,
    #[serde(default)]
    pub kills: u32,
}

/// One elimination result keyed by team id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EliminationSubmission {
    pub match_id: String,
    pub team_id: String,
    pub game: Game,
    #[serde(default)]
    pub placement: u32,
    #[serde(default)]
    pub kills: u32,
}

/// A whole lobby of elimination results keyed by team name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchSubmission {
    pub match_id: String,
    pub game: Game,
    #[serde(default)]
    pub entries: Vec<BatchEntry>,
}

fn head_to_head_default() -> Game {
    Game::ClashRoyale
}

/// A decided head-to-head match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeadToHeadSubmission {
    pub match_id: String,
    pub winner_id: String,
    pub loser_id: String,
    #[serde(default = "head_to_head_default")]
    pub game: Game,
}

impl HeadToHeadSubmission {
    pub fn check(&self) -> Result<(), IntakeError> {
        if self.match_id.trim().is_empty() {
            return Err(IntakeError::MissingMatchId);
        }
        require_family(self.game, ScoringFamily::HeadToHead)?;
        if self.winner_id.trim() == self.loser_id.trim() {
            return Err(IntakeError::SameTeam);
        }
        Ok(())
    }
}

impl EliminationSubmission {
    pub fn check(&self) -> Result<(), IntakeError> {
        if self.match_id.trim().is_empty() {
            return Err(IntakeError::MissingMatchId);
        }
        require_family(self.game, ScoringFamily::Elimination)
    }
}

/// Look up a team by id within a game.
pub fn find_team<'a>(teams: &'a [Team], id: &str, game: Game) -> Result<&'a Team, IntakeError> {
    let id = id.trim();
    teams
        .iter()
        .find(|t| t.id == id && t.game == game)
        .ok_or_else(|| IntakeError::UnknownTeam {
            id: id.to_string(),
            game,
        })
}

/// What a batch submission did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub appended: usize,
    pub unknown: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRef {
    pub id: String,
    pub name: String,
}

/// Active teams indexed by game and normalised name.
#[derive(Debug, Default)]
pub struct NameIndex {
    by_game: HashMap<Game, HashMap<String, TeamRef>>,
}

impl NameIndex {
    pub fn from_teams(teams: &[Team]) -> Self {
        let mut by_game: HashMap<Game, HashMap<String, TeamRef>> = HashMap::new();
        for team in teams.iter().filter(|t| t.is_active()) {
            let key = normalize_name(&team.name);
            if key.is_empty() {
                continue;
            }
            by_game.entry(team.game).or_default().insert(key, TeamRef {
                id: team.id.clone(),
                name: team.name.clone(),
            });
        }
        Self { by_game }
    }

    pub fn resolve(&self, game: Game, name: &str) -> Option<&TeamRef> {
        self.by_game.get(&game)?.get(&normalize_name(name))
    }

    /// Sorted display names of active teams, for every game.
    pub fn names_by_game(&self) -> BTreeMap<Game, Vec<String>> {
        Game::ALL
            .into_iter()
            .map(|g| {
                let mut names: Vec<String> = self
                    .by_game
                    .get(&g)
                    .map(|m| m.values().map(|t| t.name.clone()).collect())
                    .unwrap_or_default();
                names.sort();
                (g, names)
            })
            .collect()
    }
}

/// A batch entry matched to a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub team: TeamRef,
    pub placement: u32,
    pub kills: u32,
}

/// Split a batch into entries that matched an active team and the names
/// that did not. Blank names are dropped silently.
pub fn resolve_batch(
    index: &NameIndex,
    game: Game,
    entries: &[BatchEntry],
) -> (Vec<ResolvedEntry>, Vec<String>) {
    let mut resolved = Vec::with_capacity(entries.len());
    let mut unknown = Vec::new();
    for entry in entries {
        if entry.team_name.trim().is_empty() {
            continue;
        }
        match index.resolve(game, &entry.team_name) {
            Some(team) => resolved.push(ResolvedEntry {
                team: team.clone(),
                placement: entry.placement,
                kills: entry.kills,
            }),
            None => unknown.push(entry.team_name.clone()),
        }
    }
    (resolved, unknown)
}

/// Parse pasted CSV or TSV of `team_name,placement,kills`.
///
/// Lines with fewer than three fields are ignored, as is a header line and
/// any line whose placement is not a number.
pub fn parse_batch_text(text: &str) -> Vec<BatchEntry> {
    let mut entries = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let parts: Vec<&str> = line.split([',', '\t']).map(str::trim).collect();
        if parts.len() < 3 {
            continue;
        }
        let (name, placement, kills) = (parts[0], parts[1], parts[2]);
        let Ok(placement) = placement.parse::<u32>() else {
            let header = name.to_lowercase().contains("team")
                && placement.to_lowercase().contains("place");
            if !header {
                tracing::debug!(line, "skipping batch line with non-numeric placement");
            }
            continue;
        };
        if name.is_empty() {
            continue;
        }
        entries.push(BatchEntry {
            team_name: name.to_string(),
            placement,
            kills: kills.parse().unwrap_or(0),
        });
    }
    entries
}

/// Reject batches that cannot be submitted at all.
pub fn check_batch(match_id: &str, game: Game, len: usize, max: usize) -> Result<(), IntakeError> {
    if match_id.trim().is_empty() {
        return Err(IntakeError::MissingMatchId);
    }
    require_family(game, ScoringFamily::Elimination)?;
    if len == 0 {
        return Err(IntakeError::NoEntries);
    }
    if len > max {
        return Err(IntakeError::BatchTooLarge { len, max });
    }
    Ok(())
}

pub fn require_family(game: Game, family: ScoringFamily) -> Result<(), IntakeError> {
    if game.family() == family {
        return Ok(());
    }
    let expected = match family {
        ScoringFamily::Elimination => "placement and kills",
        ScoringFamily::HeadToHead => "win or loss",
    };
    Err(IntakeError::WrongFamily { game, expected })
}
