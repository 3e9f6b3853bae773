use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three titles the tournament runs. The serialized names are the
/// literal values stored in the sheet's `game` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Game {
    #[serde(rename = "BGMI")]
    Bgmi,
    #[serde(rename = "Free Fire")]
    FreeFire,
    #[serde(rename = "Clash Royale")]
    ClashRoyale,
}

/// How a game's matches turn into points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringFamily {
    /// Battle-royale lobbies scored by placement and kills.
    Elimination,
    /// One-on-one matches scored by win or loss.
    HeadToHead,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown game {0:?}")]
pub struct UnknownGame(pub String);

impl Game {
    pub const ALL: [Game; 3] = [Game::Bgmi, Game::FreeFire, Game::ClashRoyale];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bgmi => "BGMI",
            Self::FreeFire => "Free Fire",
            Self::ClashRoyale => "Clash Royale",
        }
    }

    /// Short prefix used in generated team ids.
    pub fn code(self) -> &'static str {
        match self {
            Self::Bgmi => "BGMI",
            Self::FreeFire => "FF",
            Self::ClashRoyale => "CR",
        }
    }

    pub fn family(self) -> ScoringFamily {
        match self {
            Self::Bgmi | Self::FreeFire => ScoringFamily::Elimination,
            Self::ClashRoyale => ScoringFamily::HeadToHead,
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Game {
    type Err = UnknownGame;

    /// Accepts the stored names case-insensitively, ignoring surrounding
    /// whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        Game::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| UnknownGame(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stored_names() {
        assert_eq!("BGMI".parse::<Game>().unwrap(), Game::Bgmi);
        assert_eq!(" free fire ".parse::<Game>().unwrap(), Game::FreeFire);
        assert_eq!("Clash Royale".parse::<Game>().unwrap(), Game::ClashRoyale);
        assert!("Valorant".parse::<Game>().is_err());
    }

    #[test]
    fn json_uses_sheet_names() {
        assert_eq!(serde_json::to_string(&Game::FreeFire).unwrap(), "\"Free Fire\"");
        let g: Game = serde_json::from_str("\"Clash Royale\"").unwrap();
        assert_eq!(g, Game::ClashRoyale);
    }

    #[test]
    fn families() {
        assert_eq!(Game::Bgmi.family(), ScoringFamily::Elimination);
        assert_eq!(Game::FreeFire.family(), ScoringFamily::Elimination);
        assert_eq!(Game::ClashRoyale.family(), ScoringFamily::HeadToHead);
    }
}
