use serde::{Deserialize, Serialize};

/// A single spreadsheet cell.
///
/// Stores hand back heterogeneous values: unformatted numbers, booleans,
/// free text, or nothing at all for blank cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

pub type Row = Vec<Cell>;
pub type Grid = Vec<Row>;

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Cell contents rendered as text. Whole numbers print without a
    /// fractional part so ids typed as numbers round-trip cleanly.
    pub fn text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }

    /// Lenient numeric view: blanks and unparsable text read as zero.
    pub fn number(&self) -> f64 {
        match self {
            Self::Number(n) if n.is_finite() => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Non-negative integer view used for placements, kills and counters.
    pub fn count(&self) -> u32 {
        let n = self.number();
        if n <= 0.0 {
            0
        } else if n >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            n as u32
        }
    }

    /// True for a real boolean or the text `TRUE` in any case.
    pub fn is_true(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// Cell at `idx`, or an empty cell when the row is short. Stores trim
/// trailing blanks, so short rows are normal.
pub fn cell_at(row: &Row, idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&EMPTY_CELL)
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<u32> for Cell {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
