use std::fmt;
use std::str::FromStr;

/// Errors produced while parsing an A1-style range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("range has no sheet name: {0:?}")]
    MissingSheet(String),
    #[error("invalid cell reference {0:?}")]
    InvalidCell(String),
}

/// A sheet-qualified range such as `Teams!A2:O` or `'Round 1'!H2:J40`.
///
/// A range without a span addresses the whole tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct A1Range {
    sheet: String,
    span: Option<String>,
}

impl A1Range {
    pub fn new(sheet: impl Into<String>, span: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            span: Some(span.into()),
        }
    }

    /// Range covering an entire tab.
    pub fn whole(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            span: None,
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn span_str(&self) -> Option<&str> {
        self.span.as_deref()
    }

    /// Parsed cell span. A whole-tab range yields an unbounded span.
    pub fn span(&self) -> Result<CellSpan, RangeError> {
        match &self.span {
            None => Ok(CellSpan::UNBOUNDED),
            Some(s) => s.parse(),
        }
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = !self.sheet.is_empty()
            && self
                .sheet
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if plain {
            write!(f, "{}", self.sheet)?;
        } else {
            write!(f, "'{}'", self.sheet.replace('\'', "''"))?;
        }
        if let Some(ref span) = self.span {
            write!(f, "!{span}")?;
        }
        Ok(())
    }
}

impl FromStr for A1Range {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sheet, rest) = if let Some(quoted) = s.strip_prefix('\'') {
            // '' inside a quoted name is an escaped quote
            let mut name = String::new();
            let mut chars = quoted.char_indices().peekable();
            let mut end = None;
            while let Some((i, c)) = chars.next() {
                if c == '\'' {
                    if matches!(chars.peek(), Some((_, '\''))) {
                        name.push('\'');
                        chars.next();
                    } else {
                        end = Some(i + 1);
                        break;
                    }
                } else {
                    name.push(c);
                }
            }
            let Some(end) = end else {
                return Err(RangeError::MissingSheet(s.to_string()));
            };
            (name, &quoted[end..])
        } else {
            match s.split_once('!') {
                Some((sheet, _)) => (sheet.to_string(), &s[sheet.len()..]),
                None => (s.to_string(), ""),
            }
        };

        if sheet.is_empty() {
            return Err(RangeError::MissingSheet(s.to_string()));
        }

        let span = match rest.strip_prefix('!') {
            Some(span) if !span.is_empty() => {
                span.parse::<CellSpan>()?;
                Some(span.to_string())
            },
            Some(_) => None,
            None if rest.is_empty() => None,
            None => return Err(RangeError::InvalidCell(rest.to_string())),
        };

        Ok(Self { sheet, span })
    }
}

/// One end of a span. Either coordinate may be open (`A` is a whole
/// column, `2` a whole row). Both are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub col: Option<usize>,
    pub row: Option<usize>,
}

impl FromStr for CellRef {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(s.len());
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() && digits.is_empty() {
            return Err(RangeError::InvalidCell(s.to_string()));
        }
        let col = if letters.is_empty() {
            None
        } else {
            Some(column_index(letters).ok_or_else(|| RangeError::InvalidCell(s.to_string()))?)
        };
        let row = if digits.is_empty() {
            None
        } else {
            let n: usize = digits
                .parse()
                .map_err(|_| RangeError::InvalidCell(s.to_string()))?;
            if n == 0 {
                return Err(RangeError::InvalidCell(s.to_string()));
            }
            Some(n - 1)
        };
        Ok(Self { col, row })
    }
}

/// Rectangular span inside a tab with inclusive, possibly open, bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    pub first_row: usize,
    pub last_row: Option<usize>,
    pub first_col: usize,
    pub last_col: Option<usize>,
}

impl CellSpan {
    pub const UNBOUNDED: CellSpan = CellSpan {
        first_row: 0,
        last_row: None,
        first_col: 0,
        last_col: None,
    };
}

impl FromStr for CellSpan {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = match s.split_once(':') {
            Some((a, b)) => (a.parse::<CellRef>()?, Some(b.parse::<CellRef>()?)),
            None => (s.parse::<CellRef>()?, None),
        };
        let span = match end {
            Some(end) => CellSpan {
                first_row: start.row.unwrap_or(0),
                last_row: end.row,
                first_col: start.col.unwrap_or(0),
                last_col: end.col,
            },
            None => CellSpan {
                first_row: start.row.unwrap_or(0),
                last_row: start.row,
                first_col: start.col.unwrap_or(0),
                last_col: start.col,
            },
        };
        Ok(span)
    }
}

/// `A` → 0, `Z` → 25, `AA` → 26.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut idx = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let v = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        idx = idx.checked_mul(26)?.checked_add(v)?;
    }
    Some(idx - 1)
}

/// Inverse of [`column_index`].
pub fn column_letters(mut idx: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
