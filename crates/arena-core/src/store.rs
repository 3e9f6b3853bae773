use std::collections::BTreeMap;
use std::future::Future;

use tokio::sync::RwLock;

use crate::cell::{Cell, Grid, Row};
use crate::range::{A1Range, CellSpan, RangeError, column_letters};

/// Failures reported by a range store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Credentials or spreadsheet id are missing.
    #[error("store is not configured: {0}")]
    Unconfigured(String),
    /// The tab or range does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    InvalidRange(#[from] RangeError),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// A spreadsheet-like datastore addressed by tab name and A1 range.
pub trait RangeStore: Send + Sync {
    /// Values inside `range`, row-major, with trailing blanks trimmed.
    fn read(&self, range: &A1Range) -> impl Future<Output = Result<Grid, StoreError>> + Send;

    /// Append `rows`, in order and as one request, after the last populated
    /// row of the table at `range`.
    fn append(
        &self,
        range: &A1Range,
        rows: Grid,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite the cells starting at the top-left of `range`.
    fn write(
        &self,
        range: &A1Range,
        grid: Grid,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Titles of every tab.
    fn list_sheets(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Create an empty tab.
    fn add_sheet(&self, title: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Make sure `title` exists and, when a header is given, that its first row
/// holds it. An existing non-empty first row is left alone.
pub async fn ensure_sheet<S: RangeStore>(
    store: &S,
    title: &str,
    header: &[&str],
) -> Result<(), StoreError> {
    let titles = store.list_sheets().await?;
    let created = !titles.iter().any(|t| t == title);
    if created {
        tracing::info!(tab = title, "creating missing tab");
        store.add_sheet(title).await?;
    }
    if header.is_empty() {
        return Ok(());
    }

    let header_range = A1Range::new(title, format!("A1:{}1", column_letters(header.len() - 1)));
    let needs_header = if created {
        true
    } else {
        let first = store.read(&A1Range::new(title, "1:1")).await?;
        first
            .first()
            .is_none_or(|row| row.iter().all(Cell::is_blank))
    };
    if needs_header {
        tracing::debug!(tab = title, "seeding header row");
        let row: Row = header.iter().map(|h| Cell::from(*h)).collect();
        store.write(&header_range, vec![row]).await?;
    }
    Ok(())
}

/// In-process store holding each tab as a grid. Used when no spreadsheet is
/// configured and throughout the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: RwLock<BTreeMap<String, Grid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given tabs.
    pub fn with_sheets<I, S>(sheets: I) -> Self
    where
        I: IntoIterator<Item = (S, Grid)>,
        S: Into<String>,
    {
        Self {
            sheets: RwLock::new(sheets.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Whole tab contents, untrimmed.
    pub async fn snapshot(&self, title: &str) -> Option<Grid> {
        self.sheets.read().await.get(title).cloned()
    }
}

fn not_found(range: &A1Range) -> StoreError {
    StoreError::NotFound(range.to_string())
}

fn trim_row(mut row: Row) -> Row {
    while row.last().is_some_and(|c| *c == Cell::Empty) {
        row.pop();
    }
    row
}

fn extract(grid: &Grid, span: &CellSpan) -> Grid {
    let last_row = span
        .last_row
        .map_or(grid.len(), |r| (r + 1).min(grid.len()));
    let mut out: Grid = (span.first_row..last_row)
        .map(|r| {
            let row = &grid[r];
            let end = span.last_col.map_or(row.len(), |c| (c + 1).min(row.len()));
            let cells = if span.first_col < end {
                row[span.first_col..end].to_vec()
            } else {
                Vec::new()
            };
            trim_row(cells)
        })
        .collect();
    while out.last().is_some_and(Vec::is_empty) {
        out.pop();
    }
    out
}

fn place(grid: &mut Grid, top: usize, left: usize, values: Grid) {
    for (i, row) in values.into_iter().enumerate() {
        let r = top + i;
        if grid.len() <= r {
            grid.resize(r + 1, Vec::new());
        }
        let target = &mut grid[r];
        for (j, cell) in row.into_iter().enumerate() {
            let c = left + j;
            if target.len() <= c {
                target.resize(c + 1, Cell::Empty);
            }
            target[c] = cell;
        }
    }
}

impl RangeStore for MemoryStore {
    async fn read(&self, range: &A1Range) -> Result<Grid, StoreError> {
        let span = range.span()?;
        let sheets = self.sheets.read().await;
        let grid = sheets.get(range.sheet()).ok_or_else(|| not_found(range))?;
        Ok(extract(grid, &span))
    }

    async fn append(&self, range: &A1Range, rows: Grid) -> Result<(), StoreError> {
        let span = range.span()?;
        let mut sheets = self.sheets.write().await;
        let grid = sheets
            .get_mut(range.sheet())
            .ok_or_else(|| not_found(range))?;
        let occupied = grid
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_blank()))
            .map_or(0, |i| i + 1);
        let top = occupied.max(span.first_row);
        place(grid, top, span.first_col, rows);
        Ok(())
    }

    async fn write(&self, range: &A1Range, values: Grid) -> Result<(), StoreError> {
        let span = range.span()?;
        let mut sheets = self.sheets.write().await;
        let grid = sheets
            .get_mut(range.sheet())
            .ok_or_else(|| not_found(range))?;
        place(grid, span.first_row, span.first_col, values);
        Ok(())
    }

    async fn list_sheets(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.sheets.read().await.keys().cloned().collect())
    }

    async fn add_sheet(&self, title: &str) -> Result<(), StoreError> {
        let mut sheets = self.sheets.write().await;
        if sheets.contains_key(title) {
            return Err(StoreError::Backend(format!("tab {title:?} already exists")));
        }
        sheets.insert(title.to_string(), Grid::new());
        Ok(())
    }
}
