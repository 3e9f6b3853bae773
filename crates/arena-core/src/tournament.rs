use std::collections::{BTreeMap, HashSet};

use tokio::sync::{Mutex, broadcast};

use crate::cell::Grid;
use crate::game::Game;
use crate::intake::{
    BatchEntry, BatchOutcome, BatchSubmission, EliminationSubmission, HeadToHeadSubmission,
    IntakeError, NameIndex, check_batch, find_team, parse_batch_text, resolve_batch,
};
use crate::layout::SheetLayout;
use crate::leaderboard::{self, Counts, LeaderboardRow};
use crate::range::A1Range;
use crate::registration::{RegistrationError, TeamRegistration, new_team_id};
use crate::result::MatchResult;
use crate::standings::{self, StandingsUpdate};
use crate::store::{RangeStore, StoreError, ensure_sheet};
use crate::team::{Team, teams_from_grid};
use crate::time::timestamp_now;

/// Default maximum number of rows accepted in one batch submission.
pub const DEFAULT_BATCH_LIMIT: usize = 100;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum TournamentError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// State guarded by the writer lock.
#[derive(Debug, Default)]
struct WriterState {
    /// Tabs already ensured during this process lifetime.
    ensured: HashSet<String>,
}

/// Tournament operations over a range store.
///
/// Every mutating operation runs under one writer lock, so an append and the
/// recompute that follows it never interleave with another submission's
/// write-back. Reads skip the lock.
pub struct Tournament<S> {
    store: S,
    layout: SheetLayout,
    writer: Mutex<WriterState>,
    updates: broadcast::Sender<StandingsUpdate>,
    batch_limit: usize,
}

impl<S: RangeStore> Tournament<S> {
    pub fn new(store: S, layout: SheetLayout) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            store,
            layout,
            writer: Mutex::new(WriterState::default()),
            updates,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }

    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    /// Receive a notification after every successful standings write.
    pub fn subscribe(&self) -> broadcast::Receiver<StandingsUpdate> {
        self.updates.subscribe()
    }

    // ---- reads ----

    /// Read for a read model: a missing tab or an unconfigured store reads
    /// as empty.
    async fn read_or_empty(&self, range: &A1Range) -> Result<Grid, StoreError> {
        match self.store.read(range).await {
            Ok(grid) => Ok(grid),
            Err(err @ (StoreError::NotFound(_) | StoreError::Unconfigured(_))) => {
                tracing::warn!(range = %range, error = %err, "read degraded to empty");
                Ok(Grid::new())
            },
            Err(err) => Err(err),
        }
    }

    /// Read ahead of a write: only a missing tab reads as empty.
    async fn read_for_write(&self, range: &A1Range) -> Result<Grid, StoreError> {
        match self.store.read(range).await {
            Err(StoreError::NotFound(_)) => Ok(Grid::new()),
            other => other,
        }
    }

    pub async fn teams(&self) -> Result<Vec<Team>, StoreError> {
        let rows = self.read_or_empty(&self.layout.teams_data()).await?;
        Ok(teams_from_grid(&rows))
    }

    pub async fn leaderboard(&self, game: Game) -> Result<Vec<LeaderboardRow>, StoreError> {
        Ok(leaderboard::leaderboard(&self.teams().await?, game))
    }

    pub async fn counts(&self) -> Result<Counts, StoreError> {
        Ok(leaderboard::counts(&self.teams().await?))
    }

    pub async fn winners(&self) -> Result<BTreeMap<Game, Team>, StoreError> {
        Ok(leaderboard::winners(&self.teams().await?))
    }

    pub async fn team_names_by_game(&self) -> Result<BTreeMap<Game, Vec<String>>, StoreError> {
        Ok(NameIndex::from_teams(&self.teams().await?).names_by_game())
    }

    // ---- writes ----

    pub async fn register_team(&self, reg: TeamRegistration) -> Result<Team, TournamentError> {
        reg.validate()?;
        let mut state = self.writer.lock().await;
        let existing = teams_from_grid(&self.read_for_write(&self.layout.teams_data()).await?);
        reg.check_unique(&existing)?;

        let id = new_team_id(reg.game);
        let team = reg.into_team(id);
        self.append_rows(&mut state, &self.layout.teams_append(), vec![team.to_row()])
            .await?;
        tracing::info!(team_id = %team.id, game = %team.game, "team registered");
        Ok(team)
    }

    pub async fn submit_elimination_result(
        &self,
        sub: EliminationSubmission,
    ) -> Result<MatchResult, TournamentError> {
        sub.check()?;
        let mut state = self.writer.lock().await;
        let teams = teams_from_grid(&self.read_for_write(&self.layout.teams_data()).await?);
        let team = find_team(&teams, &sub.team_id, sub.game)?;

        let result = MatchResult::elimination(
            sub.match_id.trim(),
            &team.id,
            sub.game,
            sub.placement,
            sub.kills,
            &timestamp_now(),
        );
        self.record_results(&mut state, sub.game, vec![result.to_row()])
            .await?;
        tracing::info!(
            match_id = %result.match_id,
            team_id = %result.team_id,
            points = result.points,
            "elimination result recorded"
        );
        Ok(result)
    }

    /// Resolve names, append every resolved row and report the names that
    /// matched no active team.
    pub async fn submit_elimination_batch(
        &self,
        sub: BatchSubmission,
    ) -> Result<BatchOutcome, TournamentError> {
        check_batch(&sub.match_id, sub.game, sub.entries.len(), self.batch_limit)?;
        let mut state = self.writer.lock().await;
        let teams = teams_from_grid(&self.read_for_write(&self.layout.teams_data()).await?);
        let index = NameIndex::from_teams(&teams);
        let (resolved, unknown) = resolve_batch(&index, sub.game, &sub.entries);

        let created_at = timestamp_now();
        let match_id = sub.match_id.trim();
        let rows: Grid = resolved
            .iter()
            .map(|entry| {
                MatchResult::elimination(
                    match_id,
                    &entry.team.id,
                    sub.game,
                    entry.placement,
                    entry.kills,
                    &created_at,
                )
                .to_row()
            })
            .collect();
        if !unknown.is_empty() {
            tracing::warn!(match_id, ?unknown, "batch contained unknown team names");
        }
        if !rows.is_empty() {
            self.record_results(&mut state, sub.game, rows).await?;
        }
        tracing::info!(match_id, appended = resolved.len(), "batch recorded");
        Ok(BatchOutcome {
            appended: resolved.len(),
            unknown,
        })
    }

    /// Batch submission from pasted CSV or TSV.
    pub async fn submit_batch_text(
        &self,
        match_id: String,
        game: Game,
        text: &str,
    ) -> Result<BatchOutcome, TournamentError> {
        let entries: Vec<BatchEntry> = parse_batch_text(text);
        self.submit_elimination_batch(BatchSubmission {
            match_id,
            game,
            entries,
        })
        .await
    }

    /// Record both sides of a head-to-head match and recompute that game.
    pub async fn submit_head_to_head(
        &self,
        sub: HeadToHeadSubmission,
    ) -> Result<[MatchResult; 2], TournamentError> {
        sub.check()?;
        let mut state = self.writer.lock().await;
        let teams = teams_from_grid(&self.read_for_write(&self.layout.teams_data()).await?);
        let winner = find_team(&teams, &sub.winner_id, sub.game)?;
        let loser = find_team(&teams, &sub.loser_id, sub.game)?;

        let created_at = timestamp_now();
        let match_id = sub.match_id.trim();
        let rows = [
            MatchResult::head_to_head(match_id, &winner.id, sub.game, true, &created_at),
            MatchResult::head_to_head(match_id, &loser.id, sub.game, false, &created_at),
        ];
        let grid = rows.iter().map(MatchResult::to_row).collect();
        self.record_results(&mut state, sub.game, grid).await?;
        tracing::info!(match_id, winner = %winner.id, loser = %loser.id, "head-to-head recorded");
        Ok(rows)
    }

    /// Rebuild the totals block from every result, or from one game's.
    pub async fn recompute_standings(
        &self,
        filter: Option<Game>,
    ) -> Result<StandingsUpdate, StoreError> {
        let _state = self.writer.lock().await;
        self.recompute_locked(filter).await
    }

    /// Must be called with the writer lock held.
    async fn recompute_locked(&self, filter: Option<Game>) -> Result<StandingsUpdate, StoreError> {
        let team_rows = self.read_for_write(&self.layout.teams_data()).await?;
        let result_rows = self.read_for_write(&self.layout.results_data()).await?;
        let update = StandingsUpdate {
            game: filter,
            teams: team_rows.len(),
        };
        if team_rows.is_empty() {
            tracing::debug!(game = ?filter, "no team rows, skipping standings write");
            return Ok(update);
        }

        let block = standings::recompute(&team_rows, &result_rows, filter);
        self.store
            .write(&self.layout.totals_block(block.len()), block)
            .await?;
        tracing::info!(game = ?filter, teams = update.teams, "standings written");
        // No receivers is fine
        let _ = self.updates.send(update.clone());
        Ok(update)
    }

    async fn ensure_tab(&self, state: &mut WriterState, tab: &str) -> Result<(), StoreError> {
        if state.ensured.contains(tab) {
            return Ok(());
        }
        let header = self.layout.header_for(tab).unwrap_or(&[]);
        ensure_sheet(&self.store, tab, header).await?;
        state.ensured.insert(tab.to_string());
        Ok(())
    }

    /// Append result rows in one request, then recompute `game` whether or
    /// not the append succeeded. The append error wins when both fail.
    async fn record_results(
        &self,
        state: &mut WriterState,
        game: Game,
        rows: Grid,
    ) -> Result<(), TournamentError> {
        let appended = self
            .append_rows(state, &self.layout.results_append(), rows)
            .await;
        if let Err(err) = &appended {
            tracing::warn!(game = %game, error = %err, "result append failed, recomputing anyway");
        }
        let recomputed = self.recompute_locked(Some(game)).await;
        appended?;
        recomputed?;
        Ok(())
    }

    /// Ensure the tab, append, and on a NotFound forget the tab, ensure it
    /// again and retry exactly once.
    async fn append_rows(
        &self,
        state: &mut WriterState,
        range: &A1Range,
        rows: Grid,
    ) -> Result<(), StoreError> {
        let tab = range.sheet();
        self.ensure_tab(state, tab).await?;
        match self.store.append(range, rows.clone()).await {
            Err(StoreError::NotFound(what)) => {
                tracing::warn!(tab, %what, "append target missing, ensuring tab and retrying");
                state.ensured.remove(tab);
                self.ensure_tab(state, tab).await?;
                self.store.append(range, rows).await
            },
            other => other,
        }
    }
}
