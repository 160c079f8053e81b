//! Job-card board: cards grouped into one column per workflow status.
//!
//! Moves are applied locally first and then saved with a status PATCH;
//! a failed save puts the card back where it was.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ApiError, ShopApi};
use crate::models::{JobCard, JobStatus};

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Job card {0} is not on the board")]
    UnknownCard(i64),

    #[error("Failed to save job card move: {0}")]
    Sync(#[from] ApiError),
}

/// A move applied to the board, with enough detail to undo it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardMove {
    pub id: i64,
    pub from: JobStatus,
    pub from_index: usize,
    pub to: JobStatus,
    pub to_index: usize,
}

impl CardMove {
    pub fn changes_status(&self) -> bool {
        self.from != self.to
    }

    /// Body for `PATCH /jobcards/{id}/`, if the backend needs to know
    pub fn status_patch(&self) -> Option<Value> {
        self.changes_status()
            .then(|| json!({ "status": self.to.as_str() }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobBoard {
    columns: [Vec<JobCard>; JobStatus::COUNT],
}

impl JobBoard {
    pub fn from_cards(cards: Vec<JobCard>) -> Self {
        let mut board = Self::default();
        for card in cards {
            board.columns[card.status.index()].push(card);
        }
        for column in &mut board.columns {
            column.sort_by_key(|card| (card.position, card.id));
        }
        board
    }

    pub fn column(&self, status: JobStatus) -> &[JobCard] {
        &self.columns[status.index()]
    }

    /// Columns in workflow order
    pub fn columns(&self) -> impl Iterator<Item = (JobStatus, &[JobCard])> {
        JobStatus::ALL
            .into_iter()
            .map(move |status| (status, self.column(status)))
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column and index of a card
    pub fn locate(&self, id: i64) -> Option<(JobStatus, usize)> {
        self.columns().find_map(|(status, cards)| {
            cards
                .iter()
                .position(|card| card.id == id)
                .map(|index| (status, index))
        })
    }

    pub fn card(&self, id: i64) -> Option<&JobCard> {
        self.locate(id)
            .map(|(status, index)| &self.columns[status.index()][index])
    }

    /// Move a card to `to_index` in the `to` column. The index is clamped
    /// to the column length, so `usize::MAX` appends.
    pub fn move_card(&mut self, id: i64, to: JobStatus, to_index: usize) -> Result<CardMove, BoardError> {
        let (from, from_index) = self.locate(id).ok_or(BoardError::UnknownCard(id))?;

        let mut card = self.columns[from.index()].remove(from_index);
        card.status = to;

        let target = &mut self.columns[to.index()];
        let to_index = to_index.min(target.len());
        target.insert(to_index, card);

        self.renumber(from);
        if to != from {
            self.renumber(to);
        }

        debug!(id, from = from.as_str(), to = to.as_str(), to_index, "Moved job card");
        Ok(CardMove {
            id,
            from,
            from_index,
            to,
            to_index,
        })
    }

    /// Undo a move returned by [`JobBoard::move_card`].
    pub fn revert(&mut self, applied: &CardMove) -> Result<(), BoardError> {
        self.move_card(applied.id, applied.from, applied.from_index)
            .map(|_| ())
    }

    /// Move a card and save the new status. If the save fails the card is
    /// returned to its original place and the error is reported.
    pub async fn move_and_save(
        &mut self,
        shop: &ShopApi,
        id: i64,
        to: JobStatus,
        to_index: usize,
    ) -> Result<CardMove, BoardError> {
        let applied = self.move_card(id, to, to_index)?;
        if !applied.changes_status() {
            return Ok(applied);
        }

        match shop.set_job_status(id, to).await {
            Ok(_) => Ok(applied),
            Err(e) => {
                warn!(id, error = %e, "Saving job card status failed, reverting move");
                self.revert(&applied)?;
                Err(BoardError::Sync(e))
            }
        }
    }

    fn renumber(&mut self, status: JobStatus) {
        for (index, card) in self.columns[status.index()].iter_mut().enumerate() {
            card.position = index as i64;
        }
    }
}
