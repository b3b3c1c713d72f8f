//! Grid controller: the single owner of a [`Table`].
//!
//! Routes edits through the store, records them in the [`EditLog`], publishes
//! [`GridEvent`]s on the injected [`EventBus`], and schedules coalesced
//! snapshot writes. All calls run to completion synchronously; time is
//! passed in explicitly so the caller's event loop drives persistence.
//!
//! Writes are two-phase: [`GridController::begin_persist`] hands out encoded
//! bytes with a ticket, the caller stores them (possibly asynchronously) and
//! reports back through [`GridController::finish_persist`]. While a ticket is
//! out, further edits collapse into a single follow-up write.

use crate::error::{GridError, Result};
use crate::events::{EventBus, GridEvent};
use crate::history::{EditEntry, EditLog};
use crate::persist::{
    PersistConfig, PersistScheduler, PersistState, PersistStats, PersistTicket, RecordStore,
};
use crate::store::{PersistedRecord, SortAction, SortOutcome, Table, TableConfig};

pub struct GridController {
    table: Table,
    bus: EventBus,
    history: EditLog,
    scheduler: PersistScheduler,
    table_id: String,
}

impl GridController {
    /// Create a controller around a new empty table.
    pub fn new(table: &TableConfig, persist: &PersistConfig, bus: EventBus) -> Result<Self> {
        Ok(Self::from_table(Table::new(table)?, persist, bus))
    }

    /// Take ownership of an existing table.
    #[must_use]
    pub fn from_table(table: Table, persist: &PersistConfig, bus: EventBus) -> Self {
        Self {
            table,
            bus,
            history: EditLog::default(),
            scheduler: PersistScheduler::new(persist.coalesce_ms),
            table_id: persist.table_id.clone(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn history(&self) -> &EditLog {
        &self.history
    }

    #[must_use]
    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    // ---- Edits ----

    /// Set a cell by storage row. Returns whether the value changed.
    ///
    /// Writing the current value is not recorded, published, or persisted.
    pub fn set_cell(&mut self, row: u32, col: usize, value: &str, now: f64) -> Result<bool> {
        let old = self.table.value(row, col)?.to_string();
        if old == value {
            return Ok(false);
        }
        self.table.set_value(row, col, value)?;
        let entry = EditEntry {
            row,
            col,
            old,
            new: value.to_string(),
        };
        self.after_edit(&entry, now);
        self.history.record(entry);
        Ok(true)
    }

    /// Set a cell addressed by its current view row.
    pub fn set_display_cell(
        &mut self,
        view_row: u32,
        col: usize,
        value: &str,
        now: f64,
    ) -> Result<bool> {
        let row = self.table.storage_row(view_row)?;
        self.set_cell(row, col, value, now)
    }

    /// Append a row; it shows up at the tail of the current view.
    pub fn add_row(&mut self, now: f64) -> Result<u32> {
        let row = self.table.add_row()?;
        self.scheduler.note_mutation(now);
        self.bus.publish(&GridEvent::RowAdded { row });
        Ok(row)
    }

    /// Revert the last edit. Returns `false` when there is nothing to undo.
    ///
    /// The log only moves once the table accepted the edit.
    pub fn undo(&mut self, now: f64) -> Result<bool> {
        let Some(entry) = self.history.peek_undo() else {
            return Ok(false);
        };
        self.apply_logged(&entry, now)?;
        self.history.undo();
        Ok(true)
    }

    /// Re-apply the last undone edit.
    pub fn redo(&mut self, now: f64) -> Result<bool> {
        let Some(entry) = self.history.peek_redo() else {
            return Ok(false);
        };
        self.apply_logged(&entry, now)?;
        self.history.redo();
        Ok(true)
    }

    fn apply_logged(&mut self, entry: &EditEntry, now: f64) -> Result<()> {
        self.table.set_value(entry.row, entry.col, &entry.new)?;
        self.after_edit(entry, now);
        Ok(())
    }

    fn after_edit(&mut self, entry: &EditEntry, now: f64) {
        self.scheduler.note_mutation(now);
        self.bus.publish(&GridEvent::CellChanged {
            row: entry.row,
            col: entry.col,
            old: entry.old.clone(),
            new: entry.new.clone(),
        });
    }

    // ---- Ordering ----

    pub fn sort_by_column(&mut self, col: usize, ascending: bool) -> Result<SortOutcome> {
        let outcome = self.table.sort_by_column(col, ascending)?;
        self.bus.publish(&GridEvent::Sorted {
            column: col,
            ascending,
            rows: outcome.rows_affected,
            elapsed_ms: outcome.elapsed.as_secs_f64() * 1000.0,
        });
        Ok(outcome)
    }

    pub fn reset_order(&mut self) {
        self.table.reset_display_order();
        self.bus.publish(&GridEvent::OrderReset);
    }

    /// Header click: ascending, then descending, then back to storage order.
    pub fn click_header(&mut self, col: usize) -> Result<SortAction> {
        let action = SortAction::next(self.table.sort_status(), col);
        match action {
            SortAction::Sort { column, ascending } => {
                self.sort_by_column(column, ascending)?;
            }
            SortAction::Reset => self.reset_order(),
        }
        Ok(action)
    }

    // ---- Persistence ----

    #[must_use]
    pub fn persist_state(&self) -> PersistState {
        self.scheduler.state()
    }

    #[must_use]
    pub fn persist_stats(&self) -> &PersistStats {
        self.scheduler.stats()
    }

    /// Drop the in-flight write; its data will be written again later.
    ///
    /// A `finish_persist` for the dropped ticket is ignored.
    pub fn cancel_persist(&mut self) {
        self.scheduler.cancel();
    }

    /// Start a write if the coalescing window has closed and no other write
    /// is out. Returns the ticket and the encoded record of the current state.
    pub fn begin_persist(&mut self, now: f64) -> Result<Option<(PersistTicket, Vec<u8>)>> {
        let Some(ticket) = self.scheduler.poll(now) else {
            return Ok(None);
        };
        match PersistedRecord::new(&self.table_id, self.table.snapshot()).to_bytes() {
            Ok(bytes) => Ok(Some((ticket, bytes))),
            Err(e) => {
                self.finish_persist(ticket, Err(e.to_string()), now);
                Err(e)
            }
        }
    }

    /// Report how the write for `ticket` ended.
    ///
    /// Failures are advisory: they publish [`GridEvent::PersistFailed`] and
    /// re-arm a retry, the table is never touched. Returns `false` for a
    /// stale or cancelled ticket.
    pub fn finish_persist(
        &mut self,
        ticket: PersistTicket,
        outcome: std::result::Result<usize, String>,
        now: f64,
    ) -> bool {
        let failure = outcome.as_ref().err().cloned();
        if !self.scheduler.complete(ticket, outcome, now) {
            return false;
        }
        if let Some(message) = failure {
            self.bus.publish(&GridEvent::PersistFailed { message });
        }
        true
    }

    /// Synchronous write through `store` if one is due.
    ///
    /// Returns the number of bytes written, `None` if nothing was due. A
    /// store failure is returned as an error but the table is untouched and
    /// the write will be retried on a later call.
    pub fn flush(&mut self, now: f64, store: &mut dyn RecordStore) -> Result<Option<usize>> {
        let Some((ticket, bytes)) = self.begin_persist(now)? else {
            return Ok(None);
        };
        match store.save(&self.table_id, &bytes) {
            Ok(()) => {
                self.finish_persist(ticket, Ok(bytes.len()), now);
                Ok(Some(bytes.len()))
            }
            Err(e) => {
                self.finish_persist(ticket, Err(e.to_string()), now);
                Err(e)
            }
        }
    }

    /// Restore the table from `store`. Returns `false` if no record exists.
    ///
    /// A record that fails to decode or validate leaves the table as it was.
    /// The edit log is cleared on success.
    pub fn load(&mut self, store: &dyn RecordStore) -> Result<bool> {
        let Some(bytes) = store.load(&self.table_id)? else {
            return Ok(false);
        };
        let record = PersistedRecord::from_bytes(&bytes)?;
        if record.table_id != self.table_id {
            return Err(GridError::MalformedSnapshot(format!(
                "record belongs to table '{}', expected '{}'",
                record.table_id, self.table_id
            )));
        }
        self.table.restore(&record.snapshot)?;
        self.history.clear();
        self.bus.publish(&GridEvent::Restored {
            rows: self.table.occupied_rows(),
        });
        Ok(true)
    }
}
