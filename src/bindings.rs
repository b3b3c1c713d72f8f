//! JavaScript surface (wasm32 only).
//!
//! `XlGrid` wraps a [`GridController`]. The JS side owns rendering, DOM
//! events, and the actual byte store; it calls in here for data and passes a
//! callback to receive [`GridEvent`]s.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Uint8Array};
use wasm_bindgen::prelude::*;

use crate::clock::now_ms;
use crate::controller::GridController;
use crate::events::{EventBus, GridEvent};
use crate::persist::{PersistConfig, PersistTicket, RecordStore};
use crate::store::{PersistedRecord, SortAction, TableConfig};

/// Forwards `log` records to the browser console.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[xlgrid] {}", record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            log::Level::Info => web_sys::console::info_1(&msg),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&msg),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Install the panic hook and console logger. Safe to call more than once.
#[wasm_bindgen]
pub fn init_logging(verbose: bool) {
    console_error_panic_hook::set_once();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        });
    }
}

/// Store adapter over a single JS-provided byte buffer.
#[derive(Default)]
struct BufferStore {
    key: String,
    bytes: Option<Vec<u8>>,
}

impl RecordStore for BufferStore {
    fn load(&self, key: &str) -> crate::error::Result<Option<Vec<u8>>> {
        Ok(self.bytes.clone().filter(|_| self.key == key))
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> crate::error::Result<()> {
        self.key = key.to_string();
        self.bytes = Some(bytes.to_vec());
        Ok(())
    }
}

/// One outstanding record write handed to JavaScript.
#[wasm_bindgen]
pub struct PendingWrite {
    ticket: PersistTicket,
    bytes: Vec<u8>,
}

#[wasm_bindgen]
impl PendingWrite {
    /// Encoded record to store under the grid's table id.
    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> Uint8Array {
        Uint8Array::from(self.bytes.as_slice())
    }
}

/// Grid store exported to JavaScript.
#[wasm_bindgen]
pub struct XlGrid {
    controller: GridController,
    listener: Rc<RefCell<Option<Function>>>,
}

#[wasm_bindgen]
impl XlGrid {
    /// Create a grid. `config` is a `TableConfig` object (camelCase) or
    /// `undefined` for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, table_id: &str) -> Result<XlGrid, JsValue> {
        let table: TableConfig = if config.is_undefined() || config.is_null() {
            TableConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        let persist = PersistConfig {
            table_id: table_id.to_string(),
            ..PersistConfig::default()
        };

        let bus = EventBus::new();
        let listener: Rc<RefCell<Option<Function>>> = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&listener);
        bus.subscribe(move |event: &GridEvent| {
            let callback = sink.borrow().clone();
            if let Some(callback) = callback {
                if let Ok(value) = serde_wasm_bindgen::to_value(event) {
                    if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                        log::warn!("event listener threw: {e:?}");
                    }
                }
            }
        });

        Ok(XlGrid {
            controller: GridController::new(&table, &persist, bus)?,
            listener,
        })
    }

    /// Register (or clear) the event callback.
    pub fn set_listener(&mut self, callback: Option<Function>) {
        *self.listener.borrow_mut() = callback;
    }

    pub fn row_capacity(&self) -> u32 {
        self.controller.table().row_capacity()
    }

    pub fn occupied_rows(&self) -> u32 {
        self.controller.table().occupied_rows()
    }

    pub fn column_count(&self) -> usize {
        self.controller.table().column_count()
    }

    /// Value at a storage row.
    pub fn value(&self, row: u32, col: usize) -> Result<String, JsValue> {
        Ok(self.controller.table().value(row, col)?.to_string())
    }

    /// Value at a view row (what the user sees).
    pub fn display_value(&self, view_row: u32, col: usize) -> Result<String, JsValue> {
        Ok(self.controller.table().display_value(view_row, col)?.to_string())
    }

    pub fn storage_row(&self, view_row: u32) -> Result<u32, JsValue> {
        Ok(self.controller.table().storage_row(view_row)?)
    }

    pub fn set_value(&mut self, row: u32, col: usize, value: &str) -> Result<bool, JsValue> {
        Ok(self.controller.set_cell(row, col, value, now_ms())?)
    }

    pub fn set_display_value(
        &mut self,
        view_row: u32,
        col: usize,
        value: &str,
    ) -> Result<bool, JsValue> {
        Ok(self
            .controller
            .set_display_cell(view_row, col, value, now_ms())?)
    }

    pub fn add_row(&mut self) -> Result<u32, JsValue> {
        Ok(self.controller.add_row(now_ms())?)
    }

    pub fn undo(&mut self) -> Result<bool, JsValue> {
        Ok(self.controller.undo(now_ms())?)
    }

    pub fn redo(&mut self) -> Result<bool, JsValue> {
        Ok(self.controller.redo(now_ms())?)
    }

    /// Sort and return the elapsed time in milliseconds.
    pub fn sort_by_column(&mut self, col: usize, ascending: bool) -> Result<f64, JsValue> {
        let outcome = self.controller.sort_by_column(col, ascending)?;
        Ok(outcome.elapsed.as_secs_f64() * 1000.0)
    }

    pub fn reset_display_order(&mut self) {
        self.controller.reset_order();
    }

    /// Header click. Returns `"asc"`, `"desc"` or `"reset"`.
    pub fn click_header(&mut self, col: usize) -> Result<String, JsValue> {
        Ok(match self.controller.click_header(col)? {
            SortAction::Sort {
                ascending: true, ..
            } => "asc",
            SortAction::Sort {
                ascending: false, ..
            } => "desc",
            SortAction::Reset => "reset",
        }
        .to_string())
    }

    /// `{ column, ascending }`, both `null` when unsorted.
    pub fn sort_status(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(
            &self.controller.table().sort_status(),
        )?)
    }

    /// Start a write if one is due, else `undefined`.
    ///
    /// JS stores `write.bytes` and must then call `finish_persist`. Until it
    /// does, later edits queue behind this write instead of starting another.
    pub fn begin_persist(&mut self) -> Result<Option<PendingWrite>, JsValue> {
        Ok(self
            .controller
            .begin_persist(now_ms())?
            .map(|(ticket, bytes)| PendingWrite { ticket, bytes }))
    }

    /// Report the outcome of `write`; pass an error message when the store
    /// rejected it. Returns `false` if the write was cancelled meanwhile.
    pub fn finish_persist(&mut self, write: &PendingWrite, error: Option<String>) -> bool {
        let outcome = match error {
            Some(message) => Err(message),
            None => Ok(write.bytes.len()),
        };
        self.controller.finish_persist(write.ticket, outcome, now_ms())
    }

    /// Abandon the in-flight write; the data is written again later.
    pub fn cancel_persist(&mut self) {
        self.controller.cancel_persist();
    }

    /// Encoded snapshot record of the current state, regardless of scheduling.
    pub fn snapshot_record(&self) -> Result<Vec<u8>, JsValue> {
        let table = self.controller.table();
        Ok(PersistedRecord::new(self.controller.table_id(), table.snapshot()).to_bytes()?)
    }

    /// Restore from record bytes. Invalid input leaves the grid untouched.
    pub fn load_record(&mut self, bytes: &[u8]) -> Result<(), JsValue> {
        let store = BufferStore {
            key: self.controller.table_id().to_string(),
            bytes: Some(bytes.to_vec()),
        };
        self.controller.load(&store)?;
        Ok(())
    }

    /// `"clean"`, `"pending"` or `{ inFlight: { queued } }`.
    pub fn persist_state(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.controller.persist_state())?)
    }

    pub fn persist_stats(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(self.controller.persist_stats())?)
    }
}
