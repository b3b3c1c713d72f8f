//! xlgrid - columnar grid store for browser spreadsheet editors
//!
//! The core of a spreadsheet-like grid editor, compiled to WebAssembly:
//! - Dictionary-encoded string cells in fixed-capacity columns
//! - Stable column sorts over a separate, resettable display order
//! - Append-only row growth
//! - Exact snapshot/restore through a caller-owned record store
//!
//! Rendering, DOM events, and the byte transport stay on the JS side.
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { XlGrid, init_logging } from 'xlgrid';
//! await init();
//! init_logging(false);
//! const grid = new XlGrid({ rowCapacity: 64, columnCount: 4 }, 'sheet-1');
//! grid.set_listener((event) => redraw(event));
//! grid.set_value(0, 0, 'hello');
//! grid.click_header(0);
//! const write = grid.begin_persist();
//! if (write) {
//!   store.put('sheet-1', write.bytes)
//!     .then(() => grid.finish_persist(write, null))
//!     .catch((e) => grid.finish_persist(write, String(e)));
//! }
//! ```

pub mod clock;
pub mod controller;
pub mod csv;
pub mod error;
pub mod events;
pub mod history;
pub mod persist;
pub mod store;

#[cfg(target_arch = "wasm32")]
mod bindings;

use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
pub use bindings::{init_logging, PendingWrite, XlGrid};

pub use controller::GridController;
pub use error::{GridError, Result};
pub use events::{EventBus, GridEvent};
pub use store::*;

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
