//! Primitives shared by the collection view crates.
//!
//! - [`Signal`]: synchronous slot lists that views and sources publish
//!   changes on
//! - [`Property`]: a value whose writes report whether anything changed
//! - [`logging`]: `tracing` targets, [`PerfSpan`] and the options used by
//!   tree dumps
//!
//! ```
//! use collection_view_core::{Property, Signal};
//!
//! let len = Property::new(0usize);
//! let len_changed = Signal::<usize>::new();
//! let id = len_changed.connect(|len| println!("now {len} items"));
//!
//! if len.set(3) {
//!     len_changed.emit(3);
//! }
//! len_changed.disconnect(id);
//! ```

pub mod logging;
pub mod property;
pub mod signal;

pub use logging::{PerfSpan, TreeFormatOptions, TreeStyle};
pub use property::Property;
pub use signal::{ConnectionId, Signal};
