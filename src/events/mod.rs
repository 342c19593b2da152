//! Ledger event emission
//!
//! Successful mutations are reported as structured, schema-checked records:
//! - [`EventRegistry`]: event name -> declared field set
//! - [`Emitter`]: typed [`Event`] payloads validated against the registry
//! - [`EventSink`]: where records go (memory, `log`, stdout)
//!
//! # Example
//!
//! ```rust
//! use token_ledger::events::{Emitter, Event, MemorySink};
//!
//! let mut emitter = Emitter::new(MemorySink::new());
//! emitter
//!     .emit(Event::Transfer {
//!         sender: "alice".to_string(),
//!         to: "bob".to_string(),
//!         amount: 30,
//!     })
//!     .unwrap();
//!
//! assert_eq!(emitter.sink().records()[0].event, "transfer");
//! ```

pub mod emitter;
pub mod registry;
pub mod sink;

pub use emitter::{Emitter, Event, EventKind};
pub use registry::{EventError, EventHandle, EventRecord, EventRegistry, FieldValue};
pub use sink::{write_line, EventSink, LogSink, MemorySink, StdoutSink, EVENT_LOG_TARGET};
