//! Document-side collaborators.
//!
//! The engine only knows the traits in `crate::engine`; this module carries
//! the document-flavored implementations:
//! - `events`: the event-type -> constructor-family table.
//! - `sim`: the simulated (recording) backend used by the CLI and the tests.
//!
//! A real browser integration would implement `NodeResolver`/`NodeHandle`/
//! `EventFactory` against an actual document and slot in transparently.

pub mod events;
pub mod sim;

pub use events::{EVENT_FAMILIES, family_for_event};
pub use sim::{FamilyEventFactory, MemoryWordlists, SimDocument, SimEvent, SimNode};
