//! Interaction recording: durable capture of forwarded traffic.
//!
//! # Module Structure
//!
//! - `types` - the persisted Interaction format (the replay file contract)
//! - `recorder` - append-and-flush recorder with atomic whole-file rewrites

mod recorder;
mod types;

pub use recorder::{RecordError, Recorder};
pub use types::{header_multimap, HeaderMultimap, Interaction, RequestDetail, ResponseDetail};
