//! Scenario matching and mock response rendering.
//!
//! # Module Structure
//!
//! - `store` - ScenarioStore: ordered scenarios with runtime enable/disable
//! - `responder` - renders a matched scenario onto the client connection

mod responder;
mod store;

pub use responder::serve_mock;
pub use store::{ScenarioSnapshot, ScenarioStore};
