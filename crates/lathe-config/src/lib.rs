//! Lathe Config
//!
//! Serializable plan definitions. A plan describes a graph as a list of
//! named steps, each calling one operation, instead of as Rust code driving
//! a builder. Plans are loaded from JSON files (via `lathe run plan.json`).
//!
//! Inside step arguments, `{"$step": "<step_id>"}` refers to another step's
//! node and `{"$external": "<key>"}` to a value from the plan's `externals`.

mod error;
mod plan;
mod reference;

pub use error::ConfigError;
pub use plan::{PlanDef, StepDef};
pub use reference::Reference;
