//! Lathe Spec
//!
//! This crate turns the heterogeneous argument list of an operation call into
//! validated, bound parameter values.
//!
//! An operation declares its formal parameters as an ordered list of
//! [`Param`]s, each carrying a [`Tag`]. Binding walks the tags left to right
//! and asks the [`HandlerRegistry`] for the one handler matching each tag.
//! Handlers consume a prefix of the remaining arguments and hand back anything
//! they looked at but rejected, so the next tag can still claim it.
//!
//! ```ignore
//! use lathe_spec::{args, destructure, HandlerRegistry, Param, Tag};
//!
//! let handlers = HandlerRegistry::with_builtins();
//! let params = [Param::required(Tag::Interval), Param::optional(Tag::flags(["center"]))];
//! let bound = destructure(&handlers, &caller, &params, args![10, "center"])?;
//! ```

mod destructure;
mod error;
mod handlers;
mod registry;
mod tag;
mod value;

pub use destructure::destructure;
pub use error::BindError;
pub use handlers::{expand_range, normalize_interval};
pub use registry::{Binding, Caller, HandlerFn, HandlerRegistry};
pub use tag::{NUMBERS, Param, Produces, Requirement, SHAPE, Tag};
pub use value::{BoxError, External, ExternalFuture, ExternalSource, Keyed, NodeHandle, NodeRef, Value};
