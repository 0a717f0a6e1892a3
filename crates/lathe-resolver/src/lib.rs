//! Lathe Resolver
//!
//! Evaluates the graph recorded by a build session. Every distinct node id
//! is evaluated at most once per run; with a result store in the
//! [`Context`](lathe_graph::Context), results also carry over between runs.

mod cache;
mod error;
mod resolver;
mod result;

pub use error::{ResolveError, SharedError};
pub use resolver::Resolver;
pub use result::{CacheStats, Resolution, ResolvedGraph};
