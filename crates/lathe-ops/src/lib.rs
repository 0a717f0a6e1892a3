//! Lathe Ops
//!
//! A small stock operation library: numbers, numeric sequences, and simple
//! shape records (points and axis-aligned boxes) that can be moved, grouped
//! and written out. Shapes are plain JSON values; the engine treats them as
//! opaque.
//!
//! [`register_all`] adds every operation and the `scalar` spec handler to a
//! registry. [`BuilderExt`] and [`OpExt`] wrap the generic `call` in typed
//! methods.

mod error;
mod ext;
mod io;
mod numeric;
mod shape;

pub use error::OpsError;
pub use ext::{BuilderExt, OpExt};
pub use io::OutputDir;
pub use numeric::{bind_scalar, scalar};

use lathe_graph::{GraphError, OperationRegistry};

/// Output tag of operations producing a single number.
pub const NUMBER: &str = "number";

/// Register every stock operation.
pub fn register_all(registry: &mut OperationRegistry) -> Result<(), GraphError> {
  registry.register_handler(numeric::is_scalar, bind_scalar);
  for operation in numeric::operations()
    .into_iter()
    .chain(shape::operations())
    .chain(io::operations())
  {
    registry.register(operation)?;
  }
  Ok(())
}
