use std::any::Any;
use std::fmt;
use std::sync::Arc;

use lathe_store::ResultStore;

/// Run context forwarded unchanged to every operation implementation.
///
/// The result store, when present, is what the resolver's cache consults.
/// `data` is an opaque slot for whatever the operations themselves need.
#[derive(Clone, Default)]
pub struct Context {
  store: Option<Arc<dyn ResultStore>>,
  data: Option<Arc<dyn Any + Send + Sync>>,
}

impl Context {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
    self.store = Some(store);
    self
  }

  pub fn with_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
    self.data = Some(Arc::new(data));
    self
  }

  pub fn store(&self) -> Option<&Arc<dyn ResultStore>> {
    self.store.as_ref()
  }

  /// The user data, if it was set with type `T`.
  pub fn data<T: Any + Send + Sync>(&self) -> Option<&T> {
    self.data.as_deref().and_then(|data| data.downcast_ref())
  }
}

impl fmt::Debug for Context {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Context")
      .field("store", &self.store.is_some())
      .field("data", &self.data.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use lathe_store::InMemoryResultStore;

  #[test]
  fn test_context_data_downcast() {
    let context = Context::new().with_data(String::from("out"));
    assert_eq!(context.data::<String>().map(String::as_str), Some("out"));
    assert!(context.data::<u32>().is_none());
    assert!(context.store().is_none());
  }

  #[test]
  fn test_context_clone_shares_store() {
    let store: Arc<dyn ResultStore> = Arc::new(InMemoryResultStore::new());
    let context = Context::new().with_store(store.clone());
    let copy = context.clone();
    assert!(Arc::ptr_eq(copy.store().unwrap(), &store));
  }
}
