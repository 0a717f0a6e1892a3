use std::path::{Path, PathBuf};

use lathe_graph::{OpCall, Operation};
use lathe_spec::{BoxError, Param, Produces, Tag};
use serde_json::{Value as Json, json};
use tracing::info;

use crate::error::OpsError;

/// Directory relative `write` paths resolve against, carried as context data.
#[derive(Debug, Clone)]
pub struct OutputDir(pub PathBuf);

pub(crate) fn operations() -> Vec<Operation> {
  vec![
    Operation::new("write", Produces::one("file"), write)
      .param(Param::required(Tag::String))
      .effectful(),
  ]
}

/// Write the input value as pretty JSON.
async fn write(call: OpCall) -> Result<Json, BoxError> {
  let input = call.input.as_ref().ok_or(OpsError::MissingInput { op: "write" })?;
  let name = call
    .arg(0)
    .as_str()
    .ok_or_else(|| OpsError::type_error("write", "a path", call.arg(0)))?;

  let path = match call.context.data::<OutputDir>() {
    Some(OutputDir(dir)) if Path::new(name).is_relative() => dir.join(name),
    _ => PathBuf::from(name),
  };

  let bytes = serde_json::to_vec_pretty(input)?;
  let failed = |source| OpsError::Write {
    path: path.display().to_string(),
    source,
  };
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent).await.map_err(failed)?;
  }
  tokio::fs::write(&path, &bytes).await.map_err(failed)?;

  info!(path = %path.display(), bytes = bytes.len(), "file_written");
  Ok(json!({ "path": path.display().to_string(), "bytes": bytes.len() }))
}
