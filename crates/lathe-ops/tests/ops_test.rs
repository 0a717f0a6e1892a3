use std::sync::Arc;

use lathe_graph::{Context, OperationRegistry};
use lathe_ops::{BuilderExt, OpExt, OutputDir, register_all};
use lathe_resolver::{ResolveError, Resolver};
use lathe_spec::{BindError, Value, args, keyed};
use lathe_store::InMemoryResultStore;
use serde_json::json;

fn resolver() -> Resolver {
  let mut registry = OperationRegistry::new();
  register_all(&mut registry).unwrap();
  Resolver::new(Arc::new(registry))
}

#[tokio::test]
async fn test_arithmetic_chain() {
  let resolution = resolver()
    .run(Context::new(), |b| {
      let ten = b.number(10.0)?;
      Ok(ten.add(b.number(2.0)?)?.mul(3)?.id())
    })
    .await
    .unwrap();

  assert_eq!(resolution.value(&resolution.output), Some(&json!(36)));
}

#[tokio::test]
async fn test_seq_expands_ranges() {
  let resolution = resolver()
    .run(Context::new(), |b| {
      Ok(b.seq(args![keyed! { "by" => 0.25 }, 7])?.id())
    })
    .await
    .unwrap();

  assert_eq!(
    resolution.value(&resolution.output),
    Some(&json!([0, 0.25, 0.5, 0.75, 7]))
  );
}

#[tokio::test]
async fn test_sum_of_numbers_and_sequences() {
  let resolution = resolver()
    .run(Context::new(), |b| {
      let evens = b.seq(args![keyed! { "ge" => 2, "le" => 6, "by" => 2 }])?;
      Ok(b.call("sum", args![1, evens, 3])?.id())
    })
    .await
    .unwrap();

  assert_eq!(resolution.value(&resolution.output), Some(&json!(16)));
}

#[tokio::test]
async fn test_box_and_translate() {
  let resolution = resolver()
    .run(Context::new(), |b| {
      let moved = b
        .call("box", args![4, keyed! { "z" => [0, 1] }])?
        .call("translate", args![keyed! { "x" => 1 }])?;
      Ok(moved.id())
    })
    .await
    .unwrap();

  assert_eq!(
    resolution.value(&resolution.output),
    Some(&json!({ "kind": "box", "min": [-1, -2, 0], "max": [3, 2, 1] }))
  );
}

#[tokio::test]
async fn test_group_then_translate_every_member() {
  let resolution = resolver()
    .run(Context::new(), |b| {
      let a = b.point([0.0, 0.0, 0.0])?;
      let c = b.point([1.0, 1.0, 1.0])?;
      Ok(b.group(&[a, c])?.translate([0.0, 0.0, 1.0])?.id())
    })
    .await
    .unwrap();

  assert_eq!(
    resolution.value(&resolution.output),
    Some(&json!([
      { "kind": "point", "at": [0, 0, 1] },
      { "kind": "point", "at": [1, 1, 2] }
    ]))
  );
}

#[tokio::test]
async fn test_group_member_selection() {
  let resolution = resolver()
    .run(Context::new(), |b| {
      let pair = b.group(&[b.cube(2)?, b.point([5.0, 5.0, 5.0])?])?;
      // An explicit selection picks one member of the group.
      Ok(b.call("group", vec![Value::from(pair.select(1))])?.id())
    })
    .await
    .unwrap();

  assert_eq!(
    resolution.value(&resolution.output),
    Some(&json!([{ "kind": "point", "at": [5, 5, 5] }]))
  );
}

#[tokio::test]
async fn test_write_is_effectful() {
  let dir = tempfile::tempdir().unwrap();
  let context = Context::new()
    .with_store(Arc::new(InMemoryResultStore::new()))
    .with_data(OutputDir(dir.path().to_path_buf()));
  let resolver = resolver();

  let first = resolver
    .run(context.clone(), |b| Ok(b.cube(2)?.write("out/cube.json")?.id()))
    .await
    .unwrap();
  let path = dir.path().join("out").join("cube.json");
  assert!(path.exists());

  std::fs::remove_file(&path).unwrap();
  let second = resolver
    .run(context, |b| Ok(b.cube(2)?.write("out/cube.json")?.id()))
    .await
    .unwrap();

  // The box comes from the cache, the write runs again.
  assert!(path.exists());
  assert_eq!(second.stats.hits, 1);
  assert_eq!(second.stats.evaluations, 1);
  assert_eq!(first.output, second.output);

  let written: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
  assert_eq!(written, json!({ "kind": "box", "min": [-1, -1, -1], "max": [1, 1, 1] }));
}

#[tokio::test]
async fn test_add_requires_an_input() {
  let err = resolver()
    .run(Context::new(), |b| Ok(b.call("add", args![1])?.id()))
    .await
    .unwrap_err();

  assert!(matches!(err, ResolveError::Evaluation { ref op, .. } if op == "add"));
}

#[tokio::test]
async fn test_translate_rejects_bad_offset_at_build_time() {
  let err = resolver()
    .run(Context::new(), |b| Ok(b.cube(1)?.call("translate", args!["up"])?.id()))
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    ResolveError::Bind(BindError::MissingArgument { ref op, .. }) if op == "translate"
  ));
}
