// tests/pipeline_tests.rs
mod common;

use cartflow::{ContextData, Pipeline, PipelineControl, PipelineResult};
use common::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_pipeline_runs_steps_in_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("step1", false), ("step2", false), ("step3", false)]);

  pipeline.on_root("step1", create_simple_handler("step1", " S1"));
  pipeline.on_root("step2", create_simple_handler("step2", " S2"));
  pipeline.on_root("step3", create_simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_before_on_after_run_in_phase_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("only", false)]);

  pipeline.after_root("only", create_simple_handler("after", "c"));
  pipeline.on_root("only", create_simple_handler("on", "b"));
  pipeline.before_root("only", create_simple_handler("before", "a"));

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().message, "abc");
  assert_eq!(ctx.read().steps_executed, vec!["before", "on", "after"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_stops_on_pipeline_control_stop() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("stepA", false), ("stopStep", false), ("stepC", false)]);

  pipeline.on_root("stepA", create_simple_handler("stepA", "A"));
  pipeline.on_root("stopStep", create_simple_handler("stopStep", "S"));
  pipeline.after_root("stopStep", create_simple_handler("afterStop", "X"));
  pipeline.on_root("stepC", create_simple_handler("stepC", "C"));

  let ctx = ContextData::new(TestContext {
    should_stop_at: Some("stopStep".to_string()),
    ..Default::default()
  });
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  let guard = ctx.read();
  assert_eq!(guard.message, "AS");
  assert_eq!(guard.steps_executed, vec!["stepA", "stopStep"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_propagates_handler_error() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(&[("good_step", false), ("bad_step", false), ("another_step", false)]);

  pipeline.on_root("good_step", create_simple_handler("good_step", "Good"));
  pipeline.on_root("bad_step", create_failing_handler("bad_step", "I am a bad step!"));
  pipeline.on_root("another_step", create_simple_handler("another_step", "NeverRun"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("I am a bad step!".to_string()));
  let guard = ctx.read();
  assert_eq!(guard.message, "Good");
  assert_eq!(guard.steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
#[serial]
async fn test_missing_handler_for_required_step_fails() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("first", false), ("unhandled", false)]);
  pipeline.on_root("first", create_simple_handler("first", "1"));

  let ctx = ContextData::new(TestContext::default());
  let err = pipeline.run(ctx.clone()).await.unwrap_err();

  match err {
    TestError::Pipeline(message) => assert!(message.contains("unhandled"), "unexpected message: {message}"),
    other => panic!("expected a pipeline error, got {other:?}"),
  }
  assert_eq!(ctx.read().counter, 1);
}

#[tokio::test]
#[serial]
async fn test_optional_step_without_handlers_is_skipped() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("first", false), ("maybe", true), ("last", false)]);
  pipeline.on_root("first", create_simple_handler("first", "1"));
  pipeline.on_root("last", create_simple_handler("last", "3"));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().steps_executed, vec!["first", "last"]);
}

#[tokio::test]
#[serial]
async fn test_closure_handlers_share_context_across_steps() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("produce", false), ("consume", false)]);

  pipeline.on_root("produce", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().counter = 41;
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  pipeline.on_root("consume", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let value = { ctx.read().counter };
      tokio::task::yield_now().await;
      ctx.write().counter = value + 1;
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().counter, 42);
}

#[test]
#[should_panic(expected = "not found in pipeline definition")]
fn test_registering_handler_for_unknown_step_panics() {
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("known", false)]);
  pipeline.on_root("unknown", create_simple_handler("unknown", "?"));
}
