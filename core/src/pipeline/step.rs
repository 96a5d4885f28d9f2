// core/src/pipeline/step.rs

/// A named step of a pipeline.
///
/// A non-optional step must have at least one handler registered by the time
/// the pipeline runs; an optional step without handlers is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDef {
  pub name: String,
  pub optional: bool,
}
