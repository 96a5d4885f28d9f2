// core/src/pipeline/control.rs

//! Signals for steering a pipeline run and the outcome of a finished run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Go on with the remaining handlers and steps.
  Continue,
  /// Halt the run. No further handler of this or any later step executes.
  Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step ran (or was an optional step without handlers).
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}
