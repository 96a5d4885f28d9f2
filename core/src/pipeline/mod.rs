// core/src/pipeline/mod.rs

//! A small named-step pipeline engine.
//!
//! Business workflows are written as an ordered list of steps, each with
//! `before`, `on` and `after` async handlers operating on a shared
//! [`ContextData`]. Handlers either continue, stop the run, or fail with the
//! pipeline's error type, which must absorb [`PipelineError`].

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use definition::{Handler, Pipeline};
pub use step::StepDef;
