// core/src/pipeline/execution.rs

//! `Pipeline::run()`: walks the steps and drives their handlers.

use crate::error::PipelineError;
use crate::pipeline::context_data::ContextData;
use crate::pipeline::control::{PipelineControl, PipelineResult};
use crate::pipeline::definition::{Handler, Pipeline};
use tracing::{event, instrument, Instrument, Level};

enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  fn label(&self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Executes the pipeline against `ctx_data`.
  ///
  /// The first failing handler aborts the run and its error is returned as is.
  /// Handler failures are only traced at DEBUG here; the caller decides how
  /// loud a given error is.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    )
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = tracing::info_span!("pipeline_step", step_name, step_index = step_idx);

      let has_handlers = [&self.before, &self.on, &self.after]
        .iter()
        .any(|phase| phase.get(step_name).map_or(false, |v| !v.is_empty()));

      if !has_handlers {
        if step_def.optional {
          event!(parent: &step_span, Level::DEBUG, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(parent: &step_span, Level::ERROR, "Non-optional step has no handlers.");
        return Err(Err::from(PipelineError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      for (phase, handlers) in [
        (Phase::Before, self.before.get(step_name)),
        (Phase::On, self.on.get(step_name)),
        (Phase::After, self.after.get(step_name)),
      ] {
        let Some(handlers) = handlers else { continue };
        if self
          .run_phase(&phase, handlers, &ctx_data)
          .instrument(step_span.clone())
          .await?
          == PipelineControl::Stop
        {
          event!(parent: &step_span, Level::INFO, phase = phase.label(), "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped);
        }
      }
      event!(parent: &step_span, Level::DEBUG, "Step finished.");
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_phase(
    &self,
    phase: &Phase,
    handlers: &[Handler<TData, Err>],
    ctx_data: &ContextData<TData>,
  ) -> Result<PipelineControl, Err> {
    for handler_fn in handlers {
      match handler_fn(ctx_data.clone()).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => return Ok(PipelineControl::Stop),
        Err(e) => {
          event!(Level::DEBUG, error = %e, phase = phase.label(), "Handler failed.");
          return Err(e);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }
}
