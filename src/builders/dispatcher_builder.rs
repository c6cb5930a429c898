//! Builders to construct dispatchers from configuration.

use std::sync::Arc;

use crate::config::DispatcherConfig;
use crate::core::{
    CancellationSignal, DispatchError, Dispatcher, EventSink, SimulatedWork, Worker,
};

/// Build a dispatcher from configuration using a worker factory.
///
/// The factory receives the validated configuration, so workers can size
/// themselves from it.
pub fn build_dispatcher<W, FW>(
    cfg: &DispatcherConfig,
    mut worker_factory: FW,
    sink: Arc<dyn EventSink>,
    signal: CancellationSignal,
) -> Result<Dispatcher<W>, DispatchError>
where
    W: Worker,
    FW: FnMut(&DispatcherConfig) -> Result<W, DispatchError>,
{
    cfg.validate()
        .map_err(|e| DispatchError::InvalidConfig(format!("config invalid: {e}")))?;

    let worker = worker_factory(cfg)?;
    let dispatcher = Dispatcher::new(cfg, worker)?
        .with_sink(sink)
        .with_signal(signal);
    tracing::debug!("built dispatcher {}", dispatcher.run_id());
    Ok(dispatcher)
}

/// Build a dispatcher running [`SimulatedWork`] of the configured duration.
pub fn build_simulated_dispatcher(
    cfg: &DispatcherConfig,
    sink: Arc<dyn EventSink>,
    signal: CancellationSignal,
) -> Result<Dispatcher<SimulatedWork>, DispatchError> {
    build_dispatcher(
        cfg,
        |cfg| Ok(SimulatedWork::new(cfg.worker_duration())),
        sink,
        signal,
    )
}
