//! Command-line entry point: runs the dispatcher with simulated work until
//! Ctrl-C (or until `SLOT_DISPATCH_MAX_DISPATCHES` identities were issued).
//!
//! Configuration comes from `SLOT_DISPATCH_*` environment variables, with a
//! local `.env` file picked up through `dotenvy`.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::anyhow;
use slot_dispatch::builders::build_simulated_dispatcher;
use slot_dispatch::config::DispatcherConfig;
use slot_dispatch::core::{AppResult, CancellationSignal, ConsoleEventSink, DispatchReport};
use slot_dispatch::runtime::{build_runtime, cancel_on_ctrl_c};
use slot_dispatch::util::{format_anyhow_chain, init_tracing};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run() {
        Ok(report) => {
            tracing::info!(
                "dispatched {} (completed {}, interrupted {}, faulted {}, contended {})",
                report.dispatched,
                report.completed,
                report.interrupted,
                report.faulted,
                report.contended
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", format_anyhow_chain(&e));
            ExitCode::FAILURE
        }
    }
}

fn run() -> AppResult<DispatchReport> {
    let cfg = DispatcherConfig::from_env().map_err(|e| anyhow!(e))?;
    let runtime = build_runtime(cfg.max_concurrency)?;

    runtime.block_on(async {
        let signal = CancellationSignal::new();
        let interrupt = cancel_on_ctrl_c(signal.clone());
        let dispatcher =
            build_simulated_dispatcher(&cfg, Arc::new(ConsoleEventSink::new()), signal.clone())?;

        let report = dispatcher.run().await;
        // Unblocks the interrupt listener when the run ended on its own.
        signal.request_cancellation();
        interrupt.await?;
        Ok::<_, anyhow::Error>(report?)
    })
}
