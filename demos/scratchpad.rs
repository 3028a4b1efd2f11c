//! # Example: Scratchpad
//!
//! A display unit owns the calling thread and draws every `--display-ms`,
//! while producer units on worker threads send it triangles. The fleet stops
//! after `--run-for-ms` (auto-shutdown timer) or on Ctrl-C, whichever comes first.
//!
//! ```text
//! producer-0 ──┐
//! producer-1 ──┼── Outbox<Triangle> ──► display (main thread, Inbox drained each frame)
//! producer-N ──┘
//! ```
//!
//! Run with:
//! ```text
//! RUST_LOG=info cargo run --example scratchpad -- --run-for-ms 3000 --producers 2
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tickvisor::{
    BackingKind, Orchestrator, OrchestratorConfig, Outbox, Progress, ResourceUnit, ScopedTimer,
    Subscribe, TaskUnit, UnitFn, UnitSpec, mailbox,
};

#[derive(Parser, Debug)]
#[command(name = "scratchpad", about = "Recurring task units with ordered shutdown")]
struct Args {
    /// Stop the fleet after this many milliseconds (0 = until Ctrl-C).
    #[arg(long, default_value_t = 10_000)]
    run_for_ms: u64,

    /// Display repeat interval in milliseconds.
    #[arg(long, default_value_t = 100)]
    display_ms: u64,

    /// Number of producer units.
    #[arg(long, default_value_t = 2)]
    producers: usize,

    /// Producer repeat interval in milliseconds.
    #[arg(long, default_value_t = 250)]
    producer_ms: u64,

    /// Close the display window after this many frames (0 = never).
    #[arg(long, default_value_t = 0)]
    frames: u64,
}

#[derive(Debug, Clone, Copy)]
struct Triangle {
    origin: (f32, f32),
    size: f32,
}

impl fmt::Display for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "triangle@({:.1}, {:.1}) size={:.1}", self.origin.0, self.origin.1, self.size)
    }
}

fn producer(index: usize, interval: Duration, outbox: Outbox<Triangle>) -> UnitSpec {
    UnitSpec::new(format!("producer-{index}"), interval, move || {
        let mut emitted = 0u32;
        Ok(UnitFn::boxed(move || {
            emitted += 1;
            let step = emitted as f32;
            let sent = outbox.send(Triangle {
                origin: (step, index as f32),
                size: 1.0 + step / 10.0,
            });
            if !sent {
                tracing::debug!(producer = index, "display is gone; dropping triangle");
            }
            Ok(Progress::Continue)
        }))
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    let args = Args::parse();
    let _timer = ScopedTimer::new("scratchpad");
    tracing::info!(?args, "welcome to scratchpad");

    let cfg = OrchestratorConfig {
        auto_shutdown: Duration::from_millis(args.run_for_ms),
        ..OrchestratorConfig::default()
    };

    let backing = match args.frames {
        0 => BackingKind::Headless,
        n => BackingKind::FrameBudget(n),
    };

    let (outbox, inbox) = mailbox::<Triangle>();
    let display = UnitSpec::new("display", Duration::from_millis(args.display_ms), move || {
        let unit: Box<dyn TaskUnit> =
            Box::new(ResourceUnit::with_inbox(backing.build(), inbox, |t: Triangle| {
                tracing::info!(%t, "received");
            }));
        Ok(unit)
    })
    .on_main_thread();

    let producers = (0..args.producers)
        .map(|i| producer(i, Duration::from_millis(args.producer_ms), outbox.clone()));

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(tickvisor::LogWriter::new())];
    let orch = Orchestrator::builder(cfg)
        .with_subscribers(subs)
        .with_units(producers)
        .with_unit(display)
        .build();

    orch.instantiate()?;
    orch.start()?;

    for unit in orch.status() {
        tracing::info!(
            unit = %unit.name,
            state = %unit.state,
            repeats = unit.repeats,
            average_interval = ?unit.average_interval,
            "final status"
        );
    }
    for fault in orch.faults() {
        tracing::warn!(%fault, "fault during run");
    }
    Ok(())
}
