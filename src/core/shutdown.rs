//! # Cross-platform OS signal handling.
//!
//! Provides [`spawn_signal_watcher`], a dedicated thread that turns termination
//! signals into ordinary calls into the orchestrator, so the shutdown path never
//! runs inside an async-signal handler.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal, often used for core dumps or hard stop)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! ## Thread loop
//! ```text
//! current_thread runtime
//!   loop {
//!     select! {
//!       token.cancelled() → exit
//!       signal received   → on_signal()   (repeated signals call it again; stop() is idempotent)
//!     }
//!   }
//! ```

use std::io;
use std::thread::{self, JoinHandle};

use tokio_util::sync::CancellationToken;

/// Registered listeners; created once so repeated signals are not lost between waits.
struct ShutdownSignals {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigquit: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    /// Must be called inside a runtime context.
    #[cfg(unix)]
    fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    #[cfg(not(unix))]
    fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Completes when any termination signal arrives.
    #[cfg(unix)]
    async fn recv(&mut self) -> io::Result<()> {
        tokio::select! {
            _ = self.sigint.recv()  => {},
            _ = self.sigterm.recv() => {},
            _ = self.sigquit.recv() => {},
        }
        Ok(())
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> io::Result<()> {
        tokio::signal::ctrl_c().await
    }
}

/// Spawns the signal-watching thread.
///
/// Signal registration happens before this returns, so an `Err` means no
/// listener was installed. The thread exits once `token` is cancelled.
pub(crate) fn spawn_signal_watcher<F>(token: CancellationToken, on_signal: F) -> io::Result<JoinHandle<()>>
where
    F: Fn() + Send + 'static,
{
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let mut signals = {
        let _ctx = rt.enter();
        ShutdownSignals::install()?
    };

    thread::Builder::new()
        .name("tickvisor-signals".into())
        .spawn(move || {
            rt.block_on(async move {
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        res = signals.recv() => match res {
                            Ok(()) => {
                                tracing::info!("termination signal received");
                                on_signal();
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "signal listener failed");
                                break;
                            }
                        },
                    }
                }
            });
        })
}

/// Sends SIGINT to the current process.
#[cfg(all(test, unix))]
pub(crate) fn interrupt_self() {
    let status = std::process::Command::new("kill")
        .args(["-INT", &std::process::id().to_string()])
        .status()
        .expect("kill is available");
    assert!(status.success(), "kill -INT failed: {status}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_until(what: &str, cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !cond() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(cond(), "timed out waiting for {what}");
    }

    #[test]
    fn test_watcher_exits_when_token_is_cancelled() {
        let token = CancellationToken::new();
        let handle = spawn_signal_watcher(token.clone(), || {}).unwrap();

        token.cancel();
        wait_until("watcher exit", || handle.is_finished());
        handle.join().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_every_interrupt_reaches_the_callback() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let token = CancellationToken::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let handle = spawn_signal_watcher(token.clone(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        interrupt_self();
        wait_until("first interrupt", || fired.load(Ordering::SeqCst) >= 1);
        interrupt_self();
        wait_until("second interrupt", || fired.load(Ordering::SeqCst) >= 2);

        token.cancel();
        handle.join().unwrap();
    }
}
