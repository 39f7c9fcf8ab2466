//! Terminal ticker shown while an archive is being extracted.

use std::io::{IsTerminal, Write};
use std::sync::mpsc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const TICK: Duration = Duration::from_millis(120);
/// Upper bound on how long stopping waits for the ticker to clear its line.
const STOP_WAIT: Duration = Duration::from_millis(500);

pub struct ProgressIndicator;

impl ProgressIndicator {
    /// Start a ticker on stderr.
    ///
    /// The ticker only runs on a terminal inside a tokio runtime; otherwise
    /// the returned guard does nothing.
    pub fn start(label: &str) -> ProgressGuard {
        if !std::io::stderr().is_terminal() {
            return ProgressGuard::inert();
        }
        match Handle::try_current() {
            Ok(handle) => Self::spawn(&handle, label, std::io::stderr(), TICK),
            Err(_) => ProgressGuard::inert(),
        }
    }

    /// Spawn a ticker writing to `out`.
    pub fn spawn<W>(handle: &Handle, label: &str, mut out: W, tick: Duration) -> ProgressGuard
    where
        W: Write + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let label = label.to_string();

        handle.spawn(async move {
            let mut interval = tokio::time::interval(tick);
            let mut frame = 0usize;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        let _ = write!(out, "\r{} {}", FRAMES[frame % FRAMES.len()], label);
                        let _ = out.flush();
                        frame += 1;
                    }
                }
            }
            let _ = write!(out, "\r\x1b[2K");
            let _ = out.flush();
            let _ = done_tx.send(());
        });

        ProgressGuard {
            stop: Some(stop_tx),
            done: Some(done_rx),
        }
    }
}

/// Running ticker. Dropping the guard stops it and waits for the line to clear.
#[must_use = "the ticker stops as soon as the guard is dropped"]
pub struct ProgressGuard {
    stop: Option<oneshot::Sender<()>>,
    done: Option<mpsc::Receiver<()>>,
}

impl ProgressGuard {
    fn inert() -> Self {
        Self {
            stop: None,
            done: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stop.is_some()
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(done) = self.done.take() {
            let _ = done.recv_timeout(STOP_WAIT);
        }
    }
}
