//! Process output observer.
//!
//! [`CmdObserver`] launches a command, drains its stdout and stderr on two
//! reader tasks, and queues every non-blank line as a timestamped
//! [`LineRecord`]. Two consumption modes are supported:
//!
//! - [`Mode::Batch`]: `start` runs the command to completion, then `get`
//!   returns the whole transcript.
//! - [`Mode::Realtime`]: `start` returns immediately and `get` yields one
//!   record at a time as output arrives.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use script_glue::observer::{CmdObserver, Command, Mode, Output};
//!
//! #[tokio::main]
//! async fn main() -> script_glue::Result<()> {
//!     let observer = CmdObserver::new(Command::new("ls").arg("-la"), Mode::Batch);
//!     observer.start().await?;
//!
//!     if let Output::Batch(records) = observer.get(Duration::from_secs(1)).await {
//!         for record in records {
//!             println!("{}", record);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod channel;
mod command;
mod reader;
mod record;
mod state;

pub use channel::OutputChannel;
pub use command::Command;
pub use reader::{StreamReader, READ_BUFFER_SIZE};
pub use record::{LineRecord, StreamKind, TIME_FORMAT};
pub use state::ObserverState;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::GlueError;
use crate::Result;
use state::SharedState;

/// How long `stop` waits for a killed process to exit.
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default `get` timeout used by the CLI.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Consumption mode, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// `start` blocks until the run completes; `get` returns everything.
    #[default]
    Batch,
    /// `start` returns at once; `get` returns one record at a time.
    Realtime,
}

/// Result of [`CmdObserver::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Next record (realtime mode).
    Line(LineRecord),
    /// All buffered records, in arrival order (batch mode).
    Batch(Vec<LineRecord>),
    /// Nothing arrived before the timeout.
    Unavailable,
}

impl Output {
    /// Check if nothing was available.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Output::Unavailable)
    }

    /// Flatten into a list of records.
    pub fn into_records(self) -> Vec<LineRecord> {
        match self {
            Output::Line(record) => vec![record],
            Output::Batch(records) => records,
            Output::Unavailable => Vec::new(),
        }
    }
}

/// Handles for the run in progress.
struct ActiveRun {
    cancel: CancellationToken,
    supervisor: JoinHandle<()>,
}

/// Observer for one command's output.
///
/// All methods take `&self`, so an observer can be shared behind an `Arc`
/// (for example to call `stop` from a signal handler while another task
/// polls `get`).
pub struct CmdObserver {
    command: Command,
    mode: Mode,
    kill_timeout: Duration,
    state: Arc<SharedState>,
    channel: Arc<OutputChannel>,
    run: Mutex<Option<ActiveRun>>,
}

impl CmdObserver {
    /// Create an observer. Nothing is spawned until [`CmdObserver::start`].
    pub fn new(command: Command, mode: Mode) -> Self {
        Self {
            command,
            mode,
            kill_timeout: DEFAULT_KILL_TIMEOUT,
            state: Arc::new(SharedState::default()),
            channel: Arc::new(OutputChannel::new()),
            run: Mutex::new(None),
        }
    }

    /// Create a batch-mode observer.
    pub fn batch(command: Command) -> Self {
        Self::new(command, Mode::Batch)
    }

    /// Create a realtime-mode observer.
    pub fn realtime(command: Command) -> Self {
        Self::new(command, Mode::Realtime)
    }

    /// Set how long `stop` waits for a killed process before giving up
    /// on it.
    pub fn with_kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }

    /// Start a run.
    ///
    /// No-op if a run is already in progress. In batch mode this returns
    /// once the process has exited and all of its output is queued; in
    /// realtime mode it returns right after spawning.
    ///
    /// # Errors
    ///
    /// Returns [`GlueError::Spawn`] if the process could not be created.
    pub async fn start(&self) -> Result<()> {
        let mut run = self.run.lock().await;

        if self.state.get().is_running() {
            debug!(command = %self.command, "start ignored: already running");
            return Ok(());
        }

        if let Some(previous) = run.take() {
            // Finished on its own; reap the supervisor
            if let Err(e) = previous.supervisor.await {
                error!("observer supervisor task panicked: {}", e);
            }
        }

        let mut child = self
            .command
            .to_tokio()
            .spawn()
            .map_err(|source| GlueError::Spawn {
                command: self.command.to_string(),
                source,
            })?;

        let cancel = CancellationToken::new();
        let realtime = self.mode == Mode::Realtime;
        let mut readers = Vec::with_capacity(2);

        if let Some(stdout) = child.stdout.take() {
            let reader = StreamReader::new(
                stdout,
                StreamKind::Stdout,
                self.channel.clone(),
                cancel.clone(),
            )
            .with_echo(realtime);
            readers.push(tokio::spawn(reader.run()));
        }
        if let Some(stderr) = child.stderr.take() {
            let reader = StreamReader::new(
                stderr,
                StreamKind::Stderr,
                self.channel.clone(),
                cancel.clone(),
            );
            readers.push(tokio::spawn(reader.run()));
        }

        if let Err(e) = self.state.transition_to(ObserverState::Running) {
            // Readers exit on cancel; the child is killed on drop
            cancel.cancel();
            return Err(e);
        }
        debug!(command = %self.command, pid = ?child.id(), mode = ?self.mode, "observer started");

        let (done_tx, mut done_rx) = watch::channel(false);
        let supervisor = tokio::spawn(supervise(
            child,
            readers,
            cancel.clone(),
            self.state.clone(),
            self.kill_timeout,
            done_tx,
        ));
        *run = Some(ActiveRun { cancel, supervisor });
        drop(run);

        if self.mode == Mode::Batch {
            // Err means the supervisor is gone, which also ends the wait
            let _ = done_rx.wait_for(|finished| *finished).await;
        }

        Ok(())
    }

    /// Stop the run in progress.
    ///
    /// Kills the process if it is still alive and does not return until
    /// both readers have exited. No-op if not running.
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;

        if !self.state.get().is_running() {
            debug!(command = %self.command, "stop ignored: not running");
            return;
        }
        let Some(active) = run.take() else {
            return;
        };

        active.cancel.cancel();
        if let Err(e) = active.supervisor.await {
            error!("observer supervisor task panicked: {}", e);
            self.state.force(ObserverState::Stopped);
        }
        debug!(command = %self.command, "observer stopped");
    }

    /// Wait up to `timeout` for output.
    ///
    /// Realtime mode yields [`Output::Line`]; batch mode yields
    /// [`Output::Batch`] holding every buffered record. Either way,
    /// [`Output::Unavailable`] means nothing arrived in time.
    pub async fn get(&self, timeout: Duration) -> Output {
        match self.mode {
            Mode::Realtime => self
                .channel
                .get(timeout)
                .await
                .map_or(Output::Unavailable, Output::Line),
            Mode::Batch => self
                .channel
                .get_batch(timeout)
                .await
                .map_or(Output::Unavailable, Output::Batch),
        }
    }

    /// Take every buffered record without waiting, regardless of mode.
    pub async fn drain(&self) -> Vec<LineRecord> {
        self.channel.drain().await
    }

    /// Check if no output is buffered (snapshot).
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Number of buffered records (snapshot).
    pub fn pending(&self) -> usize {
        self.channel.len()
    }

    /// Check if a run is in progress.
    pub fn is_running(&self) -> bool {
        self.state.get().is_running()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ObserverState {
        self.state.get()
    }

    /// The observed command.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Consumption mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }
}

impl fmt::Display for CmdObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.command, f)
    }
}

impl Drop for CmdObserver {
    fn drop(&mut self) {
        if let Some(active) = self.run.get_mut().take() {
            active.cancel.cancel();
        }
    }
}

/// Own the child for one run: wait for it (or kill it on cancel), join
/// both readers, then mark the observer stopped.
async fn supervise(
    mut child: Child,
    readers: Vec<JoinHandle<usize>>,
    cancel: CancellationToken,
    state: Arc<SharedState>,
    kill_timeout: Duration,
    done: watch::Sender<bool>,
) {
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };

    match exited {
        Some(Ok(status)) => debug!(%status, "process exited"),
        Some(Err(e)) => warn!("failed to wait for process: {}", e),
        None => terminate(&mut child, kill_timeout).await,
    }
    drop(child);

    for reader in readers {
        match reader.await {
            Ok(records) => debug!(records, "reader finished"),
            Err(e) => error!("stream reader task panicked: {}", e),
        }
    }

    if let Err(e) = state.transition_to(ObserverState::Stopped) {
        warn!("observer state not updated: {}", e);
    }
    let _ = done.send(true);
}

/// Force-kill the child and wait a bounded time for it to exit.
async fn terminate(child: &mut Child, kill_timeout: Duration) {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(%status, "process already exited");
            return;
        }
        Ok(None) => {}
        Err(e) => warn!("failed to poll process: {}", e),
    }

    if let Err(e) = child.start_kill() {
        warn!("failed to kill process: {}", e);
    }

    match tokio::time::timeout(kill_timeout, child.wait()).await {
        Ok(Ok(status)) => debug!(%status, "process killed"),
        Ok(Err(e)) => warn!("failed to wait for killed process: {}", e),
        Err(_) => warn!(
            "process did not exit within {:?} of kill; releasing handle",
            kill_timeout
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let observer = CmdObserver::new(Command::new("true"), Mode::default());
        assert_eq!(observer.mode(), Mode::Batch);
        assert_eq!(observer.state(), ObserverState::Idle);
        assert!(!observer.is_running());
        assert!(observer.is_empty());
        assert_eq!(observer.pending(), 0);
        assert_eq!(DEFAULT_KILL_TIMEOUT, Duration::from_secs(5));
    }

    #[test]
    fn test_display_is_command_line() {
        let observer = CmdObserver::realtime(Command::new("tail").args(["-f", "app.log"]));
        assert_eq!(observer.to_string(), "tail -f app.log");
        assert_eq!(observer.command().program, "tail");
    }

    #[test]
    fn test_output_into_records() {
        assert!(Output::Unavailable.is_unavailable());
        assert!(Output::Unavailable.into_records().is_empty());

        let line = Output::Line(LineRecord::stdout_line("x"));
        assert!(!line.is_unavailable());
        assert_eq!(line.into_records().len(), 1);

        let batch = Output::Batch(vec![
            LineRecord::stdout_line("a"),
            LineRecord::stderr_line("b"),
        ]);
        assert_eq!(batch.into_records().len(), 2);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let observer = CmdObserver::batch(Command::new("true"));
        observer.stop().await;
        assert_eq!(observer.state(), ObserverState::Idle);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let observer = CmdObserver::batch(Command::new("script-glue-no-such-program-7f3a"));
        let err = observer.start().await.unwrap_err();

        assert!(matches!(err, GlueError::Spawn { .. }));
        assert_eq!(observer.state(), ObserverState::Idle);
    }

    #[tokio::test]
    async fn test_instances_do_not_share_channels() {
        let first = CmdObserver::batch(Command::new("true"));
        let second = CmdObserver::batch(Command::new("true"));

        first.channel.put(LineRecord::stdout_line("only first"));
        assert_eq!(first.pending(), 1);
        assert!(second.is_empty());
        assert!(second.get(Duration::from_millis(20)).await.is_unavailable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_batch_run_collects_both_streams() {
        let observer = CmdObserver::batch(
            Command::new("sh").args(["-c", "echo out1; echo err1 >&2; echo out2"]),
        );
        observer.start().await.unwrap();
        assert_eq!(observer.state(), ObserverState::Stopped);

        let records = observer.get(Duration::from_secs(1)).await.into_records();
        let stdout: Vec<_> = records.iter().filter_map(|r| r.stdout()).collect();
        let stderr: Vec<_> = records.iter().filter_map(|r| r.stderr()).collect();
        assert_eq!(stdout, vec!["out1", "out2"]);
        assert_eq!(stderr, vec!["err1"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_realtime_stop_kills_process() {
        let observer = CmdObserver::realtime(Command::new("sleep").arg("30"))
            .with_kill_timeout(Duration::from_secs(2));
        observer.start().await.unwrap();
        assert!(observer.is_running());

        let stopped = tokio::time::timeout(Duration::from_secs(5), observer.stop()).await;
        assert!(stopped.is_ok(), "stop should return promptly");
        assert_eq!(observer.state(), ObserverState::Stopped);
    }
}
