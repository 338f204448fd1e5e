//! Subprocess supervision
//!
//! Capture subprocesses are spawned through a `ProcessLauncher` and torn
//! down with a two-phase protocol: a polite termination signal first, then a
//! forced kill if the process ignores it past the grace window. Shutdown
//! completion is gated on the confirmed process exit, not on signal
//! delivery, so callers can assume output files are released afterwards.

use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Command line for a capture subprocess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// A live subprocess owned by one adapter
#[async_trait]
pub trait ProcessHandle: Send {
    /// Ask the process to exit gracefully (SIGTERM on unix).
    fn terminate(&mut self) -> io::Result<()>;

    /// Kill the process without further ceremony.
    fn force_kill(&mut self) -> io::Result<()>;

    /// Wait for the process to exit. Resolves only on confirmed exit.
    async fn wait(&mut self) -> io::Result<()>;
}

/// Spawns capture subprocesses
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, spec: &CommandSpec) -> io::Result<Box<dyn ProcessHandle>>;
}

/// Launcher backed by real OS processes
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, spec: &CommandSpec) -> io::Result<Box<dyn ProcessHandle>> {
        let child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        Ok(Box::new(ChildHandle { child }))
    }
}

/// Handle over a `tokio::process::Child`
struct ChildHandle {
    child: Child,
}

#[async_trait]
impl ProcessHandle for ChildHandle {
    fn terminate(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            match self.child.id() {
                Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
                    .map_err(|e| io::Error::from_raw_os_error(e as i32)),
                // Already exited; nothing to signal.
                None => Ok(()),
            }
        }

        #[cfg(not(unix))]
        {
            self.force_kill()
        }
    }

    fn force_kill(&mut self) -> io::Result<()> {
        match self.child.start_kill() {
            // start_kill reports InvalidInput once the child has exited.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }

    async fn wait(&mut self) -> io::Result<()> {
        self.child.wait().await.map(|_| ())
    }
}

/// Two-phase shutdown: terminate, wait up to `grace`, then force-kill and
/// wait for the exit to be confirmed.
pub async fn shutdown(handle: &mut dyn ProcessHandle, grace: Duration) -> io::Result<()> {
    handle.terminate()?;

    match tokio::time::timeout(grace, handle.wait()).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                "Process ignored graceful termination for {}s, forcing kill",
                grace.as_secs()
            );
            handle.force_kill()?;
            handle.wait().await
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeHandle;
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test(start_paused = true)]
    async fn shutdown_resolves_on_graceful_exit() {
        let (mut handle, state) = FakeHandle::new(true);

        shutdown(&mut handle, Duration::from_secs(5)).await.unwrap();

        assert_eq!(state.term_signals.load(Ordering::SeqCst), 1);
        assert_eq!(state.kill_signals.load(Ordering::SeqCst), 0);
        assert!(state.exited());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_escalates_when_terminate_is_ignored() {
        let (mut handle, state) = FakeHandle::new(false);

        shutdown(&mut handle, Duration::from_secs(5)).await.unwrap();

        assert_eq!(state.term_signals.load(Ordering::SeqCst), 1);
        assert_eq!(state.kill_signals.load(Ordering::SeqCst), 1);
        assert!(state.exited());
    }

    #[test]
    fn command_spec_collects_args() {
        let spec = CommandSpec::new("ffmpeg", ["-f", "pulse"]);
        assert_eq!(spec.program, "ffmpeg");
        assert_eq!(spec.args, vec!["-f".to_string(), "pulse".to_string()]);
    }
}
