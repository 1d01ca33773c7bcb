#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::Stdio,
    time::Duration,
};

use anyhow::Context;
use tokio::{
    io::{AsyncReadExt, BufReader},
    process::{Child, Command},
    time::timeout,
};

/// Drop guard that terminates a spawned child process, and every process it
/// started, if callers forget to await it or if the deadline elapses first.
struct ChildDropGuard {
    /// The child, until it has been awaited.
    child: Option<Child>,
    /// Process group the child leads.
    group: Option<u32>,
}

impl ChildDropGuard {
    /// Wraps the provided child process with the drop guard.
    fn new(child: Child) -> Self {
        let group = child.id();
        Self {
            child: Some(child),
            group,
        }
    }

    /// Returns a mutable reference to the underlying child process.
    fn child_mut(&mut self) -> anyhow::Result<&mut Child> {
        self.child
            .as_mut()
            .context("child process already taken from guard")
    }

    /// Prevents the guard from killing the process on drop.
    fn disarm(mut self) {
        self.child = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Some(group) = self.group {
                kill_group(group);
            }
            let _ = child.start_kill();
        }
    }
}

/// Sends SIGKILL to the whole process group led by `leader`.
#[cfg(unix)]
fn kill_group(leader: u32) {
    use nix::{
        sys::signal::{Signal, killpg},
        unistd::Pid,
    };

    let Ok(raw) = i32::try_from(leader) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        tracing::debug!("could not kill process group {leader}: {e}");
    }
}

/// Process groups are a unix notion; elsewhere only the child is killed.
#[cfg(not(unix))]
fn kill_group(_leader: u32) {}

/// Reasons a subprocess could not produce a [`Collected`] result.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    /// The program could not be started at all.
    #[error("failed to spawn `{program}`")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source:  std::io::Error,
    },
    /// The program ran past its deadline and was killed.
    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    /// Reading pipes or waiting on the child failed.
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct Collected {
    /// Exit status returned by the process.
    pub status: std::process::ExitStatus,
    /// Contents written to stdout.
    pub stdout: Vec<u8>,
    /// Contents written to stderr.
    pub stderr: Vec<u8>,
}

impl Collected {
    /// Lossily decoded stdout followed by stderr, trimmed.
    pub fn combined_output(&self) -> String {
        let stdout = String::from_utf8_lossy(&self.stdout);
        let stderr = String::from_utf8_lossy(&self.stderr);
        format!("{}\n{}", stdout.trim_end(), stderr.trim_end())
            .trim()
            .to_string()
    }

    /// Lossily decoded stderr, trimmed.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Spawns a command with a null stdin inside `cwd` and collects
/// stdout/stderr, killing it if `deadline` elapses.
pub async fn run_collect(
    program: impl AsRef<OsStr>,
    args: &[OsString],
    cwd: &Path,
    deadline: Option<Duration>,
) -> Result<Collected, ProcessError> {
    let program_name = program.as_ref().to_string_lossy().into_owned();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: program_name.clone(),
        source,
    })?;
    let mut guard = ChildDropGuard::new(child);

    let stdout = guard
        .child_mut()?
        .stdout
        .take()
        .context("missing stdout pipe")?;
    let stderr = guard
        .child_mut()?
        .stderr
        .take()
        .context("missing stderr pipe")?;

    let out_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .context("failed to read stdout")?;
        Ok::<Vec<u8>, anyhow::Error>(buf)
    });

    let err_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .context("failed to read stderr")?;
        Ok::<Vec<u8>, anyhow::Error>(buf)
    });

    let readers = [out_task.abort_handle(), err_task.abort_handle()];

    let wait_future = async move {
        let mut guard = guard;
        let status = guard
            .child_mut()?
            .wait()
            .await
            .context("failed to wait on process")?;
        let stdout = out_task.await.context("stdout task join error")??;
        let stderr = err_task.await.context("stderr task join error")??;
        guard.disarm();
        Ok::<Collected, anyhow::Error>(Collected {
            status,
            stdout,
            stderr,
        })
    };

    match deadline {
        Some(limit) => match timeout(limit, wait_future).await {
            Ok(collected) => Ok(collected?),
            Err(_) => {
                readers.iter().for_each(|reader| reader.abort());
                tracing::warn!(program = %program_name, "subprocess timed out after {limit:?}");
                Err(ProcessError::TimedOut(limit))
            }
        },
        None => Ok(wait_future.await?),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<OsString> {
        vec![OsString::from("-c"), OsString::from(script)]
    }

    #[tokio::test]
    async fn collects_both_streams() {
        let collected = run_collect("sh", &sh("echo out; echo err >&2"), Path::new("."), None)
            .await
            .expect("run sh");
        assert!(collected.status.success());
        assert_eq!(collected.combined_output(), "out\nerr");
        assert_eq!(collected.stderr_text(), "err");
    }

    #[tokio::test]
    async fn deadline_becomes_a_timeout() {
        let err = run_collect(
            "sh",
            &sh("sleep 5"),
            Path::new("."),
            Some(Duration::from_millis(100)),
        )
        .await
        .expect_err("should time out");
        assert!(matches!(err, ProcessError::TimedOut(_)));
    }

    /// True while `pid` exists and is not a zombie.
    #[cfg(target_os = "linux")]
    fn alive(pid: &str) -> bool {
        std::fs::read_to_string(format!("/proc/{pid}/stat"))
            .map(|stat| {
                stat.rsplit_once(") ")
                    .is_some_and(|(_, rest)| !rest.starts_with('Z'))
            })
            .unwrap_or(false)
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn timeout_kills_grandchildren_too() {
        let dir = std::env::temp_dir().join(format!("nandgrade-pg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");

        let err = run_collect(
            "sh",
            &sh("sleep 30 & echo $! > child.pid; wait"),
            &dir,
            Some(Duration::from_millis(300)),
        )
        .await
        .expect_err("should time out");
        assert!(matches!(err, ProcessError::TimedOut(_)));

        let pid = std::fs::read_to_string(dir.join("child.pid")).expect("read pid");
        let pid = pid.trim();
        let mut gone = false;
        for _ in 0..40 {
            if !alive(pid) {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(gone, "sleep {pid} outlived the timeout");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = run_collect("nandgrade-no-such-tool", &[], Path::new("."), None)
            .await
            .expect_err("should not spawn");
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
