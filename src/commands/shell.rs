//! Shell command entries and the subprocess runner shared with
//! external modules.
//!
//! Children run with stdout and stderr captured into one buffer in arrival
//! order. A child that outlives its deadline is killed and whatever it had
//! written so far is still returned.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::CommandError;

/// Combined output of a finished (or killed) child.
#[derive(Debug, Default)]
pub struct Captured {
    pub output: Vec<u8>,
    /// `None` when the child was killed on timeout.
    pub status: Option<ExitStatus>,
}

impl Captured {
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    /// Decode the output as UTF-8 text.
    pub fn into_text(self) -> Result<String, CommandError> {
        Ok(String::from_utf8(self.output)?)
    }
}

/// Run `program args...`, optionally feeding `stdin`, with a hard deadline.
pub async fn run_captured(
    program: &str,
    args: &[String],
    stdin: Option<&[u8]>,
    deadline: Duration,
) -> Result<Captured, CommandError> {
    debug!(program = %program, args = ?args, "spawning child");

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CommandError::Spawn {
            path: program.to_string(),
            source,
        })?;

    let mut input = child.stdin.take();
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut output = Vec::new();

    // Payload is written under the deadline, alongside the reads.
    let collect = async {
        let feed = async {
            if let (Some(payload), Some(mut pipe)) = (stdin, input.take())
                && let Err(e) = pipe.write_all(payload).await
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                return Err(e);
            }
            Ok(())
        };
        let drain = async {
            let mut out_buf = [0u8; 4096];
            let mut err_buf = [0u8; 4096];
            loop {
                tokio::select! {
                    read = read_some(&mut stdout, &mut out_buf), if stdout.is_some() => {
                        match read? {
                            0 => stdout = None,
                            n => output.extend_from_slice(&out_buf[..n]),
                        }
                    }
                    read = read_some(&mut stderr, &mut err_buf), if stderr.is_some() => {
                        match read? {
                            0 => stderr = None,
                            n => output.extend_from_slice(&err_buf[..n]),
                        }
                    }
                    else => break,
                }
            }
            Ok::<(), std::io::Error>(())
        };
        tokio::try_join!(feed, drain)?;
        child.wait().await
    };

    let finished = tokio::time::timeout(deadline, collect).await;
    match finished {
        Ok(status) => Ok(Captured {
            output,
            status: Some(status?),
        }),
        Err(_) => {
            warn!(program = %program, timeout = ?deadline, "child timed out, killing");
            if let Err(e) = child.kill().await {
                warn!(program = %program, error = %e, "failed to kill child");
            }
            Ok(Captured {
                output,
                status: None,
            })
        }
    }
}

async fn read_some<R>(pipe: &mut Option<R>, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: tokio::io::AsyncRead + Unpin,
{
    match pipe {
        Some(r) => r.read(buf).await,
        None => Ok(0),
    }
}

/// A trigger token bound to an executable.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    path: PathBuf,
    timeout: Duration,
}

impl ShellCommand {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Execute with `args` and return the combined output as text.
    pub async fn execute(&self, args: &[String]) -> Result<String, CommandError> {
        let program = self.path.to_string_lossy();
        let captured = run_captured(&program, args, None, self.timeout).await?;
        if let Some(status) = captured.status
            && !status.success()
        {
            debug!(path = %program, status = %status, "command exited unsuccessfully");
        }
        captured.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let cmd = ShellCommand::new("/bin/sh", Duration::from_secs(5));
        let out = cmd
            .execute(&["-c".into(), "echo out; echo err 1>&2".into()])
            .await
            .unwrap();
        assert!(out.contains("out"));
        assert!(out.contains("err"));
    }

    #[tokio::test]
    async fn passes_arguments() {
        let cmd = ShellCommand::new("/bin/echo", Duration::from_secs(5));
        let out = cmd.execute(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(out, "a b\n");
    }

    #[tokio::test]
    async fn timeout_kills_and_keeps_partial_output() {
        let captured = run_captured(
            "/bin/sh",
            &["-c".into(), "echo early; sleep 30; echo late".into()],
            None,
            Duration::from_millis(500),
        )
        .await
        .unwrap();
        assert!(captured.timed_out());
        let text = captured.into_text().unwrap();
        assert!(text.contains("early"));
        assert!(!text.contains("late"));
    }

    #[tokio::test]
    async fn feeds_stdin() {
        let captured = run_captured(
            "/bin/cat",
            &[],
            Some(b"payload"),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(captured.into_text().unwrap(), "payload");
    }

    #[tokio::test]
    async fn unread_stdin_does_not_outlast_deadline() {
        let payload = vec![b'x'; 1 << 20];
        let started = std::time::Instant::now();
        let captured = run_captured(
            "/bin/sh",
            &["-c".into(), "exec sleep 30".into()],
            Some(payload.as_slice()),
            Duration::from_millis(500),
        )
        .await
        .unwrap();
        assert!(captured.timed_out());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let cmd = ShellCommand::new("/nonexistent/smirc-test", Duration::from_secs(1));
        let err = cmd.execute(&[]).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_decode_error() {
        let cmd = ShellCommand::new("/usr/bin/printf", Duration::from_secs(5));
        let err = cmd.execute(&["\\377".into()]).await.unwrap_err();
        assert!(matches!(err, CommandError::Decode(_)));
    }
}
