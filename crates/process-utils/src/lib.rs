//! Small process-related helpers shared across the workspace.

use std::ffi::OsStr;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

#[cfg(feature = "tokio")]
impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `tokio::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
#[cfg(feature = "tokio")]
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window();
    cmd
}

#[cfg(feature = "tokio")]
pub use bounded::{CapturedOutput, ProcessError, output_with_timeout};

#[cfg(feature = "tokio")]
mod bounded {
    use std::process::Stdio;
    use std::time::Duration;

    use tokio::io::{AsyncRead, AsyncReadExt};
    use tokio::process::Command;
    use tokio::task::JoinHandle;

    /// Errors from running a child process under a deadline.
    #[derive(Debug, thiserror::Error)]
    pub enum ProcessError {
        #[error("failed to spawn process: {0}")]
        Spawn(#[source] std::io::Error),

        #[error("process I/O error: {0}")]
        Io(#[from] std::io::Error),

        #[error("process timed out after {0:?}")]
        TimedOut(Duration),
    }

    /// Captured output of a finished child process.
    #[derive(Debug, Clone, Default)]
    pub struct CapturedOutput {
        /// Exit code, `None` when the process was terminated by a signal.
        pub code: Option<i32>,
        pub stdout: String,
        pub stderr: String,
    }

    impl CapturedOutput {
        pub fn success(&self) -> bool {
            self.code == Some(0)
        }

        /// Stdout and stderr joined with a newline, skipping empty halves.
        pub fn combined(&self) -> String {
            match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
                (false, false) => format!("{}\n{}", self.stdout.trim(), self.stderr.trim()),
                (false, true) => self.stdout.trim().to_string(),
                (true, false) => self.stderr.trim().to_string(),
                (true, true) => String::new(),
            }
        }
    }

    fn drain<R>(reader: Option<R>) -> JoinHandle<std::io::Result<String>>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut reader) = reader {
                reader.read_to_end(&mut buf).await?;
            }
            Ok(String::from_utf8_lossy(&buf).into_owned())
        })
    }

    async fn join_output(handle: JoinHandle<std::io::Result<String>>) -> std::io::Result<String> {
        handle
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?
    }

    /// Run `cmd` to completion, capturing stdout and stderr.
    ///
    /// If the process has not exited within `timeout` it is killed and reaped
    /// before `ProcessError::TimedOut` is returned, so no child outlives the call.
    pub async fn output_with_timeout(
        mut cmd: Command,
        timeout: Duration,
    ) -> Result<CapturedOutput, ProcessError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(ProcessError::Spawn)?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                Ok(CapturedOutput {
                    code: status.code(),
                    stdout: join_output(stdout).await?,
                    stderr: join_output(stderr).await?,
                })
            }
            _ = tokio::time::sleep(timeout) => {
                // kill() also waits, so the child is reaped here
                let _ = child.kill().await;
                stdout.abort();
                stderr.abort();
                Err(ProcessError::TimedOut(timeout))
            }
        }
    }

}
