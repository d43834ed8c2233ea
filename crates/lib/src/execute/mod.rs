//! External process execution.
//!
//! Every tool the release build drives (MSBuild, symstore, git) goes through
//! here. Output is forwarded line by line to the log as it is produced, so a
//! long toolchain run is visible while it happens. Nothing here interprets exit
//! codes beyond success or failure; callers decide what a failure means.

pub mod types;

use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

pub use types::{ExecuteError, Invocation};

fn command(inv: &Invocation) -> Command {
  let mut command = Command::new(&inv.program);
  command.args(&inv.args).envs(&inv.env);
  if let Some(cwd) = &inv.cwd {
    command.current_dir(cwd);
  }
  command
}

/// Forward each line of a child's output stream to the log.
///
/// Lines are decoded lossily; Windows tools often print in an OEM code page.
/// The stream is drained to EOF so the child never sees a closed pipe.
async fn forward_lines<R>(stream: Option<R>)
where
  R: AsyncRead + Unpin,
{
  let Some(stream) = stream else {
    return;
  };

  let mut reader = BufReader::new(stream);
  let mut buf = Vec::new();
  loop {
    buf.clear();
    match reader.read_until(b'\n', &mut buf).await {
      Ok(0) => break,
      Ok(_) => info!("{}", String::from_utf8_lossy(&buf).trim_end()),
      Err(e) => {
        warn!(error = %e, "failed to read process output");
        break;
      }
    }
  }
}

/// Run a program to completion, streaming its output to the log.
///
/// Returns the exit status; a non-zero status is not an error here.
pub async fn run(inv: &Invocation) -> Result<ExitStatus, ExecuteError> {
  info!(cmd = %inv, cwd = ?inv.cwd, "running");

  let mut child = command(inv)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .map_err(|source| ExecuteError::Spawn {
      cmd: inv.to_string(),
      source,
    })?;

  let stdout = child.stdout.take();
  let stderr = child.stderr.take();

  let (status, _, _) = tokio::join!(child.wait(), forward_lines(stdout), forward_lines(stderr));
  let status = status?;

  debug!(cmd = %inv, code = ?status.code(), "finished");
  Ok(status)
}

/// Run a program and fail unless it exits successfully.
pub async fn run_checked(inv: &Invocation) -> Result<(), ExecuteError> {
  let status = run(inv).await?;

  if !status.success() {
    return Err(ExecuteError::CmdFailed {
      cmd: inv.to_string(),
      code: status.code(),
    });
  }

  Ok(())
}

/// Run a program and return its standard output.
///
/// Standard error is logged at debug level when the program fails.
pub async fn capture(inv: &Invocation) -> Result<String, ExecuteError> {
  debug!(cmd = %inv, cwd = ?inv.cwd, "capturing output");

  let output = command(inv)
    .stdin(Stdio::null())
    .output()
    .await
    .map_err(|source| ExecuteError::Spawn {
      cmd: inv.to_string(),
      source,
    })?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }

    return Err(ExecuteError::CmdFailed {
      cmd: inv.to_string(),
      code: output.status.code(),
    });
  }

  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
