//! External process execution with deadlines

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::{Error, Result};

/// Run `program` with `args` and return its standard output
///
/// The child is killed if `limit` elapses before it exits.
///
/// # Errors
///
/// Returns `Error::Process` if the program cannot be started or exits
/// non-zero, and `Error::Timeout` if it does not finish within `limit`
pub async fn run<I, S>(program: &Path, args: I, limit: Duration) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = program.display().to_string();

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Process(format!("failed to spawn {name}: {e}")))?;

    let output = timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| Error::Timeout {
            what: name.clone(),
            after: limit,
        })?
        .map_err(|e| Error::Process(format!("{name} failed: {e}")))?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(program = %name, code, stderr = %stderr, "process stderr");
        return Err(Error::Process(format!(
            "{name} exited with code {code}: {}",
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const LIMIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn captures_stdout() {
        let out = run(Path::new("sh"), ["-c", "echo hello"], LIMIT)
            .await
            .unwrap();
        assert_eq!(out, "hello\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_process_error() {
        let err = run(Path::new("sh"), ["-c", "echo broken >&2; exit 3"], LIMIT)
            .await
            .unwrap_err();

        match err {
            Error::Process(msg) => {
                assert!(msg.contains("code 3"), "{msg}");
                assert!(msg.contains("broken"), "{msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_process_error() {
        let err = run(Path::new("/nonexistent/tool"), ["--help"], LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Process(_)));
    }

    #[tokio::test]
    async fn slow_program_times_out() {
        let err = run(
            Path::new("sh"),
            ["-c", "sleep 5"],
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }
}
