//! Helpers for the external command-line tools (pdftoppm, tesseract).

use anyhow::{Context, Result};
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Run `program` with `args`, streaming `input` to its stdin.
///
/// Stdin is written from a separate task so a tool that produces output
/// before consuming all of its input cannot deadlock on a full pipe.
pub async fn run_with_stdin(program: &str, args: &[&str], input: &[u8]) -> std::io::Result<Output> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin unavailable"))?;
    let input = input.to_vec();
    let writer = tokio::spawn(async move {
        let result = stdin.write_all(&input).await;
        drop(stdin);
        result
    });

    let output = child.wait_with_output().await?;

    // A tool that exits early closes the pipe; its exit status tells the real story.
    match writer.await {
        Ok(Err(e)) => debug!("{}: stdin write ended early: {}", program, e),
        Err(e) => debug!("{}: stdin writer task failed: {}", program, e),
        Ok(Ok(())) => {}
    }

    Ok(output)
}

/// Turn a finished command into its stdout, or an error naming the tool.
pub fn stdout_or_error(output: Output, tool_name: &str) -> Result<Vec<u8>> {
    if output.status.success() {
        Ok(output.stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("{} failed ({}): {}", tool_name, output.status, stderr.trim())
    }
}

/// Run `program` with stdin piped in and return stdout on success.
pub async fn pipe_through(program: &str, args: &[&str], input: &[u8]) -> Result<Vec<u8>> {
    let output = run_with_stdin(program, args, input)
        .await
        .with_context(|| format!("failed to run {}", program))?;
    stdout_or_error(output, program)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pipe_through_echoes_stdin() {
        let out = pipe_through("cat", &[], b"raster bytes").await.unwrap();
        assert_eq!(out, b"raster bytes");
    }

    #[tokio::test]
    async fn test_missing_program_is_not_found() {
        let err = run_with_stdin("definitely-not-an-installed-tool", &[], b"")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_failing_program_reports_tool_name() {
        let err = pipe_through("false", &[], b"").await.unwrap_err();
        assert!(err.to_string().contains("false failed"));
    }
}
