// Copyright 2025 Transpire Team.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Running external tools (`git`, `helm`, `kubectl`, `kubeseal`, `vault`).

use crate::shared::error::{Result, TranspireError};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Make sure `tool` is on PATH before starting work that needs it.
pub fn ensure_tool(tool: &str) -> Result<PathBuf> {
    which::which(tool)
        .map_err(|e| TranspireError::tool_failed(tool, format!("not found on PATH: {}", e)))
}

/// Run `program` to completion and return its stdout.
///
/// `input`, if given, is written to the child's stdin. A non-zero exit is a
/// [`TranspireError::ToolFailed`] carrying the command line and stderr.
pub async fn run<I, S>(
    program: &str,
    args: I,
    cwd: Option<&Path>,
    input: Option<&[u8]>,
) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    let command_line = std::iter::once(program.to_string())
        .chain(args.iter().map(|a| a.to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join(" ");
    debug!("Running {}", command_line);

    let mut command = Command::new(program);
    command
        .args(&args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command
        .spawn()
        .map_err(|e| TranspireError::tool_failed(program, format!("{}: {}", command_line, e)))?;

    // stdin is fed while stdout and stderr are drained; the tool may fill its
    // output pipes before it has read all of its input.
    let stdin = child.stdin.take();
    let feed = async move {
        if let (Some(mut stdin), Some(bytes)) = (stdin, input) {
            stdin.write_all(bytes).await?;
            stdin.shutdown().await?;
        }
        Ok::<_, std::io::Error>(())
    };
    let (fed, output) = tokio::join!(feed, child.wait_with_output());

    let output = output?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TranspireError::tool_failed(
            program,
            format!("`{}` exited with {}: {}", command_line, output.status, stderr.trim()),
        ));
    }
    fed?;

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_pipes_stdin() {
        if which::which("cat").is_err() {
            return;
        }
        let out = run("cat", Vec::<String>::new(), None, Some(b"hello")).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_run_pipes_input_larger_than_pipe_buffer() {
        if which::which("cat").is_err() {
            return;
        }
        let input = vec![b'x'; 1024 * 1024];
        let out = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            run("cat", Vec::<String>::new(), None, Some(&input)),
        )
        .await
        .expect("cat did not finish")
        .unwrap();
        assert_eq!(out.len(), input.len());
    }

    #[tokio::test]
    async fn test_run_reports_failure() {
        if which::which("git").is_err() {
            return;
        }
        let err = run("git", ["definitely-not-a-subcommand"], None, None)
            .await
            .unwrap_err();
        match err {
            TranspireError::ToolFailed { tool, message } => {
                assert_eq!(tool, "git");
                assert!(message.contains("definitely-not-a-subcommand"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_tool() {
        assert!(ensure_tool("transpire-no-such-tool").is_err());
    }
}
