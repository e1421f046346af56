use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::ToolError;

/// Program plus the leading arguments every invocation starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Short name used in logs and error messages.
    pub fn name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.clone())
    }
}

/// Splits a command line on whitespace. No quoting is supported.
impl FromStr for ToolCommand {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let program = parts.next().ok_or(ToolError::NotConfigured("command"))?;
        Ok(Self {
            program: program.to_string(),
            args: parts.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `command` followed by `extra` and waits for it to exit.
///
/// The child is killed when `timeout` elapses. A non-zero exit or a signal
/// is reported as [`ToolError::Crashed`] with the captured stderr.
pub async fn run_tool<I, S>(command: &ToolCommand, extra: I, timeout: Duration) -> Result<ToolOutput, ToolError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let tool = command.name();
    let extra: Vec<OsString> = extra.into_iter().map(Into::into).collect();
    info!("Running {command} {}", display_args(&extra));

    let child = Command::new(command.program())
        .args(command.args())
        .args(&extra)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ToolError::Spawn {
            tool: tool.clone(),
            source,
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output.map_err(|source| ToolError::Spawn {
            tool: tool.clone(),
            source,
        })?,
        Err(_) => {
            warn!("{tool} timed out after {timeout:?}");
            return Err(ToolError::Timeout {
                tool,
                secs: timeout.as_secs(),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        warn!("{tool} exited with {}", output.status);
        return Err(ToolError::Crashed {
            tool,
            code: output.status.code(),
            stderr: stderr.trim().to_string(),
        });
    }
    debug!("{tool} finished");
    Ok(ToolOutput { stdout, stderr })
}

fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Removes an output left behind by an earlier run.
pub(crate) async fn clear_output(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Fails with [`ToolError::NoOutput`] unless `path` exists.
pub(crate) fn expect_output(tool: &ToolCommand, path: &Path) -> Result<(), ToolError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ToolError::NoOutput {
            tool: tool.name(),
            path: path.to_path_buf(),
        })
    }
}
