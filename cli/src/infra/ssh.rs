//! Infrastructure implementation of the `RemoteShell` port on top of the
//! system `ssh` binary.
//!
//! Every command runs as its own `ssh` invocation through a `CommandRunner`.
//! Exit status 255 is ssh's own failure code. A failed connection probe is
//! always a connection-level `ShellError`; inside a batch, 255 only counts as
//! one when stderr carries an ssh diagnostic.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::application::ports::{CommandRunner, RemoteShell, ShellSession};
use crate::domain::{CommandResult, ShellError, SshAuth, SshTarget};
use crate::infra::command_runner::{REMOTE_COMMAND_TIMEOUT, TokioCommandRunner};

/// Exit status ssh reserves for its own errors.
const SSH_FAILURE: i32 = 255;

/// Per-connection timeout passed as `ConnectTimeout`.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// `RemoteShell` backed by the OpenSSH client.
pub struct OpenSshShell<R: CommandRunner> {
    runner: Arc<R>,
    connect_timeout: Duration,
}

impl OpenSshShell<TokioCommandRunner> {
    /// Shell driving the local `ssh` client, one command at a time.
    #[must_use]
    pub fn local() -> Self {
        Self::new(TokioCommandRunner::new(REMOTE_COMMAND_TIMEOUT))
    }
}

impl<R: CommandRunner> OpenSshShell<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner: Arc::new(runner),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// An established target plus the key file it authenticates with.
pub struct OpenSshSession<R: CommandRunner> {
    runner: Arc<R>,
    target: SshTarget,
    connect_timeout: Duration,
    /// Inline key material, deleted when the session drops.
    key_file: Option<NamedTempFile>,
}

impl<R: CommandRunner> OpenSshSession<R> {
    async fn exec(&self, command: &str) -> Result<CommandResult, ShellError> {
        let key_path = match (&self.target.auth, &self.key_file) {
            (_, Some(file)) => Some(file.path()),
            (SshAuth::KeyFile(path), None) => Some(path.as_path()),
            _ => None,
        };
        let args = ssh_args(&self.target, key_path, self.connect_timeout, command);
        let (program, args, envs) = match &self.target.auth {
            SshAuth::Password(password) => {
                let mut wrapped = vec!["-e".to_owned(), "ssh".to_owned()];
                wrapped.extend(args);
                ("sshpass", wrapped, vec![("SSHPASS", password.as_str())])
            }
            _ => ("ssh", args, Vec::new()),
        };
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        debug!(host = %self.target.host, command, "ssh exec");

        let output = self
            .runner
            .run_with_env(program, &arg_refs, &envs)
            .await
            .map_err(|e| ShellError::Other(format!("{e:#}")))?;
        Ok(CommandResult {
            command: command.to_owned(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_status: output.status.code().unwrap_or(-1),
        })
    }
}

impl<R: CommandRunner> ShellSession for OpenSshSession<R> {
    async fn run(&mut self, commands: &[String]) -> Result<Vec<CommandResult>, ShellError> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            let result = self.exec(command).await?;
            // A remote command may exit 255 itself; only ssh's own diagnostics
            // mean the connection dropped.
            match (result.exit_status, diagnose(&result.stderr)) {
                (SSH_FAILURE, Some(err)) => return Err(err),
                _ => results.push(result),
            }
        }
        Ok(results)
    }
}

impl<R: CommandRunner> RemoteShell for OpenSshShell<R> {
    type Session = OpenSshSession<R>;

    async fn open(&self, target: &SshTarget) -> Result<Self::Session, ShellError> {
        let key_file = match &target.auth {
            SshAuth::Key(material) => Some(write_key_file(material)?),
            _ => None,
        };
        let session = OpenSshSession {
            runner: Arc::clone(&self.runner),
            target: target.clone(),
            connect_timeout: self.connect_timeout,
            key_file,
        };
        // Probe so connection problems surface here rather than mid-batch.
        let probe = session.exec("true").await?;
        if probe.exit_status != 0 {
            return Err(classify(&probe.stderr));
        }
        Ok(session)
    }
}

fn write_key_file(material: &str) -> Result<NamedTempFile, ShellError> {
    let mut file = NamedTempFile::new()
        .map_err(|e| ShellError::Other(format!("cannot create key file: {e}")))?;
    file.write_all(material.as_bytes())
        .and_then(|()| {
            if material.ends_with('\n') {
                Ok(())
            } else {
                file.write_all(b"\n")
            }
        })
        .map_err(|e| ShellError::Other(format!("cannot write key file: {e}")))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))
            .map_err(|e| ShellError::Other(format!("cannot restrict key file: {e}")))?;
    }
    Ok(file)
}

/// Build the `ssh` argument list for one command.
fn ssh_args(
    target: &SshTarget,
    key_path: Option<&Path>,
    connect_timeout: Duration,
    command: &str,
) -> Vec<String> {
    let batch_mode = if matches!(target.auth, SshAuth::Password(_)) {
        "BatchMode=no"
    } else {
        "BatchMode=yes"
    };
    let mut args: Vec<String> = [
        "-o",
        batch_mode,
        "-o",
        "StrictHostKeyChecking=no",
        "-o",
        "UserKnownHostsFile=/dev/null",
        "-o",
        "LogLevel=ERROR",
    ]
    .iter()
    .map(|s| (*s).to_owned())
    .collect();
    args.push("-o".into());
    args.push(format!("ConnectTimeout={}", connect_timeout.as_secs().max(1)));
    args.push("-p".into());
    args.push(target.port.to_string());
    if let Some(path) = key_path {
        args.push("-i".into());
        args.push(path.display().to_string());
    }
    args.push(format!("{}@{}", target.user, target.host));
    args.push("--".into());
    args.push(command.to_owned());
    args
}

/// Map ssh's own stderr to a connection-level error.
/// Map a failed connection probe to a `ShellError`.
fn classify(stderr: &str) -> ShellError {
    diagnose(stderr).unwrap_or(ShellError::Disconnected)
}

/// Recognize the ssh client's own connection diagnostics in `stderr`.
fn diagnose(stderr: &str) -> Option<ShellError> {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("connection refused") {
        Some(ShellError::Refused)
    } else if lower.contains("timed out") {
        Some(ShellError::TimedOut)
    } else if lower.contains("permission denied") {
        Some(ShellError::AuthFailed(stderr.trim().to_owned()))
    } else if ["connection closed", "connection reset", "broken pipe"]
        .iter()
        .any(|m| lower.contains(m))
    {
        Some(ShellError::Disconnected)
    } else {
        None
    }
}
