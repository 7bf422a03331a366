//! Application service — run a command batch on a new machine over the
//! remote shell, retrying connection-level failures.
//!
//! Imports only from `crate::domain` and `crate::application`.

use tracing::{info, warn};

use crate::application::ports::{OutputSink, RemoteShell, ShellSession};
use crate::application::retry::{RetryError, RetryPolicy, with_retry};
use crate::domain::{CommandResult, ShellError, SshTarget};

/// Result of one bootstrap run against one host.
#[derive(Debug, Default)]
pub struct ExecReport {
    pub host: String,
    /// Connection attempts made, including the successful one.
    pub attempts: u32,
    /// Results of the attempt that got a session, in command order.
    pub results: Vec<CommandResult>,
    pub errors: Vec<String>,
}

impl ExecReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Open a session on `target` and run `commands` in order.
///
/// Connection-level failures (refused, timeout, disconnect, auth) are retried
/// per `policy`; any other shell error ends the run at once. A command with a
/// non-zero exit status is recorded as an error but later commands still run.
/// Only the results of the final attempt are kept.
pub async fn execute(
    shell: &impl RemoteShell,
    target: &SshTarget,
    commands: &[String],
    policy: RetryPolicy,
    out: &impl OutputSink,
) -> ExecReport {
    let host = target.host.as_str();
    let mut report = ExecReport {
        host: host.to_owned(),
        ..ExecReport::default()
    };
    if commands.is_empty() {
        return report;
    }

    out.write_output(&format!(
        "Running SSH Commands On New Machine {host} - {}\n",
        commands.join(", ")
    ));
    info!(host, count = commands.len(), "running bootstrap commands");

    let outcome = with_retry(
        policy,
        ShellError::is_connection_level,
        |attempt, err| {
            warn!(host, attempt, error = %err, "remote shell attempt failed");
            out.write_output(&format!(
                "[{host}] Try {attempt} - failed to connect: {err}, retrying...\n"
            ));
        },
        |attempt| async move {
            let mut session = shell.open(target).await?;
            let results = session.run(commands).await?;
            Ok::<_, ShellError>((attempt, results))
        },
    )
    .await;

    match outcome {
        Ok((attempts, results)) => {
            report.attempts = attempts;
            for result in &results {
                record_result(host, result, out, &mut report.errors);
            }
            report.results = results;
        }
        Err(RetryError::Exhausted { attempts, last }) => {
            report.attempts = attempts;
            out.write_output(&format!(
                "[{host}] Try {attempts} - failed to connect: {last}\n"
            ));
            let msg = format!("[{host}] Could not connect to remote machine after {attempts} attempts");
            warn!(host, attempts, "giving up on remote shell");
            out.write_output(&format!("{msg}\n"));
            report.errors.push(msg);
        }
        Err(RetryError::Fatal { attempt, error }) => {
            report.attempts = attempt;
            let msg = format!("[{host}] Remote shell failed: {error}");
            warn!(host, attempt, error = %error, "remote shell failed");
            out.write_output(&format!("{msg}\n"));
            report.errors.push(msg);
        }
    }
    report
}

fn record_result(host: &str, result: &CommandResult, out: &impl OutputSink, errors: &mut Vec<String>) {
    out.write_output(&format!(
        "[{host}] Ran Command {} With Output:\n{}\n",
        result.command, result.stdout
    ));
    if !result.stderr.is_empty() {
        out.write_output(&format!("[{host}] Stderr:\n{}\n", result.stderr));
    }
    if !result.success() {
        let msg = format!(
            "[{host}] Command '{}' failed with status {}",
            result.command, result.exit_status
        );
        out.write_output(&format!("{msg}\n"));
        errors.push(msg);
    }
}
