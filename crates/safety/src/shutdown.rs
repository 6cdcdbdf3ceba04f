//! Operating-system shutdown requests.
//!
//! Runs `shutdown -h +1 "Safety shutdown: <reason>"` so logged-in users and
//! other services get the standard one-minute broadcast before power-off.
//! The monitors run as root under systemd, so no privilege escalation is
//! attempted.

use std::future::Future;
use std::time::Duration;

use tokio::process::Command;

/// Delay argument handed to `shutdown` (one minute).
pub const SHUTDOWN_DELAY_ARG: &str = "+1";

/// How long the monitor waits after requesting shutdown before exiting.
/// Longer than the one-minute grace so the OS finishes first.
pub const POST_SHUTDOWN_WAIT: Duration = Duration::from_secs(70);

/// Upper bound on how long the `shutdown` command itself may take.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with status {code}: {stderr}")]
    Failed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("{program} did not complete within {}s", COMMAND_TIMEOUT.as_secs())]
    TimedOut { program: String },
}

/// Something that can ask the host to power off.
pub trait ShutdownIssuer: Send + Sync {
    /// Request a delayed shutdown, citing `reason` in the broadcast.
    fn request_shutdown(
        &self,
        reason: &str,
    ) -> impl Future<Output = Result<(), ShutdownError>> + Send;
}

/// Arguments passed to `shutdown` for `reason`.
pub fn shutdown_args(reason: &str) -> [String; 3] {
    [
        "-h".to_string(),
        SHUTDOWN_DELAY_ARG.to_string(),
        format!("Safety shutdown: {reason}"),
    ]
}

/// Issues the real `shutdown` command.
#[derive(Debug, Clone)]
pub struct SystemShutdown {
    program: String,
}

impl Default for SystemShutdown {
    fn default() -> Self {
        Self {
            program: "shutdown".to_string(),
        }
    }
}

impl SystemShutdown {
    /// Use a different executable in place of `shutdown`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ShutdownIssuer for SystemShutdown {
    async fn request_shutdown(&self, reason: &str) -> Result<(), ShutdownError> {
        let args = shutdown_args(reason);

        let result = tokio::time::timeout(
            COMMAND_TIMEOUT,
            Command::new(&self.program)
                .args(&args)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                tracing::info!(program = %self.program, "Shutdown scheduled");
                Ok(())
            }
            Ok(Ok(output)) => Err(ShutdownError::Failed {
                program: self.program.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
            Ok(Err(source)) => Err(ShutdownError::Spawn {
                program: self.program.clone(),
                source,
            }),
            Err(_) => Err(ShutdownError::TimedOut {
                program: self.program.clone(),
            }),
        }
    }
}
