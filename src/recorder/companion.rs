//! mactop companion process

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{info, warn};

use super::client::MetricsClient;
use super::RecorderError;

/// Time given to mactop to start serving before the endpoint is checked
const STARTUP_GRACE: Duration = Duration::from_secs(2);

/// A mactop process started by the recorder
///
/// The child is killed when the companion is dropped, so an early return
/// from the recording session never leaves mactop running.
pub struct Companion {
    child: Child,
}

impl Companion {
    /// Command line used to start mactop
    pub fn command_line(port: u16, refresh_ms: u64) -> Vec<String> {
        vec![
            "sudo".to_string(),
            "mactop".to_string(),
            "-p".to_string(),
            port.to_string(),
            "-i".to_string(),
            refresh_ms.to_string(),
        ]
    }

    /// Start mactop and wait until its endpoint answers
    pub async fn launch(
        client: &MetricsClient,
        port: u16,
        refresh_ms: u64,
    ) -> Result<Self, RecorderError> {
        let command = Self::command_line(port, refresh_ms);
        info!("Starting mactop: {}", command.join(" "));
        let companion = Self::spawn(&command)?;

        tokio::time::sleep(STARTUP_GRACE).await;
        if !client.is_available().await {
            companion.terminate().await?;
            return Err(RecorderError::Companion(format!(
                "mactop did not start serving on port {}",
                port
            )));
        }

        Ok(companion)
    }

    /// Spawn `command[0]` with the remaining arguments
    pub fn spawn(command: &[String]) -> Result<Self, RecorderError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| RecorderError::Companion("empty command".to_string()))?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecorderError::Companion(format!("failed to start {}: {}", program, e)))?;

        Ok(Self { child })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Whether the process is still running
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Kill the process and wait for it to exit
    pub async fn terminate(mut self) -> Result<(), RecorderError> {
        if !self.is_running() {
            return Ok(());
        }
        info!("Stopping mactop");
        if let Err(e) = self.child.kill().await {
            warn!("Failed to stop mactop: {}", e);
            return Err(RecorderError::Companion(e.to_string()));
        }
        Ok(())
    }
}
