// SPDX-License-Identifier: MIT

//! Installer handoff to the operating system

use crate::error::{Result, UpdateError};
use crate::host::{Notice, UpdateHost};
use crate::platform::Platform;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Ways of asking the OS to open a file
#[async_trait]
pub trait InstallerOpener: Send + Sync {
    /// Open with the default handler for the file type
    async fn open_native(&self, path: &Path) -> Result<()>;

    /// Platform shell fallback (`start`, `open`, `xdg-open`)
    async fn open_with_shell(&self, platform: Platform, path: &Path) -> Result<()>;
}

/// Opens files through the real operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

#[async_trait]
impl InstallerOpener for SystemOpener {
    async fn open_native(&self, path: &Path) -> Result<()> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || open::that_detached(&path))
            .await
            .map_err(|e| UpdateError::InstallLaunch(format!("Open task failed: {e}")))?
            .map_err(|e| UpdateError::InstallLaunch(format!("Default handler failed: {e}")))
    }

    async fn open_with_shell(&self, platform: Platform, path: &Path) -> Result<()> {
        let (program, args) = shell_command(platform, path);
        run_command(program, &args).await
    }
}

/// Command used when the default handler could not open the installer
pub fn shell_command(platform: Platform, path: &Path) -> (&'static str, Vec<String>) {
    let path = path.display().to_string();
    match platform {
        Platform::Windows => (
            "cmd",
            vec!["/C".to_owned(), "start".to_owned(), String::new(), path],
        ),
        Platform::MacOs => ("open", vec![path]),
        Platform::Linux => ("xdg-open", vec![path]),
    }
}

async fn run_command(command: &str, args: &[String]) -> Result<()> {
    let output = Command::new(command)
        .args(args)
        .output()
        .await
        .map_err(|e| UpdateError::InstallLaunch(format!("Failed to run `{command}`: {e}")))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    Err(UpdateError::InstallLaunch(if stderr.is_empty() {
        format!(
            "Command `{}` with args {:?} failed with status {}",
            command, args, output.status
        )
    } else {
        format!("Command `{command}` with args {args:?} failed: {stderr}")
    }))
}

/// How an install attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The OS took over; the app quits after the grace delay
    HandedOff,
    /// The user said no; the installer file was removed
    Declined,
    /// Nothing could open the installer; instructions were shown
    ManualInstructions,
}

pub struct InstallLauncher {
    opener: Arc<dyn InstallerOpener>,
    platform: Platform,
    quit_grace: Duration,
}

impl std::fmt::Debug for InstallLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallLauncher")
            .field("platform", &self.platform)
            .field("quit_grace", &self.quit_grace)
            .finish_non_exhaustive()
    }
}

impl InstallLauncher {
    pub fn with_opener(
        opener: Arc<dyn InstallerOpener>,
        platform: Platform,
        quit_grace: Duration,
    ) -> Self {
        Self {
            opener,
            platform,
            quit_grace,
        }
    }

    /// Confirm with the user, then hand `installer` to the OS
    pub async fn launch(&self, installer: &Path, host: Arc<dyn UpdateHost>) -> InstallOutcome {
        if !host.confirm_install(installer).await {
            tracing::info!(path = %installer.display(), "Installation declined, removing installer");
            if let Err(e) = tokio::fs::remove_file(installer).await {
                tracing::error!(error = %e, "Failed to remove downloaded installer");
            }
            host.notify(Notice::InstallDeferred).await;
            return InstallOutcome::Declined;
        }

        match self.opener.open_native(installer).await {
            Ok(()) => {
                tracing::info!(path = %installer.display(), "Installer opened with the default handler");
                self.schedule_quit(host);
                return InstallOutcome::HandedOff;
            }
            Err(e) => tracing::warn!(error = %e, "Default handler failed, trying shell fallback"),
        }

        match self.opener.open_with_shell(self.platform, installer).await {
            Ok(()) => {
                tracing::info!(platform = %self.platform, "Installer opened via shell fallback");
                self.schedule_quit(host);
                InstallOutcome::HandedOff
            }
            Err(e) => {
                tracing::error!(error = %e, platform = %self.platform, "Could not launch installer");
                host.notify(Notice::ManualInstallRequired {
                    platform: self.platform,
                })
                .await;
                InstallOutcome::ManualInstructions
            }
        }
    }

    fn schedule_quit(&self, host: Arc<dyn UpdateHost>) {
        let grace = self.quit_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            tracing::info!("Quitting so the installer can replace the application");
            host.quit();
        });
    }
}
