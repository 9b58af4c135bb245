// SPDX-License-Identifier: MIT

//! The window host the updater talks to
//!
//! Dialogs, notices, the external browser and application shutdown all
//! belong to the desktop shell. The updater only calls these primitives.

use crate::error::Result;
use crate::platform::{Arch, Platform};
use async_trait::async_trait;
use std::path::Path;

/// What the user sees when a newer release is found
#[derive(Debug, Clone)]
pub struct UpdateOffer {
    pub current_version: String,
    pub latest_version: String,
    pub release_notes: String,
}

/// Buttons of the update-available dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateChoice {
    /// Download and install now (architecture chooser follows)
    Install,
    /// Open the installer in the browser
    ManualDownload,
    /// Ask again next cycle
    Later,
    /// Stop scheduled checks until re-enabled
    DisableChecks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-facing messages emitted by the updater
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    UpToDate { version: String },
    CheckFailed { reason: String },
    BrowserDownloadStarted,
    AutoDownloadFailed,
    InstallDeferred,
    ManualInstallRequired { platform: Platform },
    UpdateChecksDisabled,
    UpdateChecksEnabled,
    AutoUpdateEnabled,
    AutoUpdateDisabled,
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Self::CheckFailed { .. } | Self::ManualInstallRequired { .. } => NoticeLevel::Error,
            Self::AutoDownloadFailed => NoticeLevel::Warning,
            Self::UpToDate { .. }
            | Self::BrowserDownloadStarted
            | Self::InstallDeferred
            | Self::UpdateChecksDisabled
            | Self::UpdateChecksEnabled
            | Self::AutoUpdateEnabled
            | Self::AutoUpdateDisabled => NoticeLevel::Info,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::UpToDate { .. } => "Update check",
            Self::CheckFailed { .. } => "Update check failed",
            Self::BrowserDownloadStarted => "Download started",
            Self::AutoDownloadFailed => "Automatic download failed",
            Self::InstallDeferred => "Installation postponed",
            Self::ManualInstallRequired { .. } => "Install manually",
            Self::UpdateChecksDisabled => "Update checks disabled",
            Self::UpdateChecksEnabled => "Update checks enabled",
            Self::AutoUpdateEnabled => "Automatic updates enabled",
            Self::AutoUpdateDisabled => "Automatic updates disabled",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::UpToDate { version } => format!("You are running the latest version (v{version})."),
            Self::CheckFailed { reason } => format!("Could not check for updates: {reason}"),
            Self::BrowserDownloadStarted => {
                "The download continues in your browser. Run the installer when it finishes.".to_owned()
            }
            Self::AutoDownloadFailed => {
                "The release page was opened in your browser. Download and install the update manually."
                    .to_owned()
            }
            Self::InstallDeferred => {
                "The downloaded installer was removed. You can update again at any time.".to_owned()
            }
            Self::ManualInstallRequired { platform } => {
                platform.manual_install_instructions().to_owned()
            }
            Self::UpdateChecksDisabled => {
                "Automatic update checks are off. You can turn them back on in settings.".to_owned()
            }
            Self::UpdateChecksEnabled => {
                "Update checks resume the next time the launcher starts.".to_owned()
            }
            Self::AutoUpdateEnabled => {
                "New versions will be downloaded and installed automatically.".to_owned()
            }
            Self::AutoUpdateDisabled => "You will be notified when a new version is available.".to_owned(),
        }
    }
}

/// Primitives provided by the desktop shell.
///
/// Dialog methods resolve when the user answers; implementations must not
/// block other application work while a dialog is open.
#[async_trait]
pub trait UpdateHost: Send + Sync {
    async fn prompt_update(&self, offer: &UpdateOffer) -> UpdateChoice;

    /// `None` when the user cancels the chooser
    async fn choose_architecture(&self, platform: Platform, choices: &[Arch]) -> Option<Arch>;

    /// Ask whether to run the downloaded installer now (the app will exit)
    async fn confirm_install(&self, installer: &Path) -> bool;

    async fn notify(&self, notice: Notice);

    /// Open a URL in the default external browser
    async fn open_external(&self, url: &str) -> Result<()>;

    /// Terminate the host application
    fn quit(&self);
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted host used across the crate's tests

    use super::*;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug)]
    pub struct RecordingHost {
        pub choice: UpdateChoice,
        pub arch: Option<Arch>,
        pub confirm: bool,
        pub prompts: Mutex<Vec<UpdateOffer>>,
        pub notices: Mutex<Vec<Notice>>,
        pub opened: Mutex<Vec<String>>,
        pub confirmed_paths: Mutex<Vec<PathBuf>>,
        pub quit_called: AtomicBool,
    }

    impl RecordingHost {
        pub fn new(choice: UpdateChoice, arch: Option<Arch>, confirm: bool) -> Self {
            Self {
                choice,
                arch,
                confirm,
                prompts: Mutex::new(Vec::new()),
                notices: Mutex::new(Vec::new()),
                opened: Mutex::new(Vec::new()),
                confirmed_paths: Mutex::new(Vec::new()),
                quit_called: AtomicBool::new(false),
            }
        }

        pub fn notices(&self) -> Vec<Notice> {
            self.notices.lock().clone()
        }

        pub fn opened(&self) -> Vec<String> {
            self.opened.lock().clone()
        }

        pub fn quit_called(&self) -> bool {
            self.quit_called.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UpdateHost for RecordingHost {
        async fn prompt_update(&self, offer: &UpdateOffer) -> UpdateChoice {
            self.prompts.lock().push(offer.clone());
            self.choice
        }

        async fn choose_architecture(&self, _platform: Platform, _choices: &[Arch]) -> Option<Arch> {
            self.arch
        }

        async fn confirm_install(&self, installer: &Path) -> bool {
            self.confirmed_paths.lock().push(installer.to_path_buf());
            self.confirm
        }

        async fn notify(&self, notice: Notice) {
            self.notices.lock().push(notice);
        }

        async fn open_external(&self, url: &str) -> Result<()> {
            self.opened.lock().push(url.to_owned());
            Ok(())
        }

        fn quit(&self) {
            self.quit_called.store(true, Ordering::SeqCst);
        }
    }
}
