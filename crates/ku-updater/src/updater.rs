// SPDX-License-Identifier: MIT

//! Orchestrates one update cycle: check, prompt, download, install

use crate::asset_resolver::resolve_asset;
use crate::config::{ConfigStore, UpdateConfig, UpdaterOptions};
use crate::downloader::{DownloadProgress, Downloader};
use crate::error::{Result, UpdateError};
use crate::host::{Notice, UpdateChoice, UpdateHost, UpdateOffer};
use crate::installer::{InstallLauncher, InstallOutcome, InstallerOpener, SystemOpener};
use crate::platform::{Arch, ArchSelection};
use crate::release_checker::{Asset, ReleaseFetcher, ReleaseInfo};
use crate::version::is_newer;
use chrono::Utc;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Name used when an asset name has no usable file component
const FALLBACK_INSTALLER_NAME: &str = "ku-launcher-update";

/// Where the update pipeline currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePhase {
    #[default]
    Idle,
    Checking,
    PromptUser,
    Downloading,
    Installing,
    /// Installer handed off, host is about to quit
    Terminating,
}

/// How a single update cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was still running
    Busy,
    /// Scheduled checks are turned off in the config
    ChecksDisabled,
    UpToDate,
    /// Fetching the release feed failed
    CheckFailed,
    /// The user postponed the update or cancelled the chooser
    Deferred,
    /// The user turned scheduled checks off from the prompt
    DisabledByUser,
    /// The installer URL was opened in the browser
    BrowserDownload,
    /// Automatic download was impossible, the release page was opened instead
    BrowserFallback,
    Installed(InstallOutcome),
}

#[derive(Debug, Default)]
struct Session {
    phase: UpdatePhase,
    arch_override: Option<Arch>,
}

pub struct Updater {
    host: Arc<dyn UpdateHost>,
    opener: Arc<dyn InstallerOpener>,
    fetcher: ReleaseFetcher,
    downloader: Downloader,
    config: ConfigStore,
    options: UpdaterOptions,
    session: Mutex<Session>,
    cycle: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("fetcher", &self.fetcher)
            .field("config", &self.config)
            .field("options", &self.options)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Updater {
    pub fn new(options: UpdaterOptions, config: ConfigStore, host: Arc<dyn UpdateHost>) -> Result<Self> {
        Self::with_opener(options, config, host, Arc::new(SystemOpener))
    }

    pub fn with_opener(
        options: UpdaterOptions,
        config: ConfigStore,
        host: Arc<dyn UpdateHost>,
        opener: Arc<dyn InstallerOpener>,
    ) -> Result<Self> {
        let mut fetcher = ReleaseFetcher::new(&options.repo_owner, &options.repo_name)?;
        if let Some(base) = &options.api_base_url {
            fetcher = fetcher.with_api_base(base);
        }
        let downloader = Downloader::with_idle_timeout(options.download_idle_timeout)?;

        Ok(Self {
            host,
            opener,
            fetcher,
            downloader,
            config,
            options,
            session: Mutex::new(Session::default()),
            cycle: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn options(&self) -> &UpdaterOptions {
        &self.options
    }

    pub fn phase(&self) -> UpdatePhase {
        self.session.lock().phase
    }

    /// Architecture picked in the install dialog of the running cycle
    pub fn arch_override(&self) -> Option<Arch> {
        self.session.lock().arch_override
    }

    fn set_phase(&self, phase: UpdatePhase) {
        let mut session = self.session.lock();
        if session.phase != phase {
            tracing::debug!(from = ?session.phase, to = ?phase, "Update phase changed");
            session.phase = phase;
        }
    }

    /// Fetch the latest release and return it when it is newer than the running version
    pub async fn check_for_updates(&self) -> Result<Option<ReleaseInfo>> {
        self.set_phase(UpdatePhase::Checking);
        tracing::info!(current = %self.options.current_version, "Checking for updates");

        let release = self.fetcher.fetch_latest().await?;

        if let Err(e) = self.config.update(|c| c.last_check_time = Some(Utc::now())) {
            tracing::warn!(error = %e, "Failed to record last check time");
        }

        if is_newer(&release.version, &self.options.current_version) {
            tracing::info!(
                latest = %release.version,
                current = %self.options.current_version,
                "New version available"
            );
            Ok(Some(release))
        } else {
            tracing::info!(latest = %release.version, "Already on the latest version");
            Ok(None)
        }
    }

    /// Timer-driven check. Failures are logged, never shown to the user.
    pub async fn run_scheduled_check(&self) -> CycleOutcome {
        let config = self.config.load();
        if config.disable_update_check {
            tracing::debug!("Update checks disabled, skipping scheduled check");
            return CycleOutcome::ChecksDisabled;
        }

        let Ok(_guard) = self.cycle.try_lock() else {
            tracing::debug!(phase = ?self.phase(), "Update cycle already running, skipping");
            return CycleOutcome::Busy;
        };

        let outcome = match self.check_for_updates().await {
            Ok(None) => CycleOutcome::UpToDate,
            Ok(Some(release)) => self.handle_update(&release, &config).await,
            Err(e) => {
                tracing::error!(error = %e, "Scheduled update check failed");
                CycleOutcome::CheckFailed
            }
        };
        self.finish_cycle();
        outcome
    }

    /// User-triggered check; ignores the disabled flag and reports every result
    pub async fn check_manually(&self) -> CycleOutcome {
        let Ok(_guard) = self.cycle.try_lock() else {
            tracing::info!(phase = ?self.phase(), "Update cycle already running");
            return CycleOutcome::Busy;
        };

        let outcome = match self.check_for_updates().await {
            Ok(None) => {
                self.host
                    .notify(Notice::UpToDate {
                        version: self.options.current_version.clone(),
                    })
                    .await;
                CycleOutcome::UpToDate
            }
            Ok(Some(release)) => self.offer_update(&release).await,
            Err(e) => {
                tracing::error!(error = %e, "Manual update check failed");
                self.host
                    .notify(Notice::CheckFailed {
                        reason: e.to_string(),
                    })
                    .await;
                CycleOutcome::CheckFailed
            }
        };
        self.finish_cycle();
        outcome
    }

    /// Back to idle; the architecture choice only applies to the cycle it was made in
    fn finish_cycle(&self) {
        let mut session = self.session.lock();
        session.arch_override = None;
        if session.phase != UpdatePhase::Terminating {
            session.phase = UpdatePhase::Idle;
        }
    }

    async fn handle_update(&self, release: &ReleaseInfo, config: &UpdateConfig) -> CycleOutcome {
        if config.auto_update {
            tracing::info!(version = %release.version, "Auto-update enabled, installing without prompt");
            self.download_and_install(release).await
        } else {
            self.offer_update(release).await
        }
    }

    async fn offer_update(&self, release: &ReleaseInfo) -> CycleOutcome {
        self.set_phase(UpdatePhase::PromptUser);
        let offer = UpdateOffer {
            current_version: self.options.current_version.clone(),
            latest_version: release.version.clone(),
            release_notes: release.release_notes.clone(),
        };

        let choice = self.host.prompt_update(&offer).await;
        tracing::info!(?choice, version = %release.version, "User answered update prompt");

        match choice {
            UpdateChoice::Install => self.choose_architecture_and_install(release).await,
            UpdateChoice::ManualDownload => self.manual_download(release).await,
            UpdateChoice::Later => CycleOutcome::Deferred,
            UpdateChoice::DisableChecks => {
                if let Err(e) = self.disable_update_check().await {
                    tracing::error!(error = %e, "Failed to disable update checks");
                }
                CycleOutcome::DisabledByUser
            }
        }
    }

    async fn choose_architecture_and_install(&self, release: &ReleaseInfo) -> CycleOutcome {
        if let Some(platform) = self.options.platform {
            let Some(arch) = self
                .host
                .choose_architecture(platform, platform.arch_choices())
                .await
            else {
                tracing::info!("Architecture selection cancelled");
                return CycleOutcome::Deferred;
            };
            tracing::info!(%arch, detected = %self.options.detected_arch, "Architecture selected");
            self.session.lock().arch_override = Some(arch);
        }

        self.download_and_install(release).await
    }

    fn select_asset<'a>(&self, release: &'a ReleaseInfo) -> Option<&'a Asset> {
        let platform = self.options.platform?;
        let selection = ArchSelection::new(platform, self.options.detected_arch)
            .with_override(self.arch_override());
        resolve_asset(&release.assets, &selection)
    }

    async fn download_and_install(&self, release: &ReleaseInfo) -> CycleOutcome {
        let (Some(platform), Some(asset)) = (self.options.platform, self.select_asset(release)) else {
            let err = UpdateError::NoMatchingAsset {
                platform: self
                    .options
                    .platform
                    .map_or_else(|| std::env::consts::OS.to_owned(), |p| p.to_string()),
                arch: self
                    .arch_override()
                    .unwrap_or(self.options.detected_arch)
                    .to_string(),
            };
            return self.browser_fallback(release, &err).await;
        };

        self.set_phase(UpdatePhase::Downloading);
        let destination = self.options.download_dir.join(installer_file_name(&asset.name));
        tracing::info!(asset = %asset.name, destination = %destination.display(), "Downloading update");

        let (progress_tx, progress_rx) = mpsc::channel(32);
        let progress_logger = tokio::spawn(log_progress(asset.name.clone(), progress_rx));

        let result = self
            .downloader
            .download(&asset.download_url, &destination, Some(progress_tx))
            .await;
        if let Err(e) = progress_logger.await {
            tracing::debug!(error = %e, "Progress logger ended abnormally");
        }

        match result {
            Ok(state) => {
                tracing::info!(
                    bytes = state.bytes_received,
                    redirects = state.redirect_count,
                    "Update downloaded"
                );
                self.set_phase(UpdatePhase::Installing);
                let launcher = InstallLauncher::with_opener(
                    Arc::clone(&self.opener),
                    platform,
                    self.options.quit_grace,
                );
                let outcome = launcher.launch(&destination, Arc::clone(&self.host)).await;
                if outcome == InstallOutcome::HandedOff {
                    self.set_phase(UpdatePhase::Terminating);
                }
                CycleOutcome::Installed(outcome)
            }
            Err(e) => self.browser_fallback(release, &e).await,
        }
    }

    async fn browser_fallback(&self, release: &ReleaseInfo, cause: &UpdateError) -> CycleOutcome {
        tracing::warn!(error = %cause, page = %release.download_page_url, "Automatic download unavailable, opening release page");
        if let Err(e) = self.host.open_external(&release.download_page_url).await {
            tracing::error!(error = %e, "Failed to open release page");
        }
        self.host.notify(Notice::AutoDownloadFailed).await;
        CycleOutcome::BrowserFallback
    }

    async fn manual_download(&self, release: &ReleaseInfo) -> CycleOutcome {
        let url = self
            .select_asset(release)
            .map_or(release.download_page_url.as_str(), |a| a.download_url.as_str());
        tracing::info!(%url, "Starting manual download in browser");

        if let Err(e) = self.host.open_external(url).await {
            tracing::error!(error = %e, "Failed to open download URL");
        }
        self.host.notify(Notice::BrowserDownloadStarted).await;
        CycleOutcome::BrowserDownload
    }

    pub async fn enable_auto_update(&self) -> Result<()> {
        self.config.update(|c| c.auto_update = true)?;
        tracing::info!("Auto-update enabled");
        self.host.notify(Notice::AutoUpdateEnabled).await;
        Ok(())
    }

    pub async fn disable_auto_update(&self) -> Result<()> {
        self.config.update(|c| c.auto_update = false)?;
        tracing::info!("Auto-update disabled");
        self.host.notify(Notice::AutoUpdateDisabled).await;
        Ok(())
    }

    /// Takes effect for the scheduler on next start
    pub async fn enable_update_check(&self) -> Result<()> {
        self.config.update(|c| c.disable_update_check = false)?;
        tracing::info!("Update checks enabled");
        self.host.notify(Notice::UpdateChecksEnabled).await;
        Ok(())
    }

    pub async fn disable_update_check(&self) -> Result<()> {
        self.config.update(|c| c.disable_update_check = true)?;
        tracing::info!("Update checks disabled");
        self.host.notify(Notice::UpdateChecksDisabled).await;
        Ok(())
    }
}

/// Last path component of an asset name, so a hostile name cannot escape the download dir
pub fn installer_file_name(asset_name: &str) -> String {
    Path::new(asset_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(FALLBACK_INSTALLER_NAME)
        .to_owned()
}

async fn log_progress(asset: String, mut rx: mpsc::Receiver<DownloadProgress>) {
    let mut last_logged = None;
    while let Some(progress) = rx.recv().await {
        let Some(percent) = progress.percent() else {
            continue;
        };
        let step = percent / 10;
        if last_logged != Some(step) {
            last_logged = Some(step);
            tracing::debug!(
                %asset,
                percent,
                downloaded = progress.downloaded_bytes,
                "Download progress"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;
    use crate::installer::testing::FakeOpener;
    use crate::platform::Platform;
    use mockito::{Server, ServerGuard};
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    const LATEST_PATH: &str = "/repos/BBIYAKYEE7/Korea-University-Launcher/releases/latest";
    const INSTALLER_BODY: &[u8] = b"MZ fake windows installer";

    struct Fixture {
        server: ServerGuard,
        dir: TempDir,
        host: Arc<RecordingHost>,
        opener: Arc<FakeOpener>,
        updater: Updater,
    }

    async fn fixture(platform: Platform, host: RecordingHost) -> Fixture {
        let server = Server::new_async().await;
        let dir = TempDir::new().unwrap();
        let host = Arc::new(host);
        let opener = Arc::new(FakeOpener::new(true, true));

        let options = UpdaterOptions {
            api_base_url: Some(server.url()),
            current_version: "2.2.9".to_owned(),
            startup_delay: Duration::ZERO,
            quit_grace: Duration::ZERO,
            download_dir: dir.path().join("downloads"),
            download_idle_timeout: Some(Duration::from_secs(10)),
            platform: Some(platform),
            detected_arch: Arch::X64,
            ..Default::default()
        };
        std::fs::create_dir_all(&options.download_dir).unwrap();
        let config = ConfigStore::new(dir.path().join("config.json"));

        let updater = Updater::with_opener(options, config, host.clone(), opener.clone()).unwrap();
        Fixture {
            server,
            dir,
            host,
            opener,
            updater,
        }
    }

    fn release_json(server: &ServerGuard, tag: &str) -> String {
        json!({
            "tag_name": tag,
            "body": "Bug fixes",
            "html_url": "https://github.com/BBIYAKYEE7/Korea-University-Launcher/releases/tag/v2.3.0",
            "assets": [
                {
                    "name": "KU-Launcher-Setup-2.3.0-x64.exe",
                    "browser_download_url": format!("{}/download/KU-Launcher-Setup-2.3.0-x64.exe", server.url())
                },
                {
                    "name": "KU-Launcher-2.3.0-mac-arm64.dmg",
                    "browser_download_url": format!("{}/download/KU-Launcher-2.3.0-mac-arm64.dmg", server.url())
                }
            ]
        })
        .to_string()
    }

    async fn mock_release(fx: &mut Fixture, tag: &str) -> mockito::Mock {
        let body = release_json(&fx.server, tag);
        fx.server
            .mock("GET", LATEST_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    async fn mock_installer(fx: &mut Fixture, status: usize, expected: usize) -> mockito::Mock {
        fx.server
            .mock("GET", "/download/KU-Launcher-Setup-2.3.0-x64.exe")
            .with_status(status)
            .with_body(INSTALLER_BODY)
            .expect(expected)
            .create_async()
            .await
    }

    async fn wait_for_quit(host: &RecordingHost) -> bool {
        for _ in 0..100 {
            if host.quit_called() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_windows_install_flow() {
        let host = RecordingHost::new(UpdateChoice::Install, Some(Arch::X64), true);
        let mut fx = fixture(Platform::Windows, host).await;
        let release = mock_release(&mut fx, "v2.3.0").await;
        let installer = mock_installer(&mut fx, 200, 1).await;

        let outcome = fx.updater.check_manually().await;

        assert_eq!(outcome, CycleOutcome::Installed(InstallOutcome::HandedOff));
        release.assert_async().await;
        installer.assert_async().await;

        let prompts = fx.host.prompts.lock().clone();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].latest_version, "2.3.0");
        assert_eq!(prompts[0].current_version, "2.2.9");

        let downloaded = fx
            .dir
            .path()
            .join("downloads")
            .join("KU-Launcher-Setup-2.3.0-x64.exe");
        assert_eq!(std::fs::read(&downloaded).unwrap(), INSTALLER_BODY);
        assert_eq!(fx.opener.calls().len(), 1);
        assert_eq!(fx.updater.phase(), UpdatePhase::Terminating);
        assert!(fx.updater.arch_override().is_none());
        assert!(wait_for_quit(&fx.host).await);
        assert!(fx.updater.config().load().last_check_time.is_some());
    }

    #[tokio::test]
    async fn test_scheduled_check_prompts_by_default() {
        let host = RecordingHost::new(UpdateChoice::Later, None, true);
        let mut fx = fixture(Platform::Windows, host).await;
        let _release = mock_release(&mut fx, "v2.3.0").await;
        let installer = mock_installer(&mut fx, 200, 0).await;

        let outcome = fx.updater.run_scheduled_check().await;

        assert_eq!(outcome, CycleOutcome::Deferred);
        assert_eq!(fx.host.prompts.lock().len(), 1);
        assert!(fx.host.notices().is_empty());
        assert_eq!(fx.updater.phase(), UpdatePhase::Idle);
        installer.assert_async().await;
    }

    #[tokio::test]
    async fn test_auto_update_skips_prompt() {
        let host = RecordingHost::new(UpdateChoice::Later, None, true);
        let mut fx = fixture(Platform::Windows, host).await;
        fx.updater
            .config()
            .update(|c| c.auto_update = true)
            .unwrap();
        let _release = mock_release(&mut fx, "v2.3.0").await;
        let installer = mock_installer(&mut fx, 200, 1).await;

        let outcome = fx.updater.run_scheduled_check().await;

        assert_eq!(outcome, CycleOutcome::Installed(InstallOutcome::HandedOff));
        assert!(fx.host.prompts.lock().is_empty());
        installer.assert_async().await;
    }

    #[tokio::test]
    async fn test_scheduled_check_respects_disabled_flag() {
        let host = RecordingHost::new(UpdateChoice::Install, None, true);
        let mut fx = fixture(Platform::Windows, host).await;
        fx.updater
            .config()
            .update(|c| c.disable_update_check = true)
            .unwrap();
        let release = fx
            .server
            .mock("GET", LATEST_PATH)
            .expect(0)
            .create_async()
            .await;

        assert_eq!(fx.updater.run_scheduled_check().await, CycleOutcome::ChecksDisabled);
        release.assert_async().await;
    }

    #[tokio::test]
    async fn test_manual_check_ignores_disabled_flag() {
        let host = RecordingHost::new(UpdateChoice::Later, None, true);
        let mut fx = fixture(Platform::Windows, host).await;
        fx.updater
            .config()
            .update(|c| c.disable_update_check = true)
            .unwrap();
        let release = mock_release(&mut fx, "v2.2.9").await;

        assert_eq!(fx.updater.check_manually().await, CycleOutcome::UpToDate);
        release.assert_async().await;
        assert_eq!(
            fx.host.notices(),
            vec![Notice::UpToDate {
                version: "2.2.9".to_owned()
            }]
        );
    }

    #[tokio::test]
    async fn test_scheduled_failure_is_silent() {
        let host = RecordingHost::new(UpdateChoice::Install, None, true);
        let mut fx = fixture(Platform::Windows, host).await;
        let _release = fx
            .server
            .mock("GET", LATEST_PATH)
            .with_status(500)
            .create_async()
            .await;

        assert_eq!(fx.updater.run_scheduled_check().await, CycleOutcome::CheckFailed);
        assert!(fx.host.notices().is_empty());
        assert!(fx.host.prompts.lock().is_empty());
        assert_eq!(fx.updater.phase(), UpdatePhase::Idle);
        assert!(fx.updater.config().load().last_check_time.is_none());
    }

    #[tokio::test]
    async fn test_manual_failure_is_reported() {
        let host = RecordingHost::new(UpdateChoice::Install, None, true);
        let mut fx = fixture(Platform::Windows, host).await;
        let _release = fx
            .server
            .mock("GET", LATEST_PATH)
            .with_status(503)
            .create_async()
            .await;

        assert_eq!(fx.updater.check_manually().await, CycleOutcome::CheckFailed);
        let notices = fx.host.notices();
        assert_eq!(notices.len(), 1);
        assert!(matches!(&notices[0], Notice::CheckFailed { reason } if reason.contains("503")));
    }

    #[tokio::test]
    async fn test_disable_checks_from_prompt_persists() {
        let host = RecordingHost::new(UpdateChoice::DisableChecks, None, true);
        let mut fx = fixture(Platform::Windows, host).await;
        let _release = mock_release(&mut fx, "v2.3.0").await;

        assert_eq!(fx.updater.run_scheduled_check().await, CycleOutcome::DisabledByUser);
        assert!(fx.updater.config().load().disable_update_check);
        assert_eq!(fx.host.notices(), vec![Notice::UpdateChecksDisabled]);
        assert_eq!(fx.updater.run_scheduled_check().await, CycleOutcome::ChecksDisabled);
    }

    #[tokio::test]
    async fn test_manual_download_opens_asset_url() {
        let host = RecordingHost::new(UpdateChoice::ManualDownload, None, true);
        let mut fx = fixture(Platform::Windows, host).await;
        let _release = mock_release(&mut fx, "v2.3.0").await;
        let installer = mock_installer(&mut fx, 200, 0).await;

        assert_eq!(fx.updater.check_manually().await, CycleOutcome::BrowserDownload);
        let opened = fx.host.opened();
        assert_eq!(opened.len(), 1);
        assert!(opened[0].ends_with("/download/KU-Launcher-Setup-2.3.0-x64.exe"));
        assert_eq!(fx.host.notices(), vec![Notice::BrowserDownloadStarted]);
        installer.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_matching_asset_opens_release_page() {
        let host = RecordingHost::new(UpdateChoice::Install, Some(Arch::X64), true);
        let mut fx = fixture(Platform::Linux, host).await;
        let _release = mock_release(&mut fx, "v2.3.0").await;

        assert_eq!(fx.updater.check_manually().await, CycleOutcome::BrowserFallback);
        assert_eq!(
            fx.host.opened(),
            vec!["https://github.com/BBIYAKYEE7/Korea-University-Launcher/releases/tag/v2.3.0".to_owned()]
        );
        assert_eq!(fx.host.notices(), vec![Notice::AutoDownloadFailed]);
        assert!(fx.opener.calls().is_empty());
    }

    #[tokio::test]
    async fn test_download_failure_opens_release_page() {
        let host = RecordingHost::new(UpdateChoice::Install, Some(Arch::X64), true);
        let mut fx = fixture(Platform::Windows, host).await;
        let _release = mock_release(&mut fx, "v2.3.0").await;
        let installer = mock_installer(&mut fx, 404, 1).await;

        assert_eq!(fx.updater.check_manually().await, CycleOutcome::BrowserFallback);
        installer.assert_async().await;
        assert_eq!(fx.host.opened().len(), 1);
        assert_eq!(fx.host.notices(), vec![Notice::AutoDownloadFailed]);
        assert!(fx.opener.calls().is_empty());
        assert!(
            !fx.dir
                .path()
                .join("downloads")
                .join("KU-Launcher-Setup-2.3.0-x64.exe")
                .exists()
        );
    }

    #[tokio::test]
    async fn test_cancelled_arch_chooser_defers() {
        let host = RecordingHost::new(UpdateChoice::Install, None, true);
        let mut fx = fixture(Platform::Windows, host).await;
        let _release = mock_release(&mut fx, "v2.3.0").await;
        let installer = mock_installer(&mut fx, 200, 0).await;

        assert_eq!(fx.updater.check_manually().await, CycleOutcome::Deferred);
        assert!(fx.updater.arch_override().is_none());
        installer.assert_async().await;
    }

    #[tokio::test]
    async fn test_arch_override_drives_asset_choice() {
        let host = RecordingHost::new(UpdateChoice::Install, Some(Arch::Arm64), true);
        let mut fx = fixture(Platform::MacOs, host).await;
        let _release = mock_release(&mut fx, "v2.3.0").await;
        let dmg = fx
            .server
            .mock("GET", "/download/KU-Launcher-2.3.0-mac-arm64.dmg")
            .with_status(200)
            .with_body("dmg")
            .expect(1)
            .create_async()
            .await;

        let outcome = fx.updater.check_manually().await;

        assert_eq!(outcome, CycleOutcome::Installed(InstallOutcome::HandedOff));
        dmg.assert_async().await;
        assert!(fx.updater.arch_override().is_none());
    }

    #[tokio::test]
    async fn test_arch_choice_does_not_leak_into_next_cycle() {
        let host = RecordingHost::new(UpdateChoice::Install, Some(Arch::Arm64), false);
        let mut fx = fixture(Platform::MacOs, host).await;
        let _release = mock_release(&mut fx, "v2.3.0").await;
        let dmg = fx
            .server
            .mock("GET", "/download/KU-Launcher-2.3.0-mac-arm64.dmg")
            .with_status(200)
            .with_body("dmg")
            .expect(1)
            .create_async()
            .await;

        let first = fx.updater.check_manually().await;
        assert_eq!(first, CycleOutcome::Installed(InstallOutcome::Declined));
        assert!(fx.updater.arch_override().is_none());

        // Detected arch is x64 and only an arm64 dmg is published
        fx.updater
            .config()
            .update(|c| c.auto_update = true)
            .unwrap();
        let second = fx.updater.run_scheduled_check().await;

        assert_eq!(second, CycleOutcome::BrowserFallback);
        dmg.assert_async().await;
    }

    #[tokio::test]
    async fn test_overlapping_cycle_is_skipped() {
        let host = RecordingHost::new(UpdateChoice::Install, None, true);
        let fx = fixture(Platform::Windows, host).await;

        let _held = fx.updater.cycle.lock().await;
        assert_eq!(fx.updater.run_scheduled_check().await, CycleOutcome::Busy);
        assert_eq!(fx.updater.check_manually().await, CycleOutcome::Busy);
    }

    #[tokio::test]
    async fn test_settings_toggles_persist_and_notify() {
        let host = RecordingHost::new(UpdateChoice::Later, None, true);
        let fx = fixture(Platform::Windows, host).await;

        fx.updater.enable_auto_update().await.unwrap();
        assert!(fx.updater.config().load().auto_update);
        fx.updater.disable_auto_update().await.unwrap();
        assert!(!fx.updater.config().load().auto_update);
        fx.updater.disable_update_check().await.unwrap();
        fx.updater.enable_update_check().await.unwrap();
        assert!(!fx.updater.config().load().disable_update_check);

        assert_eq!(
            fx.host.notices(),
            vec![
                Notice::AutoUpdateEnabled,
                Notice::AutoUpdateDisabled,
                Notice::UpdateChecksDisabled,
                Notice::UpdateChecksEnabled,
            ]
        );
    }

    #[test]
    fn test_installer_file_name_strips_directories() {
        assert_eq!(installer_file_name("App-x64.exe"), "App-x64.exe");
        assert_eq!(installer_file_name("../../etc/App.exe"), "App.exe");
        assert_eq!(installer_file_name(".."), FALLBACK_INSTALLER_NAME);
        assert_eq!(installer_file_name(""), FALLBACK_INSTALLER_NAME);
    }
}
