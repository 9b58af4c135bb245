// SPDX-License-Identifier: MIT

//! KU Launcher updater - standalone entry point
//!
//! Runs the update scheduler against a console host until Ctrl-C, or performs
//! a single manual check with `--check-now`.

use anyhow::{Context, bail};
use async_trait::async_trait;
use clap::Parser;
use ku_updater::host::NoticeLevel;
use ku_updater::{
    Arch, ConfigStore, Notice, Platform, UpdateChoice, UpdateError, UpdateHost, UpdateOffer,
    UpdateScheduler, Updater, UpdaterOptions,
};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "ku-updater", version, about = "KU Launcher self-updater")]
struct Args {
    /// Run one manual update check and exit
    #[arg(long)]
    check_now: bool,

    /// Path to config.json (defaults to the OS config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Version to compare releases against
    #[arg(long, value_name = "VERSION")]
    current_version: Option<String>,

    /// Release repository as owner/name
    #[arg(long, value_name = "OWNER/NAME")]
    repo: Option<String>,
}

fn parse_repo(repo: &str) -> anyhow::Result<(String, String)> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner.to_owned(), name.to_owned()))
        }
        _ => bail!("--repo must look like owner/name, got '{repo}'"),
    }
}

/// Answers updater dialogs on the terminal
#[derive(Debug, Default)]
struct ConsoleHost;

impl ConsoleHost {
    /// Print `question` and read one line from stdin without blocking the runtime
    async fn ask(question: String) -> Option<String> {
        tokio::task::spawn_blocking(move || {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{question}").ok()?;
            write!(stdout, "> ").ok()?;
            stdout.flush().ok()?;

            let mut line = String::new();
            let read = std::io::stdin().lock().read_line(&mut line).ok()?;
            (read > 0).then(|| line.trim().to_owned())
        })
        .await
        .ok()
        .flatten()
    }
}

#[async_trait]
impl UpdateHost for ConsoleHost {
    async fn prompt_update(&self, offer: &UpdateOffer) -> UpdateChoice {
        let notes = if offer.release_notes.trim().is_empty() {
            "New features and improvements."
        } else {
            offer.release_notes.trim()
        };
        let question = format!(
            "KU Launcher v{latest} is available (current: v{current}).\n\n{notes}\n\n\
             [1] Update (choose architecture)  [2] Manual download  [3] Later  [4] Stop checking",
            latest = offer.latest_version,
            current = offer.current_version,
        );

        match Self::ask(question).await.as_deref() {
            Some("1") => UpdateChoice::Install,
            Some("2") => UpdateChoice::ManualDownload,
            Some("4") => UpdateChoice::DisableChecks,
            _ => UpdateChoice::Later,
        }
    }

    async fn choose_architecture(&self, platform: Platform, choices: &[Arch]) -> Option<Arch> {
        let mut question = format!("Select the architecture to install.\n{}\n", platform.arch_help());
        for (i, arch) in choices.iter().enumerate() {
            question.push_str(&format!("  [{}] {}\n", i + 1, arch.choice_label(platform)));
        }
        question.push_str("  [0] Cancel");

        let answer = Self::ask(question).await?;
        match answer.parse::<usize>() {
            Ok(0) => None,
            Ok(n) => choices.get(n - 1).copied(),
            Err(_) if answer.is_empty() => None,
            Err(_) => Some(Arch::from_choice_label(&answer)),
        }
    }

    async fn confirm_install(&self, installer: &Path) -> bool {
        let question = format!(
            "Downloaded {}.\nThe launcher will close to run the installer. Install now? [y/N]",
            installer.display()
        );
        Self::ask(question)
            .await
            .is_some_and(|a| a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes"))
    }

    async fn notify(&self, notice: Notice) {
        let prefix = match notice.level() {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        println!("[{prefix}] {}: {}", notice.title(), notice.message());
    }

    async fn open_external(&self, url: &str) -> ku_updater::Result<()> {
        info!(%url, "Opening in browser");
        open::that_detached(url)
            .map_err(|e| UpdateError::InstallLaunch(format!("Failed to open {url}: {e}")))
    }

    fn quit(&self) {
        info!("Exiting for installer handoff");
        std::process::exit(0);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ku_updater=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    info!("Starting KU Launcher updater");

    let config = match &args.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::default_location()?,
    };
    let loaded = config.load();
    info!(
        path = %config.path().display(),
        auto_update = loaded.auto_update,
        disable_update_check = loaded.disable_update_check,
        check_interval_ms = loaded.check_interval,
        "Loaded config"
    );

    let mut options = UpdaterOptions::default();
    if let Some(version) = args.current_version {
        options.current_version = version;
    }
    if let Some(repo) = &args.repo {
        (options.repo_owner, options.repo_name) = parse_repo(repo)?;
    }
    if options.platform.is_none() {
        info!(os = std::env::consts::OS, "No installers are published for this OS, updates fall back to the browser");
    }

    let updater = Arc::new(
        Updater::new(options, config, Arc::new(ConsoleHost)).context("Failed to create updater")?,
    );

    if args.check_now {
        let outcome = updater.check_manually().await;
        info!(?outcome, "Manual update check finished");
        return Ok(());
    }

    let mut scheduler = UpdateScheduler::new();
    if !scheduler.start(updater) {
        info!("Nothing scheduled, exiting");
        return Ok(());
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {e}");
    }
    info!("Shutdown signal received");
    scheduler.stop();

    Ok(())
}
