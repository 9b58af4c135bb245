// SPDX-License-Identifier: MIT

//! KU Launcher updater - release checks and self-update for the desktop launcher
//!
//! Reads the latest GitHub release, decides whether it is newer than the
//! running build, picks the installer matching the platform and CPU
//! architecture, downloads it and hands it to the operating system.

pub mod asset_resolver;
pub mod config;
pub mod downloader;
pub mod error;
pub mod host;
pub mod installer;
pub mod platform;
pub mod release_checker;
pub mod scheduler;
pub mod updater;
pub mod version;

pub use asset_resolver::resolve_asset;
pub use config::{ConfigStore, UpdateConfig, UpdaterOptions};
pub use error::{Result, UpdateError};
pub use host::{Notice, UpdateChoice, UpdateHost, UpdateOffer};
pub use platform::{Arch, ArchSelection, Platform};
pub use release_checker::{Asset, ReleaseInfo};
pub use scheduler::UpdateScheduler;
pub use updater::{CycleOutcome, UpdatePhase, Updater};
pub use version::{compare_versions, is_newer, version_from_tag};
