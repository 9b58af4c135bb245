// SPDX-License-Identifier: MIT

//! Target platform and CPU architecture detection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating systems we publish installers for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    /// Platform of the running build, `None` on unsupported operating systems
    pub fn current() -> Option<Self> {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "windows" => Some(Self::Windows),
            "macos" => Some(Self::MacOs),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
        }
    }

    /// Architectures offered in the install chooser, most common first
    pub fn arch_choices(&self) -> &'static [Arch] {
        match self {
            Self::Windows => &[Arch::X64, Arch::Ia32, Arch::Arm64],
            Self::MacOs => &[Arch::Arm64, Arch::X64],
            Self::Linux => &[Arch::X64, Arch::Arm64],
        }
    }

    /// How a user finds out which architecture their machine has
    pub fn arch_help(&self) -> &'static str {
        match self {
            Self::Windows => {
                "Settings > System > About > System type shows x64, x86 or ARM."
            }
            Self::MacOs => {
                "Apple menu > About This Mac: Apple M-series chips are arm64, Intel chips are x64."
            }
            Self::Linux => "Run `uname -m`: x86_64 means x64, aarch64 means arm64.",
        }
    }

    /// Instructions shown when the installer could not be opened automatically
    pub fn manual_install_instructions(&self) -> &'static str {
        match self {
            Self::Windows => {
                "The installer could not be started. Open your Downloads or temp folder and run it manually."
            }
            Self::MacOs => {
                "Open the disk image or archive in Finder and drag the app into Applications."
            }
            Self::Linux => {
                "Double-click the downloaded package to open it with your software installer \
                 (for example, open a .deb with Software Install). Administrator rights may be required."
            }
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// CPU architectures an installer can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    Arm64,
    Ia32,
}

impl Arch {
    /// Architecture of the running build; unknown targets are treated as x64
    pub fn current() -> Self {
        Self::from_target(std::env::consts::ARCH)
    }

    pub fn from_target(arch: &str) -> Self {
        match arch {
            "aarch64" | "arm64" => Self::Arm64,
            "x86" | "ia32" | "i386" | "i686" => Self::Ia32,
            _ => Self::X64,
        }
    }

    /// Map a free-form chooser label ("arm64 (Apple Silicon)", "x86 (32-bit)") to an arch
    pub fn from_choice_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("arm") {
            Self::Arm64
        } else if label.contains("86") && !label.contains("64") {
            Self::Ia32
        } else {
            Self::X64
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
            Self::Ia32 => "ia32",
        }
    }

    /// Label used in the architecture chooser
    pub fn choice_label(&self, platform: Platform) -> &'static str {
        match (platform, self) {
            (Platform::MacOs, Self::Arm64) => "arm64 (Apple Silicon)",
            (Platform::MacOs, Self::X64) => "x64 (Intel)",
            (Platform::Linux, Self::X64) => "x64 (amd64)",
            (Platform::Linux, Self::Arm64) => "arm64 (aarch64)",
            (Platform::Windows, Self::X64) => "x64 (most common)",
            (_, Self::Ia32) => "x86 (32-bit)",
            (Platform::Windows, Self::Arm64) => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "x64" | "amd64" | "x86_64" => Ok(Self::X64),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "ia32" | "x86" | "i386" | "i686" => Ok(Self::Ia32),
            other => Err(format!(
                "Unknown architecture: '{other}'. Supported: x64, arm64, ia32"
            )),
        }
    }
}

/// Platform plus architecture used for one update session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchSelection {
    pub platform: Platform,
    pub detected: Arch,
    /// Chosen by the user in the install dialog; wins over `detected`
    pub user_override: Option<Arch>,
}

impl ArchSelection {
    pub fn new(platform: Platform, detected: Arch) -> Self {
        Self {
            platform,
            detected,
            user_override: None,
        }
    }

    pub fn with_override(mut self, arch: Option<Arch>) -> Self {
        self.user_override = arch;
        self
    }

    pub fn effective(&self) -> Arch {
        self.user_override.unwrap_or(self.detected)
    }
}
