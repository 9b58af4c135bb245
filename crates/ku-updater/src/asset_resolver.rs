// SPDX-License-Identifier: MIT

//! Installer selection from release asset names
//!
//! Release filenames do not follow a fixed grammar, so selection is driven by
//! architecture hints found anywhere in the name. Extension tiers are tried in
//! order; inside a tier an asset naming the wanted architecture beats a
//! generic (hint-free) build, even for x64 where hint-free builds also count
//! as matches. An asset hinting at another architecture is never picked.

use crate::platform::{Arch, ArchSelection, Platform};
use crate::release_checker::Asset;
use regex::Regex;
use std::sync::LazyLock;

fn ci(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).unwrap_or_else(|e| panic!("invalid pattern {pattern}: {e}"))
}

static ARM64: LazyLock<Regex> = LazyLock::new(|| ci("arm64|aarch64"));
static ARM_ANY: LazyLock<Regex> = LazyLock::new(|| ci("arm|aarch"));
static IA32: LazyLock<Regex> = LazyLock::new(|| ci("ia32|x86|i386|32"));
static X64: LazyLock<Regex> = LazyLock::new(|| ci("x64|amd64"));
static SIXTY_FOUR: LazyLock<Regex> = LazyLock::new(|| ci("64"));
static ANY_HINT: LazyLock<Regex> =
    LazyLock::new(|| ci("arm|aarch|ia32|x86|i386|x64|amd64|32|64"));

static EXE: LazyLock<Regex> = LazyLock::new(|| ci(r"\.exe$"));
static MSI: LazyLock<Regex> = LazyLock::new(|| ci(r"\.msi$"));
static DMG: LazyLock<Regex> = LazyLock::new(|| ci(r"\.dmg$"));
static ZIP: LazyLock<Regex> = LazyLock::new(|| ci(r"\.zip$"));
static MAC_KEYWORD: LazyLock<Regex> = LazyLock::new(|| ci("mac|darwin|osx|macos"));
static DEB: LazyLock<Regex> = LazyLock::new(|| ci(r"\.deb$"));
static APPIMAGE: LazyLock<Regex> = LazyLock::new(|| ci("appimage$"));
static RPM: LazyLock<Regex> = LazyLock::new(|| ci(r"\.rpm$"));

fn is_ia32_class(name: &str) -> bool {
    IA32.is_match(name) && !SIXTY_FOUR.is_match(name)
}

/// True when the name carries no architecture hint at all
pub fn has_no_arch_hint(name: &str) -> bool {
    !ANY_HINT.is_match(name)
}

/// True when the name targets `arch`. For x64 this includes hint-free builds.
pub fn matches_arch(name: &str, arch: Arch) -> bool {
    match arch {
        Arch::Arm64 => ARM64.is_match(name),
        Arch::Ia32 => is_ia32_class(name),
        Arch::X64 => {
            X64.is_match(name)
                || (SIXTY_FOUR.is_match(name) && !ARM_ANY.is_match(name))
                || has_no_arch_hint(name)
        }
    }
}

/// True when the name carries a hint for `arch` itself
pub fn names_arch(name: &str, arch: Arch) -> bool {
    !has_no_arch_hint(name) && matches_arch(name, arch)
}

/// True when the name hints at an architecture other than `arch`
pub fn conflicts_with(name: &str, arch: Arch) -> bool {
    match arch {
        Arch::Arm64 => X64.is_match(name) || IA32.is_match(name),
        Arch::Ia32 => X64.is_match(name) || ARM_ANY.is_match(name),
        Arch::X64 => ARM_ANY.is_match(name) || is_ia32_class(name),
    }
}

/// One installer format, e.g. `.dmg` on macOS
struct Tier {
    extension: &'static LazyLock<Regex>,
    keyword: Option<&'static LazyLock<Regex>>,
}

impl Tier {
    const fn ext(extension: &'static LazyLock<Regex>) -> Self {
        Self {
            extension,
            keyword: None,
        }
    }

    fn accepts(&self, name: &str) -> bool {
        self.extension.is_match(name) && self.keyword.is_none_or(|k| k.is_match(name))
    }
}

fn tiers(platform: Platform) -> Vec<Tier> {
    match platform {
        Platform::Windows => vec![Tier::ext(&EXE), Tier::ext(&MSI)],
        Platform::MacOs => vec![
            Tier::ext(&DMG),
            Tier {
                extension: &ZIP,
                keyword: Some(&MAC_KEYWORD),
            },
        ],
        Platform::Linux => vec![Tier::ext(&DEB), Tier::ext(&APPIMAGE), Tier::ext(&RPM)],
    }
}

/// Pick the installer for `selection` out of `assets`, or `None` if nothing fits
pub fn resolve_asset<'a>(assets: &'a [Asset], selection: &ArchSelection) -> Option<&'a Asset> {
    let arch = selection.effective();
    tracing::debug!(
        platform = %selection.platform,
        %arch,
        assets = %assets.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", "),
        "Resolving installer asset"
    );

    let usable = |asset: &&Asset| !asset.name.is_empty() && !conflicts_with(&asset.name, arch);

    for tier in tiers(selection.platform) {
        let in_tier = || assets.iter().filter(usable).filter(|a| tier.accepts(&a.name));

        let found = in_tier()
            .find(|a| names_arch(&a.name, arch))
            .or_else(|| in_tier().find(|a| has_no_arch_hint(&a.name)));

        if let Some(asset) = found {
            tracing::info!(asset = %asset.name, %arch, "Selected installer asset");
            return Some(asset);
        }
    }

    tracing::warn!(platform = %selection.platform, %arch, "No installer asset matched");
    None
}
