//! Package manager detection for dependency installation.

use super::CommandRequest;
use std::fmt;

/// Package manager inferred from files in the repository root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    /// `pnpm`, detected from `pnpm-lock.yaml`.
    Pnpm,
    /// `yarn`, detected from `yarn.lock`.
    Yarn,
    /// `npm`, detected from `package-lock.json` or `package.json`.
    Npm,
    /// `pip`, detected from `requirements.txt`.
    Pip,
}

impl PackageManager {
    /// Picks a package manager from a repository root listing.
    ///
    /// Lockfiles take precedence over a bare `package.json`.
    #[must_use]
    pub fn detect<'a>(files: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let names: Vec<&str> = files.into_iter().map(str::trim).collect();
        let has = |name: &str| names.iter().any(|candidate| *candidate == name);
        if has("pnpm-lock.yaml") {
            Some(Self::Pnpm)
        } else if has("yarn.lock") {
            Some(Self::Yarn)
        } else if has("package-lock.json") || has("package.json") {
            Some(Self::Npm)
        } else if has("requirements.txt") {
            Some(Self::Pip)
        } else {
            None
        }
    }

    /// Returns the install command.
    #[must_use]
    pub fn install_command(self) -> CommandRequest {
        match self {
            Self::Pnpm => CommandRequest::new("pnpm").with_args(["install", "--frozen-lockfile"]),
            Self::Yarn => CommandRequest::new("yarn").with_args(["install", "--frozen-lockfile"]),
            Self::Npm => CommandRequest::new("npm").with_args(["install", "--no-audit"]),
            Self::Pip => CommandRequest::new("pip").with_args(["install", "-r", "requirements.txt"]),
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pnpm => "pnpm",
            Self::Yarn => "yarn",
            Self::Npm => "npm",
            Self::Pip => "pip",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
