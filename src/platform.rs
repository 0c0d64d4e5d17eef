// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Host platform detection.
//!
//! Packaged native artifacts are grouped by an `{os}-{arch}` identifier such
//! as `linux-x86_64` or `darwin-aarch64`. [`resolve`] derives that identifier
//! for the running process once and caches it.

use core::fmt;
use std::sync::OnceLock;

/// Operating system family.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Darwin,
    Windows,
    Unknown,
}

impl Os {
    /// Classifies a raw OS name, ignoring case.
    ///
    /// `darwin` contains `win`, so the Apple names are matched first.
    pub fn from_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.contains("linux") {
            Os::Linux
        } else if name.contains("mac") || name.contains("darwin") {
            Os::Darwin
        } else if name.contains("win") {
            Os::Windows
        } else {
            Os::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Darwin => "darwin",
            Os::Windows => "windows",
            Os::Unknown => "unknown",
        }
    }

    pub fn is_windows(self) -> bool {
        self == Os::Windows
    }

    pub fn is_darwin(self) -> bool {
        self == Os::Darwin
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical `{os}-{arch}` platform identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlatformId {
    os: Os,
    arch: String,
}

impl PlatformId {
    /// Builds an identifier from raw host strings.
    ///
    /// `amd64` is normalised to `x86_64` and `arm64` to `aarch64`; any other
    /// architecture is kept as given (lowercased).
    pub fn from_parts(os_name: &str, arch_name: &str) -> Self {
        let arch = arch_name.to_ascii_lowercase();
        let arch = match arch.as_str() {
            "amd64" | "x86_64" => "x86_64".to_string(),
            "aarch64" | "arm64" => "aarch64".to_string(),
            _ => arch,
        };
        Self {
            os: Os::from_name(os_name),
            arch,
        }
    }

    pub fn os(&self) -> Os {
        self.os
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Returns the platform of the running process.
///
/// Computed on first use from the compile target's OS and architecture.
pub fn resolve() -> &'static PlatformId {
    static PLATFORM: OnceLock<PlatformId> = OnceLock::new();
    PLATFORM.get_or_init(|| {
        let platform = PlatformId::from_parts(std::env::consts::OS, std::env::consts::ARCH);
        tracing::debug!(%platform, "resolved host platform");
        platform
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_mapping() {
        let cases = [
            ("Linux", "amd64", "linux-x86_64"),
            ("linux", "x86_64", "linux-x86_64"),
            ("Linux", "aarch64", "linux-aarch64"),
            ("Mac OS X", "x86_64", "darwin-x86_64"),
            ("macos", "aarch64", "darwin-aarch64"),
            ("Darwin", "arm64", "darwin-aarch64"),
            ("Windows 10", "amd64", "windows-x86_64"),
            ("windows", "x86_64", "windows-x86_64"),
        ];
        for (os, arch, expected) in cases {
            assert_eq!(PlatformId::from_parts(os, arch).to_string(), expected);
        }
    }

    #[test]
    fn unknown_os() {
        let platform = PlatformId::from_parts("FreeBSD", "amd64");
        assert_eq!(platform.os(), Os::Unknown);
        assert_eq!(platform.to_string(), "unknown-x86_64");
    }

    #[test]
    fn unknown_arch_passes_through() {
        let platform = PlatformId::from_parts("linux", "riscv64");
        assert_eq!(platform.arch(), "riscv64");
        assert_eq!(platform.to_string(), "linux-riscv64");
    }

    #[test]
    fn resolve_is_memoized() {
        assert!(std::ptr::eq(resolve(), resolve()));
        assert_eq!(resolve().os(), Os::from_name(std::env::consts::OS));
    }
}
