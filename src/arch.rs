//! Well-known file names in an unpacked application bundle.

use clap::ValueEnum;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "assemblies.manifest";
pub const REPORT_FILE:   &str = "assemblies.json";

/// Store flavour.  `Generic` is the architecture-independent store; the
/// others carry per-ABI images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Arch {
    Generic,
    Arm,
    Arm64,
    X86,
    #[value(name = "x86_64")]
    X86_64,
}

impl Arch {
    pub const ALL: [Arch; 5] = [Arch::Generic, Arch::Arm, Arch::Arm64, Arch::X86, Arch::X86_64];

    pub fn store_file(self) -> &'static str {
        match self {
            Arch::Generic => "assemblies.blob",
            Arch::Arm     => "assemblies.armeabi_v7a.blob",
            Arch::Arm64   => "assemblies.arm64_v8a.blob",
            Arch::X86     => "assemblies.x86.blob",
            Arch::X86_64  => "assemblies.x86_64.blob",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Arch::Generic => "generic",
            Arch::Arm     => "arm",
            Arch::Arm64   => "arm64",
            Arch::X86     => "x86",
            Arch::X86_64  => "x86_64",
        }
    }
}

/// Store files present in `dir`.
///
/// The generic store always comes first when present; `only` restricts the
/// per-ABI stores to the listed architectures (empty means all of them).
pub fn discover_stores(dir: &Path, only: &[Arch]) -> Vec<(Arch, PathBuf)> {
    Arch::ALL
        .iter()
        .copied()
        .filter(|&a| a == Arch::Generic || only.is_empty() || only.contains(&a))
        .map(|a| (a, dir.join(a.store_file())))
        .filter(|(_, p)| p.is_file())
        .collect()
}
