//! Capability table: which read-only commands to run per category and platform.
//!
//! The table is an immutable `(Category, Platform) -> commands` map built once.
//! Lookups never fail: an unlisted pair falls back to the generic
//! [`Platform::Other`] entry, and an empty list means "skip this category".

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Diagnostic areas captured on every run, in capture order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    OsVersion,
    Uptime,
    DiskFree,
    Memory,
    NetworkSummary,
    ProcessSummary,
}

impl Category {
    /// Every category in declaration order.
    pub const ALL: [Category; 6] = [
        Category::OsVersion,
        Category::Uptime,
        Category::DiskFree,
        Category::Memory,
        Category::NetworkSummary,
        Category::ProcessSummary,
    ];

    /// Identifier used for log file names and audit records.
    pub fn name(&self) -> &'static str {
        match self {
            Category::OsVersion => "os_version",
            Category::Uptime => "uptime",
            Category::DiskFree => "disk_free",
            Category::Memory => "memory",
            Category::NetworkSummary => "network_summary",
            Category::ProcessSummary => "process_summary",
        }
    }

    /// Human label for console output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::OsVersion => "OS version",
            Category::Uptime => "Uptime",
            Category::DiskFree => "Disk usage",
            Category::Memory => "Memory",
            Category::NetworkSummary => "Network summary",
            Category::ProcessSummary => "Process summary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Platform families with their own command sets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    /// Anything unrecognized. Resolves to the generic command set.
    Other,
}

impl Platform {
    /// Platform of the running host.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` style identifier to a platform.
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" | "android" => Platform::Linux,
            "macos" | "ios" => Platform::MacOs,
            "windows" => Platform::Windows,
            _ => Platform::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
            Platform::Other => "other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = std::convert::Infallible;

    /// Unknown names parse to [`Platform::Other`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_os(&s.to_ascii_lowercase()))
    }
}

static BUILTIN_TABLE: LazyLock<CapabilityTable> = LazyLock::new(CapabilityTable::builtin);

/// Immutable mapping from `(category, platform)` to an ordered command list.
#[derive(Debug, Clone)]
pub struct CapabilityTable {
    entries: HashMap<(Category, Platform), Vec<String>>,
}

impl CapabilityTable {
    /// The built-in table. Every command is read-only and non-interactive.
    pub fn builtin() -> Self {
        use Category::*;
        use Platform::*;

        let rows: &[(Category, Platform, &[&str])] = &[
            // Linux
            (OsVersion, Linux, &["uname -a", "cat /etc/os-release"]),
            (Uptime, Linux, &["uptime"]),
            (DiskFree, Linux, &["df -h", "df -i"]),
            (Memory, Linux, &["free -m", "cat /proc/meminfo"]),
            (NetworkSummary, Linux, &["ip -brief address", "ss -s"]),
            (ProcessSummary, Linux, &["ps aux --sort=-%mem | head -n 25"]),
            // macOS
            (OsVersion, MacOs, &["sw_vers", "uname -a"]),
            (Uptime, MacOs, &["uptime"]),
            (DiskFree, MacOs, &["df -h"]),
            (Memory, MacOs, &["vm_stat", "sysctl hw.memsize"]),
            (NetworkSummary, MacOs, &["ifconfig -a", "netstat -ib"]),
            (ProcessSummary, MacOs, &["ps aux -m | head -n 25"]),
            // Windows
            (OsVersion, Windows, &["ver", "systeminfo"]),
            (
                Uptime,
                Windows,
                &["powershell -NoProfile -Command \"(Get-CimInstance Win32_OperatingSystem).LastBootUpTime\""],
            ),
            (
                DiskFree,
                Windows,
                &["powershell -NoProfile -Command \"Get-PSDrive -PSProvider FileSystem\""],
            ),
            (
                Memory,
                Windows,
                &["powershell -NoProfile -Command \"Get-CimInstance Win32_OperatingSystem | Select-Object TotalVisibleMemorySize,FreePhysicalMemory\""],
            ),
            (NetworkSummary, Windows, &["ipconfig"]),
            (ProcessSummary, Windows, &["tasklist"]),
            // Generic fallback
            (OsVersion, Other, &["uname -a"]),
            (Uptime, Other, &["uptime"]),
            (DiskFree, Other, &["df -h"]),
            (Memory, Other, &[]),
            (NetworkSummary, Other, &[]),
            (ProcessSummary, Other, &["ps"]),
        ];

        let entries = rows
            .iter()
            .map(|(category, platform, commands)| {
                (
                    (*category, *platform),
                    commands.iter().map(|c| c.to_string()).collect(),
                )
            })
            .collect();

        Self { entries }
    }

    /// Replace the commands for one `(category, platform)` pair.
    ///
    /// Callers are responsible for keeping the commands read-only.
    pub fn with_commands<I, S>(mut self, category: Category, platform: Platform, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.insert(
            (category, platform),
            commands.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Commands for `category` on `platform`, falling back to the generic set.
    pub fn commands_for(&self, category: Category, platform: Platform) -> &[String] {
        self.entries
            .get(&(category, platform))
            .or_else(|| self.entries.get(&(category, Platform::Other)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Resolve commands from the built-in table.
pub fn commands_for(category: Category, platform: Platform) -> &'static [String] {
    BUILTIN_TABLE.commands_for(category, platform)
}
