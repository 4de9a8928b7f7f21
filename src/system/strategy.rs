// src/system/strategy.rs

//! Invocation strategies: the concrete ways a logical command can be run.
//!
//! A strategy pairs an [`ExecMode`] with a [`BinaryVariant`]. The list for each
//! platform family is a static table, and the host platform is detected once
//! per process.

use lazy_static::lazy_static;
use std::fmt;

/// The two operating-system families that get distinct strategy tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Windows: `cmd.exe` shells and `.cmd` shims.
    Windows,
    /// Linux, macOS and other Unix-likes.
    Posix,
}

impl Platform {
    /// Detects the platform of the running binary.
    pub fn detect() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    /// The platform this process runs on, detected on first use.
    pub fn host() -> Self {
        *HOST_PLATFORM
    }

    /// Returns the ordered strategy table for this platform.
    pub fn strategies(self) -> &'static [InvocationStrategy] {
        match self {
            Self::Windows => WINDOWS_STRATEGIES,
            Self::Posix => POSIX_STRATEGIES,
        }
    }

    /// Exit code a shell uses to report that the command itself was not found.
    pub fn shell_not_found_code(self) -> i32 {
        match self {
            Self::Windows => 9009,
            Self::Posix => 127,
        }
    }
}

lazy_static! {
    static ref HOST_PLATFORM: Platform = Platform::detect();
}

/// How the process is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// `Command::new(binary).args(args)`, no shell in between.
    Direct,
    /// The whole line is handed to `sh -c` (POSIX) or `cmd /C` (Windows).
    Shell,
}

/// Which file name is used for the tool's binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryVariant {
    /// The canonical name, e.g. `az`.
    Canonical,
    /// The Windows batch shim, e.g. `az.cmd`.
    CmdShim,
}

/// One concrete way of invoking a logical command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationStrategy {
    /// Direct launch or through a shell.
    pub mode: ExecMode,
    /// Which binary name to launch.
    pub binary: BinaryVariant,
}

impl InvocationStrategy {
    /// Pairs a mode with a binary variant.
    pub const fn new(mode: ExecMode, binary: BinaryVariant) -> Self {
        Self { mode, binary }
    }

    /// Resolves the binary name this strategy launches for a canonical tool name.
    ///
    /// A configured binary that already carries an extension or a path is left
    /// alone by the shim variant only if it already ends in `.cmd`.
    pub fn program(&self, canonical: &str) -> String {
        match self.binary {
            BinaryVariant::Canonical => canonical.to_string(),
            BinaryVariant::CmdShim if canonical.to_ascii_lowercase().ends_with(".cmd") => {
                canonical.to_string()
            }
            BinaryVariant::CmdShim => format!("{}.cmd", canonical),
        }
    }
}

impl fmt::Display for InvocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binary = match self.binary {
            BinaryVariant::Canonical => "canonical binary",
            BinaryVariant::CmdShim => ".cmd shim",
        };
        let mode = match self.mode {
            ExecMode::Direct => "direct",
            ExecMode::Shell => "via shell",
        };
        write!(f, "{} {}", binary, mode)
    }
}

/// POSIX: the argument vector first, then the same line through `sh -c`.
pub static POSIX_STRATEGIES: &[InvocationStrategy] = &[
    InvocationStrategy::new(ExecMode::Direct, BinaryVariant::Canonical),
    InvocationStrategy::new(ExecMode::Shell, BinaryVariant::Canonical),
];

/// Windows: the CLI installer ships `az.cmd`, which only resolves reliably
/// through `cmd`, so the shim through the shell goes first.
pub static WINDOWS_STRATEGIES: &[InvocationStrategy] = &[
    InvocationStrategy::new(ExecMode::Shell, BinaryVariant::CmdShim),
    InvocationStrategy::new(ExecMode::Shell, BinaryVariant::Canonical),
    InvocationStrategy::new(ExecMode::Direct, BinaryVariant::CmdShim),
    InvocationStrategy::new(ExecMode::Direct, BinaryVariant::Canonical),
];

/// Joins a program and its arguments into a single line for a shell.
///
/// POSIX lines use `shlex` quoting. `cmd.exe` has no such quoting rules, so on
/// Windows arguments containing whitespace or quotes are wrapped in double quotes.
pub fn shell_line(platform: Platform, program: &str, args: &[String]) -> String {
    let words = std::iter::once(program).chain(args.iter().map(String::as_str));
    match platform {
        Platform::Posix => shlex::try_join(words.clone())
            .unwrap_or_else(|_| words.collect::<Vec<_>>().join(" ")),
        Platform::Windows => words
            .map(|w| {
                if w.is_empty() || w.contains(char::is_whitespace) || w.contains('"') {
                    format!("\"{}\"", w.replace('"', "\\\""))
                } else {
                    w.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_table_prefers_direct_execution() {
        let table = Platform::Posix.strategies();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].mode, ExecMode::Direct);
        assert_eq!(table[1].mode, ExecMode::Shell);
        assert!(table.iter().all(|s| s.binary == BinaryVariant::Canonical));
    }

    #[test]
    fn test_windows_table_order() {
        let table = Platform::Windows.strategies();
        assert_eq!(
            table,
            &[
                InvocationStrategy::new(ExecMode::Shell, BinaryVariant::CmdShim),
                InvocationStrategy::new(ExecMode::Shell, BinaryVariant::Canonical),
                InvocationStrategy::new(ExecMode::Direct, BinaryVariant::CmdShim),
                InvocationStrategy::new(ExecMode::Direct, BinaryVariant::Canonical),
            ]
        );
    }

    #[test]
    fn test_program_resolution() {
        let shim = InvocationStrategy::new(ExecMode::Direct, BinaryVariant::CmdShim);
        let canonical = InvocationStrategy::new(ExecMode::Direct, BinaryVariant::Canonical);
        assert_eq!(shim.program("az"), "az.cmd");
        assert_eq!(shim.program("AZ.CMD"), "AZ.CMD");
        assert_eq!(canonical.program("aws"), "aws");
    }

    #[test]
    fn test_posix_shell_line_quotes_arguments_with_spaces() {
        let args = vec![
            "--dimensions".to_string(),
            "Name=Cluster Name,Value=orders".to_string(),
        ];
        let line = shell_line(Platform::Posix, "aws", &args);
        assert_eq!(line, "aws --dimensions 'Name=Cluster Name,Value=orders'");
    }

    #[test]
    fn test_windows_shell_line() {
        let args = vec!["account".to_string(), "show me".to_string()];
        let line = shell_line(Platform::Windows, "az.cmd", &args);
        assert_eq!(line, "az.cmd account \"show me\"");
    }

    #[test]
    fn test_host_platform_is_stable() {
        assert_eq!(Platform::host(), Platform::detect());
    }
}
