// src/system/tool.rs

use std::fmt;

/// The external command-line tools this crate drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// The Azure CLI, `az`.
    Azure,
    /// The AWS CLI, `aws`.
    Aws,
}

impl Tool {
    /// The canonical binary name looked up on `PATH`.
    pub fn binary(self) -> &'static str {
        match self {
            Self::Azure => "az",
            Self::Aws => "aws",
        }
    }

    /// The product name used in messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Azure => "Azure CLI",
            Self::Aws => "AWS CLI",
        }
    }

    /// Arguments that print the tool version without touching the network.
    pub fn version_args(self) -> &'static [&'static str] {
        &["--version"]
    }

    /// Arguments that succeed only with an active login session.
    pub fn session_args(self) -> &'static [&'static str] {
        match self {
            Self::Azure => &["account", "show", "--output", "json"],
            Self::Aws => &["sts", "get-caller-identity", "--output", "json"],
        }
    }

    /// What to print when the tool cannot be launched at all.
    pub fn install_hints(self) -> Vec<String> {
        let mut hints = vec![
            format!("Error: {} is not installed or not accessible.", self.display_name()),
            String::new(),
            "Troubleshooting steps:".to_string(),
            format!("1. Run the diagnostics: cloudinv doctor --tool {}", self.flag_name()),
            format!("2. Make sure {} is installed and in your PATH", self.display_name()),
            "3. Try restarting your terminal/command prompt".to_string(),
        ];
        hints.push(match self {
            Self::Azure => {
                "4. Check installation at: https://docs.microsoft.com/en-us/cli/azure/install-azure-cli"
                    .to_string()
            }
            Self::Aws => {
                "4. Check installation at: https://docs.aws.amazon.com/cli/latest/userguide/getting-started-install.html"
                    .to_string()
            }
        });
        hints.extend([
            String::new(),
            "Common solutions:".to_string(),
            "- Windows: Restart terminal after installation".to_string(),
            "- macOS: Check if Homebrew path is in your shell profile".to_string(),
            "- Linux: Make sure /usr/local/bin is in your PATH".to_string(),
        ]);
        hints
    }

    /// What to print when the tool runs but has no session.
    pub fn login_hints(self) -> Vec<String> {
        match self {
            Self::Azure => vec![
                "Error: Not logged into Azure CLI.".to_string(),
                "Please run: az login".to_string(),
            ],
            Self::Aws => vec![
                "Error: AWS credentials not found. Please configure your AWS credentials."
                    .to_string(),
                "You can configure them using: aws configure".to_string(),
            ],
        }
    }

    /// The value accepted by `--tool` on the command line.
    pub fn flag_name(self) -> &'static str {
        match self {
            Self::Azure => "azure",
            Self::Aws => "aws",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
