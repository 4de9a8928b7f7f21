use clap::Parser;

/// Arguments shared by several commands.
pub mod args;
/// The command registry.
pub mod dispatcher;
/// One module per command.
pub mod handlers;

const COMMANDS_HELP: &str = "\
Commands:
  azure-vms, vms     List Azure VMs and their operating systems
  msk-clusters, msk  List MSK clusters, their brokers and tags
  msk-metrics        Read CloudWatch metrics of MSK clusters
  msk-brokers        Show MSK bootstrap servers and broker nodes
  msk-topics, topics List topics and partitions of MSK clusters
  doctor, debug      Diagnose how the az/aws CLIs can be launched

Run `cloudinv <command> --help` for the options of a command.";

/// cloudinv: Azure VM and Amazon MSK inventory through the cloud CLIs.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = COMMANDS_HELP,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Show debug output, including every launch attempt.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors in the log output.
    #[arg(short, long)]
    pub quiet: bool,

    /// The command followed by its own arguments.
    #[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// The log filter implied by the verbosity flags.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else if self.quiet {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        }
    }
}
