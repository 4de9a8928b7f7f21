use anyhow::{Result, bail};

use crate::{
    cli::handlers,
    core::config_loader::Settings,
    system::{
        executor::{ProcessRunner, SystemRunner},
        invoker::Invoker,
    },
};

/// Everything a handler needs: the configured invoker and the loaded settings.
#[derive(Debug)]
pub struct AppContext<R: ProcessRunner = SystemRunner> {
    /// Runs `az` and `aws`, already configured from `settings`.
    pub invoker: Invoker<R>,
    /// The loaded `config.toml`.
    pub settings: Settings,
}

impl<R: ProcessRunner> AppContext<R> {
    /// Builds the context, applying `settings` to the invoker.
    pub fn new(invoker: Invoker<R>, settings: Settings) -> Self {
        Self {
            invoker: settings.configure(invoker),
            settings,
        }
    }
}

// --- Command Definition and Registry ---

/// A command, its aliases, and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &AppContext) -> Result<()>,
}

/// The single source of truth for all commands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "azure-vms",
        aliases: &["vms"],
        handler: handlers::azure_vms::handle,
    },
    CommandDefinition {
        name: "msk-clusters",
        aliases: &["msk"],
        handler: handlers::msk_clusters::handle,
    },
    CommandDefinition {
        name: "msk-metrics",
        aliases: &[],
        handler: handlers::msk_metrics::handle,
    },
    CommandDefinition {
        name: "msk-brokers",
        aliases: &[],
        handler: handlers::msk_brokers::handle,
    },
    CommandDefinition {
        name: "msk-topics",
        aliases: &["topics"],
        handler: handlers::msk_topics::handle,
    },
    CommandDefinition {
        name: "doctor",
        aliases: &["debug"],
        handler: handlers::doctor::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Routes `cloudinv <command> [args...]` to the command's handler.
pub fn dispatch(all_args: Vec<String>, ctx: &AppContext) -> Result<()> {
    log::debug!("Dispatching args: {:?}", all_args);

    let mut all_args = all_args.into_iter();
    let Some(name) = all_args.next() else {
        bail!("No command given. Run `cloudinv --help` to see the available commands.");
    };
    let Some(command) = find_command(&name) else {
        bail!(
            "Unknown command '{}'. Available commands: {}",
            name,
            COMMAND_REGISTRY
                .iter()
                .map(|c| c.name)
                .collect::<Vec<_>>()
                .join(", ")
        );
    };

    (command.handler)(all_args.collect(), ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_resolve_to_commands() {
        assert_eq!(find_command("vms").map(|c| c.name), Some("azure-vms"));
        assert_eq!(find_command("msk").map(|c| c.name), Some("msk-clusters"));
        assert_eq!(find_command("debug").map(|c| c.name), Some("doctor"));
        assert_eq!(find_command("topics").map(|c| c.name), Some("msk-topics"));
        assert!(find_command("vm").is_none());
    }

    #[test]
    fn test_unknown_command_lists_known_ones() {
        let ctx = AppContext::new(Invoker::system(), Settings::default());
        let err = dispatch(vec!["nope".to_string()], &ctx).unwrap_err();
        assert!(err.to_string().contains("azure-vms, msk-clusters"));
    }
}
