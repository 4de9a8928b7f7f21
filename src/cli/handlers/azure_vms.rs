// src/cli/handlers/azure_vms.rs

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;

use crate::{
    cli::{args::SaveArgs, dispatcher::AppContext, handlers::commons},
    core::{
        azure::{self, VmInventory, VmQuery, VmReport},
        report::{self, OutputFormat, OutputTarget},
    },
    system::{executor::ProcessRunner, tool::Tool},
};

// --- Command Argument Parsing ---

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Lists Azure VMs and their operating systems."
)]
struct AzureVmsArgs {
    /// Only look at this subscription ID.
    #[arg(long, value_name = "ID")]
    subscription: Option<String>,

    /// Only list VMs in this resource group.
    #[arg(long, value_name = "NAME")]
    resource_group: Option<String>,

    /// Fetch details (OS, disk) for every VM. Slower; saves JSON unless another
    /// format is chosen.
    #[arg(long)]
    detailed: bool,

    /// Show VM tags under each row.
    #[arg(long)]
    show_tags: bool,

    /// Print only the summary, not the VM table.
    #[arg(long)]
    summary_only: bool,

    #[command(flatten)]
    save: SaveArgs,
}

// --- Main Handler ---

/// Runs `azure-vms`.
pub fn handle<R: ProcessRunner>(args: Vec<String>, ctx: &AppContext<R>) -> Result<()> {
    let args = AzureVmsArgs::try_parse_from(&args)?;

    commons::banner("Azure VM Lister");
    ctx.invoker.ensure_ready(Tool::Azure)?;

    let query = VmQuery {
        subscription: args.subscription.clone(),
        resource_group: args.resource_group.clone(),
        detailed: args.detailed,
    };
    let records = match azure::collect_vms(&ctx.invoker, &query)? {
        VmInventory::NoSubscriptions => {
            println!("No subscriptions found or accessible.");
            return Ok(());
        }
        VmInventory::SubscriptionNotFound(id) => {
            println!("Subscription {} not found or not accessible.", id);
            return Ok(());
        }
        VmInventory::Found(records) => records,
    };

    if records.is_empty() {
        println!("No VMs found matching the criteria.");
        println!("Total VMs found: 0");
        return Ok(());
    }

    print!("{}", azure::render_summary(&records));
    if !args.summary_only {
        print!("{}", azure::render_table(&records, args.show_tags));
    }

    let target = args.save.target().or_else(|| {
        args.detailed.then_some(OutputTarget {
            format: OutputFormat::Json,
            path: None,
        })
    });
    if let Some(target) = target {
        let now = Local::now();
        let path = commons::target_path(ctx, &target, "azure", "vms", now)?;
        match target.format {
            OutputFormat::Json => report::write_json(&path, &VmReport::new(records, now)),
            OutputFormat::Csv => report::write_csv(&path, &records),
            OutputFormat::Text => report::write_text(
                &path,
                &azure::render_text_report(&records, args.show_tags, now),
            ),
        }
        .with_context(|| format!("Could not save VM information to {}", path.display()))?;
        commons::report_saved(&format!("VM information ({})", target.format.label()), &path);
    }

    Ok(())
}
