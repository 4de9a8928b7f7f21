// src/core/azure.rs

//! Azure VM inventory: subscriptions, VM listing, per-VM details and the
//! flattened [`VmRecord`] the reports are built from.

use crate::{
    core::{
        report::CsvRecord,
        table::{self, Table},
    },
    error::CloudError,
    system::{
        executor::ProcessRunner,
        invoker::{Invoker, LogicalCommand},
        tool::Tool,
    },
};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const UNKNOWN: &str = "Unknown";

// --- Payloads returned by `az` ---

/// An entry of `az account list`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Subscription {
    /// Subscription GUID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// State, e.g. `Enabled`.
    pub state: String,
    /// Whether `az` uses it when none is named.
    pub is_default: bool,
}

/// A VM as returned by `az vm list` or `az vm show`. Only the fields the
/// inventory reads are modelled; everything is optional.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AzVm {
    /// Full resource ID; its third segment is the subscription.
    pub id: Option<String>,
    /// VM name.
    pub name: Option<String>,
    /// Resource group.
    pub resource_group: Option<String>,
    /// Azure region.
    pub location: Option<String>,
    /// Only present in `az vm list --show-details` output.
    pub power_state: Option<String>,
    /// Size.
    pub hardware_profile: Option<HardwareProfile>,
    /// Which OS configuration block is present.
    pub os_profile: Option<OsProfile>,
    /// OS disk and image.
    pub storage_profile: Option<StorageProfile>,
    /// Attached NICs.
    pub network_profile: Option<NetworkProfile>,
    /// Tag values may be JSON `null`.
    pub tags: Option<BTreeMap<String, Option<String>>>,
}

/// `hardwareProfile`
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct HardwareProfile {
    /// Size, e.g. `Standard_B2s`.
    pub vm_size: Option<String>,
}

/// `osProfile`. Only presence of the two blocks matters.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OsProfile {
    /// Present on Linux VMs.
    pub linux_configuration: Option<Value>,
    /// Present on Windows VMs.
    pub windows_configuration: Option<Value>,
}

/// `storageProfile`
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageProfile {
    /// The OS disk.
    pub os_disk: Option<OsDisk>,
    /// The image the VM was created from.
    pub image_reference: Option<ImageReference>,
}

/// `storageProfile.osDisk`
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OsDisk {
    /// Size in GB.
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: Option<u64>,
    /// `Linux` or `Windows`.
    pub os_type: Option<String>,
    /// Preferred over the profile-level image when present.
    pub image_reference: Option<ImageReference>,
}

/// Marketplace image coordinates.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageReference {
    /// Publisher, e.g. `Canonical`.
    pub publisher: Option<String>,
    /// Offer, e.g. `0001-com-ubuntu-server-jammy`.
    pub offer: Option<String>,
    /// SKU, e.g. `22_04-lts-gen2`.
    pub sku: Option<String>,
    /// Requested version, often `latest`.
    pub version: Option<String>,
    /// The version actually deployed.
    pub exact_version: Option<String>,
}

/// `networkProfile`
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkProfile {
    /// Only counted.
    pub network_interfaces: Vec<Value>,
}

impl AzVm {
    /// Tags with null values turned into empty strings.
    pub fn tags(&self) -> BTreeMap<String, String> {
        self.tags
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), v.clone().unwrap_or_default()))
            .collect()
    }
}

// --- Flattened records ---

/// One VM row of every report and export.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VmRecord {
    /// VM name.
    pub name: String,
    /// Resource group.
    pub resource_group: String,
    /// Azure region.
    pub location: String,
    /// Subscription display name.
    pub subscription: String,
    /// Subscription GUID, taken from the resource ID.
    pub subscription_id: String,
    /// VM size.
    pub vm_size: String,
    /// Power state, e.g. `VM running`.
    pub power_state: String,
    /// `Linux`, `Windows` or `Unknown`.
    pub os_type: String,
    /// Image offer and SKU, or an OS tag.
    pub os_name: String,
    /// Image version.
    pub os_version: String,
    /// `None` without details.
    pub os_disk_size_gb: Option<u64>,
    /// `None` when no NIC was listed.
    pub network_interfaces: Option<usize>,
    /// Tags, null values as empty strings.
    pub tags: BTreeMap<String, String>,
}

/// OS facts of one VM. Unknown fields read `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsInfo {
    /// `Linux` or `Windows`.
    pub os_type: String,
    /// Human-readable OS name.
    pub os_name: String,
    /// Image version.
    pub os_version: String,
    /// OS disk size in GB.
    pub os_disk_size_gb: Option<u64>,
}

impl Default for OsInfo {
    fn default() -> Self {
        Self {
            os_type: UNKNOWN.to_string(),
            os_name: UNKNOWN.to_string(),
            os_version: UNKNOWN.to_string(),
            os_disk_size_gb: None,
        }
    }
}

/// The JSON dump of an inventory run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VmReport {
    /// When the run started.
    pub generated_at: DateTime<Local>,
    /// `vms.len()`.
    pub total_vms: usize,
    /// Every VM found.
    pub vms: Vec<VmRecord>,
}

impl VmReport {
    /// Wraps `vms` with a count and timestamp.
    pub fn new(vms: Vec<VmRecord>, generated_at: DateTime<Local>) -> Self {
        Self {
            generated_at,
            total_vms: vms.len(),
            vms,
        }
    }
}

/// Reads the OS facts out of `az vm show` output.
pub fn extract_os_info(details: &AzVm) -> OsInfo {
    let mut info = OsInfo::default();

    let os_disk = details
        .storage_profile
        .as_ref()
        .and_then(|s| s.os_disk.as_ref());

    match &details.os_profile {
        Some(profile) if profile.linux_configuration.is_some() => info.os_type = "Linux".to_string(),
        Some(profile) if profile.windows_configuration.is_some() => {
            info.os_type = "Windows".to_string()
        }
        _ => {
            if let Some(os_type) = os_disk.and_then(|d| d.os_type.clone()) {
                info.os_type = os_type;
            }
        }
    }

    info.os_disk_size_gb = os_disk.and_then(|d| d.disk_size_gb);

    let image = os_disk
        .and_then(|d| d.image_reference.as_ref())
        .or_else(|| {
            details
                .storage_profile
                .as_ref()
                .and_then(|s| s.image_reference.as_ref())
        });
    if let Some(image) = image {
        match (&image.publisher, &image.offer, &image.sku) {
            (_, Some(offer), Some(sku)) => info.os_name = format!("{} {}", offer, sku),
            (Some(publisher), Some(offer), None) => info.os_name = format!("{} {}", publisher, offer),
            _ => {}
        }
        if let Some(version) = image.exact_version.as_ref().or(image.version.as_ref()) {
            info.os_version = version.clone();
        }
    }

    if let Some((_, value)) = details.tags().into_iter().find(|(key, _)| {
        let key = key.to_lowercase();
        key.contains("os") || key.contains("system")
    }) {
        info.os_name = value;
    }

    info
}

/// Flattens a listed VM (plus its details, if fetched) into a record.
pub fn format_vm_info(vm: &AzVm, subscription_name: &str, details: Option<&AzVm>) -> VmRecord {
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| UNKNOWN.to_string());
    let os = details.map(extract_os_info).unwrap_or_default();

    VmRecord {
        name: text(&vm.name),
        resource_group: text(&vm.resource_group),
        location: text(&vm.location),
        subscription: subscription_name.to_string(),
        subscription_id: vm
            .id
            .as_deref()
            .and_then(|id| id.split('/').nth(2))
            .filter(|segment| !segment.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string(),
        vm_size: vm
            .hardware_profile
            .as_ref()
            .and_then(|h| h.vm_size.clone())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        power_state: text(&vm.power_state),
        os_type: os.os_type,
        os_name: os.os_name,
        os_version: os.os_version,
        os_disk_size_gb: os.os_disk_size_gb,
        network_interfaces: vm
            .network_profile
            .as_ref()
            .map(|n| n.network_interfaces.len())
            .filter(|count| *count > 0),
        tags: vm.tags(),
    }
}

// --- Collection ---

/// Filters and depth of an inventory run.
#[derive(Debug, Clone, Default)]
pub struct VmQuery {
    /// Subscription name or ID; all subscriptions when `None`.
    pub subscription: Option<String>,
    /// Restricts the listing to one group.
    pub resource_group: Option<String>,
    /// Fetch `az vm show` for every VM.
    pub detailed: bool,
}

/// What an inventory run found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmInventory {
    /// `az account list` returned nothing.
    NoSubscriptions,
    /// The requested subscription is not among the listed ones.
    SubscriptionNotFound(String),
    /// The VMs, possibly none.
    Found(Vec<VmRecord>),
}

/// Every subscription the logged-in account can see.
pub fn list_subscriptions<R: ProcessRunner>(
    invoker: &Invoker<R>,
) -> Result<Vec<Subscription>, CloudError> {
    invoker.invoke_as(&LogicalCommand::new(
        Tool::Azure,
        ["account", "list", "--output", "json"],
    ))
}

/// Lists the VMs of one subscription. `--show-details` makes `az` fill in
/// `powerState`.
pub fn list_vms<R: ProcessRunner>(
    invoker: &Invoker<R>,
    subscription_id: &str,
) -> Result<Vec<AzVm>, CloudError> {
    invoker.invoke_as(&LogicalCommand::new(
        Tool::Azure,
        [
            "vm",
            "list",
            "--show-details",
            "--subscription",
            subscription_id,
            "--output",
            "json",
        ],
    ))
}

/// `az vm show` for one VM.
pub fn show_vm<R: ProcessRunner>(
    invoker: &Invoker<R>,
    subscription_id: &str,
    resource_group: &str,
    name: &str,
) -> Result<AzVm, CloudError> {
    invoker.invoke_as(&LogicalCommand::new(
        Tool::Azure,
        [
            "vm",
            "show",
            "--subscription",
            subscription_id,
            "--resource-group",
            resource_group,
            "--name",
            name,
            "--output",
            "json",
        ],
    ))
}

/// Walks the visible subscriptions and collects one record per VM.
///
/// A subscription whose VM listing fails is skipped with a warning. With
/// `detailed`, a VM whose details can't be fetched is kept with unknown OS
/// fields.
pub fn collect_vms<R: ProcessRunner>(
    invoker: &Invoker<R>,
    query: &VmQuery,
) -> Result<VmInventory, CloudError> {
    println!("Getting subscriptions...");
    let mut subscriptions = list_subscriptions(invoker)?;
    if subscriptions.is_empty() {
        return Ok(VmInventory::NoSubscriptions);
    }
    println!("Found {} subscription(s)", subscriptions.len());

    if let Some(wanted) = &query.subscription {
        subscriptions.retain(|s| &s.id == wanted);
        if subscriptions.is_empty() {
            return Ok(VmInventory::SubscriptionNotFound(wanted.clone()));
        }
    }

    let mut records = Vec::new();
    for subscription in &subscriptions {
        println!(
            "\nProcessing subscription: {} ({})",
            subscription.name, subscription.id
        );

        let vms = match list_vms(invoker, &subscription.id) {
            Ok(vms) => vms,
            Err(e) => {
                log::warn!("Skipping subscription {}: {}", subscription.name, e);
                continue;
            }
        };
        if vms.is_empty() {
            println!("No VMs found in subscription {}", subscription.name);
            continue;
        }
        println!(
            "Found {} VM(s) in subscription {}",
            vms.len(),
            subscription.name
        );

        for vm in vms.iter().filter(|vm| match &query.resource_group {
            Some(rg) => vm.resource_group.as_deref() == Some(rg.as_str()),
            None => true,
        }) {
            let details = if query.detailed {
                fetch_details(invoker, &subscription.id, vm)
            } else {
                None
            };
            records.push(format_vm_info(vm, &subscription.name, details.as_ref()));
        }
    }

    Ok(VmInventory::Found(records))
}

fn fetch_details<R: ProcessRunner>(
    invoker: &Invoker<R>,
    subscription_id: &str,
    vm: &AzVm,
) -> Option<AzVm> {
    let (Some(name), Some(resource_group)) = (&vm.name, &vm.resource_group) else {
        log::warn!("VM without name or resource group; details skipped");
        return None;
    };
    println!("  Getting details for VM: {}", name);
    match show_vm(invoker, subscription_id, resource_group, name) {
        Ok(details) => Some(details),
        Err(e) => {
            log::warn!("Could not get details for VM {}: {}", name, e);
            None
        }
    }
}

// --- Rendering ---

fn sorted(records: &[VmRecord]) -> Vec<&VmRecord> {
    let mut sorted: Vec<&VmRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        (&a.subscription, &a.resource_group, &a.name).cmp(&(
            &b.subscription,
            &b.resource_group,
            &b.name,
        ))
    });
    sorted
}

fn disk_cell(record: &VmRecord) -> String {
    record
        .os_disk_size_gb
        .map(|size| size.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn tag_pairs(tags: &BTreeMap<String, String>, separator: &str) -> String {
    tags.iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(separator)
}

/// The three distributions, each preceded by a blank line.
fn distributions(records: &[VmRecord]) -> String {
    [
        (
            "OS Type Distribution",
            table::distribution(records.iter().map(|r| r.os_type.as_str())),
        ),
        (
            "Power State Distribution",
            table::distribution(records.iter().map(|r| r.power_state.as_str())),
        ),
        (
            "Location Distribution",
            table::distribution(records.iter().map(|r| r.location.as_str())),
        ),
    ]
    .iter()
    .map(|(title, counts)| table::render_distribution(title, counts))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Total count followed by the OS type, power state and location distributions.
pub fn render_summary(records: &[VmRecord]) -> String {
    let mut out = format!(
        "\n{rule}\nAZURE VMs SUMMARY\n{rule}\nTotal VMs found: {}\n\n",
        records.len(),
        rule = table::rule(100)
    );
    out.push_str(&distributions(records));
    out
}

/// One row per VM, sorted by subscription, group and name. `show_tags` adds a tag line under each row.
pub fn render_table(records: &[VmRecord], show_tags: bool) -> String {
    let mut table = Table::new([
        "Name",
        "Resource Group",
        "Location",
        "Subscription",
        "VM Size",
        "Power State",
        "OS Type",
        "OS Name",
        "OS Disk (GB)",
    ]);
    for record in sorted(records) {
        let note = (show_tags && !record.tags.is_empty())
            .then(|| format!("    Tags: {}", tag_pairs(&record.tags, ", ")));
        table.push_row_with_note(
            vec![
                record.name.clone(),
                record.resource_group.clone(),
                record.location.clone(),
                record.subscription.clone(),
                record.vm_size.clone(),
                record.power_state.clone(),
                record.os_type.clone(),
                record.os_name.clone(),
                disk_cell(record),
            ],
            note,
        );
    }
    format!(
        "\n{rule}\nDETAILED VM INFORMATION\n{rule}\n{}",
        table.render(),
        rule = table::rule(100)
    )
}

/// The `--save-text` report.
pub fn render_text_report(records: &[VmRecord], show_tags: bool, at: DateTime<Local>) -> String {
    let rule = table::rule(50);
    let mut out = format!(
        "Azure VM Information Report\n{rule}\nGenerated: {}\nTotal VMs: {}\n\nSUMMARY\n{}\n",
        at.format("%Y-%m-%d %H:%M:%S"),
        records.len(),
        "-".repeat(20),
    );
    out.push_str(&distributions(records));
    out.push_str(&format!("\n{rule}\nDETAILED VM INFORMATION\n{rule}\n\n"));

    for record in sorted(records) {
        out.push_str(&format!("VM Name: {}\n", record.name));
        out.push_str(&format!("Resource Group: {}\n", record.resource_group));
        out.push_str(&format!("Location: {}\n", record.location));
        out.push_str(&format!("Subscription: {}\n", record.subscription));
        out.push_str(&format!("Subscription ID: {}\n", record.subscription_id));
        out.push_str(&format!("VM Size: {}\n", record.vm_size));
        out.push_str(&format!("Power State: {}\n", record.power_state));
        out.push_str(&format!("OS Type: {}\n", record.os_type));
        out.push_str(&format!("OS Name: {}\n", record.os_name));
        out.push_str(&format!("OS Version: {}\n", record.os_version));
        out.push_str(&format!("OS Disk Size (GB): {}\n", disk_cell(record)));
        out.push_str(&format!(
            "Network Interfaces: {}\n",
            record
                .network_interfaces
                .map(|n| n.to_string())
                .unwrap_or_else(|| UNKNOWN.to_string())
        ));
        if show_tags && !record.tags.is_empty() {
            out.push_str(&format!("Tags: {}\n", tag_pairs(&record.tags, ", ")));
        }
        out.push_str(&format!("{}\n\n", "-".repeat(40)));
    }
    out
}

impl CsvRecord for VmRecord {
    const HEADERS: &'static [&'static str] = &[
        "Name",
        "Resource Group",
        "Location",
        "Subscription",
        "Subscription ID",
        "VM Size",
        "Power State",
        "OS Type",
        "OS Name",
        "OS Version",
        "OS Disk Size (GB)",
        "Network Interfaces",
        "Tags",
    ];

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.resource_group.clone(),
            self.location.clone(),
            self.subscription.clone(),
            self.subscription_id.clone(),
            self.vm_size.clone(),
            self.power_state.clone(),
            self.os_type.clone(),
            self.os_name.clone(),
            self.os_version.clone(),
            self.os_disk_size_gb.map(|s| s.to_string()).unwrap_or_default(),
            self.network_interfaces
                .map(|n| n.to_string())
                .unwrap_or_default(),
            tag_pairs(&self.tags, "; "),
        ]
    }
}
