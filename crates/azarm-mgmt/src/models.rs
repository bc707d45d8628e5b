//! Wire models for the resource clients.
//!
//! Every optional service field is an `Option` and is omitted from request
//! bodies when `None`, so "not set" and "set to empty" stay distinguishable.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use azarm_core::ResourceId;

pub use azarm_core::error::ErrorDetail;
pub use azarm_core::pager::ListResult;

// ─── Common ─────────────────────────────────────────────────────────

/// Creation and last-modification metadata stamped by ARM.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
}

pub type Tags = HashMap<String, String>;

/// Final payload of operations that return nothing useful (deletes, power
/// actions). Accepts any object body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Empty {}

// ─── Resource Groups ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceGroupProperties>,
}

impl ResourceGroup {
    /// Minimal create body.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.get_or_insert_with(HashMap::new).insert(key.into(), value.into());
        self
    }

    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties.as_ref()?.provisioning_state.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// PATCH body for a resource group.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupPatchable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportTemplateRequest {
    /// Resource ids to export; `["*"]` exports everything in the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
    /// Comma-separated flags such as `IncludeParameterDefaultValue`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

impl ExportTemplateRequest {
    pub fn all_resources() -> Self {
        Self {
            resources: Some(vec!["*".to_string()]),
            options: Some("IncludeParameterDefaultValue".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResourceGroupExportResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

// ─── Management Locks ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LockLevel {
    CanNotDelete,
    NotSpecified,
    ReadOnly,
}

impl fmt::Display for LockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CanNotDelete => write!(f, "CanNotDelete"),
            Self::NotSpecified => write!(f, "NotSpecified"),
            Self::ReadOnly => write!(f, "ReadOnly"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagementLockObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ManagementLockProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_data: Option<SystemData>,
}

impl ManagementLockObject {
    pub fn new(level: LockLevel, notes: Option<String>) -> Self {
        Self {
            properties: Some(ManagementLockProperties {
                level: Some(level),
                notes,
                owners: None,
            }),
            ..Default::default()
        }
    }

    pub fn level(&self) -> Option<LockLevel> {
        self.properties.as_ref()?.level
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagementLockProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LockLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<ManagementLockOwner>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagementLockOwner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
}

// ─── Virtual Machines ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<VirtualMachineProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_data: Option<SystemData>,
}

impl VirtualMachine {
    /// `running`, `deallocated`, ... from the `PowerState/*` instance-view
    /// status. Only present when the VM was read with `$expand=instanceView`.
    pub fn power_state(&self) -> Option<&str> {
        self.properties.as_ref()?.instance_view.as_ref()?.power_state()
    }

    /// Resource group recovered from the service-assigned `id`.
    pub fn resource_group(&self) -> Option<String> {
        ResourceId::parse(self.id.as_deref()?).ok()?.resource_group_name
    }

    pub fn vm_size(&self) -> Option<&str> {
        self.properties.as_ref()?.hardware_profile.as_ref()?.vm_size.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_profile: Option<HardwareProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_profile: Option<StorageProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_profile: Option<OsProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_profile: Option<NetworkProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_view: Option<VirtualMachineInstanceView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<ImageReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_disk: Option<OsDisk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_disks: Option<Vec<DataDisk>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_option: Option<String>,
    #[serde(rename = "diskSizeGB", default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataDisk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lun: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_option: Option<String>,
    #[serde(rename = "diskSizeGB", default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OsProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_username: Option<String>,
    /// Write-only; never returned by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
}

impl fmt::Debug for OsProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OsProfile")
            .field("computer_name", &self.computer_name)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &self.admin_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_interfaces: Option<Vec<NetworkInterfaceReference>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NetworkInterfaceReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<NetworkInterfaceReferenceProperties>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NetworkInterfaceReferenceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

/// PATCH body for a virtual machine.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<VirtualMachineProperties>,
}

impl VirtualMachineUpdate {
    /// Resize: only the hardware profile is sent.
    pub fn resize(vm_size: impl Into<String>) -> Self {
        Self {
            properties: Some(VirtualMachineProperties {
                hardware_profile: Some(HardwareProfile {
                    vm_size: Some(vm_size.into()),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineInstanceView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statuses: Option<Vec<InstanceViewStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_agent: Option<VirtualMachineAgentInstanceView>,
}

impl VirtualMachineInstanceView {
    pub fn power_state(&self) -> Option<&str> {
        self.statuses
            .as_deref()?
            .iter()
            .filter_map(|s| s.code.as_deref())
            .find_map(|code| code.strip_prefix("PowerState/"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceViewStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineAgentInstanceView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_agent_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statuses: Option<Vec<InstanceViewStatus>>,
}

/// Values for `$expand` on a VM get.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceViewTypes {
    InstanceView,
    UserData,
}

impl fmt::Display for InstanceViewTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstanceView => write!(f, "instanceView"),
            Self::UserData => write!(f, "userData"),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_are_omitted() {
        let rg = ResourceGroup::new("eastus");
        assert_eq!(serde_json::to_string(&rg).unwrap(), r#"{"location":"eastus"}"#);
    }

    #[test]
    fn empty_and_absent_stay_distinct() {
        let rg = ResourceGroup {
            tags: Some(Tags::new()),
            ..ResourceGroup::new("eastus")
        };
        let json = serde_json::to_string(&rg).unwrap();
        assert!(json.contains(r#""tags":{}"#));
        let back: ResourceGroup = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tags, Some(Tags::new()));
    }

    #[test]
    fn resource_group_from_service() {
        let json = r#"{"id":"/subscriptions/sub1/resourceGroups/rg1","name":"rg1","type":"Microsoft.Resources/resourceGroups","location":"eastus","tags":{"env":"prod"},"properties":{"provisioningState":"Succeeded"}}"#;
        let rg: ResourceGroup = serde_json::from_str(json).unwrap();
        assert_eq!(rg.name.as_deref(), Some("rg1"));
        assert_eq!(rg.resource_type.as_deref(), Some("Microsoft.Resources/resourceGroups"));
        assert_eq!(rg.provisioning_state(), Some("Succeeded"));
        assert_eq!(rg.tags.unwrap().get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn lock_level_wire_names() {
        let lock = ManagementLockObject::new(LockLevel::CanNotDelete, Some("keep".into()));
        let json = serde_json::to_string(&lock).unwrap();
        assert_eq!(json, r#"{"properties":{"level":"CanNotDelete","notes":"keep"}}"#);
        assert_eq!(LockLevel::ReadOnly.to_string(), "ReadOnly");
    }

    #[test]
    fn vm_power_state_and_size() {
        let json = r#"{
            "id": "/subscriptions/s/resourceGroups/web-rg/providers/Microsoft.Compute/virtualMachines/vm1",
            "name": "vm1",
            "properties": {
                "hardwareProfile": {"vmSize": "Standard_B2s"},
                "storageProfile": {"osDisk": {"osType": "Linux", "diskSizeGB": 30}},
                "instanceView": {"statuses": [
                    {"code": "ProvisioningState/succeeded", "time": "2023-04-01T10:00:00Z"},
                    {"code": "PowerState/running", "displayStatus": "VM running"}
                ]}
            }
        }"#;
        let vm: VirtualMachine = serde_json::from_str(json).unwrap();
        assert_eq!(vm.power_state(), Some("running"));
        assert_eq!(vm.vm_size(), Some("Standard_B2s"));
        assert_eq!(vm.resource_group().as_deref(), Some("web-rg"));
        let disk = vm.properties.unwrap().storage_profile.unwrap().os_disk.unwrap();
        assert_eq!(disk.disk_size_gb, Some(30));
    }

    #[test]
    fn resize_body() {
        let json = serde_json::to_string(&VirtualMachineUpdate::resize("Standard_D4s_v5")).unwrap();
        assert_eq!(json, r#"{"properties":{"hardwareProfile":{"vmSize":"Standard_D4s_v5"}}}"#);
    }

    #[test]
    fn os_profile_debug_hides_password() {
        let p = OsProfile {
            admin_password: Some("P@ssw0rd!".into()),
            ..Default::default()
        };
        assert!(!format!("{p:?}").contains("P@ssw0rd!"));
    }

    #[test]
    fn empty_accepts_any_object() {
        let _: Empty = serde_json::from_str(r#"{"status":"Succeeded","id":"x"}"#).unwrap();
        let _: Empty = serde_json::from_str("{}").unwrap();
    }

    #[test]
    fn system_data_timestamps() {
        let raw = r#"{"createdBy":"me","createdAt":"2024-01-02T03:04:05Z"}"#;
        let sd: SystemData = serde_json::from_str(raw).unwrap();
        assert_eq!(sd.created_by.as_deref(), Some("me"));
        assert!(sd.created_at.is_some());
        assert!(sd.last_modified_at.is_none());
    }
}
