//! # azarm-mgmt
//!
//! Resource clients built on [`azarm_core::ArmClient`]:
//!
//! * [`ResourceGroupsClient`] – `Microsoft.Resources/resourceGroups`
//! * [`ManagementLocksClient`] – `Microsoft.Authorization/locks`
//! * [`VirtualMachinesClient`] – `Microsoft.Compute/virtualMachines`
//!
//! [`ClientFactory`] validates configuration once and hands out clients that
//! share one pipeline.

pub mod client_factory;
pub mod locks;
pub mod models;
pub mod resource_groups;
pub mod virtual_machines;

pub use client_factory::ClientFactory;
pub use locks::ManagementLocksClient;
pub use resource_groups::ResourceGroupsClient;
pub use virtual_machines::VirtualMachinesClient;

use azarm_core::{ArmError, ArmResult, ModuleInfo};

/// Telemetry identity sent in the `User-Agent` of every request.
pub const MODULE: ModuleInfo = ModuleInfo::new("armmgmt", env!("CARGO_PKG_VERSION"));

pub(crate) fn require_subscription(subscription_id: String) -> ArmResult<String> {
    if subscription_id.is_empty() {
        return Err(ArmError::configuration("parameter subscriptionId cannot be empty"));
    }
    Ok(subscription_id)
}
