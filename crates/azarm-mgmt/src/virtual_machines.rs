//! Azure Virtual Machines – get, instance view, create/update, delete,
//! power actions (start, power off, restart, deallocate), list.

use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;

use azarm_core::{
    ArmClient, ArmResult, ClientOptions, Context, ListResult, OperationSpec, PathTemplate, Pager,
    Poller, RequestBuilder, TokenCredential, Verb,
};

use crate::models::{
    Empty, InstanceViewTypes, VirtualMachine, VirtualMachineInstanceView, VirtualMachineUpdate,
};
use crate::{require_subscription, MODULE};

pub const API_VERSION: &str = "2023-03-01";

macro_rules! vm_op {
    ($name:literal, $verb:expr, $suffix:literal, [$($status:literal),+]) => {
        OperationSpec::new(
            concat!("VirtualMachinesClient.", $name),
            $verb,
            concat!(
                "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Compute/virtualMachines/{vmName}",
                $suffix
            ),
            API_VERSION,
            &[$($status),+],
        )
    };
}

const GET: OperationSpec = vm_op!("Get", Verb::Get, "", [200]);
const INSTANCE_VIEW: OperationSpec = vm_op!("InstanceView", Verb::Get, "/instanceView", [200]);
const CREATE_OR_UPDATE: OperationSpec = vm_op!("BeginCreateOrUpdate", Verb::Put, "", [200, 201]);
const UPDATE: OperationSpec = vm_op!("BeginUpdate", Verb::Patch, "", [200]);
const DELETE: OperationSpec = vm_op!("BeginDelete", Verb::Delete, "", [200, 202, 204]);
const START: OperationSpec = vm_op!("BeginStart", Verb::Post, "/start", [200, 202]);
const POWER_OFF: OperationSpec = vm_op!("BeginPowerOff", Verb::Post, "/powerOff", [200, 202]);
const RESTART: OperationSpec = vm_op!("BeginRestart", Verb::Post, "/restart", [200, 202]);
const DEALLOCATE: OperationSpec = vm_op!("BeginDeallocate", Verb::Post, "/deallocate", [200, 202]);
const LIST: OperationSpec = OperationSpec::new(
    "VirtualMachinesClient.NewListPager",
    Verb::Get,
    "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Compute/virtualMachines",
    API_VERSION,
    &[200],
);
const LIST_ALL: OperationSpec = OperationSpec::new(
    "VirtualMachinesClient.NewListAllPager",
    Verb::Get,
    "/subscriptions/{subscriptionId}/providers/Microsoft.Compute/virtualMachines",
    API_VERSION,
    &[200],
);

// ── Options ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct VirtualMachinesGetOptions {
    pub expand: Option<InstanceViewTypes>,
}

/// Options shared by the long-running operations without extra parameters.
#[derive(Debug, Clone, Default)]
pub struct VirtualMachinesBeginOptions {
    pub resume_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VirtualMachinesBeginDeleteOptions {
    /// Preview: skip graceful shutdown and delete immediately.
    pub force_deletion: Option<bool>,
    pub resume_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VirtualMachinesBeginPowerOffOptions {
    /// `true` stops the VM without notifying the guest OS.
    pub skip_shutdown: Option<bool>,
    pub resume_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VirtualMachinesListAllOptions {
    /// `true` returns only the power state of each VM.
    pub status_only: Option<bool>,
    pub filter: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct VirtualMachinesClient {
    internal: ArmClient,
    subscription_id: String,
}

impl VirtualMachinesClient {
    pub fn new(
        subscription_id: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
        options: &ClientOptions,
    ) -> ArmResult<Self> {
        let subscription_id = require_subscription(subscription_id.into())?;
        let internal = ArmClient::new(MODULE, credential, options)?;
        Ok(Self::from_client(internal, subscription_id))
    }

    pub(crate) fn from_client(internal: ArmClient, subscription_id: String) -> Self {
        Self {
            internal,
            subscription_id,
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn vm_request(
        &self,
        op: &OperationSpec,
        resource_group_name: &str,
        vm_name: &str,
    ) -> ArmResult<RequestBuilder> {
        let path = PathTemplate::new(op.path)
            .param("subscriptionId", &self.subscription_id)
            .param("resourceGroupName", resource_group_name)
            .param("vmName", vm_name);
        self.internal.request(op, path)
    }

    /// Send the initiating request unless a resume token was supplied.
    async fn begin_or_resume<T: DeserializeOwned>(
        &self,
        op: &OperationSpec,
        resume_token: Option<&str>,
        request: impl FnOnce() -> ArmResult<RequestBuilder>,
        ctx: &Context,
    ) -> ArmResult<Poller<T>> {
        if let Some(token) = resume_token {
            return self.internal.resume(op, token);
        }
        let req = request()?.build()?;
        self.internal.begin(op, req, ctx).await
    }

    pub async fn get(
        &self,
        resource_group_name: &str,
        vm_name: &str,
        options: Option<&VirtualMachinesGetOptions>,
        ctx: &Context,
    ) -> ArmResult<VirtualMachine> {
        let req = self
            .vm_request(&GET, resource_group_name, vm_name)?
            .query_opt("$expand", options.and_then(|o| o.expand))
            .build()?;
        self.internal.send(&GET, req, ctx).await
    }

    /// Runtime status: power state, agent, disks.
    pub async fn instance_view(
        &self,
        resource_group_name: &str,
        vm_name: &str,
        ctx: &Context,
    ) -> ArmResult<VirtualMachineInstanceView> {
        let req = self.vm_request(&INSTANCE_VIEW, resource_group_name, vm_name)?.build()?;
        self.internal.send(&INSTANCE_VIEW, req, ctx).await
    }

    pub async fn begin_create_or_update(
        &self,
        resource_group_name: &str,
        vm_name: &str,
        parameters: &VirtualMachine,
        options: Option<&VirtualMachinesBeginOptions>,
        ctx: &Context,
    ) -> ArmResult<Poller<VirtualMachine>> {
        let token = options.and_then(|o| o.resume_token.as_deref());
        self.begin_or_resume(
            &CREATE_OR_UPDATE,
            token,
            || {
                let req = self.vm_request(&CREATE_OR_UPDATE, resource_group_name, vm_name)?;
                Ok(req.json(parameters))
            },
            ctx,
        )
        .await
    }

    pub async fn begin_update(
        &self,
        resource_group_name: &str,
        vm_name: &str,
        parameters: &VirtualMachineUpdate,
        options: Option<&VirtualMachinesBeginOptions>,
        ctx: &Context,
    ) -> ArmResult<Poller<VirtualMachine>> {
        let token = options.and_then(|o| o.resume_token.as_deref());
        self.begin_or_resume(
            &UPDATE,
            token,
            || Ok(self.vm_request(&UPDATE, resource_group_name, vm_name)?.json(parameters)),
            ctx,
        )
        .await
    }

    pub async fn begin_delete(
        &self,
        resource_group_name: &str,
        vm_name: &str,
        options: Option<&VirtualMachinesBeginDeleteOptions>,
        ctx: &Context,
    ) -> ArmResult<Poller<Empty>> {
        let options = options.cloned().unwrap_or_default();
        if options.force_deletion == Some(true) {
            debug!("begin_delete({}/{}) with forceDeletion", resource_group_name, vm_name);
        }
        self.begin_or_resume(
            &DELETE,
            options.resume_token.as_deref(),
            || {
                Ok(self
                    .vm_request(&DELETE, resource_group_name, vm_name)?
                    .query_opt("forceDeletion", options.force_deletion))
            },
            ctx,
        )
        .await
    }

    pub async fn begin_start(
        &self,
        resource_group_name: &str,
        vm_name: &str,
        options: Option<&VirtualMachinesBeginOptions>,
        ctx: &Context,
    ) -> ArmResult<Poller<Empty>> {
        self.power_action(&START, resource_group_name, vm_name, options, ctx).await
    }

    pub async fn begin_power_off(
        &self,
        resource_group_name: &str,
        vm_name: &str,
        options: Option<&VirtualMachinesBeginPowerOffOptions>,
        ctx: &Context,
    ) -> ArmResult<Poller<Empty>> {
        let options = options.cloned().unwrap_or_default();
        self.begin_or_resume(
            &POWER_OFF,
            options.resume_token.as_deref(),
            || {
                Ok(self
                    .vm_request(&POWER_OFF, resource_group_name, vm_name)?
                    .query_opt("skipShutdown", options.skip_shutdown))
            },
            ctx,
        )
        .await
    }

    pub async fn begin_restart(
        &self,
        resource_group_name: &str,
        vm_name: &str,
        options: Option<&VirtualMachinesBeginOptions>,
        ctx: &Context,
    ) -> ArmResult<Poller<Empty>> {
        self.power_action(&RESTART, resource_group_name, vm_name, options, ctx).await
    }

    /// Stop and release compute resources; billing for the VM stops.
    pub async fn begin_deallocate(
        &self,
        resource_group_name: &str,
        vm_name: &str,
        options: Option<&VirtualMachinesBeginOptions>,
        ctx: &Context,
    ) -> ArmResult<Poller<Empty>> {
        self.power_action(&DEALLOCATE, resource_group_name, vm_name, options, ctx).await
    }

    async fn power_action(
        &self,
        op: &OperationSpec,
        resource_group_name: &str,
        vm_name: &str,
        options: Option<&VirtualMachinesBeginOptions>,
        ctx: &Context,
    ) -> ArmResult<Poller<Empty>> {
        let token = options.and_then(|o| o.resume_token.as_deref());
        self.begin_or_resume(op, token, || self.vm_request(op, resource_group_name, vm_name), ctx)
            .await
    }

    /// VMs in one resource group.
    pub fn list_pager(
        &self,
        resource_group_name: &str,
    ) -> ArmResult<Pager<ListResult<VirtualMachine>>> {
        let path = PathTemplate::new(LIST.path)
            .param("subscriptionId", &self.subscription_id)
            .param("resourceGroupName", resource_group_name);
        let req = self.internal.request(&LIST, path)?.build()?;
        Ok(self.internal.pager(&LIST, req))
    }

    /// VMs across the whole subscription.
    pub fn list_all_pager(
        &self,
        options: Option<&VirtualMachinesListAllOptions>,
    ) -> ArmResult<Pager<ListResult<VirtualMachine>>> {
        let options = options.cloned().unwrap_or_default();
        let path = PathTemplate::new(LIST_ALL.path).param("subscriptionId", &self.subscription_id);
        let req = self
            .internal
            .request(&LIST_ALL, path)?
            .query_opt("statusOnly", options.status_only)
            .query_opt("$filter", options.filter)
            .build()?;
        Ok(self.internal.pager(&LIST_ALL, req))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HardwareProfile, VirtualMachineProperties};
    use azarm_core::fake::{FakeResponse, FakeTransport};
    use azarm_core::{ErrorKind, OperationStatus};
    use futures::StreamExt;
    use serde_json::json;
    use std::time::Duration;

    const VM_URL: &str =
        "https://management.azure.com/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Compute/virtualMachines/vm1";
    const MONITOR: &str =
        "https://management.azure.com/subscriptions/sub1/providers/Microsoft.Compute/locations/eastus/operations/op1";

    fn client(fake: &Arc<FakeTransport>) -> VirtualMachinesClient {
        let internal = ArmClient::with_transport(fake.clone(), &ClientOptions::default()).unwrap();
        VirtualMachinesClient::from_client(internal, "sub1".into())
    }

    fn vm_json(name: &str, state: &str) -> serde_json::Value {
        json!({
            "id": format!("/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Compute/virtualMachines/{name}"),
            "name": name,
            "location": "eastus",
            "properties": {
                "provisioningState": state,
                "hardwareProfile": {"vmSize": "Standard_B2s"}
            }
        })
    }

    #[tokio::test]
    async fn get_with_expand() {
        let fake = Arc::new(FakeTransport::with_responses([FakeResponse::new(200).json(&json!({
            "name": "vm1",
            "properties": {"instanceView": {"statuses": [{"code": "PowerState/deallocated"}]}}
        }))]));
        let opts = VirtualMachinesGetOptions {
            expand: Some(InstanceViewTypes::InstanceView),
        };
        let vm = client(&fake).get("rg1", "vm1", Some(&opts), &Context::new()).await.unwrap();
        assert_eq!(vm.power_state(), Some("deallocated"));
        let req = &fake.requests()[0];
        assert_eq!(req.url().path(), VM_URL.trim_start_matches("https://management.azure.com"));
        assert_eq!(req.query_param("$expand").as_deref(), Some("instanceView"));
        assert_eq!(req.query_param("api-version").as_deref(), Some("2023-03-01"));
    }

    #[tokio::test]
    async fn instance_view_path() {
        let fake = Arc::new(FakeTransport::with_responses([FakeResponse::new(200).json(&json!({
            "statuses": [{"code": "PowerState/running"}]
        }))]));
        let view = client(&fake).instance_view("rg1", "vm1", &Context::new()).await.unwrap();
        assert_eq!(view.power_state(), Some("running"));
        assert_eq!(
            fake.requests()[0].url().as_str(),
            format!("{VM_URL}/instanceView?api-version=2023-03-01")
        );
    }

    #[tokio::test]
    async fn empty_vm_name_is_rejected() {
        let fake = Arc::new(FakeTransport::new());
        let e = client(&fake)
            .begin_start("rg1", "", None, &Context::new())
            .await
            .unwrap_err();
        assert_eq!(e.kind, ErrorKind::RequestBuild);
        assert_eq!(fake.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn create_polls_async_operation_then_reads_resource() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(201)
                .header("Azure-AsyncOperation", MONITOR)
                .json(&vm_json("vm1", "Creating")),
            FakeResponse::new(200).json(&json!({"status": "InProgress"})),
            FakeResponse::new(200).json(&json!({"status": "Succeeded"})),
            FakeResponse::new(200).json(&vm_json("vm1", "Succeeded")),
        ]));
        let c = client(&fake);
        let ctx = Context::new();
        let body = VirtualMachine {
            location: Some("eastus".into()),
            properties: Some(VirtualMachineProperties {
                hardware_profile: Some(HardwareProfile {
                    vm_size: Some("Standard_B2s".into()),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut poller = c.begin_create_or_update("rg1", "vm1", &body, None, &ctx).await.unwrap();
        let vm = poller.poll_until_done(&ctx, Duration::from_secs(5)).await.unwrap();
        assert_eq!(vm.properties.unwrap().provisioning_state.as_deref(), Some("Succeeded"));

        let reqs = fake.requests();
        assert_eq!(reqs.len(), 4);
        assert_eq!(reqs[1].url().as_str(), MONITOR);
        assert_eq!(reqs[3].url().as_str(), format!("{VM_URL}?api-version=2023-03-01"));
    }

    #[tokio::test]
    async fn update_completes_synchronously() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(200).json(&vm_json("vm1", "Succeeded"))
        ]));
        let c = client(&fake);
        let ctx = Context::new();
        let resize = VirtualMachineUpdate::resize("Standard_D2s_v5");
        let poller = c.begin_update("rg1", "vm1", &resize, None, &ctx).await.unwrap();
        assert!(poller.done());
        assert_eq!(poller.result(&ctx).await.unwrap().vm_size(), Some("Standard_B2s"));
        assert_eq!(fake.requests()[0].method().as_str(), "PATCH");
    }

    #[tokio::test]
    async fn delete_204_is_done() {
        let fake = Arc::new(FakeTransport::with_responses([FakeResponse::new(204)]));
        let opts = VirtualMachinesBeginDeleteOptions {
            force_deletion: Some(true),
            ..Default::default()
        };
        let poller = client(&fake)
            .begin_delete("rg1", "vm1", Some(&opts), &Context::new())
            .await
            .unwrap();
        assert_eq!(poller.status(), OperationStatus::Succeeded);
        assert_eq!(fake.requests()[0].query_param("forceDeletion").as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn power_off_resume_round_trip() {
        let fake = Arc::new(FakeTransport::with_responses([FakeResponse::new(202)
            .header("Azure-AsyncOperation", MONITOR)
            .header("Location", MONITOR)]));
        let c = client(&fake);
        let ctx = Context::new();
        let opts = VirtualMachinesBeginPowerOffOptions {
            skip_shutdown: Some(false),
            ..Default::default()
        };
        let poller = c.begin_power_off("rg1", "vm1", Some(&opts), &ctx).await.unwrap();
        assert_eq!(fake.requests()[0].query_param("skipShutdown").as_deref(), Some("false"));
        assert!(fake.requests()[0].url().path().ends_with("/vm1/powerOff"));
        let token = poller.resume_token().unwrap();

        fake.push(FakeResponse::new(200).json(&json!({"status": "Succeeded"})));
        fake.push(FakeResponse::new(200));
        let resume = VirtualMachinesBeginPowerOffOptions {
            resume_token: Some(token.clone()),
            ..Default::default()
        };
        let mut resumed = c.begin_power_off("rg1", "vm1", Some(&resume), &ctx).await.unwrap();
        assert_eq!(fake.request_count(), 1);
        assert_eq!(resumed.poll(&ctx).await.unwrap(), OperationStatus::Succeeded);
        resumed.result(&ctx).await.unwrap();

        // A token for one operation cannot resume another.
        let wrong = VirtualMachinesBeginOptions {
            resume_token: Some(token),
        };
        let e = c.begin_restart("rg1", "vm1", Some(&wrong), &ctx).await.unwrap_err();
        assert_eq!(e.kind, ErrorKind::Poller);
    }

    #[tokio::test]
    async fn failed_power_action_reports_service_error() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(202).header("Azure-AsyncOperation", MONITOR),
            FakeResponse::new(200).json(&json!({
                "status": "Failed",
                "error": {"code": "OperationNotAllowed", "message": "VM is deallocated"}
            })),
        ]));
        let c = client(&fake);
        let ctx = Context::new();
        let mut poller = c.begin_restart("rg1", "vm1", None, &ctx).await.unwrap();
        assert_eq!(poller.poll(&ctx).await.unwrap(), OperationStatus::Failed);
        let e = poller.result(&ctx).await.unwrap_err();
        assert_eq!(e.kind, ErrorKind::Api);
    }

    #[tokio::test]
    async fn list_all_streams_pages() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(200).json(&json!({
                "value": [vm_json("a", "Succeeded")],
                "nextLink": "https://management.azure.com/subscriptions/sub1/providers/Microsoft.Compute/virtualMachines?%24skiptoken=p2"
            })),
            FakeResponse::new(200).json(&json!({"value": [vm_json("b", "Succeeded")]})),
        ]));
        let c = client(&fake);
        let opts = VirtualMachinesListAllOptions {
            status_only: Some(true),
            ..Default::default()
        };
        let pages: Vec<_> = c
            .list_all_pager(Some(&opts))
            .unwrap()
            .into_stream(Context::new())
            .collect()
            .await;
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(Result::is_ok));
        let reqs = fake.requests();
        assert_eq!(reqs[0].query_param("statusOnly").as_deref(), Some("true"));
        // The nextLink lacked api-version; the pager appends the first request's.
        assert_eq!(reqs[1].query_param("api-version").as_deref(), Some("2023-03-01"));
        assert_eq!(reqs[1].query_param("$skiptoken").as_deref(), Some("p2"));
    }

    #[tokio::test]
    async fn list_in_group() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(200).json(&json!({"value": []}))
        ]));
        let c = client(&fake);
        let vms = c.list_pager("rg1").unwrap().collect_all(&Context::new()).await.unwrap();
        assert!(vms.is_empty());
        assert!(c.list_pager("").is_err());
    }
}
