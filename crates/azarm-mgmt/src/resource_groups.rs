//! Azure Resource Groups – check existence, create/update, get, update,
//! delete, export template, list.

use std::sync::Arc;

use log::debug;

use azarm_core::{
    ArmClient, ArmResult, ClientOptions, Context, FinalStateVia, ListResult, OperationSpec,
    PathTemplate, Pager, Poller, TokenCredential, Verb,
};

use crate::models::{
    Empty, ExportTemplateRequest, ResourceGroup, ResourceGroupExportResult, ResourceGroupPatchable,
};
use crate::{require_subscription, MODULE};

pub const API_VERSION: &str = "2021-04-01";

const RESOURCE_GROUP: &str = "/subscriptions/{subscriptionId}/resourcegroups/{resourceGroupName}";

const CHECK_EXISTENCE: OperationSpec = OperationSpec::new(
    "ResourceGroupsClient.CheckExistence",
    Verb::Head,
    RESOURCE_GROUP,
    API_VERSION,
    &[204, 404],
);
const CREATE_OR_UPDATE: OperationSpec = OperationSpec::new(
    "ResourceGroupsClient.CreateOrUpdate",
    Verb::Put,
    RESOURCE_GROUP,
    API_VERSION,
    &[200, 201],
);
const GET: OperationSpec =
    OperationSpec::new("ResourceGroupsClient.Get", Verb::Get, RESOURCE_GROUP, API_VERSION, &[200]);
const UPDATE: OperationSpec = OperationSpec::new(
    "ResourceGroupsClient.Update",
    Verb::Patch,
    RESOURCE_GROUP,
    API_VERSION,
    &[200],
);
const DELETE: OperationSpec = OperationSpec::new(
    "ResourceGroupsClient.BeginDelete",
    Verb::Delete,
    RESOURCE_GROUP,
    API_VERSION,
    &[200, 202],
);
const EXPORT_TEMPLATE: OperationSpec = OperationSpec::new(
    "ResourceGroupsClient.BeginExportTemplate",
    Verb::Post,
    "/subscriptions/{subscriptionId}/resourcegroups/{resourceGroupName}/exportTemplate",
    API_VERSION,
    &[200, 202],
)
.with_final_state_via(FinalStateVia::Location);
const LIST: OperationSpec = OperationSpec::new(
    "ResourceGroupsClient.NewListPager",
    Verb::Get,
    "/subscriptions/{subscriptionId}/resourcegroups",
    API_VERSION,
    &[200],
);

#[derive(Debug, Clone, Default)]
pub struct ResourceGroupsBeginDeleteOptions {
    /// e.g. `Microsoft.Compute/virtualMachines,Microsoft.Compute/virtualMachineScaleSets`.
    pub force_deletion_types: Option<String>,
    pub resume_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceGroupsBeginExportTemplateOptions {
    pub resume_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceGroupsListOptions {
    /// OData filter, e.g. `tagName eq 'env' and tagValue eq 'prod'`.
    pub filter: Option<String>,
    pub top: Option<i32>,
}

/// Client for `Microsoft.Resources/resourceGroups` in one subscription.
#[derive(Debug, Clone)]
pub struct ResourceGroupsClient {
    internal: ArmClient,
    subscription_id: String,
}

impl ResourceGroupsClient {
    pub fn new(
        subscription_id: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
        options: &ClientOptions,
    ) -> ArmResult<Self> {
        let subscription_id = require_subscription(subscription_id.into())?;
        let internal = ArmClient::new(MODULE, credential, options)?;
        Ok(Self::from_client(internal, subscription_id))
    }

    /// Wrap an already-validated internal client.
    pub(crate) fn from_client(internal: ArmClient, subscription_id: String) -> Self {
        Self {
            internal,
            subscription_id,
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn path<'a>(&'a self, op: &OperationSpec, resource_group_name: &'a str) -> PathTemplate<'a> {
        PathTemplate::new(op.path)
            .param("subscriptionId", &self.subscription_id)
            .param("resourceGroupName", resource_group_name)
    }

    /// `true` on `204`, `false` on `404`.
    pub async fn check_existence(
        &self,
        resource_group_name: &str,
        ctx: &Context,
    ) -> ArmResult<bool> {
        let req = self
            .internal
            .request(&CHECK_EXISTENCE, self.path(&CHECK_EXISTENCE, resource_group_name))?
            .accept(None)
            .build()?;
        self.internal.exists(&CHECK_EXISTENCE, req, ctx).await
    }

    pub async fn create_or_update(
        &self,
        resource_group_name: &str,
        parameters: &ResourceGroup,
        ctx: &Context,
    ) -> ArmResult<ResourceGroup> {
        let req = self
            .internal
            .request(&CREATE_OR_UPDATE, self.path(&CREATE_OR_UPDATE, resource_group_name))?
            .json(parameters)
            .build()?;
        self.internal.send(&CREATE_OR_UPDATE, req, ctx).await
    }

    pub async fn get(&self, resource_group_name: &str, ctx: &Context) -> ArmResult<ResourceGroup> {
        let req = self.internal.request(&GET, self.path(&GET, resource_group_name))?.build()?;
        self.internal.send(&GET, req, ctx).await
    }

    /// PATCH; only the fields set in `parameters` change.
    pub async fn update(
        &self,
        resource_group_name: &str,
        parameters: &ResourceGroupPatchable,
        ctx: &Context,
    ) -> ArmResult<ResourceGroup> {
        let req = self
            .internal
            .request(&UPDATE, self.path(&UPDATE, resource_group_name))?
            .json(parameters)
            .build()?;
        self.internal.send(&UPDATE, req, ctx).await
    }

    /// Delete the group and everything in it.
    pub async fn begin_delete(
        &self,
        resource_group_name: &str,
        options: Option<&ResourceGroupsBeginDeleteOptions>,
        ctx: &Context,
    ) -> ArmResult<Poller<Empty>> {
        let options = options.cloned().unwrap_or_default();
        if let Some(token) = options.resume_token.as_deref() {
            return self.internal.resume(&DELETE, token);
        }
        debug!("begin_delete({})", resource_group_name);
        let req = self
            .internal
            .request(&DELETE, self.path(&DELETE, resource_group_name))?
            .query_opt("forceDeletionTypes", options.force_deletion_types)
            .build()?;
        self.internal.begin(&DELETE, req, ctx).await
    }

    /// Capture the group as an ARM template. The result is read from the
    /// `Location` URL once the operation finishes.
    pub async fn begin_export_template(
        &self,
        resource_group_name: &str,
        parameters: &ExportTemplateRequest,
        options: Option<&ResourceGroupsBeginExportTemplateOptions>,
        ctx: &Context,
    ) -> ArmResult<Poller<ResourceGroupExportResult>> {
        if let Some(token) = options.and_then(|o| o.resume_token.as_deref()) {
            return self.internal.resume(&EXPORT_TEMPLATE, token);
        }
        let req = self
            .internal
            .request(&EXPORT_TEMPLATE, self.path(&EXPORT_TEMPLATE, resource_group_name))?
            .json(parameters)
            .build()?;
        self.internal.begin(&EXPORT_TEMPLATE, req, ctx).await
    }

    /// All resource groups in the subscription.
    pub fn list_pager(
        &self,
        options: Option<&ResourceGroupsListOptions>,
    ) -> ArmResult<Pager<ListResult<ResourceGroup>>> {
        let options = options.cloned().unwrap_or_default();
        let path = PathTemplate::new(LIST.path).param("subscriptionId", &self.subscription_id);
        let req = self
            .internal
            .request(&LIST, path)?
            .query_opt("$filter", options.filter)
            .query_opt("$top", options.top)
            .build()?;
        Ok(self.internal.pager(&LIST, req))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
