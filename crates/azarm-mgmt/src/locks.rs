//! Management locks at resource-group and subscription level, plus
//! scope-addressed reads for any resource id.

use std::sync::Arc;

use azarm_core::{
    ArmClient, ArmResult, ClientOptions, Context, ListResult, OperationSpec, PathTemplate, Pager,
    TokenCredential, Verb,
};

use crate::models::ManagementLockObject;
use crate::{require_subscription, MODULE};

pub const API_VERSION: &str = "2016-09-01";

const GROUP_LOCK: &str =
    "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Authorization/locks/{lockName}";
const SCOPE_LOCK: &str = "/{scope}/providers/Microsoft.Authorization/locks/{lockName}";

const CREATE_OR_UPDATE_AT_RESOURCE_GROUP_LEVEL: OperationSpec = OperationSpec::new(
    "ManagementLocksClient.CreateOrUpdateAtResourceGroupLevel",
    Verb::Put,
    GROUP_LOCK,
    API_VERSION,
    &[200, 201],
);
const DELETE_AT_RESOURCE_GROUP_LEVEL: OperationSpec = OperationSpec::new(
    "ManagementLocksClient.DeleteAtResourceGroupLevel",
    Verb::Delete,
    GROUP_LOCK,
    API_VERSION,
    &[200, 204],
);
const GET_AT_RESOURCE_GROUP_LEVEL: OperationSpec = OperationSpec::new(
    "ManagementLocksClient.GetAtResourceGroupLevel",
    Verb::Get,
    GROUP_LOCK,
    API_VERSION,
    &[200],
);
const LIST_AT_RESOURCE_GROUP_LEVEL: OperationSpec = OperationSpec::new(
    "ManagementLocksClient.NewListAtResourceGroupLevelPager",
    Verb::Get,
    "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Authorization/locks",
    API_VERSION,
    &[200],
);
const GET_BY_SCOPE: OperationSpec = OperationSpec::new(
    "ManagementLocksClient.GetByScope",
    Verb::Get,
    SCOPE_LOCK,
    API_VERSION,
    &[200],
);
const LIST_BY_SCOPE: OperationSpec = OperationSpec::new(
    "ManagementLocksClient.NewListByScopePager",
    Verb::Get,
    "/{scope}/providers/Microsoft.Authorization/locks",
    API_VERSION,
    &[200],
);
const LIST_AT_SUBSCRIPTION_LEVEL: OperationSpec = OperationSpec::new(
    "ManagementLocksClient.NewListAtSubscriptionLevelPager",
    Verb::Get,
    "/subscriptions/{subscriptionId}/providers/Microsoft.Authorization/locks",
    API_VERSION,
    &[200],
);

#[derive(Debug, Clone, Default)]
pub struct ManagementLocksListOptions {
    /// e.g. `atScope()`.
    pub filter: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ManagementLocksClient {
    internal: ArmClient,
    subscription_id: String,
}

impl ManagementLocksClient {
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

    fn lock_path<'a>(
        &'a self,
        op: &OperationSpec,
        resource_group_name: &'a str,
        lock_name: &'a str,
    ) -> PathTemplate<'a> {
        PathTemplate::new(op.path)
            .param("subscriptionId", &self.subscription_id)
            .param("resourceGroupName", resource_group_name)
            .param("lockName", lock_name)
    }

    pub async fn create_or_update_at_resource_group_level(
        &self,
        resource_group_name: &str,
        lock_name: &str,
        parameters: &ManagementLockObject,
        ctx: &Context,
    ) -> ArmResult<ManagementLockObject> {
        let op = &CREATE_OR_UPDATE_AT_RESOURCE_GROUP_LEVEL;
        let req = self
            .internal
            .request(op, self.lock_path(op, resource_group_name, lock_name))?
            .json(parameters)
            .build()?;
        self.internal.send(op, req, ctx).await
    }

    /// `200` and `204` both count as deleted.
    pub async fn delete_at_resource_group_level(
        &self,
        resource_group_name: &str,
        lock_name: &str,
        ctx: &Context,
    ) -> ArmResult<()> {
        let op = &DELETE_AT_RESOURCE_GROUP_LEVEL;
        let req = self
            .internal
            .request(op, self.lock_path(op, resource_group_name, lock_name))?
            .build()?;
        self.internal.execute(op, req, ctx).await?;
        Ok(())
    }

    pub async fn get_at_resource_group_level(
        &self,
        resource_group_name: &str,
        lock_name: &str,
        ctx: &Context,
    ) -> ArmResult<ManagementLockObject> {
        let op = &GET_AT_RESOURCE_GROUP_LEVEL;
        let req = self
            .internal
            .request(op, self.lock_path(op, resource_group_name, lock_name))?
            .build()?;
        self.internal.send(op, req, ctx).await
    }

    pub fn list_at_resource_group_level_pager(
        &self,
        resource_group_name: &str,
        options: Option<&ManagementLocksListOptions>,
    ) -> ArmResult<Pager<ListResult<ManagementLockObject>>> {
        let op = &LIST_AT_RESOURCE_GROUP_LEVEL;
        let path = PathTemplate::new(op.path)
            .param("subscriptionId", &self.subscription_id)
            .param("resourceGroupName", resource_group_name);
        let req = self
            .internal
            .request(op, path)?
            .query_opt("$filter", options.and_then(|o| o.filter.as_deref()))
            .build()?;
        Ok(self.internal.pager(op, req))
    }

    pub fn list_at_subscription_level_pager(
        &self,
        options: Option<&ManagementLocksListOptions>,
    ) -> ArmResult<Pager<ListResult<ManagementLockObject>>> {
        let op = &LIST_AT_SUBSCRIPTION_LEVEL;
        let path = PathTemplate::new(op.path).param("subscriptionId", &self.subscription_id);
        let req = self
            .internal
            .request(op, path)?
            .query_opt("$filter", options.and_then(|o| o.filter.as_deref()))
            .build()?;
        Ok(self.internal.pager(op, req))
    }

    /// `scope` is a resource id such as
    /// `/subscriptions/{id}/resourceGroups/{rg}`; its slashes are kept.
    pub async fn get_by_scope(
        &self,
        scope: &str,
        lock_name: &str,
        ctx: &Context,
    ) -> ArmResult<ManagementLockObject> {
        let op = &GET_BY_SCOPE;
        let path = PathTemplate::new(op.path)
            .raw_param("scope", scope.trim_start_matches('/'))
            .param("lockName", lock_name);
        let req = self.internal.request(op, path)?.build()?;
        self.internal.send(op, req, ctx).await
    }

    pub fn list_by_scope_pager(
        &self,
        scope: &str,
        options: Option<&ManagementLocksListOptions>,
    ) -> ArmResult<Pager<ListResult<ManagementLockObject>>> {
        let op = &LIST_BY_SCOPE;
        let path = PathTemplate::new(op.path).raw_param("scope", scope.trim_start_matches('/'));
        let req = self
            .internal
            .request(op, path)?
            .query_opt("$filter", options.and_then(|o| o.filter.as_deref()))
            .build()?;
        Ok(self.internal.pager(op, req))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LockLevel;
    use azarm_core::fake::{FakeResponse, FakeTransport};
    use azarm_core::ErrorKind;
    use serde_json::json;

    fn client(fake: &Arc<FakeTransport>) -> ManagementLocksClient {
        let internal = ArmClient::with_transport(fake.clone(), &ClientOptions::default()).unwrap();
        ManagementLocksClient::from_client(internal, "sub1".into())
    }

    fn lock_json(name: &str, level: &str) -> serde_json::Value {
        json!({
            "id": format!("/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Authorization/locks/{name}"),
            "name": name,
            "type": "Microsoft.Authorization/locks",
            "properties": {"level": level, "notes": "do not remove"}
        })
    }

    #[tokio::test]
    async fn create_then_get() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(201).json(&lock_json("keep", "CanNotDelete")),
            FakeResponse::new(200).json(&lock_json("keep", "CanNotDelete")),
        ]));
        let c = client(&fake);
        let ctx = Context::new();
        let body = ManagementLockObject::new(LockLevel::CanNotDelete, Some("do not remove".into()));
        let created = c
            .create_or_update_at_resource_group_level("rg1", "keep", &body, &ctx)
            .await
            .unwrap();
        assert_eq!(created.level(), Some(LockLevel::CanNotDelete));
        let got = c.get_at_resource_group_level("rg1", "keep", &ctx).await.unwrap();
        assert_eq!(got.name.as_deref(), Some("keep"));

        let req = &fake.requests()[0];
        assert_eq!(
            req.url().as_str(),
            "https://management.azure.com/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Authorization/locks/keep?api-version=2016-09-01"
        );
    }

    #[tokio::test]
    async fn delete_accepts_200_and_204() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(200),
            FakeResponse::new(204),
            FakeResponse::new(409).json(&json!({"error": {"code": "ScopeLocked"}})),
        ]));
        let c = client(&fake);
        let ctx = Context::new();
        c.delete_at_resource_group_level("rg1", "keep", &ctx).await.unwrap();
        c.delete_at_resource_group_level("rg1", "keep", &ctx).await.unwrap();
        let e = c.delete_at_resource_group_level("rg1", "keep", &ctx).await.unwrap_err();
        assert_eq!(e.status_code, Some(409));
    }

    #[tokio::test]
    async fn empty_lock_name_is_rejected() {
        let fake = Arc::new(FakeTransport::new());
        let e = client(&fake)
            .get_at_resource_group_level("rg1", "", &Context::new())
            .await
            .unwrap_err();
        assert_eq!(e.kind, ErrorKind::RequestBuild);
        assert_eq!(fake.request_count(), 0);
    }

    #[tokio::test]
    async fn subscription_pager_applies_filter() {
        let fake = Arc::new(FakeTransport::with_responses([FakeResponse::new(200).json(&json!({
            "value": [lock_json("a", "ReadOnly"), lock_json("b", "CanNotDelete")]
        }))]));
        let c = client(&fake);
        let opts = ManagementLocksListOptions {
            filter: Some("atScope()".into()),
        };
        let mut pager = c.list_at_subscription_level_pager(Some(&opts)).unwrap();
        let page = pager.next_page(&Context::new()).await.unwrap();
        assert_eq!(page.value.len(), 2);
        assert!(!pager.more());
        let req = &fake.requests()[0];
        assert!(req
            .url()
            .path()
            .ends_with("/subscriptions/sub1/providers/Microsoft.Authorization/locks"));
        assert_eq!(req.query_param("$filter").as_deref(), Some("atScope()"));
    }

    #[tokio::test]
    async fn resource_group_pager() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(200).json(&json!({"value": []}))
        ]));
        let locks = client(&fake)
            .list_at_resource_group_level_pager("rg1", None)
            .unwrap()
            .collect_all(&Context::new())
            .await
            .unwrap();
        assert!(locks.is_empty());
        assert!(fake.requests()[0].query_param("$filter").is_none());
    }

    #[tokio::test]
    async fn scope_keeps_its_slashes() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(200).json(&lock_json("keep", "ReadOnly")),
            FakeResponse::new(200).json(&json!({"value": [lock_json("keep", "ReadOnly")]})),
        ]));
        let c = client(&fake);
        let ctx = Context::new();
        let scope = "/subscriptions/sub1/resourceGroups/rg1";
        let lock = c.get_by_scope(scope, "keep", &ctx).await.unwrap();
        assert_eq!(lock.level(), Some(LockLevel::ReadOnly));
        let all = c
            .list_by_scope_pager(scope, None)
            .unwrap()
            .collect_all(&ctx)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);

        let paths: Vec<String> = fake
            .requests()
            .iter()
            .map(|r| r.url().path().to_string())
            .collect();
        assert_eq!(
            paths,
            [
                "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Authorization/locks/keep",
                "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Authorization/locks",
            ]
        );
    }

    #[tokio::test]
    async fn empty_scope_is_rejected() {
        let fake = Arc::new(FakeTransport::new());
        let e = client(&fake).list_by_scope_pager("", None).unwrap_err();
        assert_eq!(e.kind, ErrorKind::RequestBuild);
        assert!(e.message.contains("scope cannot be empty"));
        assert_eq!(fake.request_count(), 0);
    }
}
