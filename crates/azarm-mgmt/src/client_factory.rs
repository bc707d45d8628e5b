//! One place to validate configuration and mint resource clients.

use std::sync::Arc;

use log::debug;

use azarm_core::{ArmClient, ArmResult, ClientOptions, TokenCredential, Transport};

use crate::locks::ManagementLocksClient;
use crate::resource_groups::ResourceGroupsClient;
use crate::virtual_machines::VirtualMachinesClient;
use crate::{require_subscription, MODULE};

/// Holds the subscription id and a validated [`ArmClient`]; every client it
/// creates shares that client's pipeline. Construction fails on an empty
/// subscription id or invalid options, so the accessors cannot.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    internal: ArmClient,
    subscription_id: String,
}

impl ClientFactory {
    pub fn new(
        subscription_id: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
        options: &ClientOptions,
    ) -> ArmResult<Self> {
        let subscription_id = require_subscription(subscription_id.into())?;
        let internal = ArmClient::new(MODULE, credential, options)?;
        debug!("client factory for subscription {} at {}", subscription_id, internal.endpoint());
        Ok(Self {
            internal,
            subscription_id,
        })
    }

    /// Same checks as [`Self::new`], over a caller-supplied transport.
    pub fn with_transport(
        subscription_id: impl Into<String>,
        transport: Arc<dyn Transport>,
        options: &ClientOptions,
    ) -> ArmResult<Self> {
        let subscription_id = require_subscription(subscription_id.into())?;
        let internal = ArmClient::with_transport(transport, options)?;
        Ok(Self {
            internal,
            subscription_id,
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn resource_groups_client(&self) -> ResourceGroupsClient {
        ResourceGroupsClient::from_client(self.internal.clone(), self.subscription_id.clone())
    }

    pub fn management_locks_client(&self) -> ManagementLocksClient {
        ManagementLocksClient::from_client(self.internal.clone(), self.subscription_id.clone())
    }

    pub fn virtual_machines_client(&self) -> VirtualMachinesClient {
        VirtualMachinesClient::from_client(self.internal.clone(), self.subscription_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azarm_core::fake::{FakeResponse, FakeTransport};
    use azarm_core::{Context, ErrorKind, StaticTokenCredential};
    use serde_json::json;

    #[test]
    fn rejects_empty_subscription() {
        let cred: Arc<dyn TokenCredential> = Arc::new(StaticTokenCredential::new("t"));
        let e = ClientFactory::new("", cred, &ClientOptions::default()).unwrap_err();
        assert_eq!(e.kind, ErrorKind::Configuration);
        assert!(e.message.contains("subscriptionId"));
    }

    #[test]
    fn rejects_bad_options() {
        let fake: Arc<dyn Transport> = Arc::new(FakeTransport::new());
        let opts = ClientOptions::new().with_endpoint("not a url");
        let e = ClientFactory::with_transport("sub1", fake, &opts).unwrap_err();
        assert_eq!(e.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn clients_share_transport_and_subscription() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(204),
            FakeResponse::new(200).json(&json!({"value": []})),
        ]));
        let factory =
            ClientFactory::with_transport("sub1", fake.clone(), &ClientOptions::default()).unwrap();
        let ctx = Context::new();
        assert!(factory.resource_groups_client().check_existence("rg1", &ctx).await.unwrap());
        factory
            .management_locks_client()
            .list_at_subscription_level_pager(None)
            .unwrap()
            .collect_all(&ctx)
            .await
            .unwrap();
        assert_eq!(factory.virtual_machines_client().subscription_id(), "sub1");

        let reqs = fake.requests();
        assert_eq!(reqs.len(), 2);
        assert!(reqs.iter().all(|r| r.url().path().starts_with("/subscriptions/sub1/")));
    }

    #[test]
    fn new_uses_default_pipeline() {
        let cred: Arc<dyn TokenCredential> = Arc::new(StaticTokenCredential::new("t"));
        let factory = ClientFactory::new("sub1", cred, &ClientOptions::default()).unwrap();
        assert_eq!(factory.subscription_id(), "sub1");
    }
}
