//! The internal client every resource client is built on.
//!
//! Resource clients hold an [`ArmClient`] plus their subscription id and
//! describe their operations as [`OperationSpec`] constants; everything
//! else (request building, status checks, paging, polling) is generic.

use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;

use crate::credential::TokenCredential;
use crate::error::ArmResult;
use crate::http::{run_cancellable, Context, RawResponse, Request};
use crate::operation::OperationSpec;
use crate::options::ClientOptions;
use crate::pager::{Page, Pager};
use crate::pipeline::{HttpPipeline, ModuleInfo, Transport};
use crate::poller::{Poller, PollerOptions};
use crate::request::RequestBuilder;
use crate::response::{check_status, deserialize};
use crate::url_template::PathTemplate;

/// Endpoint, api-version override and transport shared by every operation.
#[derive(Clone)]
pub struct ArmClient {
    transport: Arc<dyn Transport>,
    endpoint: String,
    api_version: Option<String>,
}

impl ArmClient {
    /// Validate `options` and build the default bearer-token pipeline.
    pub fn new(
        module: ModuleInfo,
        credential: Arc<dyn TokenCredential>,
        options: &ClientOptions,
    ) -> ArmResult<Self> {
        let pipeline = HttpPipeline::new(module, credential, options)?;
        Self::with_transport(Arc::new(pipeline), options)
    }

    /// Use a caller-supplied transport (fakes, recording proxies, ...).
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        options: &ClientOptions,
    ) -> ArmResult<Self> {
        let endpoint = options.validate()?;
        Ok(Self {
            transport,
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
            api_version: options.api_version.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    /// The client-wide override if set, otherwise the operation's pinned version.
    pub fn api_version<'a>(&'a self, op: &'a OperationSpec) -> &'a str {
        self.api_version.as_deref().unwrap_or(op.api_version)
    }

    /// Build the path and start a request for `op`. Path parameters are
    /// validated here, before anything touches the network.
    pub fn request(&self, op: &OperationSpec, path: PathTemplate<'_>) -> ArmResult<RequestBuilder> {
        let path = path.build()?;
        let builder = RequestBuilder::new(op.verb.method(), self.endpoint.as_str(), path);
        Ok(builder.api_version(self.api_version(op)))
    }

    /// Send `request` and check the status against `op.accepted`.
    pub async fn execute(
        &self,
        op: &OperationSpec,
        request: Request,
        ctx: &Context,
    ) -> ArmResult<RawResponse> {
        debug!("{} → {} {}", op.name, request.method(), request.url());
        let resp = run_cancellable(ctx, self.transport.execute(request, ctx)).await?;
        check_status(resp, op.accepted)
    }

    pub async fn send<T: DeserializeOwned>(
        &self,
        op: &OperationSpec,
        request: Request,
        ctx: &Context,
    ) -> ArmResult<T> {
        let resp = self.execute(op, request, ctx).await?;
        deserialize(&resp)
    }

    /// HEAD-style existence check: a success status means present, `404` absent.
    pub async fn exists(
        &self,
        op: &OperationSpec,
        request: Request,
        ctx: &Context,
    ) -> ArmResult<bool> {
        let resp = self.execute(op, request, ctx).await?;
        Ok(resp.status().is_success())
    }

    pub fn pager<P: Page>(&self, op: &OperationSpec, request: Request) -> Pager<P> {
        debug!("{} → pager {}", op.name, request.url());
        Pager::new(self.transport.clone(), request, op.accepted).named(op.name)
    }

    /// Send the initiating request of a long-running operation.
    pub async fn begin<T: DeserializeOwned>(
        &self,
        op: &OperationSpec,
        request: Request,
        ctx: &Context,
    ) -> ArmResult<Poller<T>> {
        let resp = self.execute(op, request, ctx).await?;
        Poller::new(resp, self.transport.clone(), PollerOptions::from(op))
    }

    /// Rebuild a poller for `op` from a resume token; no request is sent.
    pub fn resume<T: DeserializeOwned>(
        &self,
        op: &OperationSpec,
        token: &str,
    ) -> ArmResult<Poller<T>> {
        debug!("{} → resume", op.name);
        Poller::from_resume_token(token, self.transport.clone(), PollerOptions::from(op))
    }
}

impl fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::StaticTokenCredential;
    use crate::error::ErrorKind;
    use crate::fake::{FakeResponse, FakeTransport};
    use crate::operation::Verb;
    use crate::pager::ListResult;
    use serde::Deserialize;
    use serde_json::json;

    const GET: OperationSpec = OperationSpec::new(
        "WidgetsClient.Get",
        Verb::Get,
        "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Example/widgets/{widgetName}",
        "2021-01-01",
        &[200],
    );

    const HEAD: OperationSpec = OperationSpec::new(
        "WidgetsClient.CheckExistence",
        Verb::Head,
        "/widgets/{widgetName}",
        "2021-01-01",
        &[204, 404],
    );

    #[derive(Debug, Deserialize)]
    struct Widget {
        name: String,
    }

    fn client(fake: &Arc<FakeTransport>) -> ArmClient {
        ArmClient::with_transport(fake.clone(), &ClientOptions::default()).unwrap()
    }

    fn get_path<'a>(rg: &'a str) -> PathTemplate<'a> {
        PathTemplate::new(GET.path)
            .param("subscriptionId", "sub")
            .param("resourceGroupName", rg)
            .param("widgetName", "w")
    }

    #[tokio::test]
    async fn send_builds_url_and_decodes() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(200).json(&json!({"name": "w"}))
        ]));
        let c = client(&fake);
        let req = c.request(&GET, get_path("rg")).unwrap().build().unwrap();
        let w: Widget = c.send(&GET, req, &Context::new()).await.unwrap();
        assert_eq!(w.name, "w");
        assert_eq!(
            fake.requests()[0].url().as_str(),
            "https://management.azure.com/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Example/widgets/w?api-version=2021-01-01"
        );
    }

    #[test]
    fn empty_parameter_fails_before_transport() {
        let fake = Arc::new(FakeTransport::new());
        let e = client(&fake).request(&GET, get_path("")).unwrap_err();
        assert_eq!(e.kind, ErrorKind::RequestBuild);
        assert_eq!(fake.request_count(), 0);
    }

    #[test]
    fn api_version_override() {
        let fake = Arc::new(FakeTransport::new());
        let options = ClientOptions::new().with_api_version("2099-01-01");
        let c = ArmClient::with_transport(fake, &options).unwrap();
        let req = c.request(&GET, get_path("rg")).unwrap().build().unwrap();
        assert_eq!(req.query_param("api-version").as_deref(), Some("2099-01-01"));
    }

    #[tokio::test]
    async fn exists_maps_204_and_404() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(204),
            FakeResponse::new(404),
            FakeResponse::new(403),
        ]));
        let c = client(&fake);
        let ctx = Context::new();
        let req = || {
            c.request(&HEAD, PathTemplate::new(HEAD.path).param("widgetName", "w"))
                .unwrap()
                .accept(None)
                .build()
                .unwrap()
        };
        assert!(c.exists(&HEAD, req(), &ctx).await.unwrap());
        assert!(!c.exists(&HEAD, req(), &ctx).await.unwrap());
        let e = c.exists(&HEAD, req(), &ctx).await.unwrap_err();
        assert_eq!(e.status_code, Some(403));
    }

    #[tokio::test]
    async fn pager_uses_operation_status_set() {
        let fake = Arc::new(FakeTransport::with_responses([
            FakeResponse::new(200).json(&json!({"value": [{"name": "a"}]}))
        ]));
        let c = client(&fake);
        let req = c.request(&GET, get_path("rg")).unwrap().build().unwrap();
        let items = c
            .pager::<ListResult<Widget>>(&GET, req)
            .collect_all(&Context::new())
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn new_validates_options() {
        let cred: Arc<dyn TokenCredential> = Arc::new(StaticTokenCredential::new("t"));
        let module = ModuleInfo::new("armexample", "0.1.0");
        let bad = ClientOptions::new().with_endpoint("::");
        let e = ArmClient::new(module, cred.clone(), &bad).unwrap_err();
        assert_eq!(e.kind, ErrorKind::Configuration);
        let c = ArmClient::new(module, cred, &ClientOptions::default()).unwrap();
        assert_eq!(c.endpoint(), "https://management.azure.com");
    }
}
