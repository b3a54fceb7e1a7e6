use std::{collections::BTreeMap, fmt};

use tracing::warn;

use crate::{
    context::Ctx,
    forward::StatusClient,
    params::{MachineParams, ParamsError, SysinfoParams, decode},
    path::StatusPath,
    response::Response,
};

/// Operations proxied to the monitoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    /// List the UUIDs of all known machines.
    GetMachines,
    /// System status samples (uptime, CPU, memory, disks, load) of one machine.
    GetSysinfo,
    /// Network interfaces of one machine.
    GetNetinfo,
    /// Planners and their services running on one machine.
    GetPlanners,
}

impl Operation {
    /// Every operation, in registration order.
    pub const ALL: [Self; 4] =
        [Self::GetMachines, Self::GetSysinfo, Self::GetNetinfo, Self::GetPlanners];

    /// Name the operation is registered under.
    pub const fn name(self) -> &'static str {
        match self {
            Self::GetMachines => "get_machines",
            Self::GetSysinfo => "get_sysinfo",
            Self::GetNetinfo => "get_netinfo",
            Self::GetPlanners => "get_planners",
        }
    }

    /// Outbound path for `raw` parameters, with the decoding failures of
    /// every field that fell back to its default.
    pub fn path(self, raw: &[u8]) -> (StatusPath, Option<ParamsError>) {
        let route = StatusPath::new(self.name());
        match self {
            Self::GetMachines => (route, None),
            Self::GetSysinfo => {
                let (params, err) = decode::<SysinfoParams>(raw);
                (route.segment(params.machine_uuid).segment(params.limit), err)
            }
            Self::GetNetinfo | Self::GetPlanners => {
                let (params, err) = decode::<MachineParams>(raw);
                (route.segment(params.machine_uuid), err)
            }
        }
    }

    /// Run the operation: decode `raw`, forward, and return the envelope.
    pub async fn call(self, client: &StatusClient, ctx: &Ctx, raw: &[u8]) -> Response {
        let (path, params_err) = self.path(raw);
        if let Some(e) = &params_err {
            warn!(operation = self.name(), error = %e, "invalid parameters, using defaults");
        }
        client.forward(ctx, &path).await.with_params_error(params_err.map(|e| e.to_string()))
    }
}

/// Error returned when dispatching an unregistered operation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperation(pub String);

impl fmt::Display for UnknownOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operation: {}", self.0)
    }
}

impl std::error::Error for UnknownOperation {}

/// Route table: operation name to handler.
pub type Routes = BTreeMap<&'static str, Operation>;

/// Build the route table. Always returns the same set of operations.
pub fn get_routes() -> Routes {
    Operation::ALL.into_iter().map(|op| (op.name(), op)).collect()
}

/// Route table bound to the shared outbound client.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Routes,
    client: StatusClient,
}

impl Router {
    /// Create a router forwarding through `client`.
    pub fn new(client: StatusClient) -> Self {
        Self { routes: get_routes(), client }
    }

    /// Registered operation names, sorted.
    pub fn operations(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.keys().copied()
    }

    /// Look up the handler registered under `name`.
    pub fn route(&self, name: &str) -> Result<Operation, UnknownOperation> {
        self.routes.get(name).copied().ok_or_else(|| UnknownOperation(name.to_owned()))
    }

    /// Dispatch `name` with `raw` parameters.
    pub async fn dispatch(
        &self,
        ctx: &Ctx,
        name: &str,
        raw: &[u8],
    ) -> Result<Response, UnknownOperation> {
        let op = self.route(name)?;
        Ok(op.call(&self.client, ctx, raw).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::forward::{ClientConfig, RemoteErrorFormat};
    use futures::future::join_all;
    use mockito::Server;
    use serde_json::value::RawValue;
    use url::Url;

    fn router(error_format: RemoteErrorFormat) -> Router {
        let config = ClientConfig { error_format, ..Default::default() };
        Router::new(StatusClient::new(&config).unwrap())
    }

    fn ctx(url: &str) -> Ctx {
        Ctx::new(Url::parse(url).unwrap())
    }

    #[test]
    fn routes_are_fixed_and_unique() {
        let routes = get_routes();
        let names: Vec<_> = routes.keys().copied().collect();
        assert_eq!(names, ["get_machines", "get_netinfo", "get_planners", "get_sysinfo"]);
        assert_eq!(routes.len(), Operation::ALL.len());
        assert_eq!(get_routes(), routes);
        for (name, op) in &routes {
            assert_eq!(op.name(), *name);
        }
    }

    #[test]
    fn router_resolves_registered_names_only() {
        let router = router(RemoteErrorFormat::WithStatus);
        for op in Operation::ALL {
            assert_eq!(router.route(op.name()), Ok(op));
        }
        let err = router.route("get_logs").unwrap_err();
        assert_eq!(err, UnknownOperation("get_logs".to_owned()));
        assert_eq!(err.to_string(), "unknown operation: get_logs");
    }

    #[test]
    fn sysinfo_path() {
        let (path, err) = Operation::GetSysinfo.path(br#"{"MachineUuid":"abc-123","Limit":42}"#);
        assert!(err.is_none());
        assert_eq!(path.to_string(), "/status/get_sysinfo/abc-123/42");
    }

    #[test]
    fn machine_paths() {
        let raw = br#"{"MachineUuid":"abc-123"}"#;
        assert_eq!(Operation::GetNetinfo.path(raw).0.to_string(), "/status/get_netinfo/abc-123");
        assert_eq!(Operation::GetPlanners.path(raw).0.to_string(), "/status/get_planners/abc-123");
    }

    #[test]
    fn machines_ignores_payload() {
        let (path, err) = Operation::GetMachines.path(b"not json at all");
        assert!(err.is_none());
        assert_eq!(path.to_string(), "/status/get_machines");
    }

    #[test]
    fn bad_field_keeps_the_rest_of_the_path() {
        let (path, err) = Operation::GetSysinfo.path(br#"{"MachineUuid":"abc","Limit":"5"}"#);
        assert!(err.is_some());
        assert_eq!(path.to_string(), "/status/get_sysinfo/abc/0");

        let (path, err) = Operation::GetNetinfo.path(br#"{"machineuuid":"abc"}"#);
        assert!(err.is_none());
        assert_eq!(path.to_string(), "/status/get_netinfo/abc");
    }

    #[test]
    fn malformed_payload_falls_back_to_defaults() {
        let (path, err) = Operation::GetSysinfo.path(b"{oops");
        assert!(err.is_some());
        assert_eq!(path.to_string(), "/status/get_sysinfo//0");
    }

    #[tokio::test]
    async fn sysinfo_relays_result() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/status/get_sysinfo/abc-123/42")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let raw = br#"{"MachineUuid":"abc-123","Limit":42}"#;
        let resp = router(RemoteErrorFormat::WithStatus)
            .dispatch(&ctx(&server.url()), "get_sysinfo", raw)
            .await
            .unwrap();

        assert_eq!(resp.error(), "");
        assert_eq!(resp.result().map(RawValue::get), Some(r#"{"ok":true}"#));
        assert!(resp.params_error().is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn decode_failure_is_reported_next_to_the_outcome() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/status/get_netinfo/")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let resp = router(RemoteErrorFormat::BodyOnly)
            .dispatch(&ctx(&server.url()), "get_netinfo", b"")
            .await
            .unwrap();

        assert_eq!(resp.error(), "not found");
        assert!(resp.params_error().is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_operation_is_not_dispatched() {
        let resp = router(RemoteErrorFormat::WithStatus)
            .dispatch(&ctx("http://127.0.0.1:9"), "get_logs", b"{}")
            .await;
        assert_eq!(resp.unwrap_err(), UnknownOperation("get_logs".to_owned()));
    }

    #[tokio::test]
    async fn every_route_returns_an_envelope() {
        let router = router(RemoteErrorFormat::WithStatus);
        let ctx = ctx("http://127.0.0.1:9");
        let names: Vec<_> = router.operations().collect();
        for name in names {
            let resp = router.dispatch(&ctx, name, b"{}").await.unwrap();
            assert_ne!(resp.result().is_some(), !resp.error().is_empty(), "{}: {:?}", name, resp);
        }
    }

    #[tokio::test]
    async fn concurrent_calls_keep_their_own_results() {
        let mut server = Server::new_async().await;
        let mut mocks = Vec::new();
        for i in 0..50 {
            let mock = server
                .mock("GET", format!("/status/get_sysinfo/machine-{}/{}", i, i).as_str())
                .with_status(200)
                .with_body(format!(r#"{{"machine":{}}}"#, i))
                .expect(1)
                .create_async()
                .await;
            mocks.push(mock);
        }

        let router = router(RemoteErrorFormat::WithStatus);
        let ctx = ctx(&server.url());
        let calls = (0..50).map(|i| {
            let router = &router;
            let ctx = &ctx;
            async move {
                let raw = format!(r#"{{"MachineUuid":"machine-{}","Limit":{}}}"#, i, i);
                (i, router.dispatch(ctx, "get_sysinfo", raw.as_bytes()).await.unwrap())
            }
        });

        for (i, resp) in join_all(calls).await {
            assert_eq!(resp.error(), "");
            let expected = format!(r#"{{"machine":{}}}"#, i);
            assert_eq!(resp.result().map(RawValue::get), Some(expected.as_str()));
        }
        for mock in mocks {
            mock.assert_async().await;
        }
    }
}
