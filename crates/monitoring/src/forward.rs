use std::{error::Error as StdError, fmt, str::FromStr, time::Duration};

use eyre::Result;
use reqwest::{
    Client as HttpClient, StatusCode,
    header::{CONNECTION, HeaderMap, HeaderValue},
};
use serde_json::value::RawValue;
use tracing::{debug, warn};
use url::Url;

use crate::{
    context::Ctx,
    path::{PathError, StatusPath},
    response::Response,
};

/// Default timeout of a single forwarded request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default number of idle connections kept per host.
pub const DEFAULT_MAX_IDLE_PER_HOST: usize = 0x400;

/// How a non-200 answer from the monitoring service is reported.
///
/// Whichever format is picked applies to every non-200 status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemoteErrorFormat {
    /// `Storage Response: [HTTP <code>] <body>`
    #[default]
    WithStatus,
    /// The response body alone, or `[HTTP <code>]` when the body is empty.
    BodyOnly,
}

impl FromStr for RemoteErrorFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "with-status" => Ok(Self::WithStatus),
            "body-only" => Ok(Self::BodyOnly),
            other => Err(format!("expected `with-status` or `body-only`, got `{}`", other)),
        }
    }
}

/// Settings of the shared outbound client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Timeout covering connect, request and reading the body.
    pub timeout: Duration,
    /// Idle connections kept per host.
    pub max_idle_per_host: usize,
    /// Rendering of non-200 answers.
    pub error_format: RemoteErrorFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_idle_per_host: DEFAULT_MAX_IDLE_PER_HOST,
            error_format: RemoteErrorFormat::default(),
        }
    }
}

/// Reasons a forwarded call does not produce a result.
#[derive(Debug)]
enum ForwardError {
    Path(PathError),
    Transport(reqwest::Error),
    Remote { status: StatusCode, body: String, format: RemoteErrorFormat },
    BodyRead(reqwest::Error),
    InvalidJson(serde_json::Error),
}

impl fmt::Display for ForwardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(e) => write!(f, "{}", e),
            Self::Transport(e) => write!(f, "{}", ErrorChain(e)),
            Self::Remote { status, body, format: RemoteErrorFormat::WithStatus } => {
                write!(f, "Storage Response: [HTTP {}] {}", status.as_u16(), body)
            }
            Self::Remote { status, body, format: RemoteErrorFormat::BodyOnly } => {
                if body.is_empty() {
                    write!(f, "[HTTP {}]", status.as_u16())
                } else {
                    f.write_str(body)
                }
            }
            Self::BodyRead(e) => {
                write!(f, "failed to read status response body: {}", ErrorChain(e))
            }
            Self::InvalidJson(e) => write!(f, "invalid JSON in status response: {}", e),
        }
    }
}

/// Displays an error followed by each of its sources, separated by `: `.
struct ErrorChain<'a>(&'a (dyn StdError + 'static));

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {}", err)?;
            source = err.source();
        }
        Ok(())
    }
}

/// Shared client forwarding requests to the monitoring service.
///
/// Built once at startup and cloned into whatever needs it; clones share the
/// same connection pool.
#[derive(Debug, Clone)]
pub struct StatusClient {
    http: HttpClient,
    error_format: RemoteErrorFormat,
}

impl StatusClient {
    /// Build the shared client.
    ///
    /// Every request carries `Connection: close`, so no connection is reused
    /// across calls. Lots of short parallel calls otherwise pile up sockets in
    /// keep-alive until the local port range runs out.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        let http = HttpClient::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, error_format: config.error_format })
    }

    /// Issue a `GET` for `path` against the context's monitoring service and
    /// wrap the outcome in a [`Response`].
    pub async fn forward(&self, ctx: &Ctx, path: &StatusPath) -> Response {
        match self.fetch(ctx, path).await {
            Ok(result) => Response::ok(result),
            Err(e) => {
                warn!(base = %ctx.status_url(), %path, error = %e, "status request failed");
                Response::err(e.to_string())
            }
        }
    }

    async fn fetch(&self, ctx: &Ctx, path: &StatusPath) -> Result<Box<RawValue>, ForwardError> {
        let url: Url = path.to_url(ctx.status_url()).map_err(ForwardError::Path)?;
        debug!(%url, "forwarding status request");

        let resp = self.http.get(url).send().await.map_err(ForwardError::Transport)?;
        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("failed to read response body: {}", ErrorChain(&e)));
            return Err(ForwardError::Remote { status, body, format: self.error_format });
        }

        let body = resp.text().await.map_err(ForwardError::BodyRead)?;
        RawValue::from_string(body).map_err(ForwardError::InvalidJson)
    }
}
