use url::Url;

/// Per-call context supplied by the dispatching layer.
///
/// Holds the base URL of the remote monitoring service. Operations only read
/// it; the owner decides how long it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ctx {
    status_url: Url,
}

impl Ctx {
    /// Create a context pointing at the monitoring service at `status_url`.
    pub const fn new(status_url: Url) -> Self {
        Self { status_url }
    }

    /// Base URL of the remote monitoring service.
    pub const fn status_url(&self) -> &Url {
        &self.status_url
    }
}
