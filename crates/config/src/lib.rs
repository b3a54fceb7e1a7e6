//! Status gateway configuration
use clap::Parser;
use monitoring::RemoteErrorFormat;
use url::Url;

/// Default host the HTTP surface binds to.
pub const DEFAULT_API_HOST: &str = "0.0.0.0";
/// Default port the HTTP surface binds to.
pub const DEFAULT_API_PORT: u16 = 3000;

/// Remote monitoring service configuration options
#[derive(Debug, Clone, Parser)]
pub struct StatusOpts {
    /// Base URL of the monitoring service
    #[clap(long, env = "STATUS_URL")]
    pub status_url: Url,
    /// Timeout of a single forwarded request in seconds
    #[clap(long, env = "STATUS_REQUEST_TIMEOUT_SECS", default_value = "5")]
    pub request_timeout_secs: u64,
    /// Idle connections kept per host
    #[clap(long, env = "STATUS_MAX_IDLE_PER_HOST", default_value = "1024")]
    pub max_idle_per_host: usize,
    /// How non-200 answers are reported to callers (`with-status` or `body-only`)
    #[clap(long, env = "STATUS_REMOTE_ERROR_FORMAT", default_value = "with-status")]
    pub remote_error_format: RemoteErrorFormat,
}

/// HTTP surface configuration options
#[derive(Debug, Clone, Parser)]
pub struct ApiOpts {
    /// Host to bind
    #[clap(long = "api-host", env = "API_HOST", default_value = DEFAULT_API_HOST)]
    pub host: String,
    /// Port to bind
    #[clap(long = "api-port", env = "API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub port: u16,
}

/// CLI options for the status gateway
#[derive(Debug, Clone, Parser)]
pub struct Opts {
    /// Monitoring service configuration
    #[clap(flatten)]
    pub status: StatusOpts,

    /// HTTP surface configuration
    #[clap(flatten)]
    pub api: ApiOpts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Opts::command().debug_assert()
    }

    #[test]
    fn defaults_apply() {
        let opts = Opts::try_parse_from(["status-gateway", "--status-url", "http://127.0.0.1:8016"])
            .unwrap();
        assert_eq!(opts.status.status_url.as_str(), "http://127.0.0.1:8016/");
        assert_eq!(opts.status.request_timeout_secs, 5);
        assert_eq!(opts.status.max_idle_per_host, 1024);
        assert_eq!(opts.status.remote_error_format, RemoteErrorFormat::WithStatus);
        assert_eq!(opts.api.host, DEFAULT_API_HOST);
        assert_eq!(opts.api.port, DEFAULT_API_PORT);
    }

    #[test]
    fn parses_body_only_format() {
        let opts = Opts::try_parse_from([
            "status-gateway",
            "--status-url",
            "http://monitor.local",
            "--remote-error-format",
            "body-only",
            "--api-port",
            "8080",
        ])
        .unwrap();
        assert_eq!(opts.status.remote_error_format, RemoteErrorFormat::BodyOnly);
        assert_eq!(opts.api.port, 8080);
    }

    #[test]
    fn rejects_unknown_error_format() {
        let args = [
            "status-gateway",
            "--status-url",
            "http://monitor.local",
            "--remote-error-format",
            "verbose",
        ];
        assert!(Opts::try_parse_from(args).is_err());
    }

    #[test]
    fn rejects_invalid_status_url() {
        assert!(Opts::try_parse_from(["status-gateway", "--status-url", "not a url"]).is_err());
    }
}
