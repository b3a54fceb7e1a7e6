use serde::Serialize;
use serde_json::value::RawValue;

/// Envelope returned by every operation.
///
/// Exactly one of `error` (non-empty) and `result` is populated. The
/// constructors are the only way to build one, which keeps that invariant.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    error: String,
    result: Option<Box<RawValue>>,
    /// Set when the parameter payload failed to decode and defaults were used.
    #[serde(skip_serializing_if = "Option::is_none")]
    params_error: Option<String>,
}

impl Response {
    /// Successful envelope carrying the remote JSON untouched.
    pub const fn ok(result: Box<RawValue>) -> Self {
        Self { error: String::new(), result: Some(result), params_error: None }
    }

    /// Failed envelope. An empty message is replaced so the envelope never
    /// ends up with neither field set.
    pub fn err(error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error.push_str("unknown error");
        }
        Self { error, result: None, params_error: None }
    }

    /// Attach a parameter decoding failure.
    #[must_use]
    pub fn with_params_error(mut self, params_error: Option<String>) -> Self {
        self.params_error = params_error;
        self
    }

    /// Error message, empty on success.
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Raw JSON result, if the call succeeded.
    pub fn result(&self) -> Option<&RawValue> {
        self.result.as_deref()
    }

    /// Decoding failure of the parameter payload, if any.
    pub fn params_error(&self) -> Option<&str> {
        self.params_error.as_deref()
    }
}
