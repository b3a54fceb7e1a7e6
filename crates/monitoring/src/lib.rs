//! Forwarding router for the remote monitoring service.
//!
//! Every operation decodes a small parameter object, turns it into a path
//! under `/status/` and forwards a `GET` to the monitoring service through a
//! shared [`StatusClient`]. Whatever happens, the caller receives a
//! [`Response`] envelope holding either the raw JSON result or an error string.
#![allow(clippy::uninlined_format_args)]

/// Context handed to every call
pub mod context;
/// Shared outbound client and the forward primitive
pub mod forward;
/// Parameter objects for each operation
pub mod params;
/// Typed, percent-encoded request paths
pub mod path;
/// Response envelope
pub mod response;
/// Route table and dispatch
pub mod routes;

pub use context::Ctx;
pub use forward::{
    ClientConfig, DEFAULT_MAX_IDLE_PER_HOST, DEFAULT_TIMEOUT, RemoteErrorFormat, StatusClient,
};
pub use params::ParamsError;
pub use path::StatusPath;
pub use response::Response;
pub use routes::{Operation, Router, Routes, UnknownOperation, get_routes};
