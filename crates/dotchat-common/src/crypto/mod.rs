//! TLS configuration utilities.

pub mod tls;
