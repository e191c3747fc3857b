//! Developer tooling shipped alongside the service.

pub mod prepush;
