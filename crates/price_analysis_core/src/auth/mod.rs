//! crates/price_analysis_core/src/auth/mod.rs
//!
//! The token lifecycle: session ownership, single-flight refresh and the
//! request interceptor that applies both to every API call.

pub mod session;
pub mod transport;

#[cfg(test)]
mod fakes;

pub use session::SessionManager;
pub use transport::AuthenticatedTransport;
