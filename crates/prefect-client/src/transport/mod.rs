//! Transport layer for the vendor API
//!
//! Every vendor call is a JSON POST to one of four fixed endpoints. The
//! [`Transport`] trait abstracts how that POST happens:
//! - [`HttpTransport`] talks to the real service over `reqwest`
//! - [`mock::MockTransport`] records calls and replays scripted replies for tests

mod adapter;
pub mod error;
mod http;
pub mod mock;

pub use adapter::{Endpoint, Transport};
pub use error::TransportError;
pub use http::HttpTransport;
