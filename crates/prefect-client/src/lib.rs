//! MyFord Mobile Client Library
//!
//! Async client for the MyFord Mobile remote vehicle API: log in, read each
//! vehicle's energy report, and send remote start / lock / unlock commands.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use prefect_client::{ClientConfig, CredentialSource, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = Arc::new(Session::new(&ClientConfig::new("service-key"))?);
//!     session
//!         .authenticate(&CredentialSource::file("myfordmobile.json"))
//!         .await?;
//!
//!     for mut vehicle in session.list_vehicles().await? {
//!         vehicle.refresh().await?;
//!         println!("{} at {} km", vehicle.vin(), vehicle.snapshot().odometer);
//!         vehicle.lock().await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Active Vehicle
//!
//! The vendor keeps a single "active vehicle" per session token on the server
//! and applies commands to it. [`Vehicle`] commands always re-select their own
//! VIN right before the command, and [`Session`] holds a guard across that
//! pair so concurrent commands sharing a session cannot interleave. Processes
//! sharing one token are outside that guard; give each its own login.
//!
//! # Testing
//!
//! [`transport::mock::MockTransport`] records calls for unit tests, and the
//! `testing` module serves a fake vendor over HTTP:
//!
//! ```rust,ignore
//! use prefect_client::testing::{FakeVendor, TestServer};
//!
//! let vendor = FakeVendor::new();
//! let server = TestServer::start(vendor.router()).await?;
//! let session = server.session("service-key")?;
//! ```

pub mod config;
mod error;
mod session;
pub mod testing;
pub mod transport;
mod types;
mod vehicle;

pub use config::{ClientConfig, CredentialSource, Credentials};
pub use error::{PrefectError, Result};
pub use session::{Session, SessionState};
pub use transport::{Endpoint, HttpTransport, Transport, TransportError};
pub use types::*;
pub use vehicle::Vehicle;
