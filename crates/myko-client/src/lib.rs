//! Async HTTP client for the Myko device cloud.
//!
//! The crate is layered bottom-up:
//!
//! - [`session`]: a pooled HTTP connection with an explicit open/close lifecycle
//! - [`executor`]: sends request descriptors with bounded retry and backoff
//! - [`normalize`]: turns response bodies into JSON, HTML trees, or raw bytes
//! - [`client`]: the facade tying them together, plus typed [`api`] accessors
//!
//! # Example
//!
//! ```no_run
//! use myko_client::{MykoClient, RequestDescriptor, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = MykoClient::builder()
//!     .base_url("https://api2.afero.net/v1")
//!     .credentials("user@example.com", "secret")
//!     .build()?;
//!
//! let active = client.activate()?;
//!
//! for device in active.devices().list().await? {
//!     println!("{} ({})", device.friendly_name, device.device_class);
//! }
//!
//! // Any endpoint, normalized by content type
//! let body = active.fetch(&RequestDescriptor::get("users/me").build()).await?;
//! println!("got {}", body.kind());
//!
//! active.deactivate();
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod executor;
pub mod html;
pub mod normalize;
pub mod request;
pub mod response;
pub mod session;
pub mod types;

pub use auth::{AuthConfig, Credentials, Token};
pub use client::{ActiveClient, ClientBuilder, DEFAULT_BASE_URL, MykoClient};
pub use error::{Error, Result};
pub use executor::{Executor, RetryPolicy};
pub use html::{Element, ElementQuery, HtmlDocument, HtmlNode};
pub use normalize::{Normalized, normalize};
pub use request::{RequestBody, RequestBuilder, RequestDescriptor};
pub use response::RawResponse;
pub use session::{Session, SessionConfig, Transport};
pub use types::*;
