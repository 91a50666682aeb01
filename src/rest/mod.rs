/// Authenticated JSON-over-HTTPS client used by the provisioning calls
mod client;
mod http_client;
mod mock;

pub use client::*;
pub use http_client::{HttpRestClient, RestHeaders};
pub use mock::{MockRestClient, RecordedCall};
