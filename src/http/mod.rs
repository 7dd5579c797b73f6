//! HTTP plumbing: client configuration, a configurable REST job vendor and
//! the webhook relay lookup.

pub mod config;
pub mod vendor;
pub mod webhook;

pub use config::{HttpConfig, HttpConfigBuilder};
pub use vendor::{HttpJobEndpoints, HttpJobVendor};
pub use webhook::WebhookRelay;
