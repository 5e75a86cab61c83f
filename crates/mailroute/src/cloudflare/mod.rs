//! Cloudflare REST API gateway for zones and email routing rules.

pub mod client;
pub mod error;
pub mod types;

pub use client::{CloudflareGateway, CreatedRule, CLOUDFLARE_API_BASE, ZONES_PER_PAGE};
pub use error::GatewayError;
pub use types::Zone;
