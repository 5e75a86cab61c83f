//! HTTP handlers, organized by resource:
//! - `config`: Cloudflare credential read/save/reveal
//! - `zones`: zone listing
//! - `email_routing`: routing rule list/create/delete
//! - `health`: liveness probe

pub mod config;
pub mod email_routing;
pub mod health;
pub mod zones;
