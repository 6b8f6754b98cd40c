//! Text artifacts rendered from organization accounts

pub mod profile_config;

pub use profile_config::{render_profile_config, ProfileConfigContext};
