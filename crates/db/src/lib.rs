pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod service;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{seed_demo, SeedSummary};
pub use service::{HiringService, NewUser, TransitionReport};
