/// Database configuration and connection management
pub mod database;

/// Server and branch-directory configuration from config.toml
pub mod settings;
