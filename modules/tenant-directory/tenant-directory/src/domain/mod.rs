pub mod error;
pub mod local_client;
pub mod notifier;
pub mod registry;
pub mod repo;
pub mod service;
pub mod site_config;
