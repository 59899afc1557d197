pub mod site_config;
pub mod tenant;
