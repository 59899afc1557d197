pub mod entity;
pub mod migrations;
pub mod sea_orm_store;
pub mod site_config_rows;
pub mod tenant_rows;

pub use sea_orm_store::SeaOrmTenantStore;
