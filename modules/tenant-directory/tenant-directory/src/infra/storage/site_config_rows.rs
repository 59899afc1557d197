//! Tenant-scoped access to `tenant_site_configs`.
//!
//! Every function needs an active tenant filter and touches only the rows of
//! that tenant.

use sea_orm::{ActiveValue, ConnectionTrait, EntityTrait};
use tenant_db::{ScopeError, SecureDeleteExt, SecureEntityExt, scoped_insert, scoped_update};

use super::entity::site_config;

pub const DEFAULT_TEMPLATE_KEY: &str = "default";
pub const DEFAULT_MV_TYPE: &str = "image";

fn default_row() -> site_config::ActiveModel {
    site_config::ActiveModel {
        id: ActiveValue::NotSet,
        tenant_id: ActiveValue::NotSet,
        template_key: ActiveValue::Set(DEFAULT_TEMPLATE_KEY.to_owned()),
        logo_url: ActiveValue::Set(None),
        banner_url: ActiveValue::Set(None),
        mv_url: ActiveValue::Set(None),
        mv_type: ActiveValue::Set(DEFAULT_MV_TYPE.to_owned()),
        description: ActiveValue::Set(None),
    }
}

pub async fn find_current<C: ConnectionTrait>(
    conn: &C,
) -> Result<Option<site_config::Model>, ScopeError> {
    site_config::Entity::find()
        .secure()
        .scope_current()?
        .one(conn)
        .await
}

pub async fn insert_default<C: ConnectionTrait>(conn: &C) -> Result<site_config::Model, ScopeError> {
    scoped_insert::<site_config::Entity, _>(default_row(), conn).await
}

/// Write back every content column of `row`.
pub async fn save_current<C: ConnectionTrait>(
    conn: &C,
    row: site_config::Model,
) -> Result<site_config::Model, ScopeError> {
    let am = site_config::ActiveModel {
        id: ActiveValue::Unchanged(row.id),
        tenant_id: ActiveValue::NotSet,
        template_key: ActiveValue::Set(row.template_key),
        logo_url: ActiveValue::Set(row.logo_url),
        banner_url: ActiveValue::Set(row.banner_url),
        mv_url: ActiveValue::Set(row.mv_url),
        mv_type: ActiveValue::Set(row.mv_type),
        description: ActiveValue::Set(row.description),
    };
    scoped_update::<site_config::Entity, _>(am, conn).await
}

pub async fn delete_current<C: ConnectionTrait>(conn: &C) -> Result<u64, ScopeError> {
    site_config::Entity::delete_many()
        .secure()
        .scope_current()?
        .exec(conn)
        .await
}
