use sea_orm::entity::prelude::*;
use tenant_directory_sdk::{TenantId, TenantIdentity};

/// Global tenant table. Not tenant-scoped: it is read before any tenant is
/// bound and written only by the tenant lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub domain: String,
    pub name: String,
    pub email: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for TenantIdentity {
    fn from(m: Model) -> Self {
        Self {
            id: TenantId::new(m.id),
            domain: m.domain,
            name: m.name,
            email: m.email,
        }
    }
}
