use sea_orm::entity::prelude::*;
use tenant_db::TenantScopedEntity;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenant_site_configs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub tenant_id: i64,
    pub template_key: String,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub mv_url: Option<String>,
    pub mv_type: String,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TenantScopedEntity for Entity {
    fn tenant_col() -> Self::Column {
        Column::TenantId
    }
}
