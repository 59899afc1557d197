#![allow(dead_code)]

use sea_orm::ConnectionTrait;
use tenant_db::{DbConfig, TenantDb};

pub mod note {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "notes")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub tenant_id: i64,
        pub body: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl tenant_db::TenantScopedEntity for Entity {
        fn tenant_col() -> Self::Column {
            Column::TenantId
        }
    }
}

pub async fn notes_db() -> TenantDb {
    let db = TenantDb::connect(&DbConfig {
        url: "sqlite::memory:".to_owned(),
        max_conns: Some(1),
        ..Default::default()
    })
    .await
    .unwrap();
    db.conn()
        .execute_unprepared(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, tenant_id BIGINT NOT NULL, body TEXT NOT NULL)",
        )
        .await
        .unwrap();
    db
}
