//! Row-level access to the global `tenants` table.
//!
//! Generic over the connection so the tenant lifecycle can run them inside
//! its transaction and the store can run them on the pool.

use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    ItemsAndPagesNumber, PaginatorTrait, QueryFilter, QueryOrder,
};
use tenant_directory_sdk::TenantId;

use super::entity::tenant;

pub async fn find_by_domain<C: ConnectionTrait>(
    conn: &C,
    domain: &str,
) -> Result<Option<tenant::Model>, DbErr> {
    tenant::Entity::find()
        .filter(tenant::Column::Domain.eq(domain))
        .one(conn)
        .await
}

pub async fn find_by_id<C: ConnectionTrait>(
    conn: &C,
    id: TenantId,
) -> Result<Option<tenant::Model>, DbErr> {
    tenant::Entity::find_by_id(id.get()).one(conn).await
}

pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    name: String,
    domain: String,
    email: String,
) -> Result<tenant::Model, DbErr> {
    tenant::ActiveModel {
        id: ActiveValue::NotSet,
        domain: ActiveValue::Set(domain),
        name: ActiveValue::Set(name),
        email: ActiveValue::Set(email),
    }
    .insert(conn)
    .await
}

pub async fn save<C: ConnectionTrait>(conn: &C, row: tenant::Model) -> Result<tenant::Model, DbErr> {
    tenant::ActiveModel {
        id: ActiveValue::Unchanged(row.id),
        domain: ActiveValue::Set(row.domain),
        name: ActiveValue::Set(row.name),
        email: ActiveValue::Set(row.email),
    }
    .update(conn)
    .await
}

pub async fn delete<C: ConnectionTrait>(conn: &C, id: TenantId) -> Result<u64, DbErr> {
    Ok(tenant::Entity::delete_by_id(id.get())
        .exec(conn)
        .await?
        .rows_affected)
}

/// One page (1-based) of tenants ordered by id, optionally narrowed to rows
/// whose name or domain contains `search`, ignoring case.
pub async fn page<C: ConnectionTrait>(
    conn: &C,
    search: Option<&str>,
    page: u64,
    per_page: u64,
) -> Result<(Vec<tenant::Model>, ItemsAndPagesNumber), DbErr> {
    let mut query = tenant::Entity::find().order_by_asc(tenant::Column::Id);
    if let Some(term) = search {
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        query = query.filter(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col(tenant::Column::Name)))
                        .like(LikeExpr::new(pattern.clone()).escape('\\')),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col(tenant::Column::Domain)))
                        .like(LikeExpr::new(pattern).escape('\\')),
                ),
        );
    }

    let paginator = query.paginate(conn, per_page);
    let totals = paginator.num_items_and_pages().await?;
    let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
    Ok((rows, totals))
}

pub async fn count<C: ConnectionTrait>(conn: &C) -> Result<u64, DbErr> {
    tenant::Entity::find().count(conn).await
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
