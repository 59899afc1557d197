use std::marker::PhantomData;

use sea_orm::sea_query::IntoCondition;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use tenant_context::{ScopeGuard, TenantId};

use crate::entity::TenantScopedEntity;
use crate::error::ScopeError;

/// Typestate marker: query has not yet been scoped.
/// Cannot execute queries in this state.
#[derive(Debug, Clone, Copy)]
pub struct Unscoped;

/// Typestate marker: the tenant predicate is part of the query.
#[derive(Debug, Clone, Copy)]
pub struct Scoped;

/// A `SeaORM` `Select` that can only run once it carries the tenant predicate.
///
/// ```rust,ignore
/// let rows = site_config::Entity::find()
///     .secure()
///     .scope_current()?   // fails closed outside ScopeGuard
///     .all(conn)
///     .await?;
/// ```
#[must_use]
#[derive(Clone, Debug)]
pub struct SecureSelect<E: EntityTrait, S> {
    inner: sea_orm::Select<E>,
    tenant: Option<TenantId>,
    _state: PhantomData<S>,
}

pub trait SecureEntityExt<E: EntityTrait>: Sized {
    /// Wrap the query; `.scope_current()` must be called before execution.
    fn secure(self) -> SecureSelect<E, Unscoped>;
}

impl<E: EntityTrait> SecureEntityExt<E> for sea_orm::Select<E> {
    fn secure(self) -> SecureSelect<E, Unscoped> {
        SecureSelect {
            inner: self,
            tenant: None,
            _state: PhantomData,
        }
    }
}

impl<E> SecureSelect<E, Unscoped>
where
    E: TenantScopedEntity,
{
    /// Apply `tenant_col = <active filter>`.
    ///
    /// # Errors
    /// `ScopeError::Tenancy` when no tenant is bound or no scope is active.
    pub fn scope_current(self) -> Result<SecureSelect<E, Scoped>, ScopeError> {
        let tenant = ScopeGuard::active_filter()?;
        Ok(SecureSelect {
            inner: self.inner.filter(E::tenant_col().eq(tenant.get())),
            tenant: Some(tenant),
            _state: PhantomData,
        })
    }
}

impl<E> SecureSelect<E, Scoped>
where
    E: EntityTrait,
{
    /// Tenant this query is confined to.
    #[must_use]
    pub fn tenant(&self) -> Option<TenantId> {
        self.tenant
    }

    /// Further narrow the query. The tenant predicate stays in place.
    pub fn filter(mut self, cond: impl IntoCondition) -> Self {
        self.inner = QueryFilter::filter(self.inner, cond);
        self
    }

    pub fn order_by<C>(mut self, col: C, order: sea_orm::Order) -> Self
    where
        C: sea_orm::IntoSimpleExpr,
    {
        self.inner = QueryOrder::order_by(self.inner, col, order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.inner = QuerySelect::limit(self.inner, limit);
        self
    }

    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn all<C>(self, conn: &C) -> Result<Vec<E::Model>, ScopeError>
    where
        C: ConnectionTrait,
    {
        Ok(self.inner.all(conn).await?)
    }

    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn one<C>(self, conn: &C) -> Result<Option<E::Model>, ScopeError>
    where
        C: ConnectionTrait,
    {
        Ok(self.inner.one(conn).await?)
    }

    /// # Errors
    /// Returns `ScopeError::Db` if the database query fails.
    pub async fn count<C>(self, conn: &C) -> Result<u64, ScopeError>
    where
        C: ConnectionTrait,
        E::Model: FromQueryResult + Send + Sync,
    {
        Ok(self.inner.count(conn).await?)
    }

    /// Escape hatch for joins or projections. The tenant predicate is
    /// already applied; do not strip it.
    #[must_use]
    pub fn into_inner(self) -> sea_orm::Select<E> {
        self.inner
    }
}
