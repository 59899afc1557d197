use std::marker::PhantomData;

use sea_orm::sea_query::IntoCondition;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, Value,
};
use tenant_context::{ScopeGuard, TenantId};

use crate::entity::TenantScopedEntity;
use crate::error::ScopeError;
use crate::select::{Scoped, Unscoped};

/// Insert a row owned by the active tenant.
///
/// The tenant column is stamped from the active filter. A model that already
/// carries a different tenant is refused.
///
/// # Errors
/// - `ScopeError::Tenancy` outside an active scope
/// - `ScopeError::Denied` if the model names another tenant
/// - `ScopeError::Db` if the insert fails
pub async fn scoped_insert<E, C>(mut am: E::ActiveModel, conn: &C) -> Result<E::Model, ScopeError>
where
    E: TenantScopedEntity,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
    E::Model: IntoActiveModel<E::ActiveModel>,
    C: ConnectionTrait,
{
    let tenant = ScopeGuard::active_filter()?;
    stamp_tenant::<E>(&mut am, tenant)?;
    Ok(am.insert(conn).await?)
}

/// Update one row by primary key, but only if it belongs to the active tenant.
///
/// # Errors
/// - `ScopeError::Tenancy` outside an active scope
/// - `ScopeError::Denied` if the row is absent or owned by another tenant
/// - `ScopeError::Db` on other database failures
pub async fn scoped_update<E, C>(mut am: E::ActiveModel, conn: &C) -> Result<E::Model, ScopeError>
where
    E: TenantScopedEntity,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
    E::Model: IntoActiveModel<E::ActiveModel>,
    C: ConnectionTrait,
{
    let tenant = ScopeGuard::active_filter()?;
    stamp_tenant::<E>(&mut am, tenant)?;
    E::update(am)
        .filter(E::tenant_col().eq(tenant.get()))
        .exec(conn)
        .await
        .map_err(|e| match e {
            DbErr::RecordNotUpdated => {
                ScopeError::Denied("row not found or not visible to the active tenant")
            }
            other => ScopeError::Db(other),
        })
}

fn stamp_tenant<E>(am: &mut E::ActiveModel, tenant: TenantId) -> Result<(), ScopeError>
where
    E: TenantScopedEntity,
    E::ActiveModel: ActiveModelTrait<Entity = E>,
{
    let col = E::tenant_col();
    let expected = Value::from(tenant.get());
    if let Some(existing) = am.get(col).into_value()
        && existing != expected
    {
        tracing::error!(tenant.id = %tenant, "active model targets a foreign tenant");
        return Err(ScopeError::Denied("active model carries another tenant id"));
    }
    am.set(col, expected);
    Ok(())
}

/// Scoped counterpart of `SeaORM`'s `UpdateMany`.
#[must_use]
#[derive(Clone, Debug)]
pub struct SecureUpdateMany<E: EntityTrait, S> {
    inner: sea_orm::UpdateMany<E>,
    _state: PhantomData<S>,
}

pub trait SecureUpdateExt<E: EntityTrait>: Sized {
    fn secure(self) -> SecureUpdateMany<E, Unscoped>;
}

impl<E: EntityTrait> SecureUpdateExt<E> for sea_orm::UpdateMany<E> {
    fn secure(self) -> SecureUpdateMany<E, Unscoped> {
        SecureUpdateMany {
            inner: self,
            _state: PhantomData,
        }
    }
}

impl<E: TenantScopedEntity> SecureUpdateMany<E, Unscoped> {
    /// # Errors
    /// `ScopeError::Tenancy` when no scope is active.
    pub fn scope_current(self) -> Result<SecureUpdateMany<E, Scoped>, ScopeError> {
        let tenant = ScopeGuard::active_filter()?;
        Ok(SecureUpdateMany {
            inner: self.inner.filter(E::tenant_col().eq(tenant.get())),
            _state: PhantomData,
        })
    }
}

impl<E: EntityTrait> SecureUpdateMany<E, Scoped> {
    pub fn filter(mut self, cond: impl IntoCondition) -> Self {
        self.inner = QueryFilter::filter(self.inner, cond);
        self
    }

    /// # Errors
    /// Returns `ScopeError::Db` if the update fails.
    pub async fn exec<C: ConnectionTrait>(self, conn: &C) -> Result<u64, ScopeError> {
        Ok(self.inner.exec(conn).await?.rows_affected)
    }
}

/// Scoped counterpart of `SeaORM`'s `DeleteMany`.
#[must_use]
#[derive(Clone, Debug)]
pub struct SecureDeleteMany<E: EntityTrait, S> {
    inner: sea_orm::DeleteMany<E>,
    _state: PhantomData<S>,
}

pub trait SecureDeleteExt<E: EntityTrait>: Sized {
    fn secure(self) -> SecureDeleteMany<E, Unscoped>;
}

impl<E: EntityTrait> SecureDeleteExt<E> for sea_orm::DeleteMany<E> {
    fn secure(self) -> SecureDeleteMany<E, Unscoped> {
        SecureDeleteMany {
            inner: self,
            _state: PhantomData,
        }
    }
}

impl<E: TenantScopedEntity> SecureDeleteMany<E, Unscoped> {
    /// # Errors
    /// `ScopeError::Tenancy` when no scope is active.
    pub fn scope_current(self) -> Result<SecureDeleteMany<E, Scoped>, ScopeError> {
        let tenant = ScopeGuard::active_filter()?;
        Ok(SecureDeleteMany {
            inner: self.inner.filter(E::tenant_col().eq(tenant.get())),
            _state: PhantomData,
        })
    }
}

impl<E: EntityTrait> SecureDeleteMany<E, Scoped> {
    pub fn filter(mut self, cond: impl IntoCondition) -> Self {
        self.inner = QueryFilter::filter(self.inner, cond);
        self
    }

    /// # Errors
    /// Returns `ScopeError::Db` if the delete fails.
    pub async fn exec<C: ConnectionTrait>(self, conn: &C) -> Result<u64, ScopeError> {
        Ok(self.inner.exec(conn).await?.rows_affected)
    }
}
