use sea_orm::EntityTrait;

/// Entities whose rows belong to exactly one tenant.
///
/// The tenant column must hold the raw `TenantId` value (`BIGINT`). Entities
/// that are global (the tenant table itself, lookup tables) simply do not
/// implement this trait and therefore cannot be used with the scoped query
/// extensions.
///
/// ```rust,ignore
/// impl TenantScopedEntity for site_config::Entity {
///     fn tenant_col() -> Self::Column {
///         site_config::Column::TenantId
///     }
/// }
/// ```
pub trait TenantScopedEntity: EntityTrait {
    fn tenant_col() -> Self::Column;
}
