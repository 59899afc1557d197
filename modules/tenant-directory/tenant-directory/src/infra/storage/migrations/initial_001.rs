use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tenants::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tenants::Domain).string_len(253).not_null().unique_key())
                    .col(ColumnDef::new(Tenants::Name).string().not_null())
                    .col(ColumnDef::new(Tenants::Email).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TenantSiteConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TenantSiteConfigs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TenantSiteConfigs::TenantId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(TenantSiteConfigs::TemplateKey)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(TenantSiteConfigs::LogoUrl).string_len(500))
                    .col(ColumnDef::new(TenantSiteConfigs::BannerUrl).string_len(500))
                    .col(ColumnDef::new(TenantSiteConfigs::MvUrl).string_len(500))
                    .col(ColumnDef::new(TenantSiteConfigs::MvType).string_len(20).not_null())
                    .col(ColumnDef::new(TenantSiteConfigs::Description).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_site_configs_tenant")
                            .from(TenantSiteConfigs::Table, TenantSiteConfigs::TenantId)
                            .to(Tenants::Table, Tenants::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TenantSiteConfigs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tenants::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
    Domain,
    Name,
    Email,
}

#[derive(DeriveIden)]
enum TenantSiteConfigs {
    Table,
    Id,
    TenantId,
    TemplateKey,
    LogoUrl,
    BannerUrl,
    MvUrl,
    MvType,
    Description,
}
