use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_campaigns_table::Migration),
            Box::new(m20240301_000002_create_sales_table::Migration),
            Box::new(m20240301_000003_create_sale_items_table::Migration),
        ]
    }
}

mod m20240301_000001_create_campaigns_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_campaigns_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Campaigns::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Campaigns::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Campaigns::Name).string().not_null())
                        .col(ColumnDef::new(Campaigns::Kind).string().not_null())
                        .col(ColumnDef::new(Campaigns::BuyQuantity).integer().null())
                        .col(ColumnDef::new(Campaigns::PayQuantity).integer().null())
                        .col(ColumnDef::new(Campaigns::Percent).decimal().null())
                        .col(ColumnDef::new(Campaigns::Amount).decimal().null())
                        .col(
                            ColumnDef::new(Campaigns::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Campaigns::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(Campaigns::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Campaigns::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Campaigns::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_campaigns_name")
                        .table(Campaigns::Table)
                        .col(Campaigns::Name)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_campaigns_kind")
                        .table(Campaigns::Table)
                        .col(Campaigns::Kind)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Campaigns::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Campaigns {
        Table,
        Id,
        Name,
        Kind,
        BuyQuantity,
        PayQuantity,
        Percent,
        Amount,
        Active,
        CreatedBy,
        IsDeleted,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_sales_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_sales_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sales::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sales::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Sales::SalesNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Sales::SalesDate).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Sales::CreatedBy).string().not_null())
                        .col(ColumnDef::new(Sales::PaymentType).string().not_null())
                        .col(
                            ColumnDef::new(Sales::TotalPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Sales::Money).decimal().not_null().default(0))
                        .col(
                            ColumnDef::new(Sales::Change)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Sales::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Sales::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Sales::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_sales_number")
                        .table(Sales::Table)
                        .col(Sales::SalesNumber)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sales::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Sales {
        Table,
        Id,
        SalesNumber,
        SalesDate,
        CreatedBy,
        PaymentType,
        TotalPrice,
        Money,
        Change,
        IsDeleted,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_sale_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_sale_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SaleItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SaleItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SaleItems::SaleId).uuid().not_null())
                        .col(ColumnDef::new(SaleItems::ProductId).string().not_null())
                        .col(ColumnDef::new(SaleItems::Name).string().not_null())
                        .col(ColumnDef::new(SaleItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(SaleItems::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(SaleItems::TotalPrice).decimal().not_null())
                        .col(ColumnDef::new(SaleItems::CampaignId).uuid().null())
                        .col(ColumnDef::new(SaleItems::PaymentType).string().null())
                        .col(ColumnDef::new(SaleItems::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(SaleItems::UpdatedAt).timestamp_with_time_zone().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_items_sale_id")
                                .from(SaleItems::Table, SaleItems::SaleId)
                                .to(Sales::Table, Sales::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sale_items_sale_id")
                        .table(SaleItems::Table)
                        .col(SaleItems::SaleId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sale_items_product_id")
                        .table(SaleItems::Table)
                        .col(SaleItems::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SaleItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum SaleItems {
        Table,
        Id,
        SaleId,
        ProductId,
        Name,
        Quantity,
        UnitPrice,
        TotalPrice,
        CampaignId,
        PaymentType,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Sales {
        Table,
        Id,
    }
}
