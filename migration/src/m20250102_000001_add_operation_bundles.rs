use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OperationBundles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OperationBundles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(OperationBundles::Name))
                    .col(
                        ColumnDef::new(OperationBundles::BundlePath)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(OperationBundles::Status)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OperationBundles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OperationBundles {
    Table,
    Id,
    Name,
    BundlePath,
    Status,
}
