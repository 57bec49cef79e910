use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Mangos::Table)
                    .if_not_exists()
                    .col(pk_auto(Mangos::Id))
                    .col(string_len(Mangos::Name, 100))
                    .col(string_len(Mangos::Color, 100))
                    .col(boolean(Mangos::Ripe).default(false))
                    .col(
                        timestamp_with_time_zone(Mangos::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Mangos::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Mangos::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Mangos {
    Table,
    Id,
    Name,
    Color,
    Ripe,
    CreatedAt,
    UpdatedAt,
}
