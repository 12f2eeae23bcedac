use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Enable foreign keys for SQLite
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Sqlite {
            manager
                .get_connection()
                .execute_unprepared("PRAGMA foreign_keys = ON")
                .await?;
        }

        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Phone)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(string_null(Users::Name))
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("user"),
                    )
                    .to_owned(),
            )
            .await?;

        // Create user_groups table
        manager
            .create_table(
                Table::create()
                    .table(UserGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserGroups::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(UserGroups::Name))
                    .to_owned(),
            )
            .await?;

        // Create rules table
        manager
            .create_table(
                Table::create()
                    .table(Rules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rules::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(Rules::Operation))
                    .col(string(Rules::Kind))
                    .col(
                        ColumnDef::new(Rules::Type)
                            .string()
                            .not_null()
                            .default("allow"),
                    )
                    .col(string_null(Rules::Role))
                    .col(string_null(Rules::Protocol))
                    .col(string_null(Rules::Domain))
                    .to_owned(),
            )
            .await?;

        // Rules are always fetched by operation
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rules_operation")
                    .table(Rules::Table)
                    .col(Rules::Operation)
                    .to_owned(),
            )
            .await?;

        // Create user_rule_relations table
        manager
            .create_table(
                Table::create()
                    .table(UserRuleRelations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserRuleRelations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(integer(UserRuleRelations::UserId))
                    .col(integer(UserRuleRelations::RuleId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_rule_relations_user")
                            .from(UserRuleRelations::Table, UserRuleRelations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_rule_relations_rule")
                            .from(UserRuleRelations::Table, UserRuleRelations::RuleId)
                            .to(Rules::Table, Rules::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_rule_relations_rule")
                    .table(UserRuleRelations::Table)
                    .col(UserRuleRelations::RuleId)
                    .to_owned(),
            )
            .await?;

        // Create group_rule_relations table
        manager
            .create_table(
                Table::create()
                    .table(GroupRuleRelations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupRuleRelations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(integer(GroupRuleRelations::UserGroupId))
                    .col(integer(GroupRuleRelations::RuleId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_rule_relations_group")
                            .from(GroupRuleRelations::Table, GroupRuleRelations::UserGroupId)
                            .to(UserGroups::Table, UserGroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_rule_relations_rule")
                            .from(GroupRuleRelations::Table, GroupRuleRelations::RuleId)
                            .to(Rules::Table, Rules::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_group_rule_relations_rule")
                    .table(GroupRuleRelations::Table)
                    .col(GroupRuleRelations::RuleId)
                    .to_owned(),
            )
            .await?;

        // Create user_group_relations table
        manager
            .create_table(
                Table::create()
                    .table(UserGroupRelations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserGroupRelations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(integer(UserGroupRelations::UserId))
                    .col(integer(UserGroupRelations::UserGroupId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_group_relations_user")
                            .from(UserGroupRelations::Table, UserGroupRelations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_group_relations_group")
                            .from(UserGroupRelations::Table, UserGroupRelations::UserGroupId)
                            .to(UserGroups::Table, UserGroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Membership probes filter on both columns
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_group_relations_user_group")
                    .table(UserGroupRelations::Table)
                    .col(UserGroupRelations::UserId)
                    .col(UserGroupRelations::UserGroupId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserGroupRelations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupRuleRelations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserRuleRelations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rules::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserGroups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Phone,
    Name,
    Role,
}

#[derive(DeriveIden)]
enum UserGroups {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Rules {
    Table,
    Id,
    Operation,
    Kind,
    Type,
    Role,
    Protocol,
    Domain,
}

#[derive(DeriveIden)]
enum UserRuleRelations {
    Table,
    Id,
    UserId,
    RuleId,
}

#[derive(DeriveIden)]
enum GroupRuleRelations {
    Table,
    Id,
    UserGroupId,
    RuleId,
}

#[derive(DeriveIden)]
enum UserGroupRelations {
    Table,
    Id,
    UserId,
    UserGroupId,
}
