// migration: append-only attendance log, device tokens and abuse flags
use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510010005_create_attendance"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // device_tokens
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("device_tokens"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("user_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("token")).string().not_null().unique_key())
                    .col(ColumnDef::new(Alias::new("model")).string().null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_device_tokens_user")
                            .from(Alias::new("device_tokens"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // attendances
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("attendances"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("event_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("membership_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("seq")).integer().not_null())
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .enumeration(
                                Alias::new("attendance_status"),
                                vec![
                                    Alias::new("unchecked"),
                                    Alias::new("present"),
                                    Alias::new("late"),
                                    Alias::new("absent"),
                                ],
                            )
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("is_modified")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("modifier_membership_id")).big_integer().null())
                    .col(ColumnDef::new(Alias::new("latitude")).double().null())
                    .col(ColumnDef::new(Alias::new("longitude")).double().null())
                    .col(ColumnDef::new(Alias::new("device_token_id")).big_integer().null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    // one writer per (event, membership, seq): losing a race is a constraint error
                    .index(
                        Index::create()
                            .col(Alias::new("event_id"))
                            .col(Alias::new("membership_id"))
                            .col(Alias::new("seq"))
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendances_event")
                            .from(Alias::new("attendances"), Alias::new("event_id"))
                            .to(Alias::new("events"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendances_membership")
                            .from(Alias::new("attendances"), Alias::new("membership_id"))
                            .to(Alias::new("memberships"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendances_modifier")
                            .from(Alias::new("attendances"), Alias::new("modifier_membership_id"))
                            .to(Alias::new("memberships"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendances_device_token")
                            .from(Alias::new("attendances"), Alias::new("device_token_id"))
                            .to(Alias::new("device_tokens"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_attendances_event_device")
                    .table(Alias::new("attendances"))
                    .col(Alias::new("event_id"))
                    .col(Alias::new("device_token_id"))
                    .to_owned(),
            )
            .await?;

        // abuse_flags
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("abuse_flags"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("attendance_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("reason")).text().not_null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_abuse_flags_attendance")
                            .from(Alias::new("abuse_flags"), Alias::new("attendance_id"))
                            .to(Alias::new("attendances"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("abuse_flags")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("attendances")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("device_tokens")).to_owned())
            .await
    }
}
