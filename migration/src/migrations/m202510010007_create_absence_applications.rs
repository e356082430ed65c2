use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510010007_create_absence_applications"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("absence_applications"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("event_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("membership_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("reason")).text().not_null())
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
                    .col(
                        ColumnDef::new(Alias::new("state"))
                            .enumeration(
                                Alias::new("request_state"),
                                vec![Alias::new("pending"), Alias::new("approved"), Alias::new("rejected")],
                            )
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Alias::new("reviewer_membership_id")).big_integer().null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_absence_applications_event")
                            .from(Alias::new("absence_applications"), Alias::new("event_id"))
                            .to(Alias::new("events"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_absence_applications_membership")
                            .from(Alias::new("absence_applications"), Alias::new("membership_id"))
                            .to(Alias::new("memberships"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_absence_applications_reviewer")
                            .from(Alias::new("absence_applications"), Alias::new("reviewer_membership_id"))
                            .to(Alias::new("memberships"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_absence_applications_event_membership")
                    .table(Alias::new("absence_applications"))
                    .col(Alias::new("event_id"))
                    .col(Alias::new("membership_id"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("absence_applications")).to_owned())
            .await
    }
}
