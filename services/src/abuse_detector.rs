use db::models::{abuse_flag, attendance, membership};
use sea_orm::{ConnectionTrait, DbErr};

/// Looks for an earlier check-in of a different member on the same device in
/// the same event and, if there is one, flags that earlier row.
///
/// Purely advisory: the new row stays as written whatever this returns.
pub async fn flag_shared_device<C>(
    db: &C,
    row: &attendance::Model,
) -> Result<Option<abuse_flag::Model>, DbErr>
where
    C: ConnectionTrait,
{
    let Some(device_token_id) = row.device_token_id else {
        return Ok(None);
    };

    let Some(earlier) = attendance::Model::earliest_other_on_device(
        db,
        row.event_id,
        device_token_id,
        row.membership_id,
    )
    .await?
    else {
        return Ok(None);
    };

    let current_name = display_name(db, row.membership_id).await?;
    let earlier_name = display_name(db, earlier.membership_id).await?;
    let reason = format!(
        "{current_name} checked in with the same device as {earlier_name} \
         (attendance #{} and #{})",
        earlier.id, row.id
    );

    let flag = abuse_flag::Model::create(db, earlier.id, &reason).await?;
    tracing::warn!(
        event_id = row.event_id,
        attendance_id = earlier.id,
        device_token_id,
        %reason,
        "abuse flag raised"
    );
    Ok(Some(flag))
}

async fn display_name<C>(db: &C, membership_id: i64) -> Result<String, DbErr>
where
    C: ConnectionTrait,
{
    Ok(membership::Model::username(db, membership_id)
        .await?
        .unwrap_or_else(|| format!("membership #{membership_id}")))
}
