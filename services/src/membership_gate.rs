//! Caller -> membership resolution and capability checks.

use crate::error::{AttendanceError, AttendanceResult};
use db::models::{
    join_request,
    membership,
    role::{Capabilities, Capability},
};
use sea_orm::{ConnectionTrait, DbErr};

/// A caller's current membership in one generation, with its capabilities
/// already loaded.
#[derive(Debug, Clone)]
pub struct MemberContext {
    pub membership: membership::Model,
    pub capabilities: Capabilities,
}

impl MemberContext {
    pub fn membership_id(&self) -> i64 {
        self.membership.id
    }
}

pub async fn resolve<C>(
    db: &C,
    user_id: i64,
    generation_id: i64,
) -> Result<Option<MemberContext>, DbErr>
where
    C: ConnectionTrait,
{
    let Some(membership) = membership::Model::find_current(db, user_id, generation_id).await? else {
        return Ok(None);
    };
    let capabilities = membership.capabilities(db).await?;
    Ok(Some(MemberContext {
        membership,
        capabilities,
    }))
}

pub fn has_capability(ctx: &MemberContext, capability: Capability) -> bool {
    ctx.capabilities.contains(capability)
}

pub fn is_event_admin(ctx: &MemberContext) -> bool {
    has_capability(ctx, Capability::ManageEvents)
}

/// Resolves a member for the scan path, telling apart "never applied" from
/// "applied, not yet accepted".
pub async fn require_member<C>(
    db: &C,
    user_id: i64,
    generation_id: i64,
) -> AttendanceResult<MemberContext>
where
    C: ConnectionTrait,
{
    match resolve(db, user_id, generation_id).await? {
        Some(ctx) => Ok(ctx),
        None => Err(unregistered(db, user_id, generation_id).await?),
    }
}

/// Resolves a member for an administrative path. Anything short of a current
/// membership holding `capability` is `Forbidden`.
pub async fn require_capability<C>(
    db: &C,
    user_id: i64,
    generation_id: i64,
    capability: Capability,
) -> AttendanceResult<MemberContext>
where
    C: ConnectionTrait,
{
    match resolve(db, user_id, generation_id).await? {
        Some(ctx) if has_capability(&ctx, capability) => Ok(ctx),
        _ => Err(AttendanceError::Forbidden),
    }
}

pub async fn require_event_admin<C>(
    db: &C,
    user_id: i64,
    generation_id: i64,
) -> AttendanceResult<MemberContext>
where
    C: ConnectionTrait,
{
    require_capability(db, user_id, generation_id, Capability::ManageEvents).await
}

async fn unregistered<C>(db: &C, user_id: i64, generation_id: i64) -> Result<AttendanceError, DbErr>
where
    C: ConnectionTrait,
{
    if join_request::Model::has_pending(db, user_id, generation_id).await? {
        Ok(AttendanceError::WaitingForApproval)
    } else {
        Ok(AttendanceError::NotRegisteredClub)
    }
}
