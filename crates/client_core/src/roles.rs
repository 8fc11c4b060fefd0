use shared::{domain::Role, protocol::User};

use crate::{
    error::{ClientError, Result},
    session::SessionState,
};

pub fn has_role(user: Option<&User>, role: Role) -> bool {
    user.and_then(|u| u.role) == Some(role)
}

pub fn is_admin(user: Option<&User>) -> bool {
    has_role(user, Role::Admin)
}

pub fn is_organizer(user: Option<&User>) -> bool {
    has_role(user, Role::Organizer)
}

/// Organizers manage their own events. Without an organizer this is the
/// general permission to create one.
pub fn can_manage_event(user: Option<&User>, event_organizer: Option<&str>) -> bool {
    let Some(user) = user else {
        return false;
    };
    if !is_organizer(Some(user)) {
        return false;
    }
    match event_organizer {
        None => true,
        Some(organizer) => user.username == organizer,
    }
}

/// Gate for operations restricted to some roles. An empty `allowed` list
/// only requires a session.
pub fn require_role<'a>(state: &'a SessionState, allowed: &[Role]) -> Result<&'a User> {
    let user = state.user().ok_or(ClientError::NotAuthenticated)?;
    if allowed.is_empty() {
        return Ok(user);
    }
    match user.role {
        Some(role) if allowed.contains(&role) => Ok(user),
        _ => Err(ClientError::Forbidden(
            allowed
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(" or "),
        )),
    }
}
