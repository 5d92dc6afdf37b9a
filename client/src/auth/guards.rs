use crate::auth::session::SessionStore;
use crate::models::{Role, User};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("authentication required")]
    NotAuthenticated,
    #[error("you do not have permission to use this command")]
    Forbidden,
}

/// Pure role check. No roles specified -> deny (fail-safe).
pub fn has_any_role(role: Role, required: &[Role]) -> bool {
    required.iter().any(|r| *r == role)
}

/// Gate for role-restricted screens/commands: the caller must be signed in
/// and hold one of `required`.
pub fn require(store: &SessionStore, required: &[Role]) -> Result<User, AuthError> {
    let user = store.user().ok_or(AuthError::NotAuthenticated)?;
    if !has_any_role(user.role, required) {
        return Err(AuthError::Forbidden);
    }
    Ok(user)
}

/// Gate for screens that only need a signed-in user, any role.
pub fn require_authenticated(store: &SessionStore) -> Result<User, AuthError> {
    store.user().ok_or(AuthError::NotAuthenticated)
}
