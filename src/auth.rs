use serde::{Deserialize, Serialize};

/// Credential attached to every backend call.
///
/// Sessions are issued by the external identity provider at sign-in and
/// persisted on the device; this crate only consumes them. The store checks
/// `id_token` against its security rules on every request, and `is_admin`
/// selects the admin read path (full-table scan) over the per-user index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: String,
    pub id_token: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl AuthSession {
    pub fn new(user_id: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            id_token: id_token.into(),
            is_admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::new(user_id, id_token)
        }
    }
}
