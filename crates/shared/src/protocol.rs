use serde::{Deserialize, Serialize};

use crate::domain::ProfileId;

/// One element of a profile-queue page.
///
/// Older backends return bare ids, newer ones return `{ "id": ... }` objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueueItem {
    Bare(ProfileId),
    Object { id: ProfileId },
}

impl QueueItem {
    pub fn into_id(self) -> ProfileId {
        match self {
            QueueItem::Bare(id) | QueueItem::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendUser {
    pub id: ProfileId,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Body of `GET /user/{id}`, either wrapped in `user` or bare.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserResponse {
    Wrapped { user: BackendUser },
    Bare(BackendUser),
}

impl UserResponse {
    pub fn into_user(self) -> BackendUser {
        match self {
            UserResponse::Wrapped { user } | UserResponse::Bare(user) => user,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesResponse {
    #[serde(default)]
    pub matches: Vec<ProfileId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueuePageQuery {
    pub offset: usize,
    pub limit: usize,
}
