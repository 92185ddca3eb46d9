use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::visits::repo::Visit;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVisitRequest {
    pub name: String,
    /// Admins may create a visit on behalf of another user.
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVisitRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitListQuery {
    /// Admin-only narrowing by owner.
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitResponse {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

impl From<Visit> for VisitResponse {
    fn from(v: Visit) -> Self {
        Self {
            id: v.id,
            name: v.name,
            user_id: v.user_id,
            created_at: v.created_at,
            modified_at: v.modified_at,
        }
    }
}

/// Body for delete confirmations, shared by the other entity modules.
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: String,
}

impl DeletedResponse {
    pub fn new(entity: &str, id: i64) -> Self {
        Self {
            message: format!("{entity} {id} deleted successfully"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_message_shape() {
        let body = DeletedResponse::new("visit", 12);
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"message":"visit 12 deleted successfully"}"#
        );
    }
}
