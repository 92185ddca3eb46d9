use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::exams::repo::ExamRow;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    pub visit_id: i64,
    pub metric_id: i64,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExamRequest {
    pub value: Option<f64>,
    pub metric_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamListQuery {
    pub visit_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResponse {
    pub id: i64,
    pub value: f64,
    pub visit_id: i64,
    pub metric_id: i64,
    pub metric_name: String,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

impl From<ExamRow> for ExamResponse {
    fn from(e: ExamRow) -> Self {
        Self {
            id: e.id,
            value: e.value,
            visit_id: e.visit_id,
            metric_id: e.metric_id,
            metric_name: e.metric_name,
            created_at: e.created_at,
            modified_at: e.modified_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_uses_camel_case_keys() {
        let req: CreateExamRequest =
            serde_json::from_str(r#"{"visitId":1,"metricId":2,"value":120}"#).unwrap();
        assert_eq!(req.visit_id, 1);
        assert_eq!(req.metric_id, 2);
        assert_eq!(req.value, 120.0);
    }

    #[test]
    fn update_request_fields_are_optional() {
        let req: UpdateExamRequest = serde_json::from_str(r#"{"value":98.5}"#).unwrap();
        assert_eq!(req.value, Some(98.5));
        assert!(req.metric_id.is_none());
    }
}
