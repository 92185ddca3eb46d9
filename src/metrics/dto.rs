use serde::{Deserialize, Serialize};

use crate::categories::repo::Category;
use crate::metrics::repo::Metric;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetricRequest {
    pub name: String,
    pub weight: i32,
    pub unit_label: String,
    pub total_range_min: i32,
    pub total_range_max: i32,
    pub healthy_range_min: i32,
    pub healthy_range_max: i32,
    pub gender: String,
    #[serde(default)]
    pub category_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetricRequest {
    pub name: Option<String>,
    pub weight: Option<i32>,
    pub unit_label: Option<String>,
    pub total_range_min: Option<i32>,
    pub total_range_max: Option<i32>,
    pub healthy_range_min: Option<i32>,
    pub healthy_range_max: Option<i32>,
    pub gender: Option<String>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MetricListQuery {
    pub gender: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricResponse {
    pub id: i64,
    pub name: String,
    pub weight: i32,
    pub unit_label: String,
    pub total_range_min: i32,
    pub total_range_max: i32,
    pub healthy_range_min: i32,
    pub healthy_range_max: i32,
    pub gender: String,
    pub category_id: Option<i64>,
}

impl From<Metric> for MetricResponse {
    fn from(m: Metric) -> Self {
        Self {
            id: m.id,
            name: m.name,
            weight: m.weight,
            unit_label: m.unit_label,
            total_range_min: m.total_range_min,
            total_range_max: m.total_range_max,
            healthy_range_min: m.healthy_range_min,
            healthy_range_max: m.healthy_range_max,
            gender: m.gender,
            category_id: m.category_id,
        }
    }
}

// GET /metrics/data keeps the historical wire shape: snake_case labels and
// range pairs folded under "features".

#[derive(Debug, Serialize, PartialEq)]
pub struct MetricFeatures {
    pub totalrange: [i32; 2],
    pub healthyrange: [i32; 2],
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MetricDataEntry {
    pub name: String,
    pub weight: i32,
    pub unit_label: String,
    pub features: MetricFeatures,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MetricDataGroup {
    pub category: Option<String>,
    pub metrics: Vec<MetricDataEntry>,
}

impl From<&Metric> for MetricDataEntry {
    fn from(m: &Metric) -> Self {
        Self {
            name: m.name.clone(),
            weight: m.weight,
            unit_label: m.unit_label.clone(),
            features: MetricFeatures {
                totalrange: [m.total_range_min, m.total_range_max],
                healthyrange: [m.healthy_range_min, m.healthy_range_max],
            },
        }
    }
}

/// Group gender-matching metrics by category, in category-id order, dropping
/// categories with no surviving metric; uncategorized metrics come last.
pub fn group_metric_data(categories: &[Category], metrics: &[Metric]) -> Vec<MetricDataGroup> {
    let mut groups = Vec::new();
    for cat in categories {
        let entries: Vec<MetricDataEntry> = metrics
            .iter()
            .filter(|m| m.category_id == Some(cat.id))
            .map(Into::into)
            .collect();
        if !entries.is_empty() {
            groups.push(MetricDataGroup {
                category: Some(cat.name.clone()),
                metrics: entries,
            });
        }
    }
    let uncategorized: Vec<MetricDataEntry> = metrics
        .iter()
        .filter(|m| m.category_id.is_none())
        .map(Into::into)
        .collect();
    if !uncategorized.is_empty() {
        groups.push(MetricDataGroup {
            category: None,
            metrics: uncategorized,
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(id: i64, name: &str, category_id: Option<i64>) -> Metric {
        Metric {
            id,
            name: name.into(),
            weight: 1,
            unit_label: "mg/dL".into(),
            total_range_min: 0,
            total_range_max: 300,
            healthy_range_min: 50,
            healthy_range_max: 200,
            gender: "F".into(),
            category_id,
        }
    }

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.into(),
        }
    }

    #[test]
    fn empty_categories_are_dropped_and_uncategorized_comes_last() {
        let categories = vec![category(1, "Blood"), category(2, "Heart")];
        let metrics = vec![
            metric(10, "Cholesterol", Some(1)),
            metric(11, "Glucose", None),
        ];
        let groups = group_metric_data(&categories, &metrics);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category.as_deref(), Some("Blood"));
        assert_eq!(groups[0].metrics[0].name, "Cholesterol");
        assert!(groups[1].category.is_none());
        assert_eq!(groups[1].metrics[0].name, "Glucose");
    }

    #[test]
    fn data_entry_carries_features_ranges() {
        let m = metric(10, "Cholesterol", None);
        let json = serde_json::to_value(MetricDataEntry::from(&m)).unwrap();
        assert_eq!(json["features"]["totalrange"][1], 300);
        assert_eq!(json["features"]["healthyrange"][0], 50);
        assert_eq!(json["unit_label"], "mg/dL");
    }

    #[test]
    fn no_matching_metrics_yields_no_groups() {
        let groups = group_metric_data(&[category(1, "Blood")], &[]);
        assert!(groups.is_empty());
    }
}
