//! Population statistics over a set of visits.
//!
//! The selection logic is kept pure so it can be tested without a database:
//! the repo layer loads candidate visits and their exam samples, and this
//! module decides which visits qualify and computes the per-metric means.

use std::collections::BTreeMap;

use serde::Serialize;
use time::Date;

/// Average number of days per year in the Gregorian calendar.
const DAYS_PER_YEAR: f64 = 365.2425;

/// Parsed query for GET /exams/statistics. Admins either name visits
/// explicitly or provide a demographic filter; any query key that is not
/// `visits`, `gender` or `age` is a per-metric value range.
#[derive(Debug, Default)]
pub struct StatsQuery {
    pub visits: Vec<i64>,
    pub gender: Option<String>,
    pub age: Option<(i64, i64)>,
    pub metric_filters: Vec<(String, (f64, f64))>,
}

/// A visit id together with its owner's demographics.
#[derive(Debug, Clone)]
pub struct VisitOwner {
    pub visit_id: i64,
    pub gender: String,
    pub birth_date: Date,
}

/// One exam value joined to its metric.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MetricSample {
    pub visit_id: i64,
    pub metric_id: i64,
    pub metric_name: String,
    pub value: f64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsEntry {
    pub metric_name: String,
    pub value: i64,
}

fn parse_pair<T: std::str::FromStr>(raw: &str) -> Option<(T, T)> {
    let (lo, hi) = raw.split_once(',')?;
    Some((lo.trim().parse().ok()?, hi.trim().parse().ok()?))
}

pub fn parse_query(pairs: &[(String, String)]) -> Result<StatsQuery, String> {
    let mut q = StatsQuery::default();
    for (key, value) in pairs {
        match key.as_str() {
            "visits" | "visits[]" => {
                for part in value.split(',').filter(|p| !p.trim().is_empty()) {
                    let id = part
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| format!("Invalid visit id: {part}"))?;
                    q.visits.push(id);
                }
            }
            "gender" => q.gender = Some(value.clone()),
            "age" => {
                q.age = Some(
                    parse_pair::<i64>(value).ok_or_else(|| format!("Invalid age range: {value}"))?,
                );
            }
            metric => {
                let range = parse_pair::<f64>(value)
                    .ok_or_else(|| format!("Invalid range for metric {metric}: {value}"))?;
                q.metric_filters.push((metric.to_string(), range));
            }
        }
    }
    Ok(q)
}

/// Age in whole years at `today`.
pub fn age_in_years(birth_date: Date, today: Date) -> i64 {
    let days = (today - birth_date).whole_days();
    (days as f64 / DAYS_PER_YEAR).floor() as i64
}

/// Select the visit ids matching the demographic filter. A visit qualifies
/// when the owner's gender matches, the owner's age lies in the inclusive
/// range, and for every metric filter at least one exam of that metric on the
/// visit falls inside the inclusive value range. A visit with no exam at all
/// for a filtered metric fails that filter.
pub fn filter_visits(
    candidates: &[VisitOwner],
    samples: &[MetricSample],
    gender: &str,
    age: (i64, i64),
    metric_filters: &[(String, (f64, f64))],
    today: Date,
) -> Vec<i64> {
    let (age_min, age_max) = age;
    candidates
        .iter()
        .filter(|c| c.gender == gender)
        .filter(|c| {
            let years = age_in_years(c.birth_date, today);
            years >= age_min && years <= age_max
        })
        .filter(|c| {
            metric_filters.iter().all(|(name, (lo, hi))| {
                samples.iter().any(|s| {
                    s.visit_id == c.visit_id
                        && s.metric_name == *name
                        && s.value >= *lo
                        && s.value <= *hi
                })
            })
        })
        .map(|c| c.visit_id)
        .collect()
}

/// Per-metric arithmetic mean over the samples, truncated toward zero,
/// grouped and emitted in metric-id order.
pub fn aggregate(samples: &[MetricSample]) -> Vec<StatsEntry> {
    let mut groups: BTreeMap<i64, (String, f64, u64)> = BTreeMap::new();
    for s in samples {
        let entry = groups
            .entry(s.metric_id)
            .or_insert_with(|| (s.metric_name.clone(), 0.0, 0));
        entry.1 += s.value;
        entry.2 += 1;
    }
    groups
        .into_values()
        .map(|(metric_name, sum, count)| StatsEntry {
            metric_name,
            value: (sum / count as f64).trunc() as i64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn sample(visit_id: i64, metric_id: i64, name: &str, value: f64) -> MetricSample {
        MetricSample {
            visit_id,
            metric_id,
            metric_name: name.into(),
            value,
        }
    }

    #[test]
    fn parses_repeated_and_comma_separated_visit_ids() {
        let pairs = vec![
            ("visits".to_string(), "1".to_string()),
            ("visits[]".to_string(), "2,3".to_string()),
        ];
        let q = parse_query(&pairs).unwrap();
        assert_eq!(q.visits, vec![1, 2, 3]);
    }

    #[test]
    fn parses_demographic_filter_with_metric_ranges() {
        let pairs = vec![
            ("gender".to_string(), "F".to_string()),
            ("age".to_string(), "30,40".to_string()),
            ("Cholesterol".to_string(), "100,200".to_string()),
        ];
        let q = parse_query(&pairs).unwrap();
        assert_eq!(q.gender.as_deref(), Some("F"));
        assert_eq!(q.age, Some((30, 40)));
        assert_eq!(
            q.metric_filters,
            vec![("Cholesterol".to_string(), (100.0, 200.0))]
        );
    }

    #[test]
    fn rejects_malformed_ranges() {
        assert!(parse_query(&[("age".into(), "30".into())]).is_err());
        assert!(parse_query(&[("age".into(), "a,b".into())]).is_err());
        assert!(parse_query(&[("visits".into(), "1,x".into())]).is_err());
    }

    #[test]
    fn age_is_floored_to_whole_years() {
        let birth = date!(1990 - 06 - 15);
        assert_eq!(age_in_years(birth, date!(2030 - 06 - 14)), 39);
        assert_eq!(age_in_years(birth, date!(2030 - 06 - 16)), 40);
    }

    #[test]
    fn age_bounds_are_inclusive() {
        let candidates = vec![
            VisitOwner {
                visit_id: 1,
                gender: "F".into(),
                birth_date: date!(1990 - 01 - 01), // 40 on 2030-01-01
            },
            VisitOwner {
                visit_id: 2,
                gender: "F".into(),
                birth_date: date!(1988 - 12 - 01), // 41
            },
        ];
        let picked = filter_visits(&candidates, &[], "F", (30, 40), &[], date!(2030 - 01 - 01));
        assert_eq!(picked, vec![1]);
    }

    #[test]
    fn gender_mismatch_excludes_the_visit() {
        let candidates = vec![VisitOwner {
            visit_id: 1,
            gender: "M".into(),
            birth_date: date!(1990 - 01 - 01),
        }];
        let picked = filter_visits(&candidates, &[], "F", (0, 120), &[], date!(2030 - 01 - 01));
        assert!(picked.is_empty());
    }

    #[test]
    fn metric_filter_requires_a_matching_sample() {
        let candidates = vec![
            VisitOwner {
                visit_id: 1,
                gender: "F".into(),
                birth_date: date!(1990 - 01 - 01),
            },
            VisitOwner {
                visit_id: 2,
                gender: "F".into(),
                birth_date: date!(1990 - 01 - 01),
            },
            VisitOwner {
                visit_id: 3,
                gender: "F".into(),
                birth_date: date!(1990 - 01 - 01),
            },
        ];
        let samples = vec![
            sample(1, 10, "Cholesterol", 150.0),
            sample(2, 10, "Cholesterol", 250.0), // out of range
                                                 // visit 3 has no Cholesterol exam at all
        ];
        let filters = vec![("Cholesterol".to_string(), (100.0, 200.0))];
        let picked = filter_visits(
            &candidates,
            &samples,
            "F",
            (0, 120),
            &filters,
            date!(2030 - 01 - 01),
        );
        assert_eq!(picked, vec![1]);
    }

    #[test]
    fn no_metric_filters_admits_every_demographic_match() {
        let candidates = vec![
            VisitOwner {
                visit_id: 1,
                gender: "F".into(),
                birth_date: date!(1990 - 01 - 01),
            },
            VisitOwner {
                visit_id: 2,
                gender: "F".into(),
                birth_date: date!(1992 - 05 - 05),
            },
        ];
        let picked = filter_visits(&candidates, &[], "F", (0, 120), &[], date!(2030 - 01 - 01));
        assert_eq!(picked, vec![1, 2]);
    }

    #[test]
    fn aggregate_means_per_metric() {
        let samples = vec![
            sample(1, 10, "A", 100.0),
            sample(2, 10, "A", 200.0),
            sample(1, 11, "B", 80.0),
        ];
        let out = aggregate(&samples);
        assert_eq!(
            out,
            vec![
                StatsEntry {
                    metric_name: "A".into(),
                    value: 150
                },
                StatsEntry {
                    metric_name: "B".into(),
                    value: 80
                },
            ]
        );
    }

    #[test]
    fn aggregate_truncates_toward_zero() {
        let samples = vec![sample(1, 10, "A", 100.0), sample(2, 10, "A", 201.0)];
        assert_eq!(aggregate(&samples)[0].value, 150);
    }

    #[test]
    fn aggregate_of_nothing_is_empty() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn stats_entry_serializes_camel_case() {
        let entry = StatsEntry {
            metric_name: "A".into(),
            value: 150,
        };
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"metricName":"A","value":150}"#
        );
    }
}
