// 📊 Aggregations - closures per year and repeated owners
// Plain group-and-count; keys compare as exact trimmed text

use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

// ============================================================================
// CLOSURES BY YEAR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}

/// Distinct closure years of closed records, ascending.
pub fn closed_years(records: &[Record], closed_status: &str) -> Vec<i32> {
    records
        .iter()
        .filter(|r| r.is_closed(closed_status))
        .filter_map(Record::closure_year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Count closed records per closure year.
///
/// Records without a parseable closure date are left out. `years` narrows the
/// groups to an inclusive range.
pub fn closures_by_year(
    records: &[Record],
    closed_status: &str,
    years: Option<RangeInclusive<i32>>,
) -> Vec<YearCount> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();

    for year in records
        .iter()
        .filter(|r| r.is_closed(closed_status))
        .filter_map(Record::closure_year)
    {
        if years.as_ref().map_or(true, |range| range.contains(&year)) {
            *counts.entry(year).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|(year, count)| YearCount { year, count })
        .collect()
}

// ============================================================================
// DUPLICATES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateKey {
    #[default]
    Owner,
    NationalId,
}

impl DuplicateKey {
    pub fn value<'a>(&self, record: &'a Record) -> &'a str {
        match self {
            DuplicateKey::Owner => record.owner_name.trim(),
            DuplicateKey::NationalId => record.national_id.trim(),
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            DuplicateKey::Owner => DuplicateKey::NationalId,
            DuplicateKey::NationalId => DuplicateKey::Owner,
        }
    }
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateKey::Owner => write!(f, "owner"),
            DuplicateKey::NationalId => write!(f, "national-id"),
        }
    }
}

impl FromStr for DuplicateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" | "owner_name" | "owner-name" => Ok(DuplicateKey::Owner),
            "national-id" | "national_id" | "rrn" => Ok(DuplicateKey::NationalId),
            other => Err(format!("unknown duplicate key: {other} (expected owner|national-id)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub key: String,
    pub count: usize,
}

/// Key values shared by two or more records, most repeated first.
///
/// Ties sort by key so the listing is stable across runs.
pub fn duplicate_groups(records: &[Record], key: DuplicateKey) -> Vec<DuplicateGroup> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in records {
        *counts.entry(key.value(r)).or_insert(0) += 1;
    }

    let mut groups: Vec<DuplicateGroup> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(k, count)| DuplicateGroup {
            key: k.to_string(),
            count,
        })
        .collect();

    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    groups
}

/// Records whose key equals `value`, in source order.
pub fn duplicate_detail(records: &[Record], key: DuplicateKey, value: &str) -> Vec<Record> {
    let value = value.trim();
    records
        .iter()
        .filter(|r| key.value(r) == value)
        .cloned()
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_records;

    fn with_owner(owner: &str, nid: &str) -> Record {
        Record::new("X", "000-00-00000", owner, nid, "계속사업자", "")
    }

    #[test]
    fn test_closures_by_year_sample_scenario() {
        let records = sample_records();
        assert_eq!(records.len(), 7);

        let years = closed_years(&records, "폐업");
        assert_eq!(years, vec![2020, 2021, 2023]);

        let full = (*years.first().unwrap())..=(*years.last().unwrap());
        let counts = closures_by_year(&records, "폐업", Some(full));
        assert_eq!(
            counts,
            vec![
                YearCount { year: 2020, count: 1 },
                YearCount { year: 2021, count: 1 },
                YearCount { year: 2023, count: 1 },
            ]
        );
    }

    #[test]
    fn test_closures_by_year_range_narrows() {
        let counts = closures_by_year(&sample_records(), "폐업", Some(2021..=2022));
        assert_eq!(counts, vec![YearCount { year: 2021, count: 1 }]);
    }

    #[test]
    fn test_closures_ignore_open_and_undated() {
        let mut records = sample_records();
        // open business with a stray date
        records[0] = Record::new("A상사", "1", "o", "2", "계속사업자", "2019-01-01");
        // closed but unparseable
        records[1] = Record::new("B무역", "3", "p", "4", "폐업", "unknown");
        let counts = closures_by_year(&records, "폐업", None);
        let years: Vec<_> = counts.iter().map(|c| c.year).collect();
        assert_eq!(years, vec![2021, 2023]);
    }

    #[test]
    fn test_duplicate_groups_by_owner() {
        let records = vec![
            with_owner("홍길동", "1"),
            with_owner("김철수", "2"),
            with_owner("홍길동", "3"),
            with_owner("이영희", "4"),
            with_owner("김철수", "5"),
            with_owner("홍길동", "6"),
        ];

        let groups = duplicate_groups(&records, DuplicateKey::Owner);
        assert_eq!(
            groups,
            vec![
                DuplicateGroup { key: "홍길동".to_string(), count: 3 },
                DuplicateGroup { key: "김철수".to_string(), count: 2 },
            ]
        );
        // a unique owner never appears
        assert!(groups.iter().all(|g| g.key != "이영희"));
    }

    #[test]
    fn test_duplicate_groups_by_national_id() {
        let records = vec![
            with_owner("a", "800101-1234567"),
            with_owner("b", "800101-1234567"),
            with_owner("c", "820202-2345678"),
        ];
        let groups = duplicate_groups(&records, DuplicateKey::NationalId);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "800101-1234567");
    }

    #[test]
    fn test_sample_has_no_duplicates() {
        assert!(duplicate_groups(&sample_records(), DuplicateKey::Owner).is_empty());
    }

    #[test]
    fn test_blank_keys_group_like_any_value() {
        let records = vec![with_owner("", "1"), with_owner("  ", "2"), with_owner("김", "3")];
        let groups = duplicate_groups(&records, DuplicateKey::Owner);
        assert_eq!(
            groups,
            vec![DuplicateGroup {
                key: String::new(),
                count: 2
            }]
        );
        assert_eq!(duplicate_detail(&records, DuplicateKey::Owner, "").len(), 2);
    }

    #[test]
    fn test_duplicate_detail() {
        let records = vec![
            with_owner("홍길동", "1"),
            with_owner("김철수", "2"),
            with_owner(" 홍길동 ", "3"),
        ];
        let detail = duplicate_detail(&records, DuplicateKey::Owner, "홍길동");
        let nids: Vec<_> = detail.iter().map(|r| r.national_id.as_str()).collect();
        assert_eq!(nids, vec!["1", "3"]);
    }

    #[test]
    fn test_duplicate_key_parse() {
        assert_eq!("owner".parse::<DuplicateKey>(), Ok(DuplicateKey::Owner));
        assert_eq!("national-id".parse::<DuplicateKey>(), Ok(DuplicateKey::NationalId));
        assert!("name".parse::<DuplicateKey>().is_err());
    }
}
