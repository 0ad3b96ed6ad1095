// 💾 CSV Export - views → BOM-prefixed comma-separated bytes
// The BOM keeps Hangul intact when the file is opened in a spreadsheet tool

use crate::aggregate::{DuplicateGroup, DuplicateKey, YearCount};
use crate::config::ColumnNames;
use crate::error::ExportError;
use crate::record::Record;
use csv::Writer;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Header of the closures-by-year export
pub const YEAR_HEADERS: [&str; 2] = ["연도", "폐업자 수"];

/// Count column of the duplicate-summary export
pub const COUNT_HEADER: &str = "건수";

/// Views that can be downloaded, each with its default file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportView {
    Search,
    ClosedList,
    ClosedByYear,
    DuplicateSummary(DuplicateKey),
    DuplicateDetail(DuplicateKey),
}

impl ExportView {
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportView::Search => "사업자_조회_결과.csv",
            ExportView::ClosedList => "전체_폐업자_목록.csv",
            ExportView::ClosedByYear => "연도별_폐업자_통계.csv",
            ExportView::DuplicateSummary(DuplicateKey::Owner) => "대표자_중복_요약.csv",
            ExportView::DuplicateSummary(DuplicateKey::NationalId) => "주민번호_중복_요약.csv",
            ExportView::DuplicateDetail(DuplicateKey::Owner) => "동일사업자_상세_대표자.csv",
            ExportView::DuplicateDetail(DuplicateKey::NationalId) => "동일사업자_상세_주민번호.csv",
        }
    }
}

fn finish(writer: Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    let body = writer.into_inner().map_err(|e| e.into_error())?;
    let mut out = Vec::with_capacity(UTF8_BOM.len() + body.len());
    out.extend_from_slice(UTF8_BOM);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Export records with the display columns, in view order.
pub fn records_csv(records: &[Record], columns: &ColumnNames) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(columns.display())?;

    for r in records {
        writer.write_record([
            r.name.as_str(),
            r.registration_id.as_str(),
            r.owner_name.as_str(),
            r.national_id.as_str(),
            r.status.as_str(),
            r.closure_date_raw.as_str(),
        ])?;
    }

    finish(writer)
}

pub fn year_counts_csv(counts: &[YearCount]) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(YEAR_HEADERS)?;

    for c in counts {
        writer.write_record([c.year.to_string(), c.count.to_string()])?;
    }

    finish(writer)
}

/// `key_header` is the grouped column's display name (owner or national id).
pub fn duplicate_groups_csv(groups: &[DuplicateGroup], key_header: &str) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record([key_header, COUNT_HEADER])?;

    for g in groups {
        writer.write_record([g.key.clone(), g.count.to_string()])?;
    }

    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_bytes;
    use crate::sample::sample_records;

    #[test]
    fn test_bom_prefix() {
        let bytes = records_csv(&sample_records(), &ColumnNames::default()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        assert!(text.starts_with("상호,사업자번호,대표자,주민번호,사업자상태,폐업일자\n"));
    }

    #[test]
    fn test_round_trip_through_loader() {
        let columns = ColumnNames::default();
        let mut original = sample_records();
        original[0].name = "Comma, \"Quoted\" Co".to_string();

        let bytes = records_csv(&original, &columns).unwrap();
        let reloaded = load_bytes(&bytes, &columns).unwrap();

        assert_eq!(reloaded.records.len(), original.len());
        for (a, b) in original.iter().zip(&reloaded.records) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.registration_id, b.registration_id);
            assert_eq!(a.owner_name, b.owner_name);
            assert_eq!(a.national_id, b.national_id);
            assert_eq!(a.status, b.status);
            assert_eq!(a.closure_date_raw, b.closure_date_raw);
            assert_eq!(a.closure_date, b.closure_date);
        }
    }

    #[test]
    fn test_empty_view_exports_header_only() {
        let bytes = records_csv(&[], &ColumnNames::default()).unwrap();
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_year_counts_csv() {
        let counts = vec![YearCount { year: 2020, count: 1 }, YearCount { year: 2023, count: 2 }];
        let bytes = year_counts_csv(&counts).unwrap();
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        assert_eq!(text, "연도,폐업자 수\n2020,1\n2023,2\n");
    }

    #[test]
    fn test_file_names_follow_view() {
        assert_eq!(ExportView::ClosedList.file_name(), "전체_폐업자_목록.csv");
        assert_ne!(
            ExportView::DuplicateSummary(DuplicateKey::Owner).file_name(),
            ExportView::DuplicateSummary(DuplicateKey::NationalId).file_name()
        );
    }

    #[test]
    fn test_duplicate_groups_csv() {
        let groups = vec![DuplicateGroup { key: "홍길동".to_string(), count: 3 }];
        let bytes = duplicate_groups_csv(&groups, "대표자").unwrap();
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        assert_eq!(text, "대표자,건수\n홍길동,3\n");
    }
}
