// 📂 Table Loader - uploaded bytes → typed records
// Reads CSV through an ordered encoding fallback, or the first sheet of a
// workbook. Trims headers and cells and refuses tables missing a required column.

use crate::config::ColumnNames;
use crate::error::LoadError;
use crate::export::UTF8_BOM;
use crate::record::Record;
use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use csv::ReaderBuilder;
use encoding_rs::EUC_KR;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::Path;

// ============================================================================
// DECODING
// ============================================================================

/// Which decoder produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    /// UTF-8, with or without a byte-order mark
    Utf8,
    /// EUC-KR / CP949 (the WHATWG decoder covers the CP949 extensions)
    EucKr,
    /// Nothing decoded cleanly; invalid sequences were replaced
    Utf8Lossy,
    /// Spreadsheet workbook (.xlsx / .xls); cells carry their own text
    Workbook,
}

impl fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceEncoding::Utf8 => write!(f, "utf-8"),
            SourceEncoding::EucKr => write!(f, "cp949"),
            SourceEncoding::Utf8Lossy => write!(f, "utf-8 (lossy)"),
            SourceEncoding::Workbook => write!(f, "workbook"),
        }
    }
}

/// Decode uploaded bytes, trying UTF-8 then CP949 before giving up fidelity.
pub fn decode(bytes: &[u8]) -> (Cow<'_, str>, SourceEncoding) {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    if let Ok(text) = std::str::from_utf8(body) {
        return (Cow::Borrowed(text), SourceEncoding::Utf8);
    }

    if let Some(text) = EUC_KR.decode_without_bom_handling_and_without_replacement(body) {
        return (text, SourceEncoding::EucKr);
    }

    tracing::warn!("upload is neither UTF-8 nor CP949; decoding lossily");
    (String::from_utf8_lossy(body), SourceEncoding::Utf8Lossy)
}

// ============================================================================
// LOADED TABLE
// ============================================================================

#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub records: Vec<Record>,
    /// Trimmed header row, in source order
    pub headers: Vec<String>,
    pub encoding: SourceEncoding,
    /// False when the optional closure-date column was not uploaded
    pub has_closure_date: bool,
}

/// Build records from a header row and data rows, whatever the source format.
fn build_table<I>(
    headers: Vec<String>,
    rows: I,
    encoding: SourceEncoding,
    columns: &ColumnNames,
) -> Result<LoadedTable, LoadError>
where
    I: IntoIterator<Item = Result<Vec<String>, LoadError>>,
{
    let headers: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

    // First occurrence wins when a header repeats
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, h) in headers.iter().enumerate() {
        index.entry(h.as_str()).or_insert(i);
    }

    let missing: Vec<String> = columns
        .required()
        .iter()
        .filter(|c| !index.contains_key(*c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let col = |name: &str| index.get(name).copied();
    let name_idx = col(&columns.name);
    let reg_idx = col(&columns.registration_id);
    let owner_idx = col(&columns.owner_name);
    let nid_idx = col(&columns.national_id);
    let status_idx = col(&columns.status);
    let date_idx = col(&columns.closure_date);

    let extra_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| !columns.is_known(h) || index.get(h.as_str()) != Some(i))
        .map(|(i, _)| i)
        .collect();

    let mut records = Vec::new();
    for row in rows {
        let row = row?;

        let cell = |idx: Option<usize>| -> String {
            idx.and_then(|i| row.get(i))
                .map(|v| v.trim())
                .unwrap_or("")
                .to_string()
        };

        let mut record = Record::new(
            cell(name_idx),
            cell(reg_idx),
            cell(owner_idx),
            cell(nid_idx),
            cell(status_idx),
            cell(date_idx),
        );
        for &i in &extra_idx {
            record.extra.push((headers[i].clone(), cell(Some(i))));
        }

        records.push(record);
    }

    Ok(LoadedTable {
        records,
        headers,
        encoding,
        has_closure_date: date_idx.is_some(),
    })
}

/// Parse decoded CSV text into records.
fn parse_csv(text: &str, encoding: SourceEncoding, columns: &ColumnNames) -> Result<LoadedTable, LoadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let rows = reader.records().enumerate().map(|(line_num, result)| {
        result
            .map(|row| row.iter().map(str::to_string).collect::<Vec<String>>())
            .map_err(|e| {
                tracing::warn!(line = line_num + 2, "unreadable CSV row");
                LoadError::Csv(e)
            })
    });

    build_table(headers, rows, encoding, columns)
}

// ============================================================================
// WORKBOOKS
// ============================================================================

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// True for .xlsx (zip container) and legacy .xls (OLE compound file) bytes.
pub fn is_workbook(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC)
}

/// Cell text as a spreadsheet user would read it; date cells become YYYY-MM-DD.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

/// Parse the first worksheet; its first non-empty row is the header row.
fn parse_workbook(bytes: &[u8], columns: &ColumnNames) -> Result<LoadedTable, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook.worksheet_range_at(0).ok_or(LoadError::EmptyWorkbook)??;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<String>>())
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()));

    let headers = rows.next().ok_or(LoadError::EmptyWorkbook)?;
    build_table(headers, rows.map(Ok::<_, LoadError>), SourceEncoding::Workbook, columns)
}

/// Decode and parse uploaded bytes.
pub fn load_bytes(bytes: &[u8], columns: &ColumnNames) -> Result<LoadedTable, LoadError> {
    let table = if is_workbook(bytes) {
        parse_workbook(bytes, columns)?
    } else {
        let (text, encoding) = decode(bytes);
        parse_csv(&text, encoding, columns)?
    };

    tracing::info!(
        rows = table.records.len(),
        columns = table.headers.len(),
        encoding = %table.encoding,
        "loaded table"
    );

    Ok(table)
}

pub fn load_path(path: &Path, columns: &ColumnNames) -> Result<LoadedTable, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Read {
        path: path.display().to_string(),
        source,
    })?;
    load_bytes(&bytes, columns)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const CSV: &str = "\
상호 , 사업자번호,대표자,주민번호,사업자상태,폐업일자,업종
 A상사 ,111-11-11111,홍길동,800101-1234567,계속사업자,,도매
B무역,222-22-22222,김철수,820202-2345678,폐업,2020-03-01,무역
";

    #[test]
    fn test_parse_trims_headers_and_cells() {
        let table = load_bytes(CSV.as_bytes(), &ColumnNames::default()).unwrap();

        assert_eq!(table.encoding, SourceEncoding::Utf8);
        assert!(table.has_closure_date);
        assert_eq!(table.headers[0], "상호");
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].name, "A상사");
        assert_eq!(table.records[0].closure_date, None);
        assert_eq!(table.records[1].closure_date, NaiveDate::from_ymd_opt(2020, 3, 1));
    }

    #[test]
    fn test_extra_columns_carried_through() {
        let table = load_bytes(CSV.as_bytes(), &ColumnNames::default()).unwrap();
        assert_eq!(table.records[0].extra, vec![("업종".to_string(), "도매".to_string())]);
    }

    #[test]
    fn test_missing_required_columns_is_fatal() {
        let csv = "상호,대표자,사업자상태\nA상사,홍길동,폐업\n";
        let err = load_bytes(csv.as_bytes(), &ColumnNames::default()).unwrap_err();
        match err {
            LoadError::MissingColumns(missing) => {
                assert_eq!(missing, vec!["사업자번호".to_string(), "주민번호".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_closure_date_column_is_optional() {
        let csv = "상호,사업자번호,대표자,주민번호,사업자상태\nA상사,1,홍길동,2,폐업\n";
        let table = load_bytes(csv.as_bytes(), &ColumnNames::default()).unwrap();
        assert!(!table.has_closure_date);
        assert_eq!(table.records[0].closure_date_raw, "");
        assert_eq!(table.records[0].closure_date, None);
    }

    #[test]
    fn test_short_rows_fill_blank() {
        let csv = "상호,사업자번호,대표자,주민번호,사업자상태,폐업일자\nA상사,1,홍길동\n";
        let table = load_bytes(csv.as_bytes(), &ColumnNames::default()).unwrap();
        assert_eq!(table.records[0].national_id, "");
        assert_eq!(table.records[0].status, "");
    }

    #[test]
    fn test_decode_strips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(CSV.as_bytes());
        let (text, enc) = decode(&bytes);
        assert_eq!(enc, SourceEncoding::Utf8);
        assert!(text.starts_with("상호"));
    }

    #[test]
    fn test_decode_cp949() {
        let (encoded, _, had_errors) = EUC_KR.encode(CSV);
        assert!(!had_errors);

        let table = load_bytes(&encoded, &ColumnNames::default()).unwrap();
        assert_eq!(table.encoding, SourceEncoding::EucKr);
        assert_eq!(table.records[1].owner_name, "김철수");
    }

    #[test]
    fn test_decode_lossy_fallback() {
        // 0xFF is invalid in both UTF-8 and EUC-KR
        let bytes = b"a,b\n\xFF,1\n";
        let (text, enc) = decode(bytes);
        assert_eq!(enc, SourceEncoding::Utf8Lossy);
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_custom_column_names() {
        let columns = ColumnNames {
            name: "Business".to_string(),
            registration_id: "RegNo".to_string(),
            owner_name: "Owner".to_string(),
            national_id: "NatId".to_string(),
            status: "Status".to_string(),
            closure_date: "ClosedOn".to_string(),
        };
        let csv = "Business,RegNo,Owner,NatId,Status,ClosedOn\nAcme,1-2,Kim,3-4,closed,2021/05/10\n";
        let table = load_bytes(csv.as_bytes(), &columns).unwrap();
        assert_eq!(table.records[0].closure_year(), Some(2021));
    }

    fn workbook_bytes() -> Vec<u8> {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        let headers = ["상호", "사업자번호", "대표자", "주민번호", "사업자상태", "폐업일자", "업종"];
        for (col, h) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *h).unwrap();
        }

        let rows = [
            ["A상사", "111-11-11111", "홍길동", "800101-1234567", "계속사업자", "도매"],
            ["B무역", "222-22-22222", "김철수", "820202-2345678", "폐업", "무역"],
            ["C식당", "333-33-33333", "이영희", "830303-3456789", "폐업", "음식"],
        ];
        for (r, row) in rows.iter().enumerate() {
            let r = r as u32 + 1;
            for (col, value) in row[..5].iter().enumerate() {
                sheet.write_string(r, col as u16, *value).unwrap();
            }
            sheet.write_string(r, 6, row[5]).unwrap();
        }

        // A real date cell and a yyyymmdd number, as both show up in practice
        let closed_on = ExcelDateTime::from_ymd(2020, 3, 1).unwrap();
        sheet
            .write_datetime_with_format(2, 5, &closed_on, &date_format)
            .unwrap();
        sheet.write_number(3, 5, 20210510).unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_workbook_is_detected() {
        assert!(is_workbook(&workbook_bytes()));
        assert!(!is_workbook(CSV.as_bytes()));
    }

    #[test]
    fn test_load_workbook() {
        let table = load_bytes(&workbook_bytes(), &ColumnNames::default()).unwrap();
        assert_eq!(table.encoding, SourceEncoding::Workbook);
        assert_eq!(table.records.len(), 3);
        assert!(table.has_closure_date);

        let a = &table.records[0];
        assert_eq!(a.name, "A상사");
        assert_eq!(a.closure_date, None);
        assert_eq!(a.extra_value("업종"), Some("도매"));

        let b = &table.records[1];
        assert_eq!(b.closure_date_raw, "2020-03-01");
        assert_eq!(b.closure_date, NaiveDate::from_ymd_opt(2020, 3, 1));

        let c = &table.records[2];
        assert_eq!(c.closure_date, NaiveDate::from_ymd_opt(2021, 5, 10));
    }

    #[test]
    fn test_workbook_missing_columns() {
        use rust_xlsxwriter::Workbook;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "상호").unwrap();
        sheet.write_string(1, 0, "A상사").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let err = load_bytes(&bytes, &ColumnNames::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumns(ref cols) if cols.len() == 4));
    }
}
