// 🧪 Sample table used when nothing was uploaded

use crate::record::Record;

const SAMPLE: [(&str, &str, &str, &str, &str, &str); 7] = [
    ("A상사", "111-11-11111", "홍길동", "800101-1234567", "계속사업자", ""),
    ("B무역", "222-22-22222", "김철수", "820202-2345678", "폐업", "2020-03-01"),
    ("C식당", "333-33-33333", "이영희", "830303-3456789", "폐업", "2021-05-10"),
    ("D전자", "444-44-44444", "박민수", "840404-4567890", "계속사업자", ""),
    ("E상점", "555-55-55555", "최유진", "850505-5678901", "폐업", "2023-01-30"),
    ("F기업", "666-66-66666", "정다혜", "860606-6789012", "계속사업자", ""),
    ("G상회", "777-77-77777", "오성민", "870707-7890123", "계속사업자", ""),
];

/// Seven businesses, three of them closed (2020, 2021, 2023).
pub fn sample_records() -> Vec<Record> {
    SAMPLE
        .iter()
        .map(|&(name, reg, owner, nid, status, closed)| Record::new(name, reg, owner, nid, status, closed))
        .collect()
}
