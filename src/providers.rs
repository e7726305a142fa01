use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Provider, RawRow};
use crate::normalize::{normalize_amount, normalize_date};
use crate::sheet::{Cell, Sheet};

/// Header rows are only looked for this far down a sheet.
pub const HEADER_SCAN_ROWS: usize = 15;

// ---------------------------------------------------------------------------
// Header tables
// ---------------------------------------------------------------------------

/// How a cancellation column marks a voided row.
#[derive(Debug, Clone, Copy)]
pub enum CancelRule {
    /// Anything other than blank or `-` means cancelled.
    NonPlaceholder,
    /// Cancelled when the cell matches the pattern.
    Matches(&'static str),
}

#[derive(Debug)]
pub struct HeaderTable {
    pub date: &'static str,
    pub merchant: &'static str,
    pub amount: &'static str,
    pub cancel: Option<(&'static str, CancelRule)>,
    /// Matched against the amount header to flag foreign-currency sheets.
    pub foreign: Option<&'static str>,
    /// Skip rows whose joined text ends with `취소`.
    pub trailing_cancel_marker: bool,
    /// Any group whose patterns all match one row's text detects the layout.
    pub detect: &'static [&'static [&'static str]],
}

pub const SAMSUNG: HeaderTable = HeaderTable {
    date: r"^승인일자$|^이용일(자)?$|^이용일시$|^거래일$",
    merchant: r"^가맹점(명)?$|^이용가맹점$|이용처|상호명",
    amount: r"승인금액|이용금액|결제금액",
    cancel: Some((r"취소여부|취소구분", CancelRule::NonPlaceholder)),
    foreign: Some(r"USD|달러|해외"),
    trailing_cancel_marker: true,
    detect: &[
        &["승인일자", "가맹점명", "승인금액"],
        &["삼성카드|삼성", "이용|가맹점|금액"],
        &["이용일", "가맹점", "이용금액"],
    ],
};

pub const KB: HeaderTable = HeaderTable {
    date: r"^이용일(자)?$|^거래일(자)?$",
    merchant: r"가맹점(명)?$|이용가맹점|이용처",
    amount: r"이용금액$|이용\s?금액$|거래금액",
    cancel: Some((r"결제상태|상태", CancelRule::Matches("취소"))),
    foreign: None,
    trailing_cancel_marker: false,
    detect: &[
        &["국민카드|KB|kb", "이용|가맹점|금액"],
        &["이용일자", "이용가맹점|가맹점"],
    ],
};

pub const GENERIC: HeaderTable = HeaderTable {
    date: r"이용일|거래일|승인일|일자|(?i)date",
    merchant: r"가맹점|이용처|상호|(?i)merchant|description|payee",
    amount: r"이용금액|거래금액|승인금액|금액|(?i)amount",
    cancel: None,
    foreign: None,
    trailing_cancel_marker: false,
    detect: &[],
};

struct CompiledTable {
    date: Regex,
    merchant: Regex,
    amount: Regex,
    cancel: Option<(Regex, CancelMatcher)>,
    foreign: Option<Regex>,
    trailing_cancel_marker: bool,
    detect: Vec<Vec<Regex>>,
}

enum CancelMatcher {
    NonPlaceholder,
    Matches(Regex),
}

fn compile(table: &HeaderTable) -> CompiledTable {
    let re = |p: &str| Regex::new(p).expect("invalid header pattern");
    CompiledTable {
        date: re(table.date),
        merchant: re(table.merchant),
        amount: re(table.amount),
        cancel: table.cancel.map(|(header, rule)| {
            let matcher = match rule {
                CancelRule::NonPlaceholder => CancelMatcher::NonPlaceholder,
                CancelRule::Matches(p) => CancelMatcher::Matches(re(p)),
            };
            (re(header), matcher)
        }),
        foreign: table.foreign.map(re),
        trailing_cancel_marker: table.trailing_cancel_marker,
        detect: table
            .detect
            .iter()
            .map(|group| group.iter().map(|p| re(p)).collect())
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Adapters, one per known layout plus the fallback
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    Samsung,
    Kb,
    Generic,
}

impl Adapter {
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Samsung => Self::Samsung,
            Provider::Kb => Self::Kb,
            Provider::Other => Self::Generic,
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::Samsung => Provider::Samsung,
            Self::Kb => Provider::Kb,
            Self::Generic => Provider::Other,
        }
    }

    pub fn table(&self) -> &'static HeaderTable {
        match self {
            Self::Samsung => &SAMSUNG,
            Self::Kb => &KB,
            Self::Generic => &GENERIC,
        }
    }

    fn compiled(&self) -> &'static CompiledTable {
        static SAMSUNG_RE: OnceLock<CompiledTable> = OnceLock::new();
        static KB_RE: OnceLock<CompiledTable> = OnceLock::new();
        static GENERIC_RE: OnceLock<CompiledTable> = OnceLock::new();
        match self {
            Self::Samsung => SAMSUNG_RE.get_or_init(|| compile(self.table())),
            Self::Kb => KB_RE.get_or_init(|| compile(self.table())),
            Self::Generic => GENERIC_RE.get_or_init(|| compile(self.table())),
        }
    }

    /// Whether the sheet looks like this adapter's layout. Generic always does.
    pub fn detect(&self, sheet: &Sheet) -> bool {
        if *self == Self::Generic {
            return true;
        }
        let table = self.compiled();
        sheet.rows.iter().take(HEADER_SCAN_ROWS).any(|row| {
            let joined = joined_text(row);
            table
                .detect
                .iter()
                .any(|group| group.iter().all(|re| re.is_match(&joined)))
        })
    }

    #[cfg(test)]
    pub fn find_header(&self, sheet: &Sheet) -> Option<HeaderColumns> {
        find_header(self.compiled(), sheet)
    }

    /// Walk the rows below the header. A sheet without a header yields nothing.
    pub fn parse(&self, sheet: &Sheet) -> Vec<RawRow> {
        let table = self.compiled();
        let Some(header) = find_header(table, sheet) else {
            tracing::debug!(adapter = ?self, sheet = %sheet.name, "no header row found");
            return Vec::new();
        };

        let mut rows = Vec::new();
        for row in sheet.rows.iter().skip(header.row + 1) {
            if row.iter().all(Cell::is_empty) {
                continue;
            }
            if let (Some(col), Some((_, matcher))) = (header.cancel, &table.cancel) {
                if is_cancelled(matcher, &cell_text(row, col)) {
                    continue;
                }
            }
            let Ok(date) = normalize_date(cell(row, header.date)) else {
                continue;
            };
            let merchant = cell_text(row, header.merchant);
            let amount = normalize_amount(cell(row, header.amount));
            if merchant.is_empty() || amount == 0 {
                continue;
            }
            if table.trailing_cancel_marker && joined_text(row).trim().ends_with("취소") {
                continue;
            }
            rows.push(RawRow {
                date,
                merchant,
                amount,
                is_foreign_currency: header.is_foreign_currency,
                original_cells: row.iter().map(Cell::text).enumerate().collect(),
            });
        }
        tracing::debug!(adapter = ?self, sheet = %sheet.name, rows = rows.len(), "parsed sheet");
        rows
    }
}

/// Column roles discovered on a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderColumns {
    pub row: usize,
    pub date: usize,
    pub merchant: usize,
    pub amount: usize,
    pub cancel: Option<usize>,
    pub is_foreign_currency: bool,
}

fn find_header(table: &CompiledTable, sheet: &Sheet) -> Option<HeaderColumns> {
    for (i, row) in sheet.rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let (mut date, mut merchant, mut amount, mut cancel) = (None, None, None, None);
        let mut is_foreign_currency = false;
        for (j, c) in row.iter().enumerate() {
            let text = c.text();
            let text = text.trim();
            if date.is_none() && table.date.is_match(text) {
                date = Some(j);
            }
            if merchant.is_none() && table.merchant.is_match(text) {
                merchant = Some(j);
            }
            if amount.is_none() && table.amount.is_match(text) {
                amount = Some(j);
                is_foreign_currency = table.foreign.as_ref().is_some_and(|re| re.is_match(text));
            }
            if let Some((re, _)) = &table.cancel {
                if cancel.is_none() && re.is_match(text) {
                    cancel = Some(j);
                }
            }
        }
        if let (Some(date), Some(merchant), Some(amount)) = (date, merchant, amount) {
            return Some(HeaderColumns {
                row: i,
                date,
                merchant,
                amount,
                cancel,
                is_foreign_currency,
            });
        }
    }
    None
}

fn is_cancelled(matcher: &CancelMatcher, value: &str) -> bool {
    match matcher {
        CancelMatcher::NonPlaceholder => !value.is_empty() && value != "-",
        CancelMatcher::Matches(re) => re.is_match(value),
    }
}

fn cell(row: &[Cell], idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&Cell::Empty)
}

fn cell_text(row: &[Cell], idx: usize) -> String {
    cell(row, idx).text().trim().to_string()
}

fn joined_text(row: &[Cell]) -> String {
    row.iter().map(Cell::text).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const ALL: [Adapter; 3] = [Adapter::Samsung, Adapter::Kb, Adapter::Generic];

    fn samsung_domestic() -> Sheet {
        Sheet::from_text(
            "국내이용내역",
            &[
                &["삼성카드 이용내역"],
                &[],
                &["카드번호", "본인가족구분", "승인일자", "승인시각", "가맹점명", "승인금액(원)", "취소여부"],
                &["1234", "본인", "2024.03.05", "12:10", "스타벅스 강남점", "5,000", "-"],
                &["1234", "본인", "2024.03.06", "18:40", "이마트", "120,000", "취소"],
                &["1234", "본인", "2024.03.07", "09:00", "GS25", "3,200", ""],
            ],
        )
    }

    #[test]
    fn test_every_adapter_compiles_its_table() {
        for adapter in ALL {
            let _ = adapter.compiled();
        }
    }

    #[test]
    fn test_samsung_detect() {
        assert!(Adapter::Samsung.detect(&samsung_domestic()));
        let kb = Sheet::from_text("s", &[&["이용일자", "가맹점명", "거래금액"]]);
        assert!(!Adapter::Samsung.detect(&kb));
        assert!(Adapter::Kb.detect(&kb));
    }

    #[test]
    fn test_kb_detect() {
        let sheet = Sheet::from_text("s", &[&["KB국민카드 이용대금명세서"], &["이용일자", "이용가맹점", "이용금액", "결제상태"]]);
        assert!(Adapter::Kb.detect(&sheet));
        let plain = Sheet::from_text("s", &[&["date", "merchant", "amount"]]);
        assert!(!Adapter::Kb.detect(&plain));
    }

    #[test]
    fn test_generic_always_detects() {
        assert!(Adapter::Generic.detect(&Sheet::from_text("empty", &[])));
    }

    #[test]
    fn test_detect_ignores_rows_past_scan_window() {
        let cover: &[&str] = &["표지"];
        let mut rows: Vec<&[&str]> = vec![cover; HEADER_SCAN_ROWS];
        rows.push(&["승인일자", "가맹점명", "승인금액"]);
        let sheet = Sheet::from_text("late", &rows);
        assert!(!Adapter::Samsung.detect(&sheet));
        assert!(Adapter::Samsung.parse(&sheet).is_empty());
    }

    #[test]
    fn test_samsung_skips_cancelled_rows() {
        let rows = Adapter::Samsung.parse(&samsung_domestic());
        let merchants: Vec<&str> = rows.iter().map(|r| r.merchant.as_str()).collect();
        assert_eq!(merchants, vec!["스타벅스 강남점", "GS25"]);
        assert_eq!(rows[0].amount, 5000);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert!(!rows[0].is_foreign_currency);
        assert_eq!(rows[0].original_cells[4], (4, "스타벅스 강남점".to_string()));
    }

    #[test]
    fn test_samsung_header_discovery() {
        let header = Adapter::Samsung.find_header(&samsung_domestic()).unwrap();
        assert_eq!(
            header,
            HeaderColumns {
                row: 2,
                date: 2,
                merchant: 4,
                amount: 5,
                cancel: Some(6),
                is_foreign_currency: false,
            }
        );
    }

    #[test]
    fn test_samsung_overseas_sheet() {
        let sheet = Sheet::from_text(
            "해외이용내역",
            &[
                &["카드번호", "취소구분", "본인가족구분", "승인일자", "승인시각", "업종", "가맹점명", "승인금액(USD)"],
                &["1234", "", "본인", "2024-03-02", "01:00", "온라인", "AMAZON.COM", "25.40"],
                &["1234", "취소", "본인", "2024-03-03", "01:00", "온라인", "NETFLIX", "15.99"],
            ],
        );
        let rows = Adapter::Samsung.parse(&sheet);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].merchant, "AMAZON.COM");
        assert_eq!(rows[0].amount, 25);
        assert!(rows[0].is_foreign_currency);
    }

    #[test]
    fn test_samsung_trailing_cancel_marker() {
        let sheet = Sheet::from_text(
            "s",
            &[
                &["이용일", "가맹점", "이용금액", "비고"],
                &["2024-03-05", "쿠팡", "15000", "승인취소"],
                &["2024-03-06", "쿠팡", "9000", ""],
            ],
        );
        let rows = Adapter::Samsung.parse(&sheet);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 9000);
    }

    #[test]
    fn test_kb_status_column() {
        let sheet = Sheet::from_text(
            "이용내역",
            &[
                &["이용일자", "이용가맹점", "업종", "이용금액", "결제(예정)금액", "결제상태"],
                &["2024.03.01", "배달의민족", "음식", "23,000", "23,000", "정상"],
                &["2024.03.02", "올리브영", "소매", "41,000", "0", "전체취소"],
                &["2024.03.03", "카카오T", "교통", "12,300", "12,300", ""],
            ],
        );
        let rows = Adapter::Kb.parse(&sheet);
        let merchants: Vec<&str> = rows.iter().map(|r| r.merchant.as_str()).collect();
        assert_eq!(merchants, vec!["배달의민족", "카카오T"]);
    }

    #[test]
    fn test_rows_with_bad_values_are_dropped() {
        let sheet = Sheet::from_text(
            "s",
            &[
                &["거래일", "가맹점", "금액"],
                &["240305", "A", "1000"],
                &["2024-03-05", "", "1000"],
                &["2024-03-05", "B", "0"],
                &["합계", "", "2000"],
                &[],
                &["2024-03-06", "C", "1,500원"],
            ],
        );
        let rows = Adapter::Generic.parse(&sheet);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].merchant, "C");
        assert_eq!(rows[0].amount, 1500);
    }

    #[test]
    fn test_generic_english_headers() {
        let sheet = Sheet::from_text(
            "export",
            &[&["Date", "Description", "Amount"], &["2024-03-05", "Coffee Shop", "-4500"]],
        );
        let rows = Adapter::Generic.parse(&sheet);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 4500);
    }

    #[test]
    fn test_no_header_yields_empty_for_every_adapter() {
        let sheet = Sheet::from_text(
            "summary",
            &[&["청구 요약"], &["결제일", "2024-04-14"], &["총액", "1,000,000"]],
        );
        for adapter in ALL {
            assert!(adapter.parse(&sheet).is_empty(), "{adapter:?}");
        }
    }

    #[test]
    fn test_header_needs_all_roles_on_one_row() {
        let sheet = Sheet::from_text(
            "split",
            &[
                &["승인일자", "", ""],
                &["", "가맹점명", "승인금액"],
                &["2024-03-05", "스타벅스", "5000"],
            ],
        );
        assert!(Adapter::Samsung.parse(&sheet).is_empty());
    }
}
