use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::error::{CardbookError, Result};

/// Card issuer whose statement layout an adapter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Samsung,
    Kb,
    Other,
}

impl Provider {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Samsung => "samsung",
            Self::Kb => "kb",
            Self::Other => "other",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Samsung => "삼성카드",
            Self::Kb => "국민카드",
            Self::Other => "기타",
        }
    }

    pub fn from_key(key: &str) -> Result<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "samsung" => Ok(Self::Samsung),
            "kb" => Ok(Self::Kb),
            "other" => Ok(Self::Other),
            _ => Err(CardbookError::UnknownProvider(key.to_string())),
        }
    }
}

impl ToSql for Provider {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.key().into())
    }
}

impl FromSql for Provider {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Provider::from_key(value.as_str()?).map_err(|_| FromSqlError::InvalidType)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    Reviewing,
    Confirmed,
    /// Persistable but never produced: abandoning a review deletes the import.
    Cancelled,
}

impl ImportStatus {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Reviewing => "reviewing",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "reviewing" => Ok(Self::Reviewing),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(CardbookError::Other(format!("Unknown import status: {key}"))),
        }
    }
}

impl ToSql for ImportStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.key().into())
    }
}

impl FromSql for ImportStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        ImportStatus::from_key(value.as_str()?).map_err(|_| FromSqlError::InvalidType)
    }
}

#[derive(Debug, Clone)]
pub struct Import {
    pub id: i64,
    pub provider: Provider,
    pub person: String,
    /// First day of the statement month.
    pub statement_month: NaiveDate,
    pub file_name: String,
    pub total_rows: i64,
    pub matched_rows: i64,
    pub status: ImportStatus,
    pub checksum: Option<String>,
    pub created_at: String,
    pub confirmed_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StatementRow {
    pub id: i64,
    pub import_id: i64,
    pub transaction_date: NaiveDate,
    pub merchant_name: String,
    pub amount: u64,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub is_matched: bool,
    pub is_excluded: bool,
    pub is_foreign_currency: bool,
    pub original_data: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MappingRule {
    pub id: i64,
    pub keyword: String,
    pub category_id: i64,
    pub priority: i64,
    pub hit_count: i64,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub person: Option<String>,
}

/// Intermediate representation from a provider adapter before categorization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub date: NaiveDate,
    pub merchant: String,
    pub amount: u64,
    pub is_foreign_currency: bool,
    /// Cell text keyed by column index, kept for audit.
    pub original_cells: Vec<(usize, String)>,
}

/// A raw row after the rule pass, ready to be stored.
#[derive(Debug, Clone)]
pub struct CategorizedRow {
    pub raw: RawRow,
    pub category_id: Option<i64>,
    pub rule_id: Option<i64>,
}

impl CategorizedRow {
    pub fn is_matched(&self) -> bool {
        self.category_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Income => "수입",
            Self::Expense => "지출",
        }
    }

    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(CardbookError::Other(format!("Unknown transaction type: {key}"))),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.key().into())
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        TransactionType::from_key(value.as_str()?).map_err(|_| FromSqlError::InvalidType)
    }
}

/// Ledger entry to be inserted; the ledger owns it afterwards.
#[derive(Debug, Clone)]
pub struct NewLedgerTransaction {
    pub txn_type: TransactionType,
    pub category_id: Option<i64>,
    pub person: String,
    pub description: String,
    pub amount: u64,
    pub transaction_date: NaiveDate,
    pub is_emergency: bool,
    pub card_provider: Option<Provider>,
    pub card_statement_row_id: Option<i64>,
    pub recurring_item_id: Option<i64>,
    pub memo: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecurringItem {
    pub id: i64,
    pub person: String,
    pub category_id: Option<i64>,
    pub name: String,
    pub amount: u64,
    pub is_active: bool,
}

/// Parse a `YYYY-MM` statement month into its first day.
pub fn parse_month(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .map_err(|_| CardbookError::Unparseable(format!("month {raw:?} (expected YYYY-MM)")))
}

pub(crate) fn parse_iso_date(raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}
