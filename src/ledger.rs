use rusqlite::Connection;

use crate::error::Result;
use crate::models::{parse_iso_date, NewLedgerTransaction, TransactionType};

/// Header of the transactions CSV. Column order is relied on by spreadsheet users.
pub const TRANSACTIONS_CSV_HEADER: &str = "날짜,유형,인물,카테고리,설명,금액,비상지출,카드사,메모";

const BOM: char = '\u{FEFF}';

#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: i64,
    pub transaction_date: chrono::NaiveDate,
    pub txn_type: TransactionType,
    pub person: String,
    pub category_name: Option<String>,
    pub description: String,
    pub amount: u64,
    pub is_emergency: bool,
    pub card_provider: Option<String>,
    pub card_statement_row_id: Option<i64>,
    pub recurring_item_id: Option<i64>,
    pub memo: Option<String>,
}

impl LedgerEntry {
    /// Where the entry came from: a confirmed statement row or a recurring item.
    pub fn source(&self) -> String {
        match (self.card_statement_row_id, self.recurring_item_id) {
            (Some(row), _) => format!("card row {row}"),
            (None, Some(item)) => format!("recurring {item}"),
            (None, None) => "manual".to_string(),
        }
    }
}

/// Insert ledger rows. Callers own the surrounding transaction.
pub fn insert_transactions(conn: &Connection, household: &str, txns: &[NewLedgerTransaction]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO transactions (household, type, category_id, person, description, amount, \
         transaction_date, is_emergency, card_provider, card_statement_row_id, recurring_item_id, memo) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?;
    for t in txns {
        stmt.execute(rusqlite::params![
            household,
            t.txn_type,
            t.category_id,
            t.person,
            t.description,
            t.amount as i64,
            t.transaction_date.format("%Y-%m-%d").to_string(),
            t.is_emergency,
            t.card_provider.map(|p| p.key()),
            t.card_statement_row_id,
            t.recurring_item_id,
            t.memo,
        ])?;
    }
    Ok(txns.len())
}

/// Ledger rows for a household, newest first.
pub fn list_transactions(conn: &Connection, household: &str) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.transaction_date, t.type, t.person, c.name, t.description, t.amount, \
         t.is_emergency, t.card_provider, t.card_statement_row_id, t.recurring_item_id, t.memo \
         FROM transactions t LEFT JOIN categories c ON t.category_id = c.id \
         WHERE t.household = ?1 ORDER BY t.transaction_date DESC, t.id DESC",
    )?;
    let rows = stmt
        .query_map([household], |row| {
            Ok(LedgerEntry {
                id: row.get(0)?,
                transaction_date: parse_iso_date(&row.get::<_, String>(1)?)?,
                txn_type: row.get(2)?,
                person: row.get(3)?,
                category_name: row.get(4)?,
                description: row.get(5)?,
                amount: row.get::<_, i64>(6)? as u64,
                is_emergency: row.get(7)?,
                card_provider: row.get(8)?,
                card_statement_row_id: row.get(9)?,
                recurring_item_id: row.get(10)?,
                memo: row.get(11)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Render the ledger as the transactions CSV: BOM, fixed Korean header, and
/// text columns always quoted. The mixed quoting is part of the format, so
/// rows are rendered by hand rather than through a CSV writer.
pub fn render_transactions_csv(entries: &[LedgerEntry]) -> String {
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(TRANSACTIONS_CSV_HEADER.to_string());
    for e in entries {
        lines.push(format!(
            "{},{},{},{},{},{},{},{},{}",
            e.transaction_date.format("%Y-%m-%d"),
            e.txn_type.label(),
            e.person,
            quote(e.category_name.as_deref().unwrap_or_default()),
            quote(&e.description),
            e.amount,
            if e.is_emergency { "Y" } else { "N" },
            e.card_provider.as_deref().unwrap_or_default(),
            quote(e.memo.as_deref().unwrap_or_default()),
        ));
    }
    format!("{}{}", BOM, lines.join("\n"))
}

pub fn export_transactions_csv(conn: &Connection, household: &str) -> Result<String> {
    Ok(render_transactions_csv(&list_transactions(conn, household)?))
}
