use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::categories::get_category;
use crate::categorizer::{categorize_rows, load_rules, record_hits};
use crate::error::{CardbookError, Result};
use crate::models::{parse_iso_date, CategorizedRow, Import, ImportStatus, Provider, StatementRow};
use crate::parser::parse_workbook;
use crate::sheet::{load_workbook, Workbook};

/// How many imports `list_imports` returns.
pub const IMPORT_LIST_LIMIT: i64 = 20;

/// Header fields for a new import; totals are derived from the rows.
#[derive(Debug, Clone)]
pub struct NewImport {
    pub provider: Provider,
    pub person: String,
    pub statement_month: NaiveDate,
    pub file_name: String,
    pub checksum: Option<String>,
}

/// An uploaded statement, already read into memory.
#[derive(Debug)]
pub struct UploadRequest<'a> {
    pub workbook: &'a Workbook,
    pub file_name: &'a str,
    pub person: &'a str,
    pub statement_month: NaiveDate,
    pub provider: Option<Provider>,
    pub checksum: Option<String>,
}

const IMPORT_COLUMNS: &str = "id, card_provider, person, statement_month, file_name, \
     total_rows, matched_rows, status, checksum, created_at, confirmed_at";

const ROW_SELECT: &str = "SELECT r.id, r.import_id, r.transaction_date, r.merchant_name, r.amount, \
     r.category_id, c.name, r.is_matched, r.is_excluded, r.is_foreign_currency, r.original_data \
     FROM card_rows r \
     JOIN card_imports i ON r.import_id = i.id \
     LEFT JOIN categories c ON r.category_id = c.id";

fn map_import(row: &rusqlite::Row) -> rusqlite::Result<Import> {
    Ok(Import {
        id: row.get(0)?,
        provider: row.get(1)?,
        person: row.get(2)?,
        statement_month: parse_iso_date(&row.get::<_, String>(3)?)?,
        file_name: row.get(4)?,
        total_rows: row.get(5)?,
        matched_rows: row.get(6)?,
        status: row.get(7)?,
        checksum: row.get(8)?,
        created_at: row.get(9)?,
        confirmed_at: row.get(10)?,
    })
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<StatementRow> {
    Ok(StatementRow {
        id: row.get(0)?,
        import_id: row.get(1)?,
        transaction_date: parse_iso_date(&row.get::<_, String>(2)?)?,
        merchant_name: row.get(3)?,
        amount: row.get::<_, i64>(4)? as u64,
        category_id: row.get(5)?,
        category_name: row.get(6)?,
        is_matched: row.get(7)?,
        is_excluded: row.get(8)?,
        is_foreign_currency: row.get(9)?,
        original_data: row.get(10)?,
    })
}

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Earlier import in this household with the same file contents, if any.
pub fn find_by_checksum(conn: &Connection, household: &str, checksum: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM card_imports WHERE household = ?1 AND checksum = ?2 ORDER BY id DESC LIMIT 1",
            [household, checksum],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn original_data(cells: &[(usize, String)]) -> Result<Option<String>> {
    if cells.is_empty() {
        return Ok(None);
    }
    let map: serde_json::Map<String, serde_json::Value> = cells
        .iter()
        .map(|(col, text)| (col.to_string(), serde_json::Value::String(text.clone())))
        .collect();
    Ok(Some(serde_json::to_string(&map)?))
}

/// Store an import and all of its rows in one transaction.
pub fn create_import(
    conn: &Connection,
    household: &str,
    import: &NewImport,
    rows: &[CategorizedRow],
) -> Result<Import> {
    let matched = rows.iter().filter(|r| r.is_matched()).count();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO card_imports (household, card_provider, person, statement_month, file_name, \
         total_rows, matched_rows, status, checksum) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            household,
            import.provider,
            import.person,
            import.statement_month.format("%Y-%m-01").to_string(),
            import.file_name,
            rows.len() as i64,
            matched as i64,
            ImportStatus::Reviewing,
            import.checksum,
        ],
    )?;
    let import_id = tx.last_insert_rowid();
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO card_rows (import_id, transaction_date, merchant_name, amount, category_id, \
             is_matched, is_excluded, is_foreign_currency, original_data) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8)",
        )?;
        for row in rows {
            stmt.execute(rusqlite::params![
                import_id,
                row.raw.date.format("%Y-%m-%d").to_string(),
                row.raw.merchant,
                row.raw.amount as i64,
                row.category_id,
                row.is_matched(),
                row.raw.is_foreign_currency,
                original_data(&row.raw.original_cells)?,
            ])?;
        }
    }
    record_hits(&tx, rows)?;
    tx.commit()?;

    tracing::info!(import_id, household, rows = rows.len(), matched, "created import");
    get_import(conn, household, import_id)
}

/// Parse, categorize and store an uploaded statement.
pub fn ingest_statement(conn: &Connection, household: &str, request: UploadRequest<'_>) -> Result<Import> {
    let outcome = parse_workbook(request.workbook, request.provider);
    if outcome.rows.is_empty() {
        return Err(CardbookError::EmptyParseResult);
    }
    tracing::debug!(
        provider = outcome.provider.key(),
        sheet = outcome.sheet.as_deref().unwrap_or_default(),
        rows = outcome.rows.len(),
        "parsed statement"
    );
    let rules = load_rules(conn, household)?;
    let rows = categorize_rows(outcome.rows, &rules);
    let import = NewImport {
        provider: outcome.provider,
        person: request.person.to_string(),
        statement_month: request.statement_month,
        file_name: request.file_name.to_string(),
        checksum: request.checksum,
    };
    create_import(conn, household, &import, &rows)
}

/// Read a statement file from disk and ingest it. Re-uploading the same
/// file is allowed; it only produces a warning.
pub fn ingest_file(
    conn: &Connection,
    household: &str,
    file_path: &Path,
    person: &str,
    statement_month: NaiveDate,
    provider: Option<Provider>,
) -> Result<Import> {
    let checksum = compute_checksum(file_path)?;
    if let Some(previous) = find_by_checksum(conn, household, &checksum)? {
        tracing::warn!(previous, "this file was already uploaded");
    }
    let workbook = load_workbook(file_path)?;
    let file_name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    ingest_statement(
        conn,
        household,
        UploadRequest {
            workbook: &workbook,
            file_name,
            person,
            statement_month,
            provider,
            checksum: Some(checksum),
        },
    )
}

pub fn get_import(conn: &Connection, household: &str, import_id: i64) -> Result<Import> {
    conn.query_row(
        &format!("SELECT {IMPORT_COLUMNS} FROM card_imports WHERE household = ?1 AND id = ?2"),
        rusqlite::params![household, import_id],
        map_import,
    )
    .optional()?
    .ok_or_else(|| CardbookError::NotFound(format!("import {import_id}")))
}

/// Most recent imports first.
pub fn list_imports(conn: &Connection, household: &str) -> Result<Vec<Import>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {IMPORT_COLUMNS} FROM card_imports WHERE household = ?1 \
         ORDER BY created_at DESC, id DESC LIMIT ?2"
    ))?;
    let imports = stmt
        .query_map(rusqlite::params![household, IMPORT_LIST_LIMIT], map_import)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(imports)
}

pub fn list_rows(conn: &Connection, household: &str, import_id: i64) -> Result<Vec<StatementRow>> {
    get_import(conn, household, import_id)?;
    let mut stmt = conn.prepare(&format!(
        "{ROW_SELECT} WHERE i.household = ?1 AND r.import_id = ?2 ORDER BY r.transaction_date ASC, r.id ASC"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![household, import_id], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_row(conn: &Connection, household: &str, row_id: i64) -> Result<StatementRow> {
    conn.query_row(
        &format!("{ROW_SELECT} WHERE i.household = ?1 AND r.id = ?2"),
        rusqlite::params![household, row_id],
        map_row,
    )
    .optional()?
    .ok_or_else(|| CardbookError::NotFound(format!("row {row_id}")))
}

fn require_reviewing(conn: &Connection, household: &str, import_id: i64) -> Result<Import> {
    let import = get_import(conn, household, import_id)?;
    if import.status != ImportStatus::Reviewing {
        return Err(CardbookError::Forbidden(format!(
            "import {import_id} is {} and can no longer be edited",
            import.status.key()
        )));
    }
    Ok(import)
}

fn refresh_matched_rows(conn: &Connection, import_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE card_imports SET matched_rows = \
         (SELECT COUNT(*) FROM card_rows WHERE import_id = ?1 AND is_matched = 1) WHERE id = ?1",
        [import_id],
    )?;
    Ok(())
}

/// Assign a category during review. The row counts as matched afterwards.
pub fn set_row_category(conn: &Connection, household: &str, row_id: i64, category_id: i64) -> Result<StatementRow> {
    let row = get_row(conn, household, row_id)?;
    get_category(conn, household, category_id)?;
    require_reviewing(conn, household, row.import_id)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE card_rows SET category_id = ?1, is_matched = 1 WHERE id = ?2",
        rusqlite::params![category_id, row_id],
    )?;
    refresh_matched_rows(&tx, row.import_id)?;
    tx.commit()?;
    get_row(conn, household, row_id)
}

pub fn set_row_excluded(conn: &Connection, household: &str, row_id: i64, excluded: bool) -> Result<StatementRow> {
    let row = get_row(conn, household, row_id)?;
    require_reviewing(conn, household, row.import_id)?;
    conn.execute(
        "UPDATE card_rows SET is_excluded = ?1 WHERE id = ?2",
        rusqlite::params![excluded, row_id],
    )?;
    get_row(conn, household, row_id)
}

/// Drop an import under review together with its rows.
pub fn delete_import(conn: &Connection, household: &str, import_id: i64) -> Result<Import> {
    let import = require_reviewing(conn, household, import_id)?;
    conn.execute("DELETE FROM card_imports WHERE id = ?1", [import_id])?;
    tracing::info!(import_id, household, "deleted import");
    Ok(import)
}
