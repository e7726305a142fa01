use chrono::{Datelike, Months, NaiveDate};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::categories::get_category;
use crate::error::{CardbookError, Result};
use crate::ledger::insert_transactions;
use crate::models::{NewLedgerTransaction, RecurringItem, TransactionType};

pub const GENERATED_MEMO: &str = "고정지출 자동생성";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateCheck {
    pub duplicate_ids: Vec<i64>,
    pub new_ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateResult {
    pub created: usize,
    pub skipped: usize,
}

fn map_item(row: &rusqlite::Row) -> rusqlite::Result<RecurringItem> {
    Ok(RecurringItem {
        id: row.get(0)?,
        person: row.get(1)?,
        category_id: row.get(2)?,
        name: row.get(3)?,
        amount: row.get::<_, i64>(4)? as u64,
        is_active: row.get(5)?,
    })
}

/// First day of `month` and first day of the month after.
fn month_bounds(month: NaiveDate) -> Result<(String, String)> {
    let start = month.with_day0(0).unwrap_or(month);
    let next = start
        .checked_add_months(Months::new(1))
        .ok_or_else(|| CardbookError::Other(format!("month out of range: {month}")))?;
    Ok((
        start.format("%Y-%m-%d").to_string(),
        next.format("%Y-%m-%d").to_string(),
    ))
}

pub fn add_recurring_item(
    conn: &Connection,
    household: &str,
    name: &str,
    amount: u64,
    person: &str,
    category_id: Option<i64>,
) -> Result<RecurringItem> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CardbookError::Other("Name is required".into()));
    }
    if let Some(id) = category_id {
        get_category(conn, household, id)?;
    }
    conn.execute(
        "INSERT INTO recurring_items (household, person, category_id, name, amount) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![household, person, category_id, name, amount as i64],
    )?;
    Ok(RecurringItem {
        id: conn.last_insert_rowid(),
        person: person.to_string(),
        category_id,
        name: name.to_string(),
        amount,
        is_active: true,
    })
}

pub fn list_recurring_items(conn: &Connection, household: &str) -> Result<Vec<RecurringItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, person, category_id, name, amount, is_active FROM recurring_items \
         WHERE household = ?1 ORDER BY name ASC, id ASC",
    )?;
    let items = stmt
        .query_map([household], map_item)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(items)
}

pub fn set_recurring_active(conn: &Connection, household: &str, id: i64, active: bool) -> Result<()> {
    let changed = conn.execute(
        "UPDATE recurring_items SET is_active = ?1 WHERE household = ?2 AND id = ?3",
        rusqlite::params![active, household, id],
    )?;
    if changed == 0 {
        return Err(CardbookError::NotFound(format!("recurring item {id}")));
    }
    Ok(())
}

/// Split `ids` into templates that already produced a ledger row in `month`
/// and those that have not. Input order is kept.
pub fn check_duplicate_templates(
    conn: &Connection,
    household: &str,
    month: NaiveDate,
    ids: &[i64],
) -> Result<DuplicateCheck> {
    let (start, next) = month_bounds(month)?;
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM transactions WHERE household = ?1 AND recurring_item_id = ?2 \
         AND transaction_date >= ?3 AND transaction_date < ?4",
    )?;
    let mut check = DuplicateCheck::default();
    for &id in ids {
        if stmt.exists(rusqlite::params![household, id, start, next])? {
            check.duplicate_ids.push(id);
        } else {
            check.new_ids.push(id);
        }
    }
    Ok(check)
}

/// Create this month's ledger rows for the selected templates. Inactive or
/// unknown ids are ignored; templates already generated for `month` count as
/// skipped.
pub fn generate_recurring(
    conn: &Connection,
    household: &str,
    month: NaiveDate,
    ids: &[i64],
) -> Result<GenerateResult> {
    if ids.is_empty() {
        return Ok(GenerateResult::default());
    }
    let first_day = month.with_day0(0).unwrap_or(month);

    // Write lock first, so the duplicate check and the inserts see the same ledger.
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut items = Vec::new();
    {
        let mut stmt = tx.prepare_cached(
            "SELECT id, person, category_id, name, amount, is_active FROM recurring_items \
             WHERE household = ?1 AND id = ?2 AND is_active = 1",
        )?;
        for &id in ids {
            if let Some(item) = stmt.query_row(rusqlite::params![household, id], map_item).optional()? {
                items.push(item);
            }
        }
    }

    let active_ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let check = check_duplicate_templates(&tx, household, first_day, &active_ids)?;
    let txns: Vec<NewLedgerTransaction> = items
        .into_iter()
        .filter(|item| check.new_ids.contains(&item.id))
        .map(|item| NewLedgerTransaction {
            txn_type: TransactionType::Expense,
            category_id: item.category_id,
            person: item.person,
            description: item.name,
            amount: item.amount,
            transaction_date: first_day,
            is_emergency: false,
            card_provider: None,
            card_statement_row_id: None,
            recurring_item_id: Some(item.id),
            memo: Some(GENERATED_MEMO.to_string()),
        })
        .collect();

    let created = insert_transactions(&tx, household, &txns)?;
    tx.commit()?;

    let skipped = check.duplicate_ids.len();
    tracing::info!(household, month = %first_day.format("%Y-%m"), created, skipped, "generated recurring expenses");
    Ok(GenerateResult { created, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::add_category;
    use crate::db::tests::test_db;
    use crate::ledger::list_transactions;

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_generate_dates_first_of_month() {
        let (_dir, conn) = test_db();
        let housing = add_category(&conn, "home", "주거", None).unwrap();
        let rent = add_recurring_item(&conn, "home", "월세", 700_000, "공통", Some(housing.id)).unwrap();

        let result = generate_recurring(&conn, "home", month(2024, 3), &[rent.id]).unwrap();
        assert_eq!(result, GenerateResult { created: 1, skipped: 0 });

        let ledger = list_transactions(&conn, "home").unwrap();
        assert_eq!(ledger[0].transaction_date, month(2024, 3));
        assert_eq!(ledger[0].memo.as_deref(), Some(GENERATED_MEMO));
        assert_eq!(ledger[0].recurring_item_id, Some(rent.id));
        assert_eq!(ledger[0].category_name.as_deref(), Some("주거"));
    }

    #[test]
    fn test_generate_twice_skips() {
        let (_dir, conn) = test_db();
        let rent = add_recurring_item(&conn, "home", "월세", 700_000, "공통", None).unwrap();
        generate_recurring(&conn, "home", month(2024, 3), &[rent.id]).unwrap();
        let again = generate_recurring(&conn, "home", month(2024, 3), &[rent.id]).unwrap();
        assert_eq!(again, GenerateResult { created: 0, skipped: 1 });

        let april = generate_recurring(&conn, "home", month(2024, 4), &[rent.id]).unwrap();
        assert_eq!(april.created, 1);
        assert_eq!(list_transactions(&conn, "home").unwrap().len(), 2);
    }

    #[test]
    fn test_check_duplicates_within_month_only() {
        let (_dir, conn) = test_db();
        let rent = add_recurring_item(&conn, "home", "월세", 700_000, "공통", None).unwrap();
        let phone = add_recurring_item(&conn, "home", "통신비", 55_000, "공통", None).unwrap();
        generate_recurring(&conn, "home", month(2024, 12), &[rent.id]).unwrap();

        let dec = check_duplicate_templates(&conn, "home", month(2024, 12), &[rent.id, phone.id]).unwrap();
        assert_eq!(dec.duplicate_ids, vec![rent.id]);
        assert_eq!(dec.new_ids, vec![phone.id]);

        let jan = check_duplicate_templates(&conn, "home", month(2025, 1), &[rent.id]).unwrap();
        assert!(jan.duplicate_ids.is_empty());
    }

    #[test]
    fn test_inactive_and_foreign_items_ignored() {
        let (_dir, conn) = test_db();
        let rent = add_recurring_item(&conn, "home", "월세", 700_000, "공통", None).unwrap();
        let gym = add_recurring_item(&conn, "home", "헬스장", 60_000, "공통", None).unwrap();
        let theirs = add_recurring_item(&conn, "elsewhere", "보험", 90_000, "공통", None).unwrap();
        set_recurring_active(&conn, "home", gym.id, false).unwrap();

        let result = generate_recurring(&conn, "home", month(2024, 3), &[rent.id, gym.id, theirs.id, 999]).unwrap();
        assert_eq!(result, GenerateResult { created: 1, skipped: 0 });
    }

    #[test]
    fn test_empty_selection() {
        let (_dir, conn) = test_db();
        assert_eq!(
            generate_recurring(&conn, "home", month(2024, 3), &[]).unwrap(),
            GenerateResult::default()
        );
    }

    #[test]
    fn test_add_rejects_unknown_category() {
        let (_dir, conn) = test_db();
        assert!(matches!(
            add_recurring_item(&conn, "home", "월세", 1, "공통", Some(77)),
            Err(CardbookError::NotFound(_))
        ));
        assert!(list_recurring_items(&conn, "home").unwrap().is_empty());
    }
}
