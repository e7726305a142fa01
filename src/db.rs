use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const DB_FILE: &str = "cardbook.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    household TEXT NOT NULL,
    name TEXT NOT NULL,
    person TEXT,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (household, name)
);

CREATE TABLE IF NOT EXISTS mapping_rules (
    id INTEGER PRIMARY KEY,
    household TEXT NOT NULL,
    keyword TEXT NOT NULL,
    category_id INTEGER NOT NULL,
    priority INTEGER DEFAULT 0,
    hit_count INTEGER DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (household, keyword),
    FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS card_imports (
    id INTEGER PRIMARY KEY,
    household TEXT NOT NULL,
    card_provider TEXT NOT NULL,
    person TEXT NOT NULL,
    statement_month TEXT NOT NULL,
    file_name TEXT NOT NULL,
    total_rows INTEGER NOT NULL DEFAULT 0,
    matched_rows INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'reviewing'
        CHECK (status IN ('reviewing', 'confirmed', 'cancelled')),
    checksum TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    confirmed_at TEXT
);

CREATE TABLE IF NOT EXISTS card_rows (
    id INTEGER PRIMARY KEY,
    import_id INTEGER NOT NULL,
    transaction_date TEXT NOT NULL,
    merchant_name TEXT NOT NULL,
    amount INTEGER NOT NULL CHECK (amount >= 0),
    category_id INTEGER,
    is_matched INTEGER NOT NULL DEFAULT 0,
    is_excluded INTEGER NOT NULL DEFAULT 0,
    is_foreign_currency INTEGER NOT NULL DEFAULT 0,
    original_data TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (import_id) REFERENCES card_imports(id) ON DELETE CASCADE,
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE INDEX IF NOT EXISTS idx_card_rows_import ON card_rows(import_id);

CREATE TABLE IF NOT EXISTS recurring_items (
    id INTEGER PRIMARY KEY,
    household TEXT NOT NULL,
    person TEXT NOT NULL,
    category_id INTEGER,
    name TEXT NOT NULL,
    amount INTEGER NOT NULL CHECK (amount >= 0),
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    household TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
    category_id INTEGER,
    person TEXT NOT NULL,
    description TEXT NOT NULL,
    amount INTEGER NOT NULL CHECK (amount >= 0),
    transaction_date TEXT NOT NULL,
    is_emergency INTEGER NOT NULL DEFAULT 0,
    card_provider TEXT,
    card_statement_row_id INTEGER,
    recurring_item_id INTEGER,
    memo TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (recurring_item_id) REFERENCES recurring_items(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_recurring ON transactions(recurring_item_id, transaction_date);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
