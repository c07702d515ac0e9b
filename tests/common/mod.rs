#![cfg(feature = "rusqlite")]
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rowgate::prelude::*;
use rowgate::sqlite::SqliteExecutor;
use rowgate::{Dialect, KeyDef, RelationDef, Statement};
use rusqlite::Connection;

/// users ─< posts, users ─< team_members
pub fn schema() -> SchemaDef {
    SchemaDef::new()
        .with_table(
            TableDef::new("users")
                .with_column(ColumnDef::new("user_id", SemanticType::Number))
                .with_column(ColumnDef::new("first_name", SemanticType::String))
                .with_column(ColumnDef::new("deleted", SemanticType::Boolean).nullable())
                .with_primary_key(["user_id"])
                .with_relation(RelationDef::new("author_posts", "posts").on("user_id", "author_id"))
                .with_relation(RelationDef::new("memberships", "team_members").on("user_id", "user_id")),
        )
        .with_table(
            TableDef::new("posts")
                .with_column(ColumnDef::new("post_id", SemanticType::Number))
                .with_column(ColumnDef::new("author_id", SemanticType::Number))
                .with_column(ColumnDef::new("message", SemanticType::String))
                .with_column(ColumnDef::new("rating", SemanticType::Number).nullable())
                .with_column(ColumnDef::new("created_at", SemanticType::Date).nullable())
                .with_column(ColumnDef::new("deleted", SemanticType::Boolean).nullable())
                .with_primary_key(["post_id"])
                .with_key(KeyDef::non_unique(["author_id"]))
                .with_relation(RelationDef::new("author", "users").on("author_id", "user_id")),
        )
        .with_table(
            TableDef::new("team_members")
                .with_column(ColumnDef::new("team_id", SemanticType::Number))
                .with_column(ColumnDef::new("user_id", SemanticType::Number))
                .with_column(ColumnDef::new("role", SemanticType::String))
                .with_primary_key(["team_id", "user_id"])
                .with_key(KeyDef::non_unique(["team_id"])),
        )
}

pub fn setup_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    conn.execute_batch(
        "CREATE TABLE users (
             user_id INTEGER PRIMARY KEY,
             first_name TEXT NOT NULL,
             deleted INTEGER
         );
         CREATE TABLE posts (
             post_id INTEGER PRIMARY KEY,
             author_id INTEGER NOT NULL REFERENCES users (user_id),
             message TEXT NOT NULL,
             rating REAL,
             created_at TEXT,
             deleted INTEGER
         );
         CREATE TABLE team_members (
             team_id INTEGER NOT NULL,
             user_id INTEGER NOT NULL REFERENCES users (user_id),
             role TEXT NOT NULL,
             PRIMARY KEY (team_id, user_id)
         );",
    )
    .expect("Failed to create tables");
    conn
}

/// Seeded fixture:
///
/// | user | name | deleted | posts (id: message, rating)           |
/// |------|------|---------|---------------------------------------|
/// | 1    | John |         | 1: "test 2" 4.0, 2: "first" 6.0       |
/// | 2    | Jane |         | 3: "c" 5.0, 4: "a" 5.0, 5: "b" 2.0 (deleted) |
/// | 3    | Zed  |         | none                                  |
/// | 4    | Gone | yes     | 6: "orphan" 1.0                       |
pub fn seeded_db() -> Connection {
    let conn = setup_db();
    conn.execute_batch(
        "INSERT INTO users VALUES (1, 'John', NULL), (2, 'Jane', 0), (3, 'Zed', NULL), (4, 'Gone', 1);
         INSERT INTO posts VALUES
             (1, 1, 'test 2', 4.0, '2024-01-01 09:00:00', NULL),
             (2, 1, 'first', 6.0, '2024-01-02 09:00:00', 0),
             (3, 2, 'c', 5.0, '2024-01-03 09:00:00', NULL),
             (4, 2, 'a', 5.0, '2024-01-04 09:00:00', NULL),
             (5, 2, 'b', 2.0, '2024-01-05 09:00:00', 1),
             (6, 4, 'orphan', 1.0, NULL, NULL);
         INSERT INTO team_members VALUES
             (10, 1, 'owner'), (10, 2, 'member'), (20, 2, 'owner'), (20, 3, 'member');",
    )
    .expect("Failed to seed");
    conn
}

pub fn gate() -> Rowgate {
    Rowgate::new(schema())
}

/// Wraps the SQLite executor, recording every statement and optionally
/// failing the next one.
pub struct CountingExecutor<'c> {
    inner: SqliteExecutor<'c>,
    queries: AtomicUsize,
    executes: AtomicUsize,
    fail_next: AtomicBool,
    log: Mutex<Vec<String>>,
}

impl<'c> CountingExecutor<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            inner: SqliteExecutor::new(conn),
            queries: AtomicUsize::new(0),
            executes: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn executes(&self) -> usize {
        self.executes.load(Ordering::SeqCst)
    }

    pub fn statements(&self) -> usize {
        self.queries() + self.executes()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn last_sql(&self) -> Option<String> {
        self.log.lock().unwrap().last().cloned()
    }

    fn record(&self, statement: &Statement) -> rowgate::Result<()> {
        self.log.lock().unwrap().push(statement.sql.clone());
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(RowgateError::ExecutionFailure("database is locked".into()));
        }
        Ok(())
    }
}

impl Executor for CountingExecutor<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    async fn query(&self, statement: &Statement) -> rowgate::Result<Vec<Row>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.record(statement)?;
        self.inner.query(statement).await
    }

    async fn execute(&self, statement: &Statement) -> rowgate::Result<u64> {
        self.executes.fetch_add(1, Ordering::SeqCst);
        self.record(statement)?;
        self.inner.execute(statement).await
    }
}

pub fn ids(rows: &[Row], column: &str) -> Vec<i64> {
    rows.iter()
        .map(|row| row.get(column).and_then(Value::as_i64).expect("integer id"))
        .collect()
}

pub fn texts(rows: &[Row], column: &str) -> Vec<String> {
    rows.iter()
        .map(|row| row.get(column).and_then(Value::as_str).expect("text").to_string())
        .collect()
}
