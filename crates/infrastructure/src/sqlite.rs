use crate::TodoRepository;
use chrono::{DateTime, TimeZone, Utc};
use domain::{NewTodo, Todo, TodoError, TodoId, TodoResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error};

const CREATE_TODO_TABLE: &str = "CREATE TABLE IF NOT EXISTS todo (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title VARCHAR(255) NOT NULL,
    done BOOLEAN DEFAULT 0 NOT NULL,
    createTime DATETIME NOT NULL
)";

/// `todo` テーブルの 1 行（createTime はエポックミリ秒）
type TodoRow = (TodoId, String, bool, i64);

/// SQLite による `TodoRepository` 実装
///
/// 単一コネクションを `Mutex` で共有します。clone は同じコネクションを指します。
#[derive(Clone)]
pub struct SqliteTodoRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTodoRepository {
    /// ファイルを開き、スキーマを作成します。
    pub fn open(path: impl AsRef<Path>) -> TodoResult<Self> {
        let conn = Connection::open(path).map_err(storage_error)?;
        Self::from_connection(conn)
    }

    /// テスト用のインメモリ DB
    pub fn open_in_memory() -> TodoResult<Self> {
        let conn = Connection::open_in_memory().map_err(storage_error)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> TodoResult<Self> {
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.create_schema_if_absent()?;
        Ok(repo)
    }

    fn lock(&self) -> TodoResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TodoError::Storage("sqlite connection mutex poisoned".to_string()))
    }
}

impl TodoRepository for SqliteTodoRepository {
    fn create_schema_if_absent(&self) -> TodoResult<()> {
        let conn = self.lock()?;
        conn.execute(CREATE_TODO_TABLE, []).map_err(storage_error)?;
        debug!("todo table ready");
        Ok(())
    }

    fn insert(&self, todo: &NewTodo) -> TodoResult<Todo> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached("INSERT INTO todo (title, done, createTime) VALUES (?1, ?2, ?3)")
            .map_err(storage_error)?;
        stmt.execute(params![
            todo.title,
            todo.is_done,
            todo.creation_date.timestamp_millis()
        ])
        .map_err(storage_error)?;

        let id = conn.last_insert_rowid();
        if id <= 0 {
            return Err(TodoError::Storage(format!(
                "unexpected rowid {id} after insert"
            )));
        }
        debug!(todo_id = id, "todo inserted");
        Ok(todo.clone().with_id(id))
    }

    fn find_by_id(&self, id: TodoId) -> TodoResult<Option<Todo>> {
        let conn = self.lock()?;
        let row = conn
            .prepare_cached("SELECT id, title, done, createTime FROM todo WHERE id = ?1")
            .map_err(storage_error)?
            .query_row(params![id], read_row)
            .optional()
            .map_err(storage_error)?;

        row.map(row_to_todo).transpose()
    }

    fn find_all(&self) -> TodoResult<Vec<Todo>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached("SELECT id, title, done, createTime FROM todo ORDER BY id ASC")
            .map_err(storage_error)?;
        let rows = stmt
            .query_map([], read_row)
            .map_err(storage_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)?;

        rows.into_iter().map(row_to_todo).collect()
    }

    fn update(&self, todo: &Todo) -> TodoResult<()> {
        let conn = self.lock()?;
        let affected = conn
            .prepare_cached("UPDATE todo SET title = ?1, done = ?2 WHERE id = ?3")
            .map_err(storage_error)?
            .execute(params![todo.title, todo.is_done, todo.id])
            .map_err(storage_error)?;

        if affected == 0 {
            return Err(TodoError::NotFound(todo.id));
        }
        debug!(todo_id = todo.id, "todo updated");
        Ok(())
    }

    fn delete(&self, id: TodoId) -> TodoResult<()> {
        let conn = self.lock()?;
        let affected = conn
            .prepare_cached("DELETE FROM todo WHERE id = ?1")
            .map_err(storage_error)?
            .execute(params![id])
            .map_err(storage_error)?;

        if affected == 0 {
            return Err(TodoError::NotFound(id));
        }
        debug!(todo_id = id, "todo deleted");
        Ok(())
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TodoRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn row_to_todo((id, title, is_done, create_time): TodoRow) -> TodoResult<Todo> {
    let creation_date: DateTime<Utc> = Utc
        .timestamp_millis_opt(create_time)
        .single()
        .ok_or_else(|| {
            TodoError::Storage(format!("invalid createTime {create_time} for todo {id}"))
        })?;

    Ok(Todo {
        id,
        title,
        is_done,
        creation_date,
    })
}

fn storage_error(e: rusqlite::Error) -> TodoError {
    error!(error = %e, "SQLite operation failed");
    TodoError::Storage(e.to_string())
}
