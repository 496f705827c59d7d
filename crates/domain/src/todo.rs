use crate::errors::DomainError;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// ストアが採番する Todo の識別子
pub type TodoId = i64;

/// タイトルの最大文字数（`todo.title` 列は VARCHAR(255)）
pub const TITLE_MAX_CHARS: usize = 255;

/// 永続化済みの Todo
///
/// `isDone` は false のとき出力から省略され、入力で省略されたときは false になります。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_done: bool,
    pub creation_date: DateTime<Utc>,
}

/// 挿入前の Todo（id はまだ無い）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub is_done: bool,
    pub creation_date: DateTime<Utc>,
}

impl NewTodo {
    /// タイトルを検証し、完了フラグ false・作成日時 `now` で新規 Todo を組み立てます。
    /// 作成日時はストアの精度（ミリ秒）に切り詰めます。
    pub fn new(title: String, now: DateTime<Utc>) -> Result<Self, DomainError> {
        Ok(Self {
            title: validate_title(title)?,
            is_done: false,
            creation_date: now.trunc_subsecs(3),
        })
    }

    pub fn with_id(self, id: TodoId) -> Todo {
        Todo {
            id,
            title: self.title,
            is_done: self.is_done,
            creation_date: self.creation_date,
        }
    }
}

/// POST /todo リクエスト
///
/// 受け付けるキーは Todo の 4 フィールドのみ。`id` / `isDone` / `creationDate`
/// はサーバ側で上書きされるため読み捨てます。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateTodoRequest {
    pub id: Option<TodoId>,
    pub title: Option<String>,
    pub is_done: Option<bool>,
    pub creation_date: Option<DateTime<Utc>>,
}

impl CreateTodoRequest {
    pub fn into_new_todo(self, now: DateTime<Utc>) -> Result<NewTodo, DomainError> {
        NewTodo::new(self.title.unwrap_or_default(), now)
    }
}

/// PUT /todo リクエスト（部分更新）
///
/// 各フィールドは「無し」か「値あり」。JSON の `null` は無しとして扱います。
/// `id` は対象の特定にのみ使い、`creationDate` は受け付けるが反映しません。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TodoPatch {
    pub id: Option<TodoId>,
    pub title: Option<String>,
    pub is_done: Option<bool>,
    pub creation_date: Option<DateTime<Utc>>,
}

impl TodoPatch {
    /// 値のあるフィールドだけを `todo` に上書きします。
    pub fn apply_to(self, mut todo: Todo) -> Result<Todo, DomainError> {
        if let Some(title) = self.title {
            todo.title = validate_title(title)?;
        }
        if let Some(is_done) = self.is_done {
            todo.is_done = is_done;
        }
        Ok(todo)
    }
}

/// タイトルの不変条件: 空でなく、255 文字以内
pub fn validate_title(title: String) -> Result<String, DomainError> {
    if title.is_empty() {
        return Err(DomainError::EmptyTitle);
    }
    let len = title.chars().count();
    if len > TITLE_MAX_CHARS {
        return Err(DomainError::TitleTooLong(len));
    }
    Ok(title)
}
