//! `/todo` リソースのディスパッチと 4 操作
//!
//! メソッドごとの振り分けは明示的な `match` で行い、GET/POST/PUT/DELETE
//! 以外はすべて 405 を返します。各操作は同期的に書かれており、
//! `spawn_blocking` 上で永続化を 1 回だけ行います。

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use domain::{CreateTodoRequest, TodoError, TodoId, TodoPatch};
use serde::Deserialize;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

type ApiResult = Result<Response, ApiError>;

/// `?id=` クエリ
#[derive(Debug, Deserialize)]
pub struct TodoQuery {
    pub id: Option<TodoId>,
}

/// DELETE /todo のボディ `{"id": n}`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TodoRef {
    id: Option<TodoId>,
}

/// `/todo` へのリクエストを振り分ける
pub async fn dispatch_collection(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    query: Result<Query<TodoQuery>, QueryRejection>,
    body: Bytes,
) -> ApiResult {
    info!(method = %method, path = %uri.path(), "Incoming request");

    match method {
        Method::GET => match query_id(query)? {
            Some(id) => blocking(state, move |s| get_todo(s, id)).await,
            None => blocking(state, list_todos).await,
        },
        Method::POST => blocking(state, move |s| create_todo(s, &body)).await,
        Method::PUT => blocking(state, move |s| update_todo(s, None, &body)).await,
        Method::DELETE => {
            let id = match query_id(query)? {
                Some(id) => id,
                None => id_from_body(&body)?,
            };
            blocking(state, move |s| delete_todo(s, id)).await
        }
        _ => Err(ApiError::MethodNotSupported),
    }
}

/// `/todo/{id}` へのリクエストを振り分ける
pub async fn dispatch_item(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    path: Result<Path<TodoId>, PathRejection>,
    body: Bytes,
) -> ApiResult {
    info!(method = %method, path = %uri.path(), "Incoming request");

    match method {
        Method::GET => {
            let id = path_id(path)?;
            blocking(state, move |s| get_todo(s, id)).await
        }
        Method::PUT => {
            let id = path_id(path)?;
            blocking(state, move |s| update_todo(s, Some(id), &body)).await
        }
        Method::DELETE => {
            let id = path_id(path)?;
            blocking(state, move |s| delete_todo(s, id)).await
        }
        _ => Err(ApiError::MethodNotSupported),
    }
}

/// 同期のストア操作をブロッキング用スレッドで実行する
///
/// SQLite の I/O と接続の Mutex 待ちは非同期ワーカー上で行わない。
async fn blocking<F>(state: AppState, op: F) -> ApiResult
where
    F: FnOnce(&AppState) -> ApiResult + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&state))
        .await
        .map_err(|e| ApiError::Storage(format!("blocking task failed: {e}")))?
}

/// POST: タイトルを検証して 1 行挿入し、採番済みの Todo を返す
fn create_todo(state: &AppState, body: &[u8]) -> ApiResult {
    let req: CreateTodoRequest = decode(body)?;
    let new_todo = req.into_new_todo(Utc::now())?;

    let todo = state
        .repo()
        .insert(&new_todo)
        .map_err(|e| ApiError::InsertFailed(e.to_string()))?;

    info!(todo_id = todo.id, "todo created");
    Ok((StatusCode::OK, Json(todo)).into_response())
}

fn get_todo(state: &AppState, id: TodoId) -> ApiResult {
    let todo = state
        .repo()
        .find_by_id(id)
        .map_err(storage_error)?
        .ok_or(ApiError::NotFound)?;

    Ok((StatusCode::OK, Json(todo)).into_response())
}

fn list_todos(state: &AppState) -> ApiResult {
    let todos = state.repo().find_all().map_err(storage_error)?;
    Ok((StatusCode::OK, Json(todos)).into_response())
}

/// PUT: 既存行を取得し、ボディに含まれるフィールドだけを上書きして書き戻す
///
/// 取得と書き戻しは別々の文で実行されるため、同じ id への同時更新は後勝ちになる。
fn update_todo(state: &AppState, path_id: Option<TodoId>, body: &[u8]) -> ApiResult {
    let patch: TodoPatch = decode(body)?;
    let id = path_id.or(patch.id).ok_or(ApiError::IdNotFound)?;

    let current = state
        .repo()
        .find_by_id(id)
        .map_err(storage_error)?
        .ok_or(ApiError::IdNotFound)?;

    let merged = patch.apply_to(current)?;

    state.repo().update(&merged).map_err(|e| match e {
        TodoError::NotFound(_) => ApiError::IdNotFound,
        other => ApiError::UpdateFailed(other.to_string()),
    })?;

    info!(todo_id = id, "todo updated");
    Ok((StatusCode::OK, Json(merged)).into_response())
}

fn delete_todo(state: &AppState, id: TodoId) -> ApiResult {
    state.repo().delete(id).map_err(|e| match e {
        TodoError::NotFound(_) => ApiError::NotFound,
        other => ApiError::DeleteFailed(other.to_string()),
    })?;

    info!(todo_id = id, "todo deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// 未知のキーを含むボディや不正な JSON は一律 `DecodeJson`
fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "failed to decode request body");
        ApiError::DecodeJson
    })
}

fn query_id(
    query: Result<Query<TodoQuery>, QueryRejection>,
) -> Result<Option<TodoId>, ApiError> {
    query.map(|Query(q)| q.id).map_err(|_| ApiError::InvalidId)
}

fn path_id(path: Result<Path<TodoId>, PathRejection>) -> Result<TodoId, ApiError> {
    path.map(|Path(id)| id).map_err(|_| ApiError::InvalidId)
}

fn id_from_body(body: &[u8]) -> Result<TodoId, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::MissingId);
    }
    let todo_ref: TodoRef = decode(body)?;
    todo_ref.id.ok_or(ApiError::MissingId)
}

fn storage_error(e: TodoError) -> ApiError {
    ApiError::Storage(e.to_string())
}
