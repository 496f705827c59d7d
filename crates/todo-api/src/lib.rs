//! Todo リソースの HTTP API（axum）
//!
//! `/todo` と `/todo/{id}` の 2 パスを提供します。永続化アダプタは
//! `AppState` 経由で外から注入します。

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use infrastructure::TodoRepository;
use serde::Serialize;
use std::sync::Arc;

pub mod error;
pub mod handlers;

pub use error::{ApiError, ErrorBody};

/// アプリケーションの共有状態
#[derive(Clone)]
pub struct AppState {
    repo: Arc<dyn TodoRepository>,
}

impl AppState {
    pub fn new(repo: Arc<dyn TodoRepository>) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &dyn TodoRepository {
        self.repo.as_ref()
    }
}

/// ルータを構築して返します。
pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/todo", any(handlers::dispatch_collection))
        .route("/todo/:id", any(handlers::dispatch_item))
        .with_state(state)
}

/// ヘルスチェック用ハンドラ
async fn health() -> impl IntoResponse {
    let body = HealthBody { status: "ok" };
    (StatusCode::OK, Json(body))
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{self, Body},
        http::Request,
    };
    use domain::{NewTodo, Todo, TodoError, TodoId, TodoResult};
    use std::sync::Mutex;
    use tower::ServiceExt; // for `oneshot`

    /// 書き込みが必ず失敗するストア（エラー経路の観測用）
    #[derive(Default)]
    struct FailingRepository {
        calls: Mutex<Vec<&'static str>>,
    }

    impl TodoRepository for FailingRepository {
        fn create_schema_if_absent(&self) -> TodoResult<()> {
            Ok(())
        }

        fn insert(&self, _todo: &NewTodo) -> TodoResult<Todo> {
            self.calls.lock().unwrap().push("insert");
            Err(TodoError::Storage("disk I/O error".into()))
        }

        fn find_by_id(&self, id: TodoId) -> TodoResult<Option<Todo>> {
            self.calls.lock().unwrap().push("find_by_id");
            Ok(Some(Todo {
                id,
                title: "stored".into(),
                is_done: false,
                creation_date: chrono::Utc::now(),
            }))
        }

        fn find_all(&self) -> TodoResult<Vec<Todo>> {
            Err(TodoError::Storage("disk I/O error".into()))
        }

        fn update(&self, _todo: &Todo) -> TodoResult<()> {
            self.calls.lock().unwrap().push("update");
            Err(TodoError::Storage("database is locked".into()))
        }

        fn delete(&self, _id: TodoId) -> TodoResult<()> {
            Err(TodoError::Storage("database is locked".into()))
        }
    }

    /// 読み出しは成功するが、書き戻しの時点で行が消えているストア
    struct VanishingRepository;

    impl TodoRepository for VanishingRepository {
        fn create_schema_if_absent(&self) -> TodoResult<()> {
            Ok(())
        }

        fn insert(&self, _todo: &NewTodo) -> TodoResult<Todo> {
            unreachable!("insert is not exercised")
        }

        fn find_by_id(&self, id: TodoId) -> TodoResult<Option<Todo>> {
            Ok(Some(Todo {
                id,
                title: "stored".into(),
                is_done: false,
                creation_date: chrono::Utc::now(),
            }))
        }

        fn find_all(&self) -> TodoResult<Vec<Todo>> {
            Ok(Vec::new())
        }

        fn update(&self, todo: &Todo) -> TodoResult<()> {
            Err(TodoError::NotFound(todo.id))
        }

        fn delete(&self, id: TodoId) -> TodoResult<()> {
            Err(TodoError::NotFound(id))
        }
    }

    /// すべての読み出しが失敗するストア
    struct UnreadableRepository;

    impl TodoRepository for UnreadableRepository {
        fn create_schema_if_absent(&self) -> TodoResult<()> {
            Ok(())
        }

        fn insert(&self, _todo: &NewTodo) -> TodoResult<Todo> {
            Err(TodoError::Storage("disk I/O error".into()))
        }

        fn find_by_id(&self, _id: TodoId) -> TodoResult<Option<Todo>> {
            Err(TodoError::Storage("disk I/O error".into()))
        }

        fn find_all(&self) -> TodoResult<Vec<Todo>> {
            Err(TodoError::Storage("disk I/O error".into()))
        }

        fn update(&self, _todo: &Todo) -> TodoResult<()> {
            Err(TodoError::Storage("disk I/O error".into()))
        }

        fn delete(&self, _id: TodoId) -> TodoResult<()> {
            Err(TodoError::Storage("disk I/O error".into()))
        }
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn get_health_returns_ok() {
        let state = AppState::new(Arc::new(FailingRepository::default()));

        let (status, json) = send(app_with_state(state), "GET", "/health", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn post_returns_503_when_insert_fails() {
        let repo = Arc::new(FailingRepository::default());
        let app = app_with_state(AppState::new(repo.clone()));

        let (status, json) = send(app, "POST", "/todo", r#"{"title":"x"}"#).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            json,
            serde_json::json!({"error": 500, "message": "could not insert data"})
        );
        assert_eq!(*repo.calls.lock().unwrap(), vec!["insert"]);
    }

    #[tokio::test]
    async fn put_returns_500_when_write_fails() {
        // 取得は成功し、書き戻しだけが失敗する
        let repo = Arc::new(FailingRepository::default());
        let app = app_with_state(AppState::new(repo.clone()));

        let (status, json) = send(app, "PUT", "/todo", r#"{"id":1,"isDone":true}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json,
            serde_json::json!({"error": 500, "message": "could not update data"})
        );
        assert_eq!(*repo.calls.lock().unwrap(), vec!["find_by_id", "update"]);
    }

    #[tokio::test]
    async fn invalid_body_never_reaches_the_store() {
        let repo = Arc::new(FailingRepository::default());
        let app = app_with_state(AppState::new(repo.clone()));

        let (status, _) = send(app.clone(), "POST", "/todo", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(app, "POST", "/todo", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(repo.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_returns_500_when_store_fails() {
        let app = app_with_state(AppState::new(Arc::new(FailingRepository::default())));

        let (status, json) = send(app, "GET", "/todo", "").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], 500);
    }

    #[tokio::test]
    async fn put_returns_400_when_row_vanishes_before_write() {
        // 取得後に別リクエストで削除された場合
        let app = app_with_state(AppState::new(Arc::new(VanishingRepository)));

        let (status, json) = send(app, "PUT", "/todo", r#"{"id":1,"isDone":true}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json,
            serde_json::json!({"error": 400, "message": "todo id not found"})
        );
    }

    #[tokio::test]
    async fn delete_returns_500_when_store_fails() {
        let app = app_with_state(AppState::new(Arc::new(FailingRepository::default())));

        let (status, json) = send(app, "DELETE", "/todo/1", "").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json,
            serde_json::json!({"error": 500, "message": "could not delete data"})
        );
    }

    #[tokio::test]
    async fn get_returns_500_when_store_fails() {
        let app = app_with_state(AppState::new(Arc::new(UnreadableRepository)));

        let (status, json) = send(app.clone(), "GET", "/todo/1", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], 500);

        let (status, json) = send(app, "GET", "/todo?id=1", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], 500);
    }
}
