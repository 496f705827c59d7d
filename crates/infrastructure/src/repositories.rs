use domain::{NewTodo, Todo, TodoId, TodoResult};

/// Todo の永続化アダプタ
///
/// リクエストごとに並行して呼ばれるため `Send + Sync` を要求します。
/// 各操作は同期的に完了し、トランザクションは張りません。
pub trait TodoRepository: Send + Sync {
    /// テーブルが無ければ作成（冪等）
    fn create_schema_if_absent(&self) -> TodoResult<()>;

    /// 1 行挿入し、採番された id を含む Todo を返す
    fn insert(&self, todo: &NewTodo) -> TodoResult<Todo>;

    fn find_by_id(&self, id: TodoId) -> TodoResult<Option<Todo>>;

    /// 全件を id 昇順で返す
    fn find_all(&self) -> TodoResult<Vec<Todo>>;

    /// `title` と `isDone` のみを書き戻す。対象行が無ければ `TodoError::NotFound`
    fn update(&self, todo: &Todo) -> TodoResult<()>;

    /// 対象行が無ければ `TodoError::NotFound`
    fn delete(&self, id: TodoId) -> TodoResult<()>;
}
