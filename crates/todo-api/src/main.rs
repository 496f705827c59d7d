//! todo-api バイナリのエントリポイント
//!
//! 設定の読み込み、スキーマ作成、ポートのバインドのいずれかに失敗した場合は
//! リクエストを受け付ける前にプロセスを終了します。

use anyhow::Context;
use infrastructure::SqliteTodoRepository;
use shared::{init_tracing, Config};
use std::sync::Arc;
use todo_api::{app_with_state, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    init_tracing(config.log_format)
        .map_err(|e| anyhow::anyhow!("failed to initialise tracing: {e}"))?;

    // スキーマ作成は open 内で実行される
    let repo = SqliteTodoRepository::open(&config.database_path).with_context(|| {
        format!(
            "failed to open database at {}",
            config.database_path.display()
        )
    })?;
    let state = AppState::new(Arc::new(repo));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        database = %config.database_path.display(),
        "server starting"
    );

    axum::serve(listener, app_with_state(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

/// Ctrl-C を待つ。シグナルを購読できない場合は停止しない
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
