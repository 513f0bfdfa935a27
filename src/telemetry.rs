// ============================================
// src/telemetry.rs
// ログ初期化 (tracing / tracing-subscriber)
// ============================================
//
// 画面は ratatui が占有しているので、ログは標準出力ではなく
// データディレクトリ内のファイルに書く。
// フィルタは SYNOWIZ_LOG で上書きできる（例: "debug,synowiz=trace"）。

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub fn init(log_path: &Path) {
    let Ok(file) = File::create(log_path) else {
        // ログが書けなくてもゲームは続行する
        return;
    };

    let filter = EnvFilter::try_from_env("SYNOWIZ_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}
