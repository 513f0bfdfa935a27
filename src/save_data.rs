// ============================================
// src/save_data.rs
// セッションスナップショットの構造と読み書きロジック
// ============================================

use bincode::config::standard;
use bincode::{Decode, Encode};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;

use crate::generator::DailyQuestion;
use crate::session::{GameState, UserAnswer};

// スキーマを変えたらファイル名の版数を上げる
const SAVE_FILE_BIN: &str = "daily_game_v1.bin";
const SAVE_FILE_JSON: &str = "daily_game_v1.json"; // デバッグ用

/// 1日分のセッションスナップショット。
/// 進行系のフィールドは Option にしてあり、欠けたデータでも
/// パース自体は通る（復旧はセッション側の仕事）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct StoredGameData {
    pub questions: Vec<DailyQuestion>,
    #[serde(default)]
    pub current_question_index: Option<usize>,
    #[serde(default)]
    pub user_answers: Option<Vec<UserAnswer>>,
    pub game_state: GameState,
    #[serde(default)]
    pub correct_streak: Option<u32>,
    /// 問題セットを生成した日付 (YYYY-MM-DD)
    #[serde(default)]
    pub questions_generated_date: Option<String>,
}

/// セーブデータを置くディレクトリを取得する
pub fn save_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("jp", "Fukumoto0141", "SYNO_WIZ") {
        let data_dir = proj_dirs.data_dir();
        // ディレクトリがまだなければ作成する
        if !data_dir.exists() {
            let _ = fs::create_dir_all(data_dir);
        }
        return data_dir.to_path_buf();
    }
    // 万が一取得できなかったらカレントディレクトリに（フォールバック）
    PathBuf::from(".")
}

fn decode_bin(buffer: &[u8]) -> Option<StoredGameData> {
    bincode::decode_from_slice::<StoredGameData, _>(buffer, standard())
        .ok()
        .map(|(data, _)| data)
}

fn decode_json(raw: &str) -> Option<StoredGameData> {
    serde_json::from_str(raw).ok()
}

impl StoredGameData {
    /// スナップショットをファイルに保存する (バイナリ + JSON)
    pub fn save(&self) {
        let dir = save_dir();

        // --- 1. バイナリ形式で保存 (本番用) ---
        match File::create(dir.join(SAVE_FILE_BIN)) {
            Ok(file) => {
                let mut writer = BufWriter::new(file);
                if let Ok(encoded) = bincode::encode_to_vec(self, standard()) {
                    let _ = writer.write_all(&encoded);
                }
            }
            Err(e) => warn!(target: "synowiz", error = %e, "Could not write binary snapshot"),
        }

        // --- 2. JSON形式で保存 (デバッグ用) ---
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = fs::write(dir.join(SAVE_FILE_JSON), json);
        }
    }

    /// ファイルからスナップショットを読み込む (バイナリ優先、JSONフォールバック)。
    /// 壊れたデータは None 扱いにして、呼び出し側でデフォルトに戻す。
    pub fn load() -> Option<Self> {
        let dir = save_dir();

        if let Ok(mut file) = File::open(dir.join(SAVE_FILE_BIN)) {
            let mut buffer = Vec::new();
            if file.read_to_end(&mut buffer).is_ok() {
                if let Some(data) = decode_bin(&buffer) {
                    return Some(data);
                }
                warn!(target: "synowiz", "Binary snapshot was corrupt; trying JSON copy");
            }
        }

        if let Ok(raw) = fs::read_to_string(dir.join(SAVE_FILE_JSON)) {
            if let Some(data) = decode_json(&raw) {
                return Some(data);
            }
            warn!(target: "synowiz", "JSON snapshot was corrupt; discarding");
        }

        None
    }

    /// 古い・壊れたスナップショットを消す
    pub fn clear() {
        let dir = save_dir();
        let _ = fs::remove_file(dir.join(SAVE_FILE_BIN));
        let _ = fs::remove_file(dir.join(SAVE_FILE_JSON));
        info!(target: "synowiz", "Cleared stored snapshot");
    }
}
