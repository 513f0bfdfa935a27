// ============================================
// src/dataset.rs
// 類義語データセットの読み込みとキャッシュ
// ============================================

use std::fmt;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// synonyms.json の1レコード
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSynonymEntry {
    pub target_word: String,
    pub correct_synonym: String,
    /// 正解を含む選択肢候補
    pub options_with_correct: Vec<String>,
}

/// データセット読み込みの失敗種別
#[derive(Debug)]
pub enum DatasetError {
    /// ファイルが読めない（存在しない、権限がない等）
    Fetch(String, String),
    /// 読めたが構造が想定と違う（配列でない、フィールドの型違い等）
    Shape(String),
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetError::Fetch(path, err) => {
                write!(f, "Could not read synonym data from '{}': {}", path, err)
            }
            DatasetError::Shape(err) => {
                write!(f, "Invalid data structure in synonym data: {}", err)
            }
        }
    }
}

impl std::error::Error for DatasetError {}

/// データセットのファイルパスとメモリキャッシュを持つストア。
/// 一度読み込みに成功したら `invalidate` されるまで再読み込みしない。
pub struct DatasetStore {
    path: PathBuf,
    cache: Option<Vec<RawSynonymEntry>>,
}

impl DatasetStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, cache: None }
    }

    /// データセットを返す（キャッシュ優先）。
    /// 型付きパースに失敗したデータは一切使わない。
    pub fn load(&mut self) -> Result<&[RawSynonymEntry], DatasetError> {
        if self.cache.is_none() {
            let path_str = self.path.display().to_string();
            let raw = fs::read_to_string(&self.path)
                .map_err(|e| DatasetError::Fetch(path_str.clone(), e.to_string()))?;

            let entries: Vec<RawSynonymEntry> = serde_json::from_str(&raw)
                .map_err(|e| DatasetError::Shape(e.to_string()))?;

            info!(target: "synowiz", path = %path_str, entries = entries.len(), "Loaded synonym dataset");
            self.cache = Some(entries);
        }
        Ok(self.cache.as_deref().unwrap_or(&[]))
    }

    /// キャッシュを破棄する。手動リフレッシュとエラーリトライは
    /// ここを通してからロードし直すので、必ずファイルから読み直される。
    pub fn invalidate(&mut self) {
        if self.cache.is_some() {
            warn!(target: "synowiz", "Dataset cache invalidated; next load re-reads the file");
        }
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        f.write_all(contents.as_bytes()).expect("write");
        f
    }

    #[test]
    fn loads_well_formed_dataset() {
        let f = write_temp(
            r#"[{"targetWord":"happy","correctSynonym":"glad","optionsWithCorrect":["glad","joyful"]}]"#,
        );
        let mut store = DatasetStore::new(f.path().to_path_buf());
        let entries = store.load().expect("load");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target_word, "happy");
        assert_eq!(entries[0].options_with_correct, vec!["glad", "joyful"]);
    }

    #[test]
    fn missing_file_is_a_fetch_error() {
        let mut store = DatasetStore::new(PathBuf::from("/nonexistent/synonyms.json"));
        match store.load() {
            Err(DatasetError::Fetch(path, _)) => assert!(path.contains("synonyms.json")),
            other => panic!("expected Fetch error, got {:?}", other.map(|e| e.len())),
        }
    }

    #[test]
    fn wrong_shape_is_a_shape_error() {
        // 配列ではなくオブジェクト
        let f = write_temp(r#"{"targetWord":"happy"}"#);
        let mut store = DatasetStore::new(f.path().to_path_buf());
        assert!(matches!(store.load(), Err(DatasetError::Shape(_))));

        // 配列だがフィールドの型が違う
        let f = write_temp(r#"[{"targetWord":1,"correctSynonym":"glad","optionsWithCorrect":[]}]"#);
        let mut store = DatasetStore::new(f.path().to_path_buf());
        assert!(matches!(store.load(), Err(DatasetError::Shape(_))));
    }

    #[test]
    fn cache_survives_file_removal_until_invalidated() {
        let f = write_temp(
            r#"[{"targetWord":"big","correctSynonym":"large","optionsWithCorrect":["large"]}]"#,
        );
        let path = f.path().to_path_buf();
        let mut store = DatasetStore::new(path);
        assert!(store.load().is_ok());

        // ファイルを消してもキャッシュからは読める
        drop(f);
        assert!(store.load().is_ok());

        // invalidate 後は読み直しに行って失敗する
        store.invalidate();
        assert!(store.load().is_err());
    }
}
