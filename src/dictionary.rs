// ============================================
// src/dictionary.rs
// 類義語辞書の正規化（重複排除と辞書・候補プールの構築）
// ============================================

use serde::{Deserialize, Serialize};

use crate::dataset::RawSynonymEntry;

/// 挿入順を保ったまま、trim + 大文字小文字無視で重複を弾く文字列集合。
/// 「最初に見たものが勝つ」という性質に依存する処理が多いので、
/// HashSet ではなく明示的にこの形にしている。
#[derive(Debug, Default, Clone)]
pub struct UniqueStringSet {
    items: Vec<String>,
}

impl UniqueStringSet {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// trim した candidate を追加する。既存メンバーと大文字小文字無視で
    /// 一致したら追加せず false を返す。
    pub fn insert(&mut self, candidate: &str) -> bool {
        let trimmed = candidate.trim();
        if self.contains_ci(trimmed) {
            return false;
        }
        self.items.push(trimmed.to_string());
        true
    }

    /// 大文字小文字無視のメンバーシップ判定（candidate は trim 済み前提でなくてよい）
    pub fn contains_ci(&self, candidate: &str) -> bool {
        let lower = candidate.trim().to_lowercase();
        self.items.iter().any(|s| s.to_lowercase() == lower)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.items
    }
}

/// 閲覧（辞書画面）用のエントリ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynonymDictionaryEntry {
    pub target_word: String,
    pub synonyms: Vec<String>,
}

/// targetWord の大文字小文字無視で重複を除き、最初の出現だけ残す
pub fn dedupe_entries_by_target(raw: &[RawSynonymEntry]) -> Vec<&RawSynonymEntry> {
    let mut seen = UniqueStringSet::new();
    raw.iter()
        .filter(|entry| seen.insert(&entry.target_word))
        .collect()
}

/// 辞書画面用の正規化済み辞書を作る。
/// エントリは targetWord（最初に見た表記）ごとに1つで、
/// correctSynonym と optionsWithCorrect 全部をユニーク挿入したもの。
pub fn build_synonym_dictionary(raw: &[RawSynonymEntry]) -> Vec<SynonymDictionaryEntry> {
    let mut entries: Vec<SynonymDictionaryEntry> = dedupe_entries_by_target(raw)
        .into_iter()
        .map(|entry| {
            let mut synonyms = UniqueStringSet::new();
            synonyms.insert(&entry.correct_synonym);
            for opt in &entry.options_with_correct {
                synonyms.insert(opt);
            }
            let mut synonyms = synonyms.into_vec();
            synonyms.sort_by_key(|s| s.to_lowercase());
            SynonymDictionaryEntry {
                target_word: entry.target_word.trim().to_string(),
                synonyms,
            }
        })
        .collect();

    entries.sort_by_key(|e| e.target_word.to_lowercase());
    entries
}

/// データセット全体のディストラクタ候補プール。
/// 各エントリに挿入された類義語すべての和集合を、同じルールで重複排除したもの。
pub fn global_synonym_pool(raw: &[RawSynonymEntry]) -> Vec<String> {
    let mut pool = UniqueStringSet::new();
    for entry in dedupe_entries_by_target(raw) {
        pool.insert(&entry.correct_synonym);
        for opt in &entry.options_with_correct {
            pool.insert(opt);
        }
    }
    pool.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(target: &str, correct: &str, options: &[&str]) -> RawSynonymEntry {
        RawSynonymEntry {
            target_word: target.to_string(),
            correct_synonym: correct.to_string(),
            options_with_correct: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn unique_set_rejects_case_and_whitespace_variants() {
        let mut set = UniqueStringSet::new();
        assert!(set.insert("Glad"));
        assert!(!set.insert("glad"));
        assert!(!set.insert("  GLAD  "));
        assert!(set.insert("joyful"));
        assert_eq!(set.len(), 2);
        // 最初に見た表記が残る
        assert_eq!(set.into_vec(), vec!["Glad", "joyful"]);
    }

    #[test]
    fn dedupe_keeps_first_occurrence_per_target() {
        let raw = vec![
            entry("Happy", "glad", &["glad"]),
            entry("happy", "cheerful", &["cheerful"]),
            entry("big", "large", &["large"]),
        ];
        let deduped = dedupe_entries_by_target(&raw);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].target_word, "Happy");
        assert_eq!(deduped[0].correct_synonym, "glad");
        assert_eq!(deduped[1].target_word, "big");
    }

    #[test]
    fn dictionary_merges_and_sorts_synonyms() {
        let raw = vec![entry("happy", "Glad", &["joyful", "glad ", "Content"])];
        let dict = build_synonym_dictionary(&raw);
        assert_eq!(dict.len(), 1);
        assert_eq!(dict[0].target_word, "happy");
        // "glad " は "Glad" の重複として弾かれ、残りはソートされる
        assert_eq!(dict[0].synonyms, vec!["Content", "Glad", "joyful"]);
    }

    #[test]
    fn global_pool_is_deduplicated_across_entries() {
        let raw = vec![
            entry("happy", "glad", &["glad", "joyful"]),
            entry("content", "Glad", &["satisfied"]),
        ];
        let pool = global_synonym_pool(&raw);
        assert_eq!(pool, vec!["glad", "joyful", "satisfied"]);
    }
}
