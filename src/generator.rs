// ============================================
// src/generator.rs
// 日替わり問題セットの生成（3択・重複なし保証）
// ============================================

use std::fmt;

use bincode::{Decode, Encode};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::RawSynonymEntry;
use crate::dictionary::{UniqueStringSet, dedupe_entries_by_target, global_synonym_pool};

/// 1日分の問題1問。options は必ず3つで、trim + 大文字小文字無視で
/// 互いに異なり、correctSynonym をちょうど1つ含む。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuestion {
    pub id: String,
    pub target_word: String,
    pub correct_synonym: String,
    pub options: Vec<String>,
}

/// 問題生成の失敗種別
#[derive(Debug)]
pub enum GenerateError {
    /// ユニークな見出し語が必要数より少ない
    NotEnoughQuestions { required: usize, available: usize },
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::NotEnoughQuestions {
                required,
                available,
            } => write!(
                f,
                "Not enough questions defined. Required: {}, Available: {}",
                required, available
            ),
        }
    }
}

impl std::error::Error for GenerateError {}

/// 1つの見出し語に対する3つの選択肢を組み立てる。
/// 優先順位: 正解 → ローカル類義語 → 全体プールのディストラクタ
/// → フォールバックプール → 合成プレースホルダ。
fn build_options<R: Rng + ?Sized>(
    entry: &RawSynonymEntry,
    pool: &[String],
    rng: &mut R,
) -> Vec<String> {
    let correct = entry.correct_synonym.trim().to_string();
    let target_lower = entry.target_word.trim().to_lowercase();

    let mut selected = UniqueStringSet::new();
    selected.insert(&correct);

    // 1. その見出し語自身の類義語リストから（シャッフルして順に挿入）
    let mut local = UniqueStringSet::new();
    for opt in &entry.options_with_correct {
        local.insert(opt);
    }
    let mut local = local.into_vec();
    local.shuffle(rng);
    for syn in &local {
        if selected.len() >= 3 {
            break;
        }
        selected.insert(syn);
    }

    // 2. まだ足りなければ、全体プールからディストラクタを選ぶ。
    //    見出し語・正解・ローカルリスト既出・選択済みは除外。
    if selected.len() < 3 {
        let correct_lower = correct.to_lowercase();
        let local_lower: Vec<String> = entry
            .options_with_correct
            .iter()
            .map(|o| o.trim().to_lowercase())
            .collect();

        let mut candidates: Vec<&String> = pool
            .iter()
            .filter(|syn| {
                let lower = syn.to_lowercase();
                lower != target_lower
                    && lower != correct_lower
                    && !local_lower.contains(&lower)
                    && !selected.contains_ci(syn)
            })
            .collect();
        candidates.shuffle(rng);
        for syn in candidates {
            if selected.len() >= 3 {
                break;
            }
            selected.insert(syn);
        }
    }

    // 3. それでも足りなければ、除外条件を緩めたフォールバックプール。
    //    ここではローカル類義語も再び候補に入る（見出し語と選択済みだけ除外）。
    if selected.len() < 3 {
        let mut fallback: Vec<&String> = pool
            .iter()
            .filter(|syn| syn.to_lowercase() != target_lower && !selected.contains_ci(syn))
            .collect();
        fallback.shuffle(rng);
        for syn in fallback {
            if selected.len() >= 3 {
                break;
            }
            selected.insert(syn);
        }
    }

    let mut options = selected.into_vec();

    if options.is_empty() {
        // 極端に小さいデータセット用の最終手段
        let mut placeholders = UniqueStringSet::new();
        placeholders.insert(&correct);
        placeholders.insert(&format!("{} (A)", correct));
        placeholders.insert(&format!("{} (B)", correct));
        options = placeholders.into_vec();
        while options.len() < 3 {
            options.push(format!("Option {}", options.len() + 1));
        }
    } else {
        // 末尾の選択肢にラベルを付けて埋める
        let mut fill_counter: u8 = 1;
        while options.len() < 3 {
            let last = options.last().cloned().unwrap_or_else(|| correct.clone());
            let letter = (b'A' + fill_counter) as char;
            fill_counter += 1;
            let mut placeholder = format!("{} ({})", last, letter);
            if options
                .iter()
                .any(|o| o.to_lowercase() == placeholder.to_lowercase())
            {
                placeholder = format!("Extra Option {}", fill_counter);
            }
            options.push(placeholder);
        }
    }

    options.truncate(3);
    options.shuffle(rng);
    options
}

/// ユニークな見出し語1つにつき1問を、入力の初出順で生成する。
/// id は生成パス内で 0 から単調増加。
pub fn generate_all_questions(raw: &[RawSynonymEntry]) -> Vec<DailyQuestion> {
    let pool = global_synonym_pool(raw);
    let mut rng = rand::rng();

    let questions: Vec<DailyQuestion> = dedupe_entries_by_target(raw)
        .into_iter()
        .enumerate()
        .map(|(i, entry)| DailyQuestion {
            id: format!("q_{}", i),
            target_word: entry.target_word.trim().to_string(),
            correct_synonym: entry.correct_synonym.trim().to_string(),
            options: build_options(entry, &pool, &mut rng),
        })
        .collect();

    debug!(target: "synowiz", generated = questions.len(), pool = pool.len(), "Generated question candidates");
    questions
}

/// 全問題からシャッフルして今日の `count` 問を選ぶ。
/// 候補が足りなければ部分的なセットは作らずエラーにする。
pub fn pick_daily_set(
    raw: &[RawSynonymEntry],
    count: usize,
) -> Result<Vec<DailyQuestion>, GenerateError> {
    let mut all = generate_all_questions(raw);
    if all.len() < count {
        return Err(GenerateError::NotEnoughQuestions {
            required: count,
            available: all.len(),
        });
    }
    let mut rng = rand::rng();
    all.shuffle(&mut rng);
    all.truncate(count);
    Ok(all)
}
