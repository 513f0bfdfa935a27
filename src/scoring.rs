// ============================================
// src/scoring.rs
// 1問ごとのスコア計算（タイムボーナス + 連続正解ボーナス）
// ============================================

use crate::constants::{
    BONUS_TIME_BETWEEN_5_AND_10_SEC, BONUS_TIME_UNDER_5_SEC, SCORE_CORRECT_ANSWER,
    STREAK_BONUS_3_CORRECT, STREAK_BONUS_5_CORRECT, STREAK_THRESHOLD_3, STREAK_THRESHOLD_5,
    TIME_THRESHOLD_5_SEC_MS, TIME_THRESHOLD_10_SEC_MS,
};

/// 1問分の採点結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerScore {
    /// 小数2桁に丸めたスコア
    pub score: f64,
    /// この回答を反映した後の連続正解数
    pub streak_after: u32,
}

/// 小数2桁への丸め
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 1問を採点する。
/// 不正解なら 0 点でストリークは 0 に戻る。
/// 正解なら基本点 + タイムボーナス + 連続正解ボーナス。
/// 連続正解ボーナスはしきい値に「到達した瞬間」の1問にだけ付く。
pub fn score_answer(is_correct: bool, time_taken_ms: u64, streak_before: u32) -> AnswerScore {
    if !is_correct {
        return AnswerScore {
            score: 0.0,
            streak_after: 0,
        };
    }

    let streak_after = streak_before + 1;
    let mut score = SCORE_CORRECT_ANSWER;

    if time_taken_ms < TIME_THRESHOLD_5_SEC_MS {
        score += BONUS_TIME_UNDER_5_SEC;
    } else if time_taken_ms < TIME_THRESHOLD_10_SEC_MS {
        score += BONUS_TIME_BETWEEN_5_AND_10_SEC;
    }

    if streak_after == STREAK_THRESHOLD_3 {
        score += STREAK_BONUS_3_CORRECT;
    }
    if streak_after == STREAK_THRESHOLD_5 {
        score += STREAK_BONUS_5_CORRECT;
    }

    AnswerScore {
        score: round2(score),
        streak_after,
    }
}

/// セッション合計 = 丸め済み各問スコアの合計を、さらに2桁に丸めたもの
pub fn total_score<I>(scores: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    round2(scores.into_iter().sum())
}
