/*
 * src/constants.rs
 * ゲーム全体の調整用定数
 */

/// 1日に出題する問題数
pub const NUM_QUESTIONS_TO_GENERATE: usize = 5;

/// 問題セットが切り替わる時刻（24時間表記、ローカル時刻）
pub const DAILY_RESET_HOUR: u32 = 8; // 朝8時

/// 1問あたりの制限時間（タイムバーと自動回答用）
pub const MAX_QUESTION_DURATION_MS: u64 = 15_000;

/// 回答後、正誤フィードバックを表示しておく時間
pub const FEEDBACK_DELAY_MS: u64 = 1_500;

// --------------------------------------------------
// スコア関連の定数
// --------------------------------------------------

/// 正解したときの基本スコア
pub const SCORE_CORRECT_ANSWER: f64 = 10.0;

/// 5秒未満で答えたときのタイムボーナス
pub const BONUS_TIME_UNDER_5_SEC: f64 = 5.0;
/// 5秒以上10秒未満のタイムボーナス
pub const BONUS_TIME_BETWEEN_5_AND_10_SEC: f64 = 3.0;

pub const TIME_THRESHOLD_5_SEC_MS: u64 = 5_000;
pub const TIME_THRESHOLD_10_SEC_MS: u64 = 10_000;

/// 3連続正解の瞬間に一度だけ入るボーナス
pub const STREAK_BONUS_3_CORRECT: f64 = 5.0;
/// 5連続正解の瞬間に一度だけ入るボーナス
pub const STREAK_BONUS_5_CORRECT: f64 = 10.0;

pub const STREAK_THRESHOLD_3: u32 = 3;
pub const STREAK_THRESHOLD_5: u32 = 5;
