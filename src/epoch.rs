// ============================================
// src/epoch.rs
// 「今日の問題」がどの日付に属するかの計算
// ============================================

use chrono::{Days, Local, NaiveDateTime, Timelike};

use crate::constants::DAILY_RESET_HOUR;

/// 現在時刻とリセット時刻から、その時点で有効な問題日付 (YYYY-MM-DD) を返す。
/// リセット時刻より前なら「昨日」のセット扱いになる。
/// 月末・年末またぎは chrono の日付演算に任せる。
pub fn question_date(now: NaiveDateTime, reset_hour: u32) -> String {
    let date = if now.hour() < reset_hour {
        now.date()
            .checked_sub_days(Days::new(1))
            .unwrap_or_else(|| now.date())
    } else {
        now.date()
    };
    date.format("%Y-%m-%d").to_string()
}

/// ローカル時計で今有効な問題日付
pub fn current_question_date() -> String {
    question_date(Local::now().naive_local(), DAILY_RESET_HOUR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .expect("date")
            .and_hms_opt(hh, mm, 0)
            .expect("time")
    }

    #[test]
    fn before_reset_hour_belongs_to_yesterday() {
        assert_eq!(question_date(at(2024, 3, 15, 7, 59), 8), "2024-03-14");
    }

    #[test]
    fn at_reset_hour_belongs_to_today() {
        assert_eq!(question_date(at(2024, 3, 15, 8, 0), 8), "2024-03-15");
        assert_eq!(question_date(at(2024, 3, 15, 23, 59), 8), "2024-03-15");
    }

    #[test]
    fn rollover_crosses_month_and_year_boundaries() {
        // 年またぎ
        assert_eq!(question_date(at(2024, 1, 1, 7, 59), 8), "2023-12-31");
        // 月またぎ（うるう年の3月1日）
        assert_eq!(question_date(at(2024, 3, 1, 0, 30), 8), "2024-02-29");
    }

    #[test]
    fn reset_hour_zero_never_rolls_back() {
        assert_eq!(question_date(at(2024, 5, 10, 0, 0), 0), "2024-05-10");
    }
}
