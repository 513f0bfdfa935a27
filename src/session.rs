// ============================================
// src/session.rs
// セッション状態マシン（画面遷移・復元・採点の適用）
// ============================================

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::constants::NUM_QUESTIONS_TO_GENERATE;
use crate::dataset::DatasetStore;
use crate::dictionary::{SynonymDictionaryEntry, build_synonym_dictionary};
use crate::epoch;
use crate::generator::{self, DailyQuestion};
use crate::save_data::StoredGameData;
use crate::scoring;

/// ゲーム画面の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    StartScreen,
    Loading,
    Playing,
    Results,
    Error,
    Consultation,
}

/// 1問分の回答記録。追記専用で、後から書き換えない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub question_id: String,
    pub target_word: String,
    pub selected_option: String,
    pub correct_synonym: String,
    pub is_correct: bool,
    /// 小数2桁に丸め済み
    pub score: f64,
}

/// 実行中セッションの全状態。UIイベントを受けて遷移し、
/// Loading / Error 以外の遷移のたびにスナップショットを保存する。
pub struct Session {
    pub game_state: GameState,
    pub questions: Vec<DailyQuestion>,
    pub current_question_index: usize,
    pub user_answers: Vec<UserAnswer>,
    pub correct_streak: u32,
    pub questions_generated_date: Option<String>,
    pub error_message: Option<String>,
    /// 辞書画面用（初回表示時に構築）
    pub dictionary: Vec<SynonymDictionaryEntry>,
    /// 辞書画面に入る直前の状態（戻り先の判定用、保存対象外）
    state_before_consultation: Option<GameState>,
    autosave: bool,
}

impl Session {
    fn fresh() -> Self {
        Self {
            game_state: GameState::StartScreen,
            questions: Vec::new(),
            current_question_index: 0,
            user_answers: Vec::new(),
            correct_streak: 0,
            questions_generated_date: None,
            error_message: None,
            dictionary: Vec::new(),
            state_before_consultation: None,
            autosave: true,
        }
    }

    /// 起動時の復元。保存されたスナップショットを今日のエポックと
    /// 突き合わせ、古いものはファイルごと破棄する。
    pub fn restore() -> Self {
        let snapshot = StoredGameData::load();
        let had_snapshot = snapshot.is_some();
        let today = epoch::current_question_date();
        let session = Self::from_snapshot(snapshot, &today);
        if had_snapshot && session.questions_generated_date.is_none() {
            StoredGameData::clear();
        }
        session
    }

    /// スナップショットと今日の日付から初期状態を決める。
    /// 副作用なしの純粋な判定で、テストはここを直接叩く。
    pub fn from_snapshot(snapshot: Option<StoredGameData>, today: &str) -> Self {
        let mut session = Self::fresh();
        let Some(stored) = snapshot else {
            return session;
        };

        if stored.questions_generated_date.as_deref() != Some(today)
            || stored.questions.is_empty()
        {
            info!(target: "synowiz", "Stored questions are stale or missing; starting fresh");
            return session;
        }

        // 問題セットは今日のものなので、どう転んでも保持する
        session.questions = stored.questions;
        session.questions_generated_date = stored.questions_generated_date;

        match stored.game_state {
            GameState::Loading | GameState::Error | GameState::Consultation => {
                warn!(target: "synowiz", state = ?stored.game_state, "Stored gameState was transient; resetting to start screen");
                session
            }
            state @ (GameState::Playing | GameState::Results) => {
                match (stored.current_question_index, stored.user_answers) {
                    (Some(index), Some(answers)) => {
                        session.game_state = state;
                        session.current_question_index = index;
                        session.user_answers = answers;
                        session.correct_streak = stored.correct_streak.unwrap_or(0);
                        session
                    }
                    _ => {
                        warn!(target: "synowiz", "Stored progress fields missing; resetting progress");
                        session
                    }
                }
            }
            GameState::StartScreen => {
                session.current_question_index = stored.current_question_index.unwrap_or(0);
                session.user_answers = stored.user_answers.unwrap_or_default();
                session.correct_streak = stored.correct_streak.unwrap_or(0);
                session
            }
        }
    }

    pub fn current_question(&self) -> Option<&DailyQuestion> {
        self.questions.get(self.current_question_index)
    }

    pub fn total_score(&self) -> f64 {
        scoring::total_score(self.user_answers.iter().map(|a| a.score))
    }

    /// スタート画面からの開始。同じエポックの問題セットが既に
    /// メモリにあれば再生成せず、カウンタだけリセットして即プレイへ。
    pub fn start_game(&mut self) {
        if self.game_state != GameState::StartScreen {
            return;
        }
        self.error_message = None;
        let today = epoch::current_question_date();
        if self.questions.len() == NUM_QUESTIONS_TO_GENERATE
            && self.questions_generated_date.as_deref() == Some(today.as_str())
        {
            info!(target: "synowiz", "Starting game with existing daily questions");
            self.current_question_index = 0;
            self.user_answers.clear();
            self.correct_streak = 0;
            self.game_state = GameState::Playing;
            self.persist();
        } else {
            info!(target: "synowiz", date = %today, stored = ?self.questions_generated_date, "Need fresh questions");
            self.game_state = GameState::Loading; // Loading は保存しない
        }
    }

    /// 手動リフレッシュ。エポック一致に関係なく必ず再生成する。
    pub fn manual_refresh(&mut self, store: &mut DatasetStore) {
        if self.game_state != GameState::StartScreen {
            return;
        }
        info!(target: "synowiz", "Manual refresh triggered");
        self.error_message = None;
        store.invalidate();
        self.game_state = GameState::Loading;
    }

    /// Loading 中に1度だけ呼ばれる本体。データセットの読み込みと
    /// 問題生成をまとめて行い、失敗は全部 Error 状態に集約する。
    pub fn perform_load(&mut self, store: &mut DatasetStore) {
        if self.game_state != GameState::Loading {
            return;
        }
        let today = epoch::current_question_date();
        info!(target: "synowiz", date = %today, "Performing fresh question load");

        let result = store
            .load()
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                generator::pick_daily_set(raw, NUM_QUESTIONS_TO_GENERATE)
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(daily_set) => {
                self.questions = daily_set;
                self.current_question_index = 0;
                self.user_answers.clear();
                self.correct_streak = 0;
                self.questions_generated_date = Some(today);
                self.game_state = GameState::Playing;
                self.persist();
            }
            Err(message) => {
                error!(target: "synowiz", error = %message, "Question load failed");
                self.questions.clear();
                self.questions_generated_date = None;
                self.error_message = Some(message);
                self.game_state = GameState::Error; // Error は保存しない
            }
        }
    }

    /// エラー画面からのリトライ。キャッシュを捨てて完全にやり直す。
    pub fn retry_on_error(&mut self, store: &mut DatasetStore) {
        if self.game_state != GameState::Error {
            return;
        }
        self.error_message = None;
        store.invalidate();
        self.game_state = GameState::Loading;
    }

    /// 回答確定。タイムアウトによる自動回答もこの1本に乗る。
    pub fn option_selected(&mut self, option: &str, time_taken_ms: u64) {
        if self.game_state != GameState::Playing {
            return;
        }
        let Some(question) = self.current_question() else {
            return;
        };

        let question_id = question.id.clone();
        let target_word = question.target_word.clone();
        let correct_synonym = question.correct_synonym.clone();
        let is_correct = option == correct_synonym;

        let result = scoring::score_answer(is_correct, time_taken_ms, self.correct_streak);
        self.correct_streak = result.streak_after;
        self.user_answers.push(UserAnswer {
            question_id,
            target_word,
            selected_option: option.to_string(),
            correct_synonym,
            is_correct,
            score: result.score,
        });

        if self.current_question_index < self.questions.len() - 1 {
            self.current_question_index += 1;
        } else {
            self.game_state = GameState::Results;
        }
        self.persist();
    }

    /// リザルトからスタート画面へ。問題セットとエポックは残す。
    pub fn play_again(&mut self) {
        if self.game_state != GameState::Results {
            return;
        }
        self.current_question_index = 0;
        self.user_answers.clear();
        self.correct_streak = 0;
        self.game_state = GameState::StartScreen;
        self.persist();
    }

    /// 辞書画面へ。データは一切変更しない純粋なナビゲーション。
    /// 辞書は初回だけデータセットから構築する（失敗しても画面は出す）。
    pub fn go_to_consultation(&mut self, store: &mut DatasetStore) {
        if matches!(self.game_state, GameState::Loading | GameState::Error) {
            return;
        }
        self.state_before_consultation = Some(self.game_state);
        if self.dictionary.is_empty() {
            match store.load() {
                Ok(raw) => self.dictionary = build_synonym_dictionary(raw),
                Err(e) => {
                    warn!(target: "synowiz", error = %e, "Could not load synonym dictionary")
                }
            }
        }
        self.game_state = GameState::Consultation;
        self.persist();
    }

    /// 辞書画面から戻る。直前の状態が有効で、問題セットがまだ
    /// 今日のエポックと一致しているときだけそこへ戻す。
    pub fn go_back_from_consultation(&mut self) {
        if self.game_state != GameState::Consultation {
            return;
        }
        let today = epoch::current_question_date();
        let epoch_matches = self.questions_generated_date.as_deref() == Some(today.as_str())
            && !self.questions.is_empty();

        self.game_state = match self.state_before_consultation.take() {
            Some(state @ (GameState::StartScreen | GameState::Playing | GameState::Results))
                if epoch_matches =>
            {
                state
            }
            _ => GameState::StartScreen,
        };
        self.persist();
    }

    fn to_snapshot(&self) -> StoredGameData {
        StoredGameData {
            questions: self.questions.clone(),
            current_question_index: Some(self.current_question_index),
            user_answers: Some(self.user_answers.clone()),
            game_state: self.game_state,
            correct_streak: Some(self.correct_streak),
            questions_generated_date: self.questions_generated_date.clone(),
        }
    }

    /// Loading / Error 以外の遷移後に呼ぶ。過渡状態を保存してしまうと
    /// 次回起動時にそこへ復帰しようとするので、意図的に除外している。
    fn persist(&self) {
        if !self.autosave {
            return;
        }
        if matches!(self.game_state, GameState::Loading | GameState::Error) {
            return;
        }
        self.to_snapshot().save();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TODAY: &str = "2024-03-15";

    fn question(id: &str, target: &str, correct: &str) -> DailyQuestion {
        DailyQuestion {
            id: id.to_string(),
            target_word: target.to_string(),
            correct_synonym: correct.to_string(),
            options: vec![correct.to_string(), "huge".into(), "rapid".into()],
        }
    }

    fn five_questions() -> Vec<DailyQuestion> {
        (0..5)
            .map(|i| question(&format!("q_{}", i), "happy", "glad"))
            .collect()
    }

    fn snapshot(state: GameState, date: &str) -> StoredGameData {
        StoredGameData {
            questions: five_questions(),
            current_question_index: Some(2),
            user_answers: Some(Vec::new()),
            game_state: state,
            correct_streak: Some(2),
            questions_generated_date: Some(date.to_string()),
        }
    }

    fn test_session(questions: Vec<DailyQuestion>, date: Option<&str>) -> Session {
        let mut session = Session::from_snapshot(None, TODAY);
        session.autosave = false;
        session.questions = questions;
        session.questions_generated_date = date.map(|d| d.to_string());
        session
    }

    fn dataset_file(entries: usize) -> tempfile::NamedTempFile {
        let words = ["happy", "big", "fast", "smart", "cold", "angry", "sad"];
        let items: Vec<String> = (0..entries)
            .map(|i| {
                format!(
                    r#"{{"targetWord":"{w}","correctSynonym":"{w}-syn","optionsWithCorrect":["{w}-syn","{w}-alt","{w}-other"]}}"#,
                    w = words[i % words.len()]
                )
            })
            .collect();
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        f.write_all(format!("[{}]", items.join(",")).as_bytes())
            .expect("write");
        f
    }

    // ---------- 起動時の復元 ----------

    #[test]
    fn no_snapshot_starts_fresh() {
        let session = Session::from_snapshot(None, TODAY);
        assert_eq!(session.game_state, GameState::StartScreen);
        assert!(session.questions.is_empty());
        assert_eq!(session.correct_streak, 0);
    }

    #[test]
    fn stale_epoch_is_discarded_regardless_of_state() {
        for state in [GameState::Playing, GameState::Results, GameState::StartScreen] {
            let session = Session::from_snapshot(Some(snapshot(state, "2024-03-14")), TODAY);
            assert_eq!(session.game_state, GameState::StartScreen);
            assert!(session.questions.is_empty());
            assert_eq!(session.questions_generated_date, None);
        }
    }

    #[test]
    fn empty_question_list_is_treated_as_stale() {
        let mut stored = snapshot(GameState::Playing, TODAY);
        stored.questions.clear();
        let session = Session::from_snapshot(Some(stored), TODAY);
        assert!(session.questions.is_empty());
        assert_eq!(session.questions_generated_date, None);
    }

    #[test]
    fn transient_stored_state_falls_back_to_start_but_keeps_questions() {
        for state in [GameState::Loading, GameState::Error, GameState::Consultation] {
            let session = Session::from_snapshot(Some(snapshot(state, TODAY)), TODAY);
            assert_eq!(session.game_state, GameState::StartScreen);
            assert_eq!(session.questions.len(), 5);
            assert_eq!(session.questions_generated_date.as_deref(), Some(TODAY));
            assert_eq!(session.current_question_index, 0);
            assert_eq!(session.correct_streak, 0);
        }
    }

    #[test]
    fn playing_with_missing_progress_resets_to_start_with_questions() {
        let mut stored = snapshot(GameState::Playing, TODAY);
        stored.current_question_index = None;
        let session = Session::from_snapshot(Some(stored), TODAY);
        assert_eq!(session.game_state, GameState::StartScreen);
        assert_eq!(session.questions.len(), 5);
        assert_eq!(session.current_question_index, 0);
        assert!(session.user_answers.is_empty());

        let mut stored = snapshot(GameState::Results, TODAY);
        stored.user_answers = None;
        let session = Session::from_snapshot(Some(stored), TODAY);
        assert_eq!(session.game_state, GameState::StartScreen);
        assert_eq!(session.questions.len(), 5);
    }

    #[test]
    fn valid_playing_snapshot_resumes_exactly() {
        let session = Session::from_snapshot(Some(snapshot(GameState::Playing, TODAY)), TODAY);
        assert_eq!(session.game_state, GameState::Playing);
        assert_eq!(session.current_question_index, 2);
        assert_eq!(session.correct_streak, 2);
        assert_eq!(session.questions.len(), 5);
    }

    #[test]
    fn absent_streak_defaults_to_zero() {
        let mut stored = snapshot(GameState::Playing, TODAY);
        stored.correct_streak = None;
        let session = Session::from_snapshot(Some(stored), TODAY);
        assert_eq!(session.game_state, GameState::Playing);
        assert_eq!(session.correct_streak, 0);
    }

    // ---------- 遷移 ----------

    #[test]
    fn start_game_with_warm_set_goes_straight_to_playing() {
        let today = epoch::current_question_date();
        let mut session = test_session(five_questions(), Some(&today));
        session.current_question_index = 3;
        session.correct_streak = 4;
        session.start_game();
        assert_eq!(session.game_state, GameState::Playing);
        assert_eq!(session.current_question_index, 0);
        assert_eq!(session.correct_streak, 0);
        assert!(session.user_answers.is_empty());
        assert_eq!(session.questions.len(), 5);
    }

    #[test]
    fn start_game_without_questions_enters_loading() {
        let mut session = test_session(Vec::new(), None);
        session.start_game();
        assert_eq!(session.game_state, GameState::Loading);
    }

    #[test]
    fn start_game_with_stale_set_enters_loading() {
        let mut session = test_session(five_questions(), Some("2001-01-01"));
        session.start_game();
        assert_eq!(session.game_state, GameState::Loading);
    }

    #[test]
    fn perform_load_success_enters_playing() {
        let f = dataset_file(7);
        let mut store = DatasetStore::new(f.path().to_path_buf());
        let mut session = test_session(Vec::new(), None);
        session.game_state = GameState::Loading;
        session.perform_load(&mut store);
        assert_eq!(session.game_state, GameState::Playing);
        assert_eq!(session.questions.len(), NUM_QUESTIONS_TO_GENERATE);
        assert_eq!(
            session.questions_generated_date.as_deref(),
            Some(epoch::current_question_date().as_str())
        );
        assert!(session.error_message.is_none());
    }

    #[test]
    fn perform_load_with_missing_file_enters_error() {
        let mut store = DatasetStore::new(std::path::PathBuf::from("/nonexistent/synonyms.json"));
        let mut session = test_session(Vec::new(), None);
        session.game_state = GameState::Loading;
        session.perform_load(&mut store);
        assert_eq!(session.game_state, GameState::Error);
        assert!(session.error_message.is_some());
        assert!(session.questions.is_empty());
        assert_eq!(session.questions_generated_date, None);
    }

    #[test]
    fn perform_load_with_too_few_words_reports_counts() {
        let f = dataset_file(3);
        let mut store = DatasetStore::new(f.path().to_path_buf());
        let mut session = test_session(Vec::new(), None);
        session.game_state = GameState::Loading;
        session.perform_load(&mut store);
        assert_eq!(session.game_state, GameState::Error);
        let message = session.error_message.expect("message");
        assert!(message.contains("Required: 5"), "{}", message);
        assert!(message.contains("Available: 3"), "{}", message);
    }

    #[test]
    fn answering_all_questions_reaches_results_with_total() {
        let today = epoch::current_question_date();
        let mut session = test_session(five_questions(), Some(&today));
        session.game_state = GameState::Playing;

        // 正解4問（3問目で+5、5問目で+10のストリークボーナス）と不正解1問
        session.option_selected("glad", 3_000); // 15
        session.option_selected("glad", 3_000); // 15
        session.option_selected("glad", 3_000); // 20 (streak 3)
        session.option_selected("huge", 3_000); // 0, streak reset
        assert_eq!(session.game_state, GameState::Playing);
        session.option_selected("glad", 12_000); // 10
        assert_eq!(session.game_state, GameState::Results);
        assert_eq!(session.user_answers.len(), 5);
        assert_eq!(session.total_score(), 60.0);
        assert_eq!(session.correct_streak, 1);
    }

    #[test]
    fn timeout_submission_scores_zero() {
        let today = epoch::current_question_date();
        let mut session = test_session(five_questions(), Some(&today));
        session.game_state = GameState::Playing;
        session.correct_streak = 2;

        // タイムアウトは最大経過時間での不正解扱い
        session.option_selected("huge", crate::constants::MAX_QUESTION_DURATION_MS);
        assert_eq!(session.user_answers[0].score, 0.0);
        assert!(!session.user_answers[0].is_correct);
        assert_eq!(session.correct_streak, 0);
    }

    #[test]
    fn option_selected_is_ignored_outside_playing() {
        let today = epoch::current_question_date();
        let mut session = test_session(five_questions(), Some(&today));
        session.option_selected("glad", 1_000);
        assert!(session.user_answers.is_empty());
        assert_eq!(session.game_state, GameState::StartScreen);
    }

    #[test]
    fn play_again_keeps_question_set_and_epoch() {
        let today = epoch::current_question_date();
        let mut session = test_session(five_questions(), Some(&today));
        session.game_state = GameState::Results;
        session.current_question_index = 4;
        session.correct_streak = 3;
        session.play_again();
        assert_eq!(session.game_state, GameState::StartScreen);
        assert_eq!(session.questions.len(), 5);
        assert_eq!(session.questions_generated_date.as_deref(), Some(today.as_str()));
        assert_eq!(session.current_question_index, 0);
        assert_eq!(session.correct_streak, 0);
    }

    #[test]
    fn consultation_round_trip_restores_prior_state() {
        let f = dataset_file(6);
        let mut store = DatasetStore::new(f.path().to_path_buf());
        let today = epoch::current_question_date();
        let mut session = test_session(five_questions(), Some(&today));

        session.go_to_consultation(&mut store);
        assert_eq!(session.game_state, GameState::Consultation);
        assert!(!session.dictionary.is_empty());

        session.go_back_from_consultation();
        assert_eq!(session.game_state, GameState::StartScreen);
    }

    #[test]
    fn consultation_back_falls_to_start_when_epoch_went_stale() {
        let f = dataset_file(6);
        let mut store = DatasetStore::new(f.path().to_path_buf());
        let mut session = test_session(five_questions(), Some("2001-01-01"));
        session.game_state = GameState::Results;

        session.go_to_consultation(&mut store);
        assert_eq!(session.game_state, GameState::Consultation);
        session.go_back_from_consultation();
        assert_eq!(session.game_state, GameState::StartScreen);
    }

    #[test]
    fn consultation_works_even_when_dictionary_fails_to_load() {
        let mut store = DatasetStore::new(std::path::PathBuf::from("/nonexistent/synonyms.json"));
        let mut session = test_session(Vec::new(), None);
        session.go_to_consultation(&mut store);
        assert_eq!(session.game_state, GameState::Consultation);
        assert!(session.dictionary.is_empty());
    }
}
