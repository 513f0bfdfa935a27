// ============================================
// src/main.rs (メインファイル)
// ============================================

use std::io::{Result, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

// コアモジュール
mod constants;
mod dataset;
mod dictionary;
mod epoch;
mod generator;
mod save_data;
mod scoring;
mod session;
mod telemetry;

use constants::{FEEDBACK_DELAY_MS, MAX_QUESTION_DURATION_MS};
use dataset::DatasetStore;
use session::{GameState, Session};

use clap::Parser;

use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    cursor::{Hide, Show},
};

use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Gauge},
};

/// コマンドライン引数
#[derive(Parser)]
#[command(name = "synowiz", about = "SYNO WiZ. Daily synonym quiz in the terminal.")]
struct Args {
    /// 類義語データセット (JSON) のパス
    #[arg(long, default_value = "synonyms.json")]
    data: PathBuf,
}

// --------------------------------------------------
// データ構造
// --------------------------------------------------

/// 確定待ちの回答。フィードバック表示が終わるまでここに置いておき、
/// 表示が終わった時点で初めてセッションに反映する。
/// 手動回答とタイムアウトの両方がこの1本を通るので、
/// 同じ問題に2回回答が入ることはない。
struct PendingAnswer {
    option: String,
    time_taken_ms: u64,
    is_correct: bool,
    shown_at: Instant,
}

/// アプリ全体の状態
struct AppState {
    session: Session,
    store: DatasetStore,

    /// 現在の問題の出題時刻（Playing 中のみ）
    question_start: Option<Instant>,
    /// フィードバック表示中の回答
    pending: Option<PendingAnswer>,

    /// 辞書画面の検索語
    search_term: String,
}

impl AppState {
    fn new(data_path: PathBuf) -> Self {
        Self {
            session: Session::restore(), // 起動時にスナップショットから復元
            store: DatasetStore::new(data_path),
            question_start: None,
            pending: None,
            search_term: String::new(),
        }
    }

    /// 現在の問題の経過時間
    fn elapsed_ms(&self) -> u64 {
        self.question_start
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    /// 問題が切り替わったらタイマーと確定待ちを必ずリセットする
    fn reset_question_timer(&mut self) {
        self.pending = None;
        self.question_start = if self.session.game_state == GameState::Playing {
            Some(Instant::now())
        } else {
            None
        };
    }

    /// 描画ループごとの時間駆動の更新。タイマー関連はすべてここ。
    fn tick(&mut self) {
        // Loading は1フレーム描画してから実処理に入る
        if self.session.game_state == GameState::Loading {
            self.session.perform_load(&mut self.store);
            self.reset_question_timer();
            return;
        }

        if self.session.game_state != GameState::Playing {
            return;
        }

        // フィードバック表示が終わったら回答を確定して次へ
        if let Some(pending) = &self.pending {
            if pending.shown_at.elapsed() >= Duration::from_millis(FEEDBACK_DELAY_MS) {
                let option = pending.option.clone();
                let time_taken_ms = pending.time_taken_ms;
                self.pending = None;
                self.session.option_selected(&option, time_taken_ms);
                self.reset_question_timer();
            }
            return;
        }

        // 制限時間切れ: 最大経過時間での不正解として自動確定する
        let start = *self.question_start.get_or_insert_with(Instant::now);
        if start.elapsed().as_millis() as u64 >= MAX_QUESTION_DURATION_MS {
            // 正解ではない選択肢をダミーとして記録する（0点確定）
            let dummy = self
                .session
                .current_question()
                .and_then(|q| q.options.iter().find(|o| **o != q.correct_synonym))
                .cloned()
                .unwrap_or_default();
            self.pending = Some(PendingAnswer {
                option: dummy,
                time_taken_ms: MAX_QUESTION_DURATION_MS,
                is_correct: false,
                shown_at: Instant::now(),
            });
        }
    }

    /// 選択肢キー (1〜3) の処理
    fn select_option(&mut self, index: usize) {
        if self.session.game_state != GameState::Playing || self.pending.is_some() {
            return; // 回答済み・タイムアウト後は受け付けない
        }
        let Some(question) = self.session.current_question() else {
            return;
        };
        let Some(option) = question.options.get(index) else {
            return;
        };
        let time_taken_ms = self.elapsed_ms().min(MAX_QUESTION_DURATION_MS);
        self.pending = Some(PendingAnswer {
            option: option.clone(),
            time_taken_ms,
            is_correct: *option == question.correct_synonym,
            shown_at: Instant::now(),
        });
    }
}

// --------------------------------------------------
// メイン関数 (TUIセットアップと実行ループ)
// --------------------------------------------------

fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init(&save_data::save_dir().join("synowiz.log"));

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, args);
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?; // 代替スクリーンを使用
    stdout().execute(Hide)?; // カーソルを非表示
    let backend = CrosstermBackend::new(stdout());
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(_terminal: &mut Terminal<impl Backend>) -> Result<()> {
    stdout().execute(Show)?; // カーソルを再表示
    stdout().execute(LeaveAlternateScreen)?; // 代替スクリーンを終了
    disable_raw_mode()?;
    Ok(())
}

fn run_app(terminal: &mut Terminal<impl Backend>, args: Args) -> Result<()> {
    let mut app_state = AppState::new(args.data);

    loop {
        terminal.draw(|f| ui(f, &app_state))?;
        app_state.tick();

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == event::KeyEventKind::Press {
                    match app_state.session.game_state {
                        GameState::StartScreen => match key.code {
                            KeyCode::Esc => break,
                            KeyCode::Enter => {
                                app_state.session.start_game();
                                app_state.reset_question_timer();
                            }
                            KeyCode::Char('r') => {
                                app_state.session.manual_refresh(&mut app_state.store);
                            }
                            KeyCode::Char('c') => {
                                app_state.search_term.clear();
                                app_state.session.go_to_consultation(&mut app_state.store);
                            }
                            _ => {}
                        },
                        GameState::Playing => match key.code {
                            KeyCode::Esc => break,
                            KeyCode::Char(c @ '1'..='3') => {
                                app_state.select_option(c as usize - '1' as usize);
                            }
                            _ => {}
                        },
                        GameState::Results => match key.code {
                            KeyCode::Esc => break,
                            KeyCode::Enter => {
                                app_state.session.play_again();
                                app_state.reset_question_timer();
                            }
                            _ => {}
                        },
                        GameState::Error => match key.code {
                            KeyCode::Esc => break,
                            KeyCode::Char('r') => {
                                app_state.session.retry_on_error(&mut app_state.store);
                            }
                            _ => {}
                        },
                        GameState::Consultation => match key.code {
                            KeyCode::Esc => {
                                app_state.session.go_back_from_consultation();
                            }
                            KeyCode::Backspace => {
                                app_state.search_term.pop();
                            }
                            KeyCode::Char(c) => {
                                app_state.search_term.push(c);
                            }
                            _ => {}
                        },
                        GameState::Loading => {}
                    }
                }
            }
        }
    }

    Ok(())
}

// --------------------------------------------------
// UI描画
// --------------------------------------------------

fn ui(f: &mut Frame, app_state: &AppState) {
    let size = f.area();
    // 枠線を描画
    let block = Block::default().borders(Borders::ALL).title("SYNO WiZ !");
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    match app_state.session.game_state {
        GameState::StartScreen => ui_start(f, inner_area, &app_state.session),
        GameState::Loading => ui_loading(f, inner_area),
        GameState::Playing => ui_playing(f, inner_area, app_state),
        GameState::Results => ui_results(f, inner_area, &app_state.session),
        GameState::Error => ui_error(f, inner_area, &app_state.session),
        GameState::Consultation => ui_consultation(f, inner_area, app_state),
    }
}

fn ui_start(f: &mut Frame, area: Rect, session: &Session) {
    let ready = if session.questions.is_empty() {
        Line::from("No questions loaded yet for today.")
            .style(Style::default().fg(Color::DarkGray))
    } else {
        Line::from(format!(
            "Questions ready for {}",
            session.questions_generated_date.as_deref().unwrap_or("-")
        ))
        .style(Style::default().fg(Color::Green))
    };

    let lines = vec![
        Line::from("Daily Synonym Quiz").style(Style::default().fg(Color::White).bold()),
        Line::from(""),
        ready,
        Line::from(""),
        Line::from("Enter: Start today's quiz"),
        Line::from("r:     Refresh questions"),
        Line::from("c:     Synonym dictionary"),
        Line::from("Esc:   Quit"),
    ];
    f.render_widget(Paragraph::new(lines).centered(), area);
}

fn ui_loading(f: &mut Frame, area: Rect) {
    f.render_widget(
        Paragraph::new("Loading today's questions...")
            .style(Style::default().fg(Color::Yellow))
            .centered(),
        area,
    );
}

fn ui_playing(f: &mut Frame, area: Rect, app_state: &AppState) {
    let session = &app_state.session;
    let Some(question) = session.current_question() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] 問題番号とストリーク
            Constraint::Length(1), // [1] 残り時間ゲージ
            Constraint::Length(1), // [2] 空白
            Constraint::Length(1), // [3] 問いかけ
            Constraint::Length(2), // [4] 見出し語
            Constraint::Length(4), // [5] 選択肢
            Constraint::Min(1),    // [6] フィードバック
        ])
        .split(area);

    // 0. ステータスバー
    let status = format!(
        "Question {} / {}   Streak: {}",
        session.current_question_index + 1,
        session.questions.len(),
        session.correct_streak
    );
    f.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Yellow)),
        chunks[0],
    );

    // 1. 残り時間ゲージ（確定待ちの間は回答時点の値で止める）
    let elapsed = match &app_state.pending {
        Some(p) => p.time_taken_ms,
        None => app_state.elapsed_ms(),
    }
    .min(MAX_QUESTION_DURATION_MS);
    let remaining = MAX_QUESTION_DURATION_MS - elapsed;
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::NONE))
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
        .ratio(remaining as f64 / MAX_QUESTION_DURATION_MS as f64)
        .label(format!("{:.1}s", remaining as f64 / 1000.0));
    f.render_widget(gauge, chunks[1]);

    // 3. 問いかけと見出し語
    f.render_widget(
        Paragraph::new("Which word means the same as:")
            .style(Style::default().fg(Color::Gray))
            .centered(),
        chunks[3],
    );
    f.render_widget(
        Paragraph::new(question.target_word.as_str())
            .style(Style::default().fg(Color::White).bold())
            .centered(),
        chunks[4],
    );

    // 5. 選択肢（確定待ちの間は正誤を色で見せる）
    let mut option_lines = Vec::new();
    for (i, option) in question.options.iter().enumerate() {
        let style = match &app_state.pending {
            Some(pending) if *option == pending.option => {
                if pending.is_correct {
                    Style::default().fg(Color::Black).bg(Color::Green)
                } else {
                    Style::default().fg(Color::White).bg(Color::Red)
                }
            }
            Some(_) if *option == question.correct_synonym => {
                Style::default().fg(Color::Green).bold()
            }
            Some(_) => Style::default().fg(Color::DarkGray),
            None => Style::default().fg(Color::White),
        };
        option_lines.push(Line::from(vec![
            Span::styled(format!("{}) ", i + 1), Style::default().fg(Color::Cyan)),
            Span::styled(option.as_str(), style),
        ]));
    }
    f.render_widget(Paragraph::new(option_lines).centered(), chunks[5]);

    // 6. フィードバック
    let feedback = match &app_state.pending {
        Some(p) if p.time_taken_ms >= MAX_QUESTION_DURATION_MS && !p.is_correct => {
            Line::from("Time's up!").style(Style::default().fg(Color::Red))
        }
        Some(p) if p.is_correct => {
            Line::from("Correct!").style(Style::default().fg(Color::Green))
        }
        Some(_) => Line::from(format!("Wrong! Answer: {}", question.correct_synonym))
            .style(Style::default().fg(Color::Red)),
        None => Line::from("Press 1-3 to answer").style(Style::default().fg(Color::DarkGray)),
    };
    f.render_widget(Paragraph::new(feedback).centered(), chunks[6]);
}

fn ui_results(f: &mut Frame, area: Rect, session: &Session) {
    let mut lines = vec![
        Line::from("Results").style(Style::default().fg(Color::White).bold()),
        Line::from(""),
    ];

    for answer in &session.user_answers {
        let (mark, color) = if answer.is_correct {
            ("o", Color::Green)
        } else {
            ("x", Color::Red)
        };
        lines.push(
            Line::from(format!(
                "{} {} -> {}  (+{:.2})",
                mark, answer.target_word, answer.correct_synonym, answer.score
            ))
            .style(Style::default().fg(color)),
        );
    }

    lines.push(Line::from(""));
    lines.push(
        Line::from(format!("Total score: {:.2}", session.total_score()))
            .style(Style::default().fg(Color::Yellow).bold()),
    );
    lines.push(Line::from(""));
    lines.push(
        Line::from("Enter: Back to start / Esc: Quit").style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(Paragraph::new(lines).centered(), area);
}

fn ui_error(f: &mut Frame, area: Rect, session: &Session) {
    let message = session
        .error_message
        .as_deref()
        .unwrap_or("An unknown error occurred.");
    let lines = vec![
        Line::from("Something went wrong").style(Style::default().fg(Color::Red).bold()),
        Line::from(""),
        Line::from(message).style(Style::default().fg(Color::Red)),
        Line::from(""),
        Line::from("r: Retry / Esc: Quit").style(Style::default().fg(Color::DarkGray)),
    ];
    f.render_widget(Paragraph::new(lines).centered(), area);
}

fn ui_consultation(f: &mut Frame, area: Rect, app_state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] 検索ボックス
            Constraint::Length(1), // [1] 空白
            Constraint::Min(1),    // [2] 辞書エントリ
            Constraint::Length(1), // [3] 操作ヒント
        ])
        .split(area);

    f.render_widget(
        Paragraph::new(format!("Search: {}_", app_state.search_term))
            .style(Style::default().fg(Color::Cyan)),
        chunks[0],
    );

    let term = app_state.search_term.to_lowercase();
    let filtered: Vec<&crate::dictionary::SynonymDictionaryEntry> = app_state
        .session
        .dictionary
        .iter()
        .filter(|entry| {
            term.is_empty()
                || entry.target_word.to_lowercase().contains(&term)
                || entry
                    .synonyms
                    .iter()
                    .any(|syn| syn.to_lowercase().contains(&term))
        })
        .collect();

    let mut lines = Vec::new();
    if filtered.is_empty() {
        let hint = if app_state.session.dictionary.is_empty() {
            "No synonyms to show."
        } else {
            "No results for your search."
        };
        lines.push(Line::from(hint).style(Style::default().fg(Color::DarkGray)));
    }
    for entry in filtered {
        lines.push(Line::from(vec![
            Span::styled(
                entry.target_word.as_str(),
                Style::default().fg(Color::White).bold(),
            ),
            Span::raw(": "),
            Span::styled(entry.synonyms.join(", "), Style::default().fg(Color::Gray)),
        ]));
    }
    f.render_widget(Paragraph::new(lines), chunks[2]);

    f.render_widget(
        Paragraph::new("Type to search / Esc: Back").style(Style::default().fg(Color::DarkGray)),
        chunks[3],
    );
}
