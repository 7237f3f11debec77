pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use edututor::{
    attempt::Status,
    bank::QuestionBank,
    config::{Config, ConfigStore, FileConfigStore},
    error::SessionError,
    history::{export_csv, load_history, summarize},
    logging,
    ports::{Destination, Navigator, Notice, Notifier, Presenter, SessionSnapshot, Storage},
    question::Difficulty,
    report::{ReportRecord, Severity},
    runtime::{CrosstermEventSource, FixedTicker, Runner, SessionEvent, SessionEventSource, Ticker},
    schedule::{Assignments, ScheduledQuiz},
    session::{Collaborators, QuizSession, SessionPlan},
    store::{MemoryStore, SqliteStore},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    cell::RefCell,
    error::Error,
    io::{self, stdin, Write},
    path::PathBuf,
    rc::Rc,
    sync::mpsc::Sender,
    time::Duration,
};

const POLL_RATE_MS: u64 = 100;

/// timed quizzes in the terminal, with results history and scheduled assignments
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Timed multiple-choice quizzes in the terminal. Practice a topic, take the diagnostic assessment, or work through quizzes scheduled ahead of time. Results are kept locally."
)]
pub struct Cli {
    /// subject to practice
    #[clap(short = 'S', long, default_value = "Mathematics")]
    subject: String,

    /// topic within the subject
    #[clap(short = 't', long, default_value = "Algebra")]
    topic: String,

    /// difficulty recorded with the result (defaults to the configured one)
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// number of questions (defaults to the configured count)
    #[clap(short = 'n', long, value_parser = parse_count)]
    count: Option<usize>,

    /// time limit in seconds (defaults to the configured practice limit)
    #[clap(short = 's', long)]
    secs: Option<u32>,

    /// use generic questions for topics the bank has none for
    #[clap(long)]
    allow_generic: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Take the cross-subject diagnostic assessment
    Diagnostic {
        /// time limit in seconds
        #[clap(short = 's', long)]
        secs: Option<u32>,
    },
    /// Take a scheduled quiz (the oldest pending one when no id is given)
    Assignment { id: Option<String> },
    /// Schedule a quiz to be taken later
    Schedule {
        title: String,
        #[clap(short = 'S', long)]
        subject: String,
        #[clap(short = 't', long)]
        topic: String,
        #[clap(short = 'd', long, value_enum, default_value_t = Difficulty::Intermediate)]
        difficulty: Difficulty,
        /// time limit in minutes
        #[clap(short = 'm', long)]
        minutes: Option<u32>,
        /// number of questions
        #[clap(short = 'n', long, value_parser = parse_count)]
        count: Option<usize>,
    },
    /// List scheduled quizzes
    Assignments {
        /// include completed ones
        #[clap(long)]
        all: bool,
    },
    /// Show past results, newest first
    History {
        /// write the full history to a CSV file instead
        #[clap(long)]
        export: Option<PathBuf>,
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// List subjects and their topics
    Subjects,
}

fn parse_count(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("a quiz needs at least one question".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    /// Generic questions are allowed when either the flag or the config says so
    fn allows_generic(&self, config: &Config) -> bool {
        self.allow_generic || config.allow_generic
    }

    fn practice_plan(&self, bank: &QuestionBank, config: &Config) -> SessionPlan {
        SessionPlan::practice(
            bank,
            &self.subject,
            &self.topic,
            self.difficulty.unwrap_or(config.default_difficulty),
            self.count.unwrap_or(config.question_count),
            self.secs.unwrap_or(config.practice_secs),
            self.allows_generic(config),
        )
        .with_history_limit(config.history_limit)
    }
}

/// What the view knows, fed by the session through its collaborator traits
#[derive(Debug, Default)]
pub struct ViewState {
    pub snapshot: Option<SessionSnapshot>,
    pub notice: Option<Notice>,
    pub finished: Option<Destination>,
    /// Highlighted choice on the question screen
    pub cursor: usize,
    /// Scroll offset of the results breakdown
    pub scroll: u16,
}

#[derive(Debug, Clone, Default)]
pub struct View(Rc<RefCell<ViewState>>);

impl View {
    pub fn state(&self) -> std::cell::Ref<'_, ViewState> {
        self.0.borrow()
    }

    fn state_mut(&self) -> std::cell::RefMut<'_, ViewState> {
        self.0.borrow_mut()
    }
}

impl Presenter for View {
    fn present(&self, snapshot: &SessionSnapshot) {
        let mut state = self.state_mut();
        let moved = state
            .snapshot
            .as_ref()
            .map_or(true, |prev| prev.position != snapshot.position);
        if moved {
            state.cursor = 0;
        }
        if let Some(selected) = snapshot.selected {
            state.cursor = selected;
        }
        state.snapshot = Some(snapshot.clone());
    }
}

impl Notifier for View {
    fn notify(&self, notice: Notice) {
        tracing::debug!(severity = %notice.severity, "{}", notice.message);
        self.state_mut().notice = Some(notice);
    }
}

impl Navigator for View {
    fn session_finished(&self, destination: Destination) {
        self.state_mut().finished = Some(destination);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppAction {
    Continue,
    Retake,
    Quit,
}

pub struct App {
    pub plan: SessionPlan,
    pub session: QuizSession,
    pub view: View,
    storage: Rc<dyn Storage>,
}

impl App {
    pub fn start(
        plan: SessionPlan,
        storage: Rc<dyn Storage>,
        ticks: Option<Sender<SessionEvent>>,
    ) -> Result<Self, SessionError> {
        let view = View::default();
        let session = QuizSession::start(plan.clone(), collaborators(&storage, &view), ticks)?;
        Ok(Self {
            plan,
            session,
            view,
            storage,
        })
    }

    /// Replace the finished session with a fresh attempt over the same plan
    pub fn retake(&mut self, ticks: Option<Sender<SessionEvent>>) -> Result<(), SessionError> {
        let view = View::default();
        self.session = QuizSession::start(
            self.plan.clone(),
            collaborators(&self.storage, &view),
            ticks,
        )?;
        self.view = view;
        Ok(())
    }

    pub fn on_key(&mut self, key: KeyEvent) -> AppAction {
        if key.kind != KeyEventKind::Press {
            return AppAction::Continue;
        }
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            self.session.exit();
            return AppAction::Quit;
        }

        match self.session.status() {
            Status::Completed => self.on_results_key(key),
            Status::InProgress => {
                self.on_question_key(key);
                AppAction::Continue
            }
            Status::NotStarted => AppAction::Continue,
        }
    }

    fn on_question_key(&mut self, key: KeyEvent) {
        let choices = self.session.attempt().current_question().choices.len();
        match key.code {
            KeyCode::Char(c @ '1'..='9') => self.select(c as usize - '1' as usize),
            KeyCode::Char(c @ 'a'..='f') => self.select(c as usize - 'a' as usize),
            KeyCode::Up => {
                let mut state = self.view.state_mut();
                state.cursor = state.cursor.saturating_sub(1);
            }
            KeyCode::Down => {
                let mut state = self.view.state_mut();
                state.cursor = (state.cursor + 1).min(choices.saturating_sub(1));
            }
            KeyCode::Char(' ') => {
                let cursor = self.view.state().cursor;
                self.select(cursor);
            }
            KeyCode::Enter => {
                if self.session.attempt().feedback_shown() {
                    self.session.advance();
                } else {
                    if self.session.attempt().current_answer().is_none() {
                        let cursor = self.view.state().cursor;
                        self.select(cursor);
                    }
                    self.session.reveal_feedback();
                }
            }
            KeyCode::Right | KeyCode::Tab => {
                self.session.advance();
            }
            _ => {}
        }
    }

    fn on_results_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('r') => AppAction::Retake,
            KeyCode::Char('q') | KeyCode::Enter => {
                self.session.exit();
                AppAction::Quit
            }
            KeyCode::Up => {
                let mut state = self.view.state_mut();
                state.scroll = state.scroll.saturating_sub(1);
                AppAction::Continue
            }
            KeyCode::Down => {
                self.view.state_mut().scroll += 1;
                AppAction::Continue
            }
            _ => AppAction::Continue,
        }
    }

    fn select(&mut self, choice: usize) {
        // feedback is final for the question it was shown on
        if self.session.attempt().feedback_shown() {
            return;
        }
        if let Err(e) = self.session.select_answer(choice) {
            self.view
                .notify(Notice::new(Severity::Warning, e.to_string()));
        }
    }

    pub fn is_finished(&self) -> bool {
        self.view.state().finished.is_some()
    }
}

fn collaborators(storage: &Rc<dyn Storage>, view: &View) -> Collaborators {
    Collaborators {
        storage: Rc::clone(storage),
        presenter: Box::new(view.clone()),
        navigator: Box::new(view.clone()),
        notifier: Box::new(view.clone()),
    }
}

fn open_storage() -> Rc<dyn Storage> {
    match SqliteStore::new() {
        Ok(store) => Rc::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "results database unavailable, keeping results in memory");
            Rc::new(MemoryStore::new())
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let _log_guard = logging::init();

    let config = FileConfigStore::new().load();
    let bank = QuestionBank::bundled()?;
    let storage = open_storage();
    let mut out = io::stdout().lock();

    let plan = match cli.command.clone() {
        Some(Command::Subjects) => return Ok(write_subjects(&bank, &mut out)?),
        Some(Command::History { export, limit }) => {
            let history = load_history(&*storage);
            return match export {
                Some(path) => {
                    export_csv(&history, &path)?;
                    writeln!(out, "exported {} results to {}", history.len(), path.display())?;
                    Ok(())
                }
                None => Ok(write_history(&history, limit, &mut out)?),
            };
        }
        Some(Command::Assignments { all }) => {
            let assignments = Assignments::load(&*storage);
            let listed: Vec<&ScheduledQuiz> = if all {
                assignments.all().iter().collect()
            } else {
                assignments.pending()
            };
            return Ok(write_assignments(&listed, &mut out)?);
        }
        Some(Command::Schedule {
            title,
            subject,
            topic,
            difficulty,
            minutes,
            count,
        }) => {
            if bank.available(&subject, &topic) == 0 && !cli.allows_generic(&config) {
                let mut cmd = Cli::command();
                cmd.error(
                    ErrorKind::InvalidValue,
                    format!("no questions for {subject} / {topic}"),
                )
                .exit();
            }
            let quiz = ScheduledQuiz::new(
                title,
                subject,
                topic,
                difficulty,
                minutes.unwrap_or(config.scheduled_minutes),
                count.unwrap_or(config.question_count),
            );
            let mut assignments = Assignments::load(&*storage);
            writeln!(out, "scheduled {} ({})", quiz.title, quiz.id)?;
            assignments.add(quiz);
            assignments.save(&*storage)?;
            return Ok(());
        }
        Some(Command::Diagnostic { secs }) => {
            SessionPlan::diagnostic(&bank, secs.unwrap_or(config.diagnostic_secs))
                .with_history_limit(config.history_limit)
        }
        Some(Command::Assignment { id }) => {
            let assignments = Assignments::load(&*storage);
            let quiz = match &id {
                Some(id) => assignments.get(id),
                None => assignments.pending().into_iter().next(),
            };
            let Some(quiz) = quiz else {
                writeln!(out, "no pending assignments")?;
                return Ok(());
            };
            SessionPlan::assignment(&bank, quiz, cli.allows_generic(&config))
                .with_history_limit(config.history_limit)
        }
        None => cli.practice_plan(&bank, &config),
    };
    drop(out);

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(POLL_RATE_MS)),
    );
    let mut app = match App::start(plan, storage, Some(runner.sender())) {
        Ok(app) => app,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
        }
    };

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;
    if let Some(record) = app.session.report() {
        println!("{}: {}", record.title, record.summary_line());
    }
    Ok(())
}

fn start_tui<B: Backend, E: SessionEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        match runner.step() {
            SessionEvent::Tick => {
                app.session.tick();
            }
            SessionEvent::Resize | SessionEvent::Idle => {}
            SessionEvent::Key(key) => match app.on_key(key) {
                AppAction::Continue => {}
                AppAction::Retake => app.retake(Some(runner.sender()))?,
                AppAction::Quit => break,
            },
        }

        if app.is_finished() {
            break;
        }
    }

    Ok(())
}

fn write_subjects<W: Write>(bank: &QuestionBank, out: &mut W) -> io::Result<()> {
    for subject in bank.subjects() {
        writeln!(out, "{subject}")?;
        for topic in bank.topics(subject) {
            let available = bank.available(subject, topic);
            if available == 0 {
                writeln!(out, "  {topic} (no questions yet)")?;
            } else {
                writeln!(out, "  {topic} ({available})")?;
            }
        }
    }
    Ok(())
}

/// Summary over the whole history, then the newest `limit` results
fn write_history<W: Write>(records: &[ReportRecord], limit: usize, out: &mut W) -> io::Result<()> {
    let Some(summary) = summarize(records) else {
        return writeln!(out, "no results yet");
    };
    writeln!(
        out,
        "{} quizzes, average {}%, {:02}:{:02} total, {}",
        summary.total_quizzes,
        summary.average_score,
        summary.total_seconds / 60,
        summary.total_seconds % 60,
        summary.band
    )?;
    for r in records.iter().take(limit) {
        writeln!(
            out,
            "{}  {:<10} {:<28} {}{}",
            r.completed_at.format("%Y-%m-%d %H:%M"),
            r.kind,
            r.title,
            r.summary_line(),
            if r.timed_out { "  (time expired)" } else { "" }
        )?;
    }
    Ok(())
}

fn write_assignments<W: Write>(quizzes: &[&ScheduledQuiz], out: &mut W) -> io::Result<()> {
    if quizzes.is_empty() {
        return writeln!(out, "no assignments");
    }
    for q in quizzes {
        writeln!(
            out,
            "{}  {:<24} {} / {}  {} questions, {} min, {} completed",
            q.id, q.title, q.subject, q.topic, q.question_count, q.time_limit_minutes, q.completions
        )?;
    }
    Ok(())
}
