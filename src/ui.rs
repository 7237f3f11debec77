pub mod screen;

use edututor::{
    attempt::Status,
    diagnostic::DiagnosticSummary,
    ports::{Notice, SessionSnapshot},
    report::{format_clock, ReportRecord, Severity},
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Widget, Wrap},
    Frame,
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
/// Timer turns red at or below this many seconds
const LOW_TIME_SECS: u32 = 30;

pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(app).render(app, f);
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn severity_style(severity: Severity) -> Style {
    let color = match severity {
        Severity::Success => Color::Green,
        Severity::Info => Color::Cyan,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    };
    Style::default().fg(color)
}

/// One question with its choices, feedback and countdown
pub struct QuestionView<'a> {
    pub title: &'a str,
    pub snapshot: &'a SessionSnapshot,
    pub cursor: usize,
    pub notice: Option<&'a Notice>,
}

impl Widget for &QuestionView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snap = self.snapshot;
        let question = &snap.question;

        let green_bold_style = bold().fg(Color::Green);
        let red_bold_style = bold().fg(Color::Red);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // title and counter
                Constraint::Length(1), // time gauge
                Constraint::Length(1), // padding
                Constraint::Min(3),    // prompt, choices, feedback
                Constraint::Length(1), // notice
                Constraint::Length(1), // legend
            ])
            .split(area);

        Paragraph::new(Line::from(vec![
            Span::styled(self.title.to_string(), bold()),
            Span::raw("   "),
            Span::styled(
                format!("Question {} of {}", snap.position + 1, snap.total),
                dim_style,
            ),
        ]))
        .render(chunks[0], buf);

        let ratio = if snap.time_limit_seconds == 0 {
            0.0
        } else {
            f64::from(snap.remaining_seconds) / f64::from(snap.time_limit_seconds)
        };
        let timer_color = if snap.remaining_seconds <= LOW_TIME_SECS {
            Color::Red
        } else {
            Color::Magenta
        };
        Gauge::default()
            .gauge_style(Style::default().fg(timer_color))
            .ratio(ratio.clamp(0.0, 1.0))
            .label(format_clock(snap.remaining_seconds))
            .render(chunks[1], buf);

        let mut lines = vec![
            Line::from(Span::styled(question.prompt.clone(), bold())),
            Line::default(),
        ];
        for (idx, choice) in question.choices.iter().enumerate() {
            let marker = if idx == self.cursor { "> " } else { "  " };
            let chosen = snap.selected == Some(idx);
            let style = match (snap.feedback_shown, chosen, idx == question.correct_choice) {
                (true, _, true) => green_bold_style,
                (true, true, false) => red_bold_style,
                (false, true, _) => bold().fg(Color::Cyan),
                _ => Style::default(),
            };
            lines.push(Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{}. {choice}", idx + 1), style),
            ]));
        }

        if snap.feedback_shown {
            lines.push(Line::default());
            let verdict = if snap.selected == Some(question.correct_choice) {
                Span::styled("Correct!", green_bold_style)
            } else {
                Span::styled("Incorrect.", red_bold_style)
            };
            lines.push(Line::from(verdict));
            lines.push(Line::from(Span::styled(
                question.explanation.clone(),
                italic_style,
            )));
        }

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(chunks[3], buf);

        if let Some(notice) = self.notice {
            Paragraph::new(Span::styled(
                notice.message.clone(),
                severity_style(notice.severity),
            ))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);
        }

        let legend = if snap.feedback_shown {
            "(enter) next / (esc)ape"
        } else {
            "(1-9) choose / (up/down) move / (enter) submit / (tab) skip / (esc)ape"
        };
        Paragraph::new(Span::styled(legend, italic_style)).render(chunks[5], buf);
    }
}

/// Score summary and per-question breakdown
pub struct ResultsView<'a> {
    pub record: &'a ReportRecord,
    pub diagnostic: Option<&'a DiagnosticSummary>,
    pub scroll: u16,
}

impl Widget for &ResultsView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let record = self.record;
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let summary_height = if self.diagnostic.is_some() { 6 } else { 3 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(summary_height),
                Constraint::Length(1), // padding
                Constraint::Min(1),    // breakdown
                Constraint::Length(1), // legend
            ])
            .split(area);

        let mut summary = vec![
            Line::from(Span::styled(record.title.clone(), bold())),
            Line::from(Span::styled(
                record.summary_line(),
                bold().patch(severity_style(record.severity())),
            )),
        ];
        if record.timed_out {
            summary.push(Line::from(Span::styled(
                "Time expired; unanswered questions count as incorrect.",
                Style::default().fg(Color::Yellow),
            )));
        }
        if let Some(diag) = self.diagnostic {
            summary.push(Line::from(format!("Learning level: {}", diag.learning_level)));
            let scores = diag
                .subject_scores
                .iter()
                .map(|(subject, s)| format!("{subject} {}/{}", s.correct, s.total))
                .collect::<Vec<_>>()
                .join("   ");
            summary.push(Line::from(scores));
            if !diag.weaknesses.is_empty() {
                summary.push(Line::from(format!("Focus on: {}", diag.weaknesses.join(", "))));
            }
        }
        Paragraph::new(summary)
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let mut lines = Vec::new();
        for q in &record.breakdown {
            let (mark, style) = if q.is_correct {
                ("✔", Style::default().fg(Color::Green))
            } else {
                ("✘", Style::default().fg(Color::Red))
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{mark} "), style),
                Span::styled(format!("{}. {}", q.position, q.prompt), bold()),
            ]));
            let answer = match &q.selected {
                Some(text) => format!("   Your answer: {text}"),
                None => "   Not answered".to_string(),
            };
            lines.push(Line::from(answer));
            if !q.is_correct {
                lines.push(Line::from(format!("   Correct answer: {}", q.correct)));
            }
            lines.push(Line::from(Span::styled(
                format!("   {}", q.explanation),
                italic_style,
            )));
            lines.push(Line::default());
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .render(chunks[2], buf);

        Paragraph::new(Span::styled(
            "(r)etake / (up/down) scroll / (q)uit",
            italic_style,
        ))
        .render(chunks[3], buf);
    }
}

/// True once the snapshot carries a scored report
pub fn shows_results(snapshot: &SessionSnapshot) -> bool {
    snapshot.status == Status::Completed && snapshot.report.is_some()
}
