use ratatui::{widgets::Paragraph, Frame};

use crate::{
    ui::{shows_results, QuestionView, ResultsView},
    App,
};

/// A UI Screen boundary: responsible for rendering the current session state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// The question being answered
pub struct QuestionScreen;

impl Screen for QuestionScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let state = app.view.state();
        let Some(snapshot) = state.snapshot.as_ref() else {
            f.render_widget(Paragraph::new("Loading quiz..."), f.area());
            return;
        };
        let view = QuestionView {
            title: &app.plan.config.meta.title,
            snapshot,
            cursor: state.cursor,
            notice: state.notice.as_ref(),
        };
        f.render_widget(&view, f.area());
    }
}

/// Score and breakdown once the attempt is scored
pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let Some(record) = app.session.report() else {
            return;
        };
        let view = ResultsView {
            record,
            diagnostic: app.session.diagnostic(),
            scroll: app.view.state().scroll,
        };
        f.render_widget(&view, f.area());
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(app: &App) -> Box<dyn Screen> {
    let state = app.view.state();
    match state.snapshot.as_ref() {
        Some(snapshot) if shows_results(snapshot) => Box::new(ResultsScreen),
        _ => Box::new(QuestionScreen),
    }
}
