use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::render::{classify, display_char, CharClass};
use crate::session::Phase;
use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.session.phase() {
            Phase::Finished => render_results(self, area, buf),
            _ => render_practice(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn stats_line(app: &App) -> String {
    format!(
        "{} wpm   {} acc   {}   {} err",
        app.stats.wpm_display(),
        app.stats.accuracy_display(),
        app.stats.time_display(),
        app.stats.errors_display(),
    )
}

fn legend_line(app: &App) -> String {
    format!(
        "(n)ew prompt / (enter) start / (r)eset / (a)i {} / (esc)ape",
        if app.settings.use_remote { "ON" } else { "OFF" }
    )
}

fn render_practice(app: &App, area: Rect, buf: &mut Buffer) {
    let green_bold = bold().fg(Color::Green);
    let red_bold = bold().fg(Color::Red);
    let dim_bold = bold().add_modifier(Modifier::DIM);
    let caret_style = dim_bold.add_modifier(Modifier::UNDERLINED);
    let italic = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // stats
            Constraint::Length(1),
            Constraint::Min(3),    // prompt
            Constraint::Length(1), // progress
            Constraint::Length(1), // notice / hint
            Constraint::Length(1), // legend
        ])
        .split(area);

    let stats = Paragraph::new(Span::styled(stats_line(app), bold())).alignment(Alignment::Center);
    stats.render(chunks[0], buf);

    if app.session.has_prompt() {
        let session = &app.session;
        let rendered = classify(
            session.prompt_chars(),
            session.input_chars(),
            session.is_finished(),
        );

        let mut spans: Vec<Span> = Vec::new();
        let mut pending_tail = String::new();
        for rc in &rendered {
            match rc.class {
                CharClass::Matched => spans.push(Span::styled(
                    display_char(rc.target).to_string(),
                    green_bold,
                )),
                CharClass::Mismatched => spans.push(Span::styled(
                    match rc.typed {
                        Some(' ') => "·".to_owned(),
                        Some(c) => display_char(c).to_string(),
                        None => display_char(rc.target).to_string(),
                    },
                    red_bold,
                )),
                CharClass::Caret => spans.push(Span::styled(
                    display_char(rc.target).to_string(),
                    caret_style,
                )),
                CharClass::Pending => pending_tail.push(display_char(rc.target)),
            }
        }
        if !pending_tail.is_empty() {
            spans.push(Span::styled(pending_tail, dim_bold));
        }

        let prompt_text: String = session.prompt_chars().iter().collect();
        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2) as usize;
        let alignment = if prompt_text.width() <= max_chars_per_line {
            // a short prompt reads best centered
            Alignment::Center
        } else {
            Alignment::Left
        };

        let prompt = Paragraph::new(Line::from(spans))
            .alignment(alignment)
            .wrap(Wrap { trim: true });
        prompt.render(chunks[2], buf);

        let progress = app.session.progress_percent();
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Magenta))
            .ratio(progress / 100.0)
            .label(Span::styled(format!("{progress:.0}%"), dim_bold));
        gauge.render(chunks[3], buf);
    } else {
        let hint = Paragraph::new(Span::styled(
            "press (n) for a new prompt",
            italic.add_modifier(Modifier::DIM),
        ))
        .alignment(Alignment::Center);
        hint.render(chunks[2], buf);
    }

    let notice_text = match &app.notice {
        Some(notice) => Some(notice.clone()),
        None if app.session.has_prompt() && !app.session.is_accepting() => {
            Some("press (enter) to start typing".to_string())
        }
        None => None,
    };
    if let Some(text) = notice_text {
        let notice = Paragraph::new(Span::styled(text, italic.fg(Color::Yellow)))
            .alignment(Alignment::Center);
        notice.render(chunks[4], buf);
    }

    let legend =
        Paragraph::new(Span::styled(legend_line(app), italic)).alignment(Alignment::Center);
    legend.render(chunks[5], buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let italic = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // headline stats
            Constraint::Length(1), // settings summary
            Constraint::Length(1),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let stats = Paragraph::new(Span::styled(stats_line(app), bold())).alignment(Alignment::Center);
    stats.render(chunks[1], buf);

    let summary = format!(
        "model {} · phrases {} · remote {}",
        app.settings.model,
        app.settings.language,
        if app.settings.use_remote { "ON" } else { "OFF" }
    );
    let settings = Paragraph::new(Span::styled(
        summary,
        Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    settings.render(chunks[2], buf);

    let legend = Paragraph::new(Span::styled(
        "(n)ew prompt / (r)eset / (esc)ape",
        italic,
    ))
    .alignment(Alignment::Center);
    legend.render(chunks[4], buf);
}
