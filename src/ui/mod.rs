use std::sync::OnceLock;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, Popup, Screen};
use crate::theme::Theme;

// Resolved once from config at startup
static THEME: OnceLock<Theme> = OnceLock::new();

pub fn init_theme(theme: Theme) {
    let _ = THEME.set(theme);
}

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn inactive() -> Color { theme().inactive }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn danger() -> Color { theme().danger }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // Info line
            Constraint::Length(1),  // Screen tabs
            Constraint::Min(6),     // Body
            Constraint::Length(1),  // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_tabs(f, app, chunks[1]);
    match app.screen {
        Screen::Home => draw_home(f, app, chunks[2]),
        Screen::Membership => draw_membership(f, app, chunks[2]),
    }
    draw_footer(f, app, chunks[3]);

    if app.popup == Popup::Help {
        draw_help_popup(f);
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(ref status) = app.status_message {
        let color = if status.starts_with("Error") { danger() } else { warning() };
        Line::from(Span::styled(status.as_str(), Style::default().fg(color)))
    } else {
        Line::from(Span::styled(
            app.config.club_name.as_str(),
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        ))
    };

    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab = |label: &'static str, screen: Screen| {
        if app.screen == screen {
            Span::styled(label, Style::default().fg(accent()).add_modifier(Modifier::BOLD))
        } else {
            Span::styled(label, Style::default().fg(inactive()))
        }
    };

    let line = Line::from(vec![
        tab(" Home ", Screen::Home),
        Span::styled("│", Style::default().fg(inactive())),
        tab(" Membership ", Screen::Membership),
    ]);
    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn boxed(title: &str) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(accent()).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()))
}

fn draw_home(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
        .split(area);

    // Announcements
    let mut lines = Vec::new();
    for (i, item) in app.config.announcements.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            item.title.as_str(),
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(item.body.as_str(), Style::default().fg(text()))));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled("No announcements", Style::default().fg(text_dim()))));
    }

    let announcements = Paragraph::new(lines)
        .block(boxed("Announcements"))
        .wrap(Wrap { trim: true });
    f.render_widget(announcements, chunks[0]);

    // Events
    let rows: Vec<Row> = app
        .config
        .events
        .iter()
        .map(|event| {
            Row::new(vec![
                Span::styled(event.name.as_str(), Style::default().fg(text())),
                Span::styled(event.date.as_str(), Style::default().fg(accent())),
                Span::styled(event.location.as_str(), Style::default().fg(text_dim())),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Percentage(45), Constraint::Percentage(25), Constraint::Percentage(30)],
    )
    .header(Row::new(vec![
        Span::styled("Event", Style::default().fg(header())),
        Span::styled("When", Style::default().fg(header())),
        Span::styled("Where", Style::default().fg(header())),
    ]))
    .block(boxed("Upcoming events"));
    f.render_widget(table, chunks[1]);
}

fn draw_membership(f: &mut Frame, app: &App, area: Rect) {
    let membership = &app.membership;

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Name: ", Style::default().fg(text_dim())),
            Span::styled(membership.input(), Style::default().fg(text())),
            Span::styled("█", Style::default().fg(accent())),
        ]),
        Line::from(""),
    ];

    // Only what storage has confirmed is shown here
    let state_line = if membership.is_loading() {
        Line::from(Span::styled("  Loading...", Style::default().fg(text_dim())))
    } else if membership.is_saving() {
        Line::from(Span::styled("  Saving...", Style::default().fg(warning())))
    } else if let Some(name) = membership.displayed_name() {
        Line::from(vec![
            Span::styled("  Welcome, ", Style::default().fg(text())),
            Span::styled(name, Style::default().fg(success()).add_modifier(Modifier::BOLD)),
        ])
    } else {
        Line::from(Span::styled("  No name saved yet", Style::default().fg(text_dim())))
    };
    lines.push(state_line);

    if let Some(error) = membership.last_error() {
        lines.push(Line::from(Span::styled(format!("  {}", error), Style::default().fg(danger()))));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("  Stored in {}", app.storage_location),
        Style::default().fg(inactive()),
    )));

    let form = Paragraph::new(lines)
        .block(boxed("Membership"))
        .wrap(Wrap { trim: false });
    f.render_widget(form, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: &[(&str, &str)] = match app.screen {
        Screen::Home => &[("Tab", "membership"), ("?", "help"), ("q", "quit")],
        Screen::Membership => &[("Enter", "save"), ("Esc", "home"), ("Ctrl-C", "quit")],
    };

    let mut spans = Vec::new();
    for (i, (key, label)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ", Style::default()));
        }
        spans.push(Span::styled(*key, Style::default().fg(accent())));
        spans.push(Span::styled(format!(" {}", label), Style::default().fg(text_dim())));
    }

    f.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Center), area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = centered_rect(60, 50, f.area());
    f.render_widget(Clear, area);

    let entry = |key: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<8}", key), Style::default().fg(accent())),
            Span::styled(desc, Style::default().fg(text())),
        ])
    };

    let lines = vec![
        Line::from(""),
        entry("Tab", "Switch between Home and Membership"),
        entry("Enter", "Save your member name"),
        entry("Esc", "Back to Home"),
        entry("?", "Toggle this help"),
        entry("q", "Quit (from Home)"),
        entry("Ctrl-C", "Quit"),
    ];

    let help = Paragraph::new(lines).block(boxed("Help"));
    f.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
