mod feedback;

use std::sync::OnceLock;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Gauge, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, Popup};
use crate::theme::Theme;
use crate::upload::{Phase, View};

// Load theme colors from the terminal config once at startup
static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::load)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn inactive() -> Color { theme().inactive }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn danger() -> Color { theme().danger }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }
fn header() -> Color { theme().header }

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Screen split: info line, body, footer
fn screen_chunks(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // Info line
            Constraint::Min(8),     // Upload or results pane
            Constraint::Length(1),  // Footer
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// Upload pane: drop zone, filename label, analyze button
fn upload_chunks(body: Rect) -> [Rect; 3] {
    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(2),
            Constraint::Length(3),
        ])
        .split(body);
    [inner[0], inner[1], inner[2]]
}

/// Where the drop zone is drawn for a terminal of size `area`
pub fn drop_zone_area(area: Rect) -> Rect {
    let [_, body, _] = screen_chunks(area);
    upload_chunks(body)[0]
}

pub fn draw(f: &mut Frame, app: &App) {
    let [info, body, footer] = screen_chunks(f.area());

    draw_info_line(f, app, info);
    match app.upload.view {
        View::Upload => draw_upload_section(f, app, body),
        View::Results => draw_results_section(f, app, body),
    }
    draw_footer(f, app, footer);

    // Draw popups on top
    match app.popup {
        Popup::None => {}
        Popup::Alert => draw_alert_popup(f, app),
        Popup::FileBrowser => draw_file_browser(f, app),
        Popup::Help => draw_help_popup(f),
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" resumatch ", Style::default().fg(header()).add_modifier(Modifier::BOLD)),
        Span::styled("│ ", Style::default().fg(inactive())),
        Span::styled(app.server_url(), Style::default().fg(text_dim())),
    ];

    if let Some(msg) = &app.status_message {
        spans.push(Span::styled(" │ ", Style::default().fg(inactive())));
        spans.push(Span::styled(msg.as_str(), Style::default().fg(warning())));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_upload_section(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Upload Resume ", Style::default().fg(accent()).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));
    f.render_widget(block, area);

    let [zone, label, button] = upload_chunks(area);

    // Drop zone
    let has_file = app.upload.selected_file.is_some();
    let zone_color = if has_file { success() } else { accent() };
    let zone_text = vec![
        Line::from(""),
        Line::from(Span::styled("󰈙  Drop your resume here", Style::default().fg(text()).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("or ", Style::default().fg(text_dim())),
            Span::styled("click", Style::default().fg(accent())),
            Span::styled(" / press ", Style::default().fg(text_dim())),
            Span::styled("o", Style::default().fg(accent())),
            Span::styled(" to browse", Style::default().fg(text_dim())),
        ]),
        Line::from(Span::styled("PDF, DOCX or TXT", Style::default().fg(text_dim()))),
    ];
    let drop_zone = Paragraph::new(zone_text)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(zone_color)),
        );
    f.render_widget(drop_zone, zone);

    // Filename label
    let file_name = Paragraph::new(Span::styled(
        app.upload.filename_label.as_str(),
        Style::default().fg(success()),
    ))
    .alignment(Alignment::Center);
    f.render_widget(file_name, label);

    draw_analyze_button(f, app, button);
}

fn draw_analyze_button(f: &mut Frame, app: &App, area: Rect) {
    let control = &app.upload.control;
    let color = if control.enabled { accent() } else { inactive() };

    let mut spans = Vec::new();
    if control.loading {
        let elapsed = app.analysis_started.map(|t| t.elapsed().as_millis()).unwrap_or(0);
        let frame = SPINNER[(elapsed / 100) as usize % SPINNER.len()];
        spans.push(Span::styled(format!("{} ", frame), Style::default().fg(warning())));
    }
    spans.push(Span::styled(control.label, Style::default().fg(color).add_modifier(Modifier::BOLD)));

    let width = (control.label.chars().count() as u16 + 8).min(area.width);
    let button_area = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        width,
        ..area
    };

    let button = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(color)),
        );
    f.render_widget(button, button_area);
}

fn draw_results_section(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Analysis Results ", Style::default().fg(accent()).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));
    f.render_widget(block, area);

    let Some(result) = &app.upload.result else {
        return;
    };

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),  // Role
            Constraint::Length(3),  // Match gauge
            Constraint::Min(4),     // Feedback
        ])
        .split(area);

    let mut role_line = vec![
        Span::styled("Predicted role  ", Style::default().fg(text_dim())),
        Span::styled(result.predicted_role.as_str(), Style::default().fg(header()).add_modifier(Modifier::BOLD)),
    ];
    if let Some(name) = &result.filename {
        role_line.push(Span::styled(format!("   ({})", name), Style::default().fg(text_dim())));
    }
    let role = Paragraph::new(Line::from(role_line))
        .block(Block::default().borders(Borders::BOTTOM).border_style(Style::default().fg(inactive())));
    f.render_widget(role, inner[0]);

    let ratio = (result.match_percentage / 100.0).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(Block::default().title(Span::styled(" Match ", Style::default().fg(text_dim()))))
        .gauge_style(Style::default().fg(theme().match_color(result.match_percentage)).bg(bg_selected()))
        .ratio(if ratio.is_finite() { ratio } else { 0.0 })
        .label(result.match_value.as_str());
    f.render_widget(gauge, inner[1]);

    let lines = feedback::markup_lines(
        &result.ai_feedback,
        Style::default().fg(text()),
        Style::default().fg(header()),
    );
    let feedback = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.feedback_scroll, 0))
        .block(
            Block::default()
                .title(Span::styled(" AI Feedback ", Style::default().fg(header())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(inactive())),
        );
    f.render_widget(feedback, inner[2]);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = match app.upload.view {
        View::Upload if app.upload.phase() == Phase::Analyzing => vec![
            ("…", "Waiting for the server"),
            ("r", "Reset"),
            ("q", "Quit"),
        ],
        View::Upload => vec![
            ("o", "Browse"),
            ("Enter", "Analyze"),
            ("r", "Reset"),
            ("h", "Help"),
            ("q", "Quit"),
        ],
        View::Results => vec![
            ("↑↓", "Scroll"),
            ("r", "Analyze another"),
            ("h", "Help"),
            ("q", "Quit"),
        ],
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 3 } else { hints.len() };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(accent())),
                Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(hint_spans))
        .alignment(Alignment::Center);

    f.render_widget(footer, area);
}

fn draw_alert_popup(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(50, 25, f.area());

    f.render_widget(Clear, popup_area);

    let message = app.alert_message.as_deref().unwrap_or_default();

    let alert = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(text()))),
        Line::from(""),
        Line::from(vec![
            Span::styled("Enter", Style::default().fg(accent()).add_modifier(Modifier::BOLD)),
            Span::styled(" OK", Style::default().fg(text_dim())),
        ]),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .title(Span::styled(" Alert ", Style::default().fg(danger())))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(danger())),
    )
    .alignment(Alignment::Center);

    f.render_widget(alert, popup_area);
}

fn draw_file_browser(f: &mut Frame, app: &App) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 90 } else { 70 },
        if area.height < 30 { 85 } else { 70 },
        area
    );

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(" 󰈔 Select Resume ", Style::default().fg(accent())))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));

    f.render_widget(block, popup_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(popup_area);

    let path_str = app.browser_path.to_string_lossy();
    let path_display = Paragraph::new(Line::from(vec![
        Span::styled("󰉋 ", Style::default().fg(accent())),
        Span::styled(path_str.as_ref(), Style::default().fg(text())),
    ]))
    .block(Block::default().borders(Borders::BOTTOM).border_style(Style::default().fg(inactive())));
    f.render_widget(path_display, inner[0]);

    // Keep the selection visible in long directories
    let visible = inner[1].height as usize;
    let offset = app.browser_selected.saturating_sub(visible.saturating_sub(1));

    let rows: Vec<Row> = app.browser_entries
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, entry)| {
            let icon = if entry.is_dir { "󰉋" } else { "󰈙" };
            let icon_color = if entry.is_dir { accent() } else { success() };
            let row_style = if i == app.browser_selected {
                Style::default().bg(bg_selected()).fg(text())
            } else {
                Style::default()
            };

            Row::new(vec![
                Span::styled(format!("  {} ", icon), Style::default().fg(icon_color)),
                Span::styled(entry.name.as_str(), Style::default().fg(text())),
            ])
            .style(row_style)
        })
        .collect();

    let widths = [Constraint::Length(5), Constraint::Percentage(90)];
    f.render_widget(Table::new(rows, widths), inner[1]);

    let hint = Paragraph::new(Line::from(vec![
        Span::styled("j/k", Style::default().fg(accent())),
        Span::raw(" nav │ "),
        Span::styled("Enter", Style::default().fg(accent())),
        Span::raw(" select │ "),
        Span::styled("Backspace", Style::default().fg(accent())),
        Span::raw(" up │ "),
        Span::styled(".", Style::default().fg(accent())),
        Span::raw(" hidden │ "),
        Span::styled("Esc", Style::default().fg(accent())),
        Span::raw(" cancel"),
    ]))
    .alignment(Alignment::Center)
    .style(Style::default().fg(text_dim()));
    f.render_widget(hint, inner[2]);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 70 },
        if area.height < 30 { 95 } else { 75 },
        area
    );

    f.render_widget(Clear, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(title, Style::default().fg(header()).add_modifier(Modifier::BOLD)))
    };
    let entry = |key: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(key, Style::default().fg(accent())),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        section("═══ Selecting a resume ═══"),
        entry("  o / click ", "Browse for a file"),
        entry("  drop      ", "Drag a file onto the terminal window"),
        Line::from(Span::styled("              (the terminal pastes its path)", Style::default().fg(text_dim()))),
        Line::from(""),
        section("═══ Analysis ═══"),
        entry("  Enter / a ", "Send the selected file for analysis"),
        entry("  r / Esc   ", "Reset and pick another file"),
        entry("  ↑/↓ j/k   ", "Scroll the AI feedback"),
        Line::from(""),
        section("═══ Command line ═══"),
        entry("  resumatch --analyze FILE   ", "Analyze without the TUI (JSON)"),
        entry("  resumatch --server URL     ", "Use another prediction server"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("h", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("?", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" 󰋖 resumatch Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AnalysisResult, PredictClient};
    use crate::config::AppConfig;
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn test_app() -> App {
        let client = PredictClient::new("http://127.0.0.1:9/predict", "resume");
        App::new(AppConfig::default(), None, client)
    }

    #[test]
    fn test_upload_view_renders_label_and_button() {
        let mut app = test_app();
        app.upload.select_files(&["/tmp/cv.pdf"]);
        let screen = render(&app);
        assert!(screen.contains("Selected: cv.pdf"));
        assert!(screen.contains("Analyze Resume"));
        assert!(!screen.contains("Analysis Results"));
    }

    #[test]
    fn test_results_view_hides_upload() {
        let mut app = test_app();
        app.upload.select_files(&["/tmp/cv.pdf"]);
        let request = app.upload.begin_analyze().unwrap();
        app.upload.complete_analyze(
            request.id,
            &Ok(AnalysisResult {
                role: "Data Science".to_string(),
                match_percentage: 64.5,
                ai_feedback: "**Good**\n* Python".to_string(),
                filename: None,
            }),
        );

        let screen = render(&app);
        assert!(screen.contains("Data Science"));
        assert!(screen.contains("64.5%"));
        assert!(screen.contains("• Python"));
        assert!(!screen.contains("Upload Resume"));
        assert!(!screen.contains("<strong>"));
    }

    #[test]
    fn test_drop_zone_is_inside_upload_pane() {
        let area = Rect::new(0, 0, 80, 30);
        let zone = drop_zone_area(area);
        assert!(zone.y > 1);
        assert!(zone.height >= 5);
        assert!(zone.right() < area.right());
    }
}
