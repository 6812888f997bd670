use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::App;
use crate::input::{Action, InputMode};
use crate::model::Depth;
use crate::view::{ListView, ViewAction};

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const HIGHLIGHT: Color = Color::Rgb(24, 36, 58);

const DETAIL_HEIGHT: u16 = 6;

pub fn render(frame: &mut Frame, app: &mut App) {
    let view = app.view();
    let mut constraints = Vec::with_capacity(5);
    if app.show_title() {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(3));
    constraints.push(Constraint::Length(DETAIL_HEIGHT));
    if app.show_status_bar() {
        constraints.push(Constraint::Length(1));
    }
    if app.show_help() {
        constraints.push(Constraint::Length(1));
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());
    let mut slots = chunks.iter().copied();

    if app.show_title()
        && let Some(area) = slots.next()
    {
        render_title(frame, area, app, &view);
    }
    if let Some(area) = slots.next() {
        app.set_page_size(list_rows_visible(area));
        render_list(frame, area, app, &view);
    }
    if let Some(area) = slots.next() {
        render_detail(frame, area, app, &view);
    }
    if app.show_status_bar()
        && let Some(area) = slots.next()
    {
        render_status(frame, area, app);
    }
    if app.show_help()
        && let Some(area) = slots.next()
    {
        render_help(frame, area, app, &view);
    }
}

fn render_title(frame: &mut Frame, area: Rect, app: &App, view: &ListView) {
    let mut spans = vec![
        Span::styled(
            " kubenav ",
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            view.title.clone(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
    ];
    if !app.cluster_label().is_empty() {
        spans.push(Span::styled(
            format!("  {}", app.cluster_label()),
            Style::default().fg(MUTED),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_list(frame: &mut Frame, area: Rect, app: &App, view: &ListView) {
    if let Some(error) = &view.error {
        let panel = Paragraph::new(Text::from(error.clone()))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(format!("{} Error", view.title))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(ERROR))
                    .style(Style::default().bg(PANEL)),
            )
            .style(Style::default().fg(ERROR));
        frame.render_widget(panel, area);
        return;
    }

    let visible = app.visible_items();
    let title = if app.filter().is_empty() {
        format!("{} ({})", view.title, visible.len())
    } else {
        format!("{} ({}/{})", view.title, visible.len(), view.items.len())
    };
    let rows = visible
        .iter()
        .map(|item| {
            let style = if item.is_placeholder() {
                Style::default().fg(ERROR)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(Span::styled(item.text().to_string(), style)))
        })
        .collect::<Vec<_>>();

    let list = List::new(rows)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .highlight_style(
            Style::default()
                .bg(HIGHLIGHT)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.selected_index());
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_detail(frame: &mut Frame, area: Rect, app: &App, view: &ListView) {
    let (title, body) = detail_content(app, view);
    let focused = app.mode() == InputMode::ExecInput;
    let paragraph = Paragraph::new(Text::from(body))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(if focused {
                    Style::default().fg(ACCENT)
                } else {
                    Style::default().fg(MUTED)
                })
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

/// Title and body of the box under the list for the current depth.
fn detail_content(app: &App, view: &ListView) -> (String, String) {
    match app.depth() {
        Depth::Logs => (
            "Log line".to_string(),
            app.current_log().unwrap_or("-").to_string(),
        ),
        Depth::ExecInput => {
            let command = &app.session().command;
            (
                format!(
                    "Command ({}/{})",
                    command.chars().count(),
                    app.exec_char_limit()
                ),
                format!("$ {command}_"),
            )
        }
        Depth::ExecOutput => {
            let stderr = app.session().stderr.trim_end();
            let body = if stderr.is_empty() {
                "(no stderr)".to_string()
            } else {
                stderr.to_string()
            };
            ("Stderr".to_string(), body)
        }
        Depth::Namespaces | Depth::Pods | Depth::Containers => {
            ("Context".to_string(), view.breadcrumb.clone())
        }
    }
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        format!(
            " {} ",
            compact_text(app.status(), area.width.saturating_sub(40).max(16) as usize)
        ),
        Style::default().fg(Color::White).bg(HIGHLIGHT),
    )];

    let mut glance = vec![format!("{} items", app.visible_items().len())];
    if app.mode() == InputMode::Filter {
        glance.push(format!("filter: {}_", app.filter()));
    } else if !app.filter().is_empty() {
        glance.push(format!("filter: {}", app.filter()));
    }
    if let Some(fetched_at) = app.listing().fetched_at {
        glance.push(format!("fetched {}", fetched_at.format("%H:%M:%S")));
    }
    if app.show_pagination() {
        glance.push(format!("page {}", app.page_label()));
    }
    spans.push(Span::styled(
        format!(" {}", glance.join(" | ")),
        Style::default().fg(if app.mode() == InputMode::Filter {
            WARN
        } else {
            MUTED
        }),
    ));

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_help(frame: &mut Frame, area: Rect, app: &App, view: &ListView) {
    frame.render_widget(
        Paragraph::new(help_line(app, view)).style(Style::default().fg(MUTED).bg(BG)),
        area,
    );
}

fn help_line(app: &App, view: &ListView) -> String {
    let keymap = app.keymap();
    let bound = |action: &Action, fallback: &str| {
        keymap
            .label_for(action)
            .unwrap_or_else(|| fallback.to_string())
    };

    let mut parts = Vec::new();
    match app.mode() {
        // The prompt owns printable keys, so only its fixed keys are advertised.
        InputMode::ExecInput => {
            for action in &view.actions {
                match action {
                    ViewAction::Select => parts.push("enter run".to_string()),
                    ViewAction::Back => parts.push("esc/ctrl+h back".to_string()),
                    ViewAction::Exec => {}
                }
            }
            parts.push("ctrl+c quit".to_string());
        }
        InputMode::Filter => parts.push("enter keep filter  esc clear".to_string()),
        InputMode::Browse => {
            for action in &view.actions {
                let part = match action {
                    ViewAction::Select => format!("{} select", bound(&Action::Select, "enter")),
                    ViewAction::Back => format!("{} back", bound(&Action::Back, "ctrl+h")),
                    ViewAction::Exec => format!("{} exec", bound(&Action::ExecRequested, "e")),
                };
                parts.push(part);
            }
            parts.push(format!("{} filter", bound(&Action::StartFilter, "/")));
            parts.push(format!("{} quit", bound(&Action::Quit, "q")));
            parts.push("T/S/P/H toggle".to_string());
        }
    }
    format!(" {}", parts.join("  "))
}

fn list_rows_visible(area: Rect) -> usize {
    area.height.saturating_sub(2).max(1) as usize
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::{compact_text, detail_content, help_line, render};
    use crate::app::{App, DEFAULT_EXEC_CHAR_LIMIT};
    use crate::input::{Action, InputMode, KeyMap, KeyOverrides};
    use crate::model::ListingKind;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn app_with_namespaces() -> App {
        let mut app = App::new(KeyMap::default(), DEFAULT_EXEC_CHAR_LIMIT);
        app.apply_listing(
            ListingKind::Namespaces,
            Ok(vec!["default".to_string(), "kube-system".to_string()]),
        );
        app
    }

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal
            .draw(|frame| render(frame, app))
            .expect("draw frame");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn renders_items_and_title() {
        let mut app = app_with_namespaces();
        app.set_cluster_label("dev@https://127.0.0.1:6443");
        let screen = draw(&mut app, 80, 20);

        assert!(screen.contains("kubenav"));
        assert!(screen.contains("Namespaces (2)"));
        assert!(screen.contains("kube-system"));
        assert!(screen.contains("dev@https://127.0.0.1:6443"));
    }

    #[test]
    fn hidden_title_is_not_drawn() {
        let mut app = app_with_namespaces();
        app.apply_action(Action::ToggleTitle);
        let screen = draw(&mut app, 80, 20);

        assert!(!screen.contains(" kubenav "));
        assert!(screen.contains("kube-system"));
    }

    #[test]
    fn renders_error_panel() {
        let mut app = App::new(KeyMap::default(), DEFAULT_EXEC_CHAR_LIMIT);
        app.apply_listing(
            ListingKind::Namespaces,
            Err(crate::error::ClusterQueryError::new(
                "failed to list namespaces",
                "forbidden",
            )),
        );
        let screen = draw(&mut app, 80, 20);

        assert!(screen.contains("Namespaces Error"));
        assert!(screen.contains("failed to list namespaces: forbidden"));
    }

    #[test]
    fn page_size_follows_list_area() {
        let mut app = App::new(KeyMap::default(), DEFAULT_EXEC_CHAR_LIMIT);
        app.apply_listing(
            ListingKind::Namespaces,
            Ok((0..25).map(|index| format!("ns-{index}")).collect()),
        );
        draw(&mut app, 80, 20);
        // 11 rows remain for the list block, 9 inside its borders.
        assert_eq!(app.page_label(), "1/3");
    }

    #[test]
    fn detail_shows_breadcrumb_while_browsing() {
        let app = app_with_namespaces();
        assert_eq!(
            detail_content(&app, &app.view()),
            ("Context".to_string(), "-".to_string())
        );
    }

    #[test]
    fn help_line_lists_default_bindings() {
        let app = app_with_namespaces();
        let help = help_line(&app, &app.view());
        assert!(help.contains("enter select"));
        assert!(help.contains("/ filter"));
        assert!(help.contains("ctrl+c quit"));
        assert!(!help.contains("back"));
    }

    fn app_at_exec_prompt(keymap: KeyMap) -> App {
        let mut app = App::new(keymap, DEFAULT_EXEC_CHAR_LIMIT);
        app.apply_listing(ListingKind::Namespaces, Ok(vec!["default".to_string()]));
        app.apply_action(Action::Select);
        app.apply_listing(ListingKind::Pods, Ok(vec!["web-0".to_string()]));
        app.apply_action(Action::Select);
        app.apply_listing(ListingKind::Containers, Ok(vec!["nginx".to_string()]));
        app.apply_action(Action::ExecRequested);
        assert_eq!(app.mode(), InputMode::ExecInput);
        app
    }

    #[test]
    fn exec_prompt_help_names_prompt_keys() {
        let app = app_at_exec_prompt(KeyMap::default());
        let help = help_line(&app, &app.view());

        assert_eq!(help, " enter run  esc/ctrl+h back  ctrl+c quit");
        assert!(!help.contains("backspace"));
    }

    #[test]
    fn exec_prompt_help_ignores_rebound_back_key() {
        let keymap = KeyMap::from_overrides(&KeyOverrides {
            back: Some(vec!["h".to_string()]),
            ..KeyOverrides::default()
        });
        let app = app_at_exec_prompt(keymap);
        let help = help_line(&app, &app.view());

        assert_eq!(help, " enter run  esc/ctrl+h back  ctrl+c quit");
    }

    #[test]
    fn filter_help_does_not_advertise_select() {
        let mut app = app_with_namespaces();
        app.apply_action(Action::StartFilter);
        let help = help_line(&app, &app.view());

        assert_eq!(help, " enter keep filter  esc clear");
    }

    #[test]
    fn compact_text_truncates_with_ellipsis() {
        assert_eq!(compact_text("abcdef", 4), "abc…");
        assert_eq!(compact_text("abc", 4), "abc");
        assert_eq!(compact_text("abc", 1), "…");
    }
}
