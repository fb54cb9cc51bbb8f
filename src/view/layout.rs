//! Layout rendering (top bar, tab strip)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};
use ratatui::widgets::Padding;

use crate::model::{ActiveTab, AppState};
use super::utils::Palette;

pub fn render_top_bar(frame: &mut Frame, area: Rect, state: &AppState, device_name: &str, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Search input
            Constraint::Length(34), // Account and preferences
        ])
        .split(area);

    let ui = &state.ui;
    let search_text = if ui.search_query.is_empty() && !ui.search_focused {
        "Press / to search..."
    } else {
        &ui.search_query
    };
    let cursor = if ui.search_focused { "▏" } else { "" };

    let search = Paragraph::new(format!("{search_text}{cursor}"))
        .style(if ui.search_focused {
            Style::default().fg(palette.accent)
        } else {
            Style::default().fg(palette.text)
        })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Search ")
                .padding(Padding::horizontal(1))
                .border_style(palette.border(ui.search_focused)),
        );
    frame.render_widget(search, chunks[0]);

    let account = match &state.session {
        Some(session) => {
            let short: String = session.uid.chars().take(8).collect();
            format!("☁ {short}")
        }
        None => format!("♫ {device_name}"),
    };
    let preferences = format!(
        "{} · {}",
        state.preferences.theme,
        state.preferences.language.label()
    );
    let status = Paragraph::new(Line::from(vec![
        Span::styled(account, Style::default().fg(palette.highlight)),
        Span::raw("  "),
        Span::styled(preferences, Style::default().fg(palette.muted)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(if state.session.is_some() { " Synced " } else { " Local " }),
    );
    frame.render_widget(status, chunks[1]);
}

pub fn render_tabs(frame: &mut Frame, area: Rect, state: &AppState, palette: &Palette) {
    let titles: Vec<Line> = ActiveTab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| Line::from(format!("{} {}", i + 1, tab.title())))
        .collect();

    let mut block = Block::default().borders(Borders::ALL);
    if let Some(notice) = state.ui.notice.as_deref() {
        block = block.title_bottom(
            Line::from(Span::styled(format!(" {notice} "), Style::default().fg(palette.highlight)))
                .right_aligned(),
        );
    }

    let tabs = Tabs::new(titles)
        .select(state.ui.active_tab.index())
        .style(Style::default().fg(palette.muted))
        .highlight_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )
        .block(block);
    frame.render_widget(tabs, area);
}
