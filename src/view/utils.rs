//! Utility functions for rendering UI components

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, List, ListItem, ListState},
    Frame,
};

use crate::model::Theme;

/// Colors for one theme.
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub accent: Color,
    pub highlight: Color,
    pub text: Color,
    pub muted: Color,
    pub background: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                accent: Color::Green,
                highlight: Color::Cyan,
                text: Color::White,
                muted: Color::DarkGray,
                background: Color::Black,
            },
            Theme::Neon => Self {
                accent: Color::LightMagenta,
                highlight: Color::LightCyan,
                text: Color::White,
                muted: Color::Gray,
                background: Color::Black,
            },
            Theme::Purple => Self {
                accent: Color::Magenta,
                highlight: Color::LightBlue,
                text: Color::White,
                muted: Color::DarkGray,
                background: Color::Black,
            },
            Theme::Blue => Self {
                accent: Color::Blue,
                highlight: Color::LightCyan,
                text: Color::White,
                muted: Color::DarkGray,
                background: Color::Black,
            },
        }
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.accent)
        } else {
            Style::default()
        }
    }

    pub fn row(&self, selected: bool, focused: bool, playing: bool) -> Style {
        if selected && focused {
            Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
        } else if playing {
            Style::default().fg(self.highlight).add_modifier(Modifier::BOLD)
        } else if selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.text)
        }
    }
}

pub fn render_scrollable_list(
    frame: &mut Frame,
    area: Rect,
    items: Vec<ListItem>,
    selected_index: usize,
    block: Block,
) {
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default()); // Highlight handled by item styles

    let mut list_state = ListState::default();
    list_state.select(Some(selected_index));

    frame.render_stateful_widget(list, area, &mut list_state);
}

pub fn format_seconds(secs: f64) -> String {
    let total_seconds = secs.max(0.0) as u64;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{}:{:02}", minutes, seconds)
}

/// Catalog durations come as ISO-8601 (`PT4M13S`); show them as `4:13`.
pub fn format_iso_duration(iso: &str) -> Option<String> {
    let rest = iso.strip_prefix("PT")?;
    let mut total = 0u64;
    let mut number = String::new();
    for c in rest.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let value: u64 = number.parse().ok()?;
        number.clear();
        total += match c {
            'H' => value * 3600,
            'M' => value * 60,
            'S' => value,
            _ => return None,
        };
    }
    if !number.is_empty() {
        return None;
    }
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    Some(if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    })
}

/// `1234567` -> `1.2M views`
pub fn format_views(count: &str) -> Option<String> {
    let n: u64 = count.parse().ok()?;
    let text = match n {
        0..=999 => n.to_string(),
        1_000..=999_999 => format!("{:.1}K", n as f64 / 1_000.0),
        1_000_000..=999_999_999 => format!("{:.1}M", n as f64 / 1_000_000.0),
        _ => format!("{:.1}B", n as f64 / 1_000_000_000.0),
    };
    Some(format!("{} views", text))
}

/// Calculate width needed for index column (log10(n) + padding)
pub fn calculate_num_width(item_count: usize) -> usize {
    if item_count == 0 {
        2
    } else {
        let digits = (item_count as f64).log10().floor() as usize + 1;
        digits + 1
    }
}

pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        let truncated: String = s.chars().take(max_width.saturating_sub(3)).collect();
        format!("{:<width$}", format!("{}...", truncated), width = max_width)
    } else {
        format!("{:<width$}", s, width = max_width)
    }
}

/// Centered popup of at most `width` x `height` inside `area`.
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_format_as_minutes() {
        assert_eq!(format_seconds(0.0), "0:00");
        assert_eq!(format_seconds(61.9), "1:01");
        assert_eq!(format_seconds(-3.0), "0:00");
    }

    #[test]
    fn iso_durations_are_readable() {
        assert_eq!(format_iso_duration("PT4M13S").as_deref(), Some("4:13"));
        assert_eq!(format_iso_duration("PT1H2M3S").as_deref(), Some("1:02:03"));
        assert_eq!(format_iso_duration("PT45S").as_deref(), Some("0:45"));
        assert_eq!(format_iso_duration("4:13"), None);
    }

    #[test]
    fn view_counts_are_abbreviated() {
        assert_eq!(format_views("999").as_deref(), Some("999 views"));
        assert_eq!(format_views("1234567").as_deref(), Some("1.2M views"));
        assert_eq!(format_views("n/a"), None);
    }

    #[test]
    fn long_strings_are_truncated_to_width() {
        assert_eq!(truncate_string("abcdefgh", 6), "abc...");
        assert_eq!(truncate_string("ab", 4), "ab  ");
    }

    #[test]
    fn popups_fit_small_terminals() {
        let area = Rect::new(0, 0, 30, 10);
        let popup = centered_rect(area, 60, 40);
        assert_eq!((popup.width, popup.height), (26, 6));
        assert_eq!((popup.x, popup.y), (2, 2));
    }
}
