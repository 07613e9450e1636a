//! Reusable UI widget helpers for the picker.
//!
//! Styling decisions shared by the input box and the dropdown rows live here
//! so both render matched text and focus the same way.

use ratatui::{
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Padding},
};
use ratatui_themes::ThemePalette;

use crate::highlight::highlight;

/// Semantic color palette derived from the active theme.
/// Maps abstract UI roles to concrete `Color` values.
pub struct UiColors {
    pub team: Color,
    pub channel: Color,
    pub photo: Color,
    pub pill: Color,
    pub clear: Color,
    pub cursor: Color,
    pub help: Color,
    pub notice: Color,
    pub active_border: Color,
    pub inactive_border: Color,
    pub focused_bg: Color,
    pub bg: Color,
    pub bar_bg: Color,
}

impl UiColors {
    pub fn from_palette(p: &ThemePalette) -> Self {
        let bar_bg = match p.bg {
            Color::Rgb(r, g, b) => Color::Rgb(
                r.saturating_add(10),
                g.saturating_add(10),
                b.saturating_add(15),
            ),
            _ => Color::Rgb(30, 30, 40),
        };

        let focused_bg = match p.selection {
            Color::Rgb(r, g, b) => Color::Rgb(r, g, b),
            _ => Color::Rgb(40, 40, 60),
        };

        Self {
            team: p.info,
            channel: p.fg,
            photo: p.secondary,
            pill: p.success,
            clear: p.error,
            cursor: p.accent,
            help: p.muted,
            notice: p.warning,
            active_border: p.accent,
            inactive_border: p.muted,
            focused_bg,
            bg: p.bg,
            bar_bg,
        }
    }
}

/// Build a bordered `Block` with a bold title in the border color.
pub fn panel_block(title: &str, border_color: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {title} "))
        .title_style(Style::default().fg(border_color).bold())
        .padding(Padding::horizontal(1))
}

/// Push the focus cursor indicator (`▶ ` or `  `) onto spans.
pub fn push_selection_cursor(spans: &mut Vec<Span<'static>>, is_focused: bool, colors: &UiColors) {
    if is_focused {
        spans.push(Span::styled(
            "▶ ",
            Style::default()
                .fg(colors.active_border)
                .add_modifier(Modifier::BOLD),
        ));
    } else {
        spans.push(Span::raw("  "));
    }
}

/// Compute `(normal_style, highlight_style)` for a name, depending on
/// whether its row has keyboard focus.
fn highlight_styles(base_color: Color, bg_color: Color, is_focused: bool) -> (Style, Style) {
    if is_focused {
        (
            Style::default()
                .fg(base_color)
                .add_modifier(Modifier::BOLD),
            Style::default()
                .fg(bg_color)
                .bg(base_color)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        (
            Style::default().fg(base_color),
            Style::default()
                .fg(base_color)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
    }
}

/// Push a display name split into before/match/after spans. Without a match
/// the name is pushed as one span.
pub fn push_highlighted_name(
    spans: &mut Vec<Span<'static>>,
    text: &str,
    filter: &str,
    base_color: Color,
    is_focused: bool,
    colors: &UiColors,
) {
    let (normal, emphasis) = highlight_styles(base_color, colors.bg, is_focused);
    let parts = highlight(text, filter);
    if !parts.is_match() {
        spans.push(Span::styled(text.to_string(), normal));
        return;
    }

    if !parts.before.is_empty() {
        spans.push(Span::styled(parts.before.to_string(), normal));
    }
    spans.push(Span::styled(parts.matched.to_string(), emphasis));
    if !parts.after.is_empty() {
        spans.push(Span::styled(parts.after.to_string(), normal));
    }
}

/// Push inline edit cursor spans (before_cursor + ▎ + after_cursor).
pub fn push_edit_cursor(
    spans: &mut Vec<Span<'static>>,
    before_cursor: &str,
    after_cursor: &str,
    colors: &UiColors,
) {
    spans.push(Span::styled(
        before_cursor.to_string(),
        Style::default().fg(colors.channel),
    ));
    spans.push(Span::styled(
        "▎",
        Style::default()
            .fg(colors.cursor)
            .add_modifier(Modifier::SLOW_BLINK),
    ));
    spans.push(Span::styled(
        after_cursor.to_string(),
        Style::default().fg(colors.channel),
    ));
}

/// Background style for the row that has keyboard focus.
pub fn focused_bg(colors: &UiColors) -> Style {
    Style::default().bg(colors.focused_bg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ratatui_themes::ThemeName;

    fn colors() -> UiColors {
        UiColors::from_palette(&ThemeName::default().palette())
    }

    fn contents(spans: &[Span<'_>]) -> Vec<String> {
        spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_highlighted_name_splits_around_match() {
        let colors = colors();
        let mut spans = Vec::new();
        push_highlighted_name(&mut spans, "Backoffice", "OFF", colors.team, false, &colors);
        assert_eq!(contents(&spans), vec!["Back", "off", "ice"]);
        assert!(spans[1].style.add_modifier.contains(Modifier::UNDERLINED));
        assert!(!spans[0].style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_highlighted_name_without_match_is_one_span() {
        let colors = colors();
        let mut spans = Vec::new();
        push_highlighted_name(&mut spans, "General", "", colors.channel, false, &colors);
        assert_eq!(contents(&spans), vec!["General"]);
    }

    #[test]
    fn test_focused_match_is_inverted() {
        let colors = colors();
        let mut spans = Vec::new();
        push_highlighted_name(&mut spans, "Backend", "back", colors.channel, true, &colors);
        assert_eq!(contents(&spans), vec!["Back", "end"]);
        assert_eq!(spans[0].style.bg, Some(colors.channel));
    }

    #[test]
    fn test_selection_cursor() {
        let colors = colors();
        let mut spans = Vec::new();
        push_selection_cursor(&mut spans, true, &colors);
        push_selection_cursor(&mut spans, false, &colors);
        assert_eq!(contents(&spans), vec!["▶ ", "  "]);
    }

    #[test]
    fn test_edit_cursor_splits_text() {
        let colors = colors();
        let mut spans = Vec::new();
        push_edit_cursor(&mut spans, "ba", "ck", &colors);
        assert_eq!(contents(&spans), vec!["ba", "▎", "ck"]);
    }
}
