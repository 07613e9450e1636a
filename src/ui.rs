use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

use crate::app::{App, PickerState, Region};
use crate::tree::{FlatRow, PresentationTree};
use crate::widgets::{
    focused_bg, panel_block, push_edit_cursor, push_highlighted_name, push_selection_cursor,
    UiColors,
};

const PLACEHOLDER: &str = "Type to search teams and channels";
const CLEAR_GLYPH: &str = "✕";

/// Main render function called from the event loop. Also registers the
/// click regions used by mouse handling.
pub fn render(frame: &mut Frame, app: &mut App) {
    let colors = UiColors::from_palette(&app.palette());
    app.click_regions.clear();

    let area = frame.area();

    // Top-level vertical layout:
    //   [title bar]
    //   [input box]
    //   [dropdown]
    //   [help bar]
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(3), // input
            Constraint::Min(3),    // dropdown
            Constraint::Length(1), // help
        ])
        .split(area);

    render_title(frame, app, outer[0], &colors);
    render_input(frame, app, outer[1], &colors);
    if app.is_open() {
        render_dropdown(frame, app, outer[2], &colors);
    }
    render_help_bar(frame, app, outer[3], &colors);
}

fn render_title(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let mut spans = vec![
        Span::raw(" "),
        Span::styled(
            "Team / Channel",
            Style::default()
                .fg(colors.team)
                .add_modifier(Modifier::BOLD),
        ),
    ];
    let status = if app.is_loading() {
        Some("  loading…")
    } else if app.is_open() && app.filter_pending() {
        Some("  filtering…")
    } else {
        None
    };
    if let Some(status) = status {
        spans.push(Span::styled(
            status,
            Style::default().fg(colors.help).italic(),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the input box: the typed text with a cursor, the selected pair with
/// a clear affordance, or a placeholder.
fn render_input(frame: &mut Frame, app: &mut App, area: Rect, colors: &UiColors) {
    let border_color = if app.is_open() {
        colors.active_border
    } else {
        colors.inactive_border
    };
    let block = panel_block("Channel", border_color);
    let inner = block.inner(area);

    let text = app.text().to_string();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut clear_x = None;

    if !text.is_empty() || (app.is_open() && app.selected().is_none()) {
        let split = text
            .char_indices()
            .nth(app.input.cursor_pos)
            .map_or(text.len(), |(i, _)| i);
        push_edit_cursor(&mut spans, &text[..split], &text[split..], colors);
    } else if let Some(selected) = app.selected() {
        spans.push(Span::styled(
            selected.label(),
            Style::default()
                .fg(colors.pill)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" "));
        clear_x = Some(inner.x + Line::from(spans.clone()).width() as u16);
        spans.push(Span::styled(
            CLEAR_GLYPH,
            Style::default()
                .fg(colors.clear)
                .add_modifier(Modifier::BOLD),
        ));
    } else {
        spans.push(Span::styled(
            PLACEHOLDER,
            Style::default().fg(colors.help).italic(),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);

    match clear_x.filter(|&x| x < inner.right()) {
        Some(x) => {
            // Keep the regions disjoint: input left of the glyph, clear on
            // it, input again to the right.
            let clear = Rect::new(x, inner.y, 1, 1);
            app.click_regions.register(
                Rect::new(area.x, area.y, x - area.x, area.height),
                Region::Input,
            );
            app.click_regions.register(clear, Region::Clear);
            app.click_regions.register(
                Rect::new(x + 1, area.y, area.right() - x - 1, area.height),
                Region::Input,
            );
        }
        None => app.click_regions.register(area, Region::Input),
    }
}

/// Render the dropdown list of visible rows, or a status line.
fn render_dropdown(frame: &mut Frame, app: &mut App, area: Rect, colors: &UiColors) {
    let block = panel_block("Teams", colors.active_border);
    let inner = block.inner(area);
    app.click_regions.register(area, Region::List);

    let notice = if app.is_loading() {
        Some("Loading teams…")
    } else if app.is_unavailable() || !app.is_loaded() {
        Some("No teams available")
    } else if app.tree().is_none_or(PresentationTree::is_empty) {
        if app.filter().trim().is_empty() {
            Some("No teams available")
        } else {
            Some("No results")
        }
    } else {
        None
    };

    if let Some(notice) = notice {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            notice,
            Style::default().fg(colors.notice).italic(),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    app.ensure_visible(inner.height as usize);

    let Some(tree) = app.tree() else {
        return;
    };
    let highlighted = app.highlighted_row();
    let items: Vec<ListItem> = app
        .rows()
        .iter()
        .enumerate()
        .skip(app.list_scroll)
        .take(inner.height as usize)
        .map(|(i, row)| {
            let is_focused = highlighted == Some(i);
            let line = Line::from(row_spans(app, tree, row, is_focused, colors));
            let item = ListItem::new(line);
            if is_focused {
                item.style(focused_bg(colors))
            } else {
                item
            }
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn row_spans(
    app: &App,
    tree: &PresentationTree,
    row: &FlatRow,
    is_focused: bool,
    colors: &UiColors,
) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let Some(node) = tree.get(row.node) else {
        return spans;
    };

    push_selection_cursor(&mut spans, is_focused, colors);
    spans.push(Span::raw("  ".repeat(row.depth)));

    if node.is_team() {
        let marker = if node.expanded { "▾ " } else { "▸ " };
        spans.push(Span::styled(marker, Style::default().fg(colors.help)));
        if let Some(photo) = app.photo(&node.item.id) {
            spans.push(Span::styled(
                format!("{} ", photo.0),
                Style::default().fg(colors.photo),
            ));
        }
        push_highlighted_name(
            &mut spans,
            &node.item.display_name,
            app.filter(),
            colors.team,
            is_focused,
            colors,
        );
    } else {
        spans.push(Span::styled("# ", Style::default().fg(colors.help)));
        push_highlighted_name(
            &mut spans,
            &node.item.display_name,
            app.filter(),
            colors.channel,
            is_focused,
            colors,
        );

        let team_id = node.parent.and_then(|p| tree.get(p)).map(|t| &t.item.id);
        let is_selected = app
            .selected()
            .is_some_and(|s| s.channel.id == node.item.id && Some(&s.team.id) == team_id);
        if is_selected {
            spans.push(Span::styled(" ✓", Style::default().fg(colors.pill)));
        }
    }
    spans
}

/// Render the keybinding hints for the current state.
fn render_help_bar(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let keybinds = match app.state() {
        PickerState::Closed => "Type/↓/Enter: open  Esc: quit",
        PickerState::Selected => "Enter: accept  Backspace: clear  Type: search  Esc: quit",
        PickerState::OpenEmpty | PickerState::OpenFiltering => {
            "↑↓: navigate  Enter: expand/select  Esc: close  Tab: leave"
        }
    };

    let hints = Paragraph::new(Line::from(vec![Span::styled(
        format!(" {keybinds}"),
        Style::default().fg(colors.help),
    )]))
    .style(Style::default().bg(colors.bar_bg));
    frame.render_widget(hints, area);
}
