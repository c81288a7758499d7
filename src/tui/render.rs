use std::borrow::Cow;

use super::settings_view::{FieldType, SettingsViewState};
use super::state::{AppState, ArticleView, CreateState, Page};
use crate::article::{paginate, Role};
use crate::theme::Palette;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame,
};

const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
/// Characters of article text shown on a list card.
pub const PREVIEW_CHARS: usize = 160;

pub fn draw(f: &mut Frame, state: &AppState, spinner_frame: u8) {
    let palette = &state.palette;
    f.render_widget(Block::default().style(palette.base), f.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // page tabs
            Constraint::Min(0),    // body
            Constraint::Length(1), // status
            Constraint::Length(1), // help
        ])
        .split(f.area());

    draw_tabs(f, state, chunks[0], spinner_frame);
    match state.page {
        Page::MyArticles => match &state.viewing {
            Some(view) => draw_article(f, view, palette, chunks[1]),
            None => draw_article_grid(f, state, chunks[1]),
        },
        Page::CreateArticle => draw_create(f, state, chunks[1]),
        Page::Settings => draw_settings(f, &state.settings, palette, chunks[1]),
    }
    draw_status(f, state, chunks[2]);
    draw_footer(f, state, chunks[3]);
}

fn draw_tabs(f: &mut Frame, state: &AppState, area: Rect, spinner_frame: u8) {
    let titles: Vec<Line> = Page::ALL.iter().map(|p| Line::from(p.title())).collect();
    let title = if state.is_running() {
        let ch = SPINNER_FRAMES[(spinner_frame as usize) % SPINNER_FRAMES.len()];
        format!(" STORM Wiki {} generating ", ch)
    } else {
        " STORM Wiki ".to_string()
    };
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(title).style(state.palette.sidebar))
        .highlight_style(state.palette.accent)
        .select(state.page.index());
    f.render_widget(tabs, area);
}

fn draw_article_grid(f: &mut Frame, state: &AppState, area: Rect) {
    let palette = &state.palette;
    if state.articles.is_empty() {
        let msg = Paragraph::new("No articles yet. Create one from the Create Article page.")
            .style(palette.muted)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" My Articles "));
        f.render_widget(msg, area);
        return;
    }

    let page = paginate(state.articles.len(), state.general.page_size, state.page_number);
    let outer = Block::default().borders(Borders::ALL).title(format!(
        " My Articles [page {}/{} | {} per page] ",
        page.number,
        page.total_pages,
        state.general.page_size
    ));
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let columns = state.general.num_columns.clamp(1, 4);
    let count = page.end - page.start;
    let rows = count.div_ceil(columns).max(1);
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(6); rows])
        .split(inner);

    for (slot, idx) in page.range().enumerate() {
        let Some(row_area) = row_areas.get(slot / columns) else { break };
        let col_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
            .split(*row_area);
        let cell = col_areas[slot % columns];

        let article = &state.articles[idx];
        let selected = idx == state.selected_article;
        let style = if selected { palette.selected } else { palette.panel };
        let width = cell.width.saturating_sub(2) as usize;
        let preview = state.previews.get(idx).map(String::as_str).unwrap_or("");

        let lines = vec![
            Line::from(Span::styled(
                truncate_with_ellipsis(&article.category, width).into_owned(),
                palette.muted,
            )),
            Line::from(format!("{}...", preview)),
        ];
        let card = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(truncate_with_ellipsis(&article.title(), width).into_owned())
                    .border_style(style),
            )
            .style(style);
        f.render_widget(card, cell);
    }
}

fn draw_article(f: &mut Frame, view: &ArticleView, palette: &Palette, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
        .split(area);

    let toc: Vec<Line> = view
        .toc
        .iter()
        .map(|entry| {
            let indent = "  ".repeat(entry.level.saturating_sub(1));
            Line::from(format!("{}- {}", indent, entry.title))
        })
        .collect();
    let toc_widget = Paragraph::new(toc)
        .wrap(Wrap { trim: false })
        .style(palette.sidebar)
        .block(Block::default().borders(Borders::ALL).title(" Table of contents "));
    f.render_widget(toc_widget, chunks[0]);

    let lines: Vec<Line> = if view.show_conversations {
        conversation_lines(view, palette)
    } else {
        let mut lines: Vec<Line> = view.body.lines().map(|l| markdown_line(l, palette)).collect();
        if let Some(refs) = &view.references {
            lines.push(Line::from(""));
            lines.extend(refs.lines().map(|l| markdown_line(l, palette)));
        }
        lines
    };
    let title = if view.show_conversations {
        format!(" {} - conversation log ", view.title)
    } else {
        format!(" {} ", view.title)
    };
    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((view.scroll, 0))
        .style(palette.base)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(body, chunks[1]);
}

fn markdown_line<'a>(line: &'a str, palette: &Palette) -> Line<'a> {
    if line.starts_with('#') {
        Line::from(Span::styled(line, palette.accent))
    } else {
        Line::from(line)
    }
}

fn conversation_lines<'a>(view: &'a ArticleView, palette: &Palette) -> Vec<Line<'a>> {
    if view.conversations.is_empty() {
        return vec![Line::from(Span::styled("No conversation log for this article.", palette.muted))];
    }
    let mut lines = Vec::new();
    for persona in &view.conversations {
        let name = if persona.name.is_empty() { "Persona" } else { persona.name.as_str() };
        lines.push(Line::from(Span::styled(name, palette.accent)));
        lines.push(Line::from(Span::styled(persona.description.as_str(), palette.muted)));
        for msg in &persona.messages {
            let who = match msg.role {
                Role::User => "Q: ",
                Role::Assistant => "A: ",
            };
            lines.push(Line::from(vec![
                Span::styled(who, Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(msg.content.as_str()),
            ]));
        }
        lines.push(Line::from(""));
    }
    lines
}

fn draw_create(f: &mut Frame, state: &AppState, area: Rect) {
    let palette = &state.palette;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // topic input
            Constraint::Length(3), // progress
            Constraint::Min(0),    // log
        ])
        .split(area);

    let input = if matches!(state.create, CreateState::NotStarted | CreateState::Failed(_)) {
        format!("{}\u{258f}", state.topic_input)
    } else {
        state.topic_input.clone()
    };
    let input_widget = Paragraph::new(input)
        .style(palette.panel)
        .block(Block::default().borders(Borders::ALL).title(" Enter the topic "));
    f.render_widget(input_widget, chunks[0]);

    let (ratio, label) = match &state.create {
        CreateState::NotStarted => (0.0, "Press Enter to start researching".to_string()),
        CreateState::Running { topic, step, total } => (
            *step as f64 / (*total).max(1) as f64,
            format!("brainSTORMing '{}' ({}/{})", topic, step, total),
        ),
        CreateState::Completed { topic } => (1.0, format!("'{}' is ready in My Articles", topic)),
        CreateState::Failed(e) => (0.0, format!("Failed to generate the article: {}", e)),
    };
    let gauge_style = match &state.create {
        CreateState::Failed(_) => Style::default().fg(Color::Red),
        _ => palette.accent,
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Progress "))
        .gauge_style(gauge_style)
        .ratio(ratio.clamp(0.0, 1.0))
        .label(label);
    f.render_widget(gauge, chunks[1]);

    draw_logs(f, state, chunks[2]);
}

fn draw_logs(f: &mut Frame, state: &AppState, area: Rect) {
    let max_width = area.width.saturating_sub(2) as usize; // borders
    let visible_lines = area.height.saturating_sub(2) as usize;

    let lines: Vec<Line> = state
        .logs
        .iter()
        .rev()
        .take(visible_lines)
        .map(|l| {
            let color = match l.level.as_str() {
                "ERROR" => Color::Red,
                "WARN" => Color::Yellow,
                "STEP" => Color::Cyan,
                _ => Color::DarkGray,
            };
            let prefix = format!(" {} [{}] ", l.time, l.level);
            let msg_max = max_width.saturating_sub(prefix.len());
            let msg = truncate_with_ellipsis(&l.message, msg_max);
            Line::from(vec![
                Span::styled(prefix, Style::default().fg(color)),
                Span::raw(msg.into_owned()),
            ])
        })
        .collect();

    let para = Paragraph::new(lines).block(Block::default().title(" Activity ").borders(Borders::ALL));
    f.render_widget(para, area);
}

fn draw_settings(f: &mut Frame, sv: &SettingsViewState, palette: &Palette, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let tab_titles: Vec<Line> = sv
        .tabs
        .iter()
        .enumerate()
        .map(|(i, t)| {
            if i == sv.active_tab {
                Line::from(Span::styled(t.label.as_str(), palette.accent))
            } else {
                Line::from(Span::raw(t.label.as_str()))
            }
        })
        .collect();
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(" Settings "))
        .highlight_style(palette.accent)
        .select(sv.active_tab);
    f.render_widget(tabs, chunks[0]);

    let Some(active_tab) = sv.tabs.get(sv.active_tab) else { return };
    let rows: Vec<Row> = active_tab
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let value_str = if sv.editing && i == sv.selected_field {
                format!("{}\u{258f}", sv.edit_buffer) // show cursor
            } else {
                match &field.field_type {
                    FieldType::Enum(_) => format!("\u{25c0} {} \u{25b6}", field.value),
                    FieldType::Secret if !field.value.is_empty() => "\u{2022}".repeat(8),
                    _ => field.value.clone(),
                }
            };
            let value_style = if field.read_only {
                palette.muted
            } else if i == sv.selected_field {
                palette.accent
            } else {
                Style::default()
            };
            Row::new(vec![Cell::from(field.label.clone()), Cell::from(value_str).style(value_style)])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Percentage(40), Constraint::Percentage(60)])
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", active_tab.label)))
        .row_highlight_style(palette.selected);
    let mut table_state = TableState::default();
    table_state.select(Some(sv.selected_field));
    f.render_stateful_widget(table, chunks[1], &mut table_state);
}

fn draw_status(f: &mut Frame, state: &AppState, area: Rect) {
    let (text, style) = match &state.status {
        Some(msg) => (msg.as_str(), state.palette.accent),
        None => ("", state.palette.muted),
    };
    let width = area.width as usize;
    f.render_widget(Paragraph::new(truncate_with_ellipsis(text, width).into_owned()).style(style), area);
}

fn draw_footer(f: &mut Frame, state: &AppState, area: Rect) {
    let keys: &[(&str, &str)] = match state.page {
        Page::MyArticles if state.viewing.is_some() => {
            &[("[Esc]", "back"), ("[j/k]", "scroll"), ("[c]", "conversations"), ("[Tab]", "page")]
        }
        Page::MyArticles => &[
            ("[Tab]", "page"),
            ("[\u{2190}\u{2191}\u{2192}\u{2193}]", "select"),
            ("[Enter]", "read"),
            ("[r]", "refresh"),
            ("[q]", "quit"),
        ],
        Page::CreateArticle => &[("[Tab]", "page"), ("[Enter]", "research"), ("[Esc]", "clear"), ("[Ctrl-C]", "quit")],
        Page::Settings if state.settings.editing => &[("[Enter]", "confirm"), ("[Esc]", "cancel")],
        Page::Settings => &[
            ("[Tab]", "page"),
            ("[\u{2190}\u{2192}]", "section"),
            ("[\u{2191}\u{2193}]", "field"),
            ("[Enter]", "edit"),
            ("[Space]", "cycle"),
            ("[q]", "quit"),
        ],
    };
    let spans: Vec<Span> = keys
        .iter()
        .flat_map(|(key, action)| {
            [
                Span::styled(format!(" {}", key), Style::default().fg(Color::Yellow)),
                Span::raw(format!(" {} ", action)),
            ]
        })
        .collect();
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Shorten to `max_width` characters, marking the cut with `...`.
pub fn truncate_with_ellipsis(s: &str, max_width: usize) -> Cow<'_, str> {
    let char_count = s.chars().count();
    if char_count <= max_width {
        Cow::Borrowed(s)
    } else if max_width <= 3 {
        Cow::Owned(".".repeat(max_width))
    } else {
        let end = s
            .char_indices()
            .nth(max_width - 3)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        Cow::Owned(format!("{}...", &s[..end]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate_with_ellipsis("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_very_small_width() {
        assert_eq!(truncate_with_ellipsis("hello", 2), "..");
        assert_eq!(truncate_with_ellipsis("hello", 0), "");
    }

    #[test]
    fn test_truncate_multibyte_chars() {
        // é is 2 bytes in UTF-8; must not panic when truncation lands inside it
        let s = "Café Société history";
        let result = truncate_with_ellipsis(s, 9);
        assert_eq!(result, "Café S...");
        assert!(result.chars().count() <= 9);
    }
}
