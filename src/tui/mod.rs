pub mod render;
pub mod settings_view;
pub mod state;

use crate::app::AppContext;
use crate::article::{assemble_article, list_articles};
use crate::runner::RunEvent;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use settings_view::{apply_edit, build_settings_tabs, cycle_enum, FieldType, SettingsField, SettingsSnapshot, SettingsViewState};
use state::{AppState, ArticleView, CreateState, Page};
use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Actions that need the application context, produced by key handling.
#[derive(Debug, Clone)]
pub enum TuiCommand {
    Quit,
    Refresh,
    OpenArticle(usize),
    Generate(String),
    SaveSetting { field: SettingsField, raw: String },
}

/// Run the dashboard until the user quits.
pub async fn run_tui(ctx: AppContext) -> Result<()> {
    let mut state = initial_state(&ctx)?;
    reload_articles(&ctx, &mut state);

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = tui_loop(&mut terminal, &ctx, &mut state).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn initial_state(ctx: &AppContext) -> Result<AppState> {
    let snapshot = SettingsSnapshot::load(&ctx.store)?;
    let settings = SettingsViewState::new(build_settings_tabs(&snapshot));
    Ok(AppState::new(snapshot.general, &snapshot.theme, settings))
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    ctx: &AppContext,
    state: &mut AppState,
) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<RunEvent>();
    let mut generation: Option<JoinHandle<Result<PathBuf>>> = None;
    let mut spinner_frame: u8 = 0;

    loop {
        while let Ok(event) = event_rx.try_recv() {
            apply_run_event(state, event);
        }
        if generation.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = generation.take() {
                finish_generation(ctx, state, handle).await;
            }
        }

        terminal.draw(|f| render::draw(f, state, spinner_frame))?;
        spinner_frame = spinner_frame.wrapping_add(1);

        // Poll for keyboard events with 100ms timeout
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match handle_key(state, key) {
            Some(TuiCommand::Quit) => return Ok(()),
            Some(TuiCommand::Refresh) => reload_articles(ctx, state),
            Some(TuiCommand::OpenArticle(idx)) => open_article(state, idx),
            Some(TuiCommand::Generate(topic)) => {
                state.create = CreateState::Running { topic: topic.clone(), step: 0, total: 4 };
                state.push_log("INFO", format!("Researching '{}'", topic));
                let ctx = ctx.clone();
                let tx = event_tx.clone();
                generation = Some(tokio::spawn(async move { ctx.generate(&topic, None, Some(&tx)).await }));
            }
            Some(TuiCommand::SaveSetting { field, raw }) => save_setting(ctx, state, &field, &raw),
            None => {}
        }
    }
}

fn apply_run_event(state: &mut AppState, event: RunEvent) {
    let level = match &event {
        RunEvent::Step { index, total, .. } => {
            if let CreateState::Running { step, total: t, .. } = &mut state.create {
                *step = *index;
                *t = *total;
            }
            "STEP"
        }
        RunEvent::ProviderFailed { .. } => "WARN",
        RunEvent::Info(_) | RunEvent::Completed { .. } => "INFO",
    };
    state.push_log(level, event.to_string());
}

async fn finish_generation(ctx: &AppContext, state: &mut AppState, handle: JoinHandle<Result<PathBuf>>) {
    let topic = match &state.create {
        CreateState::Running { topic, .. } => topic.clone(),
        _ => String::new(),
    };
    match handle.await {
        Ok(Ok(dir)) => {
            state.push_log("INFO", format!("Article written to {}", dir.display()));
            state.create = CreateState::Completed { topic };
            state.topic_input.clear();
            reload_articles(ctx, state);
        }
        Ok(Err(e)) => {
            state.push_log("ERROR", e.to_string());
            state.create = CreateState::Failed(e.to_string());
        }
        Err(e) => {
            state.push_log("ERROR", format!("generation task aborted: {}", e));
            state.create = CreateState::Failed(e.to_string());
        }
    }
}

fn reload_articles(ctx: &AppContext, state: &mut AppState) {
    let categories = match ctx.store.load_categories() {
        Ok(c) => c,
        Err(e) => {
            state.status = Some(format!("Failed to load categories: {}", e));
            return;
        }
    };
    match list_articles(&ctx.paths.output_dir, &categories) {
        Ok(articles) => {
            let previews = articles
                .iter()
                .map(|a| match assemble_article(&a.name, &a.files) {
                    Ok(Some(data)) => data.preview(render::PREVIEW_CHARS),
                    _ => String::new(),
                })
                .collect();
            state.status = Some(format!("{} articles", articles.len()));
            state.set_articles(articles, previews);
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to list articles");
            state.status = Some(format!("Failed to list articles: {}", e));
        }
    }
}

fn open_article(state: &mut AppState, idx: usize) {
    let Some(entry) = state.articles.get(idx) else { return };
    match assemble_article(&entry.name, &entry.files) {
        Ok(Some(data)) => state.viewing = Some(ArticleView::new(entry.title(), &data)),
        Ok(None) => state.status = Some(format!("No article data found for {}", entry.name)),
        Err(e) => state.status = Some(format!("Failed to open {}: {}", entry.name, e)),
    }
}

fn save_setting(ctx: &AppContext, state: &mut AppState, field: &SettingsField, raw: &str) {
    if let Err(e) = apply_edit(&ctx.store, field, raw) {
        state.status = Some(format!("{}: {}", field.label, e));
        return;
    }
    match SettingsSnapshot::load(&ctx.store) {
        Ok(snapshot) => {
            state.settings.refresh(build_settings_tabs(&snapshot));
            state.palette = snapshot.theme.palette();
            state.general = snapshot.general;
            state.status = Some(format!("Saved {}", field.label));
        }
        Err(e) => state.status = Some(format!("Failed to reload settings: {}", e)),
    }
}

/// Update view state for `key` and return any action needing I/O.
pub fn handle_key(state: &mut AppState, key: KeyEvent) -> Option<TuiCommand> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(TuiCommand::Quit);
    }
    if state.page == Page::Settings && state.settings.editing {
        return handle_edit_key(state, key);
    }
    match key.code {
        KeyCode::Tab => {
            state.next_page();
            return None;
        }
        KeyCode::BackTab => {
            for _ in 0..Page::ALL.len() - 1 {
                state.next_page();
            }
            return None;
        }
        _ => {}
    }
    match state.page {
        Page::MyArticles if state.viewing.is_some() => handle_reader_key(state, key),
        Page::MyArticles => handle_list_key(state, key),
        Page::CreateArticle => handle_create_key(state, key),
        Page::Settings => handle_settings_key(state, key),
    }
}

fn handle_list_key(state: &mut AppState, key: KeyEvent) -> Option<TuiCommand> {
    let cols = state.general.num_columns.clamp(1, 4) as isize;
    let page = state.general.page_size.max(1) as isize;
    match key.code {
        KeyCode::Char('q') => return Some(TuiCommand::Quit),
        KeyCode::Char('r') => return Some(TuiCommand::Refresh),
        KeyCode::Enter if !state.articles.is_empty() => {
            return Some(TuiCommand::OpenArticle(state.selected_article));
        }
        KeyCode::Left | KeyCode::Char('h') => state.move_selection(-1),
        KeyCode::Right | KeyCode::Char('l') => state.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => state.move_selection(-cols),
        KeyCode::Down | KeyCode::Char('j') => state.move_selection(cols),
        KeyCode::PageDown | KeyCode::Char('n') => state.move_selection(page),
        KeyCode::PageUp | KeyCode::Char('p') => state.move_selection(-page),
        _ => {}
    }
    None
}

fn handle_reader_key(state: &mut AppState, key: KeyEvent) -> Option<TuiCommand> {
    let view = state.viewing.as_mut()?;
    match key.code {
        KeyCode::Esc | KeyCode::Backspace => state.viewing = None,
        KeyCode::Down | KeyCode::Char('j') => view.scroll = view.scroll.saturating_add(1),
        KeyCode::Up | KeyCode::Char('k') => view.scroll = view.scroll.saturating_sub(1),
        KeyCode::PageDown => view.scroll = view.scroll.saturating_add(20),
        KeyCode::PageUp => view.scroll = view.scroll.saturating_sub(20),
        KeyCode::Char('g') => view.scroll = 0,
        KeyCode::Char('c') => {
            view.show_conversations = !view.show_conversations;
            view.scroll = 0;
        }
        KeyCode::Char('q') => return Some(TuiCommand::Quit),
        _ => {}
    }
    None
}

fn handle_create_key(state: &mut AppState, key: KeyEvent) -> Option<TuiCommand> {
    if state.is_running() {
        return None;
    }
    match key.code {
        KeyCode::Char(c) => state.topic_input.push(c),
        KeyCode::Backspace => {
            state.topic_input.pop();
        }
        KeyCode::Esc => {
            state.topic_input.clear();
            state.create = CreateState::NotStarted;
        }
        KeyCode::Enter => {
            let topic = state.topic_input.trim().to_string();
            if topic.is_empty() {
                state.status = Some("Topic could not be empty".to_string());
                return None;
            }
            return Some(TuiCommand::Generate(topic));
        }
        _ => {}
    }
    None
}

fn handle_settings_key(state: &mut AppState, key: KeyEvent) -> Option<TuiCommand> {
    let sv = &mut state.settings;
    match key.code {
        KeyCode::Char('q') => return Some(TuiCommand::Quit),
        KeyCode::Left => sv.prev_tab(),
        KeyCode::Right => sv.next_tab(),
        KeyCode::Up | KeyCode::Char('k') => sv.prev_field(),
        KeyCode::Down | KeyCode::Char('j') => sv.next_field(),
        KeyCode::Enter | KeyCode::Char(' ') => {
            let field = sv.selected()?.clone();
            if field.read_only {
                return None;
            }
            match &field.field_type {
                FieldType::Bool => {
                    let raw = if field.value == "true" { "false" } else { "true" };
                    return Some(TuiCommand::SaveSetting { raw: raw.to_string(), field });
                }
                FieldType::Enum(_) => {
                    let raw = cycle_enum(&field, true)?;
                    return Some(TuiCommand::SaveSetting { field, raw });
                }
                _ if key.code == KeyCode::Enter => {
                    sv.editing = true;
                    sv.edit_buffer = field.value.clone();
                }
                _ => {}
            }
        }
        _ => {}
    }
    None
}

fn handle_edit_key(state: &mut AppState, key: KeyEvent) -> Option<TuiCommand> {
    let sv = &mut state.settings;
    match key.code {
        KeyCode::Esc => {
            sv.editing = false;
            sv.edit_buffer.clear();
        }
        KeyCode::Enter => {
            sv.editing = false;
            let raw = std::mem::take(&mut sv.edit_buffer);
            let field = sv.selected()?.clone();
            return Some(TuiCommand::SaveSetting { field, raw });
        }
        KeyCode::Backspace => {
            sv.edit_buffer.pop();
        }
        KeyCode::Char(c) => sv.edit_buffer.push(c),
        _ => {}
    }
    None
}
