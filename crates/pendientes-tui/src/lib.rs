// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use pendientes_app::{
    AppCommand, AppState, Focus, Notice, Role, SaveReport, Session, TaskTable,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;

const SAVE_BUTTON_LABEL: &str = "💾 GUARDAR CAMBIOS";
const MAIN_SUBTITLE: &str = "Listado de pendientes";
const CHECKED: &str = "[x]";
const UNCHECKED: &str = "[ ]";
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

/// The outside world the editor talks to: the remote sheet and the export.
pub trait AppRuntime {
    /// Opens the sheet and reads every row. An error leaves the runtime
    /// without a handle.
    fn connect(&mut self) -> Result<TaskTable>;
    fn is_connected(&self) -> bool;
    /// Overwrites the remote sheet and the local export with `table`, and
    /// returns the export path for display.
    fn persist(&mut self, table: &TaskTable) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub title: String,
    /// Logo files that exist on disk; absent files are dropped by the caller.
    pub logos: Vec<String>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            title: "Gestión Curtiembre".to_owned(),
            logos: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, Default)]
struct ViewData {
    branding: Branding,
    session: Session,
    owner_cursor: usize,
    priority_cursor: usize,
    grid_cursor: usize,
    status_token: u64,
}

impl ViewData {
    fn new(branding: Branding) -> Self {
        Self {
            branding,
            ..Self::default()
        }
    }

    fn owners(&self) -> &[String] {
        self.session
            .options()
            .map(|options| options.owners.as_slice())
            .unwrap_or_default()
    }

    fn priorities(&self) -> &[String] {
        self.session
            .options()
            .map(|options| options.priorities.as_slice())
            .unwrap_or_default()
    }

    fn view_len(&self) -> usize {
        self.session.view().map_or(0, |view| view.len())
    }

    /// Points the owner cursor at the selected owner and clamps the others.
    fn sync_cursors(&mut self) {
        let selected = self
            .session
            .selection()
            .map(|selection| selection.owner.clone());
        self.owner_cursor = selected
            .and_then(|owner| self.owners().iter().position(|known| *known == owner))
            .unwrap_or(0);
        self.priority_cursor = clamp_cursor(self.priority_cursor, self.priorities().len());
        self.grid_cursor = clamp_cursor(self.grid_cursor, self.view_len());
    }
}

fn clamp_cursor(cursor: usize, len: usize) -> usize {
    cursor.min(len.saturating_sub(1))
}

fn step_cursor(cursor: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = cursor as isize + delta;
    next.clamp(0, len as isize - 1) as usize
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    branding: Branding,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(branding);
    let (internal_tx, internal_rx) = mpsc::channel();

    state.dispatch(AppCommand::SetStatus("conectando con la hoja…".to_owned()));
    let mut result = terminal
        .draw(|frame| render(frame, state, &view_data))
        .map(|_| ())
        .context("draw frame");
    if result.is_ok() {
        start_session(state, runtime, &mut view_data);
        state.dispatch(AppCommand::ClearStatus);
    }

    while result.is_ok() {
        process_internal_events(state, &view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => result = Err(error),
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

/// Connects and loads the master table. A failed connection still yields a
/// usable, empty session.
fn start_session<R: AppRuntime>(state: &mut AppState, runtime: &mut R, view_data: &mut ViewData) {
    match runtime.connect() {
        Ok(table) => {
            view_data.session = Session::new(table);
            state.dispatch(AppCommand::Notify(Notice::Connected));
        }
        Err(error) => {
            view_data.session = Session::default();
            state.dispatch(AppCommand::Notify(Notice::ConnectionFailed(format!(
                "{error:#}"
            ))));
        }
    }
    view_data.grid_cursor = 0;
    view_data.priority_cursor = 0;
    view_data.sync_cursors();
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn arm_status_clear(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>) {
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    arm_status_clear(view_data, internal_tx);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('q') {
        return true;
    }

    if state.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            state.dispatch(AppCommand::ToggleHelp);
        }
        return false;
    }

    if ctrl {
        match key.code {
            KeyCode::Char('s') => save(state, runtime, view_data, internal_tx),
            KeyCode::Char('r') => reconnect(state, runtime, view_data, internal_tx),
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => {
            state.dispatch(AppCommand::ToggleHelp);
        }
        KeyCode::Esc => {
            state.dispatch(AppCommand::ClearNotice);
        }
        KeyCode::Tab => {
            state.dispatch(AppCommand::NextFocus);
        }
        KeyCode::BackTab => {
            state.dispatch(AppCommand::PrevFocus);
        }
        _ => match state.focus {
            Focus::Owners => handle_owner_key(state, view_data, internal_tx, key),
            Focus::Priorities => handle_priority_key(state, view_data, internal_tx, key),
            Focus::Grid => handle_grid_key(view_data, key),
            Focus::SaveButton => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                    save(state, runtime, view_data, internal_tx);
                }
            }
        },
    }
    false
}

fn vertical_delta(code: KeyCode) -> Option<isize> {
    match code {
        KeyCode::Up | KeyCode::Char('k') => Some(-1),
        KeyCode::Down | KeyCode::Char('j') => Some(1),
        _ => None,
    }
}

fn handle_owner_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(delta) = vertical_delta(key.code) else {
        return;
    };
    let cursor = step_cursor(view_data.owner_cursor, view_data.owners().len(), delta);
    let Some(owner) = view_data.owners().get(cursor).cloned() else {
        return;
    };
    view_data.owner_cursor = cursor;
    if view_data
        .session
        .selection()
        .is_some_and(|selection| selection.owner == owner)
    {
        return;
    }
    match view_data.session.select_owner(&owner) {
        Ok(dropped) => {
            view_data.grid_cursor = 0;
            report_dropped_edits(state, view_data, internal_tx, dropped);
        }
        Err(error) => emit_status(state, view_data, internal_tx, format!("{error:#}")),
    }
}

fn handle_priority_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if let Some(delta) = vertical_delta(key.code) {
        view_data.priority_cursor =
            step_cursor(view_data.priority_cursor, view_data.priorities().len(), delta);
        return;
    }
    if !matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter) {
        return;
    }
    let Some(priority) = view_data.priorities().get(view_data.priority_cursor).cloned() else {
        return;
    };
    match view_data.session.toggle_priority(&priority) {
        Ok(dropped) => {
            view_data.grid_cursor = clamp_cursor(view_data.grid_cursor, view_data.view_len());
            report_dropped_edits(state, view_data, internal_tx, dropped);
        }
        Err(error) => emit_status(state, view_data, internal_tx, format!("{error:#}")),
    }
}

fn report_dropped_edits(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    dropped: bool,
) {
    if dropped {
        emit_status(
            state,
            view_data,
            internal_tx,
            "cambios sin guardar descartados",
        );
    }
}

fn handle_grid_key(view_data: &mut ViewData, key: KeyEvent) {
    if let Some(delta) = vertical_delta(key.code) {
        view_data.grid_cursor = step_cursor(view_data.grid_cursor, view_data.view_len(), delta);
        return;
    }
    if matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter) {
        view_data.session.toggle_done(view_data.grid_cursor);
    }
}

/// Merges the edited view into the master table, then overwrites the remote
/// sheet and the export. The merge stays in memory even when persisting
/// fails.
fn save<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if view_data.session.view().is_none() {
        emit_status(state, view_data, internal_tx, "no hay pendientes para guardar");
        return;
    }

    let outcome = view_data
        .session
        .merge_edits()
        .and_then(|_| view_data.session.persistence_copy())
        .and_then(|persisted| {
            let export_path = runtime.persist(&persisted)?;
            Ok((persisted, export_path))
        });

    match outcome {
        Ok((persisted, export_path)) => {
            let rows = persisted.len();
            view_data.session.replace_master(persisted);
            view_data.sync_cursors();
            state.dispatch(AppCommand::RecordSave(SaveReport {
                rows,
                export_path,
                saved_at: OffsetDateTime::now_utc(),
            }));
            arm_status_clear(view_data, internal_tx);
        }
        Err(error) => {
            state.dispatch(AppCommand::Notify(Notice::SaveFailed(format!("{error:#}"))));
        }
    }
}

fn reconnect<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if runtime.is_connected() {
        emit_status(state, view_data, internal_tx, "ya hay conexión con la hoja");
        return;
    }
    start_session(state, runtime, view_data);
}

fn owner_labels(view_data: &ViewData) -> Vec<String> {
    let selected = view_data.session.selection().map(|selection| &selection.owner);
    view_data
        .owners()
        .iter()
        .map(|owner| {
            let mark = if Some(owner) == selected { "●" } else { "○" };
            format!("{mark} {owner}")
        })
        .collect()
}

fn priority_labels(view_data: &ViewData) -> Vec<String> {
    let selection = view_data.session.selection();
    view_data
        .priorities()
        .iter()
        .map(|priority| {
            let chosen = selection.is_some_and(|selection| selection.priorities.contains(priority));
            let mark = if chosen { CHECKED } else { UNCHECKED };
            format!("{mark} {priority}")
        })
        .collect()
}

fn main_title(view_data: &ViewData) -> String {
    match view_data.session.selection() {
        Some(selection) => format!("📋 Pendientes: {}", selection.owner),
        None => "📋 Pendientes".to_owned(),
    }
}

fn metric_tiles(view_data: &ViewData) -> Vec<(String, usize)> {
    view_data
        .session
        .metrics()
        .map(|metrics| metrics.tiles())
        .unwrap_or_default()
}

fn grid_header(view_data: &ViewData) -> Option<[String; 4]> {
    let roles = view_data.session.roles()?;
    Some([
        roles.name(Role::Topic).to_owned(),
        roles.name(Role::Detail).to_owned(),
        roles.name(Role::Priority).to_owned(),
        roles.name(Role::Done).to_owned(),
    ])
}

fn grid_rows(view_data: &ViewData) -> Vec<[String; 4]> {
    let Some(view) = view_data.session.view() else {
        return Vec::new();
    };
    view.rows()
        .iter()
        .map(|row| {
            [
                row.topic.clone(),
                row.detail.clone(),
                row.priority.clone(),
                if row.done { CHECKED } else { UNCHECKED }.to_owned(),
            ]
        })
        .collect()
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q o q salir | ? ayuda | esc ocultar aviso\n\
foco: tab / shift+tab responsable, prioridades, listado, guardar\n\
responsable: ↑/↓ o k/j elige\n\
prioridades: ↑/↓ mueve | espacio o enter marca/desmarca\n\
listado: ↑/↓ mueve | espacio o enter marca hecho\n\
guardar: enter en el botón o ctrl+s desde cualquier lado\n\
conexión: ctrl+r reintenta si no hay hoja\n\
cambiar responsable o prioridades descarta cambios sin guardar"
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if state.help_visible {
        return String::new();
    }
    let mut default = format!(
        "foco: {} | tab foco | espacio marcar | ctrl+s guardar | ctrl+r reconectar | ? ayuda | ctrl+q",
        state.focus.label()
    );
    if view_data.session.has_unsaved_edits() {
        default = format!("● sin guardar | {default}");
    }
    match &state.status_line {
        Some(status) => format!("{status} | {default}"),
        None => default,
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(40)])
        .split(frame.area());

    render_sidebar(frame, columns[0], state, view_data);
    render_main(frame, columns[1], state, view_data);

    if state.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("ayuda").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_sidebar(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let brand_height = u16::try_from(view_data.branding.logos.len())
        .unwrap_or(u16::MAX)
        .saturating_add(3);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(brand_height),
            Constraint::Percentage(50),
            Constraint::Min(3),
        ])
        .split(area);

    let mut brand_lines = vec![Line::from(Span::styled(
        view_data.branding.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    brand_lines.extend(
        view_data
            .branding
            .logos
            .iter()
            .map(|logo| Line::from(format!("🖼 {logo}"))),
    );
    let brand = Paragraph::new(brand_lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(brand, layout[0]);

    render_choice_list(
        frame,
        layout[1],
        "Responsable",
        owner_labels(view_data),
        view_data.owner_cursor,
        state.focus == Focus::Owners,
    );
    render_choice_list(
        frame,
        layout[2],
        "Prioridades",
        priority_labels(view_data),
        view_data.priority_cursor,
        state.focus == Focus::Priorities,
    );
}

fn render_choice_list(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    labels: Vec<String>,
    cursor: usize,
    focused: bool,
) {
    let lines: Vec<Line<'_>> = labels
        .into_iter()
        .enumerate()
        .map(|(index, label)| {
            let style = if focused && index == cursor {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(label, style))
        })
        .collect();
    let visible = usize::from(area.height.saturating_sub(2)).max(1);
    let scroll = u16::try_from(cursor.saturating_sub(visible - 1)).unwrap_or(0);
    let widget = Paragraph::new(lines).scroll((scroll, 0)).block(
        Block::default()
            .title(Span::styled(title.to_owned(), focus_style(focused)))
            .borders(Borders::ALL)
            .border_style(focus_style(focused)),
    );
    frame.render_widget(widget, area);
}

fn render_main(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(4),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        main_title(view_data),
        Style::default().add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().title(MAIN_SUBTITLE).borders(Borders::ALL));
    frame.render_widget(title, layout[0]);

    render_metrics(frame, layout[1], view_data);
    render_grid(frame, layout[2], state, view_data);

    let save_focused = state.focus == Focus::SaveButton;
    let button_style = if save_focused {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Green)
    };
    let button = Paragraph::new(Span::styled(SAVE_BUTTON_LABEL, button_style))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_style(save_focused)),
        );
    frame.render_widget(button, layout[3]);

    let mut footer = Vec::new();
    if let Some(notice) = &state.notice {
        let color = if notice.is_error() {
            Color::Red
        } else {
            Color::Green
        };
        footer.push(Line::from(Span::styled(
            notice.message(),
            Style::default().fg(color),
        )));
    }
    footer.push(Line::from(Span::styled(
        status_text(state, view_data),
        Style::default().fg(Color::Yellow),
    )));
    let footer = Paragraph::new(footer).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, layout[4]);
}

fn render_metrics(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let tiles = metric_tiles(view_data);
    if tiles.is_empty() {
        frame.render_widget(Block::default().borders(Borders::ALL), area);
        return;
    }
    let constraints = vec![Constraint::Ratio(1, tiles.len() as u32); tiles.len()];
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);
    for ((label, count), cell) in tiles.into_iter().zip(cells.iter()) {
        let tile = Paragraph::new(Span::styled(
            count.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .block(Block::default().title(label).borders(Borders::ALL));
        frame.render_widget(tile, *cell);
    }
}

fn render_grid(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let focused = state.focus == Focus::Grid;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_style(focused));
    let Some(header) = grid_header(view_data) else {
        frame.render_widget(Paragraph::new(String::new()).block(block), area);
        return;
    };

    let header = Row::new(header.into_iter().map(|label| {
        Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = grid_rows(view_data)
        .into_iter()
        .enumerate()
        .map(|(index, cells)| {
            let style = if index == view_data.grid_cursor {
                if focused {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().bg(Color::DarkGray)
                }
            } else {
                Style::default()
            };
            Row::new(cells.into_iter().map(Cell::from)).style(style)
        })
        .collect::<Vec<_>>();

    let widths = [
        Constraint::Percentage(20),
        Constraint::Percentage(50),
        Constraint::Percentage(18),
        Constraint::Length(5),
    ];
    let table = Table::new(rows, widths).header(header).block(block);
    let mut table_state = TableState::default().with_selected(Some(view_data.grid_cursor));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
