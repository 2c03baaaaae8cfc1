// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Owners,
    Priorities,
    Grid,
    SaveButton,
}

impl Focus {
    pub const ALL: [Self; 4] = [Self::Owners, Self::Priorities, Self::Grid, Self::SaveButton];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Owners => "responsable",
            Self::Priorities => "prioridades",
            Self::Grid => "listado",
            Self::SaveButton => "guardar",
        }
    }
}

/// User-visible outcome of a remote or save operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Connected,
    ConnectionFailed(String),
    Saved,
    SaveFailed(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::Connected => "¡Conectado con éxito!".to_owned(),
            Self::ConnectionFailed(error) => format!("Error de conexión: {error}"),
            Self::Saved => "Guardado en Nube y Excel ✅".to_owned(),
            Self::SaveFailed(error) => format!("Error al guardar: {error}"),
        }
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::SaveFailed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub rows: usize,
    pub export_path: String,
    pub saved_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub focus: Focus,
    pub help_visible: bool,
    pub status_line: Option<String>,
    pub notice: Option<Notice>,
    pub last_save: Option<SaveReport>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            focus: Focus::Grid,
            help_visible: false,
            status_line: None,
            notice: None,
            last_save: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextFocus,
    PrevFocus,
    FocusOn(Focus),
    ToggleHelp,
    Notify(Notice),
    ClearNotice,
    RecordSave(SaveReport),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    FocusChanged(Focus),
    HelpToggled(bool),
    NoticeRaised(Notice),
    NoticeCleared,
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextFocus => self.rotate_focus(1),
            AppCommand::PrevFocus => self.rotate_focus(-1),
            AppCommand::FocusOn(focus) => {
                self.focus = focus;
                vec![AppEvent::FocusChanged(focus)]
            }
            AppCommand::ToggleHelp => {
                self.help_visible = !self.help_visible;
                vec![AppEvent::HelpToggled(self.help_visible)]
            }
            AppCommand::Notify(notice) => {
                self.notice = Some(notice.clone());
                vec![AppEvent::NoticeRaised(notice)]
            }
            AppCommand::ClearNotice => {
                self.notice = None;
                vec![AppEvent::NoticeCleared]
            }
            AppCommand::RecordSave(report) => {
                let status = format!(
                    "{} filas guardadas en la hoja y en {}",
                    report.rows, report.export_path
                );
                self.last_save = Some(report);
                self.notice = Some(Notice::Saved);
                vec![
                    AppEvent::NoticeRaised(Notice::Saved),
                    self.set_status(&status),
                ]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn rotate_focus(&mut self, delta: isize) -> Vec<AppEvent> {
        let all = Focus::ALL;
        let current = all
            .iter()
            .position(|focus| *focus == self.focus)
            .unwrap_or(0) as isize;
        let len = all.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.focus = all[next];
        vec![AppEvent::FocusChanged(self.focus)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
