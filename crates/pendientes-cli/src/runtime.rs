// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use pendientes_app::TaskTable;
use pendientes_export::write_workbook;
use pendientes_sheets::{Client, Endpoints, MemorySheet, RemoteSheet, resolve_credentials};
use std::path::PathBuf;
use std::time::Duration;

/// Where the worksheet comes from.
#[derive(Debug, Clone)]
pub enum SheetSource {
    Google {
        name: String,
        secrets_path: PathBuf,
        key_file: PathBuf,
        endpoints: Endpoints,
        timeout: Duration,
    },
    Memory(MemorySheet),
}

impl SheetSource {
    fn open(&self) -> Result<Box<dyn RemoteSheet>> {
        match self {
            Self::Google {
                name,
                secrets_path,
                key_file,
                endpoints,
                timeout,
            } => {
                let (source, key) = resolve_credentials(secrets_path, key_file)?;
                tracing::info!(%source, client = %key.client_email, "using service account");
                let worksheet = Client::authorize(key, endpoints.clone(), *timeout)?
                    .open_first_worksheet(name)?;
                Ok(Box::new(worksheet))
            }
            Self::Memory(sheet) => Ok(Box::new(sheet.clone())),
        }
    }
}

/// Holds the single worksheet handle for the session. The handle is `None`
/// until a connection succeeds, and is dropped again when a read fails.
pub struct SheetRuntime {
    source: SheetSource,
    sheet: Option<Box<dyn RemoteSheet>>,
    export_path: PathBuf,
}

impl SheetRuntime {
    pub fn new(source: SheetSource, export_path: PathBuf) -> Self {
        Self {
            source,
            sheet: None,
            export_path,
        }
    }
}

impl pendientes_tui::AppRuntime for SheetRuntime {
    /// Opens the worksheet unless a handle is already held, then reads it.
    fn connect(&mut self) -> Result<TaskTable> {
        let mut sheet = match self.sheet.take() {
            Some(sheet) => sheet,
            None => self.source.open().inspect_err(|error| {
                tracing::warn!(error = %format!("{error:#}"), "connection failed");
            })?,
        };

        let grid = match sheet.read_all() {
            Ok(grid) => grid,
            Err(error) => {
                tracing::warn!(error = %format!("{error:#}"), "reading worksheet failed");
                return Err(error).with_context(|| format!("read worksheet {}", sheet.title()));
            }
        };
        let table = TaskTable::from_grid(grid);
        tracing::info!(
            worksheet = sheet.title(),
            rows = table.len(),
            columns = table.columns().len(),
            "loaded task table"
        );
        self.sheet = Some(sheet);
        Ok(table)
    }

    fn is_connected(&self) -> bool {
        self.sheet.is_some()
    }

    /// Full overwrite of the remote worksheet, then of the export file. A
    /// failure in either step is reported as is; nothing is rolled back.
    fn persist(&mut self, table: &TaskTable) -> Result<String> {
        let sheet = self
            .sheet
            .as_mut()
            .ok_or_else(|| anyhow!("no hay conexión con la hoja; use ctrl+r para reconectar"))?;
        let grid = table.to_grid();

        let remote = sheet
            .clear()
            .with_context(|| format!("clear worksheet {}", sheet.title()))
            .and_then(|()| {
                sheet
                    .write_all(&grid)
                    .with_context(|| format!("write worksheet {}", sheet.title()))
            });
        if let Err(error) = remote {
            tracing::error!(error = %format!("{error:#}"), "saving to worksheet failed");
            return Err(error);
        }
        tracing::info!(worksheet = sheet.title(), rows = table.len(), "worksheet overwritten");

        if let Err(error) = write_workbook(&self.export_path, table) {
            tracing::error!(error = %format!("{error:#}"), "export failed");
            return Err(error);
        }
        Ok(self.export_path.display().to_string())
    }
}
