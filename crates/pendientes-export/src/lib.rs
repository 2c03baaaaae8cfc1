// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use pendientes_app::TaskTable;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

pub const DEFAULT_EXPORT_FILE: &str = "Listado de Pendientes.xlsx";
pub const EXPORT_SHEET_NAME: &str = "Sheet1";

/// Rejects URIs and anything that is not an `.xlsx` file path.
pub fn validate_export_path(path: &Path) -> Result<()> {
    let raw = path.to_string_lossy();
    if raw.trim().is_empty() {
        bail!("export path must not be empty");
    }
    if raw.contains("://") {
        bail!("export path {raw} looks like a URI; use a local file path");
    }
    let is_xlsx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if !is_xlsx {
        bail!("export path {raw} must end in .xlsx");
    }
    Ok(())
}

/// Writes the table to `path` as a single-sheet workbook, replacing any
/// previous file. Every cell is written as text; the header row is bold.
pub fn write_workbook(path: &Path, table: &TaskTable) -> Result<usize> {
    validate_export_path(path)?;

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook
        .add_worksheet()
        .set_name(EXPORT_SHEET_NAME)
        .with_context(|| format!("create sheet {EXPORT_SHEET_NAME}"))?;

    for (col, name) in table.columns().iter().enumerate() {
        let col = u16::try_from(col).context("too many columns for xlsx")?;
        worksheet
            .write_string_with_format(0, col, name, &header_format)
            .with_context(|| format!("write header {name:?}"))?;
    }

    for (index, row) in table.rows().iter().enumerate() {
        let excel_row = u32::try_from(index + 1).context("too many rows for xlsx")?;
        for (col, cell) in row.cells.iter().enumerate() {
            let text = cell.as_text();
            if text.is_empty() {
                continue;
            }
            let col = u16::try_from(col).context("too many columns for xlsx")?;
            worksheet
                .write_string(excel_row, col, text)
                .with_context(|| format!("write cell at row {excel_row}, column {col}"))?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("save export file {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = table.len(), "exported workbook");
    Ok(table.len())
}
