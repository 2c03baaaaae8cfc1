// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::roles::{Role, RoleMap};

pub const DONE_TEXT: &str = "OK";
pub const PENDING_TEXT: &str = "_";

/// A single cell of the master table.
///
/// Cells loaded from the sheet are always text. A done cell becomes a flag once
/// an edited view is merged back and stays that way until the next successful
/// save re-encodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Flag(bool),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(value) => value,
            Self::Flag(true) => "True",
            Self::Flag(false) => "False",
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// Maps a stored done value to a boolean: true iff the trimmed text equals
/// "OK" ignoring case. Flags pass through unchanged.
pub fn decode_done(value: &CellValue) -> bool {
    match value {
        CellValue::Text(text) => text.trim().eq_ignore_ascii_case(DONE_TEXT),
        CellValue::Flag(flag) => *flag,
    }
}

pub const fn encode_done(done: bool) -> &'static str {
    if done { DONE_TEXT } else { PENDING_TEXT }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRow {
    pub cells: Vec<CellValue>,
}

impl TaskRow {
    pub fn cell(&self, column: usize) -> Option<&CellValue> {
        self.cells.get(column)
    }

    pub fn text(&self, column: usize) -> &str {
        self.cells.get(column).map(CellValue::as_text).unwrap_or("")
    }
}

/// The authoritative in-session copy of every task row, in sheet order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTable {
    columns: Vec<String>,
    rows: Vec<TaskRow>,
}

impl TaskTable {
    /// Builds a table from a header row and its records. Header names are
    /// trimmed; records are padded with empty text or cut to the header width.
    pub fn from_records<H, R>(header: H, records: R) -> Self
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        R: IntoIterator<Item = Vec<String>>,
    {
        let columns: Vec<String> = header
            .into_iter()
            .map(|name| name.as_ref().trim().to_owned())
            .collect();
        let width = columns.len();
        let rows = records
            .into_iter()
            .map(|record| {
                let mut cells: Vec<CellValue> =
                    record.into_iter().take(width).map(CellValue::Text).collect();
                cells.resize(width, CellValue::default());
                TaskRow { cells }
            })
            .collect();
        Self { columns, rows }
    }

    /// Splits raw worksheet values into header and records. An empty grid
    /// yields an empty table.
    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }
        let header = grid.remove(0);
        Self::from_records(header, grid)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TaskRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no records, even if a header row exists.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes a done flag into the role's column for one row.
    pub fn set_done(&mut self, roles: &RoleMap, row_index: usize, done: bool) -> Result<()> {
        let column = roles.index(Role::Done);
        let Some(row) = self.rows.get_mut(row_index) else {
            bail!(
                "row {row_index} is out of range; the table has {} rows",
                self.rows.len()
            );
        };
        match row.cells.get_mut(column) {
            Some(cell) => *cell = CellValue::Flag(done),
            None => bail!("row {row_index} has no column {column}"),
        }
        Ok(())
    }

    /// Copy of the table with every done cell re-encoded as "OK" or "_".
    pub fn persistence_copy(&self, roles: &RoleMap) -> Self {
        let column = roles.index(Role::Done);
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = row.cells.clone();
                if let Some(cell) = cells.get_mut(column) {
                    *cell = CellValue::text(encode_done(decode_done(cell)));
                }
                TaskRow { cells }
            })
            .collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Header row followed by every record, as plain text.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.columns.clone());
        for row in &self.rows {
            grid.push(
                row.cells
                    .iter()
                    .map(|cell| cell.as_text().to_owned())
                    .collect(),
            );
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::{CellValue, TaskTable, decode_done, encode_done};
    use crate::roles::RoleMap;
    use anyhow::Result;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| (*cell).to_owned()).collect())
            .collect()
    }

    #[test]
    fn done_text_variants_decode_to_true() {
        for value in ["OK", "ok", " OK ", "Ok"] {
            assert!(decode_done(&CellValue::text(value)), "value {value:?}");
        }
    }

    #[test]
    fn other_text_decodes_to_false() {
        for value in ["", "pending", "NO", "_", "OKAY", "True"] {
            assert!(!decode_done(&CellValue::text(value)), "value {value:?}");
        }
    }

    #[test]
    fn flags_decode_to_themselves() {
        assert!(decode_done(&CellValue::Flag(true)));
        assert!(!decode_done(&CellValue::Flag(false)));
    }

    #[test]
    fn encode_then_decode_is_identity() {
        for done in [true, false] {
            assert_eq!(decode_done(&CellValue::text(encode_done(done))), done);
        }
        assert_eq!(encode_done(true), "OK");
        assert_eq!(encode_done(false), "_");
    }

    #[test]
    fn from_grid_trims_header_and_pads_short_records() {
        let table = TaskTable::from_grid(grid(&[
            &[" Tema ", "Responsable  ", "OK"],
            &["Caldera", "Ana"],
            &["Bomba", "Luis", "OK", "extra"],
        ]));

        assert_eq!(table.columns(), ["Tema", "Responsable", "OK"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].cells.len(), 3);
        assert_eq!(table.rows()[0].text(2), "");
        assert_eq!(table.rows()[1].cells.len(), 3);
        assert_eq!(table.rows()[1].text(2), "OK");
    }

    #[test]
    fn empty_grid_and_header_only_grid_are_empty() {
        assert!(TaskTable::from_grid(Vec::new()).is_empty());
        let header_only = TaskTable::from_grid(grid(&[&["Tema", "OK"]]));
        assert!(header_only.is_empty());
        assert_eq!(header_only.columns().len(), 2);
    }

    #[test]
    fn persistence_copy_keeps_text_ok_outside_edits() -> Result<()> {
        let mut table = TaskTable::from_grid(grid(&[
            &["Tema", "Desarrollo", "Importancia", "Responsable", "OK"],
            &["a", "x", "Critica", "Ana", ""],
            &["b", "y", "Importante", "Luis", "OK"],
        ]));
        let roles = RoleMap::resolve(table.columns())?;

        table.set_done(&roles, 0, true)?;
        let persisted = table.persistence_copy(&roles);

        assert_eq!(persisted.rows()[0].text(4), "OK");
        assert_eq!(persisted.rows()[1].text(4), "OK");
        assert_eq!(table.rows()[0].cells[4], CellValue::Flag(true));
        Ok(())
    }

    #[test]
    fn set_done_rejects_out_of_range_row() -> Result<()> {
        let mut table = TaskTable::from_grid(grid(&[
            &["Tema", "Desarrollo", "Importancia", "Responsable", "OK"],
            &["a", "x", "Critica", "Ana", ""],
        ]));
        let roles = RoleMap::resolve(table.columns())?;

        let error = table
            .set_done(&roles, 5, true)
            .expect_err("row 5 does not exist");
        assert!(error.to_string().contains("out of range"));
        Ok(())
    }

    #[test]
    fn to_grid_starts_with_header() {
        let table = TaskTable::from_grid(grid(&[&["Tema", "OK"], &["a", "_"]]));
        assert_eq!(table.to_grid(), grid(&[&["Tema", "OK"], &["a", "_"]]));
    }
}
