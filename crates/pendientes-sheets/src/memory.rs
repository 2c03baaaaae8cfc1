// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::RemoteSheet;

/// In-process worksheet used by demo mode and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySheet {
    title: String,
    grid: Vec<Vec<String>>,
    fail_writes: Option<String>,
    writes: usize,
}

impl MemorySheet {
    pub fn new(title: impl Into<String>, grid: Vec<Vec<String>>) -> Self {
        Self {
            title: title.into(),
            grid,
            fail_writes: None,
            writes: 0,
        }
    }

    /// Makes every later `clear` and `write_all` fail with `message`.
    pub fn fail_writes_with(mut self, message: impl Into<String>) -> Self {
        self.fail_writes = Some(message.into());
        self
    }

    pub fn grid(&self) -> &[Vec<String>] {
        &self.grid
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl RemoteSheet for MemorySheet {
    fn title(&self) -> &str {
        &self.title
    }

    /// Shaped like a values response: trailing empty cells and trailing blank
    /// rows are cut, blank rows in the middle come back as empty rows.
    fn read_all(&mut self) -> Result<Vec<Vec<String>>> {
        let mut grid: Vec<Vec<String>> = self
            .grid
            .iter()
            .map(|row| {
                let width = row
                    .iter()
                    .rposition(|cell| !cell.is_empty())
                    .map_or(0, |last| last + 1);
                row[..width].to_vec()
            })
            .collect();
        while grid.last().is_some_and(Vec::is_empty) {
            grid.pop();
        }
        Ok(grid)
    }

    fn clear(&mut self) -> Result<()> {
        if let Some(message) = &self.fail_writes {
            bail!("{message}");
        }
        self.grid.clear();
        Ok(())
    }

    fn write_all(&mut self, grid: &[Vec<String>]) -> Result<()> {
        if let Some(message) = &self.fail_writes {
            bail!("{message}");
        }
        for (row_index, row) in grid.iter().enumerate() {
            if self.grid.len() <= row_index {
                self.grid.push(Vec::new());
            }
            let target = &mut self.grid[row_index];
            if target.len() < row.len() {
                target.resize(row.len(), String::new());
            }
            target[..row.len()].clone_from_slice(row);
        }
        self.writes += 1;
        Ok(())
    }
}
