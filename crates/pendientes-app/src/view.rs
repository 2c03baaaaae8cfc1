// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::{TaskTable, decode_done};
use crate::roles::{Role, RoleMap};

/// Distinct owner and priority values offered by the sidebar, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub owners: Vec<String>,
    pub priorities: Vec<String>,
}

impl FilterOptions {
    pub fn from_table(table: &TaskTable, roles: &RoleMap) -> Self {
        let owner = roles.index(Role::Owner);
        let priority = roles.index(Role::Priority);
        // Rows without an owner (blank sheet rows included) offer no choices.
        let owned = move || {
            table
                .rows()
                .iter()
                .filter(move |row| !row.text(owner).trim().is_empty())
        };
        let owners: BTreeSet<&str> = owned().map(|row| row.text(owner)).collect();
        let priorities: BTreeSet<&str> = owned().map(|row| row.text(priority)).collect();
        Self {
            owners: owners.into_iter().map(str::to_owned).collect(),
            priorities: priorities.into_iter().map(str::to_owned).collect(),
        }
    }

    /// First owner and every priority, the sidebar's initial state.
    pub fn default_selection(&self) -> Option<FilterSelection> {
        let owner = self.owners.first()?.clone();
        Some(FilterSelection {
            owner,
            priorities: self.priorities.iter().cloned().collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub owner: String,
    pub priorities: BTreeSet<String>,
}

/// One row of the filtered view. `index` points back into the master table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRow {
    pub index: usize,
    pub topic: String,
    pub detail: String,
    pub priority: String,
    pub done: bool,
}

/// Editable projection of the master table for one owner and priority set.
/// Only `done` may change; edits reach the master table through [`FilteredView::merge_into`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredView {
    rows: Vec<ViewRow>,
}

impl FilteredView {
    pub fn build(table: &TaskTable, roles: &RoleMap, selection: &FilterSelection) -> Self {
        let topic = roles.index(Role::Topic);
        let detail = roles.index(Role::Detail);
        let priority = roles.index(Role::Priority);
        let owner = roles.index(Role::Owner);
        let done = roles.index(Role::Done);

        let rows = table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                row.text(owner) == selection.owner
                    && selection.priorities.contains(row.text(priority))
            })
            .map(|(index, row)| ViewRow {
                index,
                topic: row.text(topic).to_owned(),
                detail: row.text(detail).to_owned(),
                priority: row.text(priority).to_owned(),
                done: row.cell(done).is_some_and(decode_done),
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[ViewRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flips the done flag of the row at `position` and returns its new value.
    pub fn toggle_done(&mut self, position: usize) -> Option<bool> {
        let row = self.rows.get_mut(position)?;
        row.done = !row.done;
        Some(row.done)
    }

    /// Positions whose done flag differs from `original`.
    pub fn changed_positions(&self, original: &Self) -> Vec<usize> {
        self.rows
            .iter()
            .zip(original.rows.iter())
            .enumerate()
            .filter(|(_, (edited, base))| edited.done != base.done)
            .map(|(position, _)| position)
            .collect()
    }

    /// Overwrites the done cell of every row in the view, by master index.
    pub fn merge_into(&self, table: &mut TaskTable, roles: &RoleMap) -> Result<usize> {
        for row in &self.rows {
            table.set_done(roles, row.index, row.done)?;
        }
        Ok(self.rows.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorityBucket {
    Critical,
    Important,
    Strategic,
}

impl PriorityBucket {
    pub const ALL: [Self; 3] = [Self::Critical, Self::Important, Self::Strategic];

    /// Fragment matched case-insensitively against the priority text.
    pub const fn needle(self) -> &'static str {
        match self {
            Self::Critical => "Crit",
            Self::Important => "Import",
            Self::Strategic => "Estrat",
        }
    }

    pub const fn short_label(self) -> &'static str {
        match self {
            Self::Critical => "Crit.",
            Self::Important => "Imp.",
            Self::Strategic => "Estr.",
        }
    }

    pub fn matches(self, priority: &str) -> bool {
        priority
            .to_lowercase()
            .contains(&self.needle().to_lowercase())
    }

    const fn slot(self) -> usize {
        match self {
            Self::Critical => 0,
            Self::Important => 1,
            Self::Strategic => 2,
        }
    }
}

/// Pending and done counts per priority bucket for one view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pending: [usize; 3],
    done: [usize; 3],
}

impl Metrics {
    pub fn compute(view: &FilteredView) -> Self {
        let mut metrics = Self::default();
        for row in view.rows() {
            for bucket in PriorityBucket::ALL {
                if !bucket.matches(&row.priority) {
                    continue;
                }
                if row.done {
                    metrics.done[bucket.slot()] += 1;
                } else {
                    metrics.pending[bucket.slot()] += 1;
                }
            }
        }
        metrics
    }

    pub fn count(&self, bucket: PriorityBucket, done: bool) -> usize {
        if done {
            self.done[bucket.slot()]
        } else {
            self.pending[bucket.slot()]
        }
    }

    /// Six labelled counters: every pending bucket, then every done bucket.
    pub fn tiles(&self) -> Vec<(String, usize)> {
        let mut tiles = Vec::with_capacity(6);
        for done in [false, true] {
            let mark = if done { "✅" } else { "⏳" };
            for bucket in PriorityBucket::ALL {
                tiles.push((
                    format!("{} {mark}", bucket.short_label()),
                    self.count(bucket, done),
                ));
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterOptions, FilterSelection, FilteredView, Metrics, PriorityBucket};
    use crate::model::{CellValue, TaskTable};
    use crate::roles::RoleMap;
    use anyhow::Result;
    use std::collections::BTreeSet;

    fn table() -> TaskTable {
        let rows = [
            ["Caldera", "Revisar presión", "Critica", "Ana", ""],
            ["Curtido", "Pedir cromo", "Importante", "Ana", "OK"],
            ["Bombas", "Cambiar sellos", "Critica", "Luis", "OK"],
            ["Planta", "Plan de ampliación", "Estrategica", "Ana", "_"],
        ];
        TaskTable::from_records(
            ["Tema", "Desarrollo", "Importancia", "Responsable", "OK"],
            rows.iter()
                .map(|row| row.iter().map(|cell| (*cell).to_owned()).collect::<Vec<String>>()),
        )
    }

    fn selection(owner: &str, priorities: &[&str]) -> FilterSelection {
        FilterSelection {
            owner: owner.to_owned(),
            priorities: priorities.iter().map(|p| (*p).to_owned()).collect(),
        }
    }

    #[test]
    fn options_are_sorted_and_unique() -> Result<()> {
        let table = table();
        let roles = RoleMap::resolve(table.columns())?;
        let options = FilterOptions::from_table(&table, &roles);
        assert_eq!(options.owners, vec!["Ana", "Luis"]);
        assert_eq!(
            options.priorities,
            vec!["Critica", "Estrategica", "Importante"]
        );

        let default = options.default_selection().expect("owners exist");
        assert_eq!(default.owner, "Ana");
        assert_eq!(default.priorities.len(), 3);
        Ok(())
    }

    #[test]
    fn rows_without_owner_add_no_options() -> Result<()> {
        let mut grid = table().to_grid();
        grid.insert(2, Vec::new());
        grid.push(vec![
            "Depósito".to_owned(),
            String::new(),
            "Sin prioridad".to_owned(),
            "  ".to_owned(),
        ]);
        let table = TaskTable::from_grid(grid);
        assert_eq!(table.len(), 6);
        let roles = RoleMap::resolve(table.columns())?;

        let options = FilterOptions::from_table(&table, &roles);
        assert_eq!(options.owners, vec!["Ana", "Luis"]);
        assert_eq!(
            options.priorities,
            vec!["Critica", "Estrategica", "Importante"]
        );
        Ok(())
    }

    #[test]
    fn view_keeps_owner_and_priority_matches_in_order() -> Result<()> {
        let table = table();
        let roles = RoleMap::resolve(table.columns())?;

        let view = FilteredView::build(&table, &roles, &selection("Ana", &["Critica"]));
        assert_eq!(view.len(), 1);
        assert_eq!(view.rows()[0].index, 0);
        assert_eq!(view.rows()[0].topic, "Caldera");

        let all = FilteredView::build(
            &table,
            &roles,
            &selection("Ana", &["Critica", "Importante", "Estrategica"]),
        );
        let indices: Vec<usize> = all.rows().iter().map(|row| row.index).collect();
        assert_eq!(indices, vec![0, 1, 3]);
        assert_eq!(
            all.rows().iter().map(|row| row.done).collect::<Vec<_>>(),
            vec![false, true, false]
        );
        Ok(())
    }

    #[test]
    fn empty_priority_set_yields_empty_view() -> Result<()> {
        let table = table();
        let roles = RoleMap::resolve(table.columns())?;
        let view = FilteredView::build(
            &table,
            &roles,
            &FilterSelection {
                owner: "Ana".to_owned(),
                priorities: BTreeSet::new(),
            },
        );
        assert!(view.is_empty());
        Ok(())
    }

    #[test]
    fn building_a_view_leaves_master_untouched() -> Result<()> {
        let table = table();
        let before = table.clone();
        let roles = RoleMap::resolve(table.columns())?;
        let _view = FilteredView::build(&table, &roles, &selection("Ana", &["Importante"]));
        assert_eq!(table, before);
        Ok(())
    }

    #[test]
    fn metrics_are_stable_and_follow_toggles() -> Result<()> {
        let table = table();
        let roles = RoleMap::resolve(table.columns())?;
        let mut view = FilteredView::build(
            &table,
            &roles,
            &selection("Ana", &["Critica", "Importante", "Estrategica"]),
        );

        let first = Metrics::compute(&view);
        assert_eq!(first, Metrics::compute(&view));
        assert_eq!(first.count(PriorityBucket::Critical, false), 1);
        assert_eq!(first.count(PriorityBucket::Important, true), 1);
        assert_eq!(first.count(PriorityBucket::Strategic, false), 1);

        assert_eq!(view.toggle_done(0), Some(true));
        let second = Metrics::compute(&view);
        assert_eq!(second.count(PriorityBucket::Critical, false), 0);
        assert_eq!(second.count(PriorityBucket::Critical, true), 1);
        for bucket in [PriorityBucket::Important, PriorityBucket::Strategic] {
            for done in [false, true] {
                assert_eq!(second.count(bucket, done), first.count(bucket, done));
            }
        }
        Ok(())
    }

    #[test]
    fn bucket_matching_ignores_case() {
        assert!(PriorityBucket::Critical.matches("CRITICA"));
        assert!(PriorityBucket::Important.matches("muy importante"));
        assert!(PriorityBucket::Strategic.matches("estratégica"));
        assert!(!PriorityBucket::Strategic.matches("Critica"));
    }

    #[test]
    fn tiles_list_pending_before_done() -> Result<()> {
        let table = table();
        let roles = RoleMap::resolve(table.columns())?;
        let view = FilteredView::build(&table, &roles, &selection("Luis", &["Critica"]));
        let tiles = Metrics::compute(&view).tiles();
        let labels: Vec<&str> = tiles.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Crit. ⏳", "Imp. ⏳", "Estr. ⏳", "Crit. ✅", "Imp. ✅", "Estr. ✅"
            ]
        );
        assert_eq!(tiles[3].1, 1);
        Ok(())
    }

    #[test]
    fn merge_writes_flags_by_master_index_only() -> Result<()> {
        let mut table = table();
        let roles = RoleMap::resolve(table.columns())?;
        let mut view = FilteredView::build(&table, &roles, &selection("Ana", &["Estrategica"]));
        let original = view.clone();
        view.toggle_done(0);
        assert_eq!(view.changed_positions(&original), vec![0]);

        let merged = view.merge_into(&mut table, &roles)?;
        assert_eq!(merged, 1);
        assert_eq!(table.rows()[3].cells[4], CellValue::Flag(true));
        assert_eq!(table.rows()[2].cells[4], CellValue::text("OK"));
        assert_eq!(table.rows()[0].cells[4], CellValue::text(""));
        Ok(())
    }
}
