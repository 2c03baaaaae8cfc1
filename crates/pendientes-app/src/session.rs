// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};

use crate::model::TaskTable;
use crate::roles::{RoleMap, UnresolvedRoles};
use crate::view::{FilterOptions, FilterSelection, FilteredView, Metrics};

/// Session-scoped dashboard state: the master table plus everything derived
/// from it for the current sidebar selection.
///
/// The view and metrics only exist when every role resolved and the table has
/// rows; otherwise the dashboard has nothing to show.
#[derive(Debug, Clone, Default)]
pub struct Session {
    master: TaskTable,
    board: Option<Board>,
}

#[derive(Debug, Clone)]
struct Board {
    roles: RoleMap,
    options: FilterOptions,
    selection: FilterSelection,
    baseline: FilteredView,
    edited: FilteredView,
}

impl Session {
    pub fn new(master: TaskTable) -> Self {
        let mut session = Self {
            master,
            board: None,
        };
        session.rebuild(None);
        session
    }

    pub fn master(&self) -> &TaskTable {
        &self.master
    }

    pub fn roles(&self) -> Option<&RoleMap> {
        self.board.as_ref().map(|board| &board.roles)
    }

    /// Why nothing can be shown, if roles failed to resolve on a non-empty table.
    pub fn unresolved_roles(&self) -> Option<UnresolvedRoles> {
        if self.master.is_empty() {
            return None;
        }
        RoleMap::resolve(self.master.columns()).err()
    }

    pub fn options(&self) -> Option<&FilterOptions> {
        self.board.as_ref().map(|board| &board.options)
    }

    pub fn selection(&self) -> Option<&FilterSelection> {
        self.board.as_ref().map(|board| &board.selection)
    }

    /// The edited view, as shown in the grid.
    pub fn view(&self) -> Option<&FilteredView> {
        self.board.as_ref().map(|board| &board.edited)
    }

    pub fn metrics(&self) -> Option<Metrics> {
        self.view().map(Metrics::compute)
    }

    pub fn has_unsaved_edits(&self) -> bool {
        self.board
            .as_ref()
            .is_some_and(|board| !board.edited.changed_positions(&board.baseline).is_empty())
    }

    /// Switches owner; the view is rebuilt from the master table and returns
    /// whether pending edits were dropped.
    pub fn select_owner(&mut self, owner: &str) -> Result<bool> {
        let board = self
            .board
            .as_mut()
            .ok_or_else(|| anyhow!("no task table loaded"))?;
        if !board.options.owners.iter().any(|known| known == owner) {
            return Err(anyhow!("unknown owner {owner:?}"));
        }
        let mut selection = board.selection.clone();
        selection.owner = owner.to_owned();
        Ok(self.apply_selection(selection))
    }

    /// Adds or removes one priority from the selection.
    pub fn toggle_priority(&mut self, priority: &str) -> Result<bool> {
        let board = self
            .board
            .as_mut()
            .ok_or_else(|| anyhow!("no task table loaded"))?;
        if !board.options.priorities.iter().any(|known| known == priority) {
            return Err(anyhow!("unknown priority {priority:?}"));
        }
        let mut selection = board.selection.clone();
        if !selection.priorities.remove(priority) {
            selection.priorities.insert(priority.to_owned());
        }
        Ok(self.apply_selection(selection))
    }

    pub fn toggle_done(&mut self, position: usize) -> Option<bool> {
        self.board.as_mut()?.edited.toggle_done(position)
    }

    /// Copies every done flag of the edited view into the master table. This
    /// is the in-memory half of a save and is never rolled back.
    pub fn merge_edits(&mut self) -> Result<usize> {
        let board = self
            .board
            .as_ref()
            .ok_or_else(|| anyhow!("no task table loaded"))?;
        let merged = board.edited.merge_into(&mut self.master, &board.roles)?;
        if let Some(board) = self.board.as_mut() {
            board.baseline = board.edited.clone();
        }
        Ok(merged)
    }

    /// The master table with done cells re-encoded for the sheet and export.
    pub fn persistence_copy(&self) -> Result<TaskTable> {
        let roles = self
            .roles()
            .ok_or_else(|| anyhow!("no task table loaded"))?;
        Ok(self.master.persistence_copy(roles))
    }

    /// Replaces the master table wholesale and rebuilds the view, keeping the
    /// current selection where it still applies.
    pub fn replace_master(&mut self, master: TaskTable) {
        let previous = self.board.as_ref().map(|board| board.selection.clone());
        self.master = master;
        self.rebuild(previous);
    }

    fn apply_selection(&mut self, selection: FilterSelection) -> bool {
        let Some(board) = self.board.as_mut() else {
            return false;
        };
        let dropped = !board.edited.changed_positions(&board.baseline).is_empty();
        board.baseline = FilteredView::build(&self.master, &board.roles, &selection);
        board.edited = board.baseline.clone();
        board.selection = selection;
        dropped
    }

    fn rebuild(&mut self, previous: Option<FilterSelection>) {
        self.board = None;
        if self.master.is_empty() {
            return;
        }
        let roles = match RoleMap::resolve(self.master.columns()) {
            Ok(roles) => roles,
            Err(error) => {
                tracing::warn!(%error, "task table columns do not resolve; view disabled");
                return;
            }
        };
        let options = FilterOptions::from_table(&self.master, &roles);
        let Some(default) = options.default_selection() else {
            return;
        };
        let selection = match previous {
            Some(previous) if options.owners.contains(&previous.owner) => FilterSelection {
                owner: previous.owner,
                priorities: previous
                    .priorities
                    .into_iter()
                    .filter(|priority| options.priorities.contains(priority))
                    .collect(),
            },
            _ => default,
        };
        let baseline = FilteredView::build(&self.master, &roles, &selection);
        self.board = Some(Board {
            roles,
            options,
            edited: baseline.clone(),
            baseline,
            selection,
        });
    }
}
