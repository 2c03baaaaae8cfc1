// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical field of a task, independent of the physical header name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Topic,
    Detail,
    Priority,
    Owner,
    Done,
}

impl Role {
    pub const ALL: [Self; 5] = [
        Self::Topic,
        Self::Detail,
        Self::Priority,
        Self::Owner,
        Self::Done,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Detail => "detail",
            Self::Priority => "priority",
            Self::Owner => "owner",
            Self::Done => "done",
        }
    }

    /// Header fragments tried in order; the first that appears in any column wins.
    pub const fn candidates(self) -> &'static [&'static str] {
        match self {
            Self::Topic => &["TEMA", "TAREA"],
            Self::Detail => &["DESARROLLO", "DETALLE"],
            Self::Priority => &["IMPORTANCIA", "PRIORIDAD"],
            Self::Owner => &["RESPONSABLE"],
            Self::Done => &["OK", "ESTADO"],
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Topic => 0,
            Self::Detail => 1,
            Self::Priority => 2,
            Self::Owner => 3,
            Self::Done => 4,
        }
    }
}

/// Finds the first column containing one of `candidates`, ignoring case.
///
/// Candidates are tried in order and, for each, columns are scanned in their
/// original order, so an earlier candidate beats an earlier column.
pub fn resolve_column<S: AsRef<str>>(columns: &[S], candidates: &[&str]) -> Option<usize> {
    let upper_columns: Vec<String> = columns
        .iter()
        .map(|column| column.as_ref().to_uppercase())
        .collect();
    candidates.iter().find_map(|candidate| {
        let needle = candidate.to_uppercase();
        upper_columns
            .iter()
            .position(|column| column.contains(&needle))
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRoles {
    pub roles: Vec<Role>,
}

impl fmt::Display for UnresolvedRoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .roles
            .iter()
            .map(|role| role.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "no column matches role(s): {names}")
    }
}

impl std::error::Error for UnresolvedRoles {}

/// Physical column for each role. Only constructible when every role resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMap {
    names: [String; 5],
    indices: [usize; 5],
}

impl RoleMap {
    pub fn resolve<S: AsRef<str>>(columns: &[S]) -> Result<Self, UnresolvedRoles> {
        let mut names: [String; 5] = Default::default();
        let mut indices = [0usize; 5];
        let mut missing = Vec::new();

        for role in Role::ALL {
            match resolve_column(columns, role.candidates()) {
                Some(index) => {
                    tracing::debug!(
                        role = role.as_str(),
                        column = columns[index].as_ref(),
                        "resolved column"
                    );
                    names[role.slot()] = columns[index].as_ref().to_owned();
                    indices[role.slot()] = index;
                }
                None => missing.push(role),
            }
        }

        if !missing.is_empty() {
            return Err(UnresolvedRoles { roles: missing });
        }
        Ok(Self { names, indices })
    }

    pub fn name(&self, role: Role) -> &str {
        &self.names[role.slot()]
    }

    pub fn index(&self, role: Role) -> usize {
        self.indices[role.slot()]
    }
}

#[cfg(test)]
mod tests {
    use super::{Role, RoleMap, resolve_column};

    #[test]
    fn topic_candidates_match_tarea_principal() {
        let columns = ["Tarea Principal", "Responsable"];
        assert_eq!(resolve_column(&columns, &["TEMA", "TAREA"]), Some(0));
    }

    #[test]
    fn no_matching_candidate_is_unresolved() {
        let columns = ["Nombre", "Fecha"];
        assert_eq!(resolve_column(&columns, &["TEMA", "TAREA"]), None);
    }

    #[test]
    fn earlier_candidate_beats_earlier_column() {
        let columns = ["Tarea", "Tema"];
        assert_eq!(resolve_column(&columns, &["TEMA", "TAREA"]), Some(1));
    }

    #[test]
    fn matching_ignores_case() {
        let columns = ["estado actual"];
        assert_eq!(resolve_column(&columns, Role::Done.candidates()), Some(0));
    }

    #[test]
    fn role_map_resolves_drifted_headers() {
        let columns = [
            "Tarea Principal",
            "Detalle de la tarea",
            "Prioridad",
            "Responsable asignado",
            "Estado",
        ];
        let roles = RoleMap::resolve(&columns).expect("all roles resolve");
        assert_eq!(roles.name(Role::Topic), "Tarea Principal");
        assert_eq!(roles.name(Role::Detail), "Detalle de la tarea");
        assert_eq!(roles.index(Role::Priority), 2);
        assert_eq!(roles.name(Role::Owner), "Responsable asignado");
        assert_eq!(roles.index(Role::Done), 4);
    }

    #[test]
    fn role_map_reports_every_missing_role() {
        let columns = ["Tema", "Desarrollo", "Importancia"];
        let error = RoleMap::resolve(&columns).expect_err("owner and done are missing");
        assert_eq!(error.roles, vec![Role::Owner, Role::Done]);
        assert!(error.to_string().contains("owner, done"));
    }
}
