// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use pendientes_app::{DONE_TEXT, PENDING_TEXT, TaskTable};
use std::path::PathBuf;

/// Canonical header of the shared task sheet.
pub const SCENARIO_HEADER: [&str; 5] = ["Tema", "Desarrollo", "Importancia", "Responsable", "OK"];

/// Same roles under their alternate names.
pub const ALTERNATE_HEADER: [&str; 5] = ["TAREA", "DETALLE", "PRIORIDAD", "RESPONSABLE", "ESTADO"];

const SCENARIO_ROWS: [[&str; 5]; 4] = [
    ["Caldera", "Revisar presión", "Critica", "Ana", PENDING_TEXT],
    ["Curtido", "Pedir cromo", "Importante", "Ana", DONE_TEXT],
    ["Planta", "Plan de ampliación", "Estrategica", "Ana", PENDING_TEXT],
    ["Bombas", "Cambiar sellos", "Critica", "Luis", DONE_TEXT],
];

const OWNERS: [&str; 6] = ["Ana", "Luis", "Marta", "Jorge", "Sofía", "Pablo"];
const PRIORITIES: [&str; 3] = ["Critica", "Importante", "Estrategica"];

const TOPICS: [&str; 14] = [
    "Caldera",
    "Curtido",
    "Pelambre",
    "Descarne",
    "Bombas",
    "Tratamiento de efluentes",
    "Depósito",
    "Secado",
    "Terminación",
    "Compras",
    "Mantenimiento",
    "Seguridad",
    "Calidad",
    "Planta",
];

const ACTIONS: [&str; 12] = [
    "Revisar",
    "Cambiar",
    "Pedir",
    "Calibrar",
    "Limpiar",
    "Inspeccionar",
    "Cotizar",
    "Reparar",
    "Documentar",
    "Coordinar",
    "Medir",
    "Ajustar",
];

const SUBJECTS: [&str; 14] = [
    "presión de trabajo",
    "sellos mecánicos",
    "stock de cromo",
    "válvulas de purga",
    "filtros de agua",
    "tambores de curtido",
    "cintas transportadoras",
    "pH del baño",
    "tableros eléctricos",
    "extintores",
    "proveedores de sal",
    "muestras de cuero",
    "rodillos de la máquina",
    "planos de ampliación",
];

pub fn scenario_grid() -> Vec<Vec<String>> {
    grid_with_header(&SCENARIO_HEADER)
}

/// Four rows, three owned by Ana and one by Luis, two already done.
pub fn scenario_table() -> TaskTable {
    TaskTable::from_grid(scenario_grid())
}

/// The scenario rows under the alternate header names, padded with spaces.
pub fn alternate_header_table() -> TaskTable {
    let header: Vec<String> = ALTERNATE_HEADER
        .iter()
        .map(|name| format!(" {name} "))
        .collect();
    let mut grid = vec![header];
    grid.extend(scenario_records());
    TaskTable::from_grid(grid)
}

/// A sheet whose header names match no owner or done column.
pub fn unresolved_table() -> TaskTable {
    grid_to_table(&["Tema", "Desarrollo", "Importancia", "Encargado", "Hecho"])
}

fn grid_to_table(header: &[&str]) -> TaskTable {
    TaskTable::from_grid(grid_with_header(header))
}

fn grid_with_header(header: &[&str]) -> Vec<Vec<String>> {
    let mut grid = vec![header.iter().map(|name| (*name).to_owned()).collect()];
    grid.extend(scenario_records());
    grid
}

fn scenario_records() -> Vec<Vec<String>> {
    SCENARIO_ROWS
        .iter()
        .map(|row| row.iter().map(|cell| (*cell).to_owned()).collect())
        .collect()
}

pub fn temp_export_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("Listado de Pendientes.xlsx");
    Ok((dir, path))
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plausible tannery task sheets.
#[derive(Debug, Clone)]
pub struct TaskFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl TaskFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// One record in header order: topic, detail, priority, owner, done.
    pub fn task(&mut self, owner: &str) -> Vec<String> {
        let topic = self.pick(&TOPICS).to_owned();
        let detail = format!("{} {}", self.pick(&ACTIONS), self.pick(&SUBJECTS));
        let priority = self.pick(&PRIORITIES).to_owned();
        let done = if self.rng.bool() && self.rng.bool() {
            DONE_TEXT
        } else {
            PENDING_TEXT
        };
        vec![topic, detail, priority, owner.to_owned(), done.to_owned()]
    }

    /// Header plus `rows` records spread over `owners` people. Every owner
    /// gets at least one row when `rows >= owners`.
    pub fn sheet_grid(&mut self, owners: usize, rows: usize) -> Vec<Vec<String>> {
        let owners = owners.clamp(1, OWNERS.len());
        let mut grid = Vec::with_capacity(rows + 1);
        grid.push(SCENARIO_HEADER.iter().map(|name| (*name).to_owned()).collect());
        for index in 0..rows {
            let owner = if index < owners {
                OWNERS[index]
            } else {
                OWNERS[self.rng.int_n(owners)]
            };
            grid.push(self.task(owner));
        }
        grid
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}

/// Sheet contents used by `--demo`.
pub fn demo_grid() -> Vec<Vec<String>> {
    TaskFaker::new(42).sheet_grid(4, 24)
}

#[cfg(test)]
mod tests {
    use super::{
        TaskFaker, alternate_header_table, demo_grid, scenario_table, temp_export_path,
        unresolved_table,
    };
    use pendientes_app::{Role, RoleMap, Session};
    use std::collections::BTreeSet;

    #[test]
    fn scenario_has_four_rows_and_two_owners() {
        let table = scenario_table();
        assert_eq!(table.len(), 4);
        let roles = RoleMap::resolve(table.columns()).expect("scenario resolves");
        let owners: BTreeSet<&str> = table
            .rows()
            .iter()
            .map(|row| row.text(roles.index(Role::Owner)))
            .collect();
        assert_eq!(owners.into_iter().collect::<Vec<_>>(), vec!["Ana", "Luis"]);
    }

    #[test]
    fn alternate_header_resolves_to_same_positions() {
        let table = alternate_header_table();
        assert_eq!(table.columns()[0], "TAREA");
        let roles = RoleMap::resolve(table.columns()).expect("alternate names resolve");
        assert_eq!(roles.index(Role::Topic), 0);
        assert_eq!(roles.index(Role::Done), 4);
    }

    #[test]
    fn unresolved_table_reports_missing_roles() {
        let error = RoleMap::resolve(unresolved_table().columns()).expect_err("no owner column");
        assert!(error.roles.contains(&Role::Owner));
        assert!(error.roles.contains(&Role::Done));
    }

    #[test]
    fn new_deterministic_seed() {
        let mut first = TaskFaker::new(7);
        let mut second = TaskFaker::new(7);
        assert_eq!(first.sheet_grid(3, 10), second.sheet_grid(3, 10));
        assert_eq!(TaskFaker::new(0).seed(), 1);
    }

    #[test]
    fn variety_across_seeds() {
        let grids: BTreeSet<Vec<Vec<String>>> = (1..=5)
            .map(|seed| TaskFaker::new(seed).sheet_grid(3, 12))
            .collect();
        assert!(grids.len() > 1);
    }

    #[test]
    fn sheet_grid_covers_every_owner() {
        let grid = TaskFaker::new(3).sheet_grid(4, 8);
        assert_eq!(grid.len(), 9);
        let owners: BTreeSet<&str> = grid[1..].iter().map(|row| row[3].as_str()).collect();
        assert_eq!(owners.len(), 4);
        assert!(
            grid[1..]
                .iter()
                .all(|row| row[4] == "OK" || row[4] == "_")
        );
    }

    #[test]
    fn demo_grid_builds_a_board() {
        let session = Session::new(pendientes_app::TaskTable::from_grid(demo_grid()));
        assert!(session.view().is_some_and(|view| !view.is_empty()));
    }

    #[test]
    fn int_n() {
        let mut faker = TaskFaker::new(11);
        for _ in 0..100 {
            assert!(faker.int_n(5) < 5);
        }
        assert_eq!(faker.int_n(1), 0);
        assert_eq!(faker.int_n(0), 0);
    }

    #[test]
    fn temp_export_path_is_xlsx() {
        let (_dir, path) = temp_export_path().expect("temp dir");
        assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("xlsx"));
    }
}
