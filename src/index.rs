use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::Db;

/// Display-ready projection of one vault entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub uuid: String,
    pub name: String,
    pub issuer: String,
    pub note: String,
    pub group_names: Vec<String>,
    /// 1-based position in the full sorted list; stable under filtering.
    pub position: usize,
}

impl Row {
    pub fn groups_label(&self) -> String {
        self.group_names.join(", ")
    }
}

pub fn compare_rows(a: &Row, b: &Row) -> Ordering {
    a.issuer
        .to_lowercase()
        .cmp(&b.issuer.to_lowercase())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
}

/// Resolves group ids to names and sorts by issuer then name.
/// Unknown group ids are kept verbatim.
pub fn build_rows(db: &Db) -> Vec<Row> {
    let names: HashMap<&str, &str> = db
        .groups
        .iter()
        .map(|g| (g.uuid.as_str(), g.name.as_str()))
        .collect();

    let mut rows: Vec<Row> = db
        .entries
        .iter()
        .map(|e| Row {
            uuid: e.uuid.clone(),
            name: e.name.clone(),
            issuer: e.issuer.clone(),
            note: e.note.clone(),
            group_names: e
                .groups
                .iter()
                .map(|id| names.get(id.as_str()).copied().unwrap_or(id.as_str()).to_string())
                .collect(),
            position: 0,
        })
        .collect();
    rows.sort_by(compare_rows);
    for (i, row) in rows.iter_mut().enumerate() {
        row.position = i + 1;
    }
    rows
}

/// Group names in vault order, for the group picker.
pub fn group_names(db: &Db) -> Vec<String> {
    db.groups.iter().map(|g| g.name.clone()).collect()
}
