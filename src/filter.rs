use crate::index::{compare_rows, Row};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search_term: String,
    pub group: Option<String>,
}

impl FilterState {
    pub fn with_group(group: Option<String>) -> Self {
        Self {
            search_term: String::new(),
            group,
        }
    }
}

pub fn matches_group(row: &Row, group: Option<&str>) -> bool {
    match group {
        Some(name) => row.group_names.iter().any(|g| g == name),
        None => true,
    }
}

/// Case-insensitive containment over name/issuer/groups/note, or an exact
/// hit on the row's 1-based position.
pub fn matches_search(row: &Row, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    if let Ok(n) = term.trim().parse::<usize>() {
        if n > 0 && n == row.position {
            return true;
        }
    }
    let needle = term.to_lowercase();
    row.name.to_lowercase().contains(&needle)
        || row.issuer.to_lowercase().contains(&needle)
        || row.groups_label().to_lowercase().contains(&needle)
        || row.note.to_lowercase().contains(&needle)
}

/// Rows passing the group and search predicates, issuer-then-name ordered.
pub fn visible<'a>(rows: &'a [Row], filter: &FilterState) -> Vec<&'a Row> {
    let mut out: Vec<&Row> = rows
        .iter()
        .filter(|r| matches_group(r, filter.group.as_deref()))
        .filter(|r| matches_search(r, &filter.search_term))
        .collect();
    out.sort_by(|a, b| compare_rows(a, b));
    out
}

/// Group picker list: substring match on the group name.
pub fn visible_groups<'a>(groups: &'a [String], term: &str) -> Vec<&'a String> {
    let needle = term.to_lowercase();
    groups
        .iter()
        .filter(|g| needle.is_empty() || g.to_lowercase().contains(&needle))
        .collect()
}
