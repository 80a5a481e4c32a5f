use std::ops::Range;

pub const MASK: &str = "******";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    GroupSelect,
    Reveal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeCell {
    Masked,
    Revealed(String),
    Error(String),
}

impl CodeCell {
    pub fn text(&self) -> String {
        match self {
            CodeCell::Masked => MASK.to_string(),
            CodeCell::Revealed(code) => code.clone(),
            CodeCell::Error(msg) => format!("ERROR: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLine {
    pub position: usize,
    pub issuer: String,
    pub name: String,
    pub groups: String,
    pub note: String,
    pub code: CodeCell,
    pub selected: bool,
    pub revealed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLine {
    pub label: String,
    pub selected: bool,
    /// The group the browse list is currently filtered by.
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Entries(Vec<EntryLine>),
    Groups(Vec<GroupLine>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealCard {
    pub issuer: String,
    pub name: String,
    pub groups: String,
    pub note: String,
    pub code: CodeCell,
    pub seconds_left: i64,
    pub urgent: bool,
}

/// Everything the renderer needs for one draw. Built by the session;
/// the renderer decides placement only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameModel {
    pub mode: Mode,
    pub header: String,
    pub body: Body,
    pub window: Range<usize>,
    pub reveal: Option<RevealCard>,
    pub prompt: String,
    pub status: String,
    pub help: bool,
}

#[cfg(test)]
impl FrameModel {
    pub fn entry_lines(&self) -> &[EntryLine] {
        match &self.body {
            Body::Entries(lines) => lines,
            Body::Groups(_) => &[],
        }
    }
}
