use ratatui::{
    prelude::*,
    style::Style,
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::frame::{Body, CodeCell, EntryLine, FrameModel, GroupLine, Mode, RevealCard};
use crate::keymap::HELP_LINES;

const COLOR_SAND: Color = Color::Rgb(0xEB, 0xDB, 0xB2);
const COLOR_OLIVE: Color = Color::Rgb(0x98, 0x97, 0x1A);
const COLOR_MOSS: Color = Color::Rgb(0x67, 0x67, 0x1C);
const COLOR_URGENT: Color = Color::Red;

const HEADER_HEIGHT: u16 = 3;
const FOOTER_HEIGHT: u16 = 4;
const REVEAL_CARD_HEIGHT: u16 = 8;
/// Table borders plus its column header row.
const TABLE_CHROME: u16 = 3;

/// Style source that collapses to modifiers only when color is off.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub color: bool,
}

impl Theme {
    fn fg(&self, color: Color) -> Style {
        if self.color {
            Style::default().fg(color)
        } else {
            Style::default()
        }
    }

    fn selected(&self) -> Style {
        if self.color {
            Style::default()
                .fg(Color::Black)
                .bg(COLOR_OLIVE)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
        }
    }

    fn urgent(&self) -> Style {
        let style = Style::default().add_modifier(Modifier::BOLD);
        if self.color {
            style.fg(COLOR_URGENT)
        } else {
            style.add_modifier(Modifier::REVERSED)
        }
    }

    fn overlay(&self) -> Style {
        if self.color {
            Style::default().fg(COLOR_SAND).bg(Color::Rgb(0x1E, 0x20, 0x12))
        } else {
            Style::default()
        }
    }
}

/// Rows of the list that fit a terminal `height` cells tall in `mode`.
pub fn page_size_for(height: u16, mode: Mode) -> usize {
    let card = if mode == Mode::Reveal {
        REVEAL_CARD_HEIGHT
    } else {
        0
    };
    let body = height.saturating_sub(HEADER_HEIGHT + FOOTER_HEIGHT + card);
    (body.saturating_sub(TABLE_CHROME) as usize).max(1)
}

fn centered_overlay_area(frame_size: Rect, lines: &[&str]) -> Rect {
    let maxw = lines.iter().map(|s| s.chars().count()).max().unwrap_or(0) as u16 + 4;
    let maxh = lines.len() as u16 + 2;
    Rect::new(
        (frame_size.width.saturating_sub(maxw)) / 2,
        (frame_size.height.saturating_sub(maxh)) / 2,
        maxw.min(frame_size.width),
        maxh.min(frame_size.height),
    )
}

fn render_overlay(f: &mut Frame<'_>, lines: &[&str], title: &str, theme: &Theme) {
    let area = centered_overlay_area(f.size(), lines);
    let paragraph = Paragraph::new(lines.iter().map(|l| Line::from(*l)).collect::<Vec<Line>>())
        .style(theme.overlay())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    title,
                    theme.fg(COLOR_SAND).add_modifier(Modifier::BOLD),
                ))
                .border_style(theme.fg(COLOR_MOSS).add_modifier(Modifier::BOLD))
                .style(theme.overlay()),
        );
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

fn code_span(code: &CodeCell, theme: &Theme) -> Span<'static> {
    match code {
        CodeCell::Masked => Span::styled(code.text(), theme.fg(Color::DarkGray)),
        CodeCell::Revealed(_) => Span::styled(
            code.text(),
            theme.fg(COLOR_SAND).add_modifier(Modifier::BOLD),
        ),
        CodeCell::Error(_) => Span::styled(code.text(), theme.fg(COLOR_URGENT)),
    }
}

fn entry_row(line: &EntryLine, theme: &Theme) -> Row<'static> {
    let row = Row::new(vec![
        Cell::from(line.position.to_string()),
        Cell::from(line.issuer.clone()),
        Cell::from(line.name.clone()),
        Cell::from(code_span(&line.code, theme)),
        Cell::from(line.groups.clone()),
        Cell::from(line.note.clone()),
    ]);
    if line.selected {
        row.style(theme.selected())
    } else if line.revealed {
        row.style(Style::default().add_modifier(Modifier::BOLD))
    } else {
        row
    }
}

fn draw_entries(f: &mut Frame<'_>, area: Rect, lines: &[EntryLine], model: &FrameModel, theme: &Theme) {
    let title = format!("{} ({})", model.header, lines.len());
    let border = if model.mode == Mode::Reveal {
        COLOR_OLIVE
    } else {
        COLOR_MOSS
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(theme.fg(border));
    let shown = lines.get(model.window.clone()).unwrap_or(&[]);
    let rows: Vec<Row> = shown.iter().map(|l| entry_row(l, theme)).collect();
    let header = Row::new(vec!["#", "Issuer", "Name", "Code", "Group", "Note"])
        .style(theme.fg(COLOR_SAND).add_modifier(Modifier::BOLD));
    let widths = [
        Constraint::Length(4),
        Constraint::Percentage(22),
        Constraint::Percentage(24),
        Constraint::Length(12),
        Constraint::Percentage(18),
        Constraint::Min(4),
    ];
    let table = Table::new(rows, widths).header(header).block(block);
    f.render_widget(table, area);
}

fn group_item(line: &GroupLine, theme: &Theme) -> ListItem<'static> {
    let marker = if line.active { "● " } else { "  " };
    let item = ListItem::new(format!("{marker}{}", line.label));
    if line.selected {
        item.style(theme.selected())
    } else {
        item
    }
}

fn draw_groups(f: &mut Frame<'_>, area: Rect, lines: &[GroupLine], model: &FrameModel, theme: &Theme) {
    let shown = lines.get(model.window.clone()).unwrap_or(&[]);
    let items: Vec<ListItem> = shown.iter().map(|l| group_item(l, theme)).collect();
    let list = List::new(items).block(
        Block::default()
            .title(model.header.clone())
            .borders(Borders::ALL)
            .border_style(theme.fg(COLOR_MOSS)),
    );
    f.render_widget(list, area);
}

fn draw_reveal_card(f: &mut Frame<'_>, area: Rect, card: &RevealCard, theme: &Theme) {
    let label = theme.fg(COLOR_OLIVE).add_modifier(Modifier::BOLD);
    let countdown = if card.urgent {
        theme.urgent()
    } else {
        Style::default()
    };
    let lines = vec![
        Line::from(vec![Span::styled("Issuer: ", label), Span::raw(card.issuer.clone())]),
        Line::from(vec![Span::styled("Name: ", label), Span::raw(card.name.clone())]),
        Line::from(vec![Span::styled("Group: ", label), Span::raw(card.groups.clone())]),
        Line::from(vec![Span::styled("Note: ", label), Span::raw(card.note.clone())]),
        Line::from(vec![Span::styled("OTP Code: ", label), code_span(&card.code, theme)]),
        Line::from(vec![
            Span::styled("Time to Next: ", label),
            Span::styled(format!("{}s", card.seconds_left), countdown),
        ]),
    ];
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title("Revealed")
            .borders(Borders::ALL)
            .border_style(theme.fg(COLOR_OLIVE)),
    );
    f.render_widget(paragraph, area);
}

pub fn draw(f: &mut Frame<'_>, model: &FrameModel, theme: &Theme) {
    let mut constraints = vec![Constraint::Length(HEADER_HEIGHT), Constraint::Min(1)];
    if model.reveal.is_some() {
        constraints.push(Constraint::Length(REVEAL_CARD_HEIGHT));
    }
    constraints.push(Constraint::Length(FOOTER_HEIGHT));
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.size());

    let header = Paragraph::new(Line::from(Span::styled(
        model.header.clone(),
        theme.fg(COLOR_SAND).add_modifier(Modifier::BOLD),
    )))
    .block(
        Block::default()
            .title("aegis-tui")
            .borders(Borders::ALL)
            .border_style(theme.fg(COLOR_MOSS)),
    );
    f.render_widget(header, layout[0]);

    match &model.body {
        Body::Entries(lines) => draw_entries(f, layout[1], lines, model, theme),
        Body::Groups(lines) => draw_groups(f, layout[1], lines, model, theme),
    }

    let footer_area = if let Some(card) = &model.reveal {
        draw_reveal_card(f, layout[2], card, theme);
        layout[3]
    } else {
        layout[2]
    };

    let footer = Paragraph::new(vec![
        Line::from(model.prompt.clone()),
        Line::from(Span::styled(model.status.clone(), theme.fg(COLOR_OLIVE))),
    ])
    .block(Block::default().borders(Borders::ALL).border_style(theme.fg(COLOR_MOSS)));
    f.render_widget(footer, footer_area);

    if model.help {
        render_overlay(f, &HELP_LINES, "Help", theme);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MASK;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use ratatui::Terminal;

    fn buffer_to_string(buffer: &Buffer) -> String {
        let width = buffer.area().width as usize;
        let mut out = String::new();
        for row in buffer.content.chunks(width) {
            for cell in row {
                out.push_str(cell.symbol());
            }
            out.push('\n');
        }
        out
    }

    fn render(model: &FrameModel, color: bool, width: u16, height: u16) -> (String, Buffer) {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal
            .draw(|f| draw(f, model, &Theme { color }))
            .expect("draw");
        let buffer = terminal.backend().buffer().clone();
        (buffer_to_string(&buffer), buffer)
    }

    fn line(position: usize, issuer: &str, name: &str, code: CodeCell, selected: bool) -> EntryLine {
        EntryLine {
            position,
            issuer: issuer.to_string(),
            name: name.to_string(),
            groups: "Work".to_string(),
            note: String::new(),
            revealed: matches!(code, CodeCell::Revealed(_)),
            code,
            selected,
        }
    }

    fn browse_model() -> FrameModel {
        FrameModel {
            mode: Mode::Browse,
            header: "All OTPs".to_string(),
            body: Body::Entries(vec![
                line(1, "Issuer A", "Test OTP 1", CodeCell::Masked, true),
                line(2, "Issuer B", "Another OTP", CodeCell::Masked, false),
                line(3, "Issuer C", "Hidden by scroll", CodeCell::Masked, false),
            ]),
            window: 0..2,
            reveal: None,
            prompt: "Search: ".to_string(),
            status: "hint line".to_string(),
            help: false,
        }
    }

    #[test]
    fn browse_table_shows_window_rows_masked() {
        let (text, _) = render(&browse_model(), true, 100, 20);
        assert!(text.contains("All OTPs"));
        assert!(text.contains("Test OTP 1"));
        assert!(text.contains("Another OTP"));
        assert!(!text.contains("Hidden by scroll"));
        assert_eq!(text.matches(MASK).count(), 2);
        assert!(text.contains("Search:"));
        assert!(text.contains("hint line"));
    }

    #[test]
    fn reveal_card_shows_code_and_countdown() {
        let mut model = browse_model();
        model.mode = Mode::Reveal;
        model.header = "Revealed OTP: Test OTP 1".to_string();
        model.body = Body::Entries(vec![line(
            1,
            "Issuer A",
            "Test OTP 1",
            CodeCell::Revealed("123456".to_string()),
            true,
        )]);
        model.window = 0..1;
        model.reveal = Some(RevealCard {
            issuer: "Issuer A".to_string(),
            name: "Test OTP 1".to_string(),
            groups: "Work".to_string(),
            note: "backup codes in drawer".to_string(),
            code: CodeCell::Revealed("123456".to_string()),
            seconds_left: 7,
            urgent: true,
        });
        let (text, buffer) = render(&model, true, 100, 30);
        assert!(text.contains("OTP Code: 123456"));
        assert!(text.contains("Time to Next: 7s"));
        assert!(text.contains("Note: backup codes in drawer"));

        assert!(buffer.content.iter().any(|c| c.fg == COLOR_URGENT));
    }

    #[test]
    fn monochrome_uses_no_colors() {
        let mut model = browse_model();
        model.help = true;
        let (_, buffer) = render(&model, false, 100, 30);
        assert!(buffer
            .content
            .iter()
            .all(|c| c.fg == Color::Reset && c.bg == Color::Reset));
    }

    #[test]
    fn group_list_marks_active_group() {
        let model = FrameModel {
            mode: Mode::GroupSelect,
            header: "Select Group".to_string(),
            body: Body::Groups(vec![
                GroupLine {
                    label: "-- All OTPs --".to_string(),
                    selected: false,
                    active: false,
                },
                GroupLine {
                    label: "Work".to_string(),
                    selected: true,
                    active: true,
                },
            ]),
            window: 0..2,
            reveal: None,
            prompt: "Group search: ".to_string(),
            status: String::new(),
            help: false,
        };
        let (text, _) = render(&model, true, 60, 15);
        assert!(text.contains("-- All OTPs --"));
        assert!(text.contains("● Work"));
    }

    #[test]
    fn help_overlay_lists_bindings() {
        let mut model = browse_model();
        model.help = true;
        let (text, _) = render(&model, true, 100, 30);
        assert!(text.contains("Press any key to close"));
        assert!(text.contains("Ctrl+G"));
    }

    #[test]
    fn tiny_terminal_clips_without_panicking() {
        let mut model = browse_model();
        model.help = true;
        let _ = render(&model, true, 12, 4);
    }

    #[test]
    fn page_size_tracks_height() {
        assert_eq!(page_size_for(30, Mode::Browse), 20);
        assert_eq!(page_size_for(30, Mode::Reveal), 12);
        assert_eq!(page_size_for(5, Mode::Browse), 1);
    }
}
