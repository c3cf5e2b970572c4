use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem as ListRow, ListState},
};

use crate::wizard::loader::ListItem;
use crate::wizard::state::Selection;

use super::render_controls;
use super::terminal::Tui;

/// Single choice out of a list, optionally filtered by typing.
pub(super) struct SingleSelector {
    all_items: Vec<ListItem>,
    filtered_indices: Vec<usize>,
    cursor_position: usize,
    list_state: ListState,
    title: String,
    filter_text: String,
    filterable: bool,
}

impl SingleSelector {
    pub(super) fn new(items: Vec<ListItem>, title: &str, filterable: bool) -> Self {
        let filtered_indices: Vec<usize> = (0..items.len()).collect();
        let mut list_state = ListState::default();
        list_state.select((!items.is_empty()).then_some(0));
        Self {
            all_items: items,
            filtered_indices,
            cursor_position: 0,
            list_state,
            title: title.to_string(),
            filter_text: String::new(),
            filterable,
        }
    }

    fn update_filter(&mut self) {
        let filter_lower = self.filter_text.to_lowercase();
        self.filtered_indices = self
            .all_items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                item.title.to_lowercase().contains(&filter_lower)
                    || item.description.to_lowercase().contains(&filter_lower)
            })
            .map(|(i, _)| i)
            .collect();

        self.cursor_position = 0;
        if !self.filtered_indices.is_empty() {
            self.list_state.select(Some(0));
        } else {
            self.list_state.select(None);
        }
    }

    pub(super) fn add_char(&mut self, c: char) {
        if self.filterable {
            self.filter_text.push(c);
            self.update_filter();
        }
    }

    pub(super) fn remove_char(&mut self) {
        if self.filterable && !self.filter_text.is_empty() {
            self.filter_text.pop();
            self.update_filter();
        }
    }

    pub(super) fn move_up(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            self.list_state.select(Some(self.cursor_position));
        }
    }

    pub(super) fn move_down(&mut self) {
        if self.cursor_position < self.filtered_indices.len().saturating_sub(1) {
            self.cursor_position += 1;
            self.list_state.select(Some(self.cursor_position));
        }
    }

    /// Takes the item under the cursor, consuming the selector.
    pub(super) fn into_selected(mut self) -> Option<Selection> {
        let index = self.filtered_indices.get(self.cursor_position).copied()?;
        Some(self.all_items.swap_remove(index).selection)
    }

    fn has_selection(&self) -> bool {
        self.filtered_indices.get(self.cursor_position).is_some()
    }

    fn visible_items(&self) -> impl Iterator<Item = &ListItem> {
        self.filtered_indices.iter().map(|&i| &self.all_items[i])
    }
}

fn render(frame: &mut Frame, selector: &mut SingleSelector) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)])
        .split(frame.area());

    let cursor = selector.cursor_position;
    let rows: Vec<ListRow> = selector
        .visible_items()
        .enumerate()
        .map(|(i, item)| {
            let title_style = if i == cursor {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let mut spans = vec![Span::styled(item.title.clone(), title_style)];
            if !item.description.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", item.description),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListRow::new(Line::from(spans))
        })
        .collect();

    let title = if selector.filterable && !selector.filter_text.is_empty() {
        format!(" {} (filter: {}) ", selector.title, selector.filter_text)
    } else if selector.filterable {
        format!(" {} (type to filter) ", selector.title)
    } else {
        format!(" {} ", selector.title)
    };

    let list = List::new(rows)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], &mut selector.list_state);

    if selector.filterable {
        render_controls(
            frame,
            chunks[1],
            &[
                ("ENTER", Color::Green, "Select"),
                ("↑↓", Color::Cyan, "Navigate"),
                ("type", Color::Cyan, "Filter"),
                ("ESC", Color::Red, "Quit"),
            ],
        );
    } else {
        render_controls(
            frame,
            chunks[1],
            &[
                ("ENTER", Color::Green, "Select"),
                ("↑↓/jk", Color::Cyan, "Navigate"),
                ("q", Color::Red, "Quit"),
            ],
        );
    }
}

/// Shows the list until the user picks an item (`Some`) or quits (`None`).
pub(super) fn select(
    terminal: &mut Tui,
    title: &str,
    items: Vec<ListItem>,
    filterable: bool,
) -> Result<Option<Selection>> {
    let mut selector = SingleSelector::new(items, title, filterable);

    loop {
        terminal
            .draw(|frame| render(frame, &mut selector))
            .context("Failed to draw UI")?;

        if let Event::Key(key) = event::read().context("Failed to read event")? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match key.code {
                KeyCode::Up => selector.move_up(),
                KeyCode::Down => selector.move_down(),
                KeyCode::Enter => {
                    if selector.has_selection() {
                        return Ok(selector.into_selected());
                    }
                }
                KeyCode::Backspace => selector.remove_char(),
                KeyCode::Esc => return Ok(None),
                KeyCode::Char(c) => {
                    if selector.filterable {
                        selector.add_char(c);
                    } else if c == 'k' {
                        selector.move_up();
                    } else if c == 'j' {
                        selector.move_down();
                    } else if c == 'q' {
                        return Ok(None);
                    }
                }
                _ => {}
            }
        }
    }
}
