use std::mem;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
    Wrap,
};
use ratatui::Frame;
use tracing::{debug, warn};

use crate::actions::{self, Outcome, TableRefresh};
use crate::db::{fetch_students, Database, SortOrder, StudentQuery};
use crate::error::{ActionError, ActionResult};
use crate::models::Student;

use super::commands::Command;
use super::forms::{
    AmountPrompt, ConfirmAction, FilterPrompt, RangePrompt, SortPrompt, StudentField, StudentForm,
};
use super::helpers::{centered_rect, cursor_column, field_line};

/// Rows needed by the form block: three fields plus borders.
const FORM_HEIGHT: u16 = 5;
/// Command bar: two wrapped lines of shortcuts plus borders.
const COMMAND_BAR_HEIGHT: u16 = 4;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows skipped by PageUp/PageDown in the table.
const PAGE_STEP: isize = 10;

/// Signature shared by every command handler.
type Handler = fn(&mut App) -> Mode;

/// What currently owns the keyboard. Everything except `Normal` is a modal
/// dialog drawn on top of the main window.
enum Mode {
    Normal,
    Message(MessageDialog),
    Confirm(ConfirmAction),
    AgeRange(RangePrompt),
    Filter(FilterPrompt),
    Sort(SortPrompt),
    Increment(AmountPrompt),
}

/// Blocking notice shown after an action completes or fails.
struct MessageDialog {
    text: String,
    kind: StatusKind,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer and dialogs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }

    fn title(&self) -> &'static str {
        match self {
            StatusKind::Info => "Information",
            StatusKind::Error => "Error",
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    db: Database,
    students: Vec<Student>,
    selected: Option<usize>,
    form: StudentForm,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    /// Build the window state and load the initial table contents.
    pub fn new(db: Database) -> Result<Self> {
        let students = db.read(|conn| fetch_students(conn, &StudentQuery::All))?;
        Ok(Self {
            db,
            students,
            selected: None,
            form: StudentForm::default(),
            mode: Mode::Normal,
            status: None,
        })
    }

    /// Hand the database back for shutdown.
    pub fn into_database(self) -> Database {
        self.db
    }

    /// Process one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(key, &mut exit),
            Mode::Message(dialog) => self.handle_message(key, dialog),
            Mode::Confirm(action) => self.handle_confirm(key, action),
            Mode::AgeRange(prompt) => self.handle_age_range(key, prompt),
            Mode::Filter(prompt) => self.handle_filter(key, prompt),
            Mode::Sort(prompt) => self.handle_sort(key, prompt),
            Mode::Increment(prompt) => self.handle_increment(key, prompt),
        };

        exit
    }

    fn handle_normal_key(&mut self, key: KeyEvent, exit: &mut bool) -> Mode {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c')) {
                *exit = true;
                return Mode::Normal;
            }
            if let Some(command) = Command::from_key(&key) {
                return self.dispatch(command);
            }
            return Mode::Normal;
        }

        match key.code {
            KeyCode::Esc => *exit = true,
            KeyCode::Tab => self.form.next_field(),
            KeyCode::BackTab => self.form.previous_field(),
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-PAGE_STEP),
            KeyCode::PageDown => self.move_selection(PAGE_STEP),
            KeyCode::Home => self.select_index(0),
            KeyCode::End => self.select_index(self.students.len().saturating_sub(1)),
            KeyCode::Backspace => self.form.backspace(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::ALT) => {
                self.form.push_char(ch);
            }
            _ => {}
        }
        Mode::Normal
    }

    /// Run the handler registered for `command`.
    fn dispatch(&mut self, command: Command) -> Mode {
        debug!(?command, "dispatching command");
        self.clear_status();
        let handler = Self::handler(command);
        handler(self)
    }

    /// Lookup table from command to handler.
    fn handler(command: Command) -> Handler {
        match command {
            Command::Create => App::cmd_create,
            Command::Read => App::cmd_read,
            Command::Update => App::cmd_update,
            Command::Delete => App::cmd_delete,
            Command::ListAll => App::cmd_list_all,
            Command::SearchName => App::cmd_search_name,
            Command::SearchAgeRange => |_: &mut App| Mode::AgeRange(RangePrompt::default()),
            Command::FilterAge => |_: &mut App| Mode::Filter(FilterPrompt::default()),
            Command::Sort => |_: &mut App| Mode::Sort(SortPrompt::default()),
            Command::Count => App::cmd_count,
            Command::DeleteAll => |_: &mut App| Mode::Confirm(ConfirmAction::DeleteAll),
            Command::IncrementAges => |_: &mut App| Mode::Increment(AmountPrompt::default()),
        }
    }

    fn cmd_create(&mut self) -> Mode {
        let result = actions::create(&mut self.db, &self.form.name, &self.form.age);
        self.finish(result)
    }

    fn cmd_read(&mut self) -> Mode {
        let result = actions::read(&self.db, &self.form.id);
        self.finish(result)
    }

    fn cmd_update(&mut self) -> Mode {
        let result = actions::update(&mut self.db, &self.form.id, &self.form.name, &self.form.age);
        self.finish(result)
    }

    /// The id is parsed before asking, so a typo never reaches the dialog.
    fn cmd_delete(&mut self) -> Mode {
        match actions::parse_id(&self.form.id) {
            Ok(id) => Mode::Confirm(ConfirmAction::Delete { id }),
            Err(err) => self.show_error(err),
        }
    }

    fn cmd_list_all(&mut self) -> Mode {
        let result = actions::list_all(&self.db);
        self.finish(result)
    }

    fn cmd_search_name(&mut self) -> Mode {
        let result = actions::search_name(&self.db, &self.form.name);
        self.finish(result)
    }

    fn cmd_count(&mut self) -> Mode {
        let result = actions::count(&self.db);
        self.finish(result)
    }

    fn handle_message(&mut self, key: KeyEvent, dialog: MessageDialog) -> Mode {
        match key.code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => Mode::Normal,
            _ => Mode::Message(dialog),
        }
    }

    fn handle_confirm(&mut self, key: KeyEvent, action: ConfirmAction) -> Mode {
        match key.code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status(action.cancelled(), StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                let result = match action {
                    ConfirmAction::Delete { id } => actions::delete(&mut self.db, id),
                    ConfirmAction::DeleteAll => actions::delete_all(&mut self.db),
                };
                self.finish(result)
            }
            _ => Mode::Confirm(action),
        }
    }

    fn handle_age_range(&mut self, key: KeyEvent, mut prompt: RangePrompt) -> Mode {
        match key.code {
            KeyCode::Esc => {
                self.set_status("Age range search cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Enter => {
                let result = actions::search_age_range(&self.db, &prompt.min, &prompt.max);
                return self.finish(result);
            }
            KeyCode::Tab | KeyCode::BackTab => prompt.toggle_field(),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                prompt.push_char(ch)
            }
            _ => {}
        }
        Mode::AgeRange(prompt)
    }

    fn handle_filter(&mut self, key: KeyEvent, mut prompt: FilterPrompt) -> Mode {
        match key.code {
            KeyCode::Esc => {
                self.set_status("Filter cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Enter => {
                let result = actions::filter_age(&self.db, prompt.comparison, &prompt.age);
                return self.finish(result);
            }
            KeyCode::Right | KeyCode::Tab => prompt.cycle_comparison(true),
            KeyCode::Left | KeyCode::BackTab => prompt.cycle_comparison(false),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                prompt.push_char(ch)
            }
            _ => {}
        }
        Mode::Filter(prompt)
    }

    fn handle_sort(&mut self, key: KeyEvent, mut prompt: SortPrompt) -> Mode {
        match key.code {
            KeyCode::Esc => {
                self.set_status("Sort cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Enter => {
                let result = actions::sort(&self.db, prompt.choice());
                return self.finish(result);
            }
            KeyCode::Up => prompt.move_selection(-1),
            KeyCode::Down => prompt.move_selection(1),
            _ => {}
        }
        Mode::Sort(prompt)
    }

    fn handle_increment(&mut self, key: KeyEvent, mut prompt: AmountPrompt) -> Mode {
        match key.code {
            KeyCode::Esc => {
                self.set_status("Age update cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Enter => {
                let result = actions::increment_ages(&mut self.db, &prompt.amount);
                return self.finish(result);
            }
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                prompt.push_char(ch)
            }
            _ => {}
        }
        Mode::Increment(prompt)
    }

    /// Apply an action result to the window: refresh the table, update the
    /// form, and open the dialog that reports what happened.
    fn finish(&mut self, result: ActionResult<Outcome>) -> Mode {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => return self.show_error(err),
        };

        match outcome.table_refresh() {
            TableRefresh::Unchanged => {}
            TableRefresh::Reload => {
                if let Err(err) = self.reload_students() {
                    return self.show_error(err);
                }
            }
            TableRefresh::Replace(rows) => self.set_rows(rows.to_vec()),
        }

        if let Some(student) = outcome.form_values() {
            self.form.fill_from(student);
        } else if outcome.clears_form() {
            self.form.clear();
        }

        match outcome.message() {
            Some(text) => {
                self.set_status(text.clone(), StatusKind::Info);
                Mode::Message(MessageDialog {
                    text,
                    kind: StatusKind::Info,
                })
            }
            None => Mode::Normal,
        }
    }

    fn show_error(&mut self, err: ActionError) -> Mode {
        let text = err.to_string();
        warn!(error = %text, "action failed");
        self.set_status(text.clone(), StatusKind::Error);
        Mode::Message(MessageDialog {
            text,
            kind: StatusKind::Error,
        })
    }

    fn reload_students(&mut self) -> ActionResult<()> {
        if let Outcome::Listed(rows) = actions::list_all(&self.db)? {
            self.set_rows(rows);
        }
        Ok(())
    }

    fn set_rows(&mut self, rows: Vec<Student>) {
        self.students = rows;
        self.selected = None;
    }

    fn move_selection(&mut self, offset: isize) {
        if self.students.is_empty() {
            return;
        }
        let target = match self.selected {
            None => 0,
            Some(current) => {
                let last = self.students.len() as isize - 1;
                (current as isize + offset).clamp(0, last) as usize
            }
        };
        self.select_index(target);
    }

    /// Highlight a row and copy it into the form.
    fn select_index(&mut self, index: usize) {
        if let Some(student) = self.students.get(index) {
            self.form.fill_from(student);
            self.selected = Some(index);
        }
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(FORM_HEIGHT),
                Constraint::Min(3),
                Constraint::Length(COMMAND_BAR_HEIGHT),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_form(frame, chunks[0]);
        self.draw_table(frame, chunks[1]);
        self.draw_command_bar(frame, chunks[2]);
        self.draw_footer(frame, chunks[3]);

        match &self.mode {
            Mode::Normal => {}
            Mode::Message(dialog) => self.draw_message(frame, area, dialog),
            Mode::Confirm(action) => self.draw_confirm(frame, area, action),
            Mode::AgeRange(prompt) => self.draw_age_range(frame, area, prompt),
            Mode::Filter(prompt) => self.draw_filter(frame, area, prompt),
            Mode::Sort(prompt) => self.draw_sort(frame, area, prompt),
            Mode::Increment(prompt) => self.draw_increment(frame, area, prompt),
        }
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().title("Student").borders(Borders::ALL);
        let inner = block.inner(area);
        let lines: Vec<Line> = StudentField::ALL
            .iter()
            .map(|field| self.form.build_line(*field))
            .collect();
        frame.render_widget(Paragraph::new(lines).block(block), area);

        if matches!(self.mode, Mode::Normal) {
            let row = StudentField::ALL
                .iter()
                .position(|field| *field == self.form.active)
                .unwrap_or_default() as u16;
            let active = self.form.active;
            frame.set_cursor_position((
                cursor_column(inner, active.label(), self.form.value(active)),
                inner.y + row.min(inner.height.saturating_sub(1)),
            ));
        }
    }

    fn draw_table(&self, frame: &mut Frame, area: Rect) {
        let header = Row::new(["ID", "Name", "Age"]).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
        let rows = self.students.iter().map(|student| {
            Row::new([
                Cell::from(student.id.to_string()),
                Cell::from(student.name.clone()),
                Cell::from(student.age.to_string()),
            ])
        });
        let widths = [
            Constraint::Length(8),
            Constraint::Min(20),
            Constraint::Length(6),
        ];
        let title = format!("Students ({})", self.students.len());
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().title(title).borders(Borders::ALL))
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");

        let mut state = TableState::default().with_selected(self.selected);
        frame.render_stateful_widget(table, area, &mut state);

        if self.students.is_empty() && area.height > 3 {
            let message = Paragraph::new("No students to show. Ctrl-N creates one.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray));
            let inside = Rect {
                x: area.x + 1,
                y: area.y + 2,
                width: area.width.saturating_sub(2),
                height: 1,
            };
            frame.render_widget(message, inside);
        }
    }

    fn draw_command_bar(&self, frame: &mut Frame, area: Rect) {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let mut spans = Vec::with_capacity(Command::ALL.len() * 2);
        for command in Command::ALL {
            spans.push(Span::styled(
                format!("[^{}]", command.shortcut().to_ascii_uppercase()),
                key_style,
            ));
            spans.push(Span::raw(format!(" {}   ", command.label())));
        }
        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().title("Commands").borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let pairs: &[(&'static str, &'static str)] = match &self.mode {
            Mode::Normal => &[
                ("[Tab]", " Next field   "),
                ("[↑↓]", " Select row   "),
                ("[Esc/^Q]", " Quit"),
            ],
            Mode::Message(_) => &[("[Enter]", " Close")],
            Mode::Confirm(_) => &[("[y]", " Confirm   "), ("[n/Esc]", " Cancel")],
            Mode::Sort(_) => &[
                ("[↑↓]", " Choose   "),
                ("[Enter]", " Apply   "),
                ("[Esc]", " Cancel"),
            ],
            Mode::Filter(_) => &[
                ("[←→]", " Comparison   "),
                ("[Enter]", " Apply   "),
                ("[Esc]", " Cancel"),
            ],
            Mode::AgeRange(_) => &[
                ("[Tab]", " Switch bound   "),
                ("[Enter]", " Search   "),
                ("[Esc]", " Cancel"),
            ],
            Mode::Increment(_) => &[("[Enter]", " Apply   "), ("[Esc]", " Cancel")],
        };

        let spans: Vec<Span<'static>> = pairs
            .iter()
            .flat_map(|(key, text)| [Span::styled(*key, key_style), Span::raw(*text)])
            .collect();
        Line::from(spans)
    }

    /// Clear a centered popup, draw its frame, and return the inner area.
    fn popup(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        percent_x: u16,
        percent_y: u16,
    ) -> Rect {
        let popup_area = centered_rect(percent_x, percent_y, area);
        frame.render_widget(Clear, popup_area);
        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);
        inner
    }

    fn draw_message(&self, frame: &mut Frame, area: Rect, dialog: &MessageDialog) {
        let inner = self.popup(frame, area, dialog.kind.title(), 60, 30);
        let lines = vec![
            Line::from(Span::styled(dialog.text.clone(), dialog.kind.style())),
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter to close",
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            inner,
        );
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, action: &ConfirmAction) {
        let inner = self.popup(frame, area, "Confirm", 60, 30);
        let lines = vec![
            Line::from(action.question()),
            Line::from(""),
            Line::from(Span::styled(
                "y to confirm • n or Esc to cancel",
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            inner,
        );
    }

    fn draw_age_range(&self, frame: &mut Frame, area: Rect, prompt: &RangePrompt) {
        let inner = self.popup(frame, area, "Search by age range", 60, 30);
        frame.render_widget(Paragraph::new(prompt.lines()), inner);

        let (label, value, row) = if prompt.editing_max {
            ("Maximum age", &prompt.max, 1)
        } else {
            ("Minimum age", &prompt.min, 0)
        };
        frame.set_cursor_position((cursor_column(inner, label, value), inner.y + row));
    }

    fn draw_filter(&self, frame: &mut Frame, area: Rect, prompt: &FilterPrompt) {
        let inner = self.popup(frame, area, "Filter by age", 60, 30);
        frame.render_widget(Paragraph::new(prompt.lines()), inner);
        frame.set_cursor_position((cursor_column(inner, "Age", &prompt.age), inner.y + 1));
    }

    fn draw_sort(&self, frame: &mut Frame, area: Rect, prompt: &SortPrompt) {
        let inner = self.popup(frame, area, "Sort by", 50, 40);
        let items: Vec<ListItem> = SortOrder::CHOICES
            .iter()
            .map(|order| ListItem::new(order.label()))
            .collect();
        let list = List::new(items)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(prompt.selected));
        frame.render_stateful_widget(list, inner, &mut state);
    }

    fn draw_increment(&self, frame: &mut Frame, area: Rect, prompt: &AmountPrompt) {
        let inner = self.popup(frame, area, "Change every age by", 60, 30);
        let lines = vec![
            field_line("Amount", &prompt.amount, true, "<+/- number>"),
            Line::from(""),
            Line::from(Span::styled(
                "Negative amounts lower every age.",
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
        frame.set_cursor_position((cursor_column(inner, "Amount", &prompt.amount), inner.y));
    }
}
