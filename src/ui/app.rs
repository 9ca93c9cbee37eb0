use std::cmp::min;
use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Frame;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::{
    create_author, create_book, create_location, create_publisher, create_subject, delete_author,
    delete_book, delete_location, delete_publisher, delete_subject, fetch_authors, fetch_books,
    fetch_locations, fetch_publishers, fetch_subjects, find_author, find_book, find_location,
    find_publisher, find_subject, update_author, update_book, update_location, update_publisher,
    update_subject,
};
use crate::models::{Author, Book, EntityKind, Location, Publisher, Record, Subject};

use super::forms::{BookChoices, Choice, ConfirmDelete, IdPrompt, RecordForm, RecordInput};
use super::helpers::{centered_rect, key_hints, surface_error};
use super::screens::{ListNav, RecordList};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
const TAB_BAR_HEIGHT: u16 = 3;
/// Height allocation per book card: three text lines plus borders.
const BOOK_CARD_HEIGHT: u16 = 5;
/// Rows skipped by PageUp/PageDown.
const PAGE: isize = 5;

/// Fine-grained modes layered over the active tab.
enum Mode {
    Normal,
    Adding(RecordForm),
    Editing { id: i64, form: RecordForm },
    ConfirmDelete(ConfirmDelete),
    FindingById(IdPrompt),
    Searching(SearchState),
}

/// State for an active inline search on the current tab.
struct SearchState {
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
}

/// Central application state. Each tab is the controller for one table: it
/// owns the loaded rows and routes form input to that table's data-access
/// functions.
pub struct App {
    conn: Connection,
    tab: EntityKind,
    books: RecordList<Book>,
    authors: RecordList<Author>,
    publishers: RecordList<Publisher>,
    subjects: RecordList<Subject>,
    locations: RecordList<Location>,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    /// Load every table and start on the book list.
    pub fn load(conn: Connection) -> Result<Self> {
        let books = RecordList::new(fetch_books(&conn)?);
        let authors = RecordList::new(fetch_authors(&conn)?);
        let publishers = RecordList::new(fetch_publishers(&conn)?);
        let subjects = RecordList::new(fetch_subjects(&conn)?);
        let locations = RecordList::new(fetch_locations(&conn)?);

        info!(books = books.len(), "catalog loaded");
        Ok(Self {
            conn,
            tab: EntityKind::Book,
            books,
            authors,
            publishers,
            subjects,
            locations,
            mode: Mode::Normal,
            status: None,
        })
    }

    /// Process one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Adding(form) => self.handle_form(code, None, form)?,
            Mode::Editing { id, form } => self.handle_form(code, Some(id), form)?,
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm)?,
            Mode::FindingById(prompt) => self.handle_find_by_id(code, prompt)?,
            Mode::Searching(state) => self.handle_search(code, state),
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let label = self.tab.label().to_lowercase();
        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc => {
                if self.current_list_filtered() {
                    self.list_mut().set_filter(None);
                } else if self.tab != EntityKind::Book {
                    self.switch_tab(EntityKind::Book);
                }
            }
            KeyCode::Tab => self.cycle_tab(1),
            KeyCode::BackTab => self.cycle_tab(-1),
            KeyCode::Char(ch @ '1'..='5') => {
                let idx = ch as usize - '1' as usize;
                self.switch_tab(EntityKind::ALL[idx]);
            }
            KeyCode::Up => self.list_mut().move_selection(-1),
            KeyCode::Down => self.list_mut().move_selection(1),
            KeyCode::PageUp => self.list_mut().move_selection(-PAGE),
            KeyCode::PageDown => self.list_mut().move_selection(PAGE),
            KeyCode::Home => self.list_mut().select_first(),
            KeyCode::End => self.list_mut().select_last(),
            KeyCode::Char('+') | KeyCode::Char('a') => {
                self.clear_status();
                return Ok(Mode::Adding(self.blank_form(self.tab)));
            }
            KeyCode::Char('e') | KeyCode::Enter => match self.edit_form_for_current() {
                Some((id, form)) => {
                    self.clear_status();
                    return Ok(Mode::Editing { id, form });
                }
                None => self.set_status(format!("No {label} selected to edit."), StatusKind::Error),
            },
            KeyCode::Char('-') | KeyCode::Delete => match self.confirm_for_current() {
                Some(confirm) => {
                    self.clear_status();
                    return Ok(Mode::ConfirmDelete(confirm));
                }
                None => {
                    self.set_status(format!("No {label} selected to delete."), StatusKind::Error)
                }
            },
            KeyCode::Char('g') => {
                self.clear_status();
                return Ok(Mode::FindingById(IdPrompt::new(self.tab)));
            }
            KeyCode::Char('f') | KeyCode::Char('/') => {
                self.clear_status();
                let query = self.current_filter().unwrap_or_default();
                return Ok(Mode::Searching(SearchState { query }));
            }
            KeyCode::Char('r') => match self.reload_all() {
                Ok(()) => self.set_status("Catalog reloaded.", StatusKind::Info),
                Err(err) => self.report_error(&err),
            },
            _ => {}
        }
        Ok(Mode::Normal)
    }

    /// Keys for the add/edit form. `id` is `None` while adding.
    fn handle_form(&mut self, code: KeyCode, id: Option<i64>, mut form: RecordForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                let message = if id.is_some() {
                    "Edit cancelled."
                } else {
                    "Add cancelled."
                };
                self.set_status(message, StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Left => {
                form.cycle_choice(-1);
            }
            KeyCode::Right => {
                form.cycle_choice(1);
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_form(id, &form) {
                Ok(()) => keep_open = false,
                Err(err) => {
                    form.error = Some(surface_error(&err));
                    self.report_error(&err);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if !keep_open {
            return Ok(Mode::Normal);
        }
        Ok(match id {
            Some(id) => Mode::Editing { id, form },
            None => Mode::Adding(form),
        })
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&confirm) {
                    Ok(()) => Ok(Mode::Normal),
                    Err(err) => {
                        self.report_error(&err);
                        Ok(Mode::Normal)
                    }
                }
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    fn handle_find_by_id(&mut self, code: KeyCode, mut prompt: IdPrompt) -> Result<Mode> {
        match code {
            KeyCode::Esc => return Ok(Mode::Normal),
            KeyCode::Backspace => {
                prompt.input.pop();
                prompt.error = None;
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                prompt.input.push(ch);
                prompt.error = None;
            }
            KeyCode::Enter => {
                let id = match prompt.parse() {
                    Ok(id) => id,
                    Err(err) => {
                        let err = anyhow::Error::from(err);
                        prompt.error = Some(surface_error(&err));
                        self.report_error(&err);
                        return Ok(Mode::FindingById(prompt));
                    }
                };
                match self.find_by_id(prompt.kind, id) {
                    Ok(Some(form)) => {
                        self.clear_status();
                        return Ok(Mode::Editing { id, form });
                    }
                    Ok(None) => {
                        let message = format!("{} with ID {id} not found.", prompt.kind);
                        prompt.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                    }
                    Err(err) => {
                        prompt.error = Some(surface_error(&err));
                        self.report_error(&err);
                    }
                }
            }
            _ => {}
        }
        Ok(Mode::FindingById(prompt))
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Mode {
        match code {
            KeyCode::Esc => {
                self.list_mut().set_filter(None);
                return Mode::Normal;
            }
            KeyCode::Enter => return Mode::Normal,
            KeyCode::Up => {
                self.list_mut().move_selection(-1);
                return Mode::Searching(state);
            }
            KeyCode::Down => {
                self.list_mut().move_selection(1);
                return Mode::Searching(state);
            }
            KeyCode::PageUp => {
                self.list_mut().move_selection(-PAGE);
                return Mode::Searching(state);
            }
            KeyCode::PageDown => {
                self.list_mut().move_selection(PAGE);
                return Mode::Searching(state);
            }
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) if !ch.is_control() => state.query.push(ch),
            _ => {}
        }

        let filter = if state.query.trim().is_empty() {
            None
        } else {
            Some(state.query.clone())
        };
        self.list_mut().set_filter(filter);
        Mode::Searching(state)
    }

    /// Validate the form, then insert or update through the matching
    /// data-access function and refresh the affected lists.
    fn save_form(&mut self, id: Option<i64>, form: &RecordForm) -> Result<()> {
        let input = form.parse()?;
        let conn = &self.conn;
        let saved_id = match (id, input) {
            (None, RecordInput::Book(input)) => create_book(conn, &input)?.id,
            (None, RecordInput::Author(input)) => create_author(conn, &input)?.id,
            (None, RecordInput::Publisher(input)) => create_publisher(conn, &input)?.id,
            (None, RecordInput::Subject(input)) => create_subject(conn, &input)?.id,
            (None, RecordInput::Location(input)) => create_location(conn, &input)?.id,
            (Some(id), RecordInput::Book(input)) => {
                update_book(conn, id, &input)?;
                id
            }
            (Some(id), RecordInput::Author(input)) => {
                update_author(conn, id, &input)?;
                id
            }
            (Some(id), RecordInput::Publisher(input)) => {
                update_publisher(conn, id, &input)?;
                id
            }
            (Some(id), RecordInput::Subject(input)) => {
                update_subject(conn, id, &input)?;
                id
            }
            (Some(id), RecordInput::Location(input)) => {
                update_location(conn, id, &input)?;
                id
            }
        };

        self.reload(form.kind, Some(saved_id))?;
        if id.is_some() && form.kind != EntityKind::Book {
            // book rows embed the edited names
            self.reload(EntityKind::Book, None)?;
        }

        let verb = if id.is_some() { "updated" } else { "added" };
        info!(entity = %form.kind, id = saved_id, "{verb} record");
        self.set_status(format!("{} {saved_id} {verb}.", form.kind), StatusKind::Info);
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmDelete) -> Result<()> {
        let conn = &self.conn;
        match confirm.kind {
            EntityKind::Book => delete_book(conn, confirm.id)?,
            EntityKind::Author => delete_author(conn, confirm.id)?,
            EntityKind::Publisher => delete_publisher(conn, confirm.id)?,
            EntityKind::Subject => delete_subject(conn, confirm.id)?,
            EntityKind::Location => delete_location(conn, confirm.id)?,
        }
        self.reload(confirm.kind, None)?;

        info!(entity = %confirm.kind, id = confirm.id, "deleted record");
        self.set_status(
            format!("{} {} deleted.", confirm.kind, confirm.id),
            StatusKind::Info,
        );
        Ok(())
    }

    /// Look a row up by id. A hit is focused in its list and returned as a
    /// populated edit form.
    fn find_by_id(&mut self, kind: EntityKind, id: i64) -> Result<Option<RecordForm>> {
        let conn = &self.conn;
        let form = match kind {
            EntityKind::Book => {
                find_book(conn, id)?.map(|book| RecordForm::book(Some(&book), self.book_choices()))
            }
            EntityKind::Author => find_author(conn, id)?.map(|a| RecordForm::author(Some(&a))),
            EntityKind::Publisher => {
                find_publisher(conn, id)?.map(|p| RecordForm::publisher(Some(&p)))
            }
            EntityKind::Subject => find_subject(conn, id)?.map(|s| RecordForm::subject(Some(&s))),
            EntityKind::Location => {
                find_location(conn, id)?.map(|l| RecordForm::location(Some(&l)))
            }
        };

        if form.is_some() {
            self.reload(kind, Some(id))?;
        }
        Ok(form)
    }

    fn reload(&mut self, kind: EntityKind, focus_id: Option<i64>) -> Result<()> {
        match kind {
            EntityKind::Book => self.books.set_items(fetch_books(&self.conn)?, focus_id),
            EntityKind::Author => self.authors.set_items(fetch_authors(&self.conn)?, focus_id),
            EntityKind::Publisher => self
                .publishers
                .set_items(fetch_publishers(&self.conn)?, focus_id),
            EntityKind::Subject => self.subjects.set_items(fetch_subjects(&self.conn)?, focus_id),
            EntityKind::Location => self
                .locations
                .set_items(fetch_locations(&self.conn)?, focus_id),
        }
        Ok(())
    }

    fn reload_all(&mut self) -> Result<()> {
        for kind in EntityKind::ALL {
            self.reload(kind, None)?;
        }
        Ok(())
    }

    fn book_choices(&self) -> BookChoices {
        BookChoices {
            authors: Choice::from_records(&self.authors.items),
            subjects: Choice::from_records(&self.subjects.items),
            publishers: Choice::from_records(&self.publishers.items),
            locations: Choice::from_records(&self.locations.items),
        }
    }

    fn blank_form(&self, kind: EntityKind) -> RecordForm {
        match kind {
            EntityKind::Book => RecordForm::book(None, self.book_choices()),
            EntityKind::Author => RecordForm::author(None),
            EntityKind::Publisher => RecordForm::publisher(None),
            EntityKind::Subject => RecordForm::subject(None),
            EntityKind::Location => RecordForm::location(None),
        }
    }

    fn edit_form_for_current(&self) -> Option<(i64, RecordForm)> {
        match self.tab {
            EntityKind::Book => self
                .books
                .current()
                .map(|b| (b.id, RecordForm::book(Some(b), self.book_choices()))),
            EntityKind::Author => self
                .authors
                .current()
                .map(|a| (a.id, RecordForm::author(Some(a)))),
            EntityKind::Publisher => self
                .publishers
                .current()
                .map(|p| (p.id, RecordForm::publisher(Some(p)))),
            EntityKind::Subject => self
                .subjects
                .current()
                .map(|s| (s.id, RecordForm::subject(Some(s)))),
            EntityKind::Location => self
                .locations
                .current()
                .map(|l| (l.id, RecordForm::location(Some(l)))),
        }
    }

    fn confirm_for_current(&self) -> Option<ConfirmDelete> {
        match self.tab {
            EntityKind::Book => self.books.current().map(ConfirmDelete::from_record),
            EntityKind::Author => self.authors.current().map(ConfirmDelete::from_record),
            EntityKind::Publisher => self.publishers.current().map(ConfirmDelete::from_record),
            EntityKind::Subject => self.subjects.current().map(ConfirmDelete::from_record),
            EntityKind::Location => self.locations.current().map(ConfirmDelete::from_record),
        }
    }

    fn current_filter(&self) -> Option<String> {
        match self.tab {
            EntityKind::Book => self.books.filter.clone(),
            EntityKind::Author => self.authors.filter.clone(),
            EntityKind::Publisher => self.publishers.filter.clone(),
            EntityKind::Subject => self.subjects.filter.clone(),
            EntityKind::Location => self.locations.filter.clone(),
        }
    }

    fn current_list_filtered(&self) -> bool {
        self.current_filter()
            .map(|q| !q.trim().is_empty())
            .unwrap_or(false)
    }

    fn list_mut(&mut self) -> &mut dyn ListNav {
        match self.tab {
            EntityKind::Book => &mut self.books,
            EntityKind::Author => &mut self.authors,
            EntityKind::Publisher => &mut self.publishers,
            EntityKind::Subject => &mut self.subjects,
            EntityKind::Location => &mut self.locations,
        }
    }

    fn switch_tab(&mut self, tab: EntityKind) {
        if self.tab != tab {
            self.clear_status();
            self.tab = tab;
        }
    }

    fn cycle_tab(&mut self, offset: isize) {
        let len = EntityKind::ALL.len() as isize;
        let idx = (self.tab.index() as isize + offset).rem_euclid(len) as usize;
        self.switch_tab(EntityKind::ALL[idx]);
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

    /// Log the failure and show its innermost cause in the footer.
    fn report_error(&mut self, err: &anyhow::Error) {
        let message = surface_error(err);
        warn!(error = %format!("{err:#}"), "operation failed");
        self.set_status(message, StatusKind::Error);
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(TAB_BAR_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_tabs(frame, chunks[0]);
        match self.tab {
            EntityKind::Book => self.draw_books(frame, chunks[1]),
            EntityKind::Author => self.draw_record_list(frame, chunks[1], &self.authors),
            EntityKind::Publisher => self.draw_record_list(frame, chunks[1], &self.publishers),
            EntityKind::Subject => self.draw_record_list(frame, chunks[1], &self.subjects),
            EntityKind::Location => self.draw_record_list(frame, chunks[1], &self.locations),
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::Adding(form) => {
                let title = format!("Add {}", form.kind);
                self.draw_form(frame, area, &title, form);
            }
            Mode::Editing { id, form } => {
                let title = format!("Edit {} {id}", form.kind);
                self.draw_form(frame, area, &title, form);
            }
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::FindingById(prompt) => self.draw_id_prompt(frame, area, prompt),
            Mode::Searching(state) => self.draw_search_bar(frame, area, state),
            Mode::Normal => {}
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<String> = EntityKind::ALL
            .iter()
            .map(|kind| {
                let count = match kind {
                    EntityKind::Book => self.books.len(),
                    EntityKind::Author => self.authors.len(),
                    EntityKind::Publisher => self.publishers.len(),
                    EntityKind::Subject => self.subjects.len(),
                    EntityKind::Location => self.locations.len(),
                };
                format!("{} {} ({count})", kind.index() + 1, kind.plural())
            })
            .collect();

        let tabs = Tabs::new(titles)
            .select(self.tab.index())
            .block(Block::default().borders(Borders::ALL).title("Verbax"))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn empty_message(&self, plural: &str, filtered: bool) -> String {
        if filtered {
            format!("No {} match the current search.", plural.to_lowercase())
        } else {
            format!("No {} yet. Press '+' to add one.", plural.to_lowercase())
        }
    }

    fn draw_books(&self, frame: &mut Frame, area: Rect) {
        let books: Vec<&Book> = self.books.visible_items().collect();
        if books.is_empty() {
            let message = Paragraph::new(self.empty_message("books", self.books.has_filter()))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Books"));
            frame.render_widget(message, area);
            return;
        }

        self.render_book_cards(frame, area, &books, self.books.selected);
    }

    fn render_book_cards(&self, frame: &mut Frame, area: Rect, books: &[&Book], selected: usize) {
        if books.is_empty() || area.height == 0 {
            return;
        }

        let card_height = BOOK_CARD_HEIGHT as usize;
        let capacity = ((area.height as usize) / card_height).max(1);
        let len = books.len();
        let mut start = if selected >= capacity {
            selected + 1 - capacity
        } else {
            0
        };
        if start + capacity > len {
            start = len.saturating_sub(capacity);
        }
        let end = min(start + capacity, len);
        let visible_len = end.saturating_sub(start);
        if visible_len == 0 {
            return;
        }

        let constraints: Vec<Constraint> = (0..visible_len)
            .map(|_| Constraint::Length(BOOK_CARD_HEIGHT))
            .collect();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (idx, chunk) in rows.iter().enumerate() {
            let book_index = start + idx;
            if chunk.height == 0 || book_index >= len {
                continue;
            }

            let book = books[book_index];
            let is_selected = book_index == selected;
            let mut block = Block::default()
                .borders(Borders::ALL)
                .title(format!("#{}", book.id));
            let mut paragraph_style = Style::default();
            if is_selected {
                block = block.style(Style::default().fg(Color::Yellow));
                paragraph_style = Style::default().fg(Color::Yellow);
            }

            let title = if is_selected {
                format!("▶ {}", book.title)
            } else {
                book.title.clone()
            };
            let lines = vec![
                Line::from(Span::styled(
                    title,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(book.byline(), Style::default().fg(Color::Gray))),
                Line::from(Span::styled(
                    book.shelving(),
                    Style::default().fg(Color::Cyan),
                )),
            ];

            let paragraph = Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: true })
                .style(paragraph_style);
            frame.render_widget(paragraph, *chunk);
        }
    }

    fn draw_record_list<T: Record>(&self, frame: &mut Frame, area: Rect, list: &RecordList<T>) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(T::KIND.plural());

        if list.visible.is_empty() {
            let message = Paragraph::new(self.empty_message(T::KIND.plural(), list.has_filter()))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        let items: Vec<ListItem> = list
            .visible_items()
            .map(|record| ListItem::new(format!("#{:<5} {}", record.id(), record.detail())))
            .collect();

        let widget = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");

        let mut state = ListState::default();
        state.select(Some(list.selected));
        frame.render_stateful_widget(widget, area, &mut state);
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
        match &self.mode {
            Mode::Adding(form) | Mode::Editing { form, .. } if form.is_choice_active() => {
                key_hints(&[
                    ("←→", "Choose"),
                    ("Tab", "Next Field"),
                    ("Enter", "Save"),
                    ("Esc", "Cancel"),
                ])
            }
            Mode::Adding(_) | Mode::Editing { .. } => key_hints(&[
                ("Tab", "Next Field"),
                ("Shift+Tab", "Previous"),
                ("Enter", "Save"),
                ("Esc", "Cancel"),
            ]),
            Mode::ConfirmDelete(_) => key_hints(&[("y", "Delete"), ("n/Esc", "Keep")]),
            Mode::FindingById(_) => key_hints(&[("Enter", "Find"), ("Esc", "Cancel")]),
            Mode::Searching(_) => key_hints(&[
                ("↑↓", "Select"),
                ("Enter", "Keep Filter"),
                ("Esc", "Clear"),
            ]),
            Mode::Normal => key_hints(&[
                ("1-5", "Tabs"),
                ("↑↓", "Select"),
                ("+", "Add"),
                ("e", "Edit"),
                ("-", "Delete"),
                ("g", "Find ID"),
                ("f", "Search"),
                ("r", "Reload"),
                ("q", "Quit"),
            ]),
        }
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &RecordForm) {
        let percent_y = if form.kind == EntityKind::Book { 60 } else { 40 };
        let popup_area = centered_rect(70, percent_y, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = (0..form.fields.len())
            .map(|idx| form.build_line(idx))
            .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        if let Some(offset) = form.cursor_offset() {
            frame.set_cursor_position((inner.x + offset, inner.y + form.active as u16));
        }
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(format!("Delete {}", confirm.kind))
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![Line::from(format!(
            "Delete {} {} ({}) permanently?",
            confirm.kind.label().to_lowercase(),
            confirm.id,
            confirm.summary
        ))];
        if confirm.kind != EntityKind::Book {
            lines.push(Line::from("Rows still used by a book cannot be deleted."));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press Y to confirm or N / Esc to cancel.",
            Style::default().fg(Color::Gray),
        )));

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_id_prompt(&self, frame: &mut Frame, area: Rect, prompt: &IdPrompt) {
        let popup_area = centered_rect(50, 25, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(format!("Find {} by ID", prompt.kind))
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![Line::from(format!("ID: {}", prompt.input)), Line::from("")];
        if let Some(error) = &prompt.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        frame.render_widget(Paragraph::new(lines), inner);

        let cursor_x = inner.x + "ID: ".len() as u16 + prompt.input.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Search {}", self.tab.plural()));
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Search: ".len() as u16 + state.query.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use crate::db::{count_books_referencing, open_in_memory};
    use crate::models::{AuthorInput, BookInput, LocationInput, PublisherInput, SubjectInput};

    fn empty_app() -> App {
        App::load(open_in_memory().unwrap()).unwrap()
    }

    /// App with one of each reference row and a single book.
    fn seeded_app() -> App {
        let conn = open_in_memory().unwrap();
        let author = create_author(
            &conn,
            &AuthorInput {
                name: "José Saramago".into(),
                nationality: "Portuguese".into(),
            },
        )
        .unwrap();
        let subject = create_subject(
            &conn,
            &SubjectInput {
                name: "Novel".into(),
            },
        )
        .unwrap();
        let publisher = create_publisher(
            &conn,
            &PublisherInput {
                name: "Caminho".into(),
                city: "Lisboa".into(),
            },
        )
        .unwrap();
        let location = create_location(
            &conn,
            &LocationInput {
                sector: "B".into(),
                shelf: "2".into(),
            },
        )
        .unwrap();
        create_book(
            &conn,
            &BookInput {
                title: "Ensaio sobre a Cegueira".into(),
                publication_year: 1995,
                isbn: "972-21-1021-9".into(),
                author_id: author.id,
                subject_id: subject.id,
                publisher_id: publisher.id,
                location_id: location.id,
            },
        )
        .unwrap();
        App::load(conn).unwrap()
    }

    fn press(app: &mut App, keys: &[KeyCode]) {
        for key in keys {
            app.handle_key(*key).unwrap();
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    fn status(app: &App) -> (String, StatusKind) {
        let status = app.status.as_ref().expect("status should be set");
        (status.text.clone(), status.kind)
    }

    #[test]
    fn adds_an_author_through_the_form() {
        let mut app = empty_app();
        press(&mut app, &[KeyCode::Char('2'), KeyCode::Char('+')]);
        type_text(&mut app, "Clarice Lispector");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "Brazilian");
        press(&mut app, &[KeyCode::Enter]);

        assert!(matches!(app.mode, Mode::Normal));
        let authors = fetch_authors(&app.conn).unwrap();
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].nationality, "Brazilian");
        assert_eq!(app.authors.current_id(), Some(authors[0].id));
        assert_eq!(status(&app).1, StatusKind::Info);
    }

    #[test]
    fn empty_required_field_keeps_form_open() {
        let mut app = empty_app();
        press(&mut app, &[KeyCode::Char('4'), KeyCode::Char('+'), KeyCode::Enter]);

        match &app.mode {
            Mode::Adding(form) => assert_eq!(form.error.as_deref(), Some("Name is required.")),
            _ => panic!("form should stay open"),
        }
        assert_eq!(status(&app), ("Name is required.".into(), StatusKind::Error));
        assert!(fetch_subjects(&app.conn).unwrap().is_empty());
    }

    #[test]
    fn creates_a_book_with_pickers() {
        let mut app = seeded_app();
        press(&mut app, &[KeyCode::Char('+')]);
        type_text(&mut app, "Memorial do Convento");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "1982");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "972-21-0031-0");
        for _ in 0..4 {
            press(&mut app, &[KeyCode::Tab, KeyCode::Right]);
        }
        press(&mut app, &[KeyCode::Enter]);

        assert!(matches!(app.mode, Mode::Normal), "{:?}", app.status.as_ref().map(|s| &s.text));
        let books = fetch_books(&app.conn).unwrap();
        assert_eq!(books.len(), 2);
        let created = app.books.current().unwrap();
        assert_eq!(created.title, "Memorial do Convento");
        assert_eq!(created.author.name, "José Saramago");
    }

    #[test]
    fn non_numeric_year_is_reported() {
        let mut app = seeded_app();
        press(&mut app, &[KeyCode::Char('+')]);
        type_text(&mut app, "Levantado do Chão");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "mcmlxxx");
        press(&mut app, &[KeyCode::Enter]);

        assert_eq!(
            status(&app),
            (
                "Publication year must be an integer.".into(),
                StatusKind::Error
            )
        );
        assert_eq!(fetch_books(&app.conn).unwrap().len(), 1);
    }

    #[test]
    fn editing_an_author_refreshes_book_rows() {
        let mut app = seeded_app();
        press(&mut app, &[KeyCode::Char('2'), KeyCode::Char('e')]);
        for _ in 0.."José Saramago".chars().count() {
            press(&mut app, &[KeyCode::Backspace]);
        }
        type_text(&mut app, "J. Saramago");
        press(&mut app, &[KeyCode::Enter]);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.authors.current().unwrap().name, "J. Saramago");
        assert_eq!(app.books.items[0].author.name, "J. Saramago");
    }

    #[test]
    fn deleting_a_referenced_author_is_refused() {
        let mut app = seeded_app();
        press(&mut app, &[KeyCode::Char('2'), KeyCode::Char('-')]);
        assert!(matches!(app.mode, Mode::ConfirmDelete(_)));
        press(&mut app, &[KeyCode::Char('y')]);

        let (text, kind) = status(&app);
        assert_eq!(kind, StatusKind::Error);
        assert!(text.contains("still used by 1 book(s)"), "{text}");
        assert_eq!(app.authors.len(), 1);
    }

    #[test]
    fn deleting_a_book_then_its_author() {
        let mut app = seeded_app();
        press(&mut app, &[KeyCode::Char('-'), KeyCode::Char('y')]);
        assert_eq!(app.books.len(), 0);
        assert!(fetch_books(&app.conn).unwrap().is_empty());

        let author_id = app.authors.items[0].id;
        assert_eq!(
            count_books_referencing(&app.conn, EntityKind::Author, author_id).unwrap(),
            0
        );
        press(&mut app, &[KeyCode::Char('2'), KeyCode::Char('-'), KeyCode::Char('y')]);
        assert_eq!(app.authors.len(), 0);
        assert!(find_author(&app.conn, author_id).unwrap().is_none());
    }

    #[test]
    fn cancelled_delete_keeps_the_row() {
        let mut app = seeded_app();
        press(&mut app, &[KeyCode::Char('-'), KeyCode::Char('n')]);
        assert_eq!(app.books.len(), 1);
        assert_eq!(status(&app), ("Deletion cancelled.".into(), StatusKind::Info));
    }

    #[test]
    fn find_by_id_opens_the_edit_form() {
        let mut app = seeded_app();
        let id = app.books.items[0].id;
        press(&mut app, &[KeyCode::Char('f')]);
        type_text(&mut app, "zzz");
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.books.current_id(), None);

        press(&mut app, &[KeyCode::Char('g')]);
        type_text(&mut app, &id.to_string());
        press(&mut app, &[KeyCode::Enter]);

        match &app.mode {
            Mode::Editing { id: editing, form } => {
                assert_eq!(*editing, id);
                assert_eq!(form.kind, EntityKind::Book);
            }
            _ => panic!("expected edit form"),
        }
        assert_eq!(app.books.current_id(), Some(id));
        assert!(app.books.filter.is_none());
    }

    #[test]
    fn editing_a_book_moves_it_to_another_author() {
        let mut app = seeded_app();
        let agualusa = create_author(
            &app.conn,
            &AuthorInput {
                name: "José Eduardo Agualusa".into(),
                nationality: "Angolan".into(),
            },
        )
        .unwrap();
        press(&mut app, &[KeyCode::Char('r')]);

        press(&mut app, &[KeyCode::Char('e')]);
        press(&mut app, &[KeyCode::Tab, KeyCode::Tab, KeyCode::Tab]);
        match &app.mode {
            Mode::Editing { form, .. } => assert!(form.is_choice_active()),
            _ => panic!("expected edit form"),
        }
        press(&mut app, &[KeyCode::Left, KeyCode::Enter]);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.books.items[0].author, agualusa);
        let stored = find_book(&app.conn, app.books.items[0].id).unwrap().unwrap();
        assert_eq!(stored.author.id, agualusa.id);
        assert_eq!(stored.title, "Ensaio sobre a Cegueira");
    }

    #[test]
    fn find_by_id_reports_bad_and_missing_ids() {
        let mut app = seeded_app();
        press(&mut app, &[KeyCode::Char('3'), KeyCode::Char('g')]);
        type_text(&mut app, "abc");
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(
            status(&app),
            ("ID must be an integer.".into(), StatusKind::Error)
        );

        for _ in 0..3 {
            press(&mut app, &[KeyCode::Backspace]);
        }
        type_text(&mut app, "99");
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(
            status(&app),
            ("Publisher with ID 99 not found.".into(), StatusKind::Error)
        );
        assert!(matches!(app.mode, Mode::FindingById(_)));
    }

    #[test]
    fn search_filters_and_escape_clears() {
        let mut app = seeded_app();
        press(&mut app, &[KeyCode::Char('f')]);
        type_text(&mut app, "zzz");
        assert_eq!(app.books.visible_items().count(), 0);

        press(&mut app, &[KeyCode::Esc]);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.books.visible_items().count(), 1);

        press(&mut app, &[KeyCode::Char('f')]);
        type_text(&mut app, "cegueira");
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.books.visible_items().count(), 1);
        assert!(app.books.has_filter());
    }

    #[test]
    fn tabs_cycle_and_escape_returns_to_books() {
        let mut app = empty_app();
        press(&mut app, &[KeyCode::BackTab]);
        assert_eq!(app.tab, EntityKind::Location);
        press(&mut app, &[KeyCode::Tab]);
        assert_eq!(app.tab, EntityKind::Book);
        press(&mut app, &[KeyCode::Char('3'), KeyCode::Esc]);
        assert_eq!(app.tab, EntityKind::Book);
    }

    #[test]
    fn edit_without_selection_reports_error() {
        let mut app = empty_app();
        press(&mut app, &[KeyCode::Char('e')]);
        assert_eq!(
            status(&app),
            ("No book selected to edit.".into(), StatusKind::Error)
        );
    }

    #[test]
    fn quit_key_exits() {
        let mut app = empty_app();
        assert!(!app.handle_key(KeyCode::Down).unwrap());
        assert!(app.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn renders_every_mode_without_panicking() {
        let mut app = seeded_app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let sequences: [&[KeyCode]; 5] = [
            &[],
            &[KeyCode::Char('+')],
            &[KeyCode::Esc, KeyCode::Char('2'), KeyCode::Char('-')],
            &[KeyCode::Esc, KeyCode::Char('g')],
            &[KeyCode::Esc, KeyCode::Char('f')],
        ];
        for keys in sequences {
            press(&mut app, keys);
            terminal.draw(|frame| app.draw(frame)).unwrap();
        }
    }
}
