use anyhow::Result;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::error::CatalogError;
use crate::models::{
    Author, AuthorInput, Book, BookInput, EntityKind, Location, LocationInput, Publisher,
    PublisherInput, Record, Subject, SubjectInput,
};

/// One selectable row in a picker field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Choice {
    pub(crate) id: i64,
    pub(crate) label: String,
}

impl Choice {
    pub(crate) fn from_records<T: Record>(records: &[T]) -> Vec<Choice> {
        records
            .iter()
            .map(|record| Choice {
                id: record.id(),
                label: record.to_string(),
            })
            .collect()
    }
}

/// Picker contents for the book form, taken from the current lists.
#[derive(Debug, Clone, Default)]
pub(crate) struct BookChoices {
    pub(crate) authors: Vec<Choice>,
    pub(crate) subjects: Vec<Choice>,
    pub(crate) publishers: Vec<Choice>,
    pub(crate) locations: Vec<Choice>,
}

#[derive(Debug, Clone)]
pub(crate) enum FieldInput {
    Text(String),
    Number(String),
    Choice {
        options: Vec<Choice>,
        selected: Option<usize>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct FormField {
    pub(crate) label: &'static str,
    pub(crate) input: FieldInput,
}

impl FormField {
    fn text(label: &'static str, value: &str) -> Self {
        Self {
            label,
            input: FieldInput::Text(value.to_string()),
        }
    }

    fn number(label: &'static str, value: Option<i32>) -> Self {
        Self {
            label,
            input: FieldInput::Number(value.map(|v| v.to_string()).unwrap_or_default()),
        }
    }

    fn choice(label: &'static str, options: Vec<Choice>, current: Option<i64>) -> Self {
        let selected = current.and_then(|id| options.iter().position(|option| option.id == id));
        Self {
            label,
            input: FieldInput::Choice { options, selected },
        }
    }

    /// Text shown after the label; empty when nothing has been entered.
    fn display_value(&self) -> String {
        match &self.input {
            FieldInput::Text(value) | FieldInput::Number(value) => value.clone(),
            FieldInput::Choice { options, selected } => selected
                .and_then(|idx| options.get(idx))
                .map(|choice| format!("◀ {} ▶", choice.label))
                .unwrap_or_default(),
        }
    }

    fn placeholder(&self) -> &'static str {
        match &self.input {
            FieldInput::Choice { options, .. } if options.is_empty() => "<none available>",
            FieldInput::Choice { .. } => "<←/→ to choose>",
            _ => "<required>",
        }
    }
}

/// Validated values ready for the data-access layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecordInput {
    Book(BookInput),
    Author(AuthorInput),
    Publisher(PublisherInput),
    Subject(SubjectInput),
    Location(LocationInput),
}

/// Form state shared by every entity. Field order is fixed per entity and
/// `parse` reads fields back by position.
#[derive(Debug, Clone)]
pub(crate) struct RecordForm {
    pub(crate) kind: EntityKind,
    pub(crate) fields: Vec<FormField>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
}

impl RecordForm {
    fn new(kind: EntityKind, fields: Vec<FormField>) -> Self {
        Self {
            kind,
            fields,
            active: 0,
            error: None,
        }
    }

    pub(crate) fn author(existing: Option<&Author>) -> Self {
        Self::new(
            EntityKind::Author,
            vec![
                FormField::text("Name", existing.map_or("", |a| a.name.as_str())),
                FormField::text("Nationality", existing.map_or("", |a| a.nationality.as_str())),
            ],
        )
    }

    pub(crate) fn publisher(existing: Option<&Publisher>) -> Self {
        Self::new(
            EntityKind::Publisher,
            vec![
                FormField::text("Name", existing.map_or("", |p| p.name.as_str())),
                FormField::text("City", existing.map_or("", |p| p.city.as_str())),
            ],
        )
    }

    pub(crate) fn subject(existing: Option<&Subject>) -> Self {
        Self::new(
            EntityKind::Subject,
            vec![FormField::text("Name", existing.map_or("", |s| s.name.as_str()))],
        )
    }

    pub(crate) fn location(existing: Option<&Location>) -> Self {
        Self::new(
            EntityKind::Location,
            vec![
                FormField::text("Sector", existing.map_or("", |l| l.sector.as_str())),
                FormField::text("Shelf", existing.map_or("", |l| l.shelf.as_str())),
            ],
        )
    }

    pub(crate) fn book(existing: Option<&Book>, choices: BookChoices) -> Self {
        Self::new(
            EntityKind::Book,
            vec![
                FormField::text("Title", existing.map_or("", |b| b.title.as_str())),
                FormField::number("Publication year", existing.map(|b| b.publication_year)),
                FormField::text("ISBN", existing.map_or("", |b| b.isbn.as_str())),
                FormField::choice("Author", choices.authors, existing.map(|b| b.author.id)),
                FormField::choice("Subject", choices.subjects, existing.map(|b| b.subject.id)),
                FormField::choice(
                    "Publisher",
                    choices.publishers,
                    existing.map(|b| b.publisher.id),
                ),
                FormField::choice(
                    "Location",
                    choices.locations,
                    existing.map(|b| b.location.id),
                ),
            ],
        )
    }

    pub(crate) fn next_field(&mut self) {
        self.active = (self.active + 1) % self.fields.len();
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = (self.active + self.fields.len() - 1) % self.fields.len();
    }

    /// Append a character to the active text or number field. Pickers ignore
    /// typing.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match &mut self.fields[self.active].input {
            FieldInput::Text(value) | FieldInput::Number(value) => {
                value.push(ch);
                true
            }
            FieldInput::Choice { .. } => false,
        }
    }

    pub(crate) fn backspace(&mut self) {
        match &mut self.fields[self.active].input {
            FieldInput::Text(value) | FieldInput::Number(value) => {
                value.pop();
            }
            FieldInput::Choice { selected, .. } => *selected = None,
        }
    }

    /// Move the active picker by `offset`, wrapping at both ends. Returns
    /// `false` when the active field is not a picker or has no options.
    pub(crate) fn cycle_choice(&mut self, offset: isize) -> bool {
        match &mut self.fields[self.active].input {
            FieldInput::Choice { options, selected } if !options.is_empty() => {
                let len = options.len() as isize;
                let next = match *selected {
                    Some(current) => (current as isize + offset).rem_euclid(len),
                    None if offset < 0 => len - 1,
                    None => 0,
                };
                *selected = Some(next as usize);
                true
            }
            _ => false,
        }
    }

    fn text(&self, idx: usize) -> Result<String, CatalogError> {
        let field = &self.fields[idx];
        let raw = match &field.input {
            FieldInput::Text(value) | FieldInput::Number(value) => value.trim(),
            FieldInput::Choice { .. } => "",
        };
        if raw.is_empty() {
            return Err(CatalogError::MissingField { field: field.label });
        }
        Ok(raw.to_string())
    }

    fn number(&self, idx: usize) -> Result<i32, CatalogError> {
        let raw = self.text(idx)?;
        raw.parse::<i32>().map_err(|_| CatalogError::InvalidNumber {
            field: self.fields[idx].label,
        })
    }

    fn choice(&self, idx: usize) -> Result<i64, CatalogError> {
        let field = &self.fields[idx];
        match &field.input {
            FieldInput::Choice { options, selected } => selected
                .and_then(|i| options.get(i))
                .map(|choice| choice.id)
                .ok_or(CatalogError::MissingField { field: field.label }),
            _ => Err(CatalogError::MissingField { field: field.label }),
        }
    }

    /// Validate every field in display order and return typed input. The
    /// first failing field wins.
    pub(crate) fn parse(&self) -> Result<RecordInput> {
        let input = match self.kind {
            EntityKind::Author => RecordInput::Author(AuthorInput {
                name: self.text(0)?,
                nationality: self.text(1)?,
            }),
            EntityKind::Publisher => RecordInput::Publisher(PublisherInput {
                name: self.text(0)?,
                city: self.text(1)?,
            }),
            EntityKind::Subject => RecordInput::Subject(SubjectInput { name: self.text(0)? }),
            EntityKind::Location => RecordInput::Location(LocationInput {
                sector: self.text(0)?,
                shelf: self.text(1)?,
            }),
            EntityKind::Book => RecordInput::Book(BookInput {
                title: self.text(0)?,
                publication_year: self.number(1)?,
                isbn: self.text(2)?,
                author_id: self.choice(3)?,
                subject_id: self.choice(4)?,
                publisher_id: self.choice(5)?,
                location_id: self.choice(6)?,
            }),
        };
        Ok(input)
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, idx: usize) -> Line<'static> {
        let field = &self.fields[idx];
        let is_active = idx == self.active;
        let value = field.display_value();

        let display = if value.is_empty() {
            field.placeholder().to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label)),
            Span::styled(display, style),
        ])
    }

    /// Cursor column offset within the active line, `None` for pickers.
    pub(crate) fn cursor_offset(&self) -> Option<u16> {
        let field = &self.fields[self.active];
        match &field.input {
            FieldInput::Text(value) | FieldInput::Number(value) => {
                Some((field.label.chars().count() + 2 + value.chars().count()) as u16)
            }
            FieldInput::Choice { .. } => None,
        }
    }

    pub(crate) fn is_choice_active(&self) -> bool {
        matches!(self.fields[self.active].input, FieldInput::Choice { .. })
    }
}

/// State for confirming a permanent delete.
#[derive(Debug, Clone)]
pub(crate) struct ConfirmDelete {
    pub(crate) kind: EntityKind,
    pub(crate) id: i64,
    pub(crate) summary: String,
}

impl ConfirmDelete {
    pub(crate) fn from_record<T: Record>(record: &T) -> Self {
        Self {
            kind: T::KIND,
            id: record.id(),
            summary: record.detail(),
        }
    }
}

/// The "find by id" prompt.
#[derive(Debug, Clone)]
pub(crate) struct IdPrompt {
    pub(crate) kind: EntityKind,
    pub(crate) input: String,
    pub(crate) error: Option<String>,
}

impl IdPrompt {
    pub(crate) fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            input: String::new(),
            error: None,
        }
    }

    pub(crate) fn parse(&self) -> Result<i64, CatalogError> {
        let raw = self.input.trim();
        if raw.is_empty() {
            return Err(CatalogError::MissingField { field: "ID" });
        }
        raw.parse::<i64>().map_err(|_| CatalogError::InvalidId)
    }
}
