use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::{macros::format_description, Date, OffsetDateTime, Time, UtcOffset};
use utoipa::ToSchema;

use super::error::Violations;

/// Identifier assigned to a book by the catalog, starting at 1.
pub type BookId = u64;

pub const TITLE_MAX_LEN: usize = 200;
pub const AUTHOR_MAX_LEN: usize = 100;
pub const ISBN_MAX_LEN: usize = 13;

const TITLE_REQUIRED: &str = "Title is required";
const TITLE_TOO_LONG: &str = "Title must be 200 characters or less";
const AUTHOR_REQUIRED: &str = "Author is required";
const AUTHOR_TOO_LONG: &str = "Author must be 100 characters or less";
const ISBN_REQUIRED: &str = "ISBN is required";
const ISBN_TOO_LONG: &str = "ISBN must be 13 characters or less";
const DATE_REQUIRED: &str = "Published date is required";
const DATE_INVALID: &str = "Published date must be a valid date";
const PAGES_REQUIRED: &str = "Pages is required";
const PAGES_INVALID: &str = "Pages must be a positive integer";

/// A book as stored by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Sequential identifier, never reused
    #[schema(value_type = u64)]
    pub id: BookId,
    pub title: String,
    pub author: String,
    /// Unique across the catalog
    pub isbn: String,
    /// Publication date exactly as submitted
    pub published_date: String,
    pub pages: u32,
    #[serde(serialize_with = "timestamp::serialize")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(serialize_with = "timestamp::serialize")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl Book {
    /// Build a freshly created record; both timestamps share the same instant.
    pub fn new(id: BookId, fields: BookFields, now: OffsetDateTime) -> Self {
        Self {
            id,
            title: fields.title,
            author: fields.author,
            isbn: fields.isbn,
            published_date: fields.published_date,
            pages: fields.pages,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the mutable fields and refresh `updated_at`.
    ///
    /// `updated_at` never moves backwards, even if the wall clock does.
    pub fn apply(&mut self, fields: BookFields, now: OffsetDateTime) {
        self.title = fields.title;
        self.author = fields.author;
        self.isbn = fields.isbn;
        self.published_date = fields.published_date;
        self.pages = fields.pages;
        self.updated_at = now.max(self.updated_at);
    }
}

/// Response body for the list endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookList {
    pub books: Vec<Book>,
}

/// Candidate field set for a book; every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub published_date: Option<String>,
    /// Kept as raw JSON so non-numeric values report the integer rule.
    pub pages: Option<Value>,
}

impl BookInput {
    /// Convenience constructor with every field present.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
        published_date: impl Into<String>,
        pages: u32,
    ) -> Self {
        Self {
            title: Some(title.into()),
            author: Some(author.into()),
            isbn: Some(isbn.into()),
            published_date: Some(published_date.into()),
            pages: Some(Value::from(pages)),
        }
    }

    /// Run every rule and return the violations in rule order.
    pub fn validate(&self) -> Vec<String> {
        match self.checked() {
            Ok(_) => Vec::new(),
            Err(violations) => violations.into_messages(),
        }
    }

    /// Validate and, when clean, hand back the typed field values.
    pub fn checked(&self) -> Result<BookFields, Violations> {
        let title = check_text(
            self.title.as_deref(),
            TITLE_MAX_LEN,
            TITLE_REQUIRED,
            TITLE_TOO_LONG,
        );
        let author = check_text(
            self.author.as_deref(),
            AUTHOR_MAX_LEN,
            AUTHOR_REQUIRED,
            AUTHOR_TOO_LONG,
        );
        let isbn = check_text(
            self.isbn.as_deref(),
            ISBN_MAX_LEN,
            ISBN_REQUIRED,
            ISBN_TOO_LONG,
        );
        let published_date = check_date(self.published_date.as_deref());
        let pages = check_pages(self.pages.as_ref());

        match (title, author, isbn, published_date, pages) {
            (Ok(title), Ok(author), Ok(isbn), Ok(published_date), Ok(pages)) => Ok(BookFields {
                title: title.to_owned(),
                author: author.to_owned(),
                isbn: isbn.to_owned(),
                published_date: published_date.to_owned(),
                pages,
            }),
            (title, author, isbn, published_date, pages) => Err(Violations::new(
                [
                    title.err(),
                    author.err(),
                    isbn.err(),
                    published_date.err(),
                    pages.err(),
                ]
                .into_iter()
                .flatten()
                .map(String::from)
                .collect(),
            )),
        }
    }
}

impl From<&Book> for BookInput {
    fn from(book: &Book) -> Self {
        Self {
            title: Some(book.title.clone()),
            author: Some(book.author.clone()),
            isbn: Some(book.isbn.clone()),
            published_date: Some(book.published_date.clone()),
            pages: Some(Value::from(book.pages)),
        }
    }
}

/// Field values that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub published_date: String,
    pub pages: u32,
}

impl BookFields {
    /// Trim the free-text fields, as done when a record is first stored.
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_owned(),
            author: self.author.trim().to_owned(),
            isbn: self.isbn.trim().to_owned(),
            ..self
        }
    }
}

/// Partial update payload.
///
/// The outer `Option` records presence; a field sent as JSON `null` is
/// present with an inner `None` and fails the required rule once merged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub isbn: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub published_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub pages: Option<Option<Value>>,
}

impl BookPatch {
    /// Overlay the present fields onto the current state of `book`.
    pub fn merged_with(&self, book: &Book) -> BookInput {
        let current = BookInput::from(book);
        BookInput {
            title: overlay(&self.title, current.title),
            author: overlay(&self.author, current.author),
            isbn: overlay(&self.isbn, current.isbn),
            published_date: overlay(&self.published_date, current.published_date),
            pages: overlay(&self.pages, current.pages),
        }
    }

    /// The ISBN this patch sets, when it sets a non-empty one.
    pub fn isbn(&self) -> Option<&str> {
        self.isbn
            .as_ref()
            .and_then(Option::as_deref)
            .filter(|isbn| !isbn.is_empty())
    }
}

fn overlay<T: Clone>(patch: &Option<Option<T>>, current: Option<T>) -> Option<T> {
    match patch {
        Some(value) => value.clone(),
        None => current,
    }
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Length in UTF-16 code units.
fn text_len(value: &str) -> usize {
    value.encode_utf16().count()
}

// Required is judged on the trimmed value, the limit on the raw one.
fn check_text<'a>(
    value: Option<&'a str>,
    max_len: usize,
    required: &'static str,
    too_long: &'static str,
) -> Result<&'a str, &'static str> {
    match value {
        Some(text) if !text.trim().is_empty() => {
            if text_len(text) > max_len {
                Err(too_long)
            } else {
                Ok(text)
            }
        }
        _ => Err(required),
    }
}

fn check_date(value: Option<&str>) -> Result<&str, &'static str> {
    match value {
        Some(text) if !text.is_empty() => {
            if is_calendar_date(text) {
                Ok(text)
            } else {
                Err(DATE_INVALID)
            }
        }
        _ => Err(DATE_REQUIRED),
    }
}

fn check_pages(value: Option<&Value>) -> Result<u32, &'static str> {
    match value {
        None | Some(Value::Null) => Err(PAGES_REQUIRED),
        Some(value) => page_count(value).ok_or(PAGES_INVALID),
    }
}

/// Accepts integral JSON numbers from 1 up to `u32::MAX`, including `10.0`.
fn page_count(value: &Value) -> Option<u32> {
    let Value::Number(number) = value else {
        return None;
    };

    if let Some(n) = number.as_u64() {
        return u32::try_from(n).ok().filter(|n| *n >= 1);
    }

    let n = number.as_f64()?;
    if n.fract() == 0.0 && n >= 1.0 && n <= f64::from(u32::MAX) {
        Some(n as u32)
    } else {
        None
    }
}

/// True when `text` names an existing calendar date in the ISO date-time
/// string format: `YYYY`, `YYYY-MM` or `YYYY-MM-DD`, optionally followed by
/// `T` (or a space) and `HH:mm`, `HH:mm:ss` or `HH:mm:ss.sss`, then an
/// optional `Z` or `+HH:mm`/`-HH:mm` offset.
pub fn is_calendar_date(text: &str) -> bool {
    match text.split_once(|c: char| c == 'T' || c == ' ') {
        Some((day, clock)) => is_calendar_day(day) && is_clock_time(clock),
        None => is_calendar_day(text),
    }
}

/// Reduced-precision dates count as the first day of their year or month.
fn is_calendar_day(text: &str) -> bool {
    let full = match text.len() {
        4 => format!("{text}-01-01"),
        7 => format!("{text}-01"),
        10 => text.to_owned(),
        _ => return false,
    };
    Date::parse(&full, format_description!("[year]-[month]-[day]")).is_ok()
}

fn is_clock_time(text: &str) -> bool {
    let clock = match text.strip_suffix('Z') {
        Some(clock) => clock,
        None => match text.rfind(|c: char| c == '+' || c == '-') {
            Some(at) => {
                let (clock, offset) = text.split_at(at);
                let offset_format =
                    format_description!("[offset_hour sign:mandatory]:[offset_minute]");
                if UtcOffset::parse(offset, offset_format).is_err() {
                    return false;
                }
                clock
            }
            None => text,
        },
    };

    Time::parse(clock, format_description!("[hour]:[minute]")).is_ok()
        || Time::parse(clock, format_description!("[hour]:[minute]:[second]")).is_ok()
        || Time::parse(
            clock,
            format_description!("[hour]:[minute]:[second].[subsecond]"),
        )
        .is_ok()
}

/// ISO 8601 UTC rendering with millisecond precision, e.g. `2024-01-01T09:30:00.000Z`.
mod timestamp {
    use serde::Serializer;
    use time::{macros::format_description, OffsetDateTime, UtcOffset};

    pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = value
            .to_offset(UtcOffset::UTC)
            .format(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
            ))
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}
