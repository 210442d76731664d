//! Builders for the parameterised SQL the student screens run. Keeping the
//! strings in one place makes it obvious which variants exist and lets the
//! tests check the exact statements without a database.

use std::fmt;

use rusqlite::types::Value;

/// Column list shared by every row-returning query so the row mapper can rely
/// on positional indexes.
pub(crate) const STUDENT_COLUMNS: &str = "id, name, age";

/// Collation registered on every connection: Unicode-aware, ignores case.
pub(crate) const NAME_COLLATION: &str = "student_name";
/// Scalar function registered on every connection: Unicode lower-casing.
pub(crate) const LOWER_FN: &str = "unicode_lower";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Less,
    Equal,
}

impl Comparison {
    pub const ALL: [Comparison; 3] = [Comparison::Greater, Comparison::Less, Comparison::Equal];

    fn operator(self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::Less => "<",
            Comparison::Equal => "=",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Comparison::Greater => "Older than",
            Comparison::Less => "Younger than",
            Comparison::Equal => "Exactly",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operator())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Age,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortOrder {
    /// The four choices offered by the sort dialog, in display order.
    pub const CHOICES: [SortOrder; 4] = [
        SortOrder::new(SortField::Name, SortDirection::Ascending),
        SortOrder::new(SortField::Name, SortDirection::Descending),
        SortOrder::new(SortField::Age, SortDirection::Ascending),
        SortOrder::new(SortField::Age, SortDirection::Descending),
    ];

    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn label(self) -> &'static str {
        match (self.field, self.direction) {
            (SortField::Name, SortDirection::Ascending) => "Name (A-Z)",
            (SortField::Name, SortDirection::Descending) => "Name (Z-A)",
            (SortField::Age, SortDirection::Ascending) => "Age (youngest first)",
            (SortField::Age, SortDirection::Descending) => "Age (oldest first)",
        }
    }

    fn order_by(self) -> &'static str {
        match (self.field, self.direction) {
            (SortField::Name, SortDirection::Ascending) => "name COLLATE student_name ASC, id",
            (SortField::Name, SortDirection::Descending) => "name COLLATE student_name DESC, id",
            (SortField::Age, SortDirection::Ascending) => "age ASC, id",
            (SortField::Age, SortDirection::Descending) => "age DESC, id",
        }
    }
}

/// Row-returning queries over the `students` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentQuery {
    All,
    /// Case-insensitive substring match on the name.
    NameContains(String),
    /// Inclusive on both ends.
    AgeBetween { min: i32, max: i32 },
    AgeFilter { comparison: Comparison, age: i32 },
    Sorted(SortOrder),
}

impl StudentQuery {
    /// Render the statement and its positional parameters.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        match self {
            StudentQuery::All => (
                format!("SELECT {STUDENT_COLUMNS} FROM students ORDER BY id"),
                Vec::new(),
            ),
            StudentQuery::NameContains(text) => (
                format!(
                    "SELECT {STUDENT_COLUMNS} FROM students
                     WHERE {LOWER_FN}(name) LIKE ?1 ESCAPE '\\'
                     ORDER BY id"
                ),
                vec![Value::Text(like_pattern(text))],
            ),
            StudentQuery::AgeBetween { min, max } => (
                format!(
                    "SELECT {STUDENT_COLUMNS} FROM students
                     WHERE age BETWEEN ?1 AND ?2
                     ORDER BY id"
                ),
                vec![Value::Integer(i64::from(*min)), Value::Integer(i64::from(*max))],
            ),
            StudentQuery::AgeFilter { comparison, age } => (
                format!(
                    "SELECT {STUDENT_COLUMNS} FROM students
                     WHERE age {} ?1
                     ORDER BY id",
                    comparison.operator()
                ),
                vec![Value::Integer(i64::from(*age))],
            ),
            StudentQuery::Sorted(order) => (
                format!(
                    "SELECT {STUDENT_COLUMNS} FROM students ORDER BY {}",
                    order.order_by()
                ),
                Vec::new(),
            ),
        }
    }
}

/// Aggregate row count.
pub const COUNT_SQL: &str = "SELECT COUNT(*) FROM students";

/// Statements that touch every row at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkMutation {
    /// `age = age + delta`; the delta may be negative.
    IncrementAge(i32),
    DeleteAll,
}

impl BulkMutation {
    pub fn to_sql(&self) -> (&'static str, Vec<Value>) {
        match self {
            BulkMutation::IncrementAge(delta) => (
                "UPDATE students SET age = age + ?1",
                vec![Value::Integer(i64::from(*delta))],
            ),
            BulkMutation::DeleteAll => ("DELETE FROM students", Vec::new()),
        }
    }

    /// Count of rows the mutation would push out of range. SQLite computes
    /// `age + delta` in 64 bits, so the overflow has to be caught up front.
    pub fn overflow_check(&self) -> Option<(&'static str, Vec<Value>)> {
        match self {
            BulkMutation::IncrementAge(delta) => Some((
                "SELECT COUNT(*) FROM students
                 WHERE age + ?1 NOT BETWEEN ?2 AND ?3",
                vec![
                    Value::Integer(i64::from(*delta)),
                    Value::Integer(i64::from(i32::MIN)),
                    Value::Integer(i64::from(i32::MAX)),
                ],
            )),
            BulkMutation::DeleteAll => None,
        }
    }
}

/// Wrap lower-cased user text in `%…%`, escaping LIKE wildcards so they
/// match literally.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
