//! Domain models that mirror the SQLite schema and get passed throughout the
//! TUI. These stay light-weight data holders so the persistence and
//! presentation layers own all of the behaviour.

#[derive(Debug, Clone, PartialEq, Eq)]
/// A student row that exists in the database. Values of this type are only
/// produced by the persistence layer, so holding one means the record has an
/// identifier assigned by SQLite.
pub struct Student {
    /// Primary key generated on insert. Never changes afterwards.
    pub id: i64,
    pub name: String,
    /// No range is enforced; negative ages are stored as given.
    pub age: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A student that has not been persisted yet and therefore has no id.
pub struct NewStudent {
    pub name: String,
    pub age: i32,
}

impl NewStudent {
    pub fn new(name: impl Into<String>, age: i32) -> Self {
        Self {
            name: name.into(),
            age,
        }
    }

    /// Attach the id SQLite handed back after the insert.
    pub fn into_persisted(self, id: i64) -> Student {
        Student {
            id,
            name: self.name,
            age: self.age,
        }
    }
}
