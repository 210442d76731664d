//! One entry point per user command. Each takes the raw text typed into the
//! form or a dialog, parses what it needs, performs a single database call,
//! and tells the presentation layer what to show next.

use tracing::debug;

use crate::db::{
    apply_bulk, count_students, delete_student, fetch_students, find_student, insert_student,
    update_student, BulkMutation, Comparison, Database, SortOrder, StudentQuery,
};
use crate::error::{ActionError, ActionResult};
use crate::models::{NewStudent, Student};

/// Result of a successful action.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created(Student),
    Found(Student),
    Updated(Student),
    Deleted(Student),
    /// Unfiltered listing; replaces the table without a dialog.
    Listed(Vec<Student>),
    /// Search, filter or sort results that replace the table contents.
    Matches { rows: Vec<Student>, summary: String },
    Counted(i64),
    AgesIncremented { delta: i32, affected: usize },
    AllDeleted(usize),
}

/// How the table should change after an outcome.
#[derive(Debug, PartialEq)]
pub enum TableRefresh<'a> {
    Unchanged,
    /// Re-run the unfiltered listing.
    Reload,
    Replace(&'a [Student]),
}

impl Outcome {
    /// Text for the confirmation dialog, if the outcome warrants one.
    pub fn message(&self) -> Option<String> {
        match self {
            Outcome::Created(student) => Some(format!("Student saved with ID {}.", student.id)),
            Outcome::Found(_) | Outcome::Listed(_) => None,
            Outcome::Updated(student) => Some(format!("Student {} updated.", student.id)),
            Outcome::Deleted(student) => Some(format!("Student {} deleted.", student.id)),
            Outcome::Matches { summary, .. } => Some(summary.clone()),
            Outcome::Counted(total) => Some(format!("Total students: {total}")),
            Outcome::AgesIncremented { delta, affected } => Some(format!(
                "Added {delta} to the age of {affected} student(s)."
            )),
            Outcome::AllDeleted(count) => Some(format!("Deleted {count} student(s).")),
        }
    }

    pub fn table_refresh(&self) -> TableRefresh<'_> {
        match self {
            Outcome::Created(_)
            | Outcome::Updated(_)
            | Outcome::Deleted(_)
            | Outcome::AgesIncremented { .. }
            | Outcome::AllDeleted(_) => TableRefresh::Reload,
            Outcome::Listed(rows) | Outcome::Matches { rows, .. } => TableRefresh::Replace(rows),
            Outcome::Found(_) | Outcome::Counted(_) => TableRefresh::Unchanged,
        }
    }

    /// Student whose values should be copied into the form.
    pub fn form_values(&self) -> Option<&Student> {
        match self {
            Outcome::Found(student) => Some(student),
            _ => None,
        }
    }

    /// Whether the form should be emptied after this outcome.
    pub fn clears_form(&self) -> bool {
        matches!(
            self,
            Outcome::Created(_) | Outcome::Updated(_) | Outcome::Deleted(_) | Outcome::AllDeleted(_)
        )
    }
}

pub fn parse_id(raw: &str) -> ActionResult<i64> {
    raw.trim()
        .parse()
        .map_err(|_| ActionError::InvalidNumber { field: "ID" })
}

pub fn parse_age(raw: &str) -> ActionResult<i32> {
    parse_i32(raw, "Age")
}

fn parse_i32(raw: &str, field: &'static str) -> ActionResult<i32> {
    raw.trim()
        .parse()
        .map_err(|_| ActionError::InvalidNumber { field })
}

pub fn create(db: &mut Database, name: &str, age_raw: &str) -> ActionResult<Outcome> {
    let age = parse_age(age_raw)?;
    let student = NewStudent::new(name.trim(), age);
    let created = db.write(|tx| insert_student(tx, &student))?;
    Ok(Outcome::Created(created))
}

pub fn read(db: &Database, id_raw: &str) -> ActionResult<Outcome> {
    let id = parse_id(id_raw)?;
    db.read(|conn| find_student(conn, id))?
        .map(Outcome::Found)
        .ok_or(ActionError::NotFound { id })
}

pub fn update(db: &mut Database, id_raw: &str, name: &str, age_raw: &str) -> ActionResult<Outcome> {
    let id = parse_id(id_raw)?;
    let age = parse_age(age_raw)?;
    db.write(|tx| update_student(tx, id, name.trim(), age))?
        .map(Outcome::Updated)
        .ok_or(ActionError::NotFound { id })
}

/// Delete an already-confirmed id.
pub fn delete(db: &mut Database, id: i64) -> ActionResult<Outcome> {
    db.write(|tx| delete_student(tx, id))?
        .map(Outcome::Deleted)
        .ok_or(ActionError::NotFound { id })
}

pub fn list_all(db: &Database) -> ActionResult<Outcome> {
    let rows = db.read(|conn| fetch_students(conn, &StudentQuery::All))?;
    Ok(Outcome::Listed(rows))
}

pub fn search_name(db: &Database, text: &str) -> ActionResult<Outcome> {
    let needle = text.trim();
    let rows = db.read(|conn| fetch_students(conn, &StudentQuery::NameContains(needle.into())))?;
    let summary = format!("Found {} student(s) matching \"{needle}\".", rows.len());
    Ok(Outcome::Matches { rows, summary })
}

pub fn search_age_range(db: &Database, min_raw: &str, max_raw: &str) -> ActionResult<Outcome> {
    let min = parse_i32(min_raw, "Minimum age")?;
    let max = parse_i32(max_raw, "Maximum age")?;
    let rows = db.read(|conn| fetch_students(conn, &StudentQuery::AgeBetween { min, max }))?;
    let summary = format!("Found {} student(s) aged {min} to {max}.", rows.len());
    Ok(Outcome::Matches { rows, summary })
}

pub fn filter_age(db: &Database, comparison: Comparison, age_raw: &str) -> ActionResult<Outcome> {
    let age = parse_age(age_raw)?;
    let rows = db.read(|conn| fetch_students(conn, &StudentQuery::AgeFilter { comparison, age }))?;
    let summary = format!("Found {} student(s) with age {comparison} {age}.", rows.len());
    Ok(Outcome::Matches { rows, summary })
}

pub fn sort(db: &Database, order: SortOrder) -> ActionResult<Outcome> {
    let rows = db.read(|conn| fetch_students(conn, &StudentQuery::Sorted(order)))?;
    let summary = format!("Sorted by {}.", order.label());
    Ok(Outcome::Matches { rows, summary })
}

pub fn count(db: &Database) -> ActionResult<Outcome> {
    Ok(Outcome::Counted(db.read(count_students)?))
}

/// Remove every row. Callers confirm with the user first.
pub fn delete_all(db: &mut Database) -> ActionResult<Outcome> {
    let removed = db.write(|tx| apply_bulk(tx, &BulkMutation::DeleteAll))?;
    Ok(Outcome::AllDeleted(removed))
}

pub fn increment_ages(db: &mut Database, delta_raw: &str) -> ActionResult<Outcome> {
    let delta = parse_i32(delta_raw, "Increment")?;
    let affected = db.write(|tx| apply_bulk(tx, &BulkMutation::IncrementAge(delta)))?;
    debug!(delta, affected, "ages incremented");
    Ok(Outcome::AgesIncremented { delta, affected })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(students: &[(&str, i32)]) -> Database {
        let mut db = Database::open_in_memory().unwrap();
        for (name, age) in students {
            create(&mut db, name, &age.to_string()).unwrap();
        }
        db
    }

    fn rows(outcome: Outcome) -> Vec<Student> {
        match outcome {
            Outcome::Listed(rows) | Outcome::Matches { rows, .. } => rows,
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn create_parses_age_and_reports_id() {
        let mut db = Database::open_in_memory().unwrap();
        let outcome = create(&mut db, "  Juan Pérez ", " 20 ").unwrap();
        let Outcome::Created(student) = &outcome else {
            panic!("unexpected {outcome:?}");
        };
        assert_eq!(student.name, "Juan Pérez");
        assert_eq!(student.age, 20);
        assert_eq!(
            outcome.message().unwrap(),
            format!("Student saved with ID {}.", student.id)
        );
        assert!(outcome.clears_form());
        assert_eq!(outcome.table_refresh(), TableRefresh::Reload);
    }

    #[test]
    fn create_rejects_non_numeric_age_without_writing() {
        let mut db = Database::open_in_memory().unwrap();
        let err = create(&mut db, "Ana", "veinte").unwrap_err();
        assert!(matches!(err, ActionError::InvalidNumber { field: "Age" }));
        assert_eq!(rows(list_all(&db).unwrap()).len(), 0);
    }

    #[test]
    fn negative_ages_are_accepted() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(create(&mut db, "Raro", "-4").is_ok());
    }

    #[test]
    fn read_populates_form_or_reports_missing() {
        let db = seeded(&[("Pedro Sánchez", 23)]);
        let found = read(&db, "1").unwrap();
        assert_eq!(found.form_values().map(|s| s.age), Some(23));
        assert_eq!(found.table_refresh(), TableRefresh::Unchanged);

        let err = read(&db, "99999").unwrap_err();
        assert_eq!(err.to_string(), "No record found for ID 99999.");

        let err = read(&db, "abc").unwrap_err();
        assert_eq!(err.to_string(), "ID must be a valid number.");
    }

    #[test]
    fn update_checks_id_then_age() {
        let mut db = seeded(&[("Roberto Gómez", 28)]);

        let err = update(&mut db, "x", "Roberto", "y").unwrap_err();
        assert!(matches!(err, ActionError::InvalidNumber { field: "ID" }));
        let err = update(&mut db, "1", "Roberto", "y").unwrap_err();
        assert!(matches!(err, ActionError::InvalidNumber { field: "Age" }));
        let err = update(&mut db, "42", "Roberto", "30").unwrap_err();
        assert!(matches!(err, ActionError::NotFound { id: 42 }));

        update(&mut db, "1", "Roberto García", "29").unwrap();
        let Outcome::Found(student) = read(&db, "1").unwrap() else {
            unreachable!()
        };
        assert_eq!((student.name.as_str(), student.age), ("Roberto García", 29));
    }

    #[test]
    fn delete_reports_missing_ids() {
        let mut db = seeded(&[("Temporal", 30)]);
        assert!(matches!(delete(&mut db, 1).unwrap(), Outcome::Deleted(_)));
        assert!(matches!(
            delete(&mut db, 1).unwrap_err(),
            ActionError::NotFound { id: 1 }
        ));
    }

    #[test]
    fn search_name_reports_match_count() {
        let db = seeded(&[("Juan Carlos", 20), ("María Juan", 21), ("Pedro López", 22)]);
        let outcome = search_name(&db, " juan ").unwrap();
        assert_eq!(
            outcome.message().unwrap(),
            "Found 2 student(s) matching \"juan\"."
        );
        assert_eq!(rows(outcome).len(), 2);
    }

    #[test]
    fn age_range_needs_two_numbers() {
        let db = seeded(&[("A", 18), ("B", 22), ("C", 25), ("D", 30)]);
        assert_eq!(rows(search_age_range(&db, "20", "26").unwrap()).len(), 2);

        let err = search_age_range(&db, "20", "old").unwrap_err();
        assert_eq!(err.to_string(), "Maximum age must be a valid number.");
    }

    #[test]
    fn filter_and_sort_replace_rows() {
        let db = seeded(&[("Carlos", 20), ("Ana", 25), ("Beatriz", 30)]);

        let older = rows(filter_age(&db, Comparison::Greater, "22").unwrap());
        assert_eq!(older.len(), 2);
        assert!(filter_age(&db, Comparison::Equal, "2.5").is_err());

        let sorted = rows(sort(&db, SortOrder::CHOICES[0]).unwrap());
        let names: Vec<_> = sorted.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Ana", "Beatriz", "Carlos"]);
    }

    #[test]
    fn count_leaves_table_alone() {
        let db = seeded(&[("A", 1), ("B", 2), ("C", 3)]);
        let outcome = count(&db).unwrap();
        assert_eq!(outcome, Outcome::Counted(3));
        assert_eq!(outcome.table_refresh(), TableRefresh::Unchanged);
        assert_eq!(outcome.message().unwrap(), "Total students: 3");
    }

    #[test]
    fn bulk_operations_report_affected_rows() {
        let mut db = seeded(&[("A", 20), ("B", 25)]);

        let outcome = increment_ages(&mut db, "+2").unwrap();
        assert_eq!(outcome, Outcome::AgesIncremented { delta: 2, affected: 2 });
        let ages: Vec<i32> = rows(list_all(&db).unwrap()).iter().map(|s| s.age).collect();
        assert_eq!(ages, [22, 27]);

        assert!(matches!(
            increment_ages(&mut db, "two").unwrap_err(),
            ActionError::InvalidNumber { field: "Increment" }
        ));

        assert_eq!(delete_all(&mut db).unwrap(), Outcome::AllDeleted(2));
        assert_eq!(count(&db).unwrap(), Outcome::Counted(0));
    }

    #[test]
    fn age_overflow_fails_the_action_but_not_the_table() {
        let mut db = seeded(&[("Max", i32::MAX), ("Ana", 20)]);

        let err = increment_ages(&mut db, "1").unwrap_err();
        assert!(matches!(err, ActionError::Persistence(_)));
        assert_eq!(err.to_string(), "The age change would put 1 student(s) out of range.");

        let ages: Vec<i32> = rows(list_all(&db).unwrap()).iter().map(|s| s.age).collect();
        assert_eq!(ages, [i32::MAX, 20]);
        assert!(matches!(
            increment_ages(&mut db, "-5").unwrap(),
            Outcome::AgesIncremented { delta: -5, affected: 2 }
        ));
    }
}
