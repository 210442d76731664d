use anyhow::{bail, Context, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::models::{NewStudent, Student};

use super::queries::{BulkMutation, StudentQuery, COUNT_SQL, STUDENT_COLUMNS};

fn map_student(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
    })
}

/// Insert a new row and return it with the id SQLite assigned.
pub fn insert_student(conn: &Connection, student: &NewStudent) -> Result<Student> {
    conn.execute(
        "INSERT INTO students (name, age) VALUES (?1, ?2)",
        params![student.name, student.age],
    )
    .context("failed to insert student")?;

    let id = conn.last_insert_rowid();
    info!(id, "student created");
    Ok(student.clone().into_persisted(id))
}

/// Point lookup by primary key. A missing row is `None`, not an error.
pub fn find_student(conn: &Connection, id: i64) -> Result<Option<Student>> {
    conn.query_row(
        &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
        [id],
        map_student,
    )
    .optional()
    .context("failed to load student")
}

/// Load the row, overwrite name and age, and save it back. Returns the stored
/// state, or `None` when no row has this id.
pub fn update_student(conn: &Connection, id: i64, name: &str, age: i32) -> Result<Option<Student>> {
    let Some(mut student) = find_student(conn, id)? else {
        debug!(id, "update skipped, student missing");
        return Ok(None);
    };

    student.name = name.to_string();
    student.age = age;
    conn.execute(
        "UPDATE students SET name = ?1, age = ?2 WHERE id = ?3",
        params![student.name, student.age, student.id],
    )
    .context("failed to update student")?;

    info!(id, "student updated");
    Ok(Some(student))
}

/// Delete a row if it exists. Returns the removed student so callers can
/// mention it; deleting an unknown id is a no-op that yields `None`.
pub fn delete_student(conn: &Connection, id: i64) -> Result<Option<Student>> {
    let Some(student) = find_student(conn, id)? else {
        debug!(id, "delete skipped, student missing");
        return Ok(None);
    };

    conn.execute("DELETE FROM students WHERE id = ?1", [id])
        .context("failed to delete student")?;

    info!(id, "student deleted");
    Ok(Some(student))
}

/// Run any of the row-returning query variants.
pub fn fetch_students(conn: &Connection, query: &StudentQuery) -> Result<Vec<Student>> {
    let (sql, values) = query.to_sql();
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare student query")?;

    let students = stmt
        .query_map(params_from_iter(values), map_student)
        .context("failed to load students")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect students")?;

    debug!(?query, rows = students.len(), "student query");
    Ok(students)
}

pub fn count_students(conn: &Connection) -> Result<i64> {
    conn.query_row(COUNT_SQL, [], |row| row.get(0))
        .context("failed to count students")
}

/// Execute a bulk statement and report how many rows it touched. An age
/// change that would leave any row outside the `i32` range is refused before
/// anything is written.
pub fn apply_bulk(conn: &Connection, mutation: &BulkMutation) -> Result<usize> {
    if let Some((check_sql, check_values)) = mutation.overflow_check() {
        let out_of_range: i64 = conn
            .query_row(check_sql, params_from_iter(check_values), |row| row.get(0))
            .context("failed to check age range")?;
        if out_of_range > 0 {
            bail!("The age change would put {out_of_range} student(s) out of range.");
        }
    }

    let (sql, values) = mutation.to_sql();
    let affected = conn
        .execute(sql, params_from_iter(values))
        .context("failed to run bulk update")?;

    info!(?mutation, affected, "bulk mutation applied");
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::{Comparison, SortDirection, SortField, SortOrder};
    use crate::db::Database;

    fn db_with(students: &[(&str, i32)]) -> (Database, Vec<Student>) {
        let mut db = Database::open_in_memory().unwrap();
        let created = db
            .write(|tx| {
                students
                    .iter()
                    .map(|(name, age)| insert_student(tx, &NewStudent::new(*name, *age)))
                    .collect::<Result<Vec<_>>>()
            })
            .unwrap();
        (db, created)
    }

    fn names(students: &[Student]) -> Vec<&str> {
        students.iter().map(|s| s.name.as_str()).collect()
    }

    fn ages(students: &[Student]) -> Vec<i32> {
        students.iter().map(|s| s.age).collect()
    }

    #[test]
    fn created_students_get_distinct_positive_ids() {
        let (_, created) = db_with(&[
            ("Ana García", 22),
            ("Carlos López", 25),
            ("María Rodríguez", 19),
        ]);
        assert!(created.iter().all(|s| s.id > 0));
        assert_ne!(created[0].id, created[1].id);
        assert_ne!(created[1].id, created[2].id);
    }

    #[test]
    fn special_characters_survive_a_round_trip() {
        let (db, created) = db_with(&[("José Ángel O'Brien", 30)]);
        let read = db.read(|c| find_student(c, created[0].id)).unwrap().unwrap();
        assert_eq!(read.name, "José Ángel O'Brien");
    }

    #[test]
    fn read_returns_what_was_created() {
        let (db, created) = db_with(&[("Pedro Sánchez", 23)]);
        let read = db.read(|c| find_student(c, created[0].id)).unwrap();
        assert_eq!(read, Some(created[0].clone()));
    }

    #[test]
    fn missing_id_reads_as_none() {
        let (db, _) = db_with(&[]);
        assert_eq!(db.read(|c| find_student(c, 99_999)).unwrap(), None);
    }

    #[test]
    fn update_overwrites_only_the_target_row() {
        let (mut db, created) = db_with(&[("Nombre Original", 25), ("Laura Martínez", 20)]);
        let target = created[0].id;

        let updated = db
            .write(|tx| update_student(tx, target, "Nombre Actualizado", 26))
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Nombre Actualizado");

        let read = db.read(|c| find_student(c, target)).unwrap().unwrap();
        assert_eq!((read.name.as_str(), read.age), ("Nombre Actualizado", 26));

        let other = db.read(|c| find_student(c, created[1].id)).unwrap();
        assert_eq!(other, Some(created[1].clone()));
    }

    #[test]
    fn update_of_missing_row_is_none() {
        let (mut db, _) = db_with(&[("Roberto Gómez", 28)]);
        let result = db.write(|tx| update_student(tx, 99_999, "Nadie", 1)).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn delete_removes_row_and_ignores_unknown_ids() {
        let (mut db, created) = db_with(&[("Estudiante a Eliminar", 24)]);
        let id = created[0].id;

        let removed = db.write(|tx| delete_student(tx, id)).unwrap();
        assert_eq!(removed.map(|s| s.id), Some(id));
        assert_eq!(db.read(|c| find_student(c, id)).unwrap(), None);

        assert_eq!(db.write(|tx| delete_student(tx, id)).unwrap(), None);
    }

    #[test]
    fn count_tracks_creates_minus_deletes() {
        let (mut db, created) = db_with(&[("Uno", 20), ("Dos", 21), ("Tres", 22), ("Cuatro", 23)]);
        db.write(|tx| delete_student(tx, created[0].id)).unwrap();
        db.write(|tx| delete_student(tx, created[2].id)).unwrap();
        assert_eq!(db.read(count_students).unwrap(), 2);
    }

    #[test]
    fn fetch_all_returns_every_row() {
        let (db, _) = db_with(&[("Estudiante 1", 20), ("Estudiante 2", 21), ("Estudiante 3", 22)]);
        let all = db.read(|c| fetch_students(c, &StudentQuery::All)).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn name_search_is_case_insensitive_substring() {
        let (db, _) = db_with(&[("Juan Carlos", 20), ("María Juan", 21), ("Pedro López", 22)]);
        let found = db
            .read(|c| fetch_students(c, &StudentQuery::NameContains("juan".into())))
            .unwrap();
        assert_eq!(names(&found), ["Juan Carlos", "María Juan"]);
    }

    #[test]
    fn name_search_treats_wildcards_literally() {
        let (db, _) = db_with(&[("100% Real", 20), ("Ordinary", 21)]);
        let found = db
            .read(|c| fetch_students(c, &StudentQuery::NameContains("%".into())))
            .unwrap();
        assert_eq!(names(&found), ["100% Real"]);
    }

    #[test]
    fn age_range_is_inclusive() {
        let (db, _) = db_with(&[("A", 18), ("B", 22), ("C", 25), ("D", 30), ("E", 26)]);
        let found = db
            .read(|c| fetch_students(c, &StudentQuery::AgeBetween { min: 20, max: 26 }))
            .unwrap();
        assert_eq!(ages(&found), [22, 25, 26]);
    }

    #[test]
    fn age_filter_applies_comparison() {
        let (db, _) = db_with(&[("A", 20), ("B", 25), ("C", 30)]);
        let run = |comparison| {
            db.read(|c| fetch_students(c, &StudentQuery::AgeFilter { comparison, age: 25 }))
                .unwrap()
        };
        assert_eq!(ages(&run(Comparison::Greater)), [30]);
        assert_eq!(ages(&run(Comparison::Less)), [20]);
        assert_eq!(ages(&run(Comparison::Equal)), [25]);
    }

    #[test]
    fn sorting_by_name_and_age() {
        let (db, _) = db_with(&[("Carlos", 20), ("Ana", 25), ("Beatriz", 22)]);

        let by_name = db
            .read(|c| {
                fetch_students(
                    c,
                    &StudentQuery::Sorted(SortOrder::new(SortField::Name, SortDirection::Ascending)),
                )
            })
            .unwrap();
        assert_eq!(names(&by_name), ["Ana", "Beatriz", "Carlos"]);

        let by_age = db
            .read(|c| {
                fetch_students(
                    c,
                    &StudentQuery::Sorted(SortOrder::new(SortField::Age, SortDirection::Descending)),
                )
            })
            .unwrap();
        assert_eq!(ages(&by_age), [25, 22, 20]);
    }

    #[test]
    fn bulk_increment_touches_every_row() {
        let (mut db, _) = db_with(&[("A", 20), ("B", 25), ("C", 30)]);
        let affected = db
            .write(|tx| apply_bulk(tx, &BulkMutation::IncrementAge(1)))
            .unwrap();
        assert_eq!(affected, 3);

        let sorted = db
            .read(|c| {
                fetch_students(
                    c,
                    &StudentQuery::Sorted(SortOrder::new(SortField::Age, SortDirection::Ascending)),
                )
            })
            .unwrap();
        assert_eq!(ages(&sorted), [21, 26, 31]);
    }

    #[test]
    fn increment_past_i32_is_refused_and_rows_stay_readable() {
        let (mut db, _) = db_with(&[("Max", i32::MAX), ("Ana", 20)]);
        let err = db
            .write(|tx| apply_bulk(tx, &BulkMutation::IncrementAge(1)))
            .unwrap_err();
        assert!(err.to_string().contains("1 student(s) out of range"), "{err}");

        let all = db.read(|c| fetch_students(c, &StudentQuery::All)).unwrap();
        assert_eq!(ages(&all), [i32::MAX, 20]);

        let err = db
            .write(|tx| apply_bulk(tx, &BulkMutation::IncrementAge(i32::MIN)))
            .unwrap_err();
        assert!(err.to_string().contains("1 student(s) out of range"), "{err}");
    }

    #[test]
    fn schema_rejects_ages_outside_i32() {
        let (db, created) = db_with(&[("Max", i32::MAX)]);
        let result = db.read(|c| {
            c.execute(
                "UPDATE students SET age = age + 1 WHERE id = ?1",
                [created[0].id],
            )
            .context("raw update")
        });
        assert!(result.is_err());
    }

    #[test]
    fn name_search_folds_accented_capitals() {
        let (db, _) = db_with(&[("MARÍA JUAN", 20), ("José Ángel O'Brien", 21), ("Pedro", 22)]);
        let search = |text: &str| {
            db.read(|c| fetch_students(c, &StudentQuery::NameContains(text.into())))
                .unwrap()
        };
        assert_eq!(names(&search("maría")), ["MARÍA JUAN"]);
        assert_eq!(names(&search("ángel")), ["José Ángel O'Brien"]);
        assert_eq!(names(&search("ÁNGEL")), ["José Ángel O'Brien"]);
    }

    #[test]
    fn name_sort_places_accented_letters_with_their_base() {
        let (db, _) = db_with(&[("Beatriz", 20), ("Álvaro", 21), ("ana", 22)]);
        let sorted = |direction| {
            db.read(|c| {
                fetch_students(c, &StudentQuery::Sorted(SortOrder::new(SortField::Name, direction)))
            })
            .unwrap()
        };
        assert_eq!(names(&sorted(SortDirection::Ascending)), ["Álvaro", "ana", "Beatriz"]);
        assert_eq!(names(&sorted(SortDirection::Descending)), ["Beatriz", "ana", "Álvaro"]);
    }

    #[test]
    fn delete_all_empties_the_table() {
        let (mut db, _) = db_with(&[("A", 20), ("B", 21), ("C", 22)]);
        let removed = db
            .write(|tx| apply_bulk(tx, &BulkMutation::DeleteAll))
            .unwrap();
        assert_eq!(removed, 3);
        assert_eq!(db.read(count_students).unwrap(), 0);
    }

    #[test]
    fn full_lifecycle() {
        let (mut db, created) = db_with(&[("Ciclo Completo", 20)]);
        let id = created[0].id;

        let read = db.read(|c| find_student(c, id)).unwrap().unwrap();
        assert_eq!(read.name, "Ciclo Completo");

        db.write(|tx| update_student(tx, id, "Ciclo Actualizado", 21))
            .unwrap();
        let updated = db.read(|c| find_student(c, id)).unwrap().unwrap();
        assert_eq!((updated.name.as_str(), updated.age), ("Ciclo Actualizado", 21));

        db.write(|tx| delete_student(tx, id)).unwrap();
        assert_eq!(db.read(|c| find_student(c, id)).unwrap(), None);
    }
}
