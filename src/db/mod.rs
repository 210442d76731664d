//! Persistence module split across logical submodules.

mod connection;
mod queries;
mod students;

pub use connection::{database_exists, Database};
pub use queries::{BulkMutation, Comparison, SortDirection, SortField, SortOrder, StudentQuery};
pub use students::{
    apply_bulk, count_students, delete_student, fetch_students, find_student, insert_student,
    update_student,
};
