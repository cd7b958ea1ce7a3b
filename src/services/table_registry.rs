//! Built-in table sources served by the generic list endpoint.

use crate::errors::AppError;
use crate::services::pg_table::{Relation, TableSource};

const BRANCH: Relation = Relation {
    name: "branch",
    table: "branches",
    local_key: "branch_id",
    foreign_key: "id",
    columns: &["id", "code", "name"],
};

pub static SOURCES: &[TableSource] = &[
    TableSource {
        key: "students",
        table: "students",
        primary_key: "id",
        columns: &[
            "id",
            "student_no",
            "first_name",
            "last_name",
            "age",
            "status",
            "grade_level_id",
            "branch_id",
            "created_at",
        ],
        relations: &[
            Relation {
                name: "gradeLevel",
                table: "grade_levels",
                local_key: "grade_level_id",
                foreign_key: "id",
                columns: &["id", "name", "level"],
            },
            BRANCH,
        ],
    },
    TableSource {
        key: "grade_levels",
        table: "grade_levels",
        primary_key: "id",
        columns: &["id", "name", "level", "branch_id", "created_at"],
        relations: &[BRANCH],
    },
    TableSource {
        key: "branches",
        table: "branches",
        primary_key: "id",
        columns: &["id", "code", "name", "address", "created_at"],
        relations: &[],
    },
    TableSource {
        key: "employees",
        table: "employees",
        primary_key: "id",
        columns: &[
            "id",
            "employee_no",
            "first_name",
            "last_name",
            "email",
            "monthly_salary",
            "status",
            "role_id",
            "branch_id",
            "hired_at",
            "created_at",
        ],
        relations: &[
            Relation {
                name: "role",
                table: "roles",
                local_key: "role_id",
                foreign_key: "id",
                columns: &["id", "name"],
            },
            BRANCH,
        ],
    },
];

/// Resolve a table key from the request path.
pub fn lookup(key: &str) -> Result<&'static TableSource, AppError> {
    SOURCES
        .iter()
        .find(|s| s.key == key)
        .ok_or_else(|| AppError::NotFound(format!("Unknown table: {key}")))
}

pub fn keys() -> Vec<&'static str> {
    SOURCES.iter().map(|s| s.key).collect()
}
