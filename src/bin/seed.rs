//! Seed script for development — populates a fresh database with sample school records.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires the `DATABASE_URL` environment variable (reads .env).

use sqlx::PgPool;

const FIRST_NAMES: &[&str] = &[
    "Ana", "Ben", "Carla", "Diego", "Elena", "Felix", "Grace", "Hugo", "Iris", "Jonas", "Kara",
    "Luis", "Mara", "Nico", "Olga", "Pablo",
];
const LAST_NAMES: &[&str] = &[
    "Reyes", "Santos", "Cruz", "Bautista", "Garcia", "Mendoza", "Torres", "Flores", "Ramos",
    "Aquino",
];
const STUDENT_STATUSES: &[&str] = &["active", "active", "active", "inactive", "graduated"];
const STUDENT_COUNT: usize = 120;
const EMPLOYEE_COUNT: usize = 24;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let db_url = std::env::var("DATABASE_URL")?;
    let pool = campusdesk::db::create_pool(&db_url, 5).await?;

    // Run migrations first
    campusdesk::db::migrate(&pool).await?;

    println!("=== campusdesk Seed Script ===");

    let branch_ids = seed_branches(&pool).await?;
    let grade_ids = seed_grade_levels(&pool, &branch_ids).await?;
    let role_ids = seed_roles(&pool).await?;
    seed_students(&pool, &grade_ids, &branch_ids).await?;
    seed_employees(&pool, &role_ids, &branch_ids).await?;

    println!("\n=== Seed complete! ===");
    Ok(())
}

async fn seed_branches(pool: &PgPool) -> anyhow::Result<Vec<i64>> {
    let branches = [
        ("MAIN", "Main Campus", "12 Rizal Avenue"),
        ("NORTH", "North Campus", "88 Mabini Street"),
        ("EAST", "East Annex", "5 Bonifacio Road"),
    ];

    let mut ids = Vec::with_capacity(branches.len());
    for (code, name, address) in branches {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO branches (code, name, address) VALUES ($1, $2, $3)
             ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name
             RETURNING id",
        )
        .bind(code)
        .bind(name)
        .bind(address)
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }

    println!("[done] {} branches", ids.len());
    Ok(ids)
}

async fn seed_grade_levels(pool: &PgPool, branch_ids: &[i64]) -> anyhow::Result<Vec<i64>> {
    let existing: Vec<i64> = sqlx::query_scalar("SELECT id FROM grade_levels ORDER BY level")
        .fetch_all(pool)
        .await?;
    if !existing.is_empty() {
        println!("[skip] Grade levels already exist ({})", existing.len());
        return Ok(existing);
    }

    let mut ids = Vec::new();
    for level in 1..=12 {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO grade_levels (name, level, branch_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(format!("Grade {level}"))
        .bind(level)
        .bind(branch_ids[(level as usize) % branch_ids.len()])
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }

    println!("[done] {} grade levels", ids.len());
    Ok(ids)
}

async fn seed_roles(pool: &PgPool) -> anyhow::Result<Vec<i64>> {
    let mut ids = Vec::new();
    for name in ["admin", "teacher", "registrar", "cashier", "guard"] {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO roles (name) VALUES ($1)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id",
        )
        .bind(name)
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }

    println!("[done] {} roles", ids.len());
    Ok(ids)
}

async fn seed_students(pool: &PgPool, grade_ids: &[i64], branch_ids: &[i64]) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("[skip] Students already exist ({count})");
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for i in 0..STUDENT_COUNT {
        let grade_index = i % grade_ids.len();
        sqlx::query(
            "INSERT INTO students (student_no, first_name, last_name, age, status, grade_level_id, branch_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(format!("S-{:05}", i + 1))
        .bind(FIRST_NAMES[i % FIRST_NAMES.len()])
        .bind(LAST_NAMES[(i / FIRST_NAMES.len()) % LAST_NAMES.len()])
        .bind(6 + grade_index as i32)
        .bind(STUDENT_STATUSES[i % STUDENT_STATUSES.len()])
        .bind(grade_ids[grade_index])
        .bind(branch_ids[i % branch_ids.len()])
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    println!("[done] {STUDENT_COUNT} students");
    Ok(())
}

async fn seed_employees(pool: &PgPool, role_ids: &[i64], branch_ids: &[i64]) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("[skip] Employees already exist ({count})");
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for i in 0..EMPLOYEE_COUNT {
        let first = FIRST_NAMES[(i * 3) % FIRST_NAMES.len()];
        let last = LAST_NAMES[i % LAST_NAMES.len()];
        sqlx::query(
            "INSERT INTO employees (employee_no, first_name, last_name, email, monthly_salary, status, role_id, branch_id, hired_at)
             VALUES ($1, $2, $3, $4, ($5::float8)::numeric, $6, $7, $8, CURRENT_DATE - ($9::int * 30))",
        )
        .bind(format!("E-{:04}", i + 1))
        .bind(first)
        .bind(last)
        .bind(format!("{}.{}{}@campusdesk.local", first.to_lowercase(), last.to_lowercase(), i + 1))
        .bind(25_000.0 + (i as f64) * 1_250.0)
        .bind(if i % 8 == 7 { "on_leave" } else { "active" })
        .bind(role_ids[i % role_ids.len()])
        .bind(branch_ids[i % branch_ids.len()])
        .bind(i as i32)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    println!("[done] {EMPLOYEE_COUNT} employees");
    Ok(())
}
