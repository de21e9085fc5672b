use anyhow::{bail, Context};
use school_rules::attendance::AttendanceTally;
use school_rules::calendar::AcademicTerm;
use school_rules::config::Rules;
use school_rules::models::{CohortScope, StudentAttendance, StudentRef, StudentScore};
use school_rules::scoring::{ScoreComponents, ScoreRecord};
use school_rules::validation;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_student(
    pool: &PgPool,
    id: Uuid,
    admission_number: &str,
    full_name: &str,
    class_level: &str,
) -> anyhow::Result<Uuid> {
    let student_id: Uuid = sqlx::query(
        r#"
        INSERT INTO school_portal.students (id, admission_number, full_name, class_level)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (admission_number) DO UPDATE
        SET full_name = EXCLUDED.full_name, class_level = EXCLUDED.class_level
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(admission_number)
    .bind(full_name)
    .bind(class_level)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(student_id)
}

async fn insert_score(
    pool: &PgPool,
    student_id: Uuid,
    subject: &str,
    term: AcademicTerm,
    academic_year: &str,
    components: &ScoreComponents,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO school_portal.score_records
        (id, student_id, subject, term, academic_year, ca1, ca2, exam, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(subject)
    .bind(i16::from(term.number()))
    .bind(academic_year)
    .bind(components.ca1)
    .bind(components.ca2)
    .bind(components.exam)
    .bind(source_key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn insert_attendance(
    pool: &PgPool,
    student_id: Uuid,
    term: AcademicTerm,
    academic_year: &str,
    tally: &AttendanceTally,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO school_portal.attendance_tallies
        (id, student_id, term, academic_year, present_days, late_days, absent_days, total_days, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(i16::from(term.number()))
    .bind(academic_year)
    .bind(i32::try_from(tally.present_days)?)
    .bind(i32::try_from(tally.late_days)?)
    .bind(i32::try_from(tally.absent_days)?)
    .bind(i32::try_from(tally.total_days)?)
    .bind(source_key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("5b1f0f52-8a3e-4d5c-9a61-0f2b7c1d9e01")?,
            "GSS/2023/001",
            "Adaeze Okafor",
        ),
        (
            Uuid::parse_str("a9c4e2d7-1b6f-4f38-8e2a-6d0c3b5f7a12")?,
            "GSS/2023/002",
            "Tunde Bakare",
        ),
        (
            Uuid::parse_str("e3d8b6a1-7c2f-4a9e-b5d4-2f1a8c6e0b23")?,
            "GSS/2023/003",
            "Halima Sani",
        ),
        (
            Uuid::parse_str("0f6a3c9e-4d1b-48e7-a2c5-9b8d7e6f5a34")?,
            "GSS/2023/004",
            "Chinedu Eze",
        ),
    ];

    // (ca1, ca2, exam) per subject, then (present, late, absent) out of 62 days.
    let marks = [
        ([(85.0, 90.0, 88.0), (78.0, 80.0, 74.0)], (58, 2, 2)),
        ([(60.0, 55.0, 62.0), (70.0, 65.0, 68.0)], (49, 4, 9)),
        ([(72.0, 75.0, 70.0), (88.0, 92.0, 81.0)], (55, 1, 6)),
        ([(40.0, 35.0, 42.0), (55.0, 50.0, 47.0)], (38, 6, 18)),
    ];
    let subjects = ["Mathematics", "English Language"];
    let term = AcademicTerm::First;
    let academic_year = "2024/2025";

    for ((id, admission_number, full_name), (subject_marks, days)) in
        students.into_iter().zip(marks)
    {
        let student_id = upsert_student(pool, id, admission_number, full_name, "JSS2").await?;

        for (subject, (ca1, ca2, exam)) in subjects.iter().zip(subject_marks) {
            let components = ScoreComponents::new(ca1, ca2, exam)?;
            let source_key = format!("seed-{admission_number}-{subject}-{academic_year}-1");
            insert_score(
                pool,
                student_id,
                subject,
                term,
                academic_year,
                &components,
                &source_key,
            )
            .await?;
        }

        let (present, late, absent) = days;
        let tally = AttendanceTally::new(present, late, absent, 62)?;
        let source_key = format!("seed-{admission_number}-attendance-{academic_year}-1");
        insert_attendance(pool, student_id, term, academic_year, &tally, &source_key).await?;
    }

    Ok(())
}

fn parse_term(raw: u8) -> anyhow::Result<AcademicTerm> {
    AcademicTerm::from_number(raw).with_context(|| format!("term must be 1, 2 or 3, not {raw}"))
}

struct StudentFields<'a> {
    admission_number: &'a str,
    full_name: &'a str,
    class_level: &'a str,
    academic_year: &'a str,
}

fn check_student_fields(fields: &StudentFields<'_>) -> anyhow::Result<&'static str> {
    if !validation::validate_admission_number(fields.admission_number) {
        bail!("invalid admission number {:?}", fields.admission_number);
    }
    if fields.full_name.trim().is_empty() {
        bail!("full_name must not be empty");
    }
    if !validation::validate_academic_year(fields.academic_year) {
        bail!("invalid academic year {:?}", fields.academic_year);
    }
    validation::normalize_class_level(fields.class_level)
        .with_context(|| format!("unknown class level {:?}", fields.class_level))
}

pub async fn import_scores_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        admission_number: String,
        full_name: String,
        class_level: String,
        subject: String,
        term: u8,
        academic_year: String,
        ca1: f64,
        ca2: f64,
        exam: f64,
        ca1_max: Option<f64>,
        ca2_max: Option<f64>,
        exam_max: Option<f64>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = result.with_context(|| format!("line {line}: malformed score row"))?;
        let class_level = check_student_fields(&StudentFields {
            admission_number: &row.admission_number,
            full_name: &row.full_name,
            class_level: &row.class_level,
            academic_year: &row.academic_year,
        })
        .with_context(|| format!("line {line}"))?;
        let term = parse_term(row.term).with_context(|| format!("line {line}"))?;
        let components = ScoreComponents::from_raw_marks(
            (row.ca1, row.ca1_max.unwrap_or(100.0)),
            (row.ca2, row.ca2_max.unwrap_or(100.0)),
            (row.exam, row.exam_max.unwrap_or(100.0)),
        )
        .with_context(|| format!("line {line}: invalid marks"))?;

        let student_id = upsert_student(
            pool,
            Uuid::new_v4(),
            row.admission_number.trim(),
            row.full_name.trim(),
            class_level,
        )
        .await?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_score(
            pool,
            student_id,
            row.subject.trim(),
            term,
            row.academic_year.trim(),
            &components,
            &source_key,
        )
        .await?
        {
            inserted += 1;
        }
    }

    tracing::info!(inserted, path = %csv_path.display(), "imported score records");
    Ok(inserted)
}

pub async fn import_attendance_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        admission_number: String,
        full_name: String,
        class_level: String,
        term: u8,
        academic_year: String,
        present_days: u32,
        late_days: u32,
        absent_days: u32,
        total_days: u32,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("line {line}: malformed attendance row"))?;
        let class_level = check_student_fields(&StudentFields {
            admission_number: &row.admission_number,
            full_name: &row.full_name,
            class_level: &row.class_level,
            academic_year: &row.academic_year,
        })
        .with_context(|| format!("line {line}"))?;
        let term = parse_term(row.term).with_context(|| format!("line {line}"))?;
        let tally = AttendanceTally::new(
            row.present_days,
            row.late_days,
            row.absent_days,
            row.total_days,
        )
        .with_context(|| format!("line {line}"))?;

        let student_id = upsert_student(
            pool,
            Uuid::new_v4(),
            row.admission_number.trim(),
            row.full_name.trim(),
            class_level,
        )
        .await?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_attendance(
            pool,
            student_id,
            term,
            row.academic_year.trim(),
            &tally,
            &source_key,
        )
        .await?
        {
            inserted += 1;
        }
    }

    tracing::info!(inserted, path = %csv_path.display(), "imported attendance tallies");
    Ok(inserted)
}

fn student_from_row(row: &PgRow) -> StudentRef {
    StudentRef {
        student_id: row.get("student_id"),
        admission_number: row.get("admission_number"),
        full_name: row.get("full_name"),
        class_level: row.get("class_level"),
    }
}

fn term_from_row(row: &PgRow) -> anyhow::Result<AcademicTerm> {
    let raw: i16 = row.get("term");
    let number = u8::try_from(raw).with_context(|| format!("stored term {raw} out of range"))?;
    parse_term(number)
}

fn score_from_row(row: &PgRow, rules: &Rules) -> anyhow::Result<StudentScore> {
    let components = ScoreComponents::new(row.get("ca1"), row.get("ca2"), row.get("exam"))
        .context("stored marks no longer valid")?;
    Ok(StudentScore {
        student: student_from_row(row),
        subject: row.get("subject"),
        term: term_from_row(row)?,
        academic_year: row.get("academic_year"),
        record: ScoreRecord::from_components(components, &rules.weights)?,
    })
}

const SCORE_COLUMNS: &str = "SELECT st.id AS student_id, st.admission_number, st.full_name, \
     st.class_level, sr.subject, sr.term, sr.academic_year, sr.ca1, sr.ca2, sr.exam \
     FROM school_portal.score_records sr \
     JOIN school_portal.students st ON st.id = sr.student_id";

/// Every score a student holds in one subject for one term, across academic years.
pub async fn get_scores(
    pool: &PgPool,
    rules: &Rules,
    student_id: Uuid,
    subject: &str,
    term: AcademicTerm,
) -> anyhow::Result<Vec<StudentScore>> {
    let query = format!(
        "{SCORE_COLUMNS} WHERE sr.student_id = $1 AND sr.subject = $2 AND sr.term = $3 \
         ORDER BY sr.academic_year"
    );
    let rows = sqlx::query(&query)
        .bind(student_id)
        .bind(subject)
        .bind(i16::from(term.number()))
        .fetch_all(pool)
        .await?;
    rows.iter().map(|row| score_from_row(row, rules)).collect()
}

pub async fn fetch_class_scores(
    pool: &PgPool,
    rules: &Rules,
    scope: &CohortScope,
    subject: Option<&str>,
) -> anyhow::Result<Vec<StudentScore>> {
    let mut query = format!(
        "{SCORE_COLUMNS} WHERE st.class_level = $1 AND sr.term = $2 AND sr.academic_year = $3"
    );
    if subject.is_some() {
        query.push_str(" AND sr.subject = $4");
    }
    query.push_str(" ORDER BY st.full_name, sr.subject");

    let mut rows = sqlx::query(&query)
        .bind(&scope.class_level)
        .bind(i16::from(scope.term.number()))
        .bind(&scope.academic_year);
    if let Some(value) = subject {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    records.iter().map(|row| score_from_row(row, rules)).collect()
}

pub async fn fetch_class_attendance(
    pool: &PgPool,
    scope: &CohortScope,
) -> anyhow::Result<Vec<StudentAttendance>> {
    let records = sqlx::query(
        "SELECT st.id AS student_id, st.admission_number, st.full_name, st.class_level, \
         att.present_days, att.late_days, att.absent_days, att.total_days \
         FROM school_portal.attendance_tallies att \
         JOIN school_portal.students st ON st.id = att.student_id \
         WHERE st.class_level = $1 AND att.term = $2 AND att.academic_year = $3 \
         ORDER BY st.full_name",
    )
    .bind(&scope.class_level)
    .bind(i16::from(scope.term.number()))
    .bind(&scope.academic_year)
    .fetch_all(pool)
    .await?;

    let mut attendance = Vec::with_capacity(records.len());
    for row in records {
        let days = |column: &str| -> anyhow::Result<u32> {
            let value: i32 = row.get(column);
            u32::try_from(value).with_context(|| format!("negative {column} stored"))
        };
        let tally = AttendanceTally::new(
            days("present_days")?,
            days("late_days")?,
            days("absent_days")?,
            days("total_days")?,
        )?;
        attendance.push(StudentAttendance {
            student: student_from_row(&row),
            tally,
        });
    }

    Ok(attendance)
}
