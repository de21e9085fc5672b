use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use school_rules::attendance::summarize_attendance;
use school_rules::calendar::AcademicTerm;
use school_rules::cohort::{compute_class_statistics_with, gpa_by_student};
use school_rules::config::{self, Rules};
use school_rules::models::{CohortScope, StudentScore};
use school_rules::scoring::compute_final_score_with;
use school_rules::subjects::categorize_subject;
use school_rules::validation;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

mod db;
mod report;

#[derive(Parser)]
#[command(name = "school-rules")]
#[command(about = "Grading, attendance and term-calendar rules for secondary school reporting", long_about = None)]
struct Cli {
    /// Rules file to use instead of ./school-rules.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct ScopeArgs {
    /// Class level, e.g. JSS2
    #[arg(long = "class")]
    class_level: String,
    /// Term number (1-3); defaults to the current term
    #[arg(long)]
    term: Option<u8>,
    /// Academic year such as 2024/2025; defaults to the current year
    #[arg(long)]
    year: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small sample class
    Seed,
    /// Import component marks from a CSV file
    ImportScores {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import attendance tallies from a CSV file
    ImportAttendance {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Write the default rules file to ./school-rules.toml
    ConfigInit,
    /// Resolve the grade for a score
    Grade {
        score: f64,
        /// Reject scores outside 0-100 instead of clamping them
        #[arg(long)]
        strict: bool,
    },
    /// Combine CA1, CA2 and exam marks into a final score
    Final {
        #[arg(long)]
        ca1: f64,
        #[arg(long)]
        ca2: f64,
        #[arg(long)]
        exam: f64,
    },
    /// Show the term and academic year for a date
    Term {
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Class statistics for one subject
    Stats {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        subject: String,
    },
    /// A student's scores in one subject and term across academic years
    History {
        #[arg(long)]
        student: uuid::Uuid,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        term: u8,
    },
    /// Grade point average for every student in a class
    Gpa {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Attendance bands for a class
    Attendance {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Generate a markdown class report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        subject: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("school_rules=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn resolve_scope(args: ScopeArgs, rules: &Rules) -> anyhow::Result<CohortScope> {
    let class_level = validation::normalize_class_level(&args.class_level)
        .with_context(|| format!("unknown class level {:?}", args.class_level))?
        .to_string();
    let today = rules.calendar.resolve(Utc::now().date_naive());
    let term = match args.term {
        Some(n) => AcademicTerm::from_number(n)
            .with_context(|| format!("term must be 1, 2 or 3, not {n}"))?,
        None => today.term,
    };
    let academic_year = args.year.unwrap_or(today.academic_year_label);
    if !validation::validate_academic_year(&academic_year) {
        anyhow::bail!("academic year must look like 2024/2025, not {academic_year:?}");
    }
    Ok(CohortScope {
        class_level,
        term,
        academic_year,
    })
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One JSON object per recorded score; an empty history is `[]`.
fn history_json(scores: &[StudentScore], rules: &Rules) -> serde_json::Value {
    scores
        .iter()
        .map(|s| {
            json!({
                "subject": s.subject,
                "term": s.term.number(),
                "academicYear": s.academic_year,
                "score": s.record.raw_score(),
                "components": s.record.components(),
                "grade": s.record.grade(&rules.grade_table).letter,
            })
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let rules = config::load_rules(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportScores { csv } => {
            let pool = connect().await?;
            let inserted = db::import_scores_csv(&pool, &csv).await?;
            println!("Inserted {inserted} score records from {}.", csv.display());
        }
        Commands::ImportAttendance { csv } => {
            let pool = connect().await?;
            let inserted = db::import_attendance_csv(&pool, &csv).await?;
            println!("Inserted {inserted} attendance tallies from {}.", csv.display());
        }
        Commands::ConfigInit => {
            let path = cwd.join(config::CONFIG_FILE_NAME);
            config::write_default_config(&path)?;
            println!("created {}", path.display());
        }
        Commands::Grade { score, strict } => {
            let band = if strict {
                rules.grade_table.resolve_strict(score)?
            } else {
                rules.grade_table.resolve(score)?
            };
            if cli.json {
                print_json(band)?;
            } else {
                println!(
                    "{score} -> {} ({}), {:.1} points",
                    band.letter, band.label, band.points
                );
            }
        }
        Commands::Final { ca1, ca2, exam } => {
            let score = compute_final_score_with(ca1, ca2, exam, &rules.weights)?;
            let band = rules.grade_table.resolve_strict(f64::from(score))?;
            if cli.json {
                print_json(&json!({ "score": score, "grade": band }))?;
            } else {
                println!("Final score {score}: {} ({})", band.letter, band.label);
            }
        }
        Commands::Term { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let resolution = rules.calendar.resolve(date);
            if cli.json {
                print_json(&resolution)?;
            } else {
                match &resolution.break_name {
                    Some(break_name) => println!(
                        "{date}: {} break after {}, {} session",
                        break_name, resolution.term, resolution.academic_year_label
                    ),
                    None => println!(
                        "{date}: {}, {} session",
                        resolution.term, resolution.academic_year_label
                    ),
                }
            }
        }
        Commands::Stats { scope, subject } => {
            let scope = resolve_scope(scope, &rules)?;
            let pool = connect().await?;
            let scores = db::fetch_class_scores(&pool, &rules, &scope, Some(&subject)).await?;
            let values: Vec<f64> = scores
                .iter()
                .map(|s| f64::from(s.record.raw_score()))
                .collect();
            let stats = compute_class_statistics_with(&values, &rules.grade_table).with_context(
                || {
                    format!(
                        "no {subject} scores for {} {} {}",
                        scope.class_level, scope.term, scope.academic_year
                    )
                },
            )?;

            if cli.json {
                print_json(&stats)?;
            } else {
                let category = categorize_subject(&subject)
                    .map(|c| c.name())
                    .unwrap_or("Uncategorized");
                println!(
                    "{} {} [{}] ({}, {}): {} students",
                    scope.class_level, subject, category, scope.term, scope.academic_year, stats.count
                );
                println!(
                    "average {:.1}, std dev {:.2}, median {:.1}, pass rate {:.1}%",
                    stats.average, stats.standard_deviation, stats.median, stats.pass_rate
                );
                for entry in &stats.distribution {
                    println!("- {}: {}", entry.letter, entry.count);
                }
            }
        }
        Commands::History {
            student,
            subject,
            term,
        } => {
            let term = AcademicTerm::from_number(term)
                .with_context(|| format!("term must be 1, 2 or 3, not {term}"))?;
            let pool = connect().await?;
            let scores = db::get_scores(&pool, &rules, student, &subject, term).await?;
            if cli.json {
                print_json(&history_json(&scores, &rules))?;
            } else if scores.is_empty() {
                println!("No {subject} scores recorded for this student in the {term}.");
            } else {
                println!("{} ({})", scores[0].student.full_name, scores[0].student.admission_number);
                for s in &scores {
                    let band = s.record.grade(&rules.grade_table);
                    println!(
                        "- {} {} {}: {} {} ({})",
                        s.academic_year,
                        s.term,
                        s.subject,
                        s.record.raw_score(),
                        band.letter,
                        band.label
                    );
                }
            }
        }
        Commands::Gpa { scope } => {
            let scope = resolve_scope(scope, &rules)?;
            let pool = connect().await?;
            let scores = db::fetch_class_scores(&pool, &rules, &scope, None).await?;

            let rows = gpa_by_student(&scores, &rules.grade_table)?;
            if cli.json {
                print_json(&rows)?;
            } else if rows.is_empty() {
                println!("No scores found for this class.");
            } else {
                for row in rows {
                    println!(
                        "- {} ({}): GPA {:.2} across {} subjects",
                        row.student.full_name,
                        row.student.admission_number,
                        row.gpa,
                        row.subjects.len()
                    );
                }
            }
        }
        Commands::Attendance { scope } => {
            let scope = resolve_scope(scope, &rules)?;
            let pool = connect().await?;
            let attendance = db::fetch_class_attendance(&pool, &scope).await?;
            let tallies: Vec<_> = attendance.iter().map(|a| a.tally).collect();
            let summary = summarize_attendance(&tallies, &rules.attendance).with_context(|| {
                format!(
                    "cannot summarize attendance for {} {} {}",
                    scope.class_level, scope.term, scope.academic_year
                )
            })?;

            if cli.json {
                print_json(&summary)?;
            } else {
                println!(
                    "{} ({}, {}): {:.1}% attendance across {} students",
                    scope.class_level,
                    scope.term,
                    scope.academic_year,
                    summary.overall_rate,
                    summary.students
                );
                for entry in &attendance {
                    match entry.tally.attendance_rate() {
                        Ok(rate) => println!(
                            "- {} {:.1}% {}",
                            entry.student.full_name,
                            rate,
                            rules.attendance.classify_rate(rate)
                        ),
                        Err(_) => println!("- {} no school days recorded", entry.student.full_name),
                    }
                }
                if summary.no_data > 0 {
                    println!("{} students have no attendance data", summary.no_data);
                }
            }
        }
        Commands::Report {
            scope,
            subject,
            out,
        } => {
            let scope = resolve_scope(scope, &rules)?;
            let pool = connect().await?;
            let scores = db::fetch_class_scores(&pool, &rules, &scope, Some(&subject)).await?;
            let attendance = db::fetch_class_attendance(&pool, &scope).await?;
            let report = report::build_class_report(&scope, &subject, &scores, &attendance, &rules);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use school_rules::models::StudentRef;
    use school_rules::scoring::{AssessmentWeights, ScoreComponents, ScoreRecord};
    use uuid::Uuid;

    #[test]
    fn empty_history_is_an_empty_json_array() {
        assert_eq!(history_json(&[], &Rules::default()), json!([]));
    }

    #[test]
    fn history_rows_carry_subject_and_grade() {
        let score = StudentScore {
            student: StudentRef {
                student_id: Uuid::new_v4(),
                admission_number: "GSS/2023/001".to_string(),
                full_name: "Adaeze Okafor".to_string(),
                class_level: "JSS2".to_string(),
            },
            subject: "Mathematics".to_string(),
            term: AcademicTerm::Second,
            academic_year: "2024/2025".to_string(),
            record: ScoreRecord::from_components(
                ScoreComponents::new(80.0, 80.0, 80.0).unwrap(),
                &AssessmentWeights::default(),
            )
            .unwrap(),
        };

        let value = history_json(&[score], &Rules::default());
        assert_eq!(value[0]["subject"], "Mathematics");
        assert_eq!(value[0]["term"], 2);
        assert_eq!(value[0]["score"], 80);
        assert_eq!(value[0]["grade"], "A1");
    }
}
