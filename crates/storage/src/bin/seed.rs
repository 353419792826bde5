use std::fmt;

use pulse_core::model::{Challenge, Path, PathId};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("PULSE_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    db_url = args.next().ok_or(ArgsError::MissingValue { flag: "--db" })?;
                }
                other => return Err(ArgsError::UnknownArg(other.to_owned())),
            }
        }

        Ok(Self { db_url })
    }
}

fn demo_path(id: &str, name: &str, difficulty: &str, tags: &[&str]) -> Path {
    let challenges = (1..=5)
        .map(|day| {
            Challenge::new(
                day,
                format!("{name}, day {day}: reproduce the expected output"),
                format!("{id}-day-{day}"),
            )
            .expect("demo challenge is valid")
        })
        .collect();

    Path::new(
        PathId::new(id).expect("demo path id is valid"),
        name,
        Some(difficulty.to_owned()),
        tags.iter().map(ToString::to_string).collect(),
        challenges,
    )
    .expect("demo path is valid")
}

/// The demo catalog: three five-day paths. `ml-basics` is the one the
/// free-tier allow-list grants.
fn demo_catalog() -> Vec<Path> {
    vec![
        demo_path("ml-basics", "ML Basics", "beginner", &["ml", "foundations"]),
        demo_path("prompt-craft", "Prompt Craft", "intermediate", &["llm", "prompting"]),
        demo_path("agents-101", "Agents 101", "advanced", &["llm", "agents"]),
    ]
}

#[tokio::main]
async fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("seed: {err}");
            eprintln!("usage: seed [--db <sqlite-url>]");
            std::process::exit(2);
        }
    };

    let storage = match Storage::sqlite(&args.db_url).await {
        Ok(storage) => storage,
        Err(err) => {
            eprintln!("seed: failed to open {}: {err}", args.db_url);
            std::process::exit(1);
        }
    };

    for path in demo_catalog() {
        if let Err(err) = storage.paths.upsert_path(&path).await {
            eprintln!("seed: failed to upsert {}: {err}", path.id());
            std::process::exit(1);
        }
        println!(
            "seeded {} ({} challenges)",
            path.id(),
            path.challenge_count()
        );
    }
}
