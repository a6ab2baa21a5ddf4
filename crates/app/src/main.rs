use std::fmt;
use std::sync::Arc;

use dioxus::LaunchBuilder;
use dioxus::desktop::{Config as DesktopConfig, WindowBuilder};
use exam_core::model::ExamId;
use services::{BackendConfig, Clock, ExamSessionService, HttpExamApi, SessionConfig};
use storage::repository::Storage;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use ui::{App, UiApp, build_app_context};
use url::Url;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidExamId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidApiUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidExamId { raw } => write!(f, "invalid --exam-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidApiUrl { raw } => write!(f, "invalid --api value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct DesktopApp {
    launch_exam_id: Option<ExamId>,
    exam_sessions: Arc<ExamSessionService>,
}

impl UiApp for DesktopApp {
    fn launch_exam_id(&self) -> Option<ExamId> {
        self.launch_exam_id
    }

    fn exam_sessions(&self) -> Arc<ExamSessionService> {
        Arc::clone(&self.exam_sessions)
    }
}

struct Args {
    db_url: String,
    exam_id: Option<ExamId>,
    api_url: Option<Url>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--exam-id <id>] [--api <url>] [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --api http://127.0.0.1:8000/");
    eprintln!("  --db sqlite:exam-state.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_ID, EXAM_API_BASE_URL, EXAM_DB_URL, EXAM_API_TOKEN, EXAM_CSRF_TOKEN,");
    eprintln!("  EXAM_WARNING_SECS, EXAM_REQUEST_TIMEOUT_SECS, RUST_LOG");
}

fn parse_exam_id(raw: String) -> Result<ExamId, ArgsError> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(ExamId::new(id)),
        _ => Err(ArgsError::InvalidExamId { raw }),
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EXAM_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| normalize_sqlite_url("sqlite:exam-state.sqlite3".into()), normalize_sqlite_url);
        let mut exam_id = match std::env::var("EXAM_ID") {
            Ok(value) if !value.trim().is_empty() => Some(parse_exam_id(value)?),
            _ => None,
        };
        let mut api_url = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--exam-id" => {
                    exam_id = Some(parse_exam_id(require_value(args, "--exam-id")?)?);
                }
                "--api" => {
                    let value = require_value(args, "--api")?;
                    let parsed =
                        Url::parse(value.trim()).map_err(|_| ArgsError::InvalidApiUrl { raw: value })?;
                    api_url = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            exam_id,
            api_url,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info,storage=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mut argv = std::env::args().skip(1);
    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let mut backend = BackendConfig::from_env()?;
    if let Some(api_url) = parsed.api_url {
        backend = backend.with_base_url(api_url);
    }
    let session_config = SessionConfig::from_env()?;
    tracing::info!(
        api = %backend.base_url,
        db = %parsed.db_url,
        timeout_secs = backend.request_timeout.map(|t| t.as_secs()),
        "starting exam client"
    );
    if backend.request_timeout.is_none() {
        tracing::warn!("no request timeout configured; a stalled backend leaves the exam waiting");
    }

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    let api = HttpExamApi::new(backend)?;
    let exam_sessions = Arc::new(
        ExamSessionService::new(Clock::system(), Arc::new(api), Arc::clone(&storage.local_state))
            .with_config(session_config),
    );

    let app: Arc<dyn UiApp> = Arc::new(DesktopApp {
        launch_exam_id: parsed.exam_id,
        exam_sessions,
    });
    let context = build_app_context(&app);

    // On macOS, Dioxus/tao can default to an always-on-top window in some dev setups.
    // Explicitly disable it so the app doesn't behave like a modal window.
    let desktop_cfg = DesktopConfig::new().with_window(
        WindowBuilder::new()
            .with_title("Exams")
            .with_always_on_top(false),
    );

    LaunchBuilder::desktop()
        .with_cfg(desktop_cfg)
        .with_context(context)
        .launch(App);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&["--exam-id", "42", "--api", "https://school.example/", "--db", "sqlite::memory:"]).unwrap();
        assert_eq!(args.exam_id, Some(ExamId::new(42)));
        assert_eq!(args.api_url.unwrap().as_str(), "https://school.example/");
        assert_eq!(args.db_url, "sqlite::memory:");
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(matches!(parse(&["--exam-id", "zero"]), Err(ArgsError::InvalidExamId { .. })));
        assert!(matches!(parse(&["--exam-id", "0"]), Err(ArgsError::InvalidExamId { .. })));
        assert!(matches!(parse(&["--api", "nope"]), Err(ArgsError::InvalidApiUrl { .. })));
        assert!(matches!(parse(&["--db"]), Err(ArgsError::MissingValue { flag: "--db" })));
        assert!(matches!(parse(&["--verbose"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:state/exam.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("state/exam.sqlite3"));
    }
}
