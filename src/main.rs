use household_inventory::config::Config;
use household_inventory::db::memory::MemoryStore;
use household_inventory::db::pg::PgStore;
use household_inventory::models::inventory::{Actor, HouseholdId, UserId};
use household_inventory::services::demo;
use household_inventory::{Inventory, InventoryStore, RealtimeBus};
use log::{error, info, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const DEMO_FOUNDER: UserId = UserId(1);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Migrate,
    SeedDemo { dry_run: bool },
    Purge { household_id: HouseholdId, admin_id: UserId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cli {
    env_file: Option<PathBuf>,
    command: Command,
}

fn parse_cli(args: impl IntoIterator<Item = OsString>) -> Result<Cli, String> {
    let mut env_file: Option<PathBuf> = None;
    let mut words: Vec<String> = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let arg = arg
            .into_string()
            .map_err(|_| "argument contains invalid UTF-8".to_string())?;
        let path = if arg == "--env-file" {
            Some(PathBuf::from(
                args.next()
                    .ok_or_else(|| "`--env-file` requires a path argument".to_string())?,
            ))
        } else if let Some(value) = arg.strip_prefix("--env-file=") {
            if value.is_empty() {
                return Err("`--env-file` requires a path argument".to_string());
            }
            Some(PathBuf::from(value))
        } else {
            words.push(arg);
            None
        };
        if let Some(path) = path
            && env_file.replace(path).is_some()
        {
            return Err("`--env-file` provided more than once".to_string());
        }
    }

    let id = |raw: Option<&String>, what: &str| -> Result<i64, String> {
        let raw = raw.ok_or_else(|| format!("missing {}", what))?;
        raw.parse::<i64>().map_err(|_| format!("{} must be an integer, got {:?}", what, raw))
    };
    let command = match words.first().map(String::as_str) {
        None => Command::Migrate,
        Some("migrate") if words.len() == 1 => Command::Migrate,
        Some("seed-demo") => match words.get(1).map(String::as_str) {
            None => Command::SeedDemo { dry_run: false },
            Some("--dry-run") if words.len() == 2 => Command::SeedDemo { dry_run: true },
            Some(other) => return Err(format!("unrecognised argument: {}", other)),
        },
        Some("purge") if words.len() == 3 => Command::Purge {
            household_id: HouseholdId(id(words.get(1), "household id")?),
            admin_id: UserId(id(words.get(2), "admin user id")?),
        },
        Some("purge") => return Err("usage: purge <household-id> <admin-user-id>".to_string()),
        Some(other) => return Err(format!("unrecognised argument: {}", other)),
    };
    Ok(Cli { env_file, command })
}

/// Load `path`, or `./.env` when no path was given. Returns the file actually read.
fn load_environment(path: Option<&Path>) -> Result<Option<PathBuf>, String> {
    let path = match path {
        Some(p) if p.is_file() => p.to_path_buf(),
        Some(p) => return Err(format!("env file not found: {}", p.display())),
        None => {
            let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
            let candidate = cwd.join(".env");
            if !candidate.is_file() {
                return Ok(None);
            }
            candidate
        }
    };
    let text = std::fs::read_to_string(&path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    for (key, value) in parse_env_text(&text).map_err(|e| format!("{}:{}", path.display(), e))? {
        // Variables already present in the process environment win.
        if std::env::var_os(&key).is_none() {
            // Mutating the process environment is unsafe while other threads may read it.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
    Ok(Some(path))
}

/// `KEY=value` lines with optional `export`, `#` comments and single or double quotes.
fn parse_env_text(text: &str) -> Result<Vec<(String, String)>, String> {
    let mut out = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").map_or(line, str::trim_start);
        let (key, raw) = line
            .split_once('=')
            .ok_or_else(|| format!("{}: missing '=' in assignment", index + 1))?;
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(format!("{}: invalid variable name {:?}", index + 1, key));
        }
        let value = env_value(raw.trim()).map_err(|e| format!("{}: {}", index + 1, e))?;
        out.push((key.to_string(), value));
    }
    Ok(out)
}

fn env_value(raw: &str) -> Result<String, String> {
    let Some(quote) = raw.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        let bare = raw.split('#').next().unwrap_or_default();
        return Ok(bare.trim_end().to_string());
    };

    let mut value = String::new();
    let mut chars = raw[1..].chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if quote == '"' => match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some('r') => value.push('\r'),
                Some(other) => value.push(other),
                None => return Err("unterminated escape sequence".to_string()),
            },
            c if c == quote => {
                let rest = chars.as_str().trim();
                return if rest.is_empty() || rest.starts_with('#') {
                    Ok(value)
                } else {
                    Err(format!("unexpected characters after closing {}", quote))
                };
            }
            c => value.push(c),
        }
    }
    Err(format!("unterminated {} quoted value", quote))
}

fn seed_demo<S: InventoryStore>(inventory: &mut Inventory<S>) -> Result<(), String> {
    let summary = demo::run(inventory, DEMO_FOUNDER).map_err(|e| format!("demo seed failed: {}", e))?;
    if let Some(id) = summary.household_id {
        info!("Demo household {} ready", id);
    }
    Ok(())
}

fn run(command: Command) -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (realtime_buffer={}, activity_feed_limit={}, allow_data_purge={})",
        cfg.realtime_buffer, cfg.activity_feed_limit, cfg.allow_data_purge
    );
    let bus = RealtimeBus::new(cfg.realtime_buffer);

    if command == (Command::SeedDemo { dry_run: true }) {
        let mut inventory = Inventory::new(MemoryStore::new(), bus).with_options(cfg.inventory_options());
        return seed_demo(&mut inventory);
    }

    // 2) Connect DB and apply pending migrations
    let mut store = PgStore::connect(&cfg.database_url).map_err(|e| format!("DB connection failed: {}", e))?;
    info!("Connected to database");
    store.run_migrations().map_err(|e| e.to_string())?;

    // 3) Command
    let mut inventory = Inventory::new(store, bus).with_options(cfg.inventory_options());
    match command {
        Command::Migrate => Ok(()),
        Command::SeedDemo { .. } => seed_demo(&mut inventory),
        Command::Purge { household_id, admin_id } => {
            let member = inventory
                .store_mut()
                .list_members(household_id)
                .map_err(|e| e.to_string())?
                .into_iter()
                .find(|m| m.user_id == admin_id)
                .ok_or_else(|| format!("user {} is not a member of household {}", admin_id, household_id))?;
            let actor = Actor::new(member.user_id, household_id, member.role);
            if !cfg.allow_data_purge {
                warn!("ALLOW_DATA_PURGE is not set; the purge will be refused");
            }
            let counts = inventory
                .purge_household(&actor)
                .map_err(|e| format!("purge of household {} failed: {}", household_id, e))?;
            info!("Purged household {}: {:?}", household_id, counts);
            Ok(())
        }
    }
}

fn main() {
    let cli = match parse_cli(std::env::args_os().skip(1)) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(2);
        }
    };
    let loaded_env = match load_environment(cli.env_file.as_deref()) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(path) = loaded_env.as_ref() {
        let origin = if cli.env_file.is_some() { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, path.display());
    }

    info!(
        "household-inventory {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(cli.command) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
