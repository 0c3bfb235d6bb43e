//! Purpose: `unitlib` CLI entry point.
//! Role: Binary crate root; parses args, installs logging, runs commands, emits JSON on stdout.
//! Invariants: Results are JSON on stdout; errors are JSON on stderr unless stderr is a TTY.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Every command runs against one fresh `Session`; nothing persists but files.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use unitlib::api::{Error, ErrorKind, SearchConfig, to_exit_code};
use unitlib::notice::{Notice, notice_json};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `unitlib --help` for usage."));
            }
        },
    };

    init_tracing();

    let mut config = SearchConfig::from_env();
    if let Some(dir) = cli.dir {
        config.work_dir = dir;
    }
    let options = command_dispatch::LookupOptions {
        search: cli.search,
        verbose: cli.verbose,
    };

    command_dispatch::dispatch_command(cli.command, config, options)
        .map_err(add_corrupt_hint)
        .map_err(add_io_hint)
}

#[derive(Parser)]
#[command(
    name = "unitlib",
    version,
    about = "Inspect and edit directory-backed libraries of compiled units",
    long_about = None,
    after_help = r#"EXAMPLES
  $ unitlib lib create work
  $ unitlib put work '{"ident": "WORK.TOP", "kind": "entity"}'
  $ unitlib get work WORK.TOP
  $ unitlib --search lib units ieee
  $ unitlib lib destroy work

NOTES
  - A library is a directory holding a _NVC_LIB marker and one file per unit
  - --search also probes NVC_LIBPATH (colon-separated) and the data directory
  - Set RUST_LOG=debug to trace probes, loads, and writes"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Directory for new libraries and first search base (default: .)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Also search NVC_LIBPATH and the installed data directory"
    )]
    search: bool,
    #[arg(
        short,
        long,
        global = true,
        help = "List every searched directory when a library is missing"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(arg_required_else_help = true, about = "Manage library directories")]
    Lib {
        #[command(subcommand)]
        command: LibCommand,
    },
    #[command(
        arg_required_else_help = true,
        about = "Store a unit in a library and save it",
        after_help = r#"EXAMPLES
  $ unitlib put work '{"ident": "ENTITY_A", "kind": "entity", "attrs": {"ports": 2}}'"#
    )]
    Put {
        #[arg(help = "Library name")]
        library: String,
        #[arg(help = "Unit JSON object with an \"ident\" string")]
        unit: String,
    },
    #[command(arg_required_else_help = true, about = "Fetch one unit by identifier")]
    Get {
        #[arg(help = "Library name")]
        library: String,
        #[arg(help = "Unit identifier (exact filename inside the library)")]
        ident: String,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    #[command(about = "Print version info as JSON")]
    Version,
}

#[derive(Subcommand)]
enum LibCommand {
    #[command(arg_required_else_help = true, about = "Create new libraries under --dir")]
    Create {
        #[arg(required = true, help = "Library names")]
        names: Vec<String>,
    },
    #[command(arg_required_else_help = true, about = "Locate a library and print its path")]
    Find {
        #[arg(help = "Library name")]
        name: String,
    },
    #[command(arg_required_else_help = true, about = "Load and list every unit in a library")]
    Units {
        #[arg(help = "Library name")]
        name: String,
    },
    #[command(arg_required_else_help = true, about = "Delete libraries and their contents")]
    Destroy {
        #[arg(required = true, help = "Library names")]
        names: Vec<String>,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .next()
        .map(|line| line.trim_start_matches("error: ").to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Permission => err.with_hint(
            "Permission denied. Check directory permissions or use --dir to a writable location.",
        ),
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and disk space."),
        ErrorKind::NotFound if !err.searched().is_empty() => err.with_hint(
            "Create it with `unitlib lib create <name>`, or pass --search to probe NVC_LIBPATH.",
        ),
        _ => err,
    }
}

fn add_corrupt_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Corrupt || err.hint().is_some() {
        return err;
    }
    err.with_hint("Library directory or unit file is damaged. Recreate the library from sources.")
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if !err.searched().is_empty() {
        let searched = err
            .searched()
            .iter()
            .map(|base| base.display().to_string())
            .collect::<Vec<_>>();
        inner.insert("searched".to_string(), json!(searched));
    }
    json!({ "error": Value::Object(inner) })
}

fn error_message(err: &Error) -> String {
    let mut message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()));
    if let Some(source) = std::error::Error::source(err) {
        message.push_str(&format!(": {source}"));
    }
    message
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {}", error_message(err));
        if let Some(path) = err.path() {
            eprintln!("  path: {}", path.display());
        }
        if let Some(hint) = err.hint() {
            eprintln!("  hint: {hint}");
        }
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn emit_notice(notice: &Notice) {
    if io::stderr().is_terminal() {
        eprintln!("notice: {}", notice.message);
        if let Some(Value::Array(bases)) = notice.details.get("searched") {
            for base in bases {
                eprintln!("  {}", base.as_str().unwrap_or_default());
            }
        }
        return;
    }

    let json = serde_json::to_string(&notice_json(notice)).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}
