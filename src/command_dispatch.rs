//! Purpose: Hold top-level CLI command dispatch for `unitlib`.
//! Exports: `dispatch_command`, `LookupOptions`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Units written by `put` are saved before the command returns.
//! Invariants: A verbose failed lookup emits one search notice before the error.

use super::*;

use unitlib::api::{FindOptions, Ident, Library, Session, Tree, Unit};
use unitlib::notice::search_notice;

#[derive(Copy, Clone, Debug)]
pub(super) struct LookupOptions {
    pub(super) search: bool,
    pub(super) verbose: bool,
}

pub(super) fn dispatch_command(
    command: Command,
    config: SearchConfig,
    options: LookupOptions,
) -> Result<RunOutcome, Error> {
    let mut session: Session<Tree> = Session::new(config);
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "unitlib", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_json(json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }));
            Ok(RunOutcome::ok())
        }
        Command::Lib { command } => dispatch_lib(command, &mut session, options),
        Command::Put { library, unit } => {
            let value: Value = serde_json::from_str(&unit).map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message("unit is not valid JSON")
                    .with_source(err)
            })?;
            let tree = Tree::from_json(value)?;
            let ident = tree.ident().clone();

            let lib = find_library(&mut session, &library, options, "put")?;
            lib.put(tree);
            let written = lib.save()?;
            emit_json(json!({
                "library": lib.name().as_str(),
                "unit": ident.as_str(),
                "path": display_path(lib.file_path(Some(ident.as_str()))),
                "written": written,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Get { library, ident } => {
            let lib = find_library(&mut session, &library, options, "get")?;
            let name = lib.name().clone();
            let ident = Ident::new(ident);
            let tree = lib.get(&ident)?.ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message(format!("unit {ident} not found in library {name}"))
            })?;
            emit_json(tree.to_json()?);
            Ok(RunOutcome::ok())
        }
    }
}

fn dispatch_lib(
    command: LibCommand,
    session: &mut Session<Tree>,
    options: LookupOptions,
) -> Result<RunOutcome, Error> {
    match command {
        LibCommand::Create { names } => {
            let mut created = Vec::new();
            for name in names {
                let lib = session.create(&name)?;
                created.push(library_json(lib));
            }
            emit_json(json!({ "created": created }));
            Ok(RunOutcome::ok())
        }
        LibCommand::Find { name } => {
            let lib = find_library(session, &name, options, "lib find")?;
            emit_json(library_json(lib));
            Ok(RunOutcome::ok())
        }
        LibCommand::Units { name } => {
            let lib = find_library(session, &name, options, "lib units")?;
            lib.load_all()?;
            let units = lib
                .iter()
                .map(|entry| {
                    json!({
                        "ident": entry.unit().ident().as_str(),
                        "kind": entry.unit().kind,
                        "dirty": entry.is_dirty(),
                    })
                })
                .collect::<Vec<_>>();
            let mut value = library_json(lib);
            value["units"] = Value::Array(units);
            emit_json(value);
            Ok(RunOutcome::ok())
        }
        LibCommand::Destroy { names } => {
            let mut destroyed = Vec::new();
            let mut failures = 0;
            for name in names {
                let lib = find_library(session, &name, options, "lib destroy")?;
                let path = display_path(lib.file_path(None));
                let report = session.destroy(&name)?;
                failures += report.failures;
                destroyed.push(json!({
                    "library": Ident::upcase(&name).as_str(),
                    "path": path,
                    "removed": report.removed,
                    "failures": report.failures,
                }));
            }
            emit_json(json!({ "destroyed": destroyed }));
            let exit_code = if failures > 0 {
                to_exit_code(ErrorKind::Io)
            } else {
                0
            };
            Ok(RunOutcome::with_code(exit_code))
        }
    }
}

fn find_library<'a>(
    session: &'a mut Session<Tree>,
    name: &str,
    options: LookupOptions,
    cmd: &str,
) -> Result<&'a mut Library<Tree>, Error> {
    let find = FindOptions {
        search: options.search,
        verbose: false,
    };
    match session.find(name, find) {
        Ok(lib) => Ok(lib),
        Err(err) => {
            if options.verbose && err.kind() == ErrorKind::NotFound {
                let time = notice_time_now().unwrap_or_default();
                emit_notice(&search_notice(cmd, name, time, err.searched()));
            }
            Err(err)
        }
    }
}

fn library_json(lib: &Library<Tree>) -> Value {
    json!({
        "library": lib.name().as_str(),
        "path": display_path(lib.file_path(None)),
    })
}

fn display_path(path: Option<PathBuf>) -> Value {
    match path {
        Some(path) => json!(path.display().to_string()),
        None => Value::Null,
    }
}
