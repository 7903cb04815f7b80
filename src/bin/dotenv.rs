use std::env;
use std::ffi::{OsStr, OsString};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{self, Command};

use envline::{DotEnv, EnvStore, Error, is_portable_key, is_portable_var};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
dotenv - inspect dotenv files and run commands with their variables

Usage:
  dotenv run [OPTIONS] [--] COMMAND [ARGS...]
  dotenv get [OPTIONS] KEY
  dotenv list [OPTIONS]
  dotenv --help
  dotenv --version

Commands:
  run       Load a dotenv file and execute a command
  get       Print the value of one key
  list      Print all entries as KEY=VALUE in file order

Options:
  -f, --file <PATH>       Dotenv file path. Defaults to .env in the current
                          directory.
  -v, --verbose           Print loader diagnostics to stderr.
  -h, --help              Show this help text.

Variables already set in the environment are never overridden.
";

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliCommand {
    Help,
    Run(RunOptions),
    Get { options: FileOptions, key: String },
    List(FileOptions),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FileOptions {
    file: Option<PathBuf>,
    verbose: bool,
}

impl FileOptions {
    fn loader(&self) -> DotEnv {
        match &self.file {
            Some(path) => DotEnv::new(path),
            None => DotEnv::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RunOptions {
    file: FileOptions,
    command: OsString,
    args: Vec<OsString>,
}

fn main() {
    process::exit(run(env::args_os()));
}

fn run(args: impl IntoIterator<Item = OsString>) -> i32 {
    let mut args = args.into_iter();
    let _bin = args.next();

    let Some(subcommand) = args.next() else {
        print_help();
        return 0;
    };

    let subcommand = subcommand.to_string_lossy().into_owned();
    if matches!(subcommand.as_str(), "-V" | "--version" | "version") {
        print_version();
        return 0;
    }

    let command = match parse_command(&subcommand, args.collect()) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("dotenv: {err}");
            eprintln!("Try `dotenv --help`.");
            return 1;
        }
    };

    match command {
        CliCommand::Help => {
            print_help();
            0
        }
        CliCommand::Run(options) => {
            init_tracing(options.file.verbose);
            report(execute_run(options))
        }
        CliCommand::Get { options, key } => {
            init_tracing(options.verbose);
            report(execute_get(&options, &key))
        }
        CliCommand::List(options) => {
            init_tracing(options.verbose);
            report(execute_list(&options))
        }
    }
}

fn parse_command(subcommand: &str, args: Vec<OsString>) -> Result<CliCommand, String> {
    match subcommand {
        "-h" | "--help" | "help" => Ok(CliCommand::Help),
        "run" => {
            let Some((options, rest)) = parse_file_options(&args)? else {
                return Ok(CliCommand::Help);
            };
            let Some((command, command_args)) = rest.split_first() else {
                return Err("missing command after `run`".to_owned());
            };
            Ok(CliCommand::Run(RunOptions {
                file: options,
                command: command.clone(),
                args: command_args.to_vec(),
            }))
        }
        "get" => {
            let Some((options, rest)) = parse_file_options(&args)? else {
                return Ok(CliCommand::Help);
            };
            match rest {
                [key] => Ok(CliCommand::Get {
                    options,
                    key: key.to_string_lossy().into_owned(),
                }),
                [] => Err("missing key after `get`".to_owned()),
                _ => Err("`get` takes exactly one key".to_owned()),
            }
        }
        "list" => {
            let Some((options, rest)) = parse_file_options(&args)? else {
                return Ok(CliCommand::Help);
            };
            if let Some(extra) = rest.first() {
                return Err(format!(
                    "unexpected argument `{}` after `list`",
                    extra.to_string_lossy()
                ));
            }
            Ok(CliCommand::List(options))
        }
        unknown => Err(format!("unknown subcommand `{unknown}`")),
    }
}

/// Parse leading options. Returns `None` when help was requested, otherwise
/// the options and the remaining positional arguments.
fn parse_file_options(args: &[OsString]) -> Result<Option<(FileOptions, &[OsString])>, String> {
    let mut options = FileOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        if let Some(path) = strip_os_prefix(&args[index], "--file=") {
            options.file = Some(PathBuf::from(path));
            index += 1;
            continue;
        }

        let token = args[index].to_string_lossy();
        match token.as_ref() {
            "--" => {
                index += 1;
                break;
            }
            "-h" | "--help" => return Ok(None),
            "-f" | "--file" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    return Err("missing value for `-f/--file`".to_owned());
                };
                options.file = Some(PathBuf::from(value));
                index += 1;
            }
            "-v" | "--verbose" => {
                options.verbose = true;
                index += 1;
            }
            unknown if unknown.starts_with('-') && unknown.len() > 1 => {
                return Err(format!("unknown option `{unknown}`"));
            }
            _ => break,
        }
    }

    Ok(Some((options, &args[index..])))
}

/// Strip an ASCII `prefix` from `arg` without a lossy UTF-8 round trip.
fn strip_os_prefix<'a>(arg: &'a OsStr, prefix: &str) -> Option<&'a OsStr> {
    let rest = arg.as_encoded_bytes().strip_prefix(prefix.as_bytes())?;
    // SAFETY: `rest` starts right after the UTF-8 text `prefix`, which is a
    // valid split point for encoded bytes.
    Some(unsafe { OsStr::from_encoded_bytes_unchecked(rest) })
}

fn execute_run(options: RunOptions) -> Result<i32, String> {
    let loader = options.file.loader();
    let mut command = Command::new(&options.command);
    command.args(&options.args);

    let mut child_env = ChildEnv {
        command: &mut command,
    };
    loader.publish_to(&mut child_env).map_err(format_error)?;

    execute_command(command, &options.command)
}

fn execute_get(options: &FileOptions, key: &str) -> Result<i32, String> {
    let loader = options.loader();
    match loader.get(key).map_err(format_error)? {
        Some(value) => {
            println!("{value}");
            Ok(0)
        }
        None => Ok(1),
    }
}

fn execute_list(options: &FileOptions) -> Result<i32, String> {
    let loader = options.loader();
    for entry in loader.parsed().map_err(format_error)? {
        println!("{}={}", entry.key, entry.value);
    }
    Ok(0)
}

/// Environment of the child process: the inherited process environment plus
/// whatever the loader publishes on top of it.
struct ChildEnv<'a> {
    command: &'a mut Command,
}

impl EnvStore for ChildEnv<'_> {
    fn get(&self, key: &str) -> Option<String> {
        if !is_portable_key(key) {
            return None;
        }
        env::var_os(key).map(|value| value.to_string_lossy().into_owned())
    }

    fn set(&mut self, key: &str, value: &str) -> bool {
        if !is_portable_var(key, value) {
            tracing::warn!(key, "key or value cannot be passed to the child process");
            return false;
        }
        self.command.env(key, value);
        true
    }
}

#[cfg(unix)]
fn execute_command(mut command: Command, program: &OsString) -> Result<i32, String> {
    let err = command.exec();
    Err(format!(
        "failed to execute `{}`: {err}",
        program.to_string_lossy()
    ))
}

#[cfg(not(unix))]
fn execute_command(mut command: Command, program: &OsString) -> Result<i32, String> {
    let status = command
        .status()
        .map_err(|err| format!("failed to execute `{}`: {err}", program.to_string_lossy()))?;
    Ok(status.code().unwrap_or(1))
}

fn report(result: Result<i32, String>) -> i32 {
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("dotenv: {err}");
            1
        }
    }
}

fn format_error(err: Error) -> String {
    err.to_string()
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_help() {
    println!("{HELP}");
}

fn print_version() {
    println!("dotenv {}", env!("CARGO_PKG_VERSION"));
}
