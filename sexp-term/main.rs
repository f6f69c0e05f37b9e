//! Batch driver for the structural editing engine.
//!
//! Reads a file (or stdin), places the cursor, runs commands and key presses
//! against it and prints the result:
//!
//! ```text
//! sexp code.el --at 12 -c slurp -c raise:2 --show-cursor
//! echo '(a (b) c)' | sexp --at 3 -k '>r'
//! ```

mod log;

use std::{
  io::{
    Read,
    Write,
  },
  path::PathBuf,
  process::{
    Command as Process,
    Stdio,
  },
};

use clap::Parser;
use eyre::{
  Result,
  WrapErr,
};
use sexp_lib::{
  buffer::{
    Buffer,
    RopeBuffer,
  },
  command::{
    Command,
    Outcome,
  },
  config::Config,
  eval::{
    EvalError,
    Evaluator,
  },
  selector::NthSelector,
  session::{
    Collaborators,
    Session,
  },
  tags::{
    self,
    TagSource,
    TopLevelDefinitions,
  },
};

#[derive(Debug, Parser)]
#[command(name = "sexp")]
#[command(about = "Structural editing of lisp code from the command line")]
struct Cli {
  /// File to edit, stdin when omitted
  file: Option<PathBuf>,

  /// Cursor position, in characters
  #[arg(long, default_value_t = 0)]
  at: usize,

  /// Select `ANCHOR..HEAD` instead of placing a cursor
  #[arg(long, value_parser = parse_selection)]
  select: Option<(usize, usize)>,

  /// Command to run, `name` or `name:COUNT`; repeatable, run in order
  #[arg(short = 'c', long = "command", value_parser = parse_invocation)]
  commands: Vec<(Command, usize)>,

  /// Keys to press after the commands, through the keymap
  #[arg(short, long)]
  keys: Option<String>,

  /// Dialect used for config overrides and evaluation
  #[arg(long, default_value = "elisp")]
  dialect: String,

  /// Config file, instead of the one in the user config directory
  #[arg(long)]
  config: Option<PathBuf>,

  /// Candidate picked by commands that offer a choice (0-based)
  #[arg(long, default_value_t = 0)]
  choose: usize,

  /// Program evaluating forms: it reads one on stdin and prints the value
  #[arg(long)]
  eval_with: Option<String>,

  /// List the definitions in the input and exit
  #[arg(long)]
  tags: bool,

  /// Mark cursor and selection in the output
  #[arg(long)]
  show_cursor: bool,

  /// Write the result back to FILE
  #[arg(long, requires = "file")]
  in_place: bool,

  /// More logging on stderr; repeat for more
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn parse_selection(arg: &str) -> Result<(usize, usize), String> {
  let (anchor, head) = arg
    .split_once("..")
    .ok_or_else(|| format!("expected ANCHOR..HEAD, got {arg:?}"))?;
  let parse = |n: &str| n.trim().parse::<usize>().map_err(|err| format!("{n:?}: {err}"));
  Ok((parse(anchor)?, parse(head)?))
}

fn parse_invocation(arg: &str) -> Result<(Command, usize), String> {
  let (name, count) = match arg.split_once(':') {
    Some((name, count)) => {
      let count = count
        .parse::<usize>()
        .map_err(|err| format!("bad count {count:?}: {err}"))?;
      (name, count)
    },
    None => (arg, 1),
  };
  let command = name.parse::<Command>().map_err(|err| err.to_string())?;
  Ok((command, count))
}

/// Pipes the form into an external program.
struct ProcessEvaluator {
  program: String,
}

impl Evaluator for ProcessEvaluator {
  fn evaluate(&mut self, source: &str) -> sexp_lib::eval::Result<String> {
    let failed = |err: std::io::Error| EvalError::Failed(format!("{}: {err}", self.program));
    let mut child = Process::new("sh")
      .arg("-c")
      .arg(&self.program)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(failed)?;
    if let Some(mut stdin) = child.stdin.take() {
      stdin.write_all(source.as_bytes()).map_err(failed)?;
    }
    let output = child.wait_with_output().map_err(failed)?;
    if !output.status.success() {
      return Err(EvalError::Failed(
        String::from_utf8_lossy(&output.stderr).trim().to_string(),
      ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
  }
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
  match file {
    Some(path) => {
      std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))
    },
    None => {
      let mut text = String::new();
      std::io::stdin()
        .read_to_string(&mut text)
        .wrap_err("failed to read stdin")?;
      Ok(text)
    },
  }
}

fn report(what: &str, outcome: &Outcome) {
  match outcome {
    Outcome::Evaluated(value) => eprintln!("=> {value}"),
    Outcome::Moved(false) => tracing::info!(what, "did not move"),
    Outcome::Cancelled => tracing::info!(what, "cancelled"),
    _ => {},
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  log::init(cli.verbose);

  let config = Config::load(cli.config.as_deref()).wrap_err("failed to load config")?;
  let mut session = Session::new(&config, cli.dialect.as_str()).wrap_err("invalid keymap")?;
  if let Some(program) = &cli.eval_with {
    session.evaluators.register(
      cli.dialect.as_str(),
      Box::new(ProcessEvaluator {
        program: program.clone(),
      }),
    );
  }

  let text = read_input(cli.file.as_ref())?;
  let mut buffer = RopeBuffer::with_delimiters(&text, session.delimiters().clone());
  let mut definitions = TopLevelDefinitions::new(session.delimiters().clone());

  if cli.tags {
    let found = definitions.list_definitions(buffer.text());
    for label in tags::labels(
      &found,
      buffer.text(),
      session.delimiters(),
      &session.config.tag_arity,
    ) {
      println!("{label}");
    }
    return Ok(());
  }

  match cli.select {
    Some((anchor, head)) => buffer.set_selection(anchor, head),
    None => buffer.set_cursor(cli.at.min(buffer.len_chars())),
  }

  let mut selector = NthSelector(cli.choose);
  let mut collaborators = Collaborators::none()
    .with_selector(&mut selector)
    .with_tags(&mut definitions);

  for (command, count) in &cli.commands {
    let outcome = session
      .execute(&mut buffer, *command, *count, &mut collaborators)
      .wrap_err_with(|| format!("{command} failed"))?;
    report(command.name(), &outcome);
  }
  for key in cli.keys.as_deref().unwrap_or_default().chars() {
    let outcome = session
      .press(&mut buffer, key, 1, &mut collaborators)
      .wrap_err_with(|| format!("key {key:?} failed"))?;
    report("key", &outcome);
  }

  let output = if cli.show_cursor {
    buffer.render()
  } else {
    buffer.to_string()
  };
  match (&cli.file, cli.in_place) {
    (Some(path), true) => {
      std::fs::write(path, output).wrap_err_with(|| format!("failed to write {}", path.display()))?;
    },
    _ => print!("{output}"),
  }
  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn invocations_parse() {
    assert_eq!(parse_invocation("slurp"), Ok((Command::Slurp, 1)));
    assert_eq!(parse_invocation("raise:3"), Ok((Command::Raise, 3)));
    assert!(parse_invocation("raise:x").is_err());
    assert!(parse_invocation("nope").is_err());
  }

  #[test]
  fn selections_parse() {
    assert_eq!(parse_selection("3..7"), Ok((3, 7)));
    assert_eq!(parse_selection("7..3"), Ok((7, 3)));
    assert!(parse_selection("3-7").is_err());
  }

  #[test]
  fn cli_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
  }
}
