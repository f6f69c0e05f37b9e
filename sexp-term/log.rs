//! Logging setup for the driver.
//!
//! Filter priority: `SEXP_LOG` > `RUST_LOG` > the `-v` count. `SEXP_LOG`
//! accepts a bare level (`SEXP_LOG=debug`), which is applied to the sexp
//! crates only, or a full filter directive used as-is.

use std::env;

use tracing_subscriber::EnvFilter;

const CRATES: &[&str] = &["sexp_core", "sexp_lib", "sexp_term"];

pub fn init(verbosity: u8) {
  tracing_subscriber::fmt()
    .with_env_filter(create_filter(verbosity))
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn create_filter(verbosity: u8) -> EnvFilter {
  if let Ok(sexp_log) = env::var("SEXP_LOG") {
    return expand_sexp_log(&sexp_log);
  }
  if let Ok(rust_log) = env::var("RUST_LOG") {
    return EnvFilter::new(rust_log);
  }
  let level = match verbosity {
    0 => return EnvFilter::new("warn"),
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  expand_sexp_log(level)
}

fn expand_sexp_log(sexp_log: &str) -> EnvFilter {
  if sexp_log.contains(['=', ',', ':']) {
    return EnvFilter::new(sexp_log);
  }
  EnvFilter::new(crate_directives(sexp_log))
}

fn crate_directives(level: &str) -> String {
  let mut directives = String::from("warn");
  for krate in CRATES {
    directives.push_str(&format!(",{krate}={level}"));
  }
  directives
}
