//! CLI subcommand implementations for the `shamela` binary.
//!
//! Argument parsing uses clap derive macros, with the top-level
//! [`app::Cli`] struct and [`app::Commands`] enum defined in [`app`] and
//! shared between `main.rs` and `build.rs` (for man page generation) via
//! `include!()`.
//!
//! Each subcommand module follows the same pattern: an `Options` struct
//! holding the parsed arguments and a `pub fn execute(opts, writer) ->
//! Result<(), HarvestError>` entry point. The `writer: &mut dyn Write`
//! parameter allows output to be captured in tests or redirected to a
//! file via the global `--output` flag.
//!
//! # Subcommands
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `shamela extract` | [`extract`] | Harvest one book into a JSON document |
//! | `shamela category` | [`category`] | Enumerate book identifiers filed under a category |
//!
//! # Common patterns
//!
//! - **`--color`** (global) — Control colored terminal output (`auto`, `always`, `never`).
//! - **`--output` / `-o`** (global) — Redirect output to a file instead of stdout.
//! - **`--log-file`** (global) — Append logs to a file instead of stderr.
//!
//! A spinner (via [`indicatif`]) tracks the long-running `extract`
//! pipeline's stages. The `wprintln!`/`wprint!` macros wrap
//! `writeln!`/`write!` to convert `io::Error` into [`crate::HarvestError`].

pub mod app;
pub mod category;
pub mod extract;

/// Write a line to the given writer, converting io::Error to HarvestError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::HarvestError::Internal(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::HarvestError::Internal(e.to_string()))
    };
}

pub(crate) use wprintln;

use indicatif::{ProgressBar, ProgressStyle};

/// Create an indeterminate spinner for a long-running pipeline stage.
pub(crate) fn create_spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}
