#[cfg(not(feature = "cli"))]
compile_error!("The `shamela` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process;

use shamela::cli;
use shamela::cli::app::{Cli, ColorMode, Commands};
use shamela::HarvestError;

/// Roll over once the active log file reaches this size.
const LOG_MAX_BYTES: u64 = 10 * 1024 * 1024;
/// Keep this many rotated backups (`path.1` is newest, `path.N` oldest).
const LOG_BACKUP_COUNT: u32 = 5;

fn main() {
    let cli = Cli::parse();

    init_logging(cli.log_file.as_deref());

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, HarvestError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| HarvestError::Internal(format!("cannot create {path}: {e}"))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Extract {
            book_id,
            base_url,
            compress,
            resume,
            workers,
            max_pages,
            checkpoint_dir,
        } => cli::extract::execute(
            &cli::extract::ExtractOptions {
                book_id,
                base_url,
                compress,
                resume,
                workers,
                max_pages,
                checkpoint_dir,
            },
            &mut writer,
        ),

        Commands::Category { category_id, base_url, json } => cli::category::execute(
            &cli::category::CategoryOptions { category_id, base_url, json },
            &mut writer,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Configure `env_logger`, writing to `log_file` if given instead of stderr.
fn init_logging(log_file: Option<&str>) {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(path) = log_file {
        match RotatingFileWriter::open(path, LOG_MAX_BYTES, LOG_BACKUP_COUNT) {
            Ok(writer) => {
                builder.target(env_logger::Target::Pipe(Box::new(writer)));
            }
            Err(e) => {
                eprintln!("cannot open log file {path}: {e}; logging to stderr instead");
            }
        }
    }
    builder.init();
}

/// A size-based rotating log writer, the Rust equivalent of Python's
/// `RotatingFileHandler`: once the active file reaches `max_bytes`, it is
/// renamed to `path.1` (bumping any existing `path.1..path.N-1` up one
/// slot and dropping `path.N`) and a fresh file is opened in its place.
struct RotatingFileWriter {
    path: PathBuf,
    file: File,
    size: u64,
    max_bytes: u64,
    backup_count: u32,
}

impl RotatingFileWriter {
    fn open(path: &str, max_bytes: u64, backup_count: u32) -> std::io::Result<Self> {
        let path = PathBuf::from(path);
        let file = File::options().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self { path, file, size, max_bytes, backup_count })
    }

    fn backup_path(&self, n: u32) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> std::io::Result<()> {
        for n in (1..self.backup_count).rev() {
            let from = self.backup_path(n);
            let to = self.backup_path(n + 1);
            if from.exists() {
                std::fs::rename(&from, &to)?;
            }
        }
        if self.path.exists() {
            std::fs::rename(&self.path, self.backup_path(1))?;
        }
        self.file = File::options().create(true).append(true).open(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.size >= self.max_bytes {
            self.rotate()?;
        }
        let written = self.file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}
