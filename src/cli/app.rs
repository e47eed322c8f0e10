use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "shamela")]
#[command(about = "Harvest structured book documents from an Arabic digital library")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract a single book into a JSON document
    Extract {
        /// Book identifier, bare or prefixed (e.g. "43" or "BK000043")
        book_id: String,

        /// Base URL of the source site
        #[arg(long)]
        base_url: Option<String>,

        /// Gzip-compress the output
        #[arg(long)]
        compress: bool,

        /// Resume from an on-disk checkpoint if one exists
        #[arg(long, default_value_t = true)]
        resume: bool,

        /// Worker thread count for the page fetcher pool
        #[arg(long)]
        workers: Option<usize>,

        /// Stop after this many pages (smoke-testing large books)
        #[arg(long)]
        max_pages: Option<u32>,

        /// Directory for checkpoint and backup files
        #[arg(long)]
        checkpoint_dir: Option<String>,
    },

    /// Enumerate book identifiers filed under a category
    Category {
        /// Category identifier
        category_id: String,

        /// Base URL of the source site
        #[arg(long)]
        base_url: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
