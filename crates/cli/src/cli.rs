use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[command(name = "honyaku")]
#[command(about = "Light novel machine-translation pipeline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Pipeline working directory (volumes, bibles, vector stores)
    #[arg(long, global = true, env = "WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Translate a volume (resumable; completed chapters are skipped)
    Translate {
        /// Volume directory name under the work dir
        volume_id: String,
        /// Translate only these chapter ids
        #[arg(long, num_args = 1..)]
        chapters: Vec<String>,
        /// Retranslate even completed chapters
        #[arg(long)]
        force: bool,
        /// Target language code (en, vi)
        #[arg(long, default_value = "en")]
        language: String,
        /// Model override for this run
        #[arg(long)]
        model: Option<String>,
        /// Enable the per-chapter continuity workflow
        #[arg(long)]
        enable_continuity: bool,
        /// Enable semantic gap analysis
        #[arg(long)]
        enable_gap_analysis: bool,
        /// Enable visual context injection from visual_cache.json
        #[arg(long)]
        enable_multimodal: bool,
        /// Disable provider-side context caching
        #[arg(long)]
        no_cache: bool,
    },
    /// Manage series bibles
    Bible {
        #[command(subcommand)]
        command: BibleCommands,
    },
    /// Manage RAG pattern stores
    Patterns {
        #[command(subcommand)]
        command: PatternCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum BibleCommands {
    /// List registered series bibles
    List,
    /// Import character data from a volume manifest into a series bible
    Import {
        /// Volume directory name under the work dir
        volume_id: String,
        /// Target series id
        #[arg(long)]
        series: String,
        /// Language metadata block to import from (en, vi)
        #[arg(long, default_value = "en")]
        language: String,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum PatternCommands {
    /// Rebuild a vector index from its RAG source file
    Rebuild {
        /// Store kind: english-grammar, sino-vietnamese,
        /// vietnamese-grammar, ai-ism
        kind: String,
    },
}
