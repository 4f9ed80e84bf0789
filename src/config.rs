use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::clock::DEFAULT_EPOCH;
use crate::completion::{DEFAULT_API_URL, DEFAULT_MODEL};

// CLI argument structure; the deployment knobs also read from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "hourglyph")]
#[command(about = "Serves an hourly base-27 prompt and its cached LLM reply")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    // Bearer credential for the completion endpoint; absence is not fatal
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    // Chat completions endpoint
    #[arg(long, env = "OPENROUTER_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    // Model identifier sent with each completion
    #[arg(short, long, env = "OPENROUTER_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    // Wall-clock limit on one completion call, in seconds
    #[arg(long, default_value_t = 25)]
    pub timeout_secs: u64,

    // Unix time at which index 1 starts
    #[arg(long, default_value_t = DEFAULT_EPOCH, allow_hyphen_values = true)]
    pub epoch: i64,

    // Reply cache file
    #[arg(short, long, env = "CACHE_FILE", default_value = "cache.json")]
    pub cache_file: PathBuf,

    // Keep replies in memory only, ignoring --cache-file
    #[arg(long)]
    pub memory_cache: bool,

    // Keep at most this many records (oldest indices evicted first); 0 is rejected
    #[arg(long)]
    pub max_entries: Option<NonZeroUsize>,

    // Directory holding index.html
    #[arg(long, default_value = "static")]
    pub static_dir: PathBuf,

    // Rate limit max /generate requests per window
    #[arg(long, default_value_t = 10)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,
}
