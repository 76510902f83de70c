// Logging and verbosity control

use std::sync::atomic::{AtomicU8, Ordering};

use tracing_subscriber::EnvFilter;

/// Global verbosity level
static VERBOSITY: AtomicU8 = AtomicU8::new(1);

/// Environment variable holding an explicit log filter
pub const LOG_LEVEL_ENV: &str = "OLLAMA_FORGE_LOG_LEVEL";

/// Setting this to `1` or `true` forces debug logging
pub const DEBUG_ENV: &str = "OLLAMA_FORGE_DEBUG";

/// Verbosity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    /// Quiet mode - minimal output
    Quiet = 0,
    /// Normal mode - standard output
    Normal = 1,
    /// Verbose mode - detailed output
    Verbose = 2,
    /// Very verbose mode - debug output
    VeryVerbose = 3,
}

impl VerbosityLevel {
    /// Get the current verbosity level
    pub fn current() -> Self {
        match VERBOSITY.load(Ordering::Relaxed) {
            0 => VerbosityLevel::Quiet,
            1 => VerbosityLevel::Normal,
            2 => VerbosityLevel::Verbose,
            _ => VerbosityLevel::VeryVerbose,
        }
    }

    /// Set the verbosity level
    pub fn set(level: Self) {
        VERBOSITY.store(level as u8, Ordering::Relaxed);
    }

    /// Check if we should output at this level
    pub fn should_output(&self) -> bool {
        self <= &Self::current()
    }
}

/// Resolve the tracing filter directive from flags and environment
///
/// `-v` and `-q` win over the environment. Without either, the debug switch,
/// then `OLLAMA_FORGE_LOG_LEVEL`, then `RUST_LOG` are consulted, falling back
/// to `warn`.
pub fn resolve_filter(
    verbose: bool,
    quiet: bool,
    debug_env: Option<&str>,
    level_env: Option<&str>,
    rust_log: Option<&str>,
) -> String {
    if verbose {
        return "debug".to_string();
    }
    if quiet {
        return "error".to_string();
    }
    if matches!(debug_env.map(str::trim), Some("1") | Some("true")) {
        return "debug".to_string();
    }
    level_env
        .or(rust_log)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("warn")
        .to_lowercase()
}

/// Initialize logging based on CLI flags
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        VerbosityLevel::Quiet
    } else if verbose {
        VerbosityLevel::Verbose
    } else {
        VerbosityLevel::Normal
    };
    VerbosityLevel::set(level);

    let directive = resolve_filter(
        verbose,
        quiet,
        std::env::var(DEBUG_ENV).ok().as_deref(),
        std::env::var(LOG_LEVEL_ENV).ok().as_deref(),
        std::env::var("RUST_LOG").ok().as_deref(),
    );
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{}': {}", directive, e);
        EnvFilter::new("warn")
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Log a message at the given verbosity level
pub fn log_at_level(level: VerbosityLevel, message: &str) {
    if level.should_output() {
        eprintln!("{}", message);
    }
}

/// Log an info message (in normal and verbose modes)
pub fn info(message: &str) {
    log_at_level(VerbosityLevel::Normal, message);
}
