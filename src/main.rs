//! monline - prints a shell prompt.
//!
//! Usage: `monline [print | debug | cache clear | cache path | version]`.
//! `--shell`, `--pwd` and `--trace` override their `MON_*` variables; the
//! rest is configured through the environment.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use monline::cache::CacheService;
use monline::config::Config;
use monline::engine::Engine;
use monline::runtime::{Environment, Terminal};
use monline::template::{Context, Renderer};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Grace period for stray segment tasks once the prompt is printed.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(10);

#[derive(Parser, Debug)]
#[command(
    name = "monline",
    version,
    about = "A cache-backed shell prompt engine",
    long_about = None
)]
struct Args {
    /// Shell the prompt is rendered for (overrides MON_SHELL)
    #[arg(long, global = true)]
    shell: Option<String>,

    /// Directory the prompt is rendered for (overrides MON_PWD)
    #[arg(long, global = true)]
    pwd: Option<String>,

    /// Write a trace log for this run under <cache>/logs
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Print the prompt (default)
    Print,
    /// Print a per-segment timing report
    Debug,
    /// Manage cache files
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Print the version
    Version,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum CacheAction {
    /// Delete every cache file
    Clear,
    /// Print the cache directory
    Path,
}

impl Args {
    fn command(&self) -> Commands {
        self.cmd.unwrap_or(Commands::Print)
    }

    /// Flags win over the environment.
    fn apply(&self, config: &mut Config) {
        if let Some(shell) = &self.shell {
            config.shell = shell.clone();
        }
        if let Some(pwd) = &self.pwd {
            config.pwd = pwd.clone();
        }
        config.trace |= self.trace;
    }
}

impl Commands {
    /// Command words, used to name the trace log.
    fn words(&self) -> &'static [&'static str] {
        match self {
            Self::Print => &["print"],
            Self::Debug => &["debug"],
            Self::Cache {
                action: CacheAction::Clear,
            } => &["cache", "clear"],
            Self::Cache {
                action: CacheAction::Path,
            } => &["cache", "path"],
            Self::Version => &["version"],
        }
    }
}

fn main() -> anyhow::Result<()> {
    let start = Instant::now();
    let args = Args::parse();
    let command = args.command();

    let mut config = Config::from_env();
    args.apply(&mut config);

    if let Some(path) =
        monline::trace::init(config.trace, &config.cache_dir, &config.shell, command.words())
    {
        info!("Tracing to {}", path.display());
    }
    for warning in &config.warnings {
        warn!("{}", warning);
    }
    debug!("version: {}, command: {:?}", VERSION, command);

    match command {
        Commands::Version => println!("{VERSION}"),
        Commands::Cache {
            action: CacheAction::Path,
        } => println!("{}", config.cache_dir.display()),
        Commands::Cache {
            action: CacheAction::Clear,
        } => {
            let removed = CacheService::clear(&config.cache_dir);
            println!(
                "removed {removed} cache file(s) from {}",
                config.cache_dir.display()
            );
        }
        Commands::Print | Commands::Debug => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let output = runtime.block_on(prompt(&config, command == Commands::Debug, start));
            // A segment that missed the deadline must not hold up the shell.
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
            print!("{output}");
        }
    }

    Ok(())
}

async fn prompt(config: &Config, debug: bool, start: Instant) -> String {
    let cache = Arc::new(CacheService::init(config.cache_location(), config.cache.clone()));
    let _guard = cache.guard();

    let env: Arc<dyn Environment> = Arc::new(Terminal::new(config.flags(debug), cache.commands()));
    let context = Context::restore(&cache, env.as_ref(), config.vars.clone(), config.maps.clone());
    let renderer = Arc::new(Renderer::new(context));

    let segments = config
        .segments
        .iter()
        .map(|segment| segment.build(Arc::clone(&env)))
        .collect();
    let engine = Engine::new(segments, Arc::clone(&renderer), config.deadline);

    let output = if debug {
        let mut report = engine.print_debug(start, VERSION).await;
        report.push_str(&format!("Cache path: {}\n", cache.path().display()));
        report
    } else {
        engine.render().await
    };

    renderer.save_cache(&cache);
    info!("Prompt rendered in {:?}", start.elapsed());
    output
}
