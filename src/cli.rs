use std::path::{Path, PathBuf};

mod check;
mod list;
mod set;
mod show;
mod terminal;
mod trace;
mod tree;

use anyhow::Context as _;
use check::Check;
use clap::ArgAction;
use list::List;
use reqif::{Config, LoadOptions, Package, codec::Mode};
use set::Set;
use show::Show;
use terminal::Colorize;
use trace::Trace;
use tree::Tree;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep undecodable content as unrecognised instead of failing
    #[arg(long, global = true)]
    lenient: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let config = match &self.config {
            Some(path) => Config::load(path).map_err(anyhow::Error::msg)?,
            None => Config::default(),
        };
        let context = Context {
            config,
            lenient: self.lenient,
        };

        self.command.run(&context)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Check that documents are written back unchanged
    ///
    /// Every `.reqif` and `.reqifz` file under the given paths is loaded and
    /// encoded again, and the output compared with the source.
    Check(Check),

    /// Show an element of a document
    Show(Show),

    /// List the elements of a document
    List(List),

    /// Print the hierarchy of each specification
    Tree(Tree),

    /// Set an attribute value and save the document
    Set(Set),

    /// Show the relations of a spec object
    Trace(Trace),
}

impl Command {
    fn run(self, context: &Context) -> anyhow::Result<()> {
        match self {
            Self::Check(command) => command.run(context)?,
            Self::Show(command) => command.run(context)?,
            Self::List(command) => command.run(context)?,
            Self::Tree(command) => command.run(context)?,
            Self::Set(command) => command.run(context)?,
            Self::Trace(command) => command.run(context)?,
        }
        Ok(())
    }
}

/// Settings shared by every command.
#[derive(Debug)]
pub struct Context {
    config: Config,
    lenient: bool,
}

impl Context {
    fn load_options(&self) -> LoadOptions {
        let mut options = LoadOptions::from(&self.config);
        if self.lenient {
            options.mode = Mode::Lenient;
        }
        options
    }

    /// Loads a document, printing any warnings from a lenient load.
    fn load(&self, path: &Path) -> anyhow::Result<Package> {
        let package = reqif::load(path, &self.load_options())
            .with_context(|| format!("failed to load {}", path.display()))?;
        for warning in &package.warnings {
            eprintln!("{} {warning}", "warning:".warning());
        }
        Ok(package)
    }
}
