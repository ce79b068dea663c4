#![deny(unused_imports)]

use anyhow::anyhow;
use clap::builder::styling;
use clap::{CommandFactory, FromArgMatches, Parser};
use env_logger::Builder;
use log::{debug, error, LevelFilter};

use reexec::config::Config;
use reexec::exec;

use std::ffi::OsString;
use std::path::PathBuf;
use std::process;

const ABOUT: &str = "Replaces the current process with FILE, passing it at most one ARGUMENT and a fixed environment";

#[derive(Parser)]
#[command(
    author,
    version,
    about = ABOUT,
    long_about = None,
    override_usage = "reexec [OPTIONS] <FILE> [ARGUMENT]"
)]
struct Cli {
    /// Enable debugging
    #[arg(short, long)]
    debug: bool,

    /// Silents out debug, info, error logging.
    #[arg(short, long)]
    silent: bool,

    /// Set verbosity level, repeat option for more verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file defining the environment given to FILE.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Dump the effective configuration and exit
    #[arg(long)]
    dump_config: bool,

    /// Executable path followed by the argument to pass it. Anything
    /// after the executable path is passed through untouched.
    #[arg(value_name = "FILE", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<OsString>,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        // debugging flag supersedes everything else
        if self.debug {
            return LevelFilter::Debug;
        }

        // silent out logging if specified in CLI
        if self.silent {
            return LevelFilter::Off;
        }

        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            3..=u8::MAX => LevelFilter::Trace,
        }
    }

    fn config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(p) => Config::from_file(p).map_err(|e| anyhow!("{}: {e}", p.to_string_lossy())),
            None => Ok(Config::default()),
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let conf = cli.config()?;

    if cli.dump_config {
        print!("{}", serde_yaml::to_string(&conf)?);
        return Ok(());
    }

    let env = conf
        .env_list()
        .map_err(|e| anyhow!("invalid configuration: {e}"))?;

    match exec::run(cli.args, &env) {
        Ok(never) => match never {},
        Err(e) => Err(e.into()),
    }
}

fn main() {
    let mut c = {
        let c: clap::Command = Cli::command();
        let styles = styling::Styles::styled()
            .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
            .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
            .literal(styling::AnsiColor::Blue.on_default() | styling::Effects::BOLD)
            .placeholder(styling::AnsiColor::Cyan.on_default());

        c.styles(styles)
    };

    let usage = c.render_usage();

    let cli = Cli::from_arg_matches(&c.get_matches()).unwrap_or_else(|e| e.exit());

    // building the logger
    Builder::new().filter_level(cli.log_level()).init();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<exec::Error>() {
            Some(exec::Error::Usage(_)) => eprintln!("{usage}"),
            // execve failures are not reported unless asked for
            Some(exec::Error::Exec(_)) | Some(exec::Error::Nul(_)) => debug!("{e}"),
            _ => error!("{e}"),
        }
        process::exit(libc::EXIT_FAILURE);
    }
}
