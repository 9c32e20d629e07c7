use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use decomp_equiv::commands::{
    header_command, history_command, inputs_command, list_cases_command, regressions_command, run_command,
    ConfigOverrides, RunOptions,
};
use decomp_equiv::{existing_dir, init_tracing, EXIT_ERROR, EXIT_MISMATCH, EXIT_OK};

/// Semantic-equivalence harness for decompiler output.
///
/// This CLI is a thin wrapper around `equiv-core` (exposed in code as `equiv_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "decomp-equiv",
    version,
    about = "Check decompiled C against reference programs by differential execution",
    long_about = None
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by `run` and `self-check`.
#[derive(Args, Debug)]
struct HarnessArgs {
    /// Corpus directory holding the manifest and reference sources.
    #[arg(long)]
    corpus: String,

    /// Seed for the random argument sets.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Argument sets per case (boundary rows first).
    #[arg(long, default_value_t = 64)]
    count: usize,

    /// Worker threads (defaults to the config value).
    #[arg(long)]
    workers: Option<usize>,

    /// Per-execution wall-clock limit in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// C compiler to use instead of the configured one.
    #[arg(long)]
    compiler: Option<String>,

    /// Harness config file (YAML or JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the report here (`.json` for JSON, text otherwise).
    #[arg(long)]
    report: Option<PathBuf>,

    /// Record the run in this SQLite history database.
    #[arg(long)]
    history_db: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile and run every corpus case against its decompiled counterpart.
    ///
    /// Exit status: 0 when every argument set is equivalent, 1 when any divergence
    /// was found, 2 when the harness itself failed.
    Run {
        #[command(flatten)]
        harness: HarnessArgs,

        /// Directory of decompiled sources mirroring the corpus file names.
        #[arg(long)]
        decompiled: String,
    },

    /// Run every corpus case against itself to validate the harness and corpus.
    SelfCheck {
        #[command(flatten)]
        harness: HarnessArgs,
    },

    /// Print (or write) the compatibility header for decompiled sources.
    Header {
        /// Output path. Prints to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List the cases declared by a corpus manifest.
    ListCases {
        #[arg(long)]
        corpus: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show the argument sets generated for one case.
    Inputs {
        #[arg(long)]
        corpus: String,

        /// Case name.
        #[arg(long)]
        case: String,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, default_value_t = 16)]
        count: usize,

        /// Harness config file (generator limits).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List runs recorded in a history database.
    History {
        #[arg(long)]
        db: PathBuf,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List argument sets whose verdict got worse between two recorded runs.
    ///
    /// Defaults to comparing the two most recent runs. Exit status 1 when any regression is found.
    Regressions {
        #[arg(long)]
        db: PathBuf,

        /// Baseline run id.
        #[arg(long)]
        base: Option<i64>,

        /// Run id to check.
        #[arg(long)]
        head: Option<i64>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn run_options(harness: HarnessArgs, decompiled: Option<&str>) -> Result<RunOptions> {
    Ok(RunOptions {
        corpus: existing_dir(&harness.corpus, "Corpus")?,
        decompiled: decompiled.map(|d| existing_dir(d, "Decompiled")).transpose()?,
        seed: harness.seed,
        count: harness.count,
        config: harness.config,
        overrides: ConfigOverrides {
            workers: harness.workers,
            timeout_ms: harness.timeout_ms,
            compiler: harness.compiler,
        },
        report: harness.report,
        history_db: harness.history_db,
    })
}

fn passed(ok: bool) -> u8 {
    if ok {
        EXIT_OK
    } else {
        EXIT_MISMATCH
    }
}

fn dispatch(command: Command) -> Result<u8> {
    match command {
        Command::Run { harness, decompiled } => Ok(passed(run_command(&run_options(harness, Some(&decompiled))?)?)),
        Command::SelfCheck { harness } => Ok(passed(run_command(&run_options(harness, None)?)?)),
        Command::Header { out } => header_command(out.as_deref()).map(|_| EXIT_OK),
        Command::ListCases { corpus, json } => {
            list_cases_command(&existing_dir(&corpus, "Corpus")?, json).map(|_| EXIT_OK)
        }
        Command::Inputs { corpus, case, seed, count, config, json } => {
            inputs_command(&existing_dir(&corpus, "Corpus")?, &case, seed, count, config.as_deref(), json)
                .map(|_| EXIT_OK)
        }
        Command::History { db, json } => history_command(&db, json).map(|_| EXIT_OK),
        Command::Regressions { db, base, head, json } => Ok(passed(regressions_command(&db, base, head, json)?)),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli.command) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
