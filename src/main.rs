use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    cursor::MoveToColumn,
    execute,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
    tty::IsTty,
};
use rand::thread_rng;
use std::{
    error::Error,
    fs::File,
    io::{self, stdin, BufWriter, Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use tracing_subscriber::EnvFilter;

use typomaster::{
    admission::{admit, Submission},
    config::{Config, ConfigStore, FileConfigStore},
    metrics::{compute_result, TestResult},
    passages::Passages,
    runtime::{CrosstermEventSource, FixedTicker, Runner},
    session::{Session, SessionConfig},
    store::ResultStore,
    validator::detect_invalid_pattern,
};

const LOG_ENV: &str = "TYPOMASTER_LOG";

/// typing-speed practice with honest scoring
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Timed typing practice that scores speed and accuracy, rejects implausible or bot-like input, and keeps a local history with achievements."
)]
pub struct Cli {
    /// result database to use instead of the default location
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// config file to use instead of the default location
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run an interactive timed test in the terminal
    Practice {
        /// number of seconds to run test
        #[clap(short = 's', long)]
        secs: Option<u64>,

        /// custom prompt to use instead of a bundled passage
        #[clap(short = 'p', long)]
        prompt: Option<String>,

        /// do not store the result
        #[clap(long)]
        guest: bool,
    },
    /// score a typed buffer against a reference and print it as json
    Score {
        #[clap(short = 'r', long)]
        reference: String,

        #[clap(short = 't', long)]
        typed: String,

        /// elapsed seconds
        #[clap(short = 's', long, default_value_t = 60.0)]
        secs: f64,
    },
    /// save a submission read from FILE ("-" for stdin)
    Submit { file: PathBuf },
    /// show the most recent results
    History {
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// show summary statistics
    Stats,
    /// list unlocked achievements
    Achievements,
    /// write the full history as csv
    Export { path: PathBuf },
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let config = config_store.load();

    match &cli.command {
        Command::Practice {
            secs,
            prompt,
            guest,
        } => {
            if !stdin().is_tty() {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
            }
            let mut config = config.clone();
            if let Some(secs) = secs {
                config.duration_secs = *secs;
            }
            config.guest |= *guest;
            practice(&cli, &config, prompt.clone())
        }
        Command::Score {
            reference,
            typed,
            secs,
        } => {
            let result = compute_result(
                reference,
                typed,
                *secs,
                detect_invalid_pattern(typed),
                &config.policy,
            );
            let admission = admit(&result);
            let out = serde_json::json!({ "result": result, "admission": admission });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Command::Submit { file } => {
            let submission: Submission = serde_json::from_str(&read_input(file)?)?;
            let response = open_store(&cli)?.save_result(&submission)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.success {
                std::process::exit(2);
            }
            Ok(())
        }
        Command::History { limit } => {
            let store = open_store(&cli)?;
            for result in store.history(*limit)? {
                println!(
                    "{}  {:>3} wpm  {:>3}%  {:>4} chars  {:>2} errors",
                    result.created_at.format("%Y-%m-%d %H:%M"),
                    result.wpm,
                    result.accuracy,
                    result.characters,
                    result.error_count
                );
            }
            Ok(())
        }
        Command::Stats => {
            let summary = open_store(&cli)?.summary()?;
            println!("tests:            {}", summary.tests);
            println!("best wpm:         {}", summary.best_wpm);
            println!("average wpm:      {:.1}", summary.average_wpm);
            println!("average accuracy: {:.1}%", summary.average_accuracy);
            println!("wpm std dev:      {:.1}", summary.wpm_std_dev);
            println!("current streak:   {} day(s)", summary.current_streak_days);
            Ok(())
        }
        Command::Achievements => {
            for achievement in open_store(&cli)?.achievements()? {
                println!(
                    "{}  {:<14} {}",
                    achievement.unlocked_at.format("%Y-%m-%d"),
                    achievement.title,
                    achievement.description
                );
            }
            Ok(())
        }
        Command::Export { path } => {
            let file = BufWriter::new(File::create(path)?);
            open_store(&cli)?.export_csv(file)?;
            eprintln!("wrote {}", path.display());
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_store(cli: &Cli) -> typomaster::Result<ResultStore> {
    match &cli.db {
        Some(path) => ResultStore::open(path),
        None => ResultStore::open_default(),
    }
}

fn read_input(path: &Path) -> io::Result<String> {
    let mut input = String::new();
    if path == Path::new("-") {
        stdin().read_to_string(&mut input)?;
    } else {
        File::open(path)?.read_to_string(&mut input)?;
    }
    Ok(input)
}

fn practice(cli: &Cli, config: &Config, prompt: Option<String>) -> Result<(), Box<dyn Error>> {
    let reference = match prompt {
        Some(prompt) => prompt,
        None => Passages::load()?.random(&mut thread_rng()).to_string(),
    };

    let mut session = Session::new(reference, SessionConfig::from(config));
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(config.tick_rate_ms)),
    );

    println!("{}", session.reference());
    println!("(start typing, esc to stop)");

    enable_raw_mode()?;
    let outcome = run_session(&runner, &mut session);
    disable_raw_mode()?;
    println!();

    let Some(result) = outcome? else {
        return Ok(());
    };
    print_result(&result);

    let admission = admit(&result);
    if let Some(message) = admission.message {
        println!("not recorded: {message}");
        return Ok(());
    }
    if config.guest {
        println!("guest mode, result not saved");
        return Ok(());
    }

    let response = open_store(cli)?.save_result(&Submission::from_result(&result))?;
    for achievement in response.unlocked_achievements.unwrap_or_default() {
        println!("achievement unlocked: {} ({})", achievement.title, achievement.description);
    }
    Ok(())
}

fn run_session(
    runner: &Runner<CrosstermEventSource, FixedTicker>,
    session: &mut Session,
) -> io::Result<Option<TestResult>> {
    let mut stdout = io::stdout();
    let mut draw_error = None;

    let result = runner.drive_with(session, |session| {
        if let Err(e) = draw_status(&mut stdout, session) {
            draw_error.get_or_insert(e);
        }
    });

    match draw_error {
        Some(e) => Err(e),
        None => Ok(result),
    }
}

fn draw_status<W: Write>(out: &mut W, session: &Session) -> io::Result<()> {
    let live = session.live();
    execute!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(format!(
            "{:>3.0}s {:>3} wpm {:>3}% | {}",
            live.remaining_secs.ceil(),
            live.wpm,
            live.accuracy,
            session.typed()
        ))
    )
}

fn print_result(result: &TestResult) {
    println!("wpm:      {}", result.wpm);
    println!("accuracy: {}%", result.accuracy);
    println!("errors:   {}", result.errors);
    println!("time:     {:.1}s", result.time);
    let common = result.error_details.most_common(3);
    if !common.is_empty() {
        let pairs: Vec<String> = common
            .iter()
            .map(|e| format!("'{}'->'{}' x{}", e.expected, e.typed, e.count))
            .collect();
        println!("common:   {}", pairs.join(", "));
    }
}
