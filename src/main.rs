use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{LevelFilter, warn};
use rustyline::{DefaultEditor, error::ReadlineError};

use leafchain::{KeyOrdering, Output, Session, ShellConfig, ShellError};

#[derive(Debug, Parser)]
#[command(name = "leafchain", version, about = "Interactive shell over an in-memory B+ tree")]
struct Cli {
    /// Tree order (at least 3)
    #[arg(short, long)]
    order: Option<usize>,

    /// Key ordering: lexicographic or natural
    #[arg(long)]
    ordering: Option<KeyOrdering>,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run the statements in this file, then exit
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// More log output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // RUST_LOG wins over -v
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_config(cli: &Cli) -> Result<ShellConfig, ShellError> {
    let mut config = match &cli.config {
        Some(path) => ShellConfig::load(path)?,
        None => ShellConfig::default(),
    };

    if let Some(order) = cli.order {
        config.order = order;
    }
    if let Some(ordering) = cli.ordering {
        config.ordering = ordering;
    }

    config.validate()?;
    Ok(config)
}

fn print_outputs(outputs: Vec<Output>) {
    for output in outputs {
        if let Output::Text(text) = output {
            println!("{text}");
        }
    }
}

fn run_script(session: &mut Session, path: &Path) -> Result<(), ShellError> {
    let script = fs::read_to_string(path)?;
    let outputs = session.run(&script)?;
    print_outputs(outputs);
    Ok(())
}

fn run_repl(session: &mut Session) -> rustyline::Result<()> {
    let mut rl = DefaultEditor::new()?;
    let history = session.config().history_file.clone();
    if let Some(path) = &history {
        if rl.load_history(path).is_err() {
            warn!("No previous history at {}", path.display());
        }
    }

    println!("leafchain shell. Statements end with ';'. Ctrl-D to exit.");

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() {
            session.config().prompt.clone()
        } else {
            "... ".to_string()
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                buffer.push_str(line.trim_end());
                buffer.push('\n');

                // Keep reading until the statement is terminated
                if !line.trim_end().ends_with(';') {
                    continue;
                }

                rl.add_history_entry(buffer.trim_end())?;
                match session.run(&buffer) {
                    Ok(outputs) => print_outputs(outputs),
                    Err(e) => eprintln!("Error: {e}"),
                }
                buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(path) = &history {
        rl.save_history(path)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut session = match load_config(&cli).and_then(Session::new) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match &cli.file {
        Some(path) => run_script(&mut session, path),
        None => run_repl(&mut session)
            .map_err(|e| ShellError::IoError(std::io::Error::other(e.to_string()))),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
