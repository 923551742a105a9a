use std::{fs, io::Write, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};

use well::{
    pipeline::{run_pipeline, stage, RunConfig},
    template::expander::{self, SingleQuoting, TemplateValue},
    RunOptions,
};

/// well is an interpreter for a small scripting language that builds and
/// runs external-command pipelines with safe string interpolation.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse, check, and execute a program.
    Run {
        /// Path to the program to execute.
        #[arg(short, long)]
        file: PathBuf,

        /// Echo rendered strings and per-child command logs to stderr.
        #[arg(short, long)]
        verbose: bool,
    },
    /// Parse a program and print it in canonical formatting.
    Fmt {
        /// Path to the program to format.
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Render a bare template to a single safely-quoted command line.
    Render {
        /// The template text.
        #[arg(short, long)]
        input: String,

        /// Variable values as name=value pairs; the process environment
        /// is consulted for anything not given here.
        #[arg(short, long = "map")]
        map: Vec<String>,
    },
    /// Expand a bare template to an argv and run it.
    Exec {
        /// The template text.
        #[arg(short, long)]
        input: String,

        /// Variable values as name=value pairs; the process environment
        /// is consulted for anything not given here.
        #[arg(short, long = "map")]
        map: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match cli.command {
        Command::Run { file, verbose } => run(&file, verbose),
        Command::Fmt { file } => fmt(&file),
        Command::Render { input, map } => render(&input, &map),
        Command::Exec { input, map } => exec(&input, &map),
    }
}

fn run(file: &PathBuf, verbose: bool) -> ExitCode {
    let Some(src) = read(file) else {
        return ExitCode::FAILURE;
    };

    let options = RunOptions { verbose,
                               quoting: SingleQuoting::default() };
    match well::run_program(&src, std::io::stdout(), std::io::stderr(), &options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.render(&src));
            ExitCode::FAILURE
        },
    }
}

fn fmt(file: &PathBuf) -> ExitCode {
    let Some(src) = read(file) else {
        return ExitCode::FAILURE;
    };

    match well::format_source(&src) {
        Ok(formatted) => {
            print!("{formatted}");
            ExitCode::SUCCESS
        },
        Err(err) => {
            eprintln!("{}", err.render(&src));
            ExitCode::FAILURE
        },
    }
}

fn render(input: &str, map: &[String]) -> ExitCode {
    let Some(pairs) = parse_pairs(map) else {
        return ExitCode::FAILURE;
    };
    let lookup = env_lookup(pairs);

    match expander::parse_and_render(input, &lookup, SingleQuoting::default()) {
        Ok(rendered) => {
            println!("{rendered}");
            ExitCode::SUCCESS
        },
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        },
    }
}

fn exec(input: &str, map: &[String]) -> ExitCode {
    let Some(pairs) = parse_pairs(map) else {
        return ExitCode::FAILURE;
    };
    let lookup = env_lookup(pairs);

    let root = match well::template::parser::parse(input) {
        Ok(root) => root,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        },
    };
    let argv = match expander::to_argv(&root, &lookup, SingleQuoting::default()) {
        Ok(argv) => argv,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        },
    };

    match run_pipeline(&[stage(argv)], &RunConfig::default()) {
        Ok(output) => {
            print!("{}", output.stdout);
            let _ = std::io::stdout().flush();
            ExitCode::SUCCESS
        },
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        },
    }
}

fn read(file: &PathBuf) -> Option<String> {
    match fs::read_to_string(file) {
        Ok(src) => Some(src),
        Err(err) => {
            eprintln!("failed to read {}: {err}", file.display());
            None
        },
    }
}

fn parse_pairs(map: &[String]) -> Option<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(map.len());
    for entry in map {
        match entry.split_once('=') {
            Some((name, value)) => pairs.push((name.to_string(), value.to_string())),
            None => {
                eprintln!("invalid --map entry {entry:?}, expected name=value");
                return None;
            },
        }
    }
    Some(pairs)
}

/// Looks variables up in the `--map` pairs first, then in the process
/// environment.
fn env_lookup(pairs: Vec<(String, String)>)
              -> impl Fn(&str) -> Option<TemplateValue> {
    move |name| {
        pairs.iter()
             .find(|(n, _)| n == name)
             .map(|(_, v)| TemplateValue::Str(v.clone()))
             .or_else(|| std::env::var(name).ok().map(TemplateValue::Str))
    }
}
