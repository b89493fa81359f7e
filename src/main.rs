use clap::{Parser as ClapParser, Subcommand};
use pathfind::cli::{self, CliError, FindOptions};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "pathfind")]
#[command(about = "pathfind - navigate and filter JSON with path expressions")]
#[command(version)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a path expression against JSON input
    Find {
        /// The path expression to run
        path: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Stop after this many results
        #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
        limit: i64,

        /// Skip this many leading matches
        #[arg(short, long, default_value_t = 0)]
        start: usize,

        /// Bind a query variable, as name=JSON (repeatable)
        #[arg(long = "var")]
        vars: Vec<String>,

        /// Print only the first match
        #[arg(long)]
        first: bool,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Compile a path expression and report what was understood
    Check {
        /// The path expression to check
        path: String,
    },

    /// Show the query-language reference
    Docs {
        /// Category name (omit to list categories)
        category: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Find {
            path,
            input,
            limit,
            start,
            vars,
            first,
            pretty,
        } => read_input(input).and_then(|input| {
            let options = FindOptions {
                path,
                input,
                limit,
                start,
                vars,
                first,
            };
            run_find(&options, pretty)
        }),
        Commands::Check { path } => run_check(&path),
        Commands::Docs { category: None } => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Docs {
            category: Some(category),
        } => cli::get_doc_category(&category).map(|content| print!("{}", content)),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    Ok(match input {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    })
}

fn run_find(options: &FindOptions, pretty: bool) -> Result<(), CliError> {
    let output = cli::execute_find(options)?;
    let json = if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }?;
    println!("{}", json);
    Ok(())
}

fn run_check(path: &str) -> Result<(), CliError> {
    let report = cli::execute_check(path)?;

    println!("Compiled {} nodes", report.nodes);
    if !report.functions.is_empty() {
        println!("Functions: {}", report.functions.join(", "));
    }
    for name in &report.unknown_functions {
        println!("warning: '{}' is not a builtin function", name);
    }
    match &report.remainder {
        Some(remainder) => println!("Ignored trailing text: {}", remainder),
        None => println!("Path is valid"),
    }
    Ok(())
}
