use clap::{ArgAction, Parser as ClapParser, Subcommand};
use grammar_kit::{
    ParserOptions,
    cli::{self, CheckOptions, CheckResult, CliError},
    library,
};
use std::io::{self, Read};
use tracing::Level;

#[derive(ClapParser)]
#[command(name = "grammar-kit")]
#[command(about = "Parse and evaluate expressions with a declaratively built grammar")]
#[command(version)]
struct Cli {
    /// Log parser and evaluator activity to stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an expression and evaluate it against JSON data
    Check {
        /// The expression to check
        expression: String,

        /// Schema JSON mapping field names to type descriptors
        #[arg(short, long)]
        schema: Option<String>,

        /// Data JSON (reads from stdin if not provided)
        #[arg(short, long)]
        data: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only parse, don't evaluate
        #[arg(long)]
        syntax_only: bool,

        /// Maximum sub-expression nesting
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// List the standard grammar's nodes by precedence level
    Grammar,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check {
            expression,
            schema,
            data,
            pretty,
            syntax_only,
            max_depth,
        } => run_check(
            CheckOptions {
                expression,
                schema,
                data,
                syntax_only,
                max_depth,
            },
            pretty,
        ),
        Commands::Grammar => library::standard_parser()
            .map(|parser| print!("{}", cli::describe_grammar(parser.grammar())))
            .map_err(CliError::from),
    };

    if let Err(e) = result {
        match e.diagnostic(ParserOptions::default().snippet_radius) {
            Some(diagnostic) => eprint!("{diagnostic}"),
            None => eprintln!("{e}"),
        }
        std::process::exit(1);
    }
}

fn run_check(mut options: CheckOptions, pretty: bool) -> Result<(), CliError> {
    if options.data.is_none() && !options.syntax_only && !atty::is(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        options.data = Some(buffer);
    }

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid { output_schema } => {
            println!("Syntax is valid (result: {output_schema})")
        }
        CheckResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{json}");
        }
    }
    Ok(())
}
