mod presenter;
mod script;
mod session;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use account_forms::{AccountRegistry, FORM_IDS};
use presenter::{OutputFormat, Presenter, Verbosity};
use script::{HELP, parse_line, parse_script};
use session::{Flow, Session};
use wizard_spec::{
    Form, FormSpec, SubmissionGate, ValidationReport, Wizard, definition_schema,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Environment variable holding the log filter (`tracing` directives).
const LOG_ENV: &str = "ACCOUNT_WIZARD_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Step-wise account-opening wizard",
    long_about = "Drives the account-opening wizard engine: inspect forms, validate answers, view steps and replay sessions"
)]
struct Cli {
    /// Debug logging on stderr and a step view after every action.
    #[arg(long, global = true, alias = "debug")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

/// Where the form definition comes from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct FormSource {
    /// Built-in form id (see `forms`).
    #[arg(long, value_name = "FORM")]
    form: Option<String>,
    /// Path to a form definition JSON file.
    #[arg(long, value_name = "SPEC")]
    spec: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// List the built-in forms.
    Forms,
    /// Print a form definition as JSON.
    Describe {
        #[command(flatten)]
        source: FormSource,
    },
    /// Print the JSON schema for form definitions.
    Schema,
    /// Validate an answers file against every active step and submit rule.
    Validate {
        #[command(flatten)]
        source: FormSource,
        /// Path to the answers JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Show one step for the given answers.
    Step {
        #[command(flatten)]
        source: FormSource,
        /// Optional JSON file containing answers to load first.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// 1-based step to show.
        #[arg(long, default_value_t = 1)]
        step: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Run a session from a script file, or interactively from stdin.
    Run {
        #[command(flatten)]
        source: FormSource,
        /// Action script (one action per line); reads stdin when omitted.
        #[arg(long, value_name = "SCRIPT")]
        script: Option<PathBuf>,
        /// Optional JSON file containing answers to load first.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// JSON file of lookup records used by the `lookup` action.
        #[arg(long, value_name = "REGISTRY")]
        registry: Option<PathBuf>,
        /// Where to write the submitted application (`.cbor` for CBOR, JSON otherwise).
        #[arg(long, value_name = "OUT")]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Forms => run_forms(),
        Command::Describe { source } => run_describe(&source),
        Command::Schema => print_json(&definition_schema()),
        Command::Validate { source, answers } => run_validate(&source, &answers),
        Command::Step {
            source,
            answers,
            step,
            format,
        } => run_step(&source, answers.as_deref(), step, format, cli.verbose),
        Command::Run {
            source,
            script,
            answers,
            registry,
            output,
            format,
        } => run_session(
            &source,
            RunOptions {
                script,
                answers,
                registry,
                output,
                format,
                verbose: cli.verbose,
            },
        ),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

impl FormSource {
    fn load_spec(&self) -> CliResult<FormSpec> {
        match (&self.form, &self.spec) {
            (Some(id), _) => Ok(account_forms::form_spec(id)?),
            (None, Some(path)) => {
                let contents = fs::read_to_string(path)?;
                Ok(serde_json::from_str(&contents)?)
            }
            (None, None) => Err("either --form or --spec is required".into()),
        }
    }

    fn load(&self) -> CliResult<Arc<Form>> {
        let form = Form::compile(self.load_spec()?)?;
        info!(form = form.id(), steps = form.step_count(), "form compiled");
        Ok(Arc::new(form))
    }
}

fn print_json(value: &Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_answers(path: Option<&Path>) -> CliResult<Value> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        }
        None => Ok(json!({})),
    }
}

fn start_session(source: &FormSource, answers: Option<&Path>) -> CliResult<Wizard> {
    let mut wizard = Wizard::new(source.load()?);
    let answers = read_answers(answers)?;
    let unknown = wizard.load_answers(&answers)?;
    if !unknown.is_empty() {
        eprintln!("Ignoring unknown answer keys: {}", unknown.join(", "));
    }
    Ok(wizard)
}

fn run_forms() -> CliResult<()> {
    for id in FORM_IDS {
        let spec = account_forms::form_spec(id)?;
        println!("{:<20} {} ({} steps)", spec.id, spec.title, spec.steps.len());
    }
    Ok(())
}

fn run_describe(source: &FormSource) -> CliResult<()> {
    print_json(&serde_json::to_value(source.load_spec()?)?)
}

fn run_validate(source: &FormSource, answers: &Path) -> CliResult<()> {
    let wizard = start_session(source, Some(answers))?;
    let errors = SubmissionGate::new(wizard.form()).blocking_errors(wizard.application());
    let report = ValidationReport::from_errors(errors);
    println!(
        "Validation result: {}",
        if report.valid { "valid" } else { "invalid" }
    );
    if !report.errors.is_empty() {
        println!("Errors:");
        for error in &report.errors {
            println!("  {} - {}", error.path, error.message);
        }
    }
    if !report.missing_required.is_empty() {
        println!("Missing required: {}", report.missing_required.join(", "));
    }

    if report.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn run_step(
    source: &FormSource,
    answers: Option<&Path>,
    step: usize,
    format: OutputFormat,
    verbose: bool,
) -> CliResult<()> {
    let mut wizard = start_session(source, answers)?;
    let navigation = wizard.jump_to(step)?;
    let presenter = Presenter::new(format, Verbosity::from_verbose(verbose));
    if !navigation.errors.is_empty() {
        eprintln!(
            "Cannot reach step {}; earlier steps are incomplete:",
            step
        );
        for error in &navigation.errors {
            eprintln!("  {} - {}", error.path, error.message);
        }
    }
    presenter.show_step(&wizard);
    Ok(())
}

struct RunOptions {
    script: Option<PathBuf>,
    answers: Option<PathBuf>,
    registry: Option<PathBuf>,
    output: Option<PathBuf>,
    format: OutputFormat,
    verbose: bool,
}

fn run_session(source: &FormSource, options: RunOptions) -> CliResult<()> {
    let wizard = start_session(source, options.answers.as_deref())?;
    let registry = match &options.registry {
        Some(path) => Some(AccountRegistry::from_json(&fs::read_to_string(path)?)?),
        None => None,
    };
    let mut session = Session::new(wizard, registry);
    let mut presenter = Presenter::new(options.format, Verbosity::from_verbose(options.verbose));
    presenter.show_header(session.wizard());
    presenter.show_step(session.wizard());

    match &options.script {
        Some(path) => {
            let actions = parse_script(&fs::read_to_string(path)?)?;
            for action in actions {
                if session.apply(action, &presenter)? == Flow::Stop {
                    break;
                }
            }
        }
        None => run_shell(&mut session, &presenter)?,
    }

    println!("Session {:?} on step {}", session.wizard().status(), session.wizard().current_step());
    if let (Some(receipt), Some(path)) = (session.receipt(), &options.output) {
        write_application(receipt, path)?;
        println!("Application written to {}", path.display());
    }
    Ok(())
}

fn run_shell(session: &mut Session, presenter: &Presenter) -> CliResult<()> {
    println!("Type 'help' for the list of actions.");
    let stdin = io::stdin();
    let mut line_number = 0;
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        line_number += 1;
        if line.trim().eq_ignore_ascii_case("help") {
            println!("{}", HELP);
            continue;
        }
        match parse_line(line_number, &line) {
            Ok(Some(action)) => {
                if session.apply(action, presenter)? == Flow::Stop {
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(err) => eprintln!("{}", err),
        }
    }
}

fn write_application(receipt: &wizard_spec::Receipt, path: &Path) -> CliResult<()> {
    let is_cbor = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("cbor"));
    if is_cbor {
        fs::write(path, receipt.application.to_cbor()?)?;
    } else {
        let document = json!({
            "reference": receipt.reference,
            "application": receipt.application,
        });
        fs::write(path, serde_json::to_string_pretty(&document)?)?;
    }
    Ok(())
}
