//! jobspec - main entry point
//!
//! Thin dispatch over the library: parse flags, build the engine config,
//! run one command, and map any failure to a message and exit code 1.

use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use jobspec::cli::{Cli, Commands, SourceCommands};
use jobspec::provision::RecordSummary;
use jobspec::state::to_canonical_string;
use jobspec::{EngineConfig, FileSystem, JobSpecExtractor, Jobs, SpecError, StateManager};

/// Initialize the logger; RUST_LOG overrides the default level
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed");

    if let Err(err) = run(&cli) {
        debug!("Command failed: {:?}", err);
        report(&err);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.engine_config()?;
    debug!("Engine configuration: {:?}", config);

    match &cli.command {
        Commands::Generate { root, output } => generate(&config, root, output.as_deref()),
        Commands::Show { spec } => {
            let raw = StateManager::new(&config)?.rehydrate(spec)?;
            print!("{}", to_canonical_string(&raw)?);
            Ok(())
        }
        Commands::Validate { spec } => {
            let record = JobSpecExtractor::new(&config)?.get_job_spec_data(spec)?;
            info!("Spec validation successful");
            println!("✓ Spec file is valid: {}", RecordSummary::of(&record));
            Ok(())
        }
        Commands::Precheck { source } => {
            let jobs = Jobs::new(&config)?;
            let record = load(&jobs, source)?;
            jobs.precheck(&record)?;
            println!("✓ Precheck passed: {}", RecordSummary::of(&record));
            Ok(())
        }
        Commands::Apply { source } => {
            let jobs = Jobs::new(&config)?;
            let record = load(&jobs, source)?;
            jobs.provision(&record)?;
            println!("✓ Provisioning finished: {}", RecordSummary::of(&record));
            Ok(())
        }
    }
}

fn generate(
    config: &EngineConfig,
    root: &std::path::Path,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let manager = StateManager::new(config)?;
    let document = manager.generate(&FileSystem::new(root))?;

    match output {
        Some(path) => {
            let document = manager.dehydrate(document, path)?;
            println!(
                "✓ Spec with {} entries written to {}",
                document.entries.len(),
                path.display()
            );
        }
        None => print!("{}", to_canonical_string(&document)?),
    }
    Ok(())
}

fn load(jobs: &Jobs, source: &SourceCommands) -> Result<jobspec::SpecFileRecord> {
    match source {
        SourceCommands::Spec { spec } => jobs.spec_from_file(spec),
        SourceCommands::Github { url, branch } => {
            jobs.spec_from_repository(url, branch.as_deref())
        }
    }
}

/// Print the failure for a human; validation failures list every diagnostic
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<SpecError>() {
        Some(SpecError::Validation(validation)) => {
            eprintln!("✗ Spec does not conform to {}", validation.version);
            for diagnostic in validation.diagnostics() {
                eprintln!("  {}", diagnostic);
            }
        }
        _ => eprintln!("✗ {:#}", err),
    }
}
