mod adapters;
mod cli;
mod config;
mod core;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use crate::core::services::customer_service::CustomerForm;

fn main() {
    let args = Cli::parse();

    init_tracing(args.verbose, args.quiet);
    cli::context::init(args.dir.as_deref());
    cli::output::set_quiet(args.quiet);

    let actor = args.actor.as_deref();

    let result = match &args.command {
        Commands::Init => cli::commands::init::execute(args.verbose),
        Commands::List {
            filters,
            page,
            page_size,
            options,
            json,
        } => cli::commands::list::execute(
            cli::commands::list::ListOptions {
                filters,
                page: *page,
                page_size: *page_size,
                options: *options,
                json: *json,
            },
            actor,
        ),
        Commands::Add {
            name,
            status,
            technician,
            route_value,
            filter_type,
            filter_value,
            last_service,
            next_service,
        } => cli::commands::add::execute(
            CustomerForm {
                name: name.clone(),
                status: status.clone(),
                technician: technician.clone(),
                route_value: route_value.clone(),
                filter_type: filter_type.clone(),
                filter_value: filter_value.clone(),
                last_service: last_service.clone(),
                next_service: next_service.clone(),
            },
            actor,
        ),
        Commands::Update { name, assignments } => {
            cli::commands::update::execute(name, assignments, actor)
        }
        Commands::Rename { old, new } => cli::commands::rename::execute(old, new, actor),
        Commands::Export {
            filters,
            output,
            stdout,
        } => cli::commands::export::execute(filters, output.as_deref(), *stdout, actor),
        Commands::Stats => cli::commands::stats::execute(actor),
        Commands::Techs => cli::commands::techs::execute(actor),
        Commands::Log {
            customer,
            since,
            last,
        } => cli::commands::log::execute(customer.as_deref(), since.as_deref(), *last),
        Commands::Migrate { action } => cli::commands::migrate::execute(action),
        Commands::Import { csv, json } => {
            cli::commands::import::execute(csv, json.as_deref(), args.quiet)
        }
        Commands::NormalizeTechs { dry_run } => {
            cli::commands::normalize_techs::execute(*dry_run, actor)
        }
        Commands::Backup { action } => cli::commands::backup::execute(action),
    };

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}

/// Log to stderr. `RUST_LOG` wins; otherwise `--verbose` shows debug events
/// and the default shows warnings only.
fn init_tracing(verbose: bool, quiet: bool) {
    let default = match (verbose, quiet) {
        (true, _) => "poolboard=debug",
        (false, true) => "error",
        (false, false) => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
