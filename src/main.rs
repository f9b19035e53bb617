//! kitgate CLI - Kit resource cache and restrict-content verification

use clap::Parser;

mod access;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod output;
mod resource;
mod scheduler;
mod store;

use access::VisitorContext;
use cli::args::GlobalOptions;
use cli::{AccessCommands, CacheCommands, Cli, Commands, ResourceCommands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `--debug` wins over `RUST_LOG`; warnings are shown by default
fn init_logging(debug: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_module("kitgate", log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let opts = GlobalOptions::from_cli(&cli);

    let config_debug = config::Config::load_at(opts.config_ref())
        .map(|c| c.debug)
        .unwrap_or(false);
    init_logging(cli.debug || config_debug);

    match cli.command {
        Commands::Init => cli::init::run(&opts).await,
        Commands::Status => cli::status::run(&opts),
        Commands::Version => {
            println!("kitgate version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Resource(cmd) => match cmd {
            ResourceCommands::List {
                resource_type,
                pagination,
            } => cli::resource::list(&opts, resource_type, &pagination).await,
            ResourceCommands::Get { resource_type, id } => {
                cli::resource::get(&opts, resource_type, id).await
            }
            ResourceCommands::Refresh { resource_type } => {
                cli::resource::refresh(&opts, resource_type).await
            }
            ResourceCommands::Watch { interval } => cli::resource::watch(&opts, interval).await,
        },
        Commands::Cache(cmd) => match cmd {
            CacheCommands::Status => cli::cache::status(&opts),
            CacheCommands::Clear => cli::cache::clear(&opts),
            CacheCommands::Path => cli::cache::path(&opts),
        },
        Commands::Access(cmd) => match cmd {
            AccessCommands::RequestCode { email, resource } => {
                cli::access::request_code(&opts, &email, &resource).await
            }
            AccessCommands::Verify { token, code } => {
                cli::access::verify(&opts, &token, &code).await
            }
            AccessCommands::Check {
                resource,
                proof,
                cookie,
                ip,
            } => {
                let visitor = VisitorContext {
                    proof_param: proof,
                    proof_cookie: cookie,
                    ip,
                };
                cli::access::check(&opts, &resource, visitor).await
            }
            AccessCommands::Inspect { proof } => cli::access::inspect(&opts, &proof),
            AccessCommands::IpInRange { ip, range } => cli::access::ip_range(&opts, &ip, &range),
        },
    }
}
