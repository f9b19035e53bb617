//! Init command implementation

use colored::Colorize;
use dialoguer::{Confirm, Password, theme::ColorfulTheme};

use crate::cli::args::GlobalOptions;
use crate::client::{KitApi, KitClient};
use crate::config::Config;
use crate::error::Result;

/// Run the init command
///
/// Prompts for a Kit API key, checks it against the API, and keeps any
/// existing signing secret so previously issued proofs stay valid.
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}", "Welcome to kitgate!".bold().green());
    println!("Let's set up your Kit configuration.\n");

    let mut config = Config::load_at(opts.config_ref()).unwrap_or_default();

    let api_key: String = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter your Kit v4 API key")
        .interact()?;

    let api_host = opts.api_host.clone().or_else(|| config.api_host.clone());

    println!("\n{}", "Checking API key...".cyan());
    let client = KitClient::with_host(Some(api_key.clone()), api_host.clone())?;
    let tags = client.list_tags().await?;
    println!(
        "{} API key accepted ({} tags in your account)",
        "✓".green(),
        tags.len()
    );

    config.api_key = Some(api_key);
    if opts.api_host.is_some() {
        config.api_host = opts.api_host.clone();
    }

    let rotate = config.signing_secret.is_some()
        && !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Keep the existing signing secret? (issued proofs stay valid)")
            .default(true)
            .interact()?;
    if config.signing_secret.is_none() || rotate {
        config.signing_secret = Some(Config::generate_signing_secret());
        println!("{} Generated a new signing secret", "✓".green());
    }

    config.save_at(opts.config_ref())?;

    let config_path = Config::resolve_path(opts.config_ref())?;
    println!(
        "\n{} Configuration saved to: {}",
        "✓".green(),
        config_path.display()
    );

    println!("\n{}", "You're all set! Try running:".bold());
    println!("  {} - Show configuration status", "kitgate status".cyan());
    println!("  {} - Fetch every resource list", "kitgate resource refresh".cyan());
    println!("  {} - List cached tags", "kitgate resource list tags".cyan());

    Ok(())
}
