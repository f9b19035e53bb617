//! Restrict-content commands

use chrono::Utc;
use colored::Colorize;

use crate::access::{
    AccessGrant, PROOF_COOKIE, SubscriptionProof, VisitorContext, ip_in_range,
};
use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, GatedResourceArgs, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::output::formatters::{format_datetime, format_relative};
use crate::output::print_json;
use crate::output::table::format_details;

/// Email a one-time code and print the challenge token
pub async fn request_code(
    opts: &GlobalOptions,
    email: &str,
    resource: &GatedResourceArgs,
) -> Result<()> {
    let resource = resource.parse()?;
    let ctx = CommandContext::new(opts)?;
    let verifier = ctx.verifier()?;

    let issued = verifier.request_code(email, &resource).await?;

    match ctx.format {
        OutputFormat::Json => print_json(&issued)?,
        OutputFormat::Table => {
            println!("{} Code sent to {}", "✓".green(), issued.email);
            println!();
            println!("Token:    {}", issued.token);
            println!("Resource: {}", issued.resource);
            println!("Expires:  {}", format_relative(issued.expires_at, Utc::now()));
            println!();
            println!(
                "Verify with: kitgate access verify --token {} --code <CODE>",
                issued.token
            );
        }
    }

    Ok(())
}

/// Check a one-time code and print the proof cookie
pub async fn verify(opts: &GlobalOptions, token: &str, code: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let verifier = ctx.verifier()?;

    let access = verifier.verify_code(code, token).await?;

    match ctx.format {
        OutputFormat::Json => print_json(&access)?,
        OutputFormat::Table => {
            println!(
                "{} Subscriber {} verified for {}",
                "✓".green(),
                access.subscriber_id,
                access.resource
            );
            println!("Proof expires {}", format_datetime(Some(access.proof.expires_at)));
            println!();
            println!("{}={}", PROOF_COOKIE, access.cookie_value);
        }
    }

    Ok(())
}

/// Decide whether a visitor may read gated content. Fails when denied.
pub async fn check(
    opts: &GlobalOptions,
    resource: &GatedResourceArgs,
    visitor: VisitorContext,
) -> Result<()> {
    let resource = resource.parse()?;
    let ctx = CommandContext::new(opts)?;
    let verifier = ctx.verifier()?;

    let decision = verifier.authorize(&visitor, &resource).await;

    match ctx.format {
        OutputFormat::Json => {
            let json = match &decision {
                Ok(grant) => serde_json::json!({
                    "resource": resource,
                    "authorized": true,
                    "grant": grant,
                }),
                Err(e) => serde_json::json!({
                    "resource": resource,
                    "authorized": false,
                    "reason": e.to_string(),
                }),
            };
            print_json(&json)?;
        }
        OutputFormat::Table => match &decision {
            Ok(AccessGrant::Crawler { ip }) => {
                println!("{} Authorized: crawler {} may read {}", "✓".green(), ip, resource)
            }
            Ok(AccessGrant::Subscriber { subscriber_id }) => println!(
                "{} Authorized: subscriber {} may read {}",
                "✓".green(),
                subscriber_id,
                resource
            ),
            Err(e) => println!("{} Denied: {}", "✗".red(), e),
        },
    }

    decision.map(|_| ())
}

/// Decode a subscription proof, verifying it when a secret is configured
pub fn inspect(opts: &GlobalOptions, token: &str) -> Result<()> {
    let proof = SubscriptionProof::decode_unverified(token)?;

    let secret = Config::load_at(opts.config_ref())
        .ok()
        .and_then(|config| config.signing_secret_bytes().ok());
    let signature = match &secret {
        Some(secret) => match SubscriptionProof::verify(token, secret, Utc::now()) {
            Ok(_) => "valid".to_string(),
            Err(e) => format!("invalid ({})", e),
        },
        None => "unchecked (no signing secret)".to_string(),
    };

    match opts.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "proof": proof,
                "expired": proof.is_expired_at(Utc::now()),
                "signature": signature,
            });
            print_json(&json)?;
        }
        OutputFormat::Table => {
            let now = Utc::now();
            let scope = proof
                .scope
                .map(|r| r.to_string())
                .unwrap_or_else(|| "any resource".to_string());
            let expires = if proof.is_expired_at(now) {
                format!("expired {}", format_relative(proof.expires_at, now))
            } else {
                format_relative(proof.expires_at, now)
            };
            let details = [
                ("Subscriber", proof.subscriber_id.to_string()),
                ("Scope", scope),
                ("Issued", format_datetime(Some(proof.issued_at))),
                ("Expires", expires),
                ("Signature", signature),
            ];
            println!("{}", format_details(&details));
        }
    }

    Ok(())
}

/// Print whether `ip` falls inside `range`
pub fn ip_range(opts: &GlobalOptions, ip: &str, range: &str) -> Result<()> {
    let inside = ip_in_range(ip, range);

    match opts.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "ip": ip,
            "range": range,
            "in_range": inside,
        }))?,
        OutputFormat::Table => println!("{}", inside),
    }

    Ok(())
}
