//! shield-sync - operator CLI
//!
//! Runs the same operator commands as the edge server's management routes,
//! against the local cache directory and `SHIELD_*` environment.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use agent_shield_core::api;
use agent_shield_core::logic::detection::classify;
use agent_shield_core::logic::policy::{effective_policy, resolve};
use agent_shield_core::{AgentShield, ShieldSettings};

#[derive(Parser, Debug)]
#[command(name = "shield-sync", version, about = "Agent Shield catalog maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the pattern catalog now and cache it.
    Sync,
    /// Show catalog statistics.
    Stats,
    /// Show the central blocking settings carried by the catalog.
    Settings,
    /// Classify a user agent / referrer against the cached catalog.
    Classify {
        /// User-Agent header value.
        user_agent: String,
        /// Referer header value.
        #[arg(long, default_value = "")]
        referrer: String,
    },
    /// Delete the cached catalog.
    ClearCache,
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Could not render output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let shield = AgentShield::from_env();

    let code = match cli.command {
        Command::Sync => match api::sync_patterns(&shield) {
            Ok(report) => print_json(&report),
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        },
        Command::Stats => print_json(&api::get_pattern_statistics(&shield)),
        Command::Settings => print_json(&api::get_central_settings(&shield)),
        Command::Classify {
            user_agent,
            referrer,
        } => {
            let catalog = shield.catalog().current();
            let settings = ShieldSettings::read(shield.config().as_ref());
            let result = classify(&user_agent, &referrer, &catalog);
            let verdict = result.agent_match.as_ref().map(|agent| {
                let policy = effective_policy(catalog.policy(), &settings.local_policy);
                resolve(agent, policy.as_deref())
            });
            print_json(&serde_json::json!({
                "match": result.kind().as_str(),
                "agent": result.agent_match,
                "referrer": result.referrer_match,
                "verdict": verdict,
            }))
        }
        Command::ClearCache => match api::clear_pattern_cache(&shield) {
            Ok(()) => {
                println!("Pattern cache cleared");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        },
    };

    shield.shutdown();
    code
}
