//! viewlet: operator CLI
//!
//! Inspect resolved settings and compute the cache key a viewlet call uses,
//! e.g. to delete an entry by hand from an external cache.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use viewlet::key::{self, KeyFunction};
use viewlet::Settings;

/// Viewlet cache CLI
#[derive(Parser)]
#[command(name = "viewlet")]
#[command(version)]
#[command(about = "Inspect viewlet settings and cache keys")]
struct Args {
    /// Settings file (default: ~/.viewlet/viewlet.toml, then /etc/viewlet/viewlet.toml)
    #[arg(short, long, env = "VIEWLET_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved settings as TOML
    Settings,

    /// Print the cache key for a viewlet call
    Key {
        /// Viewlet name
        name: String,
        /// Bound argument values, parsed as JSON when possible, else strings
        args: Vec<String>,
        /// Key template of the viewlet, e.g. "greeting:{args}"
        #[arg(short, long)]
        template: Option<String>,
        /// Declared parameter count (default: number of args)
        #[arg(long)]
        arity: Option<usize>,
        /// Override the configured key function
        #[arg(long, value_enum)]
        key_function: Option<KeyFunction>,
    },
}

fn parse_arg(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;

    match args.command {
        Command::Settings => {
            print!("{}", settings.to_toml_string()?);
        }
        Command::Key {
            name,
            args,
            template,
            arity,
            key_function,
        } => {
            let values: Vec<Value> = args.into_iter().map(parse_arg).collect();
            let strategy = key_function.unwrap_or(settings.key_function);
            let arity = arity.unwrap_or(values.len());
            info!(%name, arity, ?strategy, "computing cache key");

            let key = match template {
                Some(template) => key::expand_template(&template, &name, arity, strategy, &values)?,
                None => strategy.default_key(&name, &values),
            };
            println!("{}", key::check_length(key, settings.max_key_length)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn args_parse_as_json_then_strings() {
        assert_eq!(parse_arg("42".to_string()), json!(42));
        assert_eq!(parse_arg(r#""quoted""#.to_string()), json!("quoted"));
        assert_eq!(parse_arg("world".to_string()), json!("world"));
    }

    #[test]
    fn key_function_names() {
        let args = Args::try_parse_from([
            "viewlet",
            "key",
            "greet",
            "world",
            "--key-function",
            "join",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Key {
                key_function: Some(KeyFunction::Join),
                ..
            }
        ));
        let err = Args::try_parse_from(["viewlet", "key", "greet", "--key-function", "md5"]);
        assert!(err.is_err());
    }
}
