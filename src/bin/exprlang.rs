// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Command-line interface for evaluating expressions
//!
//! Set `RUST_LOG=debug` to see cache and registry activity.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use expression_language::{
    Bindings, EngineConfig, ExpressionEngine, ExpressionService, FailurePolicy, Value, tokenize,
};
use serde_json::Value as JsonValue;
use std::fs;
use std::io::{self, Read};
use std::process;

#[derive(Parser)]
#[command(name = "exprlang")]
#[command(about = "Evaluate, parse and check expressions")]
#[command(version)]
#[command(author = "OctoFHIR Team <funyloony@gmail.com>")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression against JSON bindings
    Eval {
        /// Expression to evaluate
        expression: String,
        /// JSON object file with the bindings ("-" reads stdin)
        #[arg(short, long)]
        bindings: Option<String>,
        /// JSON engine configuration file
        #[arg(short, long)]
        config: Option<String>,
        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
        /// Print "null" and exit successfully when the expression does not parse
        #[arg(long)]
        suppress_parse_errors: bool,
    },
    /// Parse an expression and print its syntax tree
    Parse {
        /// Expression to parse
        expression: String,
    },
    /// Print the token stream of an expression
    Tokens {
        /// Expression to tokenize
        expression: String,
    },
    /// Check that an expression parses and only uses allowed variables
    Check {
        /// Expression to check
        expression: String,
        /// Variable name the expression may reference (repeatable)
        #[arg(short, long = "allow")]
        allow: Vec<String>,
    },
    /// List the built-in functions
    Functions,
}

fn main() {
    human_panic::setup_panic!();
    env_logger::init();

    let cli = Cli::parse();
    if let Err(err) = run(cli.command) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Eval {
            expression,
            bindings,
            config,
            pretty,
            suppress_parse_errors,
        } => handle_eval(
            &expression,
            bindings.as_deref(),
            config.as_deref(),
            pretty,
            suppress_parse_errors,
        ),
        Commands::Parse { expression } => {
            let ast = ExpressionEngine::new().parse(&expression)?;
            println!("{}", serde_json::to_string_pretty(&ast)?);
            Ok(())
        }
        Commands::Tokens { expression } => {
            for token in tokenize(&expression)? {
                println!(
                    "{:>4}..{:<4} {:<12} {}",
                    token.start,
                    token.end,
                    format!("{:?}", token.value.kind()),
                    token.slice(&expression)
                );
            }
            Ok(())
        }
        Commands::Check { expression, allow } => {
            let allowed: Vec<&str> = allow.iter().map(String::as_str).collect();
            ExpressionEngine::new().validate(&expression, &allowed)?;
            println!("OK");
            Ok(())
        }
        Commands::Functions => {
            print!("{}", ExpressionEngine::new().registry().generate_function_docs());
            Ok(())
        }
    }
}

fn handle_eval(
    expression: &str,
    bindings: Option<&str>,
    config: Option<&str>,
    pretty: bool,
    suppress_parse_errors: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config file '{path}'"))?;
            EngineConfig::from_json_str(&text)
                .with_context(|| format!("parsing config file '{path}'"))?
        }
        None => EngineConfig::default(),
    };

    let bindings = match bindings {
        Some(source) => load_bindings(source)?,
        None => Bindings::new(),
    };

    let policy = if suppress_parse_errors {
        FailurePolicy::SuppressParseErrors
    } else {
        FailurePolicy::Propagate
    };
    let service = ExpressionService::with_engine(ExpressionEngine::with_config(config))
        .with_policy(policy);

    let result = service.evaluate(expression, &bindings)?.unwrap_or(Value::Null);
    let json = JsonValue::from(result);
    let output = if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    println!("{output}");
    Ok(())
}

fn load_bindings(source: &str) -> Result<Bindings> {
    let text = if source == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("reading bindings from stdin")?;
        buffer
    } else {
        fs::read_to_string(source).with_context(|| format!("reading bindings file '{source}'"))?
    };

    let json: JsonValue = serde_json::from_str(&text).context("parsing bindings JSON")?;
    if !json.is_object() && !json.is_null() {
        bail!("bindings must be a JSON object");
    }
    Ok(Bindings::from_json(json)?)
}
