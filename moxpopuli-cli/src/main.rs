use std::env;
use std::fs;
use std::io::{self, Read};

use moxpopuli_core::schema::{to_writer_pretty, Schema};
use moxpopuli_core::{merge_many, sensitivity_salt};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    run_cli()
}

// Extract the main logic into a separate function so we can call it from tests.
fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut ndjson = false;
    let mut example_limit: Option<i64> = Some(5);
    let mut input_file = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--ndjson" => {
                ndjson = true;
            }
            "--example-limit" => {
                if i + 1 < args.len() {
                    example_limit = Some(args[i + 1].parse::<i64>().map_err(|_| {
                        format!("Invalid value for --example-limit: {}", args[i + 1])
                    })?);
                    i += 1;
                } else {
                    return Err("Missing value for --example-limit".into());
                }
            }
            "--no-examples" => {
                example_limit = Some(0);
            }
            _ => {
                if !args[i].starts_with('-') && input_file.is_none() {
                    input_file = Some(args[i].clone());
                }
            }
        }
        i += 1;
    }

    let input = if let Some(path) = input_file {
        fs::read_to_string(path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let payloads: Vec<Result<serde_json::Value, String>> = if ndjson {
        input
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(|e| e.to_string()))
            .collect()
    } else {
        vec![serde_json::from_str(&input).map_err(|e| e.to_string())]
    };

    let count = payloads.len();
    let mut rng = SmallRng::from_entropy();
    let schema = merge_many(
        Schema::default(),
        payloads,
        example_limit,
        sensitivity_salt(),
        &mut rng,
    )
    .map_err(|e| format!("Schema inference failed: {e}"))?;

    let mut out = Vec::new();
    to_writer_pretty(&mut out, &schema)?;
    anstream::println!("{}", String::from_utf8(out)?);
    anstream::eprintln!("Processed {count} JSON payload(s)");
    Ok(())
}

fn print_help() {
    anstream::println!("moxpopuli-cli - JSON schema inference demonstrator");
    anstream::println!();
    anstream::println!("USAGE:");
    anstream::println!("    moxpopuli-cli [OPTIONS] [FILE]");
    anstream::println!();
    anstream::println!("ARGS:");
    anstream::println!("    <FILE>    Input JSON file (reads from stdin if not provided)");
    anstream::println!();
    anstream::println!("OPTIONS:");
    anstream::println!("    -h, --help              Print this help message");
    anstream::println!("    --ndjson                Treat input as newline-delimited JSON");
    anstream::println!("    --example-limit <N>      Keep up to N example payloads (default 5)");
    anstream::println!("    --no-examples           Discard the examples reservoir");
    anstream::println!();
    anstream::println!("EXAMPLES:");
    anstream::println!("    moxpopuli-cli data.jsonl --ndjson");
    anstream::println!("    echo '{{\"name\": \"test\"}}' | moxpopuli-cli");
}

#[cfg(test)]
mod tests {
    use super::*;
    use moxpopuli_core::derive;

    #[test]
    fn single_payload_merges_into_a_schema() {
        let payloads: Vec<Result<serde_json::Value, String>> =
            vec![Ok(serde_json::json!({"name": "a"}))];
        let mut rng = SmallRng::seed_from_u64(1);
        let schema = merge_many(Schema::default(), payloads, Some(5), &[], &mut rng).unwrap();
        assert_eq!(schema.samples(), 1);
    }

    #[test]
    fn invalid_json_surfaces_as_error() {
        let payloads: Vec<Result<serde_json::Value, String>> =
            vec![Err("unexpected token".to_string())];
        let mut rng = SmallRng::seed_from_u64(1);
        let result = merge_many(Schema::default(), payloads, Some(5), &[], &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn derive_is_reexported_at_crate_root() {
        let s = derive("x", &serde_json::json!(1), &[]);
        assert!(s.as_integer().is_some());
    }
}
