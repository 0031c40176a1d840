use std::fs::File;
use std::io::BufReader;

use arrrg::CommandLine;
use k8scel::{constraint_to_binding, template_to_policy_definition, Constraint, ConstraintTemplate};

#[derive(Clone, Default, Debug, Eq, PartialEq, arrrg_derive::CommandLine)]
struct Options {
    #[arrrg(optional, "Compile the ConstraintTemplate JSON at this path.")]
    template: Option<String>,
    #[arrrg(optional, "Compile the constraint JSON at this path.")]
    constraint: Option<String>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let file = File::open(path).map_err(|err| format!("could not open {path}: {err}"))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .map_err(|err| format!("could not parse {path}: {err}"))?;
    Ok(value)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("k8scel=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let (options, free) = Options::from_command_line_relaxed(
        "USAGE: k8scel-transform [--template PATH] [--constraint PATH]",
    );
    if !free.is_empty() {
        eprintln!("command takes no positional arguments");
        std::process::exit(13);
    }
    if options.template.is_none() && options.constraint.is_none() {
        eprintln!("expected --template, --constraint, or both");
        std::process::exit(13);
    }

    if let Some(path) = options.template.as_deref() {
        let template: ConstraintTemplate = read_json(path)?;
        tracing::info!(path, kind = template.constraint_kind(), "compiling template");
        let policy = template_to_policy_definition(&template)?;
        println!("{}", serde_json::to_string_pretty(&policy)?);
    }
    if let Some(path) = options.constraint.as_deref() {
        let constraint: Constraint = read_json(path)?;
        tracing::info!(path, kind = %constraint.kind, name = constraint.name(), "compiling constraint");
        let binding = constraint_to_binding(&constraint)?;
        println!("{}", serde_json::to_string_pretty(&binding)?);
    }
    Ok(())
}
