use std::collections::BTreeMap;

use serde::Serialize;

use crate::cmd::EnvinfoArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

const ENV_VARS: [&str; 7] = [
    "CYFLOWREC_PORT_DEV",
    "CYFLOWREC_STORAGE_DIR",
    "CYFLOWREC_ON_COLLISION",
    "CYFLOWREC_BAUD",
    "CYFLOWREC_MESSAGE_TIMEOUT",
    "CYFLOWREC_LOG_LEVEL",
    "RUST_LOG",
];

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

#[derive(Serialize)]
struct EnvInfoOutput {
    name: &'static str,
    version: &'static str,
    target: &'static str,
    git_hash: &'static str,
    platform: PlatformInfo,
    dependencies: BTreeMap<&'static str, &'static str>,
    environment: BTreeMap<&'static str, Option<String>>,
}

pub fn run(_args: EnvinfoArgs, format: OutputFormat) -> CliResult<i32> {
    let output = collect();

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Pretty => {
            println!("{} {}", output.name, output.version);
            println!("  Target:    {}", output.target);
            println!("  Platform:  {}/{}", output.platform.os, output.platform.arch);
            println!("  Git hash:  {}", output.git_hash);
            println!("  Dependencies:");
            for (name, version) in &output.dependencies {
                println!("    {name:<20} {version}");
            }
            println!("  Environment:");
            for (name, value) in &output.environment {
                println!("    {name:<28} {}", value.as_deref().unwrap_or("(unset)"));
            }
        }
    }

    Ok(SUCCESS)
}

fn collect() -> EnvInfoOutput {
    let dependencies = BTreeMap::from([
        ("clap", "4.5"),
        ("libc", "0.2"),
        ("tracing", "0.1"),
        ("tracing-subscriber", "0.3"),
    ]);

    let environment = ENV_VARS
        .iter()
        .map(|name| (*name, std::env::var(name).ok()))
        .collect();

    EnvInfoOutput {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        target: option_env!("CYFLOWREC_BUILD_TARGET").unwrap_or("unknown"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        platform: PlatformInfo {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        },
        dependencies,
        environment,
    }
}
