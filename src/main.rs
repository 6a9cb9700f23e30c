//! rJMX-Bridge - JMX bridge agent
//!
//! Runs the configured JMX checks through jmxterm and serves the result over
//! HTTP, or runs them once from the command line.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use rjmx_bridge::check::{CheckRunner, CollectingSink};
use rjmx_bridge::cli::{Cli, OutputFormat};
use rjmx_bridge::config::Config;
use rjmx_bridge::exposition::TextFormatter;
use rjmx_bridge::server;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    rjmx_bridge::init_logging(&cli.log_level.to_string())?;

    let mut config = if cli.validate || cli.dry_run {
        Config::load(&cli.config)?
    } else {
        Config::load_or_default(&cli.config)?
    };
    cli.apply(&mut config);
    config.validate()?;

    if cli.validate {
        println!(
            "Configuration is valid ({} checks, {} instances)",
            config.checks.len(),
            config.instance_count()
        );
        return Ok(());
    }

    if cli.dry_run {
        print_dry_run(&config, cli.output_format)?;
        return Ok(());
    }

    if cli.once {
        return run_once(config, cli.output_format).await;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting rJMX-Bridge");
    server::run(config).await
}

fn print_dry_run(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(config)?),
        OutputFormat::Text => {
            let runner = CheckRunner::from_config(config)?;
            println!(
                "launcher: {} {}",
                config.launcher.program,
                config.launcher.args.join(" ")
            );
            for check in runner.checks() {
                for instance in check.instances() {
                    let domains = instance
                        .domains()
                        .map_or_else(|| "*".to_string(), |d| d.join(","));
                    println!(
                        "{} {} {}:{} domains={}",
                        check.name(),
                        instance.instance_name(),
                        instance.config().host,
                        instance.config().port,
                        domains
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_once(config: Config, format: OutputFormat) -> Result<()> {
    let runner = CheckRunner::from_config(&config)?;
    let mut sink = CollectingSink::new();
    let summary = runner.run_all(&mut sink).await;
    runner.kill_connectors().await;

    match format {
        OutputFormat::Text => print!(
            "{}",
            TextFormatter::new().render(&sink.samples, &sink.service_checks)
        ),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sink)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&sink)?),
    }

    if summary.failed > 0 {
        anyhow::bail!("{} of {} instances failed", summary.failed, summary.failed + summary.succeeded);
    }
    Ok(())
}
