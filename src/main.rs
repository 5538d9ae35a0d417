use anyhow::Context;
use clap::Parser;
use knotbus::utils::{logger, validation::Validate};
use knotbus::{CliConfig, Document, KnotError, KnotRunner, RunnerConfig};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting knotbus CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli).await {
        let exit_code = match e.downcast_ref::<KnotError>() {
            Some(knot_error) => {
                tracing::error!(
                    "❌ Knot chain failed: {} (Category: {:?})",
                    knot_error,
                    knot_error.category()
                );
                tracing::error!("💡 Recovery suggestion: {}", knot_error.recovery_suggestion());
                eprintln!("💡 建議: {}", knot_error.recovery_suggestion());
                if knot_error.is_transport() {
                    2
                } else {
                    1
                }
            }
            None => {
                tracing::error!("❌ {:#}", e);
                1
            }
        };
        eprintln!("❌ {:#}", e);
        std::process::exit(exit_code);
    }
}

async fn run(cli: &CliConfig) -> anyhow::Result<()> {
    cli.validate()?;

    let config = RunnerConfig::from_file(&cli.config)?;
    let options = config
        .delivery_options()
        .with_timeout_ms(cli.timeout_or(config.bus.request_timeout_ms));

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }
    let runner = KnotRunner::start_with_options(&config, options, cli.monitor)?;

    let input = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("Cannot read input document {}", cli.input.display()))?;
    let document: Document = serde_json::from_str(&input)
        .with_context(|| format!("Invalid document JSON in {}", cli.input.display()))?;

    let result = runner.run(document).await;
    runner.shutdown().await;
    let document = result?;

    let output = serde_json::to_string_pretty(&document)?;
    match &cli.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, output)
                .with_context(|| format!("Cannot write output to {}", path.display()))?;
            tracing::info!("📁 Output saved to: {}", path.display());
        }
        None => println!("{}", output),
    }

    tracing::info!("✅ Knot chain completed");
    Ok(())
}
