use clap::Parser;
use poly_arb::cli::{Cli, Commands};
use poly_arb::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {:#}", cli.config, e);
            eprintln!("Using bundled example configuration");
            Config::from_toml(include_str!("../config.toml.example"))?
        }
    };

    poly_arb::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(markets = config.markets.len(), "Starting market sync");
            args.execute(&config).await?;
        }
        Commands::Replay(args) => {
            args.execute(&config).await?;
        }
        Commands::Inspect(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Telemetry: level={} format={:?} metrics={}",
                config.telemetry.log_level,
                config.telemetry.log_format,
                if config.telemetry.metrics_enabled {
                    format!("port {}", config.telemetry.metrics_port)
                } else {
                    "off".to_string()
                }
            );
            println!(
                "  Feed: {} (ping every {}s)",
                config.feed.ws_url, config.feed.ping_interval_secs
            );
            println!(
                "  Matching: payout={} min_size={}",
                config.matching.payout, config.matching.min_tradable_size
            );
            println!(
                "  Execution: {:?} fee_rate={}",
                config.execution.mode, config.execution.fee_rate
            );
            if config.data.enabled {
                println!(
                    "  Data: {} (rotate {}, ladders={})",
                    config.data.output_dir.display(),
                    config.data.rotation_interval,
                    config.data.record_ladders
                );
            } else {
                println!("  Data: off");
            }
            println!("  Markets:");
            for market in &config.markets {
                match market.static_subscription() {
                    Some(s) => println!(
                        "    {} (id {}, outcomes: {})",
                        s.market_slug,
                        s.market_id,
                        s.outcomes
                            .iter()
                            .map(|o| o.outcome_name.as_str())
                            .collect::<Vec<_>>()
                            .join(" / ")
                    ),
                    None => println!("    {} (resolved via Gamma)", market.slug),
                }
            }
        }
    }

    Ok(())
}
