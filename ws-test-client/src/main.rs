use anyhow::Result;
use clap::Parser;
use colored::*;

mod api_client;
mod output;
mod scenarios;
mod ws_client;

use api_client::ApiClient;
use output::print_test_summary;
use ws_client::{ws_url, Connection};

#[derive(Parser)]
#[command(name = "ws-test-client")]
#[command(about = "Websocket product notification integration testing tool")]
struct Cli {
    /// Base URL of the backend (e.g., http://localhost:4000)
    #[arg(long, default_value = "http://localhost:4000")]
    base_url: String,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// Connect two subscribers without creating any data
    ConnectionTest,
    /// Create one product and check the notification
    ProductCreate,
    /// Create one product and check both subscribers are notified
    FanOut,
    /// Create several products and check notification order
    Ordering,
    /// Post an invalid product and check nothing is sent
    InvalidProduct,
    /// Run every scenario
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());

    let api_client = ApiClient::new(reqwest::Client::new(), cli.base_url.clone());

    println!("\n{} Establishing websocket connections...", "→".blue());
    let products_url = ws_url(&cli.base_url, "/ws/products/");
    let mut ws1 = Connection::establish(&products_url, "Subscriber 1".to_string()).await?;
    let mut ws2 = Connection::establish(&products_url, "Subscriber 2".to_string()).await?;

    println!("{} Subscriber 1 connected", "✓".green());
    println!("{} Subscriber 2 connected", "✓".green());

    println!("\n{}", "=== TEST PHASE ===".bright_white().bold());

    let mut results = Vec::new();

    match cli.scenario {
        ScenarioChoice::ConnectionTest => {
            results.push(scenarios::test_connection(&api_client, &mut ws1, &mut ws2).await?);
        }
        ScenarioChoice::ProductCreate => {
            results.push(scenarios::test_product_create(&api_client, &mut ws1).await?);
        }
        ScenarioChoice::FanOut => {
            results.push(scenarios::test_fan_out(&api_client, &mut ws1, &mut ws2).await?);
        }
        ScenarioChoice::Ordering => {
            results.push(scenarios::test_ordering(&api_client, &mut ws1).await?);
        }
        ScenarioChoice::InvalidProduct => {
            results.push(scenarios::test_invalid_product(&api_client, &mut ws1).await?);
        }
        ScenarioChoice::All => {
            results.push(scenarios::test_connection(&api_client, &mut ws1, &mut ws2).await?);
            // Fan-out runs before the single-subscriber scenarios so both
            // connections start with empty queues.
            results.push(scenarios::test_fan_out(&api_client, &mut ws1, &mut ws2).await?);
            results.push(scenarios::test_product_create(&api_client, &mut ws1).await?);
            results.push(scenarios::test_ordering(&api_client, &mut ws1).await?);
            results.push(scenarios::test_invalid_product(&api_client, &mut ws1).await?);
        }
    }

    ws1.close().await;
    ws2.close().await;

    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
