use anyhow::Result;
use colored::*;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::api_client::ApiClient;
use crate::output::{print_frame, TestResult};
use crate::ws_client::Connection;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);
const SILENCE_WINDOW: Duration = Duration::from_secs(1);

fn unique_name(prefix: &str) -> String {
    format!("{prefix} {}", uuid::Uuid::new_v4().simple())
}

/// The `{name, price, description}` message subscribers should see for `product`.
fn expected_message(product: &Value) -> Value {
    json!({
        "name": product["name"],
        "price": product["price"],
        "description": product["description"],
    })
}

pub async fn test_connection(
    api_client: &ApiClient,
    ws1: &mut Connection,
    ws2: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Connection ===".bright_cyan().bold());

    api_client.health().await?;
    println!("{} Backend is healthy", "✓".green());

    // Nothing has been created, so neither subscriber should receive anything.
    for ws in [ws1, ws2] {
        if let Err(e) = ws.expect_silence(SILENCE_WINDOW).await {
            println!("{} {} received an unexpected frame", "✗".red(), ws.label);
            return Ok(TestResult::fail(
                "connection",
                format!("{}: {}", ws.label, e),
                start.elapsed(),
            ));
        }
        println!("{} {} connected and idle", "✓".green(), ws.label);
    }

    Ok(TestResult::pass("connection", start.elapsed()))
}

pub async fn test_product_create(
    api_client: &ApiClient,
    ws1: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Product Create ===".bright_cyan().bold());

    println!("{} Creating product...", "→".blue());
    let product = api_client
        .create_product(&unique_name("Widget"), "9.99", "A widget")
        .await?;
    println!("{} Product created (ID: {})", "✓".green(), product["id"]);

    println!("{} Waiting for {} to be notified...", "→".blue(), ws1.label);
    match ws1.wait_for_frame(FRAME_TIMEOUT).await {
        Ok(frame) => {
            print_frame(&ws1.label, &frame);

            if *frame.message() == expected_message(&product) {
                println!("{} Notification matches the created product", "✓".green());
                Ok(TestResult::pass("product_create", start.elapsed()))
            } else {
                println!("{} Notification mismatch!", "✗".red());
                Ok(TestResult::fail(
                    "product_create",
                    format!(
                        "Expected message={}, got message={}",
                        expected_message(&product),
                        frame.message()
                    ),
                    start.elapsed(),
                ))
            }
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            Ok(TestResult::fail(
                "product_create",
                e.to_string(),
                start.elapsed(),
            ))
        }
    }
}

pub async fn test_fan_out(
    api_client: &ApiClient,
    ws1: &mut Connection,
    ws2: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Fan-out ===".bright_cyan().bold());

    let product = api_client
        .create_product(&unique_name("Gadget"), "12.50", "")
        .await?;
    let expected = expected_message(&product);

    for ws in [ws1, ws2] {
        match ws.wait_for_frame(FRAME_TIMEOUT).await {
            Ok(frame) if *frame.message() == expected => {
                print_frame(&ws.label, &frame);
            }
            Ok(frame) => {
                return Ok(TestResult::fail(
                    "fan_out",
                    format!("{} got {}, expected {}", ws.label, frame.message(), expected),
                    start.elapsed(),
                ));
            }
            Err(e) => {
                return Ok(TestResult::fail(
                    "fan_out",
                    format!("{}: {}", ws.label, e),
                    start.elapsed(),
                ));
            }
        }
    }

    println!("{} Both subscribers received the notification", "✓".green());
    Ok(TestResult::pass("fan_out", start.elapsed()))
}

pub async fn test_ordering(api_client: &ApiClient, ws1: &mut Connection) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Ordering ===".bright_cyan().bold());

    let mut expected = Vec::new();
    for (i, price) in ["1.00", "2.00", "3.00"].iter().enumerate() {
        let product = api_client
            .create_product(&unique_name(&format!("Ordered {i}")), price, "")
            .await?;
        expected.push(expected_message(&product));
    }
    println!("{} Created {} products in sequence", "✓".green(), expected.len());

    for (i, want) in expected.iter().enumerate() {
        match ws1.wait_for_frame(FRAME_TIMEOUT).await {
            Ok(frame) if frame.message() == want => {}
            Ok(frame) => {
                return Ok(TestResult::fail(
                    "ordering",
                    format!("Frame {i} was {}, expected {}", frame.message(), want),
                    start.elapsed(),
                ));
            }
            Err(e) => {
                return Ok(TestResult::fail(
                    "ordering",
                    format!("Frame {i}: {e}"),
                    start.elapsed(),
                ));
            }
        }
    }

    println!("{} Notifications arrived in creation order", "✓".green());
    Ok(TestResult::pass("ordering", start.elapsed()))
}

pub async fn test_invalid_product(
    api_client: &ApiClient,
    ws1: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Invalid Product ===".bright_cyan().bold());

    let (status, body) = api_client
        .post_product(json!({"name": "", "price": "-1", "description": ""}))
        .await?;

    if status != StatusCode::BAD_REQUEST {
        return Ok(TestResult::fail(
            "invalid_product",
            format!("Expected 400, got {status}: {body}"),
            start.elapsed(),
        ));
    }
    println!("{} Rejected with field errors: {}", "✓".green(), body);

    match ws1.expect_silence(SILENCE_WINDOW).await {
        Ok(()) => {
            println!("{} No notification was sent", "✓".green());
            Ok(TestResult::pass("invalid_product", start.elapsed()))
        }
        Err(e) => Ok(TestResult::fail(
            "invalid_product",
            e.to_string(),
            start.elapsed(),
        )),
    }
}
