use aws_config::BehaviorVersion;
use aws_sdk_lambda::Client;
use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;

const GREETING_BODY: &str = "Hello World!";
const TIME_PREFIX: &str = "The time is ";

// The handler ignores the name; sending one keeps the events shaped like
// real gateway traffic.
const NAMES: &[&str] = &["mariner", "harbor", "gale", "ember", "lantern"];

#[derive(Default)]
struct Stats {
    success_count: usize,
    error_count: usize,
    total_latency_ms: f64,
    min_latency_ms: f64,
    max_latency_ms: f64,
}

impl Stats {
    fn record_success(&mut self, latency_ms: f64) {
        self.success_count += 1;
        self.total_latency_ms += latency_ms;
        if self.success_count == 1 || latency_ms < self.min_latency_ms {
            self.min_latency_ms = latency_ms;
        }
        if latency_ms > self.max_latency_ms {
            self.max_latency_ms = latency_ms;
        }
    }
}

#[derive(Deserialize)]
struct FunctionResponse {
    #[serde(rename = "statusCode")]
    status_code: u16,
    body: String,
}

#[derive(Parser, Debug)]
#[command(name = "invoke-test")]
#[command(about = "Invoke the time function and check its responses")]
struct Args {
    /// Lambda function name
    function: String,

    /// Number of iterations to run
    #[arg(long, default_value = "100")]
    iters: usize,

    /// Number of parallel threads
    #[arg(long, default_value = "1", value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    threads: usize,

    /// Expect the fixed greeting instead of a timestamp body
    #[arg(long)]
    echo: bool,
}

fn body_matches(echo: bool, body: &str) -> bool {
    if echo {
        body == GREETING_BODY
    } else {
        body.starts_with(TIME_PREFIX)
    }
}

async fn run_invocations(
    client: Arc<Client>,
    function_name: String,
    thread_id: usize,
    start: usize,
    end: usize,
    total: usize,
    echo: bool,
    stats: Arc<Mutex<Stats>>,
) {
    let mut rng = StdRng::from_entropy();

    for i in start..=end {
        // Half the events carry a name parameter, half are empty; the
        // response must not depend on the difference.
        let payload = if rng.gen_bool(0.5) {
            let name = NAMES[rng.gen_range(0..NAMES.len())];
            serde_json::json!({ "queryStringParameters": { "name": name } })
        } else {
            serde_json::json!({})
        };

        let started = Instant::now();
        let result = client
            .invoke()
            .function_name(&function_name)
            .payload(aws_sdk_lambda::primitives::Blob::new(
                serde_json::to_vec(&payload).unwrap(),
            ))
            .send()
            .await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(response) => {
                let response_payload = response
                    .payload()
                    .map(|b| String::from_utf8_lossy(b.as_ref()).to_string())
                    .unwrap_or_else(|| "No response".to_string());

                let passed = match serde_json::from_str::<FunctionResponse>(&response_payload) {
                    Ok(parsed) => parsed.status_code == 200 && body_matches(echo, &parsed.body),
                    Err(_) => false,
                };

                // Update stats
                {
                    let mut stats = stats.lock().await;
                    if passed {
                        stats.record_success(latency_ms);
                    } else {
                        stats.error_count += 1;
                    }
                }

                println!(
                    "[Thread {}: {}/{}] {} in {:.3}ms => {}",
                    thread_id,
                    i,
                    total,
                    if passed { "ok" } else { "unexpected" },
                    latency_ms,
                    response_payload
                );
            }
            Err(e) => {
                // Update error count
                {
                    let mut stats = stats.lock().await;
                    stats.error_count += 1;
                }

                eprintln!(
                    "[Thread {}: {}/{}] Error invoking {}: {}",
                    thread_id, i, total, function_name, e
                );
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    println!(
        "Running {} invocations across {} thread(s)",
        args.iters, args.threads
    );

    // Create AWS Lambda client
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let client = Arc::new(Client::new(&config));

    // Create shared stats
    let stats = Arc::new(Mutex::new(Stats::default()));

    // Calculate iterations per thread
    let iters_per_thread = args.iters / args.threads;
    let remainder = args.iters % args.threads;

    let mut tasks = JoinSet::new();

    let total_iters = args.iters;
    let echo = args.echo;

    let mut start = 1;
    for t in 1..=args.threads {
        let end = if t == args.threads {
            start + iters_per_thread - 1 + remainder
        } else {
            start + iters_per_thread - 1
        };

        let client = Arc::clone(&client);
        let function_name = args.function.clone();
        let stats = Arc::clone(&stats);

        tasks.spawn(async move {
            run_invocations(
                client,
                function_name,
                t,
                start,
                end,
                total_iters,
                echo,
                stats,
            )
            .await;
        });

        start = end + 1;
    }

    // Wait for all tasks to complete
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            eprintln!("Task failed: {}", e);
        }
    }

    // Print summary
    let stats = stats.lock().await;
    println!("Completed {} invocations", args.iters);
    println!();
    println!("Results:");
    println!("  Success: {}", stats.success_count);
    println!("  Errors:  {}", stats.error_count);
    if stats.success_count > 0 {
        let avg_latency = stats.total_latency_ms / stats.success_count as f64;
        println!("  Avg latency: {:.3}ms", avg_latency);
        println!("  Min latency: {:.3}ms", stats.min_latency_ms);
        println!("  Max latency: {:.3}ms", stats.max_latency_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_bodies_only_pass_in_echo_mode() {
        assert!(body_matches(true, "Hello World!"));
        assert!(!body_matches(false, "Hello World!"));
    }

    #[test]
    fn time_bodies_only_pass_in_query_mode() {
        assert!(body_matches(false, "The time is 2026-08-22 09:15:00 UTC"));
        assert!(!body_matches(true, "The time is 2026-08-22 09:15:00 UTC"));
        assert!(!body_matches(false, "The time is"));
    }

    #[test]
    fn stats_track_latency_bounds() {
        let mut stats = Stats::default();
        stats.record_success(12.0);
        stats.record_success(4.0);
        stats.record_success(9.0);
        assert_eq!(stats.success_count, 3);
        assert_eq!(stats.total_latency_ms, 25.0);
        assert_eq!(stats.min_latency_ms, 4.0);
        assert_eq!(stats.max_latency_ms, 12.0);
    }

    #[test]
    fn function_response_parses_the_gateway_record() {
        let parsed: FunctionResponse = serde_json::from_str(
            r#"{"statusCode":200,"headers":{"Content-Type":"text/html; charset=UTF-8"},"body":"Hello World!"}"#,
        )
        .unwrap();
        assert_eq!(parsed.status_code, 200);
        assert_eq!(parsed.body, "Hello World!");
    }

    #[test]
    fn thread_count_must_be_positive() {
        assert!(Args::try_parse_from(["invoke-test", "my-function", "--threads", "0"]).is_err());

        let args = Args::try_parse_from(["invoke-test", "my-function", "--threads", "2"]).unwrap();
        assert_eq!(args.threads, 2);
    }
}
