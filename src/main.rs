use canteen_jarvis::adapters::menu::menu_source_for;
use canteen_jarvis::domain::model::{ChatMessage, ChatReply};
use canteen_jarvis::utils::error::{ErrorSeverity, JarvisError};
use canteen_jarvis::utils::{logger, validation::Validate};
use canteen_jarvis::{CliConfig, Gateway, JarvisConfig, RateLimitStore, RateLimiter};
use clap::Parser;
use reqwest::header::{HeaderMap, HeaderValue};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

fn exit_code(e: &JarvisError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: JarvisError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e).max(1));
}

fn client_headers(client_ip: &str) -> Result<HeaderMap, JarvisError> {
    let value = HeaderValue::from_str(client_ip).map_err(|e| JarvisError::InvalidConfigValueError {
        field: "client_ip".to_string(),
        value: client_ip.to_string(),
        reason: e.to_string(),
    })?;
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", value);
    Ok(headers)
}

fn print_reply(name: &str, reply: &ChatReply) {
    println!("{} ({}): {}", name, reply.provider, reply.reply.content);
    if let Some(order) = &reply.order {
        for line in &order.lines {
            println!("  🧾 {} x {} = ₹{:.2}", line.quantity, line.item.name, line.subtotal());
        }
        println!("  💰 Total: ₹{:.2}", order.total);
    }
    if !reply.unresolved.is_empty() {
        println!("  ❓ Not found: {}", reply.unresolved.join(", "));
    }
    if !reply.unavailable.is_empty() {
        println!("  🚫 Unavailable: {}", reply.unavailable.join(", "));
    }
}

async fn run_interactive(gateway: &Gateway, cli: &CliConfig, headers: &HeaderMap, name: &str) -> Result<(), JarvisError> {
    let mut history: Vec<ChatMessage> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("💬 {} is listening. Type an order, or 'exit' to quit.", name);
    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "exit" | "quit") {
            break;
        }

        match gateway.chat_on(&cli.route, headers, message, &history).await {
            Ok(reply) => {
                print_reply(name, &reply);
                history.push(ChatMessage::user(message));
                history.push(reply.reply);
            }
            Err(e) => {
                tracing::warn!("Chat turn failed: {}", e);
                eprintln!("⚠️  {}", e.user_friendly_message());
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting jarvis CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        fail(e);
    }

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            JarvisConfig::from_file(path).unwrap_or_else(|e| fail(e))
        }
        None => JarvisConfig::default(),
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        fail(e);
    }

    let Some(menu_location) = cli.menu.clone().or_else(|| config.menu_source().map(str::to_string)) else {
        fail(JarvisError::MissingConfigError {
            field: "menu.source (or --menu)".to_string(),
        });
    };

    let headers = client_headers(&cli.client_ip).unwrap_or_else(|e| fail(e));

    let limiter = RateLimiter::with_system_clock(Arc::new(RateLimitStore::new()));
    let sweeper = limiter.spawn_sweeper(config.sweep_interval(), config.cleanup_horizon());
    let gateway = Gateway::from_config(&config, limiter, menu_source_for(&menu_location));
    let name = config.assistant_name().to_string();

    let outcome = match &cli.message {
        Some(message) => gateway
            .chat_on(&cli.route, &headers, message, &[])
            .await
            .and_then(|reply| {
                print_reply(&name, &reply);
                if cli.verbose {
                    println!("{}", serde_json::to_string_pretty(&reply)?);
                }
                Ok(())
            }),
        None => run_interactive(&gateway, &cli, &headers, &name).await,
    };

    sweeper.shutdown().await;

    if let Err(e) = outcome {
        let code = exit_code(&e);
        tracing::error!("❌ {} (Category: {:?})", e, e.category());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());
        if code > 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}
