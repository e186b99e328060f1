//! Server command implementation

use anyhow::Result;

use forecaster_server::{ServerConfig, ACTIVATION_KEY_ENV, ALLOWED_ORIGINS_ENV};

pub async fn cmd_serve(host: &str, port: u16, no_auth: bool) -> Result<()> {
    println!("🚀 Starting Forecaster web server...");
    println!("   Listening: http://{}:{}", host, port);

    let mut config = ServerConfig::from_env();
    config.require_auth = !no_auth;

    if no_auth {
        println!();
        println!("   ⚠️  Activation gate DISABLED - do not expose to network!");
    } else if std::env::var(ACTIVATION_KEY_ENV).is_ok() {
        println!("   🔑 Activation key: from {}", ACTIVATION_KEY_ENV);
    } else {
        println!("   🔑 Activation key: built-in default");
        println!("      Set {} to use your own key", ACTIVATION_KEY_ENV);
    }
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} ({})",
            config.allowed_origins.join(", "),
            ALLOWED_ORIGINS_ENV
        );
    }
    println!();
    println!("   Press Ctrl+C to stop");

    forecaster_server::serve_with_config(host, port, config).await
}
