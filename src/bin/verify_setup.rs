//! Setup verification
//!
//! Checks the analytics credential and the Gist settings the server will use.
//! With `--connect` the credential is also exchanged for an access token.

use std::process::ExitCode;

use sitepulse_server::{
    services::{
        credentials::StagedCredentials,
        google::{self, ServiceAccountKey},
        http_client,
    },
    AppConfig,
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitepulse_server=warn".into()),
        )
        .init();

    let connect = std::env::args().skip(1).any(|arg| arg == "--connect");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FAIL  configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut ok = true;
    ok &= check_analytics(&config, connect).await;
    ok &= check_gist(&config);

    if ok {
        println!("All checks passed");
        ExitCode::SUCCESS
    } else {
        println!("Some checks failed, see above");
        ExitCode::FAILURE
    }
}

async fn check_analytics(config: &AppConfig, connect: bool) -> bool {
    let key = {
        let staged = match StagedCredentials::acquire(&config.analytics) {
            Ok(staged) => staged,
            Err(e) => {
                println!("FAIL  analytics credentials: {}", e);
                return false;
            }
        };
        match ServiceAccountKey::from_file(staged.path()) {
            Ok(key) => key,
            Err(e) => {
                println!("FAIL  analytics credentials: {}", e);
                return false;
            }
        }
    };

    println!("ok    analytics credentials");
    println!("      service account: {}", key.client_email);
    println!("      project: {}", key.project_id);

    let mut ok = true;
    match config.analytics.property_id.as_deref() {
        Some(property) => println!("ok    property: {}", google::property_resource(property)),
        None => {
            println!("FAIL  property: GA_PROPERTY_ID not set");
            ok = false;
        }
    }

    if connect {
        let token = match http_client(&config.http) {
            Ok(client) => google::fetch_access_token(&client, &key).await,
            Err(e) => Err(e),
        };
        match token {
            Ok(_) => println!("ok    access token obtained"),
            Err(e) => {
                println!("FAIL  access token: {}", e);
                ok = false;
            }
        }
    }

    ok
}

fn check_gist(config: &AppConfig) -> bool {
    println!("      gist: {} ({})", config.gist.gist_id, config.gist.filename);

    if config.gist.token.is_some() {
        println!("ok    gist token");
        true
    } else {
        println!("FAIL  gist token: GIST_TOKEN not set");
        false
    }
}
