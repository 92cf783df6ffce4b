use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use devin_assign::events::{register_create_session, DevinConnector};
use devin_assign::{
    assign_record, AssignError, AssignOutcome, ExtensionSettings, FixtureRecords, EXTENSION_ID,
};
use field_bridge::{
    Bridge, CallOptions, HandlerContext, HandlerRegistry, LoopbackTrigger, MemoryFieldChannel,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SETTINGS_PATH_ENV: &str = "DEVIN_ASSIGN_SETTINGS_PATH";
const RECORD_PATH_ENV: &str = "DEVIN_ASSIGN_RECORD_PATH";
const API_URL_ENV: &str = "DEVIN_ASSIGN_API_URL";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(AssignOutcome::Created(_) | AssignOutcome::AlreadyAssigned(_)) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("Error: {}", error.message());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<AssignOutcome, AssignError> {
    let raw_settings = ExtensionSettings::load(&env_path(SETTINGS_PATH_ENV)?)?;
    let settings = ExtensionSettings::from_value(raw_settings.clone())?;
    let records = FixtureRecords::load(&env_path(RECORD_PATH_ENV)?)?;

    let mut connector = DevinConnector::new();
    if let Some(base_url) = std::env::var(API_URL_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
    {
        connector = connector.with_base_url(base_url);
    }

    let channel = MemoryFieldChannel::new();
    let mut registry = HandlerRegistry::new(EXTENSION_ID, channel.clone());
    register_create_session(&mut registry, Arc::new(connector));
    let trigger = LoopbackTrigger::new(
        Arc::new(registry),
        HandlerContext::new(EXTENSION_ID, raw_settings),
    );
    let bridge = Bridge::new(EXTENSION_ID, channel, trigger).with_options(CallOptions::from_env());

    let mut output: Vec<String> = Vec::new();
    let outcome = assign_record(records.record(), &settings, &records, &bridge, &mut output).await;
    for line in &output {
        println!("{line}");
    }
    Ok(outcome)
}

fn env_path(name: &'static str) -> Result<PathBuf, AssignError> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .ok_or(AssignError::MissingEnv { name })
}
