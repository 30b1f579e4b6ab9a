use clap::Parser;
use outpaint_studio::adapter::{self, FunctionAdapter, FunctionEvent};
use outpaint_studio::config::AppConfig;
use std::path::PathBuf;
use std::sync::Arc;

/// Hosts the image-extension endpoint at POST /generate.
#[derive(Parser, Debug)]
#[command(name = "outpaint_server", about = "Serve the outpaint fill endpoint")]
struct ServerArgs {
    /// Run one serverless-style invocation from an event JSON file and print the response.
    #[arg(long, value_name = "FILE")]
    event: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = ServerArgs::parse();

    let config = AppConfig::load_or_default(&AppConfig::default_path()).with_env_overrides();
    let api_key = AppConfig::api_key_from_env()?;
    let orchestrator = config.orchestrator(api_key);

    if let Some(path) = args.event {
        let event: FunctionEvent = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let response = adapter::serve_request(&FunctionAdapter, &orchestrator, event).await;
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    log::info!(
        "🚀 Serving POST /generate on http://{} (model {}, timeout {:?})",
        listener.local_addr()?,
        config.model,
        orchestrator.timeout()
    );
    axum::serve(listener, adapter::router(Arc::new(orchestrator))).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_event_flag_takes_a_path() {
        let args = ServerArgs::try_parse_from(["outpaint_server", "--event", "event.json"]).unwrap();
        assert_eq!(args.event, Some(PathBuf::from("event.json")));
        assert!(ServerArgs::try_parse_from(["outpaint_server"]).unwrap().event.is_none());
    }

    #[test]
    fn test_help_and_stray_arguments() {
        let help = ServerArgs::try_parse_from(["outpaint_server", "--help"]).unwrap_err();
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);

        let stray = ServerArgs::try_parse_from(["outpaint_server", "serve"]).unwrap_err();
        assert_eq!(stray.kind(), ErrorKind::UnknownArgument);
    }
}
