mod app;
mod auth;
mod campaigns;
mod config;
mod dashboard;
mod error;
mod imports;
mod invoices;
mod state;
mod store;
mod validation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "campaign_desk=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = state::AppState::init().await?;
    tracing::info!(
        upload_dir = %state.config.imports.upload_dir.display(),
        campaign_policy = %state.config.imports.campaign_policy,
        invoice_policy = %state.config.imports.invoice_policy,
        "configuration loaded"
    );

    let app = app::build_app(state);
    app::serve(app).await
}
