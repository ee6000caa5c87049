//! spendguard — budget-enforcement webhook binary.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

use spendguard_core::{GuardConfig, ProjectAllowList};
use spendguard_gcp::{
    AccessTokenProvider, BigQuerySpendReader, BillingSwitchClient, BudgetApiReader,
    MetadataTokenProvider,
};
use spendguard_server::{AppState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GuardConfig::from_env().context("load configuration")?;
    let http = reqwest::Client::builder()
        .build()
        .context("build HTTP client")?;
    let tokens: Arc<dyn AccessTokenProvider> = Arc::new(MetadataTokenProvider::new(http.clone()));

    let spend = BigQuerySpendReader::new(
        http.clone(),
        config.bq_project_id.clone(),
        config.cost_table.clone(),
        tokens.clone(),
    );
    let budget = BudgetApiReader::new(
        http.clone(),
        config.billing_account_id.clone(),
        config.budget_id.clone(),
        tokens.clone(),
    );
    let switch = BillingSwitchClient::new(http, tokens, config.simulate);

    let state = Arc::new(AppState {
        allowlist: ProjectAllowList::new(config.allowed_projects.iter().cloned()),
        spend: Arc::new(spend),
        budget: Arc::new(budget),
        switch: Arc::new(switch),
    });

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(
        %addr,
        simulate = config.simulate,
        allowed_projects = state.allowlist.len(),
        "spendguard listening"
    );
    axum::serve(listener, router(state))
        .await
        .context("serve")?;
    Ok(())
}
