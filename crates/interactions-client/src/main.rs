use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use interactions_client::config;
use interactions_client::observability::init_observability;
use interactions_client::{
    CredentialStore, Credentials, DateRange, FileCredentialStore, FilterField, FilterValue,
    HttpGateway, InteractionQuery, InteractionType, InteractionsClient, MemoryCredentialStore,
    SiteId, SortDirection, SortField,
};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "interactions-client")]
#[command(about = "Query site-scoped interactions from the Interaction Management API", long_about = None)]
#[command(version)]
#[allow(clippy::struct_excessive_bools)]
struct Args {
    /// API base URL
    #[arg(short, long, env = "INTERACTIONS_API_URL")]
    url: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, env = "INTERACTIONS_USERNAME")]
    username: String,

    #[arg(long, env = "INTERACTIONS_PASSWORD", hide_env_values = true)]
    password: String,

    /// Switch to this site after login
    #[arg(long)]
    site: Option<i64>,

    /// Free-text search over title, lead, location, description and notes
    #[arg(short, long)]
    search: Option<String>,

    /// Interaction type filter (Meeting, Call, Email, Other)
    #[arg(short = 't', long = "type")]
    interaction_type: Option<InteractionType>,

    /// Only interactions starting at or after this RFC 3339 timestamp
    #[arg(long)]
    from: Option<DateTime<Utc>>,

    /// Only interactions starting at or before this RFC 3339 timestamp
    #[arg(long)]
    to: Option<DateTime<Utc>>,

    /// Sort field
    #[arg(long, default_value = "created_at")]
    sort: SortField,

    /// Sort direction (asc or desc)
    #[arg(long, default_value = "desc")]
    direction: SortDirection,

    #[arg(long, default_value = "1")]
    page: u32,

    #[arg(long, default_value = "25")]
    page_size: u32,

    /// Keep the session token across runs
    #[arg(long)]
    remember: bool,

    /// Print the accessible sites instead of querying
    #[arg(long)]
    list_sites: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn query(&self) -> InteractionQuery {
        let mut query = InteractionQuery::new()
            .sort(self.sort, self.direction)
            .page(self.page)
            .page_size(self.page_size);
        if let Some(search) = &self.search {
            query = query.search(search.clone());
        }
        if let Some(kind) = self.interaction_type {
            query = query.filter(FilterField::Type, FilterValue::Type(kind));
        }
        if self.from.is_some() || self.to.is_some() {
            query = query.filter(
                FilterField::StartDatetime,
                FilterValue::DateRange(DateRange::new(self.from, self.to)),
            );
        }
        query
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Precedence: env > file > CLI > defaults
    let mut builder = if let Some(ref path) = args.config {
        config::load_config_from_path(path)?
    } else {
        config::load_config()?
    };

    if let Some(ref url_str) = args.url {
        let url = Url::parse(url_str).map_err(|e| anyhow::anyhow!("Invalid API URL: {e}"))?;
        builder = builder.base_url(url);
    }
    if args.verbose {
        builder = builder.log_level("debug");
    }
    if args.json_logs {
        builder = builder.json_logs(true);
    }

    let config = builder.build()?;
    init_observability(&config.telemetry)?;

    let store: Arc<dyn CredentialStore> = match config
        .credentials_path
        .clone()
        .or_else(FileCredentialStore::default_path)
    {
        Some(path) => Arc::new(FileCredentialStore::open(path)?),
        None => Arc::new(MemoryCredentialStore::new()),
    };
    let gateway = HttpGateway::from_config(&config)?;
    let client = InteractionsClient::new(config, gateway, store)?;

    let context = client
        .login(Credentials::new(&args.username, &args.password), args.remember)
        .await
        .context("login failed")?;
    tracing::info!(sites = context.sites.len(), "Session established");

    let outcome = run(&client, &args).await;

    if !args.remember {
        client.logout().await?;
    }
    outcome
}

async fn run(client: &InteractionsClient, args: &Args) -> anyhow::Result<()> {
    if args.list_sites {
        let context = client.site_context();
        println!("{}", serde_json::to_string_pretty(&context.sites)?);
        return Ok(());
    }

    if let Some(site) = args.site {
        client
            .switch_site(SiteId(site))
            .await
            .with_context(|| format!("failed to switch to site {site}"))?;
    }

    let page = client
        .query_interactions(&args.query())
        .await
        .into_result()
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    println!("{}", serde_json::to_string_pretty(page.as_ref())?);
    Ok(())
}
