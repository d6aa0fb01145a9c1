use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use outlook_asana::analytics::run_analytics;
use outlook_asana::config::{self, Config, Profile};
use outlook_asana::graph_client::{GraphClient, MessageQuery};

#[derive(Parser)]
#[command(name = "email-analytics")]
#[command(about = "Statistiques d'une boîte Outlook : expéditeurs, sentiment, thèmes")]
#[command(version)]
struct Args {
    /// Limite du nombre d'emails analysés (remplace MAIL_MAX_MESSAGES)
    #[arg(short = 'l', long)]
    limit: Option<usize>,

    /// Vérifier la configuration sans se connecter
    #[arg(long)]
    check_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let env_file = config::load_env_file();
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    config::log_env_file(&env_file);

    info!("📊 Starting email analytics");

    let mut config = Config::load(Profile::Analytics)?;
    if let Some(limit) = args.limit {
        config.mail.max_messages = Some(limit);
    }

    if args.check_config {
        config.print_summary();
        return Ok(());
    }

    let graph = GraphClient::connect(&config.graph)
        .await
        .context("Unable to connect to Microsoft Graph")?;

    let query = MessageQuery::from_config(&config.mail);

    match run_analytics(&graph, &query, &config.analytics).await {
        Ok(report) => {
            report.print_summary(config.analytics.top_n);
            Ok(())
        }
        Err(e) => {
            error!("❌ Analytics failed: {:#}", e);
            Err(e)
        }
    }
}
