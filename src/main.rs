use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use outlook_asana::asana_client::AsanaClient;
use outlook_asana::config::{self, Config, Profile};
use outlook_asana::graph_client::{GraphClient, MessageQuery};
use outlook_asana::migration::{DryRunSink, Migrator};
use outlook_asana::task::TaskBuilder;

#[derive(Parser)]
#[command(name = "outlook-asana")]
#[command(about = "Migre les emails d'un dossier Outlook vers des tâches Asana")]
#[command(version)]
struct Args {
    /// Mode dry-run : affiche les tâches sans les créer dans Asana
    #[arg(short, long)]
    dry_run: bool,

    /// Limite du nombre d'emails à traiter (remplace MAIL_MAX_MESSAGES)
    #[arg(short = 'l', long)]
    limit: Option<usize>,

    /// Vérifier la configuration sans se connecter
    #[arg(long)]
    check_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Charger le fichier .env s'il existe
    let env_file = config::load_env_file();

    // Parser les arguments CLI
    let args = Args::parse();

    // Initialiser le logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    config::log_env_file(&env_file);

    if args.dry_run {
        info!("🧪 Starting Outlook -> Asana migration in DRY-RUN mode");
    } else {
        info!("🚀 Starting Outlook -> Asana migration");
    }

    // Charger la configuration (échec immédiat si des variables manquent)
    let mut config = Config::load(Profile::Migration)?;
    if let Some(limit) = args.limit {
        config.mail.max_messages = Some(limit);
    }

    if args.check_config {
        config.print_summary();
        return Ok(());
    }

    let asana_config = config
        .asana
        .clone()
        .context("Asana configuration missing")?;

    let graph = GraphClient::connect(&config.graph)
        .await
        .context("Unable to connect to Microsoft Graph")?;

    let query = MessageQuery::from_config(&config.mail)
        .with_attachments(config.migration.migrate_attachments);
    let builder = TaskBuilder::new(&asana_config);

    let result = if args.dry_run {
        println!("\n{}", "=".repeat(80));
        println!("🧪 MODE DRY-RUN - OUTLOOK -> ASANA");
        println!("{}", "=".repeat(80));

        let migrator = Migrator::new(graph, DryRunSink::new(), builder, config.migration.clone());
        migrator.run(&query).await
    } else {
        let asana = AsanaClient::new(&asana_config)?;
        let user = asana
            .current_user()
            .await
            .context("Unable to authenticate against Asana")?;
        info!(
            "✅ Connected to Asana as {} ({})",
            user.name.as_deref().unwrap_or("unknown"),
            user.email.as_deref().unwrap_or(&user.gid)
        );

        let migrator = Migrator::new(graph, asana, builder, config.migration.clone());
        migrator.run(&query).await
    };

    match result {
        Ok(report) => {
            report.print_summary();
            Ok(())
        }
        Err(e) => {
            error!("❌ Migration aborted: {:#}", e);
            Err(e)
        }
    }
}
