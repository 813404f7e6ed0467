use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use canvass::api::client::{ApiClient, AuthTokens};
use canvass::api::transport::ReqwestTransport;
use canvass::api::voice::ElevenLabsClient;
use canvass::config::AppConfig;
use canvass::repository::Repository;
use canvass::repository::store::PostgrestStore;
use canvass::services::analytics::DashboardService;
use canvass::services::bulk_import::{BulkImportService, ImportEvent};
use canvass::services::call_test::{CallTestService, CallTestState};
use canvass::services::error_handling::UserErrorFormatter;
use canvass::utils::CancelToken;
use uuid::Uuid;

fn usage() -> ! {
    eprintln!(
        "usage: canvass <command>\n\
         \n\
         commands:\n\
         \x20 template <dest.csv>          download the bulk-upload template\n\
         \x20 inspect <file.csv>           pre-flight check a file locally\n\
         \x20 bulk-import <file.csv>       upload and poll to completion\n\
         \x20 call-test <phone> [name]     run one outbound test call\n\
         \x20 dashboard                    print the sentiment and voter overview"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config_path =
        std::env::var("CANVASS_CONFIG").unwrap_or_else(|_| "canvass.toml".to_string());
    let config = AppConfig::load(Path::new(&config_path))?;

    let api = Arc::new(ApiClient::new(
        config.api_base_url.clone(),
        Arc::new(ReqwestTransport::new()),
    ));
    if let Ok(token) = std::env::var("CANVASS_API_TOKEN") {
        api.session().set_tokens(AuthTokens {
            access_token: token,
            refresh_token: None,
        });
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut args = args.iter();
    match args.next().map(String::as_str) {
        Some("template") => {
            let dest = args.next().map(PathBuf::from).unwrap_or_else(|| usage());
            let service = BulkImportService::with_config(api, config.bulk_import());
            let path = service.download_template(&dest).await?;
            println!("Template saved to {}", path.display());
        }
        Some("inspect") => {
            let file = args.next().map(PathBuf::from).unwrap_or_else(|| usage());
            let bytes = tokio::fs::read(&file).await?;
            let service = BulkImportService::with_config(api, config.bulk_import());
            let inspection = service.inspect(&bytes)?;
            println!("{} row(s) found.", inspection.total_rows);
            for issue in &inspection.issues {
                println!("  {}", issue.message);
            }
            if inspection.is_clean() {
                println!("No issues found.");
            }
        }
        Some("bulk-import") => {
            let file = args.next().map(PathBuf::from).unwrap_or_else(|| usage());
            run_bulk_import(api, &config, &file).await?;
        }
        Some("call-test") => {
            let phone = args.next().cloned().unwrap_or_else(|| usage());
            let name = args.next().cloned();
            run_call_test(api, &config, &phone, name).await?;
        }
        Some("dashboard") => {
            let repository = Repository::new(Arc::new(PostgrestStore::new(
                config.store_url.clone(),
                config.store_api_key.clone(),
            )));
            let dashboard = DashboardService::new(api, repository);

            let overview = dashboard.sentiment_overview(None).await?;
            println!("Sentiment trend ({} day(s)):", overview.trend.len());
            for point in &overview.trend {
                println!(
                    "  {}  +{:.0}% / ~{:.0}% / -{:.0}%  ({} responses)",
                    point.date,
                    point.positive_pct,
                    point.neutral_pct,
                    point.negative_pct,
                    point.total
                );
            }

            println!("\nConstituencies by voter count:");
            for row in dashboard.voter_drilldown().await? {
                println!(
                    "  {:<24} {:>7} voters, {:>5.1}% contacted",
                    row.constituency, row.total, row.contact_rate_pct
                );
            }
        }
        _ => usage(),
    }

    Ok(())
}

async fn run_bulk_import(api: Arc<ApiClient>, config: &AppConfig, file: &Path) -> Result<()> {
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload.csv".to_string());
    let bytes = tokio::fs::read(file).await?;

    let service = BulkImportService::with_config(api, config.bulk_import());
    let (tx, mut rx) = mpsc::channel(32);
    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ImportEvent::Accepted { job_id } => info!(%job_id, "upload accepted"),
                ImportEvent::Snapshot(job) => info!(
                    processed = job.processed_rows,
                    total = job.total_rows,
                    progress = job.progress_percentage,
                    "processing"
                ),
                ImportEvent::Completed(_) | ImportEvent::Failed(_) => {}
            }
        }
    });

    let result = service
        .start_import(&file_name, bytes, tx, CancelToken::new())
        .await;
    let _ = progress.await;

    match result {
        Ok(outcome) => {
            for line in outcome.summary_lines() {
                println!("{}", line);
            }
            for error in &outcome.job.validation_errors {
                println!("  {}", error);
            }
            if outcome.error_report_available() {
                let dest = PathBuf::from(format!("{}-errors.csv", outcome.job.job_id));
                let path = service.download_error_report(&outcome.job.job_id, &dest).await?;
                println!("Error report saved to {}", path.display());
            }
        }
        Err(e) => {
            eprintln!("{}", UserErrorFormatter::format_for_ui(&e));
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn run_call_test(
    api: Arc<ApiClient>,
    config: &AppConfig,
    phone: &str,
    voter_name: Option<String>,
) -> Result<()> {
    let voice = Arc::new(ElevenLabsClient::new(
        config.voice.base_url.clone(),
        config.voice.api_key.clone(),
        config.voice.agent_id.clone(),
        config.voice.agent_phone_number_id.clone(),
    ));
    let repository = Repository::new(Arc::new(PostgrestStore::new(
        config.store_url.clone(),
        config.store_api_key.clone(),
    )));
    let organization_id = config.organization_id.unwrap_or_else(Uuid::nil);

    let service = CallTestService::with_config(
        voice,
        api,
        repository.calls.clone(),
        organization_id,
        config.call_test(),
    );

    let session = service
        .run_test_call(phone, voter_name, CancelToken::new())
        .await?;

    match session.state {
        CallTestState::Completed => {
            println!("Call completed.");
            if let Some(transcript) = &session.transcript {
                println!("\nTranscript:\n{}", transcript);
            }
            if let Some(analysis) = &session.analysis {
                println!("\nOverall sentiment: {:?}", analysis.overall_sentiment);
                println!("{}", analysis.overall_summary);
            }
        }
        _ => {
            println!(
                "Call did not complete: {}",
                session.error.as_deref().unwrap_or("unknown error")
            );
            // A transcript fetched before a later step failed is still worth
            // showing.
            if let Some(transcript) = &session.transcript {
                println!("\nPartial transcript:\n{}", transcript);
            }
            std::process::exit(1);
        }
    }
    Ok(())
}
