//! Rumbo CLI - interactive travel-planning conversation over stdin.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use rumbo::adapters::ai::{GroqConfig, GroqProvider};
use rumbo::adapters::search::{DuckDuckGoConfig, DuckDuckGoProvider};
use rumbo::application::search::AggregatorLimits;
use rumbo::application::{CredentialPool, PromptCatalog, SearchAggregator, TravelPlanner, TripSession};
use rumbo::config::AppConfig;

const GREETING: &str = "🌎 Asistente de Viajes\n\
    ¡Hola! Soy tu asistente personal de viajes. Contame a dónde te gustaría ir, \
    cuándo querés viajar y tu presupuesto aproximado.\n\
    Escribí \"reiniciar\" para empezar de nuevo o \"salir\" para terminar.\n";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rumbo=info")),
        )
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let pool = Arc::new(CredentialPool::from_env_slots()?);
    let prompts = PromptCatalog::from_file(&config.prompts_path)?;

    let provider = GroqProvider::new(
        GroqConfig::new()
            .with_model(config.ai.model.clone())
            .with_base_url(config.ai.base_url.clone())
            .with_timeout(config.ai.timeout())
            .with_max_retries(config.ai.max_retries)
            .with_retry_delay(config.ai.retry_delay()),
    );

    let search = DuckDuckGoProvider::new(
        DuckDuckGoConfig::new()
            .with_base_url(config.search.base_url.clone())
            .with_timeout(config.search.timeout()),
    );
    let aggregator = SearchAggregator::new(
        search,
        AggregatorLimits {
            attractions: config.search.attractions_results,
            tips: config.search.tips_results,
            content_chars: config.search.content_chars,
        },
    );

    let planner = TravelPlanner::new(provider, pool, prompts, aggregator, config.ai.temperature);
    let mut session = TripSession::new();
    tracing::info!(session = %session.id, model = %config.ai.model, "conversation started");

    let mut stdout = tokio::io::stdout();
    stdout.write_all(GREETING.as_bytes()).await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        match message.to_lowercase().as_str() {
            "salir" | "exit" => break,
            "reiniciar" => {
                session.reset();
                stdout
                    .write_all("Listo, empecemos de nuevo. ¿A dónde querés viajar?\n".as_bytes())
                    .await?;
                continue;
            }
            _ => {}
        }

        let reply = planner.process_message(&mut session, message).await;
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    stdout.write_all("¡Buen viaje! 👋\n".as_bytes()).await?;
    Ok(())
}
