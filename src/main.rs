use std::sync::Arc;

use pitchcraft::config::AppConfig;
use pitchcraft::core::campaign::CampaignService;
use pitchcraft::core::generation::{HttpImageService, HttpTextService};
use pitchcraft::core::reputation::ReputationService;
use pitchcraft::core::store::FileStore;

#[tokio::main]
async fn main() {
    // Initialize logging (guard must outlive the run to flush file logs)
    let _log_guard = pitchcraft::core::logging::init();
    log::info!("Pitchcraft v{} starting", pitchcraft::VERSION);

    let config = AppConfig::load();
    let api_key = std::env::var(&config.generation.api_key_env).unwrap_or_default();
    if api_key.is_empty() {
        log::warn!(
            "No API key in ${} — generation calls will fail until one is set",
            config.generation.api_key_env
        );
    }

    let store = Arc::new(FileStore::new(config.data_dir()));
    let text = Arc::new(HttpTextService::new(
        &config.generation.text_base_url,
        &api_key,
        &config.generation.model,
        config.generation.max_tokens,
    ));
    let image = Arc::new(HttpImageService::new(
        &config.generation.image_base_url,
        &api_key,
        &config.generation.image_model,
    ));

    let campaigns = Arc::new(CampaignService::new(store.clone(), text, image));
    let (reputation, mut delivered_rx) = ReputationService::new(store);

    log::info!(
        "Loaded {} campaign(s); agency standing: {} ({} reputation)",
        campaigns.campaigns().await.len(),
        reputation.tier().await,
        reputation.current_reputation().await,
    );

    // Timers lost to the last shutdown come back, and the periodic sweep
    // below covers anything the timers miss.
    reputation.resume_timers().await;

    let mut sweep = tokio::time::interval(std::time::Duration::from_secs(
        config.events.sweep_interval_secs.max(1),
    ));

    loop {
        tokio::select! {
            _ = sweep.tick() => {
                // Deliveries surface on the channel below; the sweep only
                // has to catch events whose timers did not survive.
                let swept = reputation.process_pending_events().await;
                if !swept.is_empty() {
                    log::debug!("Sweep delivered {} overdue event(s)", swept.len());
                }
                if let Some(tier) = reputation.take_level_up() {
                    log::info!("The agency is now: {tier}");
                }
            }
            Some(event) = delivered_rx.recv() => {
                render_consequence(&event);
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    log::warn!("Failed to listen for shutdown signal: {e}");
                }
                log::info!("Shutting down");
                break;
            }
        }
    }
}

/// Stand-in Consequence Renderer: the real presentation layer turns a
/// delivered event into an inbox message.
fn render_consequence(event: &pitchcraft::core::reputation::BonusEvent) {
    log::info!(
        "[{}] {} — {} ({:+} reputation)",
        event.kind,
        event.title,
        event.description,
        event.reputation_delta
    );
}
