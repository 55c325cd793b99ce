use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use caption_translator_api::config::ConfigSet;
use caption_translator_api::datastore::{
    MemoryTranscriptStore, RestTranscriptStore, TranscriptStore,
};
use caption_translator_api::http_api::{self, AppState};
use caption_translator_api::speech::HttpSpeechSynthesizer;
use caption_translator_api::translation::{
    HttpChatClient, HttpTranslateBackend, RateLimiter, TranslationCache, TranslationService,
};

#[tokio::main]
async fn main() {
    init_tracing();

    match ConfigSet::load_from_env() {
        Ok(config) => {
            let config = Arc::new(config);
            info!(root = ?config.root(), "configuration loaded");

            let client = reqwest::Client::new();

            let chat = Arc::new(HttpChatClient::new(
                client.clone(),
                config.translation.chat.clone(),
                env_opt("OLLAMA_API_KEY"),
            ));
            let fallback = Arc::new(HttpTranslateBackend::new(
                client.clone(),
                config.translation.fallback.clone(),
                env_opt("TRANSLATE_API_KEY"),
            ));

            let datastore: Arc<dyn TranscriptStore> = match env_opt("DATASTORE_URL") {
                Some(url) => Arc::new(RestTranscriptStore::new(
                    client.clone(),
                    url,
                    env_opt("DATASTORE_API_KEY"),
                )),
                None => {
                    warn!("DATASTORE_URL not set, falling back to in-memory store");
                    Arc::new(MemoryTranscriptStore::new())
                }
            };

            let synthesizer = Arc::new(HttpSpeechSynthesizer::new(
                client,
                config.speech.synthesis.clone(),
                env_opt("CARTESIA_API_KEY"),
            ));

            let translator = Arc::new(TranslationService::new(
                chat,
                fallback,
                datastore.clone(),
                config.translation.clone(),
            ));
            let cache = Arc::new(TranslationCache::new(config.translation.cache.max_entries));
            let limiter = Arc::new(RateLimiter::new(
                config.translation.rate_limit_window(),
                config.translation.rate_limit.max_requests,
                config.translation.rate_limit.max_callers,
            ));

            let state = AppState {
                config: config.clone(),
                translator,
                cache,
                limiter,
                datastore,
                synthesizer,
            };

            info!(addr = %config.server.http_bind_addr, "starting http api server");
            if let Err(e) = http_api::serve(state).await {
                error!(error = %e, "failed to start server");
                std::process::exit(1);
            }
        }
        Err(err) => {
            error!(error = ?err, "failed to load configuration");
            std::process::exit(1);
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install tracing subscriber: {err}");
    }
}
