mod support;

use std::sync::Arc;

use tokio::time::{sleep, Duration};

use caption_translator_api::captions::CaptionStore;
use caption_translator_api::config::{CaptionPipelineConfig, SpeechConfig, TranslationConfig};
use caption_translator_api::datastore::MemoryTranscriptStore;
use caption_translator_api::now_ms;
use caption_translator_api::realtime::{CaptionPipeline, PipelineContext};
use caption_translator_api::speech::TtsQueuePlayer;
use caption_translator_api::translation::{CacheKey, TranslationCache, TranslationService};

use support::{ndjson, FailingTranslateBackend, MockChatClient, MockSynthesizer, RecordingSink};

struct TestPipeline {
    pipeline: CaptionPipeline,
    store: Arc<CaptionStore>,
    cache: Arc<TranslationCache>,
    chat: Arc<MockChatClient>,
    synthesizer: Arc<MockSynthesizer>,
    sink: Arc<RecordingSink>,
    player: TtsQueuePlayer,
}

async fn build_pipeline(chat: Arc<MockChatClient>) -> TestPipeline {
    let store = Arc::new(CaptionStore::new(20));
    let cache = Arc::new(TranslationCache::new(200));
    let translator = Arc::new(TranslationService::new(
        chat.clone(),
        Arc::new(FailingTranslateBackend),
        Arc::new(MemoryTranscriptStore::new()),
        TranslationConfig::default(),
    ));

    let synthesizer = Arc::new(MockSynthesizer::new());
    let sink = Arc::new(RecordingSink::new());
    let player = TtsQueuePlayer::spawn(
        SpeechConfig::default(),
        synthesizer.clone(),
        sink.clone(),
        "me".to_string(),
        "en".to_string(),
    );
    player.set_enabled(true).await;

    let pipeline = CaptionPipeline::spawn(
        CaptionPipelineConfig::default(),
        PipelineContext {
            store: store.clone(),
            translator,
            cache: cache.clone(),
            player: player.clone(),
            target_lang: "en".to_string(),
        },
    );

    TestPipeline {
        pipeline,
        store,
        cache,
        chat,
        synthesizer,
        sink,
        player,
    }
}

fn caption_json(kind: &str, utterance: &str, text: &str, ts: i64) -> serde_json::Value {
    serde_json::json!({
        "v": 1,
        "type": kind,
        "speakerUserId": "remote-1",
        "speakerName": "Alice",
        "sourceLang": "es",
        "text": text,
        "ts": ts,
        "utteranceId": utterance,
    })
}

async fn wait_for(mut predicate: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if predicate() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    predicate()
}

#[tokio::test]
async fn final_caption_flows_through_translation_and_speech() {
    let chat = Arc::new(MockChatClient::single(vec![ndjson("Hello.")]));
    let app = build_pipeline(chat).await;

    let ts = now_ms() + 1_000;
    app.pipeline
        .ingest(caption_json("caption.partial", "utt-1", "hola", ts))
        .await;
    app.pipeline
        .ingest(caption_json("caption.final", "utt-1", "hola mundo", ts))
        .await;

    // 確定キャプションが翻訳されてストアへ反映される
    let store = app.store.clone();
    assert!(
        wait_for(|| {
            store
                .snapshot()
                .first()
                .and_then(|e| e.translated_text.clone())
                .is_some()
        })
        .await
    );
    let entry = app.store.snapshot().remove(0);
    assert_eq!(entry.translated_text.as_deref(), Some("Hello."));
    assert!(entry.is_final);

    // 翻訳結果はキャッシュにも入る
    let key = CacheKey {
        source_lang: "es".to_string(),
        target_lang: "en".to_string(),
        text: "hola mundo".to_string(),
    };
    assert_eq!(app.cache.get(&key), Some("Hello.".to_string()));

    // 読み上げキューまで流れる
    let sink = app.sink.clone();
    assert!(wait_for(|| sink.play_count() == 1).await);
    assert_eq!(app.synthesizer.synthesized(), vec!["Hello.".to_string()]);

    app.pipeline.shutdown();
}

#[tokio::test]
async fn partial_captions_are_stored_but_not_translated() {
    let chat = Arc::new(MockChatClient::with_scripts(vec![]));
    let app = build_pipeline(chat.clone()).await;

    app.pipeline
        .ingest(caption_json("caption.partial", "utt-1", "hola", now_ms()))
        .await;

    let store = app.store.clone();
    assert!(wait_for(|| store.len() == 1).await);
    sleep(Duration::from_millis(100)).await;

    let entry = app.store.snapshot().remove(0);
    assert!(entry.translated_text.is_none());
    assert!(!entry.is_final);
    assert!(chat.requested_models().is_empty());
    assert_eq!(app.sink.play_count(), 0);

    app.pipeline.shutdown();
}

#[tokio::test]
async fn cached_translation_skips_upstream_call() {
    let chat = Arc::new(MockChatClient::with_scripts(vec![]));
    let app = build_pipeline(chat.clone()).await;

    app.cache.insert(
        CacheKey {
            source_lang: "es".to_string(),
            target_lang: "en".to_string(),
            text: "hola".to_string(),
        },
        "hi".to_string(),
    );

    app.pipeline
        .ingest(caption_json("caption.final", "utt-1", "hola", now_ms() + 1_000))
        .await;

    let store = app.store.clone();
    assert!(
        wait_for(|| {
            store
                .snapshot()
                .first()
                .and_then(|e| e.translated_text.clone())
                .is_some()
        })
        .await
    );
    assert_eq!(
        app.store.snapshot().remove(0).translated_text.as_deref(),
        Some("hi")
    );
    assert!(chat.requested_models().is_empty());

    // キャッシュ経由でも読み上げまで届く
    let sink = app.sink.clone();
    assert!(wait_for(|| sink.play_count() == 1).await);

    app.pipeline.shutdown();
}

#[tokio::test]
async fn same_language_caption_is_passed_through() {
    let chat = Arc::new(MockChatClient::with_scripts(vec![]));
    let app = build_pipeline(chat.clone()).await;

    let mut event = caption_json("caption.final", "utt-1", "already english", now_ms() + 1_000);
    event["sourceLang"] = serde_json::json!("en");
    app.pipeline.ingest(event).await;

    let store = app.store.clone();
    assert!(
        wait_for(|| {
            store
                .snapshot()
                .first()
                .and_then(|e| e.translated_text.clone())
                .is_some()
        })
        .await
    );
    assert_eq!(
        app.store.snapshot().remove(0).translated_text.as_deref(),
        Some("already english")
    );
    assert!(chat.requested_models().is_empty());

    let _ = app.player.status().await;
    app.pipeline.shutdown();
}
