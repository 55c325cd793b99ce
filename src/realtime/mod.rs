//! リアルタイムキャプションパイプライン
//!
//! ワイヤイベント（JSON値）の取り込みチャネルを消費し、
//! 再結合 → ストアへのマージ → 確定キャプションの翻訳 → 読み上げ投入
//! までを1本のタスクとして駆動します。翻訳は確定イベントごとに
//! 独立タスクへ切り出すため、取り込みループは翻訳の遅延に引きずられません。
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::captions::{CaptionEntry, CaptionReassembler, CaptionStore};
use crate::config::CaptionPipelineConfig;
use crate::speech::TtsQueuePlayer;
use crate::translation::{CacheKey, TranslationCache, TranslationService};

/// パイプラインが参照する共有コラボレータ一式
pub struct PipelineContext {
    pub store: Arc<CaptionStore>,
    pub translator: Arc<TranslationService>,
    pub cache: Arc<TranslationCache>,
    pub player: TtsQueuePlayer,
    pub target_lang: String,
}

pub struct CaptionPipeline {
    tx: mpsc::Sender<serde_json::Value>,
    store: Arc<CaptionStore>,
    task: JoinHandle<()>,
}

impl CaptionPipeline {
    /// 取り込みタスクを起動する
    pub fn spawn(config: CaptionPipelineConfig, ctx: PipelineContext) -> Self {
        let (tx, mut rx) = mpsc::channel::<serde_json::Value>(config.ingest_queue_depth);
        let store = ctx.store.clone();
        let ctx = Arc::new(ctx);
        let mut reassembler = CaptionReassembler::new(config);

        let task = tokio::spawn(async move {
            info!("caption pipeline started");
            while let Some(raw) = rx.recv().await {
                let Some(update) = reassembler.accept_json(&raw) else {
                    continue;
                };
                let is_final = update.is_final;
                let entry = ctx.store.upsert(update);
                if is_final {
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        translate_final(&ctx, entry).await;
                    });
                }
            }
            info!("caption pipeline stopped");
        });

        Self { tx, store, task }
    }

    /// 取り込みチャネルの送信側（トランスポート層へ渡す）
    pub fn sender(&self) -> mpsc::Sender<serde_json::Value> {
        self.tx.clone()
    }

    /// イベントを1件投入する。チャネル満杯時は待つ
    pub async fn ingest(&self, raw: serde_json::Value) {
        if self.tx.send(raw).await.is_err() {
            warn!("caption pipeline receiver closed, event dropped");
        }
    }

    pub fn store(&self) -> &Arc<CaptionStore> {
        &self.store
    }

    /// 取り込みタスクを停止する
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

/// 確定キャプション1件を翻訳し、ストア更新と読み上げ投入まで進める
async fn translate_final(ctx: &PipelineContext, entry: CaptionEntry) {
    let translated = if entry.source_lang == ctx.target_lang {
        // 同一言語は翻訳せずそのまま流す
        entry.text.clone()
    } else {
        let key = CacheKey {
            source_lang: entry.source_lang.clone(),
            target_lang: ctx.target_lang.clone(),
            text: entry.text.clone(),
        };
        match ctx.cache.get(&key) {
            Some(hit) => {
                debug!(utterance_id = %entry.utterance_id, "translation cache hit");
                hit
            }
            None => {
                match ctx
                    .translator
                    .translate(
                        &entry.speaker_user_id,
                        &entry.text,
                        &entry.source_lang,
                        &ctx.target_lang,
                    )
                    .await
                {
                    Ok(translated) => {
                        ctx.cache.insert(key, translated.clone());
                        translated
                    }
                    Err(err) => {
                        warn!(utterance_id = %entry.utterance_id, error = %err, "caption translation failed");
                        return;
                    }
                }
            }
        }
    };

    if let Some(updated) = ctx
        .store
        .update_translation(&entry.utterance_id, &translated)
    {
        ctx.player.offer(updated).await;
    }
}
