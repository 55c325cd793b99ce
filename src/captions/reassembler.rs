//! チャンク再結合とpartialスロットル
//!
//! ワイヤイベントを検証し、分割送信されたイベントは全スロットが
//! 埋まるまで `ChunkGroup` に蓄積します。検証に落ちたイベントは
//! 黙って破棄します（呼び出し元へエラーは返さない）。
use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use crate::config::CaptionPipelineConfig;
use crate::util::now_ms;

use super::event::{CaptionEvent, CaptionEventKind};
use super::store::CaptionUpdate;

/// 1発話分の分割チャンク（長さ = 宣言されたchunkCount）
#[derive(Debug)]
struct ChunkGroup {
    pieces: Vec<String>,
}

impl ChunkGroup {
    fn new(count: usize) -> Self {
        Self {
            pieces: vec![String::new(); count],
        }
    }

    fn is_complete(&self) -> bool {
        self.pieces.iter().all(|p| !p.is_empty())
    }

    fn join(self) -> String {
        self.pieces.concat()
    }
}

#[derive(Debug)]
pub struct CaptionReassembler {
    config: CaptionPipelineConfig,
    /// partialの最小受理間隔ゲート（発話単位ではなくプロセス全体）
    last_partial_at: Option<Instant>,
    groups: HashMap<String, ChunkGroup>,
}

impl CaptionReassembler {
    pub fn new(config: CaptionPipelineConfig) -> Self {
        Self {
            config,
            last_partial_at: None,
            groups: HashMap::new(),
        }
    }

    /// 生のJSONイベントを受理し、正規化済み更新を返す
    ///
    /// 破棄条件: バージョン不一致、未知の種別、発話ID/話者ID欠落、
    /// textが文字列でない・上限超過・空、スロットル内のpartial。
    pub fn accept_json(&mut self, raw: &serde_json::Value) -> Option<CaptionUpdate> {
        let event: CaptionEvent = match serde_json::from_value(raw.clone()) {
            Ok(event) => event,
            Err(err) => {
                debug!(error = %err, "malformed caption event dropped");
                return None;
            }
        };
        self.accept(event)
    }

    /// 型付きイベントを受理
    pub fn accept(&mut self, event: CaptionEvent) -> Option<CaptionUpdate> {
        if event.v != Some(self.config.protocol_version) {
            return None;
        }
        let kind = event.event_kind()?;

        let utterance_id = event.utterance_id.filter(|id| !id.is_empty())?;
        let speaker_user_id = event.speaker_user_id.filter(|id| !id.is_empty())?;

        let raw_text = event.text?;
        if raw_text.chars().count() > self.config.max_event_text_len {
            return None;
        }
        if raw_text.trim().is_empty() {
            return None;
        }

        // スロットル枠は本文検証を通過したpartialだけが消費する
        if kind == CaptionEventKind::Partial {
            let now = Instant::now();
            if let Some(last) = self.last_partial_at {
                if now.duration_since(last) < self.config.partial_throttle() {
                    return None;
                }
            }
            self.last_partial_at = Some(now);
        }

        // 分割イベントは全スロットが埋まるまで保留。断片は無加工で保持し、
        // 結合結果がindex順の正確な連結になるようにする
        let mut text = raw_text;
        if let (Some(count), Some(index)) = (event.chunk_count, event.chunk_index) {
            if count > 1 {
                let group = self
                    .groups
                    .entry(utterance_id.clone())
                    .or_insert_with(|| ChunkGroup::new(count));
                // 宣言数の食い違いと範囲外indexは破棄（既存グループは維持）
                if group.pieces.len() != count || index >= group.pieces.len() {
                    debug!(%utterance_id, index, count, "chunk declaration mismatch");
                    return None;
                }
                group.pieces[index] = text;

                if !group.is_complete() {
                    return None;
                }
                let group = self.groups.remove(&utterance_id)?;
                text = group.join();
            }
        }
        let text = text.trim().to_string();

        Some(CaptionUpdate {
            utterance_id,
            speaker_user_id,
            speaker_name: event.speaker_name.filter(|n| !n.is_empty()),
            source_lang: event
                .source_lang
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| "auto".to_string()),
            text,
            is_final: kind == CaptionEventKind::Final,
            ts: event.ts.unwrap_or_else(now_ms),
        })
    }

    /// 保留中のチャンクグループ数（テスト・監視用）
    pub fn pending_groups(&self) -> usize {
        self.groups.len()
    }
}
