//! キャプション取り込みパイプラインの設定
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionPipelineConfig {
    /// 受理するワイヤプロトコル版数
    pub protocol_version: u32,
    /// イベント1件あたりのtext最大バイト長
    pub max_event_text_len: usize,
    /// partialイベントの最小受理間隔（ミリ秒）
    pub partial_throttle_ms: u64,
    /// ストアに保持するキャプション上限
    pub max_captions: usize,
    /// 取り込みチャネルの深さ
    pub ingest_queue_depth: usize,
}

impl CaptionPipelineConfig {
    pub fn partial_throttle(&self) -> Duration {
        Duration::from_millis(self.partial_throttle_ms)
    }
}

impl Default for CaptionPipelineConfig {
    fn default() -> Self {
        Self {
            protocol_version: 1,
            max_event_text_len: 4000,
            partial_throttle_ms: 100,
            max_captions: 20,
            ingest_queue_depth: 64,
        }
    }
}
