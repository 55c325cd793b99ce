//! 音声合成・再生キューの設定
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    pub synthesis: SynthesisConfig,
    pub player: PlayerConfig,
}

impl SpeechConfig {
    /// 再生ウォッチドッグの上限時間
    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.player.watchdog_ms)
    }

    /// 再生完了後のクールダウン時間
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.player.cooldown_ms)
    }
}

/// TTSサービスへのリクエスト形状（コンテナ/エンコーディング/サンプルレートは固定運用）
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    pub api_url: String,
    pub model_id: String,
    pub voice_id: String,
    pub container: String,
    pub encoding: String,
    pub sample_rate_hz: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    pub watchdog_ms: u64,
    pub cooldown_ms: u64,
    /// プレイヤーコマンドチャネルの深さ
    pub queue_depth: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            synthesis: SynthesisConfig {
                api_url: "https://api.cartesia.ai/tts/bytes".to_string(),
                model_id: "sonic-3".to_string(),
                voice_id: "9c7e6604-52c6-424a-9f9f-2c4ad89f3bb9".to_string(),
                container: "wav".to_string(),
                encoding: "pcm_f32le".to_string(),
                sample_rate_hz: 44_100,
            },
            player: PlayerConfig {
                watchdog_ms: 8000,
                cooldown_ms: 200,
                queue_depth: 32,
            },
        }
    }
}
