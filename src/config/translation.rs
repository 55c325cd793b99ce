//! 翻訳パイプライン設定
use std::time::Duration;

use serde::Deserialize;

/// チャットストリーム、フォールバック翻訳、キャッシュ、レートリミットの設定
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    pub chat: ChatStreamConfig,
    pub fallback: FallbackTranslateConfig,
    pub cache: TranslationCacheConfig,
    pub rate_limit: RateLimitConfig,
    /// translateエンドポイントが受理するtextの最大長
    pub max_text_len: usize,
}

impl TranslationConfig {
    /// フォールバック翻訳のタイムアウト（ミリ秒→Duration）
    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback.timeout_ms)
    }

    /// レートリミットのウィンドウ長
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit.window_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatStreamConfig {
    /// ストリーミングチャットAPIのURL
    pub api_url: String,
    /// 主モデル識別子
    pub model: String,
    /// 主モデルが見つからない場合に一度だけ再試行するモデル識別子
    pub fallback_model: Option<String>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FallbackTranslateConfig {
    /// ステートレス翻訳APIのURL（未設定なら原文をそのまま返す）
    pub api_url: Option<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationCacheConfig {
    pub max_entries: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: u32,
    /// レートリミット表に保持する呼び出し元数の上限
    pub max_callers: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            chat: ChatStreamConfig {
                api_url: "https://ollama.com/api/chat".to_string(),
                model: "gpt-oss:120b-cloud".to_string(),
                fallback_model: None,
                temperature: 0.2,
            },
            fallback: FallbackTranslateConfig {
                api_url: None,
                timeout_ms: 8000,
            },
            cache: TranslationCacheConfig { max_entries: 200 },
            rate_limit: RateLimitConfig {
                window_ms: 60_000,
                max_requests: 20,
                max_callers: 1000,
            },
            max_text_len: 1000,
        }
    }
}
