//! 音声合成クライアント
//!
//! 合成APIへフレーズ単位のリクエストを投げ、返ってくる音声バイト列を
//! チャネル越しのストリームとして提供します。HTTP実装のリクエスト形状は
//! 固定コンテナ/エンコーディング/サンプルレートのバイト列エンドポイント。
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::SynthesisConfig;

use super::error::SpeechError;

/// 音声APIのプロトコル版数ヘッダ値
const SPEECH_API_VERSION: &str = "2025-04-16";

/// 1フレーズ分の音声合成を行い、音声バイト列のストリームを返す
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        phrase: &str,
        language: &str,
        voice_id: &str,
    ) -> Result<mpsc::Receiver<Bytes>, SpeechError>;
}

#[derive(Debug, Serialize)]
struct SynthesisRequestBody<'a> {
    model_id: &'a str,
    transcript: &'a str,
    voice: VoiceSelection<'a>,
    output_format: OutputFormat<'a>,
    speed: &'a str,
    generation_config: GenerationConfig,
    language: &'a str,
}

#[derive(Debug, Serialize)]
struct VoiceSelection<'a> {
    mode: &'a str,
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct OutputFormat<'a> {
    container: &'a str,
    encoding: &'a str,
    sample_rate: u32,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    speed: f32,
    volume: f32,
}

/// HTTP音声合成クライアント
#[derive(Debug, Clone)]
pub struct HttpSpeechSynthesizer {
    client: reqwest::Client,
    config: SynthesisConfig,
    api_key: Option<String>,
}

impl HttpSpeechSynthesizer {
    pub fn new(client: reqwest::Client, config: SynthesisConfig, api_key: Option<String>) -> Self {
        Self {
            client,
            config,
            api_key,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(
        &self,
        phrase: &str,
        language: &str,
        voice_id: &str,
    ) -> Result<mpsc::Receiver<Bytes>, SpeechError> {
        let body = SynthesisRequestBody {
            model_id: &self.config.model_id,
            transcript: phrase,
            voice: VoiceSelection {
                mode: "id",
                id: voice_id,
            },
            output_format: OutputFormat {
                container: &self.config.container,
                encoding: &self.config.encoding,
                sample_rate: self.config.sample_rate_hz,
            },
            speed: "normal",
            generation_config: GenerationConfig {
                speed: 1.0,
                volume: 1.0,
            },
            language,
        };

        let mut builder = self
            .client
            .post(&self.config.api_url)
            .header("Cartesia-Version", SPEECH_API_VERSION)
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-API-Key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| SpeechError::Synthesis {
                message: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(SpeechError::Status {
                status: response.status().as_u16(),
            });
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        // 受信側が閉じたら転送終了
                        if tx.send(bytes).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        debug!(error = %err, "synthesis stream ended with error");
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }
}
