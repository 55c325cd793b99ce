//! 翻訳バックエンドのクライアント定義
//!
//! - `StreamingChatClient` はNDJSONを逐次返すチャット型モデルの最小インタフェース
//! - `TranslateBackend` はステートレスなフォールバック翻訳API
//!
//! どちらもトレイト境界で差し替え可能にし、テストではモックを使います。
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::{ChatStreamConfig, FallbackTranslateConfig};

use super::error::TranslationError;

/// チャットストリーム開始リクエスト
#[derive(Debug, Clone)]
pub struct ChatStreamRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
}

/// チャット型モデルの最小インタフェース
///
/// 応答はバイトチャンクのチャネルとして返す。チャネルが閉じたら
/// ストリーム終端。途中の読み取り失敗は `Err` 項目として届き、
/// 正常なEOFとは区別される。
#[async_trait]
pub trait StreamingChatClient: Send + Sync {
    async fn open_stream(
        &self,
        request: ChatStreamRequest,
    ) -> Result<mpsc::Receiver<Result<Bytes, TranslationError>>, TranslationError>;
}

/// ステートレス翻訳APIの最小インタフェース
#[async_trait]
pub trait TranslateBackend: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError>;
}

// ---- ワイヤ形状 -------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequestBody {
    model: String,
    stream: bool,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatStreamLine {
    #[serde(default)]
    message: Option<ChatLineMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatLineMessage {
    #[serde(default)]
    content: Option<String>,
}

/// NDJSONの1行から増分テキストを取り出す（壊れた行はNone）
pub fn parse_content_line(line: &str) -> Option<String> {
    let parsed: ChatStreamLine = serde_json::from_str(line).ok()?;
    parsed
        .message
        .and_then(|m| m.content)
        .filter(|c| !c.is_empty())
}

// ---- reqwest実装 ------------------------------------------------------

/// チャットAPIへのHTTPクライアント
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    client: reqwest::Client,
    config: ChatStreamConfig,
    api_key: Option<String>,
}

impl HttpChatClient {
    pub fn new(client: reqwest::Client, config: ChatStreamConfig, api_key: Option<String>) -> Self {
        Self {
            client,
            config,
            api_key,
        }
    }
}

#[async_trait]
impl StreamingChatClient for HttpChatClient {
    async fn open_stream(
        &self,
        request: ChatStreamRequest,
    ) -> Result<mpsc::Receiver<Result<Bytes, TranslationError>>, TranslationError> {
        let body = ChatRequestBody {
            model: request.model.clone(),
            stream: true,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt,
            }],
            temperature: request.temperature,
        };

        let mut builder = self.client.post(&self.config.api_url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| TranslationError::Request {
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            // モデル未登録はフォールバックモデルでの再試行対象として区別する
            if status.as_u16() == 404 || detail.to_lowercase().contains("not found") {
                return Err(TranslationError::ModelNotFound {
                    model: request.model,
                });
            }
            return Err(TranslationError::Status {
                status: status.as_u16(),
            });
        }

        let (tx, rx) = mpsc::channel::<Result<Bytes, TranslationError>>(32);
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(chunk) => {
                        if tx.send(Ok(chunk)).await.is_err() {
                            // 受信側が読むのをやめた（接続断など）
                            break;
                        }
                    }
                    Err(err) => {
                        // 途中切断はEOFと区別して下流へ伝える
                        warn!(error = %err, "chat stream read failed");
                        let _ = tx
                            .send(Err(TranslationError::Request {
                                message: err.to_string(),
                            }))
                            .await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// フォールバック翻訳APIが返しうる応答形状
#[derive(Debug, Deserialize)]
struct FallbackResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    translation: Option<String>,
    result: Option<String>,
    data: Option<FallbackData>,
}

#[derive(Debug, Deserialize)]
struct FallbackData {
    translations: Option<Vec<FallbackTranslation>>,
}

#[derive(Debug, Deserialize)]
struct FallbackTranslation {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

#[derive(Debug, Serialize)]
struct FallbackRequestBody<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

/// ステートレス翻訳APIへのHTTPクライアント
///
/// URL未設定の場合は原文をそのまま返す（翻訳レイヤ無しでの運用を許容）。
#[derive(Debug, Clone)]
pub struct HttpTranslateBackend {
    client: reqwest::Client,
    config: FallbackTranslateConfig,
    api_key: Option<String>,
}

impl HttpTranslateBackend {
    pub fn new(
        client: reqwest::Client,
        config: FallbackTranslateConfig,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            config,
            api_key,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }
}

#[async_trait]
impl TranslateBackend for HttpTranslateBackend {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let Some(api_url) = &self.config.api_url else {
            return Ok(text.to_string());
        };

        let body = FallbackRequestBody {
            q: text,
            source: source_lang,
            target: target_lang,
            format: "text",
        };

        let mut builder = self.client.post(api_url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        // 設定された上限時間を超えたら中断して失敗扱いにする
        let response = tokio::time::timeout(self.timeout(), builder.send())
            .await
            .map_err(|_| TranslationError::Timeout(self.timeout()))?
            .map_err(|err| TranslationError::Request {
                message: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(TranslationError::Status {
                status: response.status().as_u16(),
            });
        }

        let parsed: FallbackResponse =
            response
                .json()
                .await
                .map_err(|err| TranslationError::Request {
                    message: err.to_string(),
                })?;

        let translated = parsed
            .translated_text
            .or(parsed.translation)
            .or(parsed.result)
            .or_else(|| {
                parsed
                    .data
                    .and_then(|d| d.translations)
                    .and_then(|t| t.into_iter().next())
                    .and_then(|t| t.translated_text)
            });

        translated.ok_or(TranslationError::Empty)
    }
}
