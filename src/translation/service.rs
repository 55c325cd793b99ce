//! 翻訳サービス（戦略連鎖の本体）
//!
//! 戦略は順に試行され、互いに独立:
//! (a) ストリーミングチャット翻訳（主モデル→「not found」時のみ
//!     フォールバックモデルで一度だけ再試行）
//! (b) ステートレスなフォールバック翻訳API
//!
//! (a) の増分はストリーミング変種ではフレーズ分割器へ流し込み、
//! 確定フレーズを即座に送出します。成功時は原文/訳文の組を
//! ベストエフォートで永続化します（失敗しても応答には影響しない）。
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::TranslationConfig;
use crate::datastore::{NewTranslation, TranscriptStore};

use super::client::{parse_content_line, ChatStreamRequest, StreamingChatClient, TranslateBackend};
use super::error::TranslationError;
use super::stream::{LineAccumulator, PhraseSegmenter};

pub struct TranslationService {
    chat: Arc<dyn StreamingChatClient>,
    fallback: Arc<dyn TranslateBackend>,
    datastore: Arc<dyn TranscriptStore>,
    config: TranslationConfig,
}

impl TranslationService {
    pub fn new(
        chat: Arc<dyn StreamingChatClient>,
        fallback: Arc<dyn TranslateBackend>,
        datastore: Arc<dyn TranscriptStore>,
        config: TranslationConfig,
    ) -> Self {
        Self {
            chat,
            fallback,
            datastore,
            config,
        }
    }

    /// 全文翻訳（フレーズ送出なし）
    pub async fn translate(
        &self,
        user_id: &str,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        self.translate_inner(user_id, text, source_lang, target_lang, None)
            .await
    }

    /// ストリーミング変種: 確定フレーズを逐次 `phrase_tx` へ送出しつつ全文を返す
    pub async fn translate_streaming(
        &self,
        user_id: &str,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        phrase_tx: mpsc::UnboundedSender<String>,
    ) -> Result<String, TranslationError> {
        self.translate_inner(user_id, text, source_lang, target_lang, Some(phrase_tx))
            .await
    }

    async fn translate_inner(
        &self,
        user_id: &str,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        phrase_tx: Option<mpsc::UnboundedSender<String>>,
    ) -> Result<String, TranslationError> {
        let prompt = build_prompt(source_lang, target_lang, text);
        let mut segmenter = PhraseSegmenter::new();

        // 戦略(a): ストリーミングチャット（主→フォールバックモデル）。
        // コールバックがfalseを返したら読み手消失とみなし全体を打ち切る
        let streamed = {
            let tx = phrase_tx.clone();
            let mut on_content = |content: &str| -> bool {
                let Some(tx) = &tx else { return true };
                for phrase in segmenter.push(content) {
                    if tx.send(phrase).is_err() {
                        return false;
                    }
                }
                true
            };

            let primary = self
                .run_chat_stream(&self.config.chat.model, &prompt, &mut on_content)
                .await;
            match primary {
                Ok(full) => Some(full),
                Err(TranslationError::Canceled) => return Err(TranslationError::Canceled),
                Err(TranslationError::ModelNotFound { model }) => {
                    match &self.config.chat.fallback_model {
                        Some(fallback_model) if *fallback_model != model => {
                            debug!(%model, %fallback_model, "retrying with fallback model");
                            match self
                                .run_chat_stream(fallback_model, &prompt, &mut on_content)
                                .await
                            {
                                Ok(full) => Some(full),
                                Err(TranslationError::Canceled) => {
                                    return Err(TranslationError::Canceled)
                                }
                                Err(err) => {
                                    warn!(error = %err, "fallback model stream failed");
                                    None
                                }
                            }
                        }
                        _ => {
                            warn!(%model, "model not found and no fallback model configured");
                            None
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "chat stream translation failed");
                    None
                }
            }
        };

        // 戦略(b): ステートレス翻訳。(a)の成功を上書きしてはならない
        let translated = match streamed {
            Some(full) => full,
            None => {
                let full = self
                    .fallback
                    .translate(text, source_lang, target_lang)
                    .await?;
                if let Some(tx) = &phrase_tx {
                    for phrase in segmenter.push(&full) {
                        if tx.send(phrase).is_err() {
                            return Err(TranslationError::Canceled);
                        }
                    }
                }
                full
            }
        };

        // ストリーム終端: 残りのバッファを最終フレーズとして送出
        if let Some(tx) = &phrase_tx {
            if let Some(rest) = segmenter.flush() {
                if tx.send(rest).is_err() {
                    return Err(TranslationError::Canceled);
                }
            }
        }

        let translated = translated.trim().to_string();
        if translated.is_empty() {
            return Err(TranslationError::Empty);
        }

        self.persist_best_effort(user_id, text, source_lang, target_lang, &translated);

        Ok(translated)
    }

    /// チャットストリームを1本読み切り、増分を連結した全文を返す
    ///
    /// 行は読み取り境界を跨いで蓄積し、壊れた行はスキップして読み続ける。
    /// 途中切断の`Err`項目は途切れた前半を成功として返さず、全体を失敗にする。
    /// `on_content`がfalseを返したら読み手消失として`Canceled`を返す。
    async fn run_chat_stream(
        &self,
        model: &str,
        prompt: &str,
        on_content: &mut (dyn FnMut(&str) -> bool + Send),
    ) -> Result<String, TranslationError> {
        let mut rx = self
            .chat
            .open_stream(ChatStreamRequest {
                model: model.to_string(),
                prompt: prompt.to_string(),
                temperature: self.config.chat.temperature,
            })
            .await?;

        let mut lines = LineAccumulator::new();
        let mut full = String::new();

        while let Some(item) = rx.recv().await {
            let chunk = item?;
            for line in lines.push(&chunk) {
                if let Some(content) = parse_content_line(&line) {
                    full.push_str(&content);
                    if !on_content(&content) {
                        return Err(TranslationError::Canceled);
                    }
                }
            }
        }
        if let Some(tail) = lines.flush() {
            if let Some(content) = parse_content_line(&tail) {
                full.push_str(&content);
                if !on_content(&content) {
                    return Err(TranslationError::Canceled);
                }
            }
        }

        if full.trim().is_empty() {
            return Err(TranslationError::Empty);
        }
        Ok(full)
    }

    /// 訳文の組を非同期に保存する。失敗してもログのみで応答は遅延させない
    fn persist_best_effort(
        &self,
        user_id: &str,
        original: &str,
        source_lang: &str,
        target_lang: &str,
        translated: &str,
    ) {
        let datastore = self.datastore.clone();
        let record = NewTranslation {
            user_id: user_id.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            original_text: original.to_string(),
            translated_text: translated.to_string(),
        };
        tokio::spawn(async move {
            if let Err(err) = datastore.insert_translation(record).await {
                warn!(error = %err, "translation persistence failed");
            }
        });
    }
}

/// モデルへの翻訳指示（前置き無しで訳文のみを出力させる）
fn build_prompt(source_lang: &str, target_lang: &str, text: &str) -> String {
    format!(
        "You are a real-time translator. Translate the following text from {source_lang} to {target_lang}. \
         Do not add preamble. Output only the translation.\n\nText:\n{text}"
    )
}
