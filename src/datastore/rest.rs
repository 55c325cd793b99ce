//! REST実装（外部データストアのHTTP API）
//!
//! 外部データストアが提示するREST面への薄いクライアント。
//! 形状は `transcriptions` / `translations` の2コレクションと
//! それぞれの `latest` 取得のみ。
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::DatastoreError;
use super::{
    NewTranscription, NewTranslation, TranscriptStore, TranscriptionRecord, TranslationRecord,
};

#[derive(Debug, Clone)]
pub struct RestTranscriptStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranscriptionRow<'a> {
    user_id: &'a str,
    meeting_id: &'a str,
    sender: &'a str,
    text: &'a str,
    source_lang: &'a str,
    created_at_ms: i64,
}

#[derive(Debug, Serialize)]
struct TranslationRow<'a> {
    user_id: &'a str,
    source_lang: &'a str,
    target_lang: &'a str,
    original_text: &'a str,
    translated_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct StoredTranscription {
    id: String,
    user_id: String,
    meeting_id: String,
    sender: String,
    text: String,
    source_lang: String,
    created_at_ms: i64,
}

#[derive(Debug, Deserialize)]
struct StoredTranslation {
    id: String,
    user_id: String,
    source_lang: String,
    target_lang: String,
    original_text: String,
    translated_text: String,
    created_at_ms: i64,
}

impl RestTranscriptStore {
    pub fn new(client: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, DatastoreError> {
        if !response.status().is_success() {
            return Err(DatastoreError::Status {
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

fn request_error(err: reqwest::Error) -> DatastoreError {
    DatastoreError::Request {
        message: err.to_string(),
    }
}

#[async_trait]
impl TranscriptStore for RestTranscriptStore {
    async fn insert_transcription(
        &self,
        record: NewTranscription,
    ) -> Result<TranscriptionRecord, DatastoreError> {
        let row = TranscriptionRow {
            user_id: &record.user_id,
            meeting_id: &record.meeting_id,
            sender: &record.sender,
            text: &record.text,
            source_lang: &record.source_lang,
            created_at_ms: record.created_at_ms,
        };
        let url = format!("{}/transcriptions", self.base_url);
        let response = self
            .request(self.client.post(&url).json(&row))
            .send()
            .await
            .map_err(request_error)?;
        let stored: StoredTranscription = Self::check(response)
            .await?
            .json()
            .await
            .map_err(request_error)?;
        Ok(TranscriptionRecord {
            id: stored.id,
            user_id: stored.user_id,
            meeting_id: stored.meeting_id,
            sender: stored.sender,
            text: stored.text,
            source_lang: stored.source_lang,
            created_at_ms: stored.created_at_ms,
        })
    }

    async fn insert_translation(&self, record: NewTranslation) -> Result<(), DatastoreError> {
        let row = TranslationRow {
            user_id: &record.user_id,
            source_lang: &record.source_lang,
            target_lang: &record.target_lang,
            original_text: &record.original_text,
            translated_text: &record.translated_text,
        };
        let url = format!("{}/translations", self.base_url);
        let response = self
            .request(self.client.post(&url).json(&row))
            .send()
            .await
            .map_err(request_error)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn latest_transcription(
        &self,
        meeting_id: &str,
    ) -> Result<Option<TranscriptionRecord>, DatastoreError> {
        let url = format!("{}/transcriptions/latest", self.base_url);
        let response = self
            .request(self.client.get(&url).query(&[("meetingId", meeting_id)]))
            .send()
            .await
            .map_err(request_error)?;
        let rows: Vec<StoredTranscription> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(request_error)?;
        Ok(rows.into_iter().next().map(|stored| TranscriptionRecord {
            id: stored.id,
            user_id: stored.user_id,
            meeting_id: stored.meeting_id,
            sender: stored.sender,
            text: stored.text,
            source_lang: stored.source_lang,
            created_at_ms: stored.created_at_ms,
        }))
    }

    async fn latest_translation(
        &self,
        user_id: &str,
    ) -> Result<Option<TranslationRecord>, DatastoreError> {
        let url = format!("{}/translations/latest", self.base_url);
        let response = self
            .request(self.client.get(&url).query(&[("userId", user_id)]))
            .send()
            .await
            .map_err(request_error)?;
        let rows: Vec<StoredTranslation> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(request_error)?;
        Ok(rows.into_iter().next().map(|stored| TranslationRecord {
            id: stored.id,
            user_id: stored.user_id,
            source_lang: stored.source_lang,
            target_lang: stored.target_lang,
            original_text: stored.original_text,
            translated_text: stored.translated_text,
            created_at_ms: stored.created_at_ms,
        }))
    }
}
