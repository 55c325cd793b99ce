//! HTTP APIのリクエスト/レスポンス形状
//!
//! ワイヤ形状はcamelCaseで固定（フロントエンドとの互換）。
use serde::{Deserialize, Serialize};

use crate::datastore::{TranscriptionRecord, TranslationRecord};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: Option<String>,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSpeechRequest {
    pub text: Option<String>,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub meeting_id: Option<String>,
    pub sender: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRequest {
    pub utterance_id: Option<String>,
    pub speaker_user_id: Option<String>,
    pub text: Option<String>,
    pub source_lang: Option<String>,
    pub meeting_id: Option<String>,
    pub ts: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestTranscriptionQuery {
    pub meeting_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptionListResponse {
    pub transcriptions: Vec<TranscriptionRecord>,
}

#[derive(Debug, Serialize)]
pub struct TranslationListResponse {
    pub translations: Vec<TranslationRecord>,
}
