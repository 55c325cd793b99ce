//! HTTP API サーバ
//!
//! 翻訳・音声化・永続化のエンドポイントを提供します。呼び出し元の識別は
//! `x-user-id` ヘッダで行い、未指定のリクエストは 401 で拒否します。
mod error;
mod models;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::ConfigSet;
use crate::datastore::{NewTranscription, TranscriptStore};
use crate::speech::{PhraseSynthesisFanout, SpeechSynthesizer};
use crate::translation::{
    CacheKey, RateLimiter, TranslationCache, TranslationError, TranslationService,
};
use crate::util::now_ms;

pub use error::{ApiError, ApiErrorCode, ApiResult};
pub use models::*;

/// 呼び出し元を識別するヘッダ名
const CALLER_HEADER: &str = "x-user-id";

/// ハンドラ間で共有する状態
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigSet>,
    pub translator: Arc<TranslationService>,
    pub cache: Arc<TranslationCache>,
    pub limiter: Arc<RateLimiter>,
    pub datastore: Arc<dyn TranscriptStore>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

/// ルータを構築する
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/translate", post(translate))
        .route("/api/process-speech", post(process_speech))
        .route("/api/transcripts", post(insert_transcript))
        .route("/api/transcriptions/latest", get(latest_transcriptions))
        .route("/api/translation/latest", get(latest_translations))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 設定のバインドアドレスで待ち受けを開始する
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = state.config.server.http_bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    serve_with_listener(listener, state).await
}

/// 既存リスナで待ち受けを開始する（テストでは 127.0.0.1:0 を渡す）
pub async fn serve_with_listener(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "http api listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// `x-user-id` ヘッダから呼び出し元IDを取り出す
fn require_caller(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::new(ApiErrorCode::Unauthorized, "Missing caller identity"))
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> ApiResult<T> {
    serde_json::from_str(body)
        .map_err(|err| ApiError::new(ApiErrorCode::InvalidInput, "Invalid JSON").with_details(err.to_string()))
}

/// 全文翻訳エンドポイント
///
/// レートリミットは本文の検証より先に消費される。同一言語指定は
/// 上流を呼ばずに原文をそのまま返す。
async fn translate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Json<TranslateResponse>> {
    let caller = require_caller(&headers)?;
    if !state.limiter.check(&caller) {
        return Err(ApiError::new(
            ApiErrorCode::RateLimited,
            "Too many requests",
        ));
    }

    let request: TranslateRequest = parse_body(&body)?;
    let text = request.text.unwrap_or_default().trim().to_string();
    let target_lang = request.target_lang.unwrap_or_default();
    if text.is_empty() || target_lang.is_empty() {
        return Err(ApiError::new(ApiErrorCode::InvalidInput, "Invalid input"));
    }
    // 上限は文字数で数える（多バイト文字でバイト長と乖離する）
    if text.chars().count() > state.config.translation.max_text_len {
        return Err(ApiError::new(ApiErrorCode::TextTooLarge, "Text too long"));
    }
    let source_lang = request
        .source_lang
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "auto".to_string());

    if source_lang == target_lang {
        return Ok(Json(TranslateResponse {
            translated_text: text,
        }));
    }

    let key = CacheKey {
        source_lang: source_lang.clone(),
        target_lang: target_lang.clone(),
        text: text.clone(),
    };
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(TranslateResponse {
            translated_text: hit,
        }));
    }

    let translated = state
        .translator
        .translate(&caller, &text, &source_lang, &target_lang)
        .await
        .map_err(|err| {
            ApiError::new(ApiErrorCode::UpstreamFailed, "Translation failed")
                .with_details(err.to_string())
        })?;
    state.cache.insert(key, translated.clone());

    Ok(Json(TranslateResponse {
        translated_text: translated,
    }))
}

/// 翻訳しながら音声化し、音声バイト列を1本のストリームで返す
///
/// 文字起こしの保存はベストエフォートで、失敗しても応答は続行する。
async fn process_speech(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Response> {
    let caller = require_caller(&headers)?;
    let request: ProcessSpeechRequest = parse_body(&body)?;

    let text = request.text.unwrap_or_default().trim().to_string();
    let target_lang = request.target_lang.unwrap_or_default();
    if text.is_empty() || target_lang.is_empty() {
        return Err(ApiError::new(ApiErrorCode::InvalidInput, "Invalid input"));
    }
    // 上限は文字数で数える（多バイト文字でバイト長と乖離する）
    if text.chars().count() > state.config.translation.max_text_len {
        return Err(ApiError::new(ApiErrorCode::TextTooLarge, "Text too long"));
    }
    let source_lang = request
        .source_lang
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "auto".to_string());

    // 原文の文字起こしを保存（失敗はログのみ）
    let transcription = NewTranscription {
        user_id: caller.clone(),
        meeting_id: request.meeting_id.unwrap_or_default(),
        sender: request.sender.unwrap_or_else(|| caller.clone()),
        text: text.clone(),
        source_lang: source_lang.clone(),
        created_at_ms: now_ms(),
    };
    if let Err(err) = state.datastore.insert_transcription(transcription).await {
        warn!(error = %err, "transcription persistence failed");
    }

    // フレーズ → 合成ファンアウト → 単一音声ストリームの配管
    let (audio_tx, audio_rx) = mpsc::channel::<Bytes>(32);
    let fanout = PhraseSynthesisFanout::new(
        state.synthesizer.clone(),
        audio_tx,
        target_lang.clone(),
        state.config.speech.synthesis.voice_id.clone(),
    );
    let (phrase_tx, mut phrase_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(phrase) = phrase_rx.recv().await {
            fanout.dispatch(phrase);
        }
    });

    let translator = state.translator.clone();
    tokio::spawn(async move {
        match translator
            .translate_streaming(&caller, &text, &source_lang, &target_lang, phrase_tx)
            .await
        {
            Ok(_) => {}
            // 受信側が接続を閉じただけなので障害として扱わない
            Err(TranslationError::Canceled) => {
                debug!("speech translation canceled by consumer");
            }
            Err(err) => warn!(error = %err, "speech translation failed"),
        }
    });

    let stream = ReceiverStream::new(audio_rx).map(Ok::<_, Infallible>);
    let body = Body::from_stream(stream);
    Ok(([(header::CONTENT_TYPE, "audio/wav")], body).into_response())
}

/// 確定キャプションの文字起こしを保存する
async fn insert_transcript(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Json<OkResponse>> {
    let caller = require_caller(&headers)?;
    let request: TranscriptRequest = parse_body(&body)?;

    let utterance_id = request.utterance_id.unwrap_or_default();
    let speaker_user_id = request.speaker_user_id.unwrap_or_default();
    let text = request.text.unwrap_or_default();
    if utterance_id.is_empty() || speaker_user_id.is_empty() || text.trim().is_empty() {
        return Err(ApiError::new(ApiErrorCode::InvalidInput, "Invalid input"));
    }

    let record = NewTranscription {
        user_id: caller,
        meeting_id: request.meeting_id.unwrap_or_default(),
        sender: speaker_user_id,
        text,
        source_lang: request
            .source_lang
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "auto".to_string()),
        created_at_ms: request.ts.unwrap_or_else(now_ms),
    };
    state
        .datastore
        .insert_transcription(record)
        .await
        .map_err(|err| {
            ApiError::new(ApiErrorCode::PersistenceFailed, "Insert failed")
                .with_details(err.to_string())
        })?;

    Ok(Json(OkResponse { ok: true }))
}

/// 指定ミーティングの最新の文字起こしを返す
async fn latest_transcriptions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LatestTranscriptionQuery>,
) -> ApiResult<Json<TranscriptionListResponse>> {
    require_caller(&headers)?;
    let meeting_id = query.meeting_id.unwrap_or_default();
    if meeting_id.is_empty() {
        return Err(ApiError::new(
            ApiErrorCode::InvalidInput,
            "meetingId is required",
        ));
    }

    let latest = state
        .datastore
        .latest_transcription(&meeting_id)
        .await
        .map_err(|err| {
            ApiError::new(ApiErrorCode::PersistenceFailed, "Lookup failed")
                .with_details(err.to_string())
        })?;

    Ok(Json(TranscriptionListResponse {
        transcriptions: latest.into_iter().collect(),
    }))
}

/// 呼び出し元ユーザの最新の翻訳結果を返す
async fn latest_translations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<TranslationListResponse>> {
    let caller = require_caller(&headers)?;

    let latest = state
        .datastore
        .latest_translation(&caller)
        .await
        .map_err(|err| {
            ApiError::new(ApiErrorCode::PersistenceFailed, "Lookup failed")
                .with_details(err.to_string())
        })?;

    Ok(Json(TranslationListResponse {
        translations: latest.into_iter().collect(),
    }))
}
