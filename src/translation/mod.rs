//! 翻訳モジュール
//!
//! `TranslationService` は `StreamingChatClient` 実装（HTTPクライアントやモック）と
//! ステートレスな `TranslateBackend` を保持し、ストリーミング翻訳→
//! フォールバックの戦略連鎖を直列化します。
//!
//! - ストリーム読み取りは `LineAccumulator` で読み跨ぎの行を保持
//! - フレーズ区切りは `PhraseSegmenter` が句読点単位で判定
//! - キャッシュとレートリミッタは有界のプロセス共有サービス
mod cache;
mod client;
mod error;
mod rate_limit;
mod service;
mod stream;

pub use cache::{CacheKey, TranslationCache};
pub use client::{
    parse_content_line, ChatStreamRequest, HttpChatClient, HttpTranslateBackend,
    StreamingChatClient, TranslateBackend,
};
pub use error::TranslationError;
pub use rate_limit::RateLimiter;
pub use service::TranslationService;
pub use stream::{LineAccumulator, PhraseSegmenter};
