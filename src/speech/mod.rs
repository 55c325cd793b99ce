//! 音声まわり（合成クライアント・ファンアウト・読み上げキュー）
mod error;
mod fanout;
mod player;
mod synth;

pub use error::SpeechError;
pub use fanout::PhraseSynthesisFanout;
pub use player::{AudioSink, PlayerSnapshot, PlayerStatus, TtsQueuePlayer};
pub use synth::{HttpSpeechSynthesizer, SpeechSynthesizer};
