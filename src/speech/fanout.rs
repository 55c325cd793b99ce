//! フレーズ単位の合成ファンアウト
//!
//! 確定フレーズごとに独立の合成リクエストを発射し、得られた音声チャンクを
//! 単一の出力チャネルへ合流させます。個々の失敗は警告ログのみで、
//! 後続フレーズの合成は継続します。
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::warn;

use super::synth::SpeechSynthesizer;

pub struct PhraseSynthesisFanout {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    output: mpsc::Sender<Bytes>,
    language: String,
    voice_id: String,
}

impl PhraseSynthesisFanout {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        output: mpsc::Sender<Bytes>,
        language: String,
        voice_id: String,
    ) -> Self {
        Self {
            synthesizer,
            output,
            language,
            voice_id,
        }
    }

    /// フレーズを投入する。空白のみのフレーズは無視
    ///
    /// 合成は別タスクで行われ、このメソッドはすぐ戻る。出力チャネルが
    /// 閉じられた時点で転送は打ち切られる。
    pub fn dispatch(&self, phrase: String) {
        if phrase.trim().is_empty() {
            return;
        }

        let synthesizer = self.synthesizer.clone();
        let output = self.output.clone();
        let language = self.language.clone();
        let voice_id = self.voice_id.clone();
        tokio::spawn(async move {
            let mut rx = match synthesizer.synthesize(&phrase, &language, &voice_id).await {
                Ok(rx) => rx,
                Err(err) => {
                    warn!(error = %err, "phrase synthesis failed, skipping");
                    return;
                }
            };
            while let Some(chunk) = rx.recv().await {
                if output.send(chunk).await.is_err() {
                    break;
                }
            }
        });
    }
}
