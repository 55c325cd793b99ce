//! 逐次ストリーム解析の補助型
//!
//! - `LineAccumulator` は読み取り単位を跨ぐ改行区切りバッファ
//!   （読み終わりの不完全な行は次回読み取りへ持ち越す）
//! - `PhraseSegmenter` は翻訳増分を句読点単位のフレーズへ区切る
//!   （末尾の未確定な残りはちょうど1つだけ保持される）

/// フレーズ境界とみなす文末レベルの句読点
const PHRASE_PUNCTUATION: &[char] = &['.', '!', '?', ';', ','];

/// 改行区切りの逐次バッファ
///
/// バイト列のまま蓄積するため、UTF-8のマルチバイト文字が
/// 読み取り境界で分断されても壊れません。
#[derive(Debug, Default)]
pub struct LineAccumulator {
    buf: Vec<u8>,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// チャンクを追記し、完成した行（空行は除く）を返す
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let rest = self.buf.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.buf, rest);
            line.pop(); // 改行を除去
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.is_empty() {
                lines.push(String::from_utf8_lossy(&line).into_owned());
            }
        }
        lines
    }

    /// ストリーム終端で残っている不完全な行を取り出す
    pub fn flush(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// 句読点区切りのフレーズ分割器
///
/// `push` は確定したフレーズのみを生成順で返し、末尾の（未完の）
/// 残りを内部バッファとして保持します。`flush` はストリーム終端で
/// 残りを取り出します。
#[derive(Debug, Default)]
pub struct PhraseSegmenter {
    buf: String,
}

impl PhraseSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 翻訳増分を追記し、確定したフレーズ列を返す
    pub fn push(&mut self, content: &str) -> Vec<String> {
        self.buf.push_str(content);
        if !self.buf.contains(PHRASE_PUNCTUATION) {
            return Vec::new();
        }

        let mut parts = split_on_punctuation_runs(&self.buf);
        // 最後の断片は次回へ持ち越す
        self.buf = parts.pop().unwrap_or_default();
        parts
    }

    /// 終端で残っているバッファを最終フレーズとして取り出す
    /// （空白のみなら何も返さない）
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

/// 句読点の連続を1つの区切りとして分割する
/// （例: "a.,b" → ["a", "b"]、"a." → ["a", ""]）
fn split_on_punctuation_runs(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_run = false;

    for ch in input.chars() {
        if PHRASE_PUNCTUATION.contains(&ch) {
            if !in_run {
                parts.push(std::mem::take(&mut current));
                in_run = true;
            }
        } else {
            in_run = false;
            current.push(ch);
        }
    }
    parts.push(current);
    parts
}
