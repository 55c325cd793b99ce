//! 設定ファイル読み込みの失敗種別
//!
//! 起動時に一度だけ発生しうるエラーで、どのファイルで失敗したかを
//! パス付きで保持します。
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// 設定ルートがディレクトリとして存在しない
    #[error("config root {0:?} is not a directory")]
    MissingRoot(PathBuf),
    /// ファイルの読み取りに失敗した（権限不足や種別違いを含む）
    #[error("cannot read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// YAMLとして解釈できない、または必須フィールドが欠けている
    #[error("cannot parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
