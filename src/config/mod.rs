//! 設定モジュール（YAML 読み込み）
//!
//! `ConfigSet` はルートディレクトリ配下の複数YAMLファイルを読み込み、
//! 実行時に必要な設定値を型安全に提供します。
//! 各セクションは `Default` も実装しており、テストや組み込み用途では
//! ファイル無しでも既定値で構築できます。
mod captions;
mod error;
mod server;
mod speech;
mod translation;

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

pub use captions::*;
pub use error::ConfigError;
pub use server::*;
pub use speech::*;
pub use translation::*;

/// 設定ディレクトリを指す環境変数名
pub const CONFIG_DIR_ENV: &str = "CAPTION_TRANSLATOR_CONFIG_DIR";

/// すべての設定をひとまとめにした構造体
#[derive(Debug, Clone)]
pub struct ConfigSet {
    pub server: ServerConfig,
    pub captions: CaptionPipelineConfig,
    pub translation: TranslationConfig,
    pub speech: SpeechConfig,
    root: PathBuf,
}

impl ConfigSet {
    /// ルートディレクトリから各YAMLを読み込み
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, ConfigError> {
        let root = dir.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ConfigError::MissingRoot(root));
        }

        let server = load_yaml(root.join("server.yaml"))?;
        let captions = load_yaml(root.join("captions.yaml"))?;
        let translation = load_yaml(root.join("translation.yaml"))?;
        let speech = load_yaml(root.join("speech.yaml"))?;

        Ok(Self {
            server,
            captions,
            translation,
            speech,
            root,
        })
    }

    /// 環境変数（未設定時は `config/`）から設定を読み込み
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let dir = std::env::var(CONFIG_DIR_ENV).unwrap_or_else(|_| "config".to_string());
        Self::load_from_dir(dir)
    }

    /// 設定ルートのパス（デバッグ等に利用）
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for ConfigSet {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            captions: CaptionPipelineConfig::default(),
            translation: TranslationConfig::default(),
            speech: SpeechConfig::default(),
            root: PathBuf::from("config"),
        }
    }
}

/// YAMLファイルを読み込み、型 `T` へデシリアライズ
fn load_yaml<T>(path: PathBuf) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let data = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    serde_yaml::from_str(&data).map_err(|source| ConfigError::Parse { path, source })
}
