use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP APIサーバのバインドアドレス（例: 127.0.0.1:8080）
    pub http_bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}
