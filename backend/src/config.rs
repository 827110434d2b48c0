use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "models/linkedin_model.onnx";

/// Checked-in logistic artifact; set `MODEL_PATH` to this to run without the trained export.
pub const LOCAL_MODEL_PATH: &str = "models/linkedin_model.example.json";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub model_path: PathBuf,
    pub static_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let workers = lookup("WORKERS")
            .and_then(|w| w.parse().ok())
            .filter(|w: &usize| *w > 0)
            .unwrap_or_else(num_cpus::get);
        let model_path = lookup("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));
        let static_dir = lookup("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./static"));

        ServerConfig {
            host,
            port,
            workers,
            model_path,
            static_dir,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
