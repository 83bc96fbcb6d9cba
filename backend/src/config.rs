use std::path::PathBuf;

use anyhow::{bail, Context};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_MODEL_PATH: &str = "models/best_energy_model.json";

/// Process settings read once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub workers: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `PORT` must parse when set; a bad `WORKERS` falls back to the CPU count.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be an integer between 0 and 65535, got {raw:?}"))?,
            None => DEFAULT_PORT,
        };

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        if host.trim().is_empty() {
            bail!("HOST is set but empty");
        }

        let model_path = lookup("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));

        let workers = lookup("WORKERS")
            .and_then(|w| w.trim().parse::<usize>().ok())
            .filter(|w| *w > 0)
            .unwrap_or_else(num_cpus::get);

        Ok(Self {
            host,
            port,
            model_path,
            workers,
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.model_path, PathBuf::from("models/best_energy_model.json"));
        assert_eq!(cfg.workers, num_cpus::get());
    }

    #[test]
    fn port_from_env() {
        let cfg = config(&[("PORT", "9090")]).unwrap();
        assert_eq!(cfg.bind_address(), ("0.0.0.0".to_string(), 9090));
    }

    #[test]
    fn invalid_port_is_fatal() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(config(&[("PORT", "70000")]).is_err());
    }

    #[test]
    fn bad_workers_fall_back() {
        assert_eq!(config(&[("WORKERS", "0")]).unwrap().workers, num_cpus::get());
        assert_eq!(config(&[("WORKERS", "lots")]).unwrap().workers, num_cpus::get());
        assert_eq!(config(&[("WORKERS", "3")]).unwrap().workers, 3);
    }

    #[test]
    fn model_path_override() {
        let cfg = config(&[("MODEL_PATH", "/srv/model.onnx")]).unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("/srv/model.onnx"));
    }
}
