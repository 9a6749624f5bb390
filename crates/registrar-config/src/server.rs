use std::env;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address the API listens on
    pub addr: String,
    /// Port of the separate Prometheus exporter
    pub metrics_port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            metrics_port: env::var("METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(9100),
        }
    }
}
