use std::net::SocketAddr;
use tracing::warn;

pub const DEFAULT_ADDR: &str = "0.0.0.0:25917";
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// 服务器启动参数，来自环境变量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `HOPE_KILL_ADDR`
    pub addr: SocketAddr,
    /// `HOPE_KILL_CHANNEL_CAPACITY`，每个连接的发送队列长度
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: SocketAddr::from(([0, 0, 0, 0], 25917)),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 无法解析的值会被忽略并使用默认值
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ServerConfig::default();

        if let Some(raw) = lookup("HOPE_KILL_ADDR") {
            match raw.parse() {
                Ok(addr) => config.addr = addr,
                Err(e) => warn!("HOPE_KILL_ADDR={} 无效（{}），使用默认地址 {}", raw, e, DEFAULT_ADDR),
            }
        }

        if let Some(raw) = lookup("HOPE_KILL_CHANNEL_CAPACITY") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.channel_capacity = n,
                _ => warn!(
                    "HOPE_KILL_CHANNEL_CAPACITY={} 无效，使用默认值 {}",
                    raw, DEFAULT_CHANNEL_CAPACITY
                ),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr.to_string(), DEFAULT_ADDR);
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let config = ServerConfig::from_lookup(|key| match key {
            "HOPE_KILL_ADDR" => Some("127.0.0.1:9000".to_string()),
            "HOPE_KILL_CHANNEL_CAPACITY" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);

        let config = ServerConfig::from_lookup(|key| match key {
            "HOPE_KILL_ADDR" => Some("not an address".to_string()),
            "HOPE_KILL_CHANNEL_CAPACITY" => Some("8".to_string()),
            _ => None,
        });
        assert_eq!(config.addr.to_string(), DEFAULT_ADDR);
        assert_eq!(config.channel_capacity, 8);
    }
}
