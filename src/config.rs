use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub sharding: ShardingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 分片拓扑配置：每个物理库一个连接串，每库 table_count 张物理表。
/// 修改分片数量需要重建 resolver/store，不支持运行时原地变更。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardingConfig {
    /// 物理库连接串，下标即库号 ds0, ds1, ...
    pub database_urls: Vec<String>,
    /// 每个库内的物理表数量 t_order_0 .. t_order_{n-1}
    pub table_count: usize,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl ShardingConfig {
    pub fn database_count(&self) -> usize {
        self.database_urls.len()
    }

    /// 启动时校验，非法的分片数量直接拒绝启动
    pub fn validate(&self) -> AppResult<()> {
        if self.database_urls.is_empty() {
            return Err(AppError::ConfigError(
                "sharding.database_urls 不能为空".to_string(),
            ));
        }
        if self.table_count == 0 {
            return Err(AppError::ConfigError(
                "sharding.table_count 必须大于 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 无配置文件：使用环境变量与默认值构建
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 分片库连接串在无配置文件时必须提供（逗号分隔）
                let database_urls = get_env("SHARD_DB_URLS")
                    .ok_or("缺少 SHARD_DB_URLS 环境变量，且未找到配置文件 config.toml")?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    sharding: ShardingConfig {
                        database_urls,
                        table_count: get_env_parse("SHARD_TABLE_COUNT", 2usize),
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("SHARD_DB_URLS") {
            config.sharding.database_urls = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("SHARD_TABLE_COUNT")
            && let Ok(n) = v.parse()
        {
            config.sharding.table_count = n;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.sharding.max_connections = mc;
        }

        Ok(config)
    }
}
