use crate::config::ShardingConfig;
use crate::error::AppResult;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub type DbPool = SqlitePool;

/// 每个物理库一个连接池，下标即库号
pub async fn create_shard_pools(config: &ShardingConfig) -> AppResult<Vec<DbPool>> {
    config.validate()?;

    let mut pools = Vec::with_capacity(config.database_count());
    for url in &config.database_urls {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;
        pools.push(pool);
    }

    Ok(pools)
}

/// 在每个库内建出全部物理表 t_order_0 .. t_order_{table_count-1}。
/// 表名是动态的，无法用 sqlx::migrate!，改为程序化建表。
pub async fn init_schema(pools: &[DbPool], table_count: usize) -> AppResult<()> {
    for pool in pools {
        for table_index in 0..table_count {
            // 金额用 TEXT 存储十进制串，避免浮点精度问题
            let create_table = format!(
                r#"
                CREATE TABLE IF NOT EXISTS t_order_{table_index} (
                    order_id     INTEGER PRIMARY KEY,
                    order_no     TEXT    NOT NULL UNIQUE,
                    user_id      INTEGER NOT NULL,
                    product_name TEXT    NOT NULL,
                    amount       TEXT    NOT NULL,
                    status       INTEGER NOT NULL,
                    create_time  TEXT    NOT NULL,
                    update_time  TEXT    NOT NULL
                )
                "#
            );
            sqlx::query(&create_table).execute(pool).await?;

            let create_index = format!(
                "CREATE INDEX IF NOT EXISTS idx_t_order_{table_index}_user_id \
                 ON t_order_{table_index} (user_id)"
            );
            sqlx::query(&create_index).execute(pool).await?;
        }
    }

    Ok(())
}
