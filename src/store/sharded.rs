use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{NewOrder, Order, OrderStatus, PageParams, ShardRowCount, SystemStats};
use crate::sharding::{OrderIdAllocator, ShardKeyResolver, ShardTarget};
use chrono::Utc;
use futures_util::future;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

const ORDER_COLUMNS: &str =
    "order_id, order_no, user_id, product_name, amount, status, create_time, update_time";

fn shard_err(target: ShardTarget, err: sqlx::Error) -> AppError {
    AppError::ShardUnavailable {
        db_index: target.db_index,
        table_index: target.table_index,
        message: err.to_string(),
    }
}

/// 订单分片存储，所有分片 I/O 的唯一入口。
///
/// 持有每个物理库一个连接池；带 user_id 的操作只路由到一个库，
/// 路由信息不足的操作按需广播并合并结果。广播的失败策略按操作区分：
/// 聚合与唯一性敏感的查询遇到分片失败整体失败，列表查询返回
/// 标记为 partial 的尽力结果。
#[derive(Clone)]
pub struct ShardedStore {
    pools: Vec<DbPool>,
    resolver: ShardKeyResolver,
    ids: Arc<OrderIdAllocator>,
}

/// 单库多表扫描的合并结果，failed_shards 非空即为部分结果
#[derive(Debug)]
pub struct ScanResult {
    pub orders: Vec<Order>,
    pub failed_shards: Vec<ShardTarget>,
}

impl ShardedStore {
    pub fn new(pools: Vec<DbPool>, table_count: usize) -> AppResult<Self> {
        let resolver = ShardKeyResolver::new(pools.len(), table_count)?;
        Ok(Self {
            pools,
            resolver,
            ids: Arc::new(OrderIdAllocator::new()),
        })
    }

    pub fn resolver(&self) -> &ShardKeyResolver {
        &self.resolver
    }

    /// 插入新订单：集中分配 order_id，据此定表、据 user_id 定库，
    /// 时间戳由这里统一填充，状态强制为待支付。
    pub async fn insert(&self, new_order: NewOrder) -> AppResult<Order> {
        let order_id = self.ids.next_id();
        let target = self.resolver.resolve(new_order.user_id, order_id);
        let now = Utc::now();

        let order = Order {
            order_id,
            order_no: new_order.order_no,
            user_id: new_order.user_id,
            product_name: new_order.product_name,
            amount: new_order.amount,
            status: OrderStatus::Pending,
            create_time: now,
            update_time: now,
        };

        let sql = format!(
            "INSERT INTO t_order_{} ({ORDER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            target.table_index
        );
        sqlx::query(&sql)
            .bind(order.order_id)
            .bind(&order.order_no)
            .bind(order.user_id)
            .bind(&order.product_name)
            .bind(order.amount.to_string())
            .bind(order.status.as_i64())
            .bind(order.create_time)
            .bind(order.update_time)
            .execute(&self.pools[target.db_index])
            .await
            .map_err(|e| shard_err(target, e))?;

        log::info!(
            "订单路由: order_id={}, user_id={}, 落在 {}",
            order.order_id,
            order.user_id,
            target
        );
        Ok(order)
    }

    /// 按订单ID查询。order_id 只能推出表号，库号取决于 user_id，
    /// 所以要按固定表号广播所有库，比带 user_id 的查询贵。
    /// 任一分片不可用即整体失败，避免把"查不到"误报成"不存在"。
    pub async fn get_by_id(&self, order_id: i64) -> AppResult<Option<Order>> {
        let table_index = self.resolver.table_index(order_id);
        let queries = self.pools.iter().enumerate().map(|(db_index, pool)| {
            let sql =
                format!("SELECT {ORDER_COLUMNS} FROM t_order_{table_index} WHERE order_id = ?");
            async move {
                sqlx::query_as::<_, Order>(&sql)
                    .bind(order_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        shard_err(
                            ShardTarget {
                                db_index,
                                table_index,
                            },
                            e,
                        )
                    })
            }
        });

        let results = future::try_join_all(queries).await?;
        Ok(results.into_iter().flatten().next())
    }

    /// 按订单号查询。order_no 不含任何路由信息，全量广播所有 (库, 表)；
    /// order_no 全局唯一，命中即停止。
    pub async fn get_by_order_no(&self, order_no: &str) -> AppResult<Option<Order>> {
        for (db_index, pool) in self.pools.iter().enumerate() {
            for table_index in 0..self.resolver.table_count() {
                let sql =
                    format!("SELECT {ORDER_COLUMNS} FROM t_order_{table_index} WHERE order_no = ?");
                let found = sqlx::query_as::<_, Order>(&sql)
                    .bind(order_no)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        shard_err(
                            ShardTarget {
                                db_index,
                                table_index,
                            },
                            e,
                        )
                    })?;
                if found.is_some() {
                    return Ok(found);
                }
            }
        }
        Ok(None)
    }

    /// 查询用户全部订单：定库后并发扫该库内每张表，合并结果。
    /// 个别表失败不整体失败，记入 failed_shards 返回部分结果。
    pub async fn list_by_user(&self, user_id: i64) -> ScanResult {
        let db_index = self.resolver.db_index(user_id);
        let pool = &self.pools[db_index];

        let queries = (0..self.resolver.table_count()).map(|table_index| {
            let sql =
                format!("SELECT {ORDER_COLUMNS} FROM t_order_{table_index} WHERE user_id = ?");
            async move {
                let result = sqlx::query_as::<_, Order>(&sql)
                    .bind(user_id)
                    .fetch_all(pool)
                    .await;
                (table_index, result)
            }
        });

        let mut orders = Vec::new();
        let mut failed_shards = Vec::new();
        for (table_index, result) in future::join_all(queries).await {
            match result {
                Ok(mut rows) => orders.append(&mut rows),
                Err(e) => {
                    let target = ShardTarget {
                        db_index,
                        table_index,
                    };
                    log::warn!("分片 {target} 查询失败，返回部分结果: {e}");
                    failed_shards.push(target);
                }
            }
        }

        ScanResult {
            orders,
            failed_shards,
        }
    }

    /// 分页查询用户订单。跨表按 create_time 倒序，排序发生在合并之后，
    /// limit 无法下推到单个分片，属于 scatter-gather。
    pub async fn list_by_user_paged(
        &self,
        user_id: i64,
        params: PageParams,
    ) -> (Vec<Order>, i64, Vec<ShardTarget>) {
        let mut scan = self.list_by_user(user_id).await;
        scan.orders.sort_by(|a, b| {
            b.create_time
                .cmp(&a.create_time)
                .then(b.order_id.cmp(&a.order_id))
        });

        let total = scan.orders.len() as i64;
        let start = (params.offset() as usize).min(scan.orders.len());
        let end = (start + params.size as usize).min(scan.orders.len());
        let data = scan.orders[start..end].to_vec();

        (data, total, scan.failed_shards)
    }

    /// 状态变更的写入端：WHERE 带上期望的当前状态做比较交换，
    /// 写入时重新验证前置条件，并发下被抢先修改则影响行数为 0。
    pub async fn update_status(
        &self,
        order: &Order,
        from: OrderStatus,
        to: OrderStatus,
    ) -> AppResult<bool> {
        let target = self.resolver.resolve(order.user_id, order.order_id);
        let sql = format!(
            "UPDATE t_order_{} SET status = ?, update_time = ? WHERE order_id = ? AND status = ?",
            target.table_index
        );
        let result = sqlx::query(&sql)
            .bind(to.as_i64())
            .bind(Utc::now())
            .bind(order.order_id)
            .bind(from.as_i64())
            .execute(&self.pools[target.db_index])
            .await
            .map_err(|e| shard_err(target, e))?;

        Ok(result.rows_affected() > 0)
    }

    /// 用户消费总额：定库后对每张表取回金额在调用方用 Decimal 精确求和。
    /// SQLite 对 TEXT 金额列做 SUM 会退化成浮点，所以不在 SQL 里聚合。
    /// 聚合是正确性敏感操作，任一分片失败整体失败。
    pub async fn sum_amount_by_user(&self, user_id: i64) -> AppResult<Decimal> {
        let db_index = self.resolver.db_index(user_id);
        let pool = &self.pools[db_index];

        let queries = (0..self.resolver.table_count()).map(|table_index| {
            let sql = format!("SELECT amount FROM t_order_{table_index} WHERE user_id = ?");
            async move {
                let target = ShardTarget {
                    db_index,
                    table_index,
                };
                let rows = sqlx::query_as::<_, (String,)>(&sql)
                    .bind(user_id)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| shard_err(target, e))?;

                let mut partial = Decimal::ZERO;
                for (text,) in rows {
                    partial += Decimal::from_str(&text).map_err(|e| {
                        AppError::InternalError(format!("金额解析失败: {text}: {e}"))
                    })?;
                }
                Ok::<Decimal, AppError>(partial)
            }
        });

        let partials = future::try_join_all(queries).await?;
        Ok(partials.into_iter().fold(Decimal::ZERO, |acc, p| acc + p))
    }

    /// 删除用户全部订单，返回各表删除行数之和
    pub async fn delete_by_user(&self, user_id: i64) -> AppResult<u64> {
        let db_index = self.resolver.db_index(user_id);
        let pool = &self.pools[db_index];

        let queries = (0..self.resolver.table_count()).map(|table_index| {
            let sql = format!("DELETE FROM t_order_{table_index} WHERE user_id = ?");
            async move {
                let target = ShardTarget {
                    db_index,
                    table_index,
                };
                sqlx::query(&sql)
                    .bind(user_id)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected())
                    .map_err(|e| shard_err(target, e))
            }
        });

        let counts = future::try_join_all(queries).await?;
        Ok(counts.into_iter().sum())
    }

    /// 全量广播统计各状态订单数，任一分片失败整体失败
    pub async fn system_stats(&self) -> AppResult<SystemStats> {
        let queries = self.pools.iter().enumerate().flat_map(|(db_index, pool)| {
            (0..self.resolver.table_count()).map(move |table_index| {
                let sql = format!(
                    "SELECT status, COUNT(*) FROM t_order_{table_index} GROUP BY status"
                );
                async move {
                    sqlx::query_as::<_, (i64, i64)>(&sql)
                        .fetch_all(pool)
                        .await
                        .map_err(|e| {
                            shard_err(
                                ShardTarget {
                                    db_index,
                                    table_index,
                                },
                                e,
                            )
                        })
                }
            })
        });

        let mut stats = SystemStats {
            total: 0,
            pending: 0,
            paid: 0,
            completed: 0,
            cancelled: 0,
        };
        for rows in future::try_join_all(queries).await? {
            for (code, count) in rows {
                stats.total += count;
                match OrderStatus::from_i64(code) {
                    Some(OrderStatus::Pending) => stats.pending += count,
                    Some(OrderStatus::Paid) => stats.paid += count,
                    Some(OrderStatus::Completed) => stats.completed += count,
                    Some(OrderStatus::Cancelled) => stats.cancelled += count,
                    None => log::warn!("统计时忽略未知状态编码 {code}"),
                }
            }
        }
        Ok(stats)
    }

    /// 调试用：每个物理分片的行数
    pub async fn shard_layout(&self) -> AppResult<Vec<ShardRowCount>> {
        let mut layout = Vec::new();
        for (db_index, pool) in self.pools.iter().enumerate() {
            for table_index in 0..self.resolver.table_count() {
                let target = ShardTarget {
                    db_index,
                    table_index,
                };
                let sql = format!("SELECT COUNT(*) FROM t_order_{table_index}");
                let (rows,): (i64,) = sqlx::query_as(&sql)
                    .fetch_one(pool)
                    .await
                    .map_err(|e| shard_err(target, e))?;
                layout.push(ShardRowCount {
                    shard: target.to_string(),
                    rows,
                });
            }
        }
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_schema;
    use crate::utils::generate_order_no;
    use sqlx::sqlite::SqlitePoolOptions;

    // 内存库必须单连接，多连接会各自拿到独立的空库
    async fn memory_store(db_count: usize, table_count: usize) -> ShardedStore {
        let mut pools = Vec::new();
        for _ in 0..db_count {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .unwrap();
            pools.push(pool);
        }
        init_schema(&pools, table_count).await.unwrap();
        ShardedStore::new(pools, table_count).unwrap()
    }

    fn new_order(user_id: i64, amount: &str) -> NewOrder {
        NewOrder {
            order_no: generate_order_no(),
            user_id,
            product_name: "iPhone 15".to_string(),
            amount: Decimal::from_str(amount).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_routes_to_resolved_shard() {
        let store = memory_store(2, 2).await;
        let order = store.insert(new_order(1, "100.00")).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.order_no.len(), 25);
        assert!(order.order_no.starts_with("ORD"));

        let target = store.resolver.resolve(order.user_id, order.order_id);
        assert_eq!(target.db_index, 1); // 1 % 2

        // 物理表里确实只有目标分片有这行
        let sql = format!(
            "SELECT COUNT(*) FROM t_order_{} WHERE order_id = ?",
            target.table_index
        );
        let (hit,): (i64,) = sqlx::query_as(&sql)
            .bind(order.order_id)
            .fetch_one(&store.pools[target.db_index])
            .await
            .unwrap();
        assert_eq!(hit, 1);
        let (miss,): (i64,) = sqlx::query_as(&sql)
            .bind(order.order_id)
            .fetch_one(&store.pools[1 - target.db_index])
            .await
            .unwrap();
        assert_eq!(miss, 0);
    }

    #[tokio::test]
    async fn test_round_trip_by_id_and_order_no() {
        let store = memory_store(2, 2).await;
        let inserted = store.insert(new_order(7, "59.90")).await.unwrap();

        let by_id = store.get_by_id(inserted.order_id).await.unwrap().unwrap();
        assert_eq!(by_id.order_id, inserted.order_id);
        assert_eq!(by_id.order_no, inserted.order_no);
        assert_eq!(by_id.user_id, 7);
        assert_eq!(by_id.product_name, inserted.product_name);
        assert_eq!(by_id.amount, inserted.amount);
        assert_eq!(by_id.status, OrderStatus::Pending);

        let by_no = store
            .get_by_order_no(&inserted.order_no)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_no.order_id, inserted.order_id);

        assert!(store.get_by_id(inserted.order_id + 999).await.unwrap().is_none());
        assert!(store.get_by_order_no("ORD00000000000000DEADBEEF").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_user_scans_all_tables_in_db() {
        let store = memory_store(2, 2).await;
        // 连续分配的ID会交替落在两张表上
        for amount in ["10.00", "20.00", "30.00"] {
            store.insert(new_order(2, amount)).await.unwrap();
        }
        store.insert(new_order(1, "999.00")).await.unwrap();

        let scan = store.list_by_user(2).await;
        assert_eq!(scan.orders.len(), 3);
        assert!(scan.failed_shards.is_empty());
        assert!(scan.orders.iter().all(|o| o.user_id == 2));
    }

    #[tokio::test]
    async fn test_paged_list_merges_and_sorts_desc() {
        let store = memory_store(2, 2).await;
        let mut ids = Vec::new();
        for amount in ["10.00", "20.00", "30.00"] {
            ids.push(store.insert(new_order(2, amount)).await.unwrap().order_id);
        }

        let (data, total, failed) = store
            .list_by_user_paged(2, PageParams::new(Some(0), Some(10)))
            .await;
        assert_eq!(total, 3);
        assert!(failed.is_empty());
        // create_time 倒序，同刻按 order_id 倒序兜底，即后插的在前
        let got: Vec<i64> = data.iter().map(|o| o.order_id).collect();
        let mut expected = ids.clone();
        expected.reverse();
        assert_eq!(got, expected);

        let (page0, total, _) = store
            .list_by_user_paged(2, PageParams::new(Some(0), Some(2)))
            .await;
        assert_eq!(total, 3);
        assert_eq!(page0.len(), 2);
        let (page1, _, _) = store
            .list_by_user_paged(2, PageParams::new(Some(1), Some(2)))
            .await;
        assert_eq!(page1.len(), 1);
    }

    #[tokio::test]
    async fn test_sum_amount_exact_and_zero_for_empty() {
        let store = memory_store(2, 2).await;
        assert_eq!(store.sum_amount_by_user(5).await.unwrap(), Decimal::ZERO);

        for amount in ["100.10", "0.15", "49.75"] {
            store.insert(new_order(5, amount)).await.unwrap();
        }
        assert_eq!(
            store.sum_amount_by_user(5).await.unwrap(),
            Decimal::from_str("150.00").unwrap()
        );
    }

    #[tokio::test]
    async fn test_delete_by_user_removes_only_that_user() {
        let store = memory_store(2, 2).await;
        // 用户 2 和 4 同在 ds0，验证删除不越界
        store.insert(new_order(2, "10.00")).await.unwrap();
        store.insert(new_order(2, "20.00")).await.unwrap();
        store.insert(new_order(4, "30.00")).await.unwrap();

        let removed = store.delete_by_user(2).await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.list_by_user(2).await.orders.is_empty());
        assert_eq!(store.list_by_user(4).await.orders.len(), 1);

        // 再删一次没有可删的行
        assert_eq!(store.delete_by_user(2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_status_is_compare_and_set() {
        let store = memory_store(2, 2).await;
        let order = store.insert(new_order(3, "88.00")).await.unwrap();

        let first = store
            .update_status(&order, OrderStatus::Pending, OrderStatus::Paid)
            .await
            .unwrap();
        assert!(first);

        // 前置条件已不成立，第二次 CAS 必须失败且状态不变
        let second = store
            .update_status(&order, OrderStatus::Pending, OrderStatus::Paid)
            .await
            .unwrap();
        assert!(!second);

        let current = store.get_by_id(order.order_id).await.unwrap().unwrap();
        assert_eq!(current.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_broken_shard_partial_list_and_hard_fail_aggregate() {
        let store = memory_store(2, 2).await;
        let mut ids = Vec::new();
        for amount in ["10.00", "20.00", "30.00"] {
            ids.push(store.insert(new_order(2, amount)).await.unwrap().order_id);
        }

        // 弄坏 ds0 的 t_order_1
        sqlx::query("DROP TABLE t_order_1")
            .execute(&store.pools[0])
            .await
            .unwrap();

        // 列表是尽力而为：存活表的行照常返回，坏掉的分片被点名
        let scan = store.list_by_user(2).await;
        assert_eq!(
            scan.failed_shards,
            vec![ShardTarget {
                db_index: 0,
                table_index: 1
            }]
        );
        let mut surviving: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| id.rem_euclid(2) == 0)
            .collect();
        surviving.sort();
        let mut got: Vec<i64> = scan.orders.iter().map(|o| o.order_id).collect();
        got.sort();
        assert_eq!(got, surviving);

        // 聚合是强一致口径：同样的故障必须整体失败
        let err = store.sum_amount_by_user(2).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::ShardUnavailable {
                db_index: 0,
                table_index: 1,
                ..
            }
        ));

        // 删除同理
        let err = store.delete_by_user(2).await.unwrap_err();
        assert!(matches!(err, AppError::ShardUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_system_stats_counts_by_status() {
        let store = memory_store(2, 2).await;
        let a = store.insert(new_order(1, "10.00")).await.unwrap();
        let b = store.insert(new_order(2, "20.00")).await.unwrap();
        store.insert(new_order(3, "30.00")).await.unwrap();

        store
            .update_status(&a, OrderStatus::Pending, OrderStatus::Paid)
            .await
            .unwrap();
        store
            .update_status(&b, OrderStatus::Pending, OrderStatus::Cancelled)
            .await
            .unwrap();

        let stats = store.system_stats().await.unwrap();
        assert_eq!(
            stats,
            SystemStats {
                total: 3,
                pending: 1,
                paid: 1,
                completed: 0,
                cancelled: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_shard_layout_covers_full_grid() {
        let store = memory_store(2, 2).await;
        store.insert(new_order(1, "10.00")).await.unwrap();

        let layout = store.shard_layout().await.unwrap();
        assert_eq!(layout.len(), 4);
        assert_eq!(layout.iter().map(|s| s.rows).sum::<i64>(), 1);
        // user_id=1 只会落在 ds1
        let hit = layout.iter().find(|s| s.rows == 1).unwrap();
        assert!(hit.shard.starts_with("ds1."));
    }
}
