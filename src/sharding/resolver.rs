use crate::error::{AppError, AppResult};
use std::fmt;

/// 一条记录落在的物理分片：(库号, 表号)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardTarget {
    pub db_index: usize,
    pub table_index: usize,
}

impl fmt::Display for ShardTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ds{}.t_order_{}", self.db_index, self.table_index)
    }
}

/// 分片键解析器
///
/// 分库规则 user_id % db_count，分表规则 order_id % table_count。
/// 纯函数，无副作用；记录一旦落盘，(库号, 表号) 不再重算。
/// 分片数量变更时重新构造一个 resolver，而不是原地修改。
#[derive(Debug, Clone)]
pub struct ShardKeyResolver {
    db_count: usize,
    table_count: usize,
}

impl ShardKeyResolver {
    pub fn new(db_count: usize, table_count: usize) -> AppResult<Self> {
        if db_count == 0 {
            return Err(AppError::ConfigError("分库数量必须大于 0".to_string()));
        }
        if table_count == 0 {
            return Err(AppError::ConfigError("分表数量必须大于 0".to_string()));
        }
        Ok(Self {
            db_count,
            table_count,
        })
    }

    pub fn db_count(&self) -> usize {
        self.db_count
    }

    pub fn table_count(&self) -> usize {
        self.table_count
    }

    /// 分库：user_id % db_count。rem_euclid 保证负数键也落在合法区间。
    pub fn db_index(&self, user_id: i64) -> usize {
        user_id.rem_euclid(self.db_count as i64) as usize
    }

    /// 分表：order_id % table_count
    pub fn table_index(&self, order_id: i64) -> usize {
        order_id.rem_euclid(self.table_count as i64) as usize
    }

    pub fn resolve(&self, user_id: i64, order_id: i64) -> ShardTarget {
        ShardTarget {
            db_index: self.db_index(user_id),
            table_index: self.table_index(order_id),
        }
    }
}
