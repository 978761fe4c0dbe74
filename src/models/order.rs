use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::str::FromStr;
use utoipa::ToSchema;

/// 订单状态机：Pending → Paid → Completed，Cancelled 只能从 Pending 进入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Pending,
    Paid,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// 落库的整数编码：1=待支付 2=已支付 3=已完成 4=已取消
    pub fn as_i64(self) -> i64 {
        match self {
            OrderStatus::Pending => 1,
            OrderStatus::Paid => 2,
            OrderStatus::Completed => 3,
            OrderStatus::Cancelled => 4,
        }
    }

    pub fn from_i64(code: i64) -> Option<Self> {
        match code {
            1 => Some(OrderStatus::Pending),
            2 => Some(OrderStatus::Paid),
            3 => Some(OrderStatus::Completed),
            4 => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// 支付，只允许待支付状态
    pub fn pay(self) -> Option<Self> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Paid),
            _ => None,
        }
    }

    /// 完成，只允许已支付状态
    pub fn complete(self) -> Option<Self> {
        match self {
            OrderStatus::Paid => Some(OrderStatus::Completed),
            _ => None,
        }
    }

    /// 取消，只允许待支付状态
    pub fn cancel(self) -> Option<Self> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// 订单实体，逻辑表 t_order，物理表 t_order_0, t_order_1, ...
///
/// order_id 是分表键，user_id 是分库键，order_no 是对外的业务唯一标识
/// （与分片无关）。create_time/update_time 由 store 在写入时填充。
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Order {
    pub order_id: i64,
    pub order_no: String,
    pub user_id: i64,
    pub product_name: String,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

// 金额以 TEXT 存储走 Decimal 精确解析，状态以整数编码存储，
// 所以不走 derive 而是手写行映射。
impl<'r> sqlx::FromRow<'r, SqliteRow> for Order {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let amount_text: String = row.try_get("amount")?;
        let amount = Decimal::from_str(&amount_text).map_err(|e| sqlx::Error::ColumnDecode {
            index: "amount".to_string(),
            source: Box::new(e),
        })?;

        let status_code: i64 = row.try_get("status")?;
        let status = OrderStatus::from_i64(status_code).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: format!("未知订单状态编码: {status_code}").into(),
        })?;

        Ok(Order {
            order_id: row.try_get("order_id")?,
            order_no: row.try_get("order_no")?,
            user_id: row.try_get("user_id")?,
            product_name: row.try_get("product_name")?,
            amount,
            status,
            create_time: row.try_get("create_time")?,
            update_time: row.try_get("update_time")?,
        })
    }
}

/// 待写入的新订单，order_id 与时间戳由 store 在插入时分配
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_no: String,
    pub user_id: i64,
    pub product_name: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub product_name: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// 用户订单列表。partial=true 表示广播时部分分片不可用，
/// 结果是尽力而为的不完整集合，failed_shards 列出失败的分片。
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub data: Vec<Order>,
    pub total: i64,
    pub partial: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_shards: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SystemStats {
    pub total: i64,
    pub pending: i64,
    pub paid: i64,
    pub completed: i64,
    pub cancelled: i64,
}

/// 调试用：单个物理分片的行数
#[derive(Debug, Serialize, ToSchema)]
pub struct ShardRowCount {
    pub shard: String,
    pub rows: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from_i64(status.as_i64()), Some(status));
        }
        assert_eq!(OrderStatus::from_i64(0), None);
        assert_eq!(OrderStatus::from_i64(5), None);
    }

    #[test]
    fn test_pay_only_from_pending() {
        assert_eq!(OrderStatus::Pending.pay(), Some(OrderStatus::Paid));
        assert_eq!(OrderStatus::Paid.pay(), None);
        assert_eq!(OrderStatus::Completed.pay(), None);
        assert_eq!(OrderStatus::Cancelled.pay(), None);
    }

    #[test]
    fn test_complete_only_from_paid() {
        assert_eq!(OrderStatus::Paid.complete(), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::Pending.complete(), None);
        assert_eq!(OrderStatus::Completed.complete(), None);
        assert_eq!(OrderStatus::Cancelled.complete(), None);
    }

    #[test]
    fn test_cancel_only_from_pending() {
        assert_eq!(OrderStatus::Pending.cancel(), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::Paid.cancel(), None);
        assert_eq!(OrderStatus::Completed.cancel(), None);
        assert_eq!(OrderStatus::Cancelled.cancel(), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
    }
}
