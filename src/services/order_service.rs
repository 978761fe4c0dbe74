use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::store::ShardedStore;
use crate::utils::generate_order_no;
use rust_decimal::Decimal;

#[derive(Clone)]
pub struct OrderService {
    store: ShardedStore,
}

impl OrderService {
    pub fn new(store: ShardedStore) -> Self {
        Self { store }
    }

    pub async fn create_order(
        &self,
        user_id: i64,
        product_name: &str,
        amount: Decimal,
    ) -> AppResult<Order> {
        if product_name.trim().is_empty() {
            return Err(AppError::ValidationError("商品名称不能为空".to_string()));
        }
        if amount < Decimal::ZERO {
            return Err(AppError::ValidationError("订单金额不能为负".to_string()));
        }

        let order = self
            .store
            .insert(NewOrder {
                order_no: generate_order_no(),
                user_id,
                product_name: product_name.trim().to_string(),
                amount,
            })
            .await?;

        log::info!(
            "创建订单成功: order_id={}, user_id={}, order_no={}",
            order.order_id,
            order.user_id,
            order.order_no
        );
        Ok(order)
    }

    /// 批量创建测试订单，每第三单顺手支付掉
    pub async fn batch_create_test_orders(&self) -> AppResult<SystemStats> {
        let products = [
            "iPhone 15",
            "MacBook Pro",
            "iPad Air",
            "AirPods Pro",
            "Apple Watch",
        ];
        let size = 5;
        log::info!("开始批量创建测试订单...");
        for i in 1..=size {
            let user_id = i as i64;
            let product = products[i % products.len()];
            let amount = Decimal::new(5999_00 + (i as i64) * 100_00, 2);

            let order = self.create_order(user_id, product, amount).await?;
            if i % 3 == 0 {
                self.pay_order(order.order_id).await?;
            }
        }
        log::info!("批量创建测试订单完成，共{size}条");
        self.system_stats().await
    }

    pub async fn get_order_by_id(&self, order_id: i64) -> AppResult<Option<Order>> {
        self.store.get_by_id(order_id).await
    }

    pub async fn get_order_by_no(&self, order_no: &str) -> AppResult<Option<Order>> {
        if order_no.trim().is_empty() {
            return Ok(None);
        }
        self.store.get_by_order_no(order_no.trim()).await
    }

    pub async fn get_user_orders(&self, user_id: i64) -> AppResult<OrderList> {
        let scan = self.store.list_by_user(user_id).await;
        Ok(OrderList {
            total: scan.orders.len() as i64,
            partial: !scan.failed_shards.is_empty(),
            failed_shards: scan
                .failed_shards
                .iter()
                .map(|t| t.to_string())
                .collect(),
            data: scan.orders,
        })
    }

    /// 用户订单总览：列表走尽力而为口径，总额聚合失败不拖垮整个响应，
    /// 置空返回；需要强一致总额走专用的 total-amount 接口。
    pub async fn get_user_orders_overview(
        &self,
        user_id: i64,
    ) -> AppResult<(OrderList, Option<Decimal>)> {
        let list = self.get_user_orders(user_id).await?;
        let total_amount = match self.store.sum_amount_by_user(user_id).await {
            Ok(total) => Some(total),
            Err(e) => {
                log::warn!("用户 {user_id} 消费总额聚合失败，总览中置空: {e}");
                None
            }
        };
        Ok((list, total_amount))
    }

    pub async fn get_user_orders_page(
        &self,
        user_id: i64,
        page: Option<i64>,
        size: Option<i64>,
    ) -> AppResult<PaginatedResponse<Order>> {
        let params = PageParams::new(page, size);
        let (data, total, failed_shards) = self.store.list_by_user_paged(user_id, params).await;

        Ok(
            PaginatedResponse::new(data, params.page, params.size, total).with_failed_shards(
                failed_shards.iter().map(|t| t.to_string()).collect(),
            ),
        )
    }

    pub async fn pay_order(&self, order_id: i64) -> AppResult<()> {
        self.transition(order_id, "支付", OrderStatus::pay).await
    }

    pub async fn complete_order(&self, order_id: i64) -> AppResult<()> {
        self.transition(order_id, "完成", OrderStatus::complete).await
    }

    pub async fn cancel_order(&self, order_id: i64) -> AppResult<()> {
        self.transition(order_id, "取消", OrderStatus::cancel).await
    }

    /// 读取-检查-写入：先按当前持久化状态判定转移是否合法，
    /// 写入端再带条件重验一次（见 ShardedStore::update_status）。
    async fn transition(
        &self,
        order_id: i64,
        action: &str,
        next: fn(OrderStatus) -> Option<OrderStatus>,
    ) -> AppResult<()> {
        let order = self
            .store
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("订单不存在: {order_id}")))?;

        let to = next(order.status).ok_or_else(|| {
            AppError::InvalidTransition(format!(
                "订单 {order_id} 当前状态 {:?} 不允许{action}",
                order.status
            ))
        })?;

        let updated = self.store.update_status(&order, order.status, to).await?;
        if !updated {
            // 读取与写入之间状态被并发修改
            return Err(AppError::InvalidTransition(format!(
                "订单 {order_id} 状态已变更，{action}失败"
            )));
        }

        log::info!("订单{action}成功: order_id={order_id}");
        Ok(())
    }

    pub async fn get_user_total_amount(&self, user_id: i64) -> AppResult<Decimal> {
        self.store.sum_amount_by_user(user_id).await
    }

    pub async fn delete_user_orders(&self, user_id: i64) -> AppResult<u64> {
        let count = self.store.delete_by_user(user_id).await?;
        log::info!("删除用户订单: user_id={user_id}, count={count}");
        Ok(count)
    }

    pub async fn system_stats(&self) -> AppResult<SystemStats> {
        self.store.system_stats().await
    }
}
