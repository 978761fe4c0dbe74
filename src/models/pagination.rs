//! 分页相关的数据结构

use serde::Serialize;
use utoipa::ToSchema;

/// 分页参数，page 从 0 开始。size 夹在 [1, 100]，page 夹到非负。
#[derive(Debug, Clone, Copy)]
pub struct PageParams {
    pub page: i64,
    pub size: i64,
}

impl PageParams {
    pub fn new(page: Option<i64>, size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(0).max(0),
            size: size.unwrap_or(10).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        // page 只有下界约束，极大页码的乘法必须饱和而不是溢出
        self.page.saturating_mul(self.size)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[aliases(PaginatedOrderResponse = PaginatedResponse<crate::models::Order>)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
    pub partial: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_shards: Vec<String>,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: i64, page_size: i64, total: i64) -> Self {
        let total_pages = (total + page_size - 1) / page_size;
        Self {
            data,
            page,
            page_size,
            total,
            total_pages,
            partial: false,
            failed_shards: Vec::new(),
        }
    }

    /// 标记广播期间失败的分片；非空即认为结果不完整
    pub fn with_failed_shards(mut self, failed_shards: Vec<String>) -> Self {
        self.partial = !failed_shards.is_empty();
        self.failed_shards = failed_shards;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_defaults() {
        let params = PageParams::new(None, None);
        assert_eq!(params.page, 0);
        assert_eq!(params.size, 10);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_page_params_clamped() {
        let params = PageParams::new(Some(-3), Some(0));
        assert_eq!(params.page, 0);
        assert_eq!(params.size, 1);

        let params = PageParams::new(Some(2), Some(1000));
        assert_eq!(params.page, 2);
        assert_eq!(params.size, 100);
        assert_eq!(params.offset(), 200);
    }

    #[test]
    fn test_offset_saturates_on_huge_page() {
        let params = PageParams::new(Some(i64::MAX), Some(100));
        assert_eq!(params.offset(), i64::MAX);
    }

    #[test]
    fn test_total_pages() {
        let page: PaginatedResponse<crate::models::Order> =
            PaginatedResponse::new(Vec::new(), 0, 10, 3);
        assert_eq!(page.total_pages, 1);

        let page: PaginatedResponse<crate::models::Order> =
            PaginatedResponse::new(Vec::new(), 0, 10, 21);
        assert_eq!(page.total_pages, 3);
    }
}
