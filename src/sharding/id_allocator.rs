use std::sync::atomic::{AtomicI64, Ordering};

/// 订单ID分配器
///
/// 各物理表各自 AUTOINCREMENT 无法保证跨分片全局唯一，订单ID又是分表键，
/// 因此改为进程内集中分配：毫秒时间戳左移 16 位作为起点，之后单调递增。
/// 单写入进程内全局唯一；多写入实例部署需要换成雪花ID之类的分布式方案。
#[derive(Debug)]
pub struct OrderIdAllocator {
    next: AtomicI64,
}

impl OrderIdAllocator {
    pub fn new() -> Self {
        let seed = chrono::Utc::now().timestamp_millis() << 16;
        Self {
            next: AtomicI64::new(seed),
        }
    }

    pub fn next_id(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for OrderIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_positive_and_increasing() {
        let allocator = OrderIdAllocator::new();
        let a = allocator.next_id();
        let b = allocator.next_id();
        assert!(a > 0);
        assert_eq!(b, a + 1);
    }

    #[test]
    fn test_ids_unique_across_threads() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let allocator = Arc::new(OrderIdAllocator::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let allocator = allocator.clone();
            handles.push(std::thread::spawn(move || {
                (0..1000).map(|_| allocator.next_id()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate order id {id}");
            }
        }
    }
}
