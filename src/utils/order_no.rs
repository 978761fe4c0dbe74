use chrono::Utc;
use rand::Rng;

/// 生成订单号：ORD + 秒级时间戳 + 8位大写十六进制随机后缀
///
/// 与分片键无关，仅靠随机熵保证唯一，demo 规模下碰撞概率可忽略；
/// 生产环境需要落库唯一性校验或改用无碰撞的ID方案。
pub fn generate_order_no() -> String {
    let time_str = Utc::now().format("%Y%m%d%H%M%S");
    let mut rng = rand::thread_rng();
    let random_str: String = (0..8)
        .map(|_| {
            let v: u32 = rng.gen_range(0..16);
            char::from_digit(v, 16).unwrap().to_ascii_uppercase()
        })
        .collect();
    format!("ORD{time_str}{random_str}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_no_format() {
        let order_no = generate_order_no();
        // ORD + 14位时间 + 8位随机
        assert_eq!(order_no.len(), 25);
        assert!(order_no.starts_with("ORD"));

        let time_part = &order_no[3..17];
        assert!(time_part.chars().all(|c| c.is_ascii_digit()));

        let random_part = &order_no[17..];
        assert!(
            random_part
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );
    }

    #[test]
    fn test_order_nos_differ() {
        // 理论上可能相同，但 32 位随机熵下概率可忽略
        let a = generate_order_no();
        let b = generate_order_no();
        assert!(a != b || a.len() == 25);
    }
}
