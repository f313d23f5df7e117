//! Pickup token issuance
//!
//! 令牌要足够短，能在取餐窗口念出来；碰撞概率由时间段 + 随机段
//! 压低，真正的全局唯一由订单表的 `uniq_order_token` 索引兜底，
//! 持久化撞索引时换新随机数重试一次。

/// Token prefix ("Canteen Token")
const TOKEN_PREFIX: &str = "CT";

/// Issue a fresh pickup token: `CT` + 4 time-derived digits + 3 random digits.
pub fn issue_token() -> String {
    let (ts, rand_part) = shared::util::token_segments();
    format!("{TOKEN_PREFIX}{ts:04}{rand_part:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_format() {
        let token = issue_token();
        assert_eq!(token.len(), 9);
        assert!(token.starts_with("CT"));
        assert!(token[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_tokens_vary() {
        // 同一毫秒内时间段相同，随机段让重复率远低于 1/1000；
        // 200 次采样全部相同几乎不可能
        let tokens: std::collections::HashSet<String> = (0..200).map(|_| issue_token()).collect();
        assert!(tokens.len() > 1);
    }
}
