/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Custom epoch for the pickup token's time segment: 2024-01-01 00:00:00 UTC
const TOKEN_EPOCH_MS: i64 = 1_704_067_200_000;

/// Generate the two numeric segments of a pickup token.
///
/// Layout:
///   - 4 digits: milliseconds since the custom epoch, folded mod 10000
///   - 3 digits: random (thread rng is cryptographically seeded)
///
/// Short enough to read aloud at a pickup counter; the unique index on
/// the order table is what actually guarantees global uniqueness.
pub fn token_segments() -> (u32, u32) {
    use rand::Rng;
    let ts = ((now_millis() - TOKEN_EPOCH_MS).max(0) % 10_000) as u32;
    let rand_part: u32 = rand::thread_rng().gen_range(0..1000);
    (ts, rand_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_recent() {
        // 2024-01-01 as a floor; anything earlier means a broken clock source
        assert!(now_millis() > TOKEN_EPOCH_MS);
    }

    #[test]
    fn test_token_segments_in_range() {
        for _ in 0..1000 {
            let (ts, rand_part) = token_segments();
            assert!(ts < 10_000);
            assert!(rand_part < 1000);
        }
    }
}
