//! Free tier and unlock pricing

/// Subscriptions a user may track before paying
pub const FREE_SUBSCRIPTION_LIMIT: i64 = 3;

/// One-time unlock price in cents ($9.97)
pub const UNLOCK_PRICE_CENTS: i64 = 997;

/// Currency of the unlock payment
pub const UNLOCK_CURRENCY: &str = "usd";

/// True when an unpaid user has used up the free tier
pub fn limit_reached(has_paid: bool, subscription_count: i64) -> bool {
    !has_paid && subscription_count >= FREE_SUBSCRIPTION_LIMIT
}
