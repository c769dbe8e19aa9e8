use async_trait::async_trait;
use shaku::Interface;

/// Enforces minimum spacing between outbound terminal requests. Acquired
/// before every page request and between instruments in a batch.
#[async_trait]
pub trait RateLimiter: Interface {
    async fn acquire(&self);
}
