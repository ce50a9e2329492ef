use std::sync::{Arc, OnceLock};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes tests that touch process environment variables.
pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    dotenvy::dotenv().ok();

    std::env::set_var("PROVIA_ENV", "test");
    std::env::set_var("PROVIA_STRICT_CONFIG", "0");
    std::env::set_var("SECRET_KEY", "test-secret");
    std::env::set_var("REDIS_HOST", "127.0.0.1");
    std::env::set_var("REDIS_PORT", "6379");
    std::env::set_var("REDIS_DB", "1");
    std::env::remove_var("REDIS_PASSWORD");
    std::env::remove_var("DATABASE_URL");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::remove_var("S3_ENDPOINT");
    std::env::remove_var("S3_ACCESS_KEY");
    std::env::remove_var("S3_SECRET_KEY");
    std::env::set_var("AWS_EC2_METADATA_DISABLED", "true");
}
