//! One-time passwords for password reset
//!
//! A six digit code is stored per email address in the ephemeral store. A
//! code is consumed by the first successful check and discarded after
//! `MAX_ATTEMPTS` wrong guesses.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::backend::error::BackendError;
use crate::backend::notifications::store::{namespace, EphemeralStore};

/// Wrong guesses allowed before a code is discarded
pub const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Serialize, Deserialize)]
struct OtpEntry {
    code: String,
    attempts: u32,
}

fn otp_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Generate a fresh code for an email address, replacing any previous one
pub async fn issue_otp(store: &EphemeralStore, email: &str, ttl: Duration) -> Result<String, BackendError> {
    let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
    let entry = OtpEntry {
        code: code.clone(),
        attempts: 0,
    };
    store.put(namespace::PASSWORD_RESET, &otp_key(email), &entry, ttl).await?;
    Ok(code)
}

/// Check a code, consuming it on success
///
/// Each wrong guess is counted with a compare-and-swap on the stored entry, so
/// concurrent guesses cannot share an attempt. The code keeps the expiry it was
/// issued with.
pub async fn verify_otp(store: &EphemeralStore, email: &str, code: &str) -> Result<bool, BackendError> {
    let key = otp_key(email);
    loop {
        let Some(entry) = store.get::<OtpEntry>(namespace::PASSWORD_RESET, &key).await? else {
            return Ok(false);
        };

        if entry.code == code.trim() {
            if store.compare_and_remove(namespace::PASSWORD_RESET, &key, &entry).await? {
                return Ok(true);
            }
            continue;
        }

        let next = OtpEntry {
            code: entry.code.clone(),
            attempts: entry.attempts + 1,
        };
        if next.attempts >= MAX_ATTEMPTS {
            if store.compare_and_remove(namespace::PASSWORD_RESET, &key, &entry).await? {
                tracing::warn!("Too many wrong reset codes for {}, discarding code", key);
                return Ok(false);
            }
        } else if store.compare_and_swap(namespace::PASSWORD_RESET, &key, &entry, &next).await? {
            return Ok(false);
        }
        // Lost a race with another guess; re-read
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::db::memory_pool;

    const TTL: Duration = Duration::from_secs(600);

    #[tokio::test]
    async fn test_code_is_single_use() {
        let store = EphemeralStore::new(memory_pool().await.unwrap());
        let code = issue_otp(&store, "Parent@Example.com", TTL).await.unwrap();
        assert_eq!(code.len(), 6);

        assert!(verify_otp(&store, "parent@example.com", &code).await.unwrap());
        assert!(!verify_otp(&store, "parent@example.com", &code).await.unwrap());
    }

    #[tokio::test]
    async fn test_code_discarded_after_max_attempts() {
        let store = EphemeralStore::new(memory_pool().await.unwrap());
        let code = issue_otp(&store, "parent@example.com", TTL).await.unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for _ in 0..MAX_ATTEMPTS {
            assert!(!verify_otp(&store, "parent@example.com", wrong).await.unwrap());
        }
        assert!(!verify_otp(&store, "parent@example.com", &code).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_wrong_guesses_share_the_attempt_limit() {
        let store = EphemeralStore::new(memory_pool().await.unwrap());
        let code = issue_otp(&store, "parent@example.com", TTL).await.unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        let guesses: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { verify_otp(&store, "parent@example.com", wrong).await })
            })
            .collect();
        for guess in guesses {
            assert!(!guess.await.unwrap().unwrap());
        }

        assert!(!verify_otp(&store, "parent@example.com", &code).await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_guess_does_not_extend_expiry() {
        let store = EphemeralStore::new(memory_pool().await.unwrap());
        let code = issue_otp(&store, "parent@example.com", Duration::from_millis(200)).await.unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!verify_otp(&store, "parent@example.com", wrong).await.unwrap());
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!verify_otp(&store, "parent@example.com", &code).await.unwrap());
    }
}
