use tracing::warn;

use crate::policy::{RetryPolicy, Sleeper};

/// Run `op` until it succeeds or the policy's attempts are spent, sleeping
/// the policy's backoff between tries. Returns the last error when every
/// attempt failed.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut op: F,
) -> anyhow::Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= policy.max_attempts {
                    return Err(error);
                }
                warn!(attempt, %error, "attempt failed, backing off");
                sleeper.sleep(policy.delay_for(attempt)).await;
                attempt += 1;
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicU32, Ordering},
        },
        time::Duration,
    };

    use super::*;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait::async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    #[tokio::test]
    async fn success_on_first_attempt_never_sleeps() {
        let sleeper = RecordingSleeper::default();
        let result = with_retries(&policy(), &sleeper, |_| async { Ok::<_, anyhow::Error>(7) })
            .await
            .unwrap();
        assert_eq!(result, 7);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn two_failures_then_success_backs_off_linearly() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result = with_retries(&policy(), &sleeper, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    anyhow::bail!("boom {attempt}")
                }
                Ok("reply")
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "reply");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*sleeper.slept.lock().unwrap(), vec![
            Duration::from_millis(2_000),
            Duration::from_millis(4_000),
        ]);
    }

    #[tokio::test]
    async fn exhausted_attempts_return_the_last_error() {
        let sleeper = RecordingSleeper::default();

        let result: anyhow::Result<()> = with_retries(&policy(), &sleeper, |attempt| async move {
            anyhow::bail!("failure {attempt}")
        })
        .await;

        let error = result.unwrap_err();
        assert_eq!(error.to_string(), "failure 3");
        // No sleep after the final attempt.
        assert_eq!(sleeper.slept.lock().unwrap().len(), 2);
    }
}
