//! Cancellation plumbing for remote calls.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::MediaError;

/// Race `fut` against `cancel`.
///
/// An already-cancelled token short-circuits without polling `fut`, so a
/// cancelled reconciliation issues no further remote calls.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, MediaError>
where
    F: Future<Output = Result<T, MediaError>>,
{
    if cancel.is_cancelled() {
        return Err(MediaError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MediaError::Cancelled),
        res = fut => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn passes_through_when_not_cancelled() {
        let token = CancellationToken::new();
        let out = cancellable(&token, async { Ok::<_, MediaError>(7) }).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn pre_cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let out = cancellable(&token, async { Ok::<_, MediaError>(7) }).await;
        assert!(matches!(out, Err(MediaError::Cancelled)));
    }

    #[tokio::test]
    async fn cancel_aborts_in_flight_call() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let out = cancellable(&token, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, MediaError>(())
        })
        .await;
        assert!(matches!(out, Err(MediaError::Cancelled)));
    }
}
