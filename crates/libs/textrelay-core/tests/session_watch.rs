use std::sync::Arc;
use std::time::Duration;
use textrelay_core::{
    CorrelationKey, DispatchState, NanpPolicy, Outcome, OutcomeHandler, RelayError, Session,
    Transport, TransportProvider,
};

/// Reports `Sent` then `DeliveryConfirmed` from a background task.
struct Echo {
    handler: Arc<dyn OutcomeHandler>,
}

impl Transport for Echo {
    fn send(&self, _address: &str, _body: &str, key: CorrelationKey) -> Result<(), RelayError> {
        let handler = self.handler.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            handler.on_outcome(key, Outcome::Sent);
            tokio::time::sleep(Duration::from_millis(5)).await;
            handler.on_outcome(key, Outcome::DeliveryConfirmed);
        });
        Ok(())
    }
}

struct EchoProvider;

impl TransportProvider for EchoProvider {
    fn acquire(&self, handler: Arc<dyn OutcomeHandler>) -> Option<Arc<dyn Transport>> {
        Some(Arc::new(Echo { handler }))
    }
}

#[tokio::test]
async fn watcher_sees_batch_settle() {
    let mut session = Session::new(Arc::new(EchoProvider), Arc::new(NanpPolicy));
    session.set_message("running late");
    session.update_recipient(0, "5551234567");
    session.add_recipient();
    session.update_recipient(1, "5559876543");
    let mut watch = session.subscribe();

    session.dispatch().expect("dispatch");

    let settled = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = watch.snapshot();
            if snapshot.generation.is_some() && snapshot.is_settled() {
                return snapshot;
            }
            watch.changed().await.expect("session dropped");
        }
    })
    .await
    .expect("batch did not settle");

    assert!(settled
        .recipients
        .iter()
        .all(|recipient| recipient.delivery == Some(DispatchState::Delivered)));
}

#[tokio::test]
async fn watcher_wakes_on_edits_and_closes_with_session() {
    let mut session = Session::new(Arc::new(EchoProvider), Arc::new(NanpPolicy));
    let mut watch = session.subscribe();
    watch.snapshot();

    session.update_recipient(0, "555");
    watch.changed().await.expect("edit wakes watcher");
    assert_eq!(watch.snapshot().recipients[0].entry.raw_input(), "555");

    drop(session);
    assert_eq!(watch.changed().await, Err(RelayError::Closed));
}
