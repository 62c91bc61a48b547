use std::fmt::Write as _;
use std::time::Duration;
use textrelay_core::{SessionSnapshot, SessionWatch};

/// Waits until every bound recipient is delivered or failed, or `wait` runs out.
///
/// Returns the last snapshot seen either way.
pub async fn wait_for_settle(watch: &mut SessionWatch, wait: Duration) -> SessionSnapshot {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let snapshot = watch.snapshot();
        if snapshot.is_settled() {
            return snapshot;
        }
        match tokio::time::timeout_at(deadline, watch.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::warn!("stopped waiting for outcomes: {err}");
                return snapshot;
            }
            Err(_) => {
                log::info!("gave up waiting for outcomes after {}ms", wait.as_millis());
                return watch.snapshot();
            }
        }
    }
}

/// Plain-text table, one line per recipient.
pub fn render_text(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    if let Some(generation) = snapshot.generation {
        let _ = writeln!(out, "batch g{generation}");
    }
    for (index, recipient) in snapshot.recipients.iter().enumerate() {
        let entry = &recipient.entry;
        let status = match &recipient.delivery {
            Some(state) => state.label(),
            None if entry.is_dispatchable() => "not sent".to_owned(),
            None => entry.validation_message().to_owned(),
        };
        let _ = writeln!(out, "{:>3}  {:<18} {status}", index + 1, entry.raw_input());
    }
    out
}

/// Validation problems, one per offending entry.
pub fn problems(snapshot: &SessionSnapshot) -> Vec<String> {
    let mut problems: Vec<String> = snapshot
        .recipients
        .iter()
        .enumerate()
        .filter(|(_, recipient)| !recipient.entry.is_dispatchable())
        .map(|(index, recipient)| {
            format!(
                "recipient {} ({:?}): {}",
                index + 1,
                recipient.entry.raw_input(),
                recipient.entry.validation_message()
            )
        })
        .collect();
    if snapshot.message.trim().is_empty() {
        problems.insert(0, "message cannot be empty".to_owned());
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use textrelay_core::{NanpPolicy, Session, Unavailable};

    #[test]
    fn text_report_shows_formatted_input_and_state() {
        let mut session = Session::new(Arc::new(Unavailable), Arc::new(NanpPolicy));
        session.set_message("hi");
        session.update_recipient(0, "5551234567");
        session.format_recipient(0);
        session.dispatch().expect("dispatch");

        let text = render_text(&session.snapshot());
        assert!(text.starts_with("batch g"));
        assert!(text.contains("(555) 123-4567"));
        assert!(text.contains("failed: no transport available"));
    }

    #[test]
    fn problems_name_each_bad_entry() {
        let mut session = Session::new(Arc::new(Unavailable), Arc::new(NanpPolicy));
        session.update_recipient(0, "12");
        session.add_recipient();

        let problems = problems(&session.snapshot());
        assert_eq!(
            problems,
            vec![
                "message cannot be empty".to_owned(),
                "recipient 1 (\"12\"): invalid recipient".to_owned(),
                "recipient 2 (\"\"): cannot be empty".to_owned(),
            ]
        );
    }
}
