//! Long tasks
//!
//! Async work with no DOM mutation of its own (a fetch, a timer) is
//! bracketed with `LONG_TASK_START`/`LONG_TASK_END` so the main thread can
//! account for it. Nothing is blocked or serialized.

use std::future::Future;

use wdom_dom::{Document, NodeIndex};

/// Run `future` as a long task of `target`.
///
/// The end marker is sent whatever the future resolves to; a `Result` is
/// passed through untouched.
pub async fn execute<F: Future>(
    document: &mut Document,
    target: NodeIndex,
    future: F,
) -> F::Output {
    document.begin_long_task(target);
    let output = future.await;
    document.end_long_task(target);
    output
}

/// Call `task` and run the future it returns as a long task of `target`
pub async fn wrap<F, Fut>(document: &mut Document, target: NodeIndex, task: F) -> Fut::Output
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    execute(document, target, task()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use wdom_dom::{MutationKind, TransferMessage};

    fn observed() -> (Document, mpsc::Receiver<TransferMessage>) {
        let (tx, rx) = mpsc::channel::<TransferMessage>();
        let mut doc = Document::new(tx);
        doc.observe();
        (doc, rx)
    }

    #[test]
    fn test_execute_brackets_success() {
        let (mut doc, rx) = observed();
        let target = doc.document_element();
        let value = smol::block_on(execute(&mut doc, target, async { 7 }));
        assert_eq!(value, 7);

        doc.drain_pending_mutations();
        let message = rx.try_recv().unwrap();
        let tuples = message.mutation_tuples();
        assert_eq!(tuples[0], &[MutationKind::LongTaskStart as u16, target.get() as u16]);
        assert_eq!(tuples[1], &[MutationKind::LongTaskEnd as u16, target.get() as u16]);
    }

    #[test]
    fn test_wrap_passes_failures_through() {
        let (mut doc, rx) = observed();
        let target = doc.body();
        let result: Result<(), String> =
            smol::block_on(wrap(&mut doc, target, || async { Err("offline".to_string()) }));
        assert_eq!(result, Err("offline".to_string()));

        doc.drain_pending_mutations();
        let message = rx.try_recv().unwrap();
        assert_eq!(message.mutation_tuples().len(), 2);
        assert_eq!(message.mutation_tuples()[1][0], MutationKind::LongTaskEnd as u16);
    }
}
