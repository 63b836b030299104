//! 幅を制限したファンアウト
//!
//! 入力を `width` 件ずつのグループに分け、グループ内は並行に、グループ間は順番に実行します。
//! 次のグループは前のグループが全件 settle してから始まります。
//! 個々の失敗は `DispatchOutcome::failed` として集めるだけで、全体は中断しません。

use std::future::Future;

use futures::future::join_all;

use crate::domain::{BatchResult, DispatchOutcome};

pub const DEFAULT_BATCH_WIDTH: usize = 5;

pub async fn send_batch<T, F, Fut>(items: Vec<T>, width: usize, send: F) -> BatchResult
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = DispatchOutcome>,
{
    let width = width.max(1);
    let mut result = BatchResult::new();
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        let group: Vec<Fut> = items.by_ref().take(width).map(&send).collect();
        for outcome in join_all(group).await {
            result.push(outcome);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FailureKind;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Start(usize),
        Done(usize),
    }

    #[tokio::test]
    async fn twelve_items_run_in_groups_of_five_five_two() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let result = send_batch((0..12).collect(), 5, |i: usize| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(Event::Start(i));
                // 後のアイテムほど早く終わるようにして、グループ内の順序に依存しないことを確かめる
                tokio::time::sleep(Duration::from_millis((12 - i) as u64)).await;
                log.lock().unwrap().push(Event::Done(i));
                DispatchOutcome::sent(i.to_string(), format!("m{i}"))
            }
        })
        .await;

        assert_eq!(result.sent.len(), 12);

        let log = log.lock().unwrap().clone();
        let position = |e: Event| log.iter().position(|x| *x == e).unwrap();

        // group boundaries: every item of a group settles before the next group starts
        for (group, next) in [(0..5, 5..10), (5..10, 10..12)] {
            let last_done = group.clone().map(|i| position(Event::Done(i))).max().unwrap();
            let first_start = next.map(|i| position(Event::Start(i))).min().unwrap();
            assert!(last_done < first_start, "group {group:?} overlapped the next");
        }

        // items inside a group start before any of them finishes
        let starts: Vec<usize> = (0..5).map(|i| position(Event::Start(i))).collect();
        let first_done = (0..5).map(|i| position(Event::Done(i))).min().unwrap();
        assert!(starts.iter().all(|s| *s < first_done));
    }

    #[tokio::test]
    async fn one_failure_does_not_block_the_rest() {
        let result = send_batch(vec!["a", "bad", "c"], 5, |who| async move {
            if who == "bad" {
                DispatchOutcome::failed(who, FailureKind::Rejected, "550")
            } else {
                DispatchOutcome::sent(who, "ok")
            }
        })
        .await;

        assert_eq!(result.sent.len(), 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].recipient_id(), "bad");
    }

    #[tokio::test]
    async fn empty_input_is_empty_result() {
        let result = send_batch(Vec::<u8>::new(), 5, |_| async {
            DispatchOutcome::sent("x", "y")
        })
        .await;
        assert_eq!(result.total(), 0);
    }
}
