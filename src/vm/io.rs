//! Machine I/O
//!
//! An engine reads from an [`InputSource`] and writes to an [`OutputSink`].
//! Both are async so that channel-backed implementations can suspend the
//! engine; queue and vector implementations complete immediately.

use async_trait::async_trait;
use log::debug;
use std::collections::VecDeque;
use tokio::sync::{mpsc, watch};

/// Supplies values to Input instructions
#[async_trait]
pub trait InputSource: Send {
    /// Next value for the machine, or `None` when no value can ever arrive
    async fn next_input(&mut self) -> Option<i64>;
}

/// Receives values from Output instructions
#[async_trait]
pub trait OutputSink: Send {
    /// Deliver one value. Delivery never fails; a sink whose reader has gone
    /// away drops the value.
    async fn emit(&mut self, value: i64);
}

#[async_trait]
impl InputSource for VecDeque<i64> {
    async fn next_input(&mut self) -> Option<i64> {
        self.pop_front()
    }
}

#[async_trait]
impl InputSource for mpsc::UnboundedReceiver<i64> {
    async fn next_input(&mut self) -> Option<i64> {
        self.recv().await
    }
}

#[async_trait]
impl InputSource for mpsc::Receiver<i64> {
    async fn next_input(&mut self) -> Option<i64> {
        self.recv().await
    }
}

/// Input computed on demand by a closure, once per Input instruction
pub struct InputFn<F>(pub F);

#[async_trait]
impl<F> InputSource for InputFn<F>
where
    F: FnMut() -> i64 + Send,
{
    async fn next_input(&mut self) -> Option<i64> {
        Some((self.0)())
    }
}

#[async_trait]
impl OutputSink for Vec<i64> {
    async fn emit(&mut self, value: i64) {
        self.push(value);
    }
}

#[async_trait]
impl OutputSink for mpsc::UnboundedSender<i64> {
    async fn emit(&mut self, value: i64) {
        if self.send(value).is_err() {
            debug!("Output {} dropped: receiver closed", value);
        }
    }
}

#[async_trait]
impl OutputSink for mpsc::Sender<i64> {
    async fn emit(&mut self, value: i64) {
        if self.send(value).await.is_err() {
            debug!("Output {} dropped: receiver closed", value);
        }
    }
}

/// Single-slot buffer where every write replaces the previous value
///
/// Readers obtained through [`Mailbox::subscribe`] observe the latest value
/// without blocking, even after the writer is gone.
#[derive(Debug)]
pub struct Mailbox {
    slot: watch::Sender<Option<i64>>,
}

impl Mailbox {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    pub fn post(&self, value: i64) {
        self.slot.send_replace(Some(value));
    }

    pub fn latest(&self) -> Option<i64> {
        *self.slot.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<i64>> {
        self.slot.subscribe()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputSink for Mailbox {
    async fn emit(&mut self, value: i64) {
        self.post(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_input_exhausts() {
        let mut input: VecDeque<i64> = VecDeque::from(vec![1, 2]);
        assert_eq!(input.next_input().await, Some(1));
        assert_eq!(input.next_input().await, Some(2));
        assert_eq!(input.next_input().await, None);
    }

    #[tokio::test]
    async fn test_closure_input_is_lazy() {
        let mut calls = 0;
        let mut input = InputFn(move || {
            calls += 1;
            calls * 10
        });
        assert_eq!(input.next_input().await, Some(10));
        assert_eq!(input.next_input().await, Some(20));
    }

    #[tokio::test]
    async fn test_channel_closes_when_producer_dropped() {
        let (mut tx, mut rx) = mpsc::unbounded_channel::<i64>();
        tx.emit(5).await;
        drop(tx);
        assert_eq!(rx.next_input().await, Some(5));
        assert_eq!(rx.next_input().await, None);
    }

    #[tokio::test]
    async fn test_emit_to_closed_channel_is_dropped() {
        let (mut tx, rx) = mpsc::unbounded_channel::<i64>();
        drop(rx);
        tx.emit(1).await;

        let (mut bounded_tx, bounded_rx) = mpsc::channel::<i64>(1);
        drop(bounded_rx);
        bounded_tx.emit(1).await;
    }

    #[tokio::test]
    async fn test_mailbox_overwrites() {
        let mut mailbox = Mailbox::new();
        let reader = mailbox.subscribe();
        assert_eq!(mailbox.latest(), None);
        mailbox.emit(1).await;
        mailbox.emit(2).await;
        assert_eq!(mailbox.latest(), Some(2));
        drop(mailbox);
        assert_eq!(*reader.borrow(), Some(2));
    }
}
