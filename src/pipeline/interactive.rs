//! Interactive sessions
//!
//! One machine runs with its input computed on demand by a policy that reads
//! shared state, while a concurrent consumer groups the machine's outputs into
//! fixed-size tuples and folds them into that state. Before the policy runs,
//! the input side waits until the consumer has caught up with every output
//! emitted so far, so the policy always sees the effect of prior outputs.

use async_trait::async_trait;
use log::{debug, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot, watch};

use crate::pipeline::errors::PipelineError;
use crate::vm::{InputSource, OutputSink, Program, VMConfig, VM};

/// A single machine driven by a control policy
#[derive(Debug, Clone)]
pub struct Interactive {
    program: Program,
    config: VMConfig,
    arity: usize,
}

impl Interactive {
    /// `arity` is the number of consecutive outputs that form one tuple
    pub fn new(program: Program, config: VMConfig, arity: usize) -> Self {
        Self {
            program,
            config,
            arity,
        }
    }

    /// Run the machine to completion and return the final state
    ///
    /// `policy` is called once per Input instruction. `fold` is called once per
    /// complete output tuple, in emission order.
    pub async fn run<S, P, F>(&self, state: S, policy: P, fold: F) -> Result<S, PipelineError>
    where
        S: Send + 'static,
        P: FnMut(&S) -> i64 + Send + 'static,
        F: FnMut(&mut S, &[i64]) + Send + 'static,
    {
        if self.arity == 0 {
            return Err(PipelineError::InvalidArity);
        }

        let state = Arc::new(Mutex::new(state));
        let emitted = Arc::new(AtomicUsize::new(0));
        let (consumed_tx, consumed_rx) = watch::channel(0usize);
        let (output_tx, output_rx) = mpsc::unbounded_channel::<i64>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let mut input = PolicyInput {
            state: Arc::clone(&state),
            policy,
            consumed: consumed_rx,
            emitted: Arc::clone(&emitted),
        };
        let mut output = CountingSink {
            outputs: output_tx,
            emitted,
        };
        let mut vm = VM::new(self.program.clone(), self.config);
        let engine = tokio::spawn(async move { vm.run(&mut input, &mut output).await });

        let consumer = tokio::spawn(fold_outputs(
            output_rx,
            Arc::clone(&state),
            self.arity,
            fold,
            consumed_tx,
            shutdown_rx,
        ));

        let outcome = engine.await;
        let _ = shutdown_tx.send(());
        consumer.await?;
        outcome?.map_err(|source| PipelineError::Machine { index: 0, source })?;

        let state = Arc::try_unwrap(state).map_err(|_| PipelineError::StateInUse)?;
        Ok(state.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Input that waits for the consumer to catch up, then asks the policy
struct PolicyInput<S, P> {
    state: Arc<Mutex<S>>,
    policy: P,
    consumed: watch::Receiver<usize>,
    emitted: Arc<AtomicUsize>,
}

#[async_trait]
impl<S, P> InputSource for PolicyInput<S, P>
where
    S: Send,
    P: FnMut(&S) -> i64 + Send,
{
    async fn next_input(&mut self) -> Option<i64> {
        let target = self.emitted.load(Ordering::SeqCst);
        let caught_up = self
            .consumed
            .wait_for(|consumed| *consumed >= target)
            .await
            .is_ok();
        if !caught_up {
            debug!("Output consumer gone before it caught up; no further input");
            return None;
        }

        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Some((self.policy)(&*state))
    }
}

/// Output sink that counts what it forwards
struct CountingSink {
    outputs: mpsc::UnboundedSender<i64>,
    emitted: Arc<AtomicUsize>,
}

#[async_trait]
impl OutputSink for CountingSink {
    async fn emit(&mut self, value: i64) {
        self.emitted.fetch_add(1, Ordering::SeqCst);
        self.outputs.emit(value).await;
    }
}

async fn fold_outputs<S, F>(
    mut outputs: mpsc::UnboundedReceiver<i64>,
    state: Arc<Mutex<S>>,
    arity: usize,
    mut fold: F,
    consumed: watch::Sender<usize>,
    mut shutdown: oneshot::Receiver<()>,
) where
    F: FnMut(&mut S, &[i64]),
{
    let mut group = Vec::with_capacity(arity);
    loop {
        tokio::select! {
            biased;
            value = outputs.recv() => match value {
                Some(value) => {
                    group.push(value);
                    if group.len() == arity {
                        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                        fold(&mut *state, group.as_slice());
                        group.clear();
                    }
                    consumed.send_modify(|count| *count += 1);
                }
                None => break,
            },
            _ = &mut shutdown => {
                debug!("Output consumer cancelled");
                break;
            }
        }
    }

    if !group.is_empty() {
        warn!(
            "Discarding {} trailing outputs that do not form a group of {}",
            group.len(),
            arity
        );
    }
}
