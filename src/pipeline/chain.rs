//! Amplifier chains
//!
//! A chain runs one machine per phase setting. In the serial form each machine
//! runs to completion and hands its last output to the next. In the feedback
//! form every machine runs as its own task, connected in a ring of channels,
//! and the last machine's output is relayed back to the first.

use futures::future::join_all;
use itertools::Itertools;
use log::{debug, info};
use tokio::sync::{mpsc, oneshot};

use crate::pipeline::errors::PipelineError;
use crate::vm::{Mailbox, Program, VMConfig, VM};

/// A set of identical machines wired output-to-input
#[derive(Debug, Clone)]
pub struct Chain {
    program: Program,
    config: VMConfig,
}

impl Chain {
    pub fn new(program: Program, config: VMConfig) -> Self {
        Self { program, config }
    }

    /// Run each machine in turn with inputs `[phase, signal]`
    ///
    /// Returns the last output of the last machine.
    pub fn run_serial(&self, phases: &[i64], seed: i64) -> Result<i64, PipelineError> {
        if phases.is_empty() {
            return Err(PipelineError::EmptyChain);
        }

        let mut vm = VM::new(self.program.clone(), self.config);
        phases
            .iter()
            .enumerate()
            .try_fold(seed, |signal, (index, &phase)| {
                let outputs = vm
                    .run_to_completion([phase, signal])
                    .map_err(|source| PipelineError::Machine { index, source })?;
                outputs.last().copied().ok_or(PipelineError::NoOutput)
            })
    }

    /// Run the machines concurrently in a ring
    ///
    /// Machine `i` first receives `phases[i]`; the first machine then receives
    /// `seed`. Returns the last value the last machine emitted before every
    /// machine halted.
    pub async fn run_feedback(&self, phases: &[i64], seed: i64) -> Result<i64, PipelineError> {
        if phases.is_empty() {
            return Err(PipelineError::EmptyChain);
        }

        let (senders, receivers): (Vec<_>, Vec<_>) = phases
            .iter()
            .map(|_| mpsc::unbounded_channel::<i64>())
            .unzip();
        for (sender, &phase) in senders.iter().zip(phases) {
            let _ = sender.send(phase);
        }
        let _ = senders[0].send(seed);

        let (terminal_tx, terminal_rx) = mpsc::unbounded_channel::<i64>();
        let mut outputs: Vec<_> = senders.iter().skip(1).cloned().collect();
        outputs.push(terminal_tx);

        let engines: Vec<_> = receivers
            .into_iter()
            .zip(outputs)
            .enumerate()
            .map(|(index, (mut input, mut output))| {
                let mut vm = VM::new(self.program.clone(), self.config);
                tokio::spawn(async move {
                    let result = vm.run(&mut input, &mut output).await;
                    debug!("Machine {} finished: {:?}", index, result);
                    result
                })
            })
            .collect();

        // The relay holds the only sender into the first machine.
        let first = senders[0].clone();
        drop(senders);

        let mailbox = Mailbox::new();
        let latest = mailbox.subscribe();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let relay = tokio::spawn(relay_terminal(terminal_rx, first, mailbox, shutdown_rx));

        let results = join_all(engines).await;
        let _ = shutdown_tx.send(());
        relay.await?;

        for (index, result) in results.into_iter().enumerate() {
            result?.map_err(|source| PipelineError::Machine { index, source })?;
        }

        let signal = (*latest.borrow()).ok_or(PipelineError::NoOutput)?;
        info!("Feedback chain {:?} produced {}", phases, signal);
        Ok(signal)
    }

    /// Try every ordering of `phase_set` in a serial chain
    pub fn max_serial_signal(&self, phase_set: &[i64], seed: i64) -> Result<(Vec<i64>, i64), PipelineError> {
        let mut best: Option<(Vec<i64>, i64)> = None;
        for phases in phase_set.iter().copied().permutations(phase_set.len()) {
            let signal = self.run_serial(&phases, seed)?;
            if best.as_ref().map_or(true, |(_, top)| signal > *top) {
                best = Some((phases, signal));
            }
        }
        best.ok_or(PipelineError::EmptyChain)
    }

    /// Try every ordering of `phase_set` in a feedback chain
    pub async fn max_feedback_signal(
        &self,
        phase_set: &[i64],
        seed: i64,
    ) -> Result<(Vec<i64>, i64), PipelineError> {
        let mut best: Option<(Vec<i64>, i64)> = None;
        for phases in phase_set.iter().copied().permutations(phase_set.len()) {
            let signal = self.run_feedback(&phases, seed).await?;
            if best.as_ref().map_or(true, |(_, top)| signal > *top) {
                best = Some((phases, signal));
            }
        }
        best.ok_or(PipelineError::EmptyChain)
    }
}

/// Forward the last machine's output to the first machine, recording each value
///
/// Buffered values are always drained before the shutdown signal is honoured.
async fn relay_terminal(
    mut terminal: mpsc::UnboundedReceiver<i64>,
    first: mpsc::UnboundedSender<i64>,
    mailbox: Mailbox,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            value = terminal.recv() => match value {
                Some(value) => {
                    mailbox.post(value);
                    if first.send(value).is_err() {
                        debug!("First machine already halted; {} not fed back", value);
                    }
                }
                None => break,
            },
            _ = &mut shutdown => {
                debug!("Relay cancelled");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::VMError;
    use std::time::Duration;
    use tokio::time::timeout;

    const SERIAL: &str = "3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0";

    const FEEDBACK: &str = "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,\
                            27,4,27,1001,28,-1,28,1005,28,6,99,0,0,5";

    fn chain(source: &str) -> Chain {
        Chain::new(source.parse().unwrap(), VMConfig::extended())
    }

    #[test]
    fn test_serial_chain() {
        assert_eq!(chain(SERIAL).run_serial(&[4, 3, 2, 1, 0], 0).unwrap(), 43210);
    }

    #[test]
    fn test_max_serial_signal() {
        let (phases, signal) = chain(SERIAL).max_serial_signal(&[0, 1, 2, 3, 4], 0).unwrap();
        assert_eq!(phases, vec![4, 3, 2, 1, 0]);
        assert_eq!(signal, 43210);
    }

    #[test]
    fn test_empty_chain() {
        assert!(matches!(chain(SERIAL).run_serial(&[], 0), Err(PipelineError::EmptyChain)));
        assert!(matches!(
            chain(SERIAL).max_serial_signal(&[], 0),
            Err(PipelineError::EmptyChain)
        ));
    }

    #[tokio::test]
    async fn test_feedback_chain() {
        let signal = timeout(Duration::from_secs(5), chain(FEEDBACK).run_feedback(&[9, 8, 7, 6, 5], 0))
            .await
            .expect("feedback chain timed out")
            .unwrap();
        assert_eq!(signal, 139629729);
    }

    #[tokio::test]
    async fn test_feedback_chain_reports_failing_machine() {
        // Reads its phase, then asks for a second value nobody will send.
        let chain = chain("3,0,3,0,99");
        let result = timeout(Duration::from_secs(5), chain.run_feedback(&[1, 2], 0))
            .await
            .expect("feedback chain timed out");
        assert!(matches!(
            result,
            Err(PipelineError::Machine {
                index: 1,
                source: VMError::InputExhausted { pc: 2 }
            })
        ));
    }

    #[tokio::test]
    async fn test_single_machine_ring() {
        // Echo the phase, then halt: the only output is the phase itself.
        let chain = Chain::new("3,0,4,0,99".parse().unwrap(), VMConfig::extended());
        let signal = timeout(Duration::from_secs(5), chain.run_feedback(&[7], 0))
            .await
            .expect("feedback chain timed out")
            .unwrap();
        assert_eq!(signal, 7);
    }
}
