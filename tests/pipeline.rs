use intcode::pipeline::{Chain, Interactive, PipelineError};
use intcode::vm::{Program, VMConfig};
use std::time::Duration;
use tokio::time::timeout;

const SERIAL: &str = "3,23,3,24,1002,24,10,24,1002,23,-1,23,\
                      101,5,23,23,1,24,23,23,4,23,99,0,0";

const FEEDBACK: &str = "3,52,1001,52,-5,52,3,53,1,52,56,54,1007,54,5,55,1005,55,26,1001,54,\
                        -5,54,1105,1,12,1,53,54,53,1008,54,0,55,1001,55,1,55,2,53,55,53,4,\
                        53,1001,56,-1,56,1005,56,6,99,0,0,0,0,10";

fn program(source: &str) -> Program {
    source.parse().expect("valid program")
}

#[test]
fn test_serial_chain() {
    let chain = Chain::new(program(SERIAL), VMConfig::extended());
    assert_eq!(chain.run_serial(&[0, 1, 2, 3, 4], 0).unwrap(), 54321);

    let (phases, signal) = chain.max_serial_signal(&[0, 1, 2, 3, 4], 0).unwrap();
    assert_eq!(phases, vec![0, 1, 2, 3, 4]);
    assert_eq!(signal, 54321);
}

#[tokio::test]
async fn test_feedback_chain() {
    let chain = Chain::new(program(FEEDBACK), VMConfig::extended());
    let signal = timeout(Duration::from_secs(10), chain.run_feedback(&[9, 7, 8, 5, 6], 0))
        .await
        .expect("feedback chain timed out")
        .unwrap();
    assert_eq!(signal, 18216);
}

#[tokio::test]
async fn test_max_feedback_signal() {
    let chain = Chain::new(program(FEEDBACK), VMConfig::relocatable());
    let (phases, signal) = timeout(
        Duration::from_secs(30),
        chain.max_feedback_signal(&[5, 6, 7, 8, 9], 0),
    )
    .await
    .expect("feedback search timed out")
    .unwrap();
    assert_eq!(phases, vec![9, 7, 8, 5, 6]);
    assert_eq!(signal, 18216);
}

#[tokio::test]
async fn test_feedback_chain_without_output() {
    // Every machine consumes its phase and halts without emitting.
    let chain = Chain::new(program("3,0,99"), VMConfig::extended());
    let result = timeout(Duration::from_secs(5), chain.run_feedback(&[1, 2, 3], 0))
        .await
        .expect("feedback chain timed out");
    assert!(matches!(result, Err(PipelineError::NoOutput)));
}

#[tokio::test]
async fn test_interactive_session_tracks_position() {
    // Reads a move, emits (step, position) with position += move, until the move is 0.
    // Cells: 30 = move, 31 = step, 32 = position.
    let source = "3,30,1006,30,23,1001,31,1,31,1,32,30,32,4,31,4,32,1105,1,0,0,0,0,99,\
                  0,0,0,0,0,0,0,0,0";
    let session = Interactive::new(program(source), VMConfig::extended(), 2);

    let history = timeout(
        Duration::from_secs(5),
        session.run(
            Vec::<(i64, i64)>::new(),
            |history: &Vec<(i64, i64)>| {
                let position = history.last().map_or(0, |&(_, position)| position);
                if position >= 10 {
                    0
                } else {
                    3
                }
            },
            |history: &mut Vec<(i64, i64)>, group: &[i64]| history.push((group[0], group[1])),
        ),
    )
    .await
    .expect("session timed out")
    .unwrap();

    assert_eq!(history, vec![(1, 3), (2, 6), (3, 9), (4, 12)]);
}
