//! Operator overrides and participant input driving the run forward.

mod common;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::{runner, step_to_completion};
use trialflow::observability::StopReason;

#[test]
fn test_cued_phase_advances_on_operator_next() {
    let (mut run, bus) = runner(
        r"
experiment:
  name: cue-demo
blocks:
  - name: b
    trials:
      - name: instructions
        phases:
          - { name: wait-for-operator, kind: cued }
",
    );
    run.start();
    for _ in 0..5 {
        run.step();
    }
    assert!(!run.is_complete(), "cued phase holds until the cue");

    bus.force_next_phase();
    run.step(); // phase observes the cue and completes
    run.step(); // repetition boundary ends the trial
    assert!(run.is_complete());
}

#[test]
fn test_input_phase_counts_participant_responses() {
    let (mut run, bus) = runner(
        r"
experiment:
  name: input-demo
blocks:
  - name: b
    trials:
      - name: respond-twice
        phases:
          - { name: response, kind: input, count: 2 }
",
    );
    run.start();
    run.step();
    bus.input("left");
    run.step();
    assert!(!run.is_complete(), "one of two responses received");

    bus.input("right");
    run.step();
    run.step();
    assert!(run.is_complete());
}

#[test]
fn test_override_completes_fixed_phase_early() {
    let (mut run, bus) = runner(
        r"
experiment:
  name: force-demo
blocks:
  - name: b
    trials:
      - name: long
        phases:
          - { name: slow, kind: fixed, ticks: 1000 }
",
    );
    run.start();
    run.step();
    bus.force_next_phase();
    run.step();
    run.step();
    assert!(run.is_complete(), "forced advance cut the fixed phase short");
    assert!(run.ticks() < 10);
}

#[test]
fn test_overrides_before_entry_do_not_leak() {
    let (mut run, bus) = runner(
        r"
experiment:
  name: stale-demo
blocks:
  - name: b
    trials:
      - name: t
        phases:
          - { name: first, kind: fixed, ticks: 2 }
          - { name: gate, kind: cued }
",
    );
    // Cue sent before the gate phase is ever entered.
    bus.force_next_phase();
    run.start();
    for _ in 0..10 {
        run.step();
    }
    assert!(!run.is_complete(), "stale cue must not advance the gate");
    bus.force_next_phase();
    step_to_completion(&mut run, 10);
    assert!(run.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_endless_trial_runs_until_cancelled() {
    let (mut run, _bus) = runner(
        r"
experiment:
  name: endless-demo
blocks:
  - name: b
    trials:
      - name: forever
        endless: true
        phases:
          - { name: spin, kind: fixed, ticks: 1 }
",
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let (reason, ()) = tokio::join!(run.run(cancel), async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });
    assert!(matches!(reason, StopReason::Interrupted));
    assert!(run.ticks() > 1, "endless trial kept ticking until cancel");
}
