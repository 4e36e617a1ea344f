//! Micro-worldtest harness for deterministic, tick-based replay tests.
//!
//! A micro-worldtest steps a small simulation for a fixed number of ticks and
//! captures selected state after every step. The frames are reduced to a
//! digest and compared across two runs of the same input script.

use crate::snapshot::json_digest;
use anyhow::Result;
use deepdig_core::SimTick;
use serde::Serialize;

/// Single snapshot frame captured at a given tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicroWorldtestFrame<S> {
    /// Tick number.
    pub tick: u64,
    /// Snapshot payload.
    pub snapshot: S,
}

/// Step `state` for `ticks` steps and collect `ticks + 1` frames.
///
/// The step closure receives the tick being left, matching how a fixed-step
/// driver advances its own counter inside `step`.
pub fn record_frames<State, Snapshot, StepFn, SnapFn>(
    ticks: u64,
    state: &mut State,
    mut step: StepFn,
    mut snapshot: SnapFn,
) -> Vec<MicroWorldtestFrame<Snapshot>>
where
    StepFn: FnMut(SimTick, &mut State),
    SnapFn: FnMut(SimTick, &State) -> Snapshot,
{
    let mut frames = Vec::with_capacity(ticks as usize + 1);
    let mut tick = SimTick::ZERO;
    frames.push(MicroWorldtestFrame {
        tick: tick.0,
        snapshot: snapshot(tick, state),
    });

    for _ in 0..ticks {
        step(tick, state);
        tick = tick.advance(1);
        frames.push(MicroWorldtestFrame {
            tick: tick.0,
            snapshot: snapshot(tick, state),
        });
    }
    frames
}

/// Digest of a frame sequence, for comparing two replays.
pub fn frames_digest<S: Serialize>(frames: &[MicroWorldtestFrame<S>]) -> Result<String> {
    json_digest(&frames)
}
