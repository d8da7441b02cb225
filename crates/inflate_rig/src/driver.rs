//! The simulation heartbeat.
//!
//! `SimulationDriver` moves a `Simulation` into a background task that is its
//! only owner. The task:
//! - ticks the simulation on a fixed interval, measuring the real `dt`
//! - reads the latest polled controller state from a watch channel
//! - turns each output into a smoothed `RigFrame` and hands it to the sink
//! - publishes outputs and frames for anyone who subscribes

use crate::config::RigConfig;
use crate::frame::{RigCurves, RigFrame, RigSmoother};
use crate::sink::{EffectorSink, NullSink};
use anyhow::Context;
use inflate_core::{Simulation, SimulationSnapshot, TickInput, TickOutput};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

enum Command {
    Restore(SimulationSnapshot),
    Snapshot(oneshot::Sender<SimulationSnapshot>),
    Shutdown,
}

pub struct SimulationDriver {
    /// Latest controller state; the task samples it once per tick
    input_tx: watch::Sender<TickInput>,
    output_rx: watch::Receiver<TickOutput>,
    frame_rx: watch::Receiver<RigFrame>,
    command_tx: mpsc::Sender<Command>,
    handle: JoinHandle<Simulation>,
}

impl SimulationDriver {
    /// Start ticking `sim` with no effector attached.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(sim: Simulation, config: &RigConfig) -> Self {
        Self::spawn_with_sink(sim, config, NullSink)
    }

    pub fn spawn_with_sink<S>(mut sim: Simulation, config: &RigConfig, mut sink: S) -> Self
    where
        S: EffectorSink + 'static,
    {
        let curves = config.curves.clone();
        let mut smoother = RigSmoother::new(config.smoothing, config.surprise_bypass_threshold);
        let initial = *sim.output();
        let initial_frame = smoother.smooth(RigFrame::from_output(&initial, &curves));

        let (input_tx, input_rx) = watch::channel(TickInput::default());
        let (output_tx, output_rx) = watch::channel(initial);
        let (frame_tx, frame_rx) = watch::channel(initial_frame);
        let (command_tx, mut command_rx) = mpsc::channel(16);
        let period = config.heartbeat().interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_tick = Instant::now();

            let mut publish = |output: TickOutput,
                               smoother: &mut RigSmoother,
                               curves: &RigCurves| {
                let frame = smoother.smooth(RigFrame::from_output(&output, curves));
                sink.apply(&frame);
                let _ = output_tx.send(output);
                let _ = frame_tx.send(frame);
            };

            loop {
                tokio::select! {
                    // Regular heartbeat
                    _ = interval.tick() => {
                        let now = Instant::now();
                        let dt = now.duration_since(last_tick).as_secs_f32();
                        last_tick = now;

                        let input = *input_rx.borrow();
                        let output = sim.tick(&input, dt);
                        publish(output, &mut smoother, &curves);
                    }

                    command = command_rx.recv() => {
                        match command {
                            Some(Command::Restore(snapshot)) => {
                                sim.restore(snapshot);
                                smoother.reset();
                                publish(*sim.output(), &mut smoother, &curves);
                                tracing::debug!("Simulation state restored");
                            }
                            Some(Command::Snapshot(reply)) => {
                                let _ = reply.send(sim.snapshot());
                            }
                            Some(Command::Shutdown) | None => break,
                        }
                    }
                }
            }

            tracing::debug!(ticks = sim.ticks(), "Simulation driver stopped");
            sim
        });

        Self {
            input_tx,
            output_rx,
            frame_rx,
            command_tx,
            handle,
        }
    }

    /// Replace the controller state the next ticks will see.
    pub fn set_input(&self, input: TickInput) {
        self.input_tx.send_replace(input);
    }

    /// Output of the latest tick
    pub fn output(&self) -> TickOutput {
        *self.output_rx.borrow()
    }

    /// Rig frame of the latest tick
    pub fn frame(&self) -> RigFrame {
        *self.frame_rx.borrow()
    }

    /// Subscribe to tick outputs
    pub fn subscribe(&self) -> watch::Receiver<TickOutput> {
        self.output_rx.clone()
    }

    /// Subscribe to rig frames
    pub fn subscribe_frames(&self) -> watch::Receiver<RigFrame> {
        self.frame_rx.clone()
    }

    /// Force a state (for scripted scenes or manual intervention)
    pub async fn restore(&self, snapshot: SimulationSnapshot) -> anyhow::Result<()> {
        self.command_tx
            .send(Command::Restore(snapshot))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to restore state: {}", e))
    }

    pub async fn snapshot(&self) -> anyhow::Result<SimulationSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Snapshot(reply_tx))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to request snapshot: {}", e))?;
        reply_rx.await.context("Simulation driver dropped the snapshot request")
    }

    /// Stop ticking and hand the simulation back.
    pub async fn shutdown(self) -> anyhow::Result<Simulation> {
        // If the task is already gone the join below reports why
        let _ = self.command_tx.send(Command::Shutdown).await;
        self.handle.await.context("Simulation driver task failed")
    }
}
