/*
 * Runner Module
 *
 * Background simulation thread controlled through commands. The thread owns
 * the only copy of the simulation state. Front-ends send RunnerCommands and
 * receive RunnerEvents; every snapshot they see comes from a fully committed
 * tick.
 */

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::Vec3;

use crate::error::SimError;
use crate::params::{ParamsUpdate, SimulationParams};
use crate::scheduler::{GameSpeed, RunState, TickScheduler};
use crate::state::SimulationState;
use crate::stepper::Stepper;

/// Commands sent to the simulation thread
#[derive(Debug, Clone)]
pub enum RunnerCommand {
    /// Start ticking at the current cadence
    Start,
    /// Stop ticking
    Pause,
    /// Start if idle, pause if running
    Toggle,
    /// Run exactly one tick
    Step,
    /// Switch to a cadence preset
    SetSpeed(GameSpeed),
    /// Set the delay between ticks
    SetCadence(Duration),
    /// Apply a partial parameter change
    Reconfigure(ParamsUpdate),
    /// Resample all points, with new parameters or the current ones
    Initialize(Option<SimulationParams>),
    /// Stop the thread
    Shutdown,
}

/// Read-only copy of a committed state
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSnapshot {
    pub tick: u64,
    pub positions: Vec<Vec<Vec3>>,
    pub populations: Vec<usize>,
    pub run_state: RunState,
}

impl SimulationSnapshot {
    pub fn from_state(state: &SimulationState, run_state: RunState) -> Self {
        Self {
            tick: state.tick(),
            positions: state.species().iter().map(|points| points.positions.clone()).collect(),
            populations: state.populations(),
            run_state,
        }
    }
}

/// Events published by the simulation thread
#[derive(Debug)]
pub enum RunnerEvent {
    Snapshot(SimulationSnapshot),
    /// A tick failed; nothing was committed and the runner is idle again
    Failed(SimError),
    /// A command was refused; the state is unchanged
    Rejected(SimError),
}

/// Handle for controlling the simulation thread
pub struct SimulationHandle {
    thread: Option<JoinHandle<()>>,
    command_tx: Sender<RunnerCommand>,
    event_rx: Receiver<RunnerEvent>,
}

impl SimulationHandle {
    /// Initialize a simulation and spawn the thread that drives it.
    ///
    /// Invalid parameters are reported here, before any thread exists.
    pub fn spawn(params: SimulationParams) -> Result<Self, SimError> {
        let state = SimulationState::initialize(params)?;
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("rps-simulation".to_string())
            .spawn(move || run_simulation(state, command_rx, event_tx))?;

        Ok(Self {
            thread: Some(thread),
            command_tx,
            event_rx,
        })
    }

    /// Send a command; false if the thread has already exited
    pub fn send(&self, command: RunnerCommand) -> bool {
        self.command_tx.send(command).is_ok()
    }

    pub fn start(&self) -> bool {
        self.send(RunnerCommand::Start)
    }

    pub fn pause(&self) -> bool {
        self.send(RunnerCommand::Pause)
    }

    pub fn step(&self) -> bool {
        self.send(RunnerCommand::Step)
    }

    pub fn set_speed(&self, speed: GameSpeed) -> bool {
        self.send(RunnerCommand::SetSpeed(speed))
    }

    pub fn reconfigure(&self, update: ParamsUpdate) -> bool {
        self.send(RunnerCommand::Reconfigure(update))
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RunnerEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Drain all pending events without blocking
    pub fn drain_events(&self) -> Vec<RunnerEvent> {
        let mut events = Vec::new();
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Latest pending snapshot, discarding older ones and any other events
    pub fn try_recv_latest_snapshot(&self) -> Option<SimulationSnapshot> {
        self.drain_events()
            .into_iter()
            .filter_map(|event| match event {
                RunnerEvent::Snapshot(snapshot) => Some(snapshot),
                _ => None,
            })
            .last()
    }

    /// Shutdown the simulation thread and wait for it
    pub fn shutdown(&mut self) {
        let _ = self.command_tx.send(RunnerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Simulation thread panicked");
            }
        }
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn publish(event_tx: &Sender<RunnerEvent>, state: &SimulationState, run_state: RunState) {
    let _ = event_tx.send(RunnerEvent::Snapshot(SimulationSnapshot::from_state(state, run_state)));
}

// Main simulation loop running in its own thread
fn run_simulation(mut state: SimulationState, command_rx: Receiver<RunnerCommand>, event_tx: Sender<RunnerEvent>) {
    let mut scheduler = TickScheduler::new(state.params().tick_delay());
    let mut stepper = Stepper::new();

    log::info!("Simulation thread started: {} species", state.species_count());
    publish(&event_tx, &state, scheduler.state());

    loop {
        // Block while idle; while running wait only until the next tick is due
        let command = if scheduler.is_running() {
            let wait = scheduler.time_until_next(Instant::now()).unwrap_or_default();
            match command_rx.recv_timeout(wait) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match command_rx.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        if let Some(command) = command {
            let now = Instant::now();
            match command {
                RunnerCommand::Start => {
                    if scheduler.start(now) {
                        log::info!("Simulation running at tick {}", state.tick());
                        publish(&event_tx, &state, scheduler.state());
                    }
                }
                RunnerCommand::Pause => {
                    if scheduler.stop() {
                        log::info!("Simulation paused at tick {}", state.tick());
                        publish(&event_tx, &state, scheduler.state());
                    }
                }
                RunnerCommand::Toggle => {
                    let run_state = scheduler.toggle(now);
                    log::info!("Simulation {} at tick {}", run_state, state.tick());
                    publish(&event_tx, &state, run_state);
                }
                RunnerCommand::Step => {
                    run_tick(&mut state, &mut stepper, &mut scheduler, &event_tx);
                }
                RunnerCommand::SetSpeed(speed) => {
                    set_cadence(&mut state, &mut scheduler, &event_tx, speed.delay(), now);
                }
                RunnerCommand::SetCadence(cadence) => {
                    set_cadence(&mut state, &mut scheduler, &event_tx, cadence, now);
                }
                RunnerCommand::Reconfigure(update) => match state.reconfigure(&update) {
                    Ok(changes) => {
                        if changes.cadence_changed {
                            scheduler.set_cadence(state.params().tick_delay(), now);
                        }
                        publish(&event_tx, &state, scheduler.state());
                    }
                    Err(e) => {
                        log::warn!("Reconfigure rejected: {}", e);
                        let _ = event_tx.send(RunnerEvent::Rejected(e));
                    }
                },
                RunnerCommand::Initialize(params) => {
                    let params = params.unwrap_or_else(|| state.params().clone());
                    match SimulationState::initialize(params) {
                        Ok(fresh) => {
                            state = fresh;
                            stepper = Stepper::new();
                            scheduler.force(RunState::Idle, now);
                            scheduler.set_cadence(state.params().tick_delay(), now);
                            publish(&event_tx, &state, scheduler.state());
                        }
                        Err(e) => {
                            log::warn!("Initialize rejected: {}", e);
                            let _ = event_tx.send(RunnerEvent::Rejected(e));
                        }
                    }
                }
                RunnerCommand::Shutdown => break,
            }
        }

        if scheduler.poll(Instant::now()) {
            run_tick(&mut state, &mut stepper, &mut scheduler, &event_tx);
        }
    }

    log::info!("Simulation thread stopped at tick {}", state.tick());
}

fn run_tick(
    state: &mut SimulationState,
    stepper: &mut Stepper,
    scheduler: &mut TickScheduler,
    event_tx: &Sender<RunnerEvent>,
) {
    match state.advance(stepper) {
        Ok(_) => publish(event_tx, state, scheduler.state()),
        Err(e) => {
            log::error!("Tick {} failed: {}", state.tick() + 1, e);
            scheduler.stop();
            let _ = event_tx.send(RunnerEvent::Failed(e));
        }
    }
}

// Cadence lives in the parameters too, so a later Initialize keeps it
fn set_cadence(
    state: &mut SimulationState,
    scheduler: &mut TickScheduler,
    event_tx: &Sender<RunnerEvent>,
    cadence: Duration,
    now: Instant,
) {
    let update = ParamsUpdate {
        tick_delay_ms: Some(u64::try_from(cadence.as_millis()).unwrap_or(u64::MAX)),
        ..ParamsUpdate::default()
    };
    match state.reconfigure(&update) {
        Ok(_) => {
            scheduler.set_cadence(state.params().tick_delay(), now);
            log::info!("Tick cadence set to {:?}", scheduler.cadence());
        }
        Err(e) => {
            let _ = event_tx.send(RunnerEvent::Rejected(e));
        }
    }
}
