use super::config::{ConfigError, PhaseConfig};
use super::context::SimulationContext;
use super::error::EngineError;
use super::metropolis::sweep;
use super::progress::{Progress, ProgressReporter};
use super::state::{SnapshotSink, StateRecord};
use crate::core::energy::EnergyModel;
use crate::core::lattice::Lattice;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnnealingState {
    AtTemperature(f64),
    Sweeping,
    Evaluating,
    AdvancingTemperature,
    Done,
}

/// Totals of one finished annealing phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSummary {
    pub name: String,
    pub visited_temperatures: Vec<f64>,
    pub sweeps: usize,
    pub adopted_states: usize,
    pub final_energy: f64,
}

/// Walks one phase's temperature schedule, sweeping a copy of the current
/// lattice and letting the phase's selector decide whether to adopt it.
///
/// The schedule is the configured temperatures followed by the last one once
/// more, so the final temperature is visited twice.
pub struct AnnealingController<'a> {
    phase: &'a PhaseConfig,
    lattice: Lattice,
    candidate: Option<Lattice>,
    schedule: Vec<f64>,
    position: usize,
    state: AnnealingState,
    non_improving: usize,
    sweeps_at_temperature: usize,
    visited: Vec<f64>,
    sweeps: usize,
    adopted: usize,
    snapshots: usize,
}

impl<'a> AnnealingController<'a> {
    pub fn new(phase: &'a PhaseConfig, lattice: Lattice) -> Result<Self, EngineError> {
        let last = *phase.temperatures.last().ok_or(ConfigError::EmptySchedule)?;
        let mut schedule = phase.temperatures.clone();
        schedule.push(last);
        Ok(Self {
            phase,
            lattice,
            candidate: None,
            state: AnnealingState::AtTemperature(schedule[0]),
            schedule,
            position: 0,
            non_improving: 0,
            sweeps_at_temperature: 0,
            visited: Vec::new(),
            sweeps: 0,
            adopted: 0,
            snapshots: 0,
        })
    }

    pub fn state(&self) -> AnnealingState {
        self.state
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn into_lattice(self) -> Lattice {
        self.lattice
    }

    pub fn schedule(&self) -> &[f64] {
        &self.schedule
    }

    pub fn visited_temperatures(&self) -> &[f64] {
        &self.visited
    }

    /// Advances the state machine by exactly one transition.
    pub fn step(
        &mut self,
        model: &mut EnergyModel,
        ctx: &mut SimulationContext,
        sink: &mut dyn SnapshotSink,
        reporter: &ProgressReporter,
    ) -> Result<AnnealingState, EngineError> {
        self.state = match self.state {
            AnnealingState::AtTemperature(temperature) => {
                self.lattice.set_temperature(temperature);
                self.non_improving = 0;
                self.sweeps_at_temperature = 0;
                self.visited.push(temperature);
                info!(
                    phase = %self.phase.name,
                    temperature,
                    step = self.position + 1,
                    of = self.schedule.len(),
                    "Annealing at new temperature."
                );
                reporter.report(Progress::TemperatureStart { temperature });
                if self.snapshots == 0 {
                    self.record(model, sink)?;
                }
                AnnealingState::Sweeping
            }
            AnnealingState::Sweeping => {
                let mut candidate = self.lattice.clone();
                let outcome = sweep(&mut candidate, model, &self.phase.metropolis, ctx)?;
                self.sweeps_at_temperature += 1;
                self.sweeps += 1;
                reporter.report(Progress::SweepFinish {
                    accepted: outcome.accepted,
                    attempted: outcome.attempted,
                });
                self.candidate = Some(candidate);
                AnnealingState::Evaluating
            }
            AnnealingState::Evaluating => {
                let candidate = self.candidate.take().ok_or_else(|| {
                    EngineError::Internal("no swept candidate to evaluate".to_string())
                })?;
                if self.phase.selector.is_better(&self.lattice, &candidate, model)? {
                    self.lattice = candidate;
                    self.non_improving = 0;
                    self.adopted += 1;
                    let energy = self.record(model, sink)?;
                    reporter.report(Progress::StateAdopted { energy });
                } else {
                    self.non_improving += 1;
                    debug!(
                        non_improving = self.non_improving,
                        limit = self.phase.max_non_improving_steps,
                        "Candidate discarded."
                    );
                }

                let exhausted = self
                    .phase
                    .max_steps
                    .is_some_and(|max| self.sweeps_at_temperature >= max);
                if self.non_improving >= self.phase.max_non_improving_steps || exhausted {
                    AnnealingState::AdvancingTemperature
                } else {
                    AnnealingState::Sweeping
                }
            }
            AnnealingState::AdvancingTemperature => {
                self.position += 1;
                match self.schedule.get(self.position) {
                    Some(&next) => AnnealingState::AtTemperature(next),
                    None => {
                        info!(
                            phase = %self.phase.name,
                            sweeps = self.sweeps,
                            adopted = self.adopted,
                            "Annealing schedule exhausted."
                        );
                        AnnealingState::Done
                    }
                }
            }
            AnnealingState::Done => AnnealingState::Done,
        };
        Ok(self.state)
    }

    /// Drives the state machine until [`AnnealingState::Done`].
    #[instrument(skip_all, fields(phase = %self.phase.name))]
    pub fn run(
        &mut self,
        model: &mut EnergyModel,
        ctx: &mut SimulationContext,
        sink: &mut dyn SnapshotSink,
        reporter: &ProgressReporter,
    ) -> Result<PhaseSummary, EngineError> {
        while self.step(model, ctx, sink, reporter)? != AnnealingState::Done {}
        sink.finish()?;
        Ok(PhaseSummary {
            name: self.phase.name.clone(),
            visited_temperatures: self.visited.clone(),
            sweeps: self.sweeps,
            adopted_states: self.adopted,
            final_energy: model.total_energy(&self.lattice)?,
        })
    }

    fn record(&mut self, model: &EnergyModel, sink: &mut dyn SnapshotSink) -> Result<f64, EngineError> {
        let energy = model.total_energy(&self.lattice)?;
        let record = StateRecord::describe(&self.phase.name, self.snapshots, &self.lattice, energy);
        info!(
            phase = %record.phase,
            snapshot = record.snapshot,
            temperature = record.temperature,
            energy = record.energy,
            variance = record.variance,
            average_orientation = %record.average_orientation,
            "State adopted."
        );
        sink.emit(&self.lattice, &record)?;
        self.snapshots += 1;
        Ok(energy)
    }
}
