//! Single-threaded bandit loop driver.
//!
//! Owns the forced-exploration schedule: for the first `do_nothing` fraction
//! of the horizon the environment's null intervention is issued, after which
//! the agent chooses. Every step the previous timestep is observed and the
//! agent is asked to train.

use crate::agent::Agent;
use crate::environment::{BanditEnvironment, Intervention};
use crate::error::Result;
use crate::estimators::UncertaintyEstimator;
use crate::metrics::{MetricsLogger, RunSnapshot};

/// Configuration for [`BanditRunner`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Epochs passed to `Agent::train` after every step.
    pub train_epochs: usize,
    /// Steps between run snapshots; 0 disables them.
    pub log_every: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            train_epochs: 1,
            log_every: 0,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_train_epochs(mut self, train_epochs: usize) -> Self {
        self.train_epochs = train_epochs;
        self
    }

    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }
}

/// Totals for one completed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Environment steps taken.
    pub steps: usize,
    /// Steps that issued the null intervention.
    pub explorations: usize,
    /// Steps where the agent chose the intervention.
    pub agent_actions: usize,
    /// `train` calls that returned without updating.
    pub skipped_trainings: usize,
    pub total_reward: f32,
    /// Sum of optimal minus obtained reward; 0 when the environment
    /// reports no optimum.
    pub cumulative_regret: f32,
}

impl RunSummary {
    /// Average reward per step.
    pub fn mean_reward(&self) -> f32 {
        if self.steps == 0 {
            0.0
        } else {
            self.total_reward / self.steps as f32
        }
    }
}

/// Whether timestep `id` falls inside the forced-exploration prefix.
pub fn is_forced_exploration(horizon: usize, do_nothing: f64, id: u64) -> bool {
    horizon as f64 * do_nothing >= id as f64
}

/// Drives an [`Agent`] against a [`BanditEnvironment`] until the run is done.
#[derive(Debug, Clone, Default)]
pub struct BanditRunner {
    config: RunnerConfig,
}

impl BanditRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run one full episode of the bandit loop.
    ///
    /// Errors from the agent (shape or intervention mismatches between the
    /// agent and the environment) abort the run.
    pub fn run<E, Env>(
        &self,
        agent: &mut Agent<E>,
        env: &mut Env,
        logger: &mut dyn MetricsLogger,
    ) -> Result<RunSummary>
    where
        E: UncertaintyEstimator,
        Env: BanditEnvironment + ?Sized,
    {
        let horizon = env.horizon();
        let do_nothing = agent.config().do_nothing;
        let mut summary = RunSummary::default();

        log::info!(
            "starting run: horizon {}, forced exploration through t={:.0}",
            horizon,
            horizon as f64 * do_nothing
        );

        let mut timestep = env.reset();
        while !timestep.done() {
            let explored = is_forced_exploration(horizon, do_nothing, timestep.id());
            let intervention = if explored {
                summary.explorations += 1;
                env.noop()
            } else {
                summary.agent_actions += 1;
                Intervention::Cell(agent.act(&timestep)?)
            };

            let (previous, next) = env.step(intervention);
            let reward = previous.reward().unwrap_or(0.0);
            let regret = env
                .optimal_reward(&previous)
                .map_or(0.0, |optimal| optimal - reward);
            let step = previous.id() as usize;

            agent.observe(previous)?;
            let outcome = agent.train(self.config.train_epochs)?;
            if outcome.is_skipped() {
                summary.skipped_trainings += 1;
            }

            summary.steps += 1;
            summary.total_reward += reward;
            summary.cumulative_regret += regret;

            if self.config.log_every > 0 && summary.steps % self.config.log_every == 0 {
                let snapshot = RunSnapshot::new(step, agent.memory().len())
                    .with_explored(explored)
                    .with_loss(outcome.mean_loss())
                    .with_returns(summary.total_reward, summary.cumulative_regret);
                logger.log(&snapshot);
            }

            timestep = next;
        }
        logger.flush();

        log::info!(
            "run finished: {} steps ({} forced, {} chosen), total reward {:.3}, regret {:.3}",
            summary.steps,
            summary.explorations,
            summary.agent_actions,
            summary.total_reward,
            summary.cumulative_regret
        );

        Ok(summary)
    }
}
