//! Synthetic grid bandit demo.
//!
//! The agent's input shape and grid width are taken from the environment so
//! a config file only needs to override what it changes.

use std::error::Error;
use std::fs;

use burn::backend::{Autodiff, NdArray};
use serde::Deserialize;

use causal_agent::{
    Agent, AgentConfig, BanditEnvironment, BanditRunner, ConsoleLogger, CsvLogger, EstimatorKind,
    MultiLogger, RunnerConfig, SyntheticBanditConfig, SyntheticGridBandit,
};

// ============================================================================
// Backend Type
// ============================================================================

type B = Autodiff<NdArray<f32>>;

// ============================================================================
// Demo Configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct DemoConfig {
    agent: AgentConfig,
    env: SyntheticBanditConfig,
    log_every: usize,
    csv: Option<String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::new()
                .with_mc_samples(30)
                .with_ensemble_size(5)
                .with_batch_size(16)
                .with_memsize(1_000),
            env: SyntheticBanditConfig::default(),
            log_every: 20,
            csv: None,
        }
    }
}

fn load_config(path: Option<&str>) -> Result<DemoConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(DemoConfig::default()),
    }
}

// ============================================================================
// Run
// ============================================================================

pub fn run(kind: EstimatorKind, config_path: Option<&str>) -> Result<(), Box<dyn Error>> {
    let demo = load_config(config_path)?;

    let mut env = SyntheticGridBandit::new(demo.env.clone());
    let agent_config = demo
        .agent
        .clone()
        .with_dim_in(env.context_shape())
        .with_n_outputs(demo.env.cols);

    println!("=== causal_agent: {} on synthetic grid bandit ===", kind.name());
    println!(
        "grid {}x{}, {} features, horizon {}, forced exploration {:.0}%",
        demo.env.rows,
        demo.env.cols,
        demo.env.features,
        demo.env.horizon,
        agent_config.do_nothing * 100.0
    );
    println!();

    let device = Default::default();
    let mut agent = Agent::with_backend::<B>(agent_config, kind, &device)?;

    let mut logger = MultiLogger::new().add(ConsoleLogger::new(demo.log_every));
    if let Some(path) = &demo.csv {
        logger = logger.add(CsvLogger::new(path)?);
    }

    let runner = BanditRunner::new(RunnerConfig::new().with_log_every(demo.log_every));
    let summary = runner.run(&mut agent, &mut env, &mut logger)?;

    println!();
    println!("Steps:            {}", summary.steps);
    println!("Forced noop:      {}", summary.explorations);
    println!("Agent actions:    {}", summary.agent_actions);
    println!("Skipped training: {}", summary.skipped_trainings);
    println!("Total reward:     {:.3}", summary.total_reward);
    println!("Mean reward:      {:.4}", summary.mean_reward());
    println!("Regret:           {:.3}", summary.cumulative_regret);

    Ok(())
}
