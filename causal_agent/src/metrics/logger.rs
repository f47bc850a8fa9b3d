//! Run loggers for the bandit loop.
//!
//! Provides different logging backends for per-step run metrics.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// Run snapshot for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    /// Timestep id the snapshot was taken at.
    pub step: usize,
    /// Timesteps held in agent memory.
    pub buffer_len: usize,
    /// Whether this step used the forced null intervention.
    pub explored: bool,
    /// Mean training loss of this step, if training ran.
    pub mean_loss: Option<f32>,
    /// Cumulative reward so far.
    pub reward: f32,
    /// Cumulative regret so far.
    pub regret: f32,
}

impl RunSnapshot {
    pub fn new(step: usize, buffer_len: usize) -> Self {
        Self {
            step,
            buffer_len,
            explored: false,
            mean_loss: None,
            reward: 0.0,
            regret: 0.0,
        }
    }

    pub fn with_explored(mut self, explored: bool) -> Self {
        self.explored = explored;
        self
    }

    pub fn with_loss(mut self, mean_loss: Option<f32>) -> Self {
        self.mean_loss = mean_loss;
        self
    }

    /// Set cumulative reward and regret.
    pub fn with_returns(mut self, reward: f32, regret: f32) -> Self {
        self.reward = reward;
        self.regret = regret;
        self
    }
}

/// Logger trait for different logging backends.
pub trait MetricsLogger {
    fn log(&mut self, snapshot: &RunSnapshot);

    /// Flush any buffered output.
    fn flush(&mut self);
}

/// Console logger printing an aligned table.
pub struct ConsoleLogger {
    log_interval: usize,
    last_log_step: Option<usize>,
    start_time: Instant,
    show_header: bool,
}

impl ConsoleLogger {
    /// Create a new console logger.
    ///
    /// # Arguments
    ///
    /// * `log_interval` - Steps between printed rows
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval,
            last_log_step: None,
            start_time: Instant::now(),
            show_header: true,
        }
    }

    fn print_header(&self) {
        println!(
            "{:>8} {:>8} {:>8} {:>10} {:>10} {:>10} {:>8}",
            "Step", "Memory", "Explore", "Loss", "Reward", "Regret", "SPS"
        );
        println!("{}", "-".repeat(68));
    }

    fn due(&self, step: usize) -> bool {
        match self.last_log_step {
            None => true,
            Some(last) => step >= last + self.log_interval.max(1),
        }
    }
}

impl MetricsLogger for ConsoleLogger {
    fn log(&mut self, snapshot: &RunSnapshot) {
        if !self.due(snapshot.step) {
            return;
        }

        if self.show_header {
            self.print_header();
            self.show_header = false;
        }

        let elapsed = self.start_time.elapsed().as_secs_f32();
        let sps = if elapsed > 0.0 {
            snapshot.step as f32 / elapsed
        } else {
            0.0
        };
        let loss = snapshot
            .mean_loss
            .map(|l| format!("{:.4}", l))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:>8} {:>8} {:>8} {:>10} {:>10.3} {:>10.3} {:>8.0}",
            snapshot.step,
            snapshot.buffer_len,
            if snapshot.explored { "noop" } else { "act" },
            loss,
            snapshot.reward,
            snapshot.regret,
            sps
        );

        self.last_log_step = Some(snapshot.step);
    }

    fn flush(&mut self) {
        let _ = std::io::stdout().flush();
    }
}

/// CSV file logger for analysis.
pub struct CsvLogger {
    writer: BufWriter<File>,
    start_time: Instant,
}

impl CsvLogger {
    /// Create the file and write the header row.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(
            writer,
            "step,buffer_len,explored,mean_loss,reward,regret,elapsed_secs"
        )?;

        Ok(Self {
            writer,
            start_time: Instant::now(),
        })
    }
}

impl MetricsLogger for CsvLogger {
    fn log(&mut self, snapshot: &RunSnapshot) {
        let elapsed = self.start_time.elapsed().as_secs_f32();
        let loss = snapshot
            .mean_loss
            .map(|l| l.to_string())
            .unwrap_or_default();

        let _ = writeln!(
            self.writer,
            "{},{},{},{},{:.6},{:.6},{:.2}",
            snapshot.step,
            snapshot.buffer_len,
            snapshot.explored,
            loss,
            snapshot.reward,
            snapshot.regret,
            elapsed
        );
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl Drop for CsvLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Multi-logger that writes to multiple backends.
#[derive(Default)]
pub struct MultiLogger {
    loggers: Vec<Box<dyn MetricsLogger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a logger.
    pub fn add<L: MetricsLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Box::new(logger));
        self
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl MetricsLogger for MultiLogger {
    fn log(&mut self, snapshot: &RunSnapshot) {
        for logger in &mut self.loggers {
            logger.log(snapshot);
        }
    }

    fn flush(&mut self) {
        for logger in &mut self.loggers {
            logger.flush();
        }
    }
}
