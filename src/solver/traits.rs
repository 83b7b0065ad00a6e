use crate::solver::{ConfigBuffer, SolverError};

/// Contract of a Markov-chain walker. The solver drives warm-up and
/// measurement sweeps and pulls one sample per measurement; everything about
/// the physics of a sweep stays behind this trait.
pub trait Walker: Send {
    /// State handed to an accumulator for measurement.
    type Sample: Send;

    /// Prepare internal state before the first sweep.
    fn initialize(&mut self);

    /// Restore the Markov-chain state from a configuration snapshot.
    fn read_config(&mut self, config: &[u8]) -> Result<(), SolverError>;

    /// Serialize the Markov-chain state into a configuration snapshot.
    fn dump_config(&self) -> ConfigBuffer;

    /// Perform one block of Monte Carlo updates.
    fn do_sweep(&mut self);

    /// The current sampled state.
    fn sample(&self) -> Self::Sample;

    /// Progress sink, called with the measurement count so far and the total.
    fn update_shell(&mut self, _done: usize, _total: usize) {}

    /// Mark the end of warm-up.
    fn set_thermalized(&mut self, thermalized: bool);

    /// Whether warm-up has finished.
    fn is_thermalized(&self) -> bool;

    /// Bytes of device-resident scratch owned by this walker.
    fn device_fingerprint(&self) -> usize {
        0
    }

    /// Report sweep statistics at the end of a run.
    fn print_summary(&self) {}
}

/// Contract of an accumulator folding sampled states into running estimators.
pub trait Accumulator: Send {
    /// State received from a walker.
    type Sample;

    /// Reset estimators for the given self-consistency iteration.
    fn initialize(&mut self, dca_iteration: usize);

    /// Take over the walker's current sample.
    fn update_from(&mut self, sample: Self::Sample);

    /// Fold the last received sample into the estimators.
    fn measure(&mut self);

    /// Add this accumulator's estimators onto `target`.
    fn sum_to(&self, target: &mut Self);

    /// Final pass over the merged estimators, e.g. normalization or error
    /// bars.
    fn finalize(&mut self) {}

    /// Bytes of device-resident scratch owned by this accumulator.
    fn device_fingerprint(&self) -> usize {
        0
    }

    /// Bytes of device-resident scratch shared by all accumulators.
    fn static_device_fingerprint() -> usize {
        0
    }
}
