use crate::parallel::{get_workload, Concurrency, ThreadPool};
use crate::solver::{
    read_configurations, write_configurations, Accumulator, ConfigBuffer, DefaultRng,
    MciParameters, SolverError, ThreadTask, ThreadTaskHandler, Walker,
};
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;

/// Message delivered to an accumulator through its private slot: either the
/// next sample to measure, or the signal that no walker will produce again.
enum SlotMessage<S> {
    Sample(S),
    Done,
}

/// State shared by the threads of one `integrate` call. The idle stack is a
/// LIFO of accumulator slots; slot publication and the `walk_finished`
/// termination check happen under the same lock.
struct RunContext<S, A> {
    queue: Mutex<Vec<SyncSender<SlotMessage<S>>>>,
    queue_cv: Condvar,
    walk_finished: AtomicUsize,
    measurements_done: AtomicUsize,
    n_walkers: usize,
    warm_up_sweeps: usize,
    fix_meas_per_walker: bool,
    process_measurements: usize,
    dca_iteration: usize,
    on_first_process: bool,
    global: Arc<Mutex<A>>,
    configs_out: Mutex<Vec<ConfigBuffer>>,
    walker_fingerprints: Mutex<Vec<usize>>,
    accum_fingerprints: Mutex<Vec<usize>>,
}

impl<S, A> RunContext<S, A> {
    /// Drive the measurement loop of one walker. With the fixed-per-walker
    /// flag each walker owns a private share of the process workload;
    /// otherwise measurement indices are claimed from a shared counter until
    /// it runs out.
    fn iterate_over_local_measurements<F>(&self, walker_index: usize, mut body: F)
    where
        F: FnMut(usize, usize, bool),
    {
        if self.fix_meas_per_walker {
            let n_local = get_workload(self.process_measurements, self.n_walkers, walker_index);
            let print = walker_index == 0;
            for meas_id in 0..n_local {
                body(meas_id, n_local, print);
            }
        } else {
            loop {
                let meas_id = self.measurements_done.fetch_add(1, Ordering::SeqCst);
                if meas_id >= self.process_measurements {
                    break;
                }
                body(meas_id, self.process_measurements, true);
            }
        }
    }

    /// If this walker was the last one, empty the idle stack and tell every
    /// waiting accumulator that the run is over. Accumulators observe the
    /// updated counter under the queue lock, so none can slip back in.
    fn finish_walk(&self) {
        if self.walk_finished.fetch_add(1, Ordering::SeqCst) + 1 == self.n_walkers {
            let mut queue = self.queue.lock().unwrap();
            for slot in queue.drain(..) {
                let _ = slot.send(SlotMessage::Done);
            }
        }
    }
}

fn initialize_and_warm_up<W: Walker, A>(
    ctx: &RunContext<W::Sample, A>,
    walker: &mut W,
    thread_id: usize,
    config: &ConfigBuffer,
) {
    if !config.is_empty() {
        if let Err(err) = walker.read_config(config) {
            log::error!("could not restore a walker configuration: {}", err);
        }
    }
    walker.initialize();

    if thread_id == 0 && ctx.on_first_process {
        log::info!("warm-up started");
    }
    for sweep in 0..ctx.warm_up_sweeps {
        walker.do_sweep();
        if thread_id == 0 {
            walker.update_shell(sweep, ctx.warm_up_sweeps);
        }
    }
    walker.set_thermalized(true);
    if thread_id == 0 && ctx.on_first_process {
        log::info!("warm-up done");
    }
}

fn run_walker<W, A, R>(
    ctx: Arc<RunContext<W::Sample, A>>,
    factory: Arc<dyn Fn(R, usize) -> W + Send + Sync>,
    rng: R,
    thread_id: usize,
    walker_index: usize,
    config: ConfigBuffer,
) where
    W: Walker,
    R: Rng,
{
    let mut walker = (*factory)(rng, thread_id);
    initialize_and_warm_up(&ctx, &mut walker, thread_id, &config);

    ctx.iterate_over_local_measurements(walker_index, |meas_id, n_meas, print| {
        walker.do_sweep();
        if print {
            walker.update_shell(meas_id, n_meas);
        }

        // Wait for an idle accumulator; the most recently idle one serves.
        let slot = {
            let mut queue = ctx.queue.lock().unwrap();
            while queue.is_empty() {
                queue = ctx.queue_cv.wait(queue).unwrap();
            }
            queue.pop().unwrap()
        };
        let _ = slot.send(SlotMessage::Sample(walker.sample()));
    });

    ctx.finish_walk();

    if thread_id == 0 && ctx.on_first_process {
        log::info!("threaded integration sweeps have ended");
        walker.print_summary();
    }

    ctx.walker_fingerprints.lock().unwrap()[walker_index] = walker.device_fingerprint();
    ctx.configs_out.lock().unwrap()[walker_index] = walker.dump_config();
}

fn run_accumulator<S, A>(
    ctx: Arc<RunContext<S, A>>,
    factory: Arc<dyn Fn(usize) -> A + Send + Sync>,
    thread_id: usize,
    accum_index: usize,
) where
    A: Accumulator<Sample = S>,
{
    let mut accumulator = (*factory)(thread_id);
    accumulator.initialize(ctx.dca_iteration);

    let (slot, samples) = sync_channel(1);
    loop {
        {
            let mut queue = ctx.queue.lock().unwrap();
            if ctx.walk_finished.load(Ordering::SeqCst) == ctx.n_walkers {
                break;
            }
            queue.push(slot.clone());
        }
        ctx.queue_cv.notify_one();

        match samples.recv() {
            Ok(SlotMessage::Sample(sample)) => {
                accumulator.update_from(sample);
                accumulator.measure();
            }
            Ok(SlotMessage::Done) | Err(_) => break,
        }
    }

    {
        let mut global = ctx.global.lock().unwrap();
        accumulator.sum_to(&mut global);
    }
    ctx.accum_fingerprints.lock().unwrap()[accum_index] = accumulator.device_fingerprint();
}

fn run_walker_and_accumulator<W, A, R>(
    ctx: Arc<RunContext<W::Sample, A>>,
    walker_factory: Arc<dyn Fn(R, usize) -> W + Send + Sync>,
    accumulator_factory: Arc<dyn Fn(usize) -> A + Send + Sync>,
    rng: R,
    thread_id: usize,
    accum_index: usize,
    config: ConfigBuffer,
) where
    W: Walker,
    A: Accumulator<Sample = W::Sample>,
    R: Rng,
{
    let mut walker = (*walker_factory)(rng, thread_id);
    initialize_and_warm_up(&ctx, &mut walker, thread_id, &config);

    let mut accumulator = (*accumulator_factory)(thread_id);
    accumulator.initialize(ctx.dca_iteration);

    ctx.iterate_over_local_measurements(thread_id, |meas_id, n_meas, print| {
        walker.do_sweep();
        accumulator.update_from(walker.sample());
        accumulator.measure();
        if print {
            walker.update_shell(meas_id, n_meas);
        }
    });

    ctx.finish_walk();

    {
        let mut global = ctx.global.lock().unwrap();
        accumulator.sum_to(&mut global);
    }

    ctx.walker_fingerprints.lock().unwrap()[thread_id] = walker.device_fingerprint();
    ctx.accum_fingerprints.lock().unwrap()[accum_index] = accumulator.device_fingerprint();
    ctx.configs_out.lock().unwrap()[thread_id] = walker.dump_config();
}

/// Timings and fingerprints of a finished integration.
#[derive(Debug, Clone)]
pub struct IntegrationSummary {
    /// Wall time of the last `integrate` call, in seconds.
    pub total_time: f64,
    /// Total number of configured measurements.
    pub measurements: usize,
    /// Device bytes owned by each walker, by walker index.
    pub walker_fingerprints: Vec<usize>,
    /// Device bytes owned by each accumulator, by accumulator index.
    pub accumulator_fingerprints: Vec<usize>,
    /// Device bytes shared by all accumulators.
    pub static_accumulator_fingerprint: usize,
}

/// Threaded Monte Carlo integration coordinator. Walker and accumulator
/// threads meet pairwise over a shared idle stack; combined threads measure
/// inline. Local estimators are merged into a single global accumulator at
/// the end of every `integrate` call.
pub struct ThreadedSolver<W, A, R = DefaultRng> {
    params: MciParameters,
    process_id: usize,
    n_processes: usize,
    on_first_process: bool,
    task_handler: ThreadTaskHandler,
    walker_factory: Arc<dyn Fn(R, usize) -> W + Send + Sync>,
    accumulator_factory: Arc<dyn Fn(usize) -> A + Send + Sync>,
    rng_vector: Vec<R>,
    config_dump: Vec<ConfigBuffer>,
    walker_fingerprints: Vec<usize>,
    accum_fingerprints: Vec<usize>,
    global_accumulator: Arc<Mutex<A>>,
    dca_iteration: usize,
    configs_loaded: bool,
    total_time: f64,
}

impl<W, A, R> fmt::Debug for ThreadedSolver<W, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedSolver")
            .field("params", &self.params)
            .field("process_id", &self.process_id)
            .field("n_processes", &self.n_processes)
            .field("dca_iteration", &self.dca_iteration)
            .field("total_time", &self.total_time)
            .finish()
    }
}

fn seed_rngs<R: SeedableRng>(
    n_walkers: usize,
    process_id: usize,
    n_processes: usize,
    seed: i64,
    round: usize,
) -> Vec<R> {
    (0..n_walkers)
        .map(|walker| {
            let stream = ((round * n_walkers + walker) * n_processes + process_id) as u64;
            R::seed_from_u64((seed as u64) ^ stream.wrapping_mul(0x9e37_79b9_7f4a_7c15))
        })
        .collect()
}

impl<W, A, R> ThreadedSolver<W, A, R>
where
    W: Walker + 'static,
    W::Sample: Send + 'static,
    A: Accumulator<Sample = W::Sample> + 'static,
    R: Rng + SeedableRng + Send + 'static,
{
    /// Make a solver from the integration parameters, the process
    /// collaborator, and the factories producing walkers (from an owned RNG
    /// and a thread id) and accumulators (from a thread id).
    pub fn new<C, FW, FA>(
        params: MciParameters,
        concurrency: &C,
        walker_factory: FW,
        accumulator_factory: FA,
    ) -> Result<Self, SolverError>
    where
        C: Concurrency,
        FW: Fn(R, usize) -> W + Send + Sync + 'static,
        FA: Fn(usize) -> A + Send + Sync + 'static,
    {
        if params.walkers == 0 || params.accumulators == 0 {
            return Err(SolverError::InvalidThreadCounts {
                walkers: params.walkers,
                accumulators: params.accumulators,
            });
        }

        let task_handler = ThreadTaskHandler::new(
            params.walkers,
            params.accumulators,
            params.shared_walk_and_accumulation_thread,
        );

        let process_id = concurrency.id();
        let n_processes = concurrency.number_of_processors();
        let on_first_process = process_id == concurrency.first();
        let rng_vector = seed_rngs(
            params.walkers,
            process_id,
            n_processes,
            params.seed.resolve(),
            0,
        );

        let accumulator_factory: Arc<dyn Fn(usize) -> A + Send + Sync> =
            Arc::new(accumulator_factory);
        let global_accumulator = Arc::new(Mutex::new((*accumulator_factory)(task_handler.size())));

        // Make sure enough workers exist before any thread is needed.
        ThreadPool::global().enlarge(task_handler.size());

        let n_walkers = params.walkers;
        let n_accumulators = params.accumulators;
        Ok(Self {
            params,
            process_id,
            n_processes,
            on_first_process,
            task_handler,
            walker_factory: Arc::new(walker_factory),
            accumulator_factory,
            rng_vector,
            config_dump: vec![ConfigBuffer::new(); n_walkers],
            walker_fingerprints: vec![0; n_walkers],
            accum_fingerprints: vec![0; n_accumulators],
            global_accumulator,
            dca_iteration: 0,
            configs_loaded: false,
            total_time: 0.0,
        })
    }

    /// Reset the run state for one self-consistency iteration. Stored walker
    /// configurations are loaded from disk on the first call only.
    pub fn initialize(&mut self, dca_iteration: usize) {
        self.dca_iteration = dca_iteration;
        self.global_accumulator.lock().unwrap().initialize(dca_iteration);
        if !self.configs_loaded {
            self.configs_loaded = true;
            self.load_configurations();
        }
    }

    /// Run the integration: spawn one task per table entry, block until all
    /// have finished, then finalize the merged estimators.
    pub fn integrate(&mut self) {
        if self.on_first_process {
            log::info!(
                "threaded QMC integration started: {} walkers, {} accumulators",
                self.params.walkers,
                self.params.accumulators
            );
            self.task_handler.print();
        }

        let ctx = Arc::new(RunContext {
            queue: Mutex::new(Vec::new()),
            queue_cv: Condvar::new(),
            walk_finished: AtomicUsize::new(0),
            measurements_done: AtomicUsize::new(0),
            n_walkers: self.params.walkers,
            warm_up_sweeps: self.params.warm_up_sweeps,
            fix_meas_per_walker: self.params.fix_meas_per_walker,
            process_measurements: get_workload(
                self.params.measurements,
                self.n_processes,
                self.process_id,
            ),
            dca_iteration: self.dca_iteration,
            on_first_process: self.on_first_process,
            global: Arc::clone(&self.global_accumulator),
            configs_out: Mutex::new(vec![ConfigBuffer::new(); self.params.walkers]),
            walker_fingerprints: Mutex::new(vec![0; self.params.walkers]),
            accum_fingerprints: Mutex::new(vec![0; self.params.accumulators]),
        });

        let pool = ThreadPool::global();
        pool.enlarge(self.task_handler.size());

        let mut rngs: Vec<Option<R>> = std::mem::take(&mut self.rng_vector)
            .into_iter()
            .map(Some)
            .collect();

        let start = Instant::now();
        let mut handles = Vec::with_capacity(self.task_handler.size());
        for id in 0..self.task_handler.size() {
            match self.task_handler.task(id) {
                ThreadTask::Walker { rng_index } => {
                    let ctx = Arc::clone(&ctx);
                    let factory = Arc::clone(&self.walker_factory);
                    let rng = rngs[rng_index].take().expect("one walker per rng stream");
                    let config = self.config_dump[rng_index].clone();
                    handles.push(pool.enqueue(move || {
                        run_walker(ctx, factory, rng, id, rng_index, config)
                    }));
                }
                ThreadTask::Accumulator => {
                    let ctx = Arc::clone(&ctx);
                    let factory = Arc::clone(&self.accumulator_factory);
                    let accum_index = self.task_handler.id_to_accum_index(id);
                    handles.push(
                        pool.enqueue(move || run_accumulator(ctx, factory, id, accum_index)),
                    );
                }
                ThreadTask::WalkerAndAccumulator { rng_index } => {
                    let ctx = Arc::clone(&ctx);
                    let walker_factory = Arc::clone(&self.walker_factory);
                    let accumulator_factory = Arc::clone(&self.accumulator_factory);
                    let rng = rngs[rng_index].take().expect("one walker per rng stream");
                    let config = self.config_dump[rng_index].clone();
                    let accum_index = self.task_handler.id_to_accum_index(id);
                    handles.push(pool.enqueue(move || {
                        run_walker_and_accumulator(
                            ctx,
                            walker_factory,
                            accumulator_factory,
                            rng,
                            id,
                            accum_index,
                            config,
                        )
                    }));
                }
            }
        }
        for handle in handles {
            handle.join();
        }
        assert_eq!(
            ctx.walk_finished.load(Ordering::SeqCst),
            self.params.walkers
        );
        self.total_time = start.elapsed().as_secs_f64();

        let ctx = Arc::try_unwrap(ctx)
            .ok()
            .expect("all integration tasks have joined");
        self.config_dump = ctx.configs_out.into_inner().unwrap();
        self.walker_fingerprints = ctx.walker_fingerprints.into_inner().unwrap();
        self.accum_fingerprints = ctx.accum_fingerprints.into_inner().unwrap();

        self.log_fingerprints();
        self.global_accumulator.lock().unwrap().finalize();

        // Fresh, non-repeating streams for the next iteration.
        self.rng_vector = seed_rngs(
            self.params.walkers,
            self.process_id,
            self.n_processes,
            self.params.seed.resolve(),
            self.dca_iteration + 1,
        );
    }

    /// Close out the current iteration. On the last self-consistency
    /// iteration the walker configurations are written to disk, if a write
    /// directory is configured.
    pub fn finalize(&mut self) -> IntegrationSummary {
        if self.dca_iteration + 1 >= self.params.dca_iterations {
            self.store_configurations();
        }
        IntegrationSummary {
            total_time: self.total_time,
            measurements: self.params.measurements,
            walker_fingerprints: self.walker_fingerprints.clone(),
            accumulator_fingerprints: self.accum_fingerprints.clone(),
            static_accumulator_fingerprint: A::static_device_fingerprint(),
        }
    }

    /// The merged global estimator.
    pub fn accumulator(&self) -> MutexGuard<'_, A> {
        self.global_accumulator.lock().unwrap()
    }

    /// Consume the solver and hand out the merged global estimator.
    pub fn into_accumulator(self) -> A {
        let Self {
            global_accumulator, ..
        } = self;
        Arc::try_unwrap(global_accumulator)
            .ok()
            .expect("no integration is running")
            .into_inner()
            .unwrap()
    }

    /// The integration parameters.
    pub fn parameters(&self) -> &MciParameters {
        &self.params
    }

    /// Wall time of the last `integrate` call, in seconds.
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Serialized walker configurations from the last `integrate` call, by
    /// walker index.
    pub fn config_dump(&self) -> &[ConfigBuffer] {
        &self.config_dump
    }

    /// Device bytes owned by each walker, by walker index.
    pub fn walker_fingerprints(&self) -> &[usize] {
        &self.walker_fingerprints
    }

    /// Device bytes owned by each accumulator, by accumulator index.
    pub fn accumulator_fingerprints(&self) -> &[usize] {
        &self.accum_fingerprints
    }

    fn load_configurations(&mut self) {
        let dir = match &self.params.config_read_dir {
            Some(dir) => dir.clone(),
            None => return,
        };
        match read_configurations(&dir, self.process_id, self.params.walkers) {
            Ok(configs) => {
                log::info!("restored {} walker configurations", configs.len());
                self.config_dump = configs;
            }
            Err(err) => {
                log::error!("could not read the stored configurations: {}", err);
                self.config_dump = vec![ConfigBuffer::new(); self.params.walkers];
            }
        }
    }

    fn store_configurations(&self) {
        let dir = match &self.params.config_write_dir {
            Some(dir) => dir,
            None => return,
        };
        if let Err(err) = write_configurations(dir, self.process_id, &self.config_dump) {
            log::error!("could not write the configuration: {}", err);
        }
    }

    fn log_fingerprints(&self) {
        if !self.on_first_process {
            return;
        }
        log::info!(
            "threaded integration ended: {} measurements in {:.3} s",
            self.params.measurements,
            self.total_time
        );
        for (index, fingerprint) in self.walker_fingerprints.iter().enumerate() {
            log::debug!(
                "walker {} fingerprint: {:.6} MB",
                index,
                *fingerprint as f64 * 1e-6
            );
        }
        for (index, fingerprint) in self.accum_fingerprints.iter().enumerate() {
            log::debug!(
                "accumulator {} fingerprint: {:.6} MB",
                index,
                *fingerprint as f64 * 1e-6
            );
        }
        log::debug!(
            "static accumulator fingerprint: {:.6} MB",
            A::static_device_fingerprint() as f64 * 1e-6
        );
    }
}
