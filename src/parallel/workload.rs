use crate::parallel::Concurrency;

/// Share of `total` assigned to worker `id` out of `n_workers`: the floor of
/// the even split, plus one for the first `total % n_workers` workers. The
/// shares sum to `total` and differ by at most one.
pub fn get_workload(total: usize, n_workers: usize, id: usize) -> usize {
    assert!(n_workers >= 1, "workload split over zero workers");
    assert!(id < n_workers);
    total / n_workers + if id < total % n_workers { 1 } else { 0 }
}

/// Share of `total` assigned to this process.
pub fn get_process_workload<C: Concurrency>(total: usize, concurrency: &C) -> usize {
    get_workload(total, concurrency.number_of_processors(), concurrency.id())
}
