use crate::solver::SolverError;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Opaque serialized Markov-chain state of one walker. Empty means "no prior
/// state".
pub type ConfigBuffer = Vec<u8>;

/// Snapshot archive path for one process: `<dir>/process_<pid>.cbor`.
pub fn archive_path(dir: &Path, process_id: usize) -> PathBuf {
    dir.join(format!("process_{}.cbor", process_id))
}

fn slot_key(walker_index: usize) -> String {
    format!("configuration_{}", walker_index)
}

/// Store one buffer per walker index under the keys `configuration_<i>` in a
/// self-describing CBOR map.
pub fn write_configurations(
    dir: &Path,
    process_id: usize,
    configs: &[ConfigBuffer],
) -> Result<(), SolverError> {
    let map: BTreeMap<String, &ConfigBuffer> = configs
        .iter()
        .enumerate()
        .map(|(index, config)| (slot_key(index), config))
        .collect();
    let file = File::create(archive_path(dir, process_id))?;
    serde_cbor::to_writer(file, &map)?;
    Ok(())
}

/// Read back one buffer per walker index. A key missing from the archive
/// yields an empty buffer for that slot; any I/O or decoding failure is
/// returned to the caller, who degrades to empty buffers.
pub fn read_configurations(
    dir: &Path,
    process_id: usize,
    n_walkers: usize,
) -> Result<Vec<ConfigBuffer>, SolverError> {
    let file = File::open(archive_path(dir, process_id))?;
    let map: BTreeMap<String, ConfigBuffer> = serde_cbor::from_reader(BufReader::new(file))?;
    Ok((0..n_walkers)
        .map(|index| map.get(&slot_key(index)).cloned().unwrap_or_default())
        .collect())
}
