//! Binary encode/decode for the state-point layout.
//!
//! All values are little-endian with no alignment padding. Counts and
//! indices are `u32`; the seed and particle count are `u64`; every float is
//! an `f64`. Array lengths are implied by earlier fields, and under
//! [`Layout::Framed`] are additionally written as a `u32` prefix.

use std::io::{Read, Write};

use carlo_core::{
    CriticalityHistory, GlobalTallies, RunConfig, RunMode, TallyAccumulator, TallyCell, TallyId,
    N_GLOBAL_TALLIES,
};
use indexmap::IndexMap;
use tracing::debug;

use crate::error::StatePointError;
use crate::types::{Layout, ProducerVersion, StatePointHeader};

/// Upper bound on speculative preallocation when the length comes from the
/// file; larger arrays grow as their bytes actually arrive.
const MAX_PREALLOC: usize = 1 << 16;

// ── Primitive writers ───────────────────────────────────────────

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), StatePointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), StatePointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), StatePointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a float array, length-prefixed under [`Layout::Framed`].
pub fn write_f64_array(
    w: &mut dyn Write,
    layout: Layout,
    field: &'static str,
    values: &[f64],
) -> Result<(), StatePointError> {
    if layout.is_framed() {
        let len = u32::try_from(values.len()).map_err(|_| StatePointError::MalformedField {
            field,
            detail: format!("{} elements do not fit a u32 prefix", values.len()),
        })?;
        write_u32_le(w, len)?;
    }
    for &v in values {
        write_f64_le(w, v)?;
    }
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, StatePointError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, StatePointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, StatePointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Read a float array of `len` elements.
///
/// Under [`Layout::Framed`] the stored prefix must equal `len`.
pub fn read_f64_array(
    r: &mut dyn Read,
    layout: Layout,
    field: &'static str,
    len: usize,
) -> Result<Vec<f64>, StatePointError> {
    if layout.is_framed() {
        let stored = read_u32_le(r)?;
        if stored as usize != len {
            return Err(StatePointError::MalformedField {
                field,
                detail: format!("length prefix {stored} does not match expected {len}"),
            });
        }
    }
    let mut values = Vec::with_capacity(len.min(MAX_PREALLOC));
    for _ in 0..len {
        values.push(read_f64_le(r)?);
    }
    Ok(values)
}

// ── Header ──────────────────────────────────────────────────────

/// Encode the revision and producer version.
pub fn encode_header(w: &mut dyn Write, header: &StatePointHeader) -> Result<(), StatePointError> {
    write_u32_le(w, header.revision)?;
    write_u32_le(w, header.version.major)?;
    write_u32_le(w, header.version.minor)?;
    write_u32_le(w, header.version.release)?;
    Ok(())
}

/// Decode the revision tag. Nothing else is consumed.
pub fn decode_revision(r: &mut dyn Read) -> Result<u32, StatePointError> {
    read_u32_le(r)
}

/// Decode the producer version triple.
pub fn decode_version(r: &mut dyn Read) -> Result<ProducerVersion, StatePointError> {
    Ok(ProducerVersion {
        major: read_u32_le(r)?,
        minor: read_u32_le(r)?,
        release: read_u32_le(r)?,
    })
}

// ── Run section ─────────────────────────────────────────────────

/// Encode the seed, run configuration, and checkpoint batch.
pub fn encode_run(
    w: &mut dyn Write,
    seed: u64,
    config: &RunConfig,
    batch: u32,
) -> Result<(), StatePointError> {
    write_u64_le(w, seed)?;
    write_u32_le(w, config.run_mode.tag())?;
    write_u64_le(w, config.n_particles)?;
    write_u32_le(w, config.n_batches)?;
    write_u32_le(w, config.n_inactive)?;
    write_u32_le(w, config.gen_per_batch)?;
    write_u32_le(w, batch)?;
    Ok(())
}

/// Decode the seed, run configuration, and checkpoint batch.
pub fn decode_run(r: &mut dyn Read) -> Result<(u64, RunConfig, u32), StatePointError> {
    let seed = read_u64_le(r)?;
    let tag = read_u32_le(r)?;
    let run_mode = RunMode::from_tag(tag).ok_or(StatePointError::InvalidRunMode { tag })?;
    let config = RunConfig {
        run_mode,
        n_particles: read_u64_le(r)?,
        n_batches: read_u32_le(r)?,
        n_inactive: read_u32_le(r)?,
        gen_per_batch: read_u32_le(r)?,
    };
    let batch = read_u32_le(r)?;
    Ok((seed, config, batch))
}

// ── History section ─────────────────────────────────────────────

/// Encode k-effective (and entropy, if tracked) for batches `1..=batch`.
pub fn encode_history(
    w: &mut dyn Write,
    layout: Layout,
    history: &CriticalityHistory,
    batch: u32,
) -> Result<(), StatePointError> {
    let k = history
        .k_through(batch)
        .ok_or(StatePointError::MissingHistory { batch })?;
    write_f64_array(w, layout, "k_batch", k)?;
    if history.entropy_on() {
        let entropy = history
            .entropy_through(batch)
            .ok_or(StatePointError::MissingHistory { batch })?;
        write_f64_array(w, layout, "entropy", entropy)?;
    }
    debug!(batch, entropy = history.entropy_on(), "encoded history");
    Ok(())
}

/// Decode `batch` history entries.
pub fn decode_history(
    r: &mut dyn Read,
    layout: Layout,
    batch: u32,
    entropy_on: bool,
) -> Result<CriticalityHistory, StatePointError> {
    let len = batch as usize;
    let k = read_f64_array(r, layout, "k_batch", len)?;
    let entropy = if entropy_on {
        Some(read_f64_array(r, layout, "entropy", len)?)
    } else {
        None
    };
    CriticalityHistory::from_parts(k, entropy).ok_or_else(|| StatePointError::MalformedField {
        field: "entropy",
        detail: "entropy length differs from k_batch length".into(),
    })
}

// ── Global tallies ──────────────────────────────────────────────

/// Encode the global-tally count followed by all sums, then all sums of
/// squares.
pub fn encode_global_tallies(
    w: &mut dyn Write,
    layout: Layout,
    globals: &GlobalTallies,
) -> Result<(), StatePointError> {
    write_u32_le(w, N_GLOBAL_TALLIES as u32)?;
    let sums: Vec<f64> = globals.cells().iter().map(|c| c.sum).collect();
    let sums_sq: Vec<f64> = globals.cells().iter().map(|c| c.sum_sq).collect();
    write_f64_array(w, layout, "global_sum", &sums)?;
    write_f64_array(w, layout, "global_sum_sq", &sums_sq)?;
    Ok(())
}

/// Decode the global tallies, rejecting a count other than
/// [`N_GLOBAL_TALLIES`].
pub fn decode_global_tallies(
    r: &mut dyn Read,
    layout: Layout,
) -> Result<GlobalTallies, StatePointError> {
    let found = read_u32_le(r)?;
    if found as usize != N_GLOBAL_TALLIES {
        return Err(StatePointError::GlobalTallyCountMismatch {
            found,
            expected: N_GLOBAL_TALLIES as u32,
        });
    }
    let sums = read_f64_array(r, layout, "global_sum", N_GLOBAL_TALLIES)?;
    let sums_sq = read_f64_array(r, layout, "global_sum_sq", N_GLOBAL_TALLIES)?;

    let mut cells = [TallyCell::default(); N_GLOBAL_TALLIES];
    for (cell, (sum, sum_sq)) in cells.iter_mut().zip(sums.into_iter().zip(sums_sq)) {
        *cell = TallyCell { sum, sum_sq };
    }
    Ok(GlobalTallies::from_cells(cells))
}

// ── User tallies ────────────────────────────────────────────────

/// Encode the tally count and, per tally, its shape, sums, and sums of
/// squares.
pub fn encode_tallies(
    w: &mut dyn Write,
    layout: Layout,
    tallies: &IndexMap<TallyId, TallyAccumulator>,
) -> Result<(), StatePointError> {
    let count = u32::try_from(tallies.len()).map_err(|_| StatePointError::MalformedField {
        field: "tally_count",
        detail: format!("{} tallies do not fit a u32", tallies.len()),
    })?;
    write_u32_le(w, count)?;
    for tally in tallies.values() {
        let (n_filter, n_score) = tally.shape();
        write_u32_le(w, n_filter)?;
        write_u32_le(w, n_score)?;
        let sums: Vec<f64> = tally.cells().iter().map(|c| c.sum).collect();
        let sums_sq: Vec<f64> = tally.cells().iter().map(|c| c.sum_sq).collect();
        write_f64_array(w, layout, "tally_sum", &sums)?;
        write_f64_array(w, layout, "tally_sum_sq", &sums_sq)?;
    }
    debug!(count, "encoded tallies");
    Ok(())
}

/// Decode user tallies, checking the count and every shape against the
/// `allocated` accumulators before reading that tally's values.
pub fn decode_tallies(
    r: &mut dyn Read,
    layout: Layout,
    allocated: &IndexMap<TallyId, TallyAccumulator>,
) -> Result<IndexMap<TallyId, TallyAccumulator>, StatePointError> {
    let found = read_u32_le(r)?;
    if found as usize != allocated.len() {
        return Err(StatePointError::TallyCountMismatch {
            found,
            expected: allocated.len() as u32,
        });
    }

    let mut loaded = IndexMap::with_capacity(allocated.len());
    for (index, (&id, current)) in allocated.iter().enumerate() {
        let shape = (read_u32_le(r)?, read_u32_le(r)?);
        if shape != current.shape() {
            return Err(StatePointError::TallyShapeMismatch {
                index,
                id,
                found: shape,
                expected: current.shape(),
            });
        }
        let sums = read_f64_array(r, layout, "tally_sum", current.len())?;
        let sums_sq = read_f64_array(r, layout, "tally_sum_sq", current.len())?;

        let mut tally = TallyAccumulator::new(id, shape.0, shape.1);
        for (cell, (sum, sum_sq)) in tally
            .cells_mut()
            .iter_mut()
            .zip(sums.into_iter().zip(sums_sq))
        {
            *cell = TallyCell { sum, sum_sq };
        }
        loaded.insert(id, tally);
    }
    debug!(count = found, "decoded tallies");
    Ok(loaded)
}
