use crate::genes::GeneRecord;
use rand::{seq::SliceRandom, Rng};

pub const DEFAULT_MUTATION_RATE: f64 = 0.05;
pub const BASES: [u8; 4] = [b'A', b'T', b'C', b'G'];

/// Number of point substitutions applied to a sequence of `len` bases.
/// `rate` is clamped to `[0, 1]`.
pub fn mutation_count(len: usize, rate: f64) -> usize {
    let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
    ((len as f64 * rate).floor() as usize).max(1)
}

/// Applies `mutation_count` random point substitutions.
///
/// Positions are drawn independently, so one position can be hit more than
/// once. Each draw replaces whatever base is there at that moment with a
/// different one.
pub fn mutate_sequence<R: Rng + ?Sized>(
    record: &GeneRecord,
    rate: f64,
    rng: &mut R,
) -> GeneRecord {
    let mut seq = record.sequence().as_bytes().to_vec();
    if !seq.is_empty() {
        for _ in 0..mutation_count(seq.len(), rate) {
            let idx = rng.gen_range(0..seq.len());
            seq[idx] = substitute_base(seq[idx], rng);
        }
    }
    let id = format!("{}_mutated", record.id());
    GeneRecord::new(
        record.species(),
        record.gene_type(),
        &id,
        &String::from_utf8_lossy(&seq),
    )
    .with_description("Mutated sequence")
}

fn substitute_base<R: Rng + ?Sized>(current: u8, rng: &mut R) -> u8 {
    let choices: Vec<u8> = BASES.iter().copied().filter(|b| *b != current).collect();
    // `choices` always has at least three entries
    *choices.choose(rng).unwrap_or(&b'A')
}
