use crate::genes::{GeneRecord, GeneType, SpeciesGeneProfile};

pub const CONSENSUS_SPECIES: &str = "consensus";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDataReason {
    NoSequences,
    ZeroLength,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Consensus {
    Sequence(GeneRecord),
    NoData(NoDataReason),
}

impl Consensus {
    pub fn record(&self) -> Option<&GeneRecord> {
        match self {
            Self::Sequence(record) => Some(record),
            Self::NoData(_) => None,
        }
    }
}

/// Column-wise majority vote over every species' `gene_type` sequence.
///
/// All sequences are truncated to the shortest one. A tied column takes the
/// base that appeared first in that column, in profile order.
pub fn build_consensus(profile: &SpeciesGeneProfile, gene_type: GeneType) -> Consensus {
    let seqs: Vec<&[u8]> = profile
        .records_for(gene_type)
        .map(|record| record.sequence().as_bytes())
        .collect();
    let Some(min_len) = seqs.iter().map(|s| s.len()).min() else {
        return Consensus::NoData(NoDataReason::NoSequences);
    };
    if min_len == 0 {
        return Consensus::NoData(NoDataReason::ZeroLength);
    }

    let consensus: String = (0..min_len)
        .map(|i| majority_base(seqs.iter().map(|s| s[i])) as char)
        .collect();
    let id = format!("{gene_type}_consensus");
    Consensus::Sequence(
        GeneRecord::new(CONSENSUS_SPECIES, gene_type, &id, &consensus)
            .with_description("Consensus sequence"),
    )
}

fn majority_base(column: impl Iterator<Item = u8>) -> u8 {
    // (base, count) in first-seen order
    let mut tally: Vec<(u8, usize)> = Vec::with_capacity(4);
    for base in column {
        match tally.iter_mut().find(|(b, _)| *b == base) {
            Some((_, count)) => *count += 1,
            None => tally.push((base, 1)),
        }
    }
    let mut best = (b'N', 0);
    for (base, count) in tally {
        if count > best.1 {
            best = (base, count);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(seqs: &[(&str, &str)]) -> SpeciesGeneProfile {
        SpeciesGeneProfile::from_records(
            seqs.iter()
                .map(|(species, seq)| GeneRecord::new(species, GeneType::Aqp, species, seq)),
        )
    }

    #[test]
    fn test_majority_per_column() {
        let p = profile(&[("a", "ACGT"), ("b", "ACGA"), ("c", "TCGA")]);
        let consensus = build_consensus(&p, GeneType::Aqp);
        let record = consensus.record().unwrap();
        assert_eq!(record.sequence(), "ACGA");
        assert_eq!(record.id(), "AQP_consensus");
        assert_eq!(record.gene_type(), GeneType::Aqp);
    }

    #[test]
    fn test_truncates_to_shortest() {
        let p = profile(&[("a", "ACGTTT"), ("b", "ACG")]);
        assert_eq!(build_consensus(&p, GeneType::Aqp).record().unwrap().sequence(), "ACG");
    }

    #[test]
    fn test_tie_goes_to_first_seen_base() {
        // Column 0: T first, then G. Not alphabetic.
        let p = profile(&[("a", "TA"), ("b", "GA")]);
        assert_eq!(build_consensus(&p, GeneType::Aqp).record().unwrap().sequence(), "TA");
        let p = profile(&[("b", "GA"), ("a", "TA")]);
        assert_eq!(build_consensus(&p, GeneType::Aqp).record().unwrap().sequence(), "GA");
    }

    #[test]
    fn test_no_data() {
        let p = profile(&[("a", "ACGT")]);
        assert_eq!(
            build_consensus(&p, GeneType::Hsp90),
            Consensus::NoData(NoDataReason::NoSequences)
        );
        let p = profile(&[("a", "ACGT"), ("b", "")]);
        assert_eq!(
            build_consensus(&p, GeneType::Aqp),
            Consensus::NoData(NoDataReason::ZeroLength)
        );
        assert!(build_consensus(&p, GeneType::Aqp).record().is_none());
    }
}
