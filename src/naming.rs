use crate::phylogeny::PhyloTree;

pub const GENUS_PREFIX: &str = "Apis_";
pub const EVOLVED_PREFIX: &str = "Evolved_";

/// `Evolved_<species part>_<leaf count + 1>`, counted on the tree before insertion.
pub fn evolved_species_name(parent: &str, tree: &PhyloTree) -> String {
    let species_part = parent.strip_prefix(GENUS_PREFIX).unwrap_or(parent);
    format!("{EVOLVED_PREFIX}{species_part}_{}", tree.leaf_count() + 1)
}

/// Canonical leaf label for a species: `Apis_<lowercase species part>`.
///
/// The genus prefix is matched case-insensitively; everything after its
/// underscore is the species part.
pub fn canonical_species_label(name: &str) -> String {
    let species_part = if name.to_ascii_lowercase().starts_with("apis_") {
        name.split_once('_').map(|(_, rest)| rest).unwrap_or("")
    } else {
        name
    };
    format!("{GENUS_PREFIX}{}", species_part.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evolved_name_counts_leaves() {
        let tree = PhyloTree::from_newick("((Apis_mellifera:1,Apis_cerana:1):1,Apis_dorsata:2);")
            .unwrap();
        assert_eq!(
            evolved_species_name("Apis_mellifera", &tree),
            "Evolved_mellifera_4"
        );
        assert_eq!(evolved_species_name("florea", &tree), "Evolved_florea_4");
    }

    #[test]
    fn test_evolved_name_strips_only_leading_prefix() {
        let tree = PhyloTree::from_newick("(A:1);").unwrap();
        assert_eq!(
            evolved_species_name("Apis_x_Apis_y", &tree),
            "Evolved_x_Apis_y_2"
        );
    }

    #[test]
    fn test_canonical_label() {
        assert_eq!(canonical_species_label("Apis_Mellifera"), "Apis_mellifera");
        assert_eq!(canonical_species_label("APIS_cerana"), "Apis_cerana");
        assert_eq!(canonical_species_label("Dorsata"), "Apis_dorsata");
        assert_eq!(canonical_species_label("apis_"), "Apis_");
    }
}
