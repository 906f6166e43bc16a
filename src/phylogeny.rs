use crate::error::EngineError;
use crate::newick;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, path::Path};

pub type CladeId = usize;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clade {
    pub name: Option<String>,
    pub branch_length: Option<f64>,
    pub children: Vec<CladeId>,
}

impl Clade {
    pub fn leaf(name: &str, branch_length: f64) -> Self {
        Self {
            name: Some(name.to_string()),
            branch_length: Some(branch_length),
            children: vec![],
        }
    }

    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Rooted tree stored as an arena; clades refer to their children by index.
///
/// Clade ids are stable for the lifetime of the tree: nodes are only ever
/// appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhyloTree {
    clades: Vec<Clade>,
    root: CladeId,
}

impl Default for PhyloTree {
    fn default() -> Self {
        Self {
            clades: vec![Clade::default()],
            root: 0,
        }
    }
}

impl PhyloTree {
    pub fn from_parts(clades: Vec<Clade>, root: CladeId) -> Result<Self, EngineError> {
        let tree = Self { clades, root };
        tree.validate()?;
        Ok(tree)
    }

    #[inline(always)]
    pub fn root(&self) -> CladeId {
        self.root
    }

    pub fn clade(&self, id: CladeId) -> Option<&Clade> {
        self.clades.get(id)
    }

    pub fn children(&self, id: CladeId) -> &[CladeId] {
        self.clades
            .get(id)
            .map(|c| c.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn clade_count(&self) -> usize {
        self.clades.len()
    }

    pub fn add_child(&mut self, parent: CladeId, clade: Clade) -> Result<CladeId, EngineError> {
        if parent >= self.clades.len() {
            return Err(EngineError::not_found(format!("No clade with id {parent}")));
        }
        let id = self.clades.len();
        self.clades.push(clade);
        self.clades[parent].children.push(id);
        Ok(id)
    }

    /// Clade ids in pre-order: a node, then each child subtree left to right.
    pub fn preorder(&self) -> Vec<CladeId> {
        let mut order = Vec::with_capacity(self.clades.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    pub fn find_clade(&self, name: &str) -> Option<CladeId> {
        self.preorder()
            .into_iter()
            .find(|id| self.clades[*id].name() == Some(name))
    }

    pub fn leaves(&self) -> Vec<CladeId> {
        self.preorder()
            .into_iter()
            .filter(|id| self.clades[*id].is_leaf())
            .collect()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    pub fn leaf_names(&self) -> Vec<&str> {
        self.leaves()
            .into_iter()
            .filter_map(|id| self.clades[id].name())
            .collect()
    }

    /// Grafts `new_name` below the first clade named `parent_name`.
    ///
    /// A leaf parent is split: it loses its name, keeps its own branch length,
    /// and gets two children, the original species and the new one, both at
    /// `branch_length`. An internal parent just gains one more child. Returns
    /// the id of the new leaf. On error the tree is left untouched.
    pub fn insert_branch(
        &mut self,
        parent_name: &str,
        new_name: &str,
        branch_length: f64,
    ) -> Result<CladeId, EngineError> {
        if !branch_length.is_finite() || branch_length < 0.0 {
            return Err(EngineError::invalid_input(format!(
                "Branch length must be a non-negative number, got {branch_length}"
            )));
        }
        let parent = self.find_clade(parent_name).ok_or_else(|| {
            EngineError::not_found(format!("Parent species {parent_name} not found in tree."))
        })?;

        if self.clades[parent].is_leaf() {
            let old_name = self.clades[parent].name.take();
            let kept = self.clades.len();
            self.clades.push(Clade {
                name: old_name,
                branch_length: Some(branch_length),
                children: vec![],
            });
            let new_leaf = self.clades.len();
            self.clades.push(Clade::leaf(new_name, branch_length));
            self.clades[parent].children = vec![kept, new_leaf];
            debug!("Split leaf '{parent_name}' to hold '{new_name}'");
            Ok(new_leaf)
        } else {
            let id = self.add_child(parent, Clade::leaf(new_name, branch_length))?;
            debug!("Appended '{new_name}' below internal clade '{parent_name}'");
            Ok(id)
        }
    }

    /// Checks that every clade is reachable exactly once from the root, that
    /// branch lengths are non-negative, and that leaf names are unique.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.root >= self.clades.len() {
            return Err(EngineError::configuration("Tree root is out of range"));
        }
        let mut seen = vec![false; self.clades.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if id >= self.clades.len() || seen[id] {
                return Err(EngineError::configuration(format!(
                    "Clade {id} is referenced more than once or does not exist"
                )));
            }
            seen[id] = true;
            stack.extend(self.clades[id].children.iter().copied());
        }
        if seen.iter().any(|s| !s) {
            return Err(EngineError::configuration(
                "Tree contains clades unreachable from the root",
            ));
        }
        if let Some(bl) = self
            .clades
            .iter()
            .filter_map(|c| c.branch_length)
            .find(|bl| !bl.is_finite() || *bl < 0.0)
        {
            return Err(EngineError::configuration(format!(
                "Invalid branch length {bl}"
            )));
        }
        let mut names = HashSet::new();
        for name in self.leaf_names() {
            if !names.insert(name) {
                return Err(EngineError::configuration(format!(
                    "Leaf name '{name}' occurs more than once"
                )));
            }
        }
        Ok(())
    }

    pub fn from_newick(text: &str) -> Result<Self, EngineError> {
        newick::parse(text)
    }

    pub fn to_newick(&self) -> String {
        newick::write(self)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            EngineError::configuration(format!(
                "Could not read tree file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_newick(&text).map_err(|e| {
            EngineError::configuration(format!(
                "Could not parse tree file '{}': {}",
                path.display(),
                e.message
            ))
        })
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), EngineError> {
        std::fs::write(path, format!("{}\n", self.to_newick())).map_err(|e| {
            EngineError::configuration(format!(
                "Could not write tree file '{}': {e}",
                path.display()
            ))
        })
    }
}

impl fmt::Display for PhyloTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_newick())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = "((Apis_mellifera:0.5,Apis_cerana:0.4):0.2,Apis_dorsata:0.9);";

    #[test]
    fn test_preorder_and_leaves() {
        let tree = PhyloTree::from_newick(TREE).unwrap();
        assert_eq!(
            tree.leaf_names(),
            vec!["Apis_mellifera", "Apis_cerana", "Apis_dorsata"]
        );
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.preorder().len(), tree.clade_count());
        assert_eq!(tree.preorder()[0], tree.root());
    }

    #[test]
    fn test_insert_on_leaf_splits_it() {
        let mut tree = PhyloTree::from_newick(TREE).unwrap();
        let target = tree.find_clade("Apis_dorsata").unwrap();
        let new_leaf = tree.insert_branch("Apis_dorsata", "Evolved_dorsata_4", 0.1).unwrap();

        assert_eq!(tree.leaf_count(), 4);
        let node = tree.clade(target).unwrap();
        assert_eq!(node.name, None);
        assert_eq!(node.branch_length, Some(0.9));
        assert_eq!(node.children.len(), 2);
        let kept = tree.clade(node.children[0]).unwrap();
        assert_eq!(kept.name(), Some("Apis_dorsata"));
        assert_eq!(kept.branch_length, Some(0.1));
        assert_eq!(node.children[1], new_leaf);
        assert_eq!(
            tree.clade(new_leaf).unwrap(),
            &Clade::leaf("Evolved_dorsata_4", 0.1)
        );
        tree.validate().unwrap();
        assert_eq!(
            tree.to_newick(),
            "((Apis_mellifera:0.5,Apis_cerana:0.4):0.2,(Apis_dorsata:0.1,Evolved_dorsata_4:0.1):0.9);"
        );
    }

    #[test]
    fn test_insert_on_internal_appends_child() {
        let mut tree = PhyloTree::from_newick("((A:1,B:1)Anc:0.5,C:2);").unwrap();
        let anc = tree.find_clade("Anc").unwrap();
        let before: Vec<Clade> = tree
            .children(anc)
            .iter()
            .map(|id| tree.clade(*id).unwrap().clone())
            .collect();
        tree.insert_branch("Anc", "New", 0.1).unwrap();
        assert_eq!(tree.leaf_count(), 4);
        let children = tree.children(anc);
        assert_eq!(children.len(), 3);
        for (id, old) in children.iter().zip(before.iter()) {
            assert_eq!(tree.clade(*id).unwrap(), old);
        }
        assert_eq!(tree.clade(children[2]).unwrap().name(), Some("New"));
    }

    #[test]
    fn test_insert_unknown_parent_leaves_tree_untouched() {
        let mut tree = PhyloTree::from_newick(TREE).unwrap();
        let before = tree.clone();
        let before_text = tree.to_newick();
        let err = tree.insert_branch("Apis_florea", "Evolved_florea_4", 0.1).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);
        assert!(err.message.contains("Apis_florea"));
        assert_eq!(tree, before);
        assert_eq!(tree.to_newick(), before_text);
    }

    #[test]
    fn test_insert_rejects_negative_branch_length() {
        let mut tree = PhyloTree::from_newick(TREE).unwrap();
        let before = tree.clone();
        let err = tree.insert_branch("Apis_cerana", "X", -1.0).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_first_match_in_preorder_wins() {
        // internal labels are matched as well as leaves
        let mut tree = PhyloTree::from_newick("((A:1,B:1)X:1,X2:1);").unwrap();
        tree.insert_branch("X", "N", 0.1).unwrap();
        assert_eq!(tree.to_newick(), "((A:1,B:1,N:0.1)X:1,X2:1);");
    }

    #[test]
    fn test_validate_rejects_duplicate_leaves() {
        let err = PhyloTree::from_newick("(A:1,A:2);").unwrap_err();
        assert!(err.message.contains("more than once"));
    }

    #[test]
    fn test_from_parts_rejects_shared_child() {
        let clades = vec![
            Clade::leaf("A", 1.0),
            Clade {
                name: None,
                branch_length: None,
                children: vec![0, 0],
            },
        ];
        assert!(PhyloTree::from_parts(clades, 1).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("tree.nwk");
        let tree = PhyloTree::from_newick(TREE).unwrap();
        tree.save_to_path(&path).unwrap();
        assert_eq!(PhyloTree::load_from_path(&path).unwrap(), tree);
        let err = PhyloTree::load_from_path(&td.path().join("missing.nwk")).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Configuration);
    }
}
