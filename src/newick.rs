//! Newick reader and writer for [`PhyloTree`].
//!
//! Supported: nested clades, bare or single-quoted labels (`''` escapes a
//! quote), `:length` suffixes, whitespace and `[...]` comments. Only the first
//! tree of a multi-tree file is read.

use crate::error::EngineError;
use crate::phylogeny::{Clade, CladeId, PhyloTree};

const LABEL_STOP: &[u8] = b"(),:;[";
const NEEDS_QUOTES: &[u8] = b"(),:;[]' \t\r\n";

pub fn parse(text: &str) -> Result<PhyloTree, EngineError> {
    let mut parser = Parser {
        text: text.as_bytes(),
        pos: 0,
        clades: vec![],
    };
    parser.skip_blank()?;
    if parser.peek().is_none() {
        return Err(EngineError::configuration("Newick text contains no tree"));
    }
    let root = parser.parse_clade()?;
    parser.skip_blank()?;
    match parser.peek() {
        Some(b';') | None => {}
        Some(c) => return Err(parser.error(&format!("expected ';', found '{}'", c as char))),
    }
    PhyloTree::from_parts(parser.clades, root)
}

pub fn write(tree: &PhyloTree) -> String {
    let mut out = String::new();
    write_clade(tree, tree.root(), &mut out);
    out.push(';');
    out
}

struct Parser<'a> {
    text: &'a [u8],
    pos: usize,
    clades: Vec<Clade>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.text.get(self.pos).copied()
    }

    fn error(&self, what: &str) -> EngineError {
        EngineError::configuration(format!("Malformed Newick at byte {}: {what}", self.pos))
    }

    fn skip_blank(&mut self) -> Result<(), EngineError> {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.pos += 1;
            } else if c == b'[' {
                let start = self.pos;
                match self.text[start..].iter().position(|&c| c == b']') {
                    Some(end) => self.pos = start + end + 1,
                    None => return Err(self.error("unterminated comment")),
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Reads one clade and everything nested in it. Open clades are kept on
    /// an explicit stack so nesting depth is bounded by memory only.
    fn parse_clade(&mut self) -> Result<CladeId, EngineError> {
        // child lists of clades whose '(' has been read but not their ')'
        let mut open: Vec<Vec<CladeId>> = vec![];
        loop {
            self.skip_blank()?;
            if self.peek() == Some(b'(') {
                self.pos += 1;
                open.push(vec![]);
                continue;
            }
            let mut id = self.finish_clade(vec![])?;
            loop {
                let Some(mut siblings) = open.pop() else {
                    return Ok(id);
                };
                siblings.push(id);
                self.skip_blank()?;
                match self.peek() {
                    Some(b',') => {
                        self.pos += 1;
                        open.push(siblings);
                        break;
                    }
                    Some(b')') => {
                        self.pos += 1;
                        id = self.finish_clade(siblings)?;
                    }
                    Some(c) => {
                        let found = c as char;
                        return Err(self.error(&format!("expected ',' or ')', found '{found}'")));
                    }
                    None => return Err(self.error("unbalanced parentheses")),
                }
            }
        }
    }

    fn finish_clade(&mut self, children: Vec<CladeId>) -> Result<CladeId, EngineError> {
        let name = self.parse_label()?;
        self.skip_blank()?;
        let branch_length = if self.peek() == Some(b':') {
            self.pos += 1;
            Some(self.parse_length()?)
        } else {
            None
        };
        self.clades.push(Clade {
            name,
            branch_length,
            children,
        });
        Ok(self.clades.len() - 1)
    }

    fn parse_label(&mut self) -> Result<Option<String>, EngineError> {
        self.skip_blank()?;
        if self.peek() == Some(b'\'') {
            self.pos += 1;
            let mut label = Vec::new();
            loop {
                match self.peek() {
                    Some(b'\'') if self.text.get(self.pos + 1) == Some(&b'\'') => {
                        label.push(b'\'');
                        self.pos += 2;
                    }
                    Some(b'\'') => {
                        self.pos += 1;
                        break;
                    }
                    Some(c) => {
                        label.push(c);
                        self.pos += 1;
                    }
                    None => return Err(self.error("unterminated quoted label")),
                }
            }
            return Ok(Some(String::from_utf8_lossy(&label).to_string()));
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if LABEL_STOP.contains(&c) || c.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Ok(None);
        }
        Ok(Some(
            String::from_utf8_lossy(&self.text[start..self.pos]).to_string(),
        ))
    }

    fn parse_length(&mut self) -> Result<f64, EngineError> {
        self.skip_blank()?;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, b'.' | b'-' | b'+' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let raw = String::from_utf8_lossy(&self.text[start..self.pos]);
        raw.parse::<f64>()
            .map_err(|_| self.error(&format!("invalid branch length '{raw}'")))
    }
}

enum WriteStep {
    Enter(CladeId),
    Exit(CladeId),
    Comma,
}

fn write_clade(tree: &PhyloTree, root: CladeId, out: &mut String) {
    let mut stack = vec![WriteStep::Enter(root)];
    while let Some(step) = stack.pop() {
        match step {
            WriteStep::Enter(id) => {
                let Some(clade) = tree.clade(id) else {
                    continue;
                };
                if clade.is_leaf() {
                    write_suffix(clade, out);
                    continue;
                }
                out.push('(');
                stack.push(WriteStep::Exit(id));
                for (i, child) in clade.children.iter().enumerate().rev() {
                    stack.push(WriteStep::Enter(*child));
                    if i > 0 {
                        stack.push(WriteStep::Comma);
                    }
                }
            }
            WriteStep::Exit(id) => {
                out.push(')');
                if let Some(clade) = tree.clade(id) {
                    write_suffix(clade, out);
                }
            }
            WriteStep::Comma => out.push(','),
        }
    }
}

fn write_suffix(clade: &Clade, out: &mut String) {
    if let Some(name) = clade.name() {
        out.push_str(&quote_label(name));
    }
    if let Some(bl) = clade.branch_length {
        out.push(':');
        out.push_str(&bl.to_string());
    }
}

fn quote_label(name: &str) -> String {
    if name.is_empty() || name.bytes().any(|c| NEEDS_QUOTES.contains(&c)) {
        format!("'{}'", name.replace('\'', "''"))
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structure() {
        let tree = parse("((A:0.1,B:0.2)AB:0.3,C:0.4):0.0;").unwrap();
        let root = tree.clade(tree.root()).unwrap();
        assert_eq!(root.branch_length, Some(0.0));
        assert_eq!(root.children.len(), 2);
        let ab = tree.clade(root.children[0]).unwrap();
        assert_eq!(ab.name(), Some("AB"));
        assert_eq!(ab.branch_length, Some(0.3));
        assert_eq!(tree.leaf_names(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_parse_whitespace_comments_and_quotes() {
        let text = " ( 'Apis mellifera' : 1.5 [note] ,\n 'it''s':2 , Apis_cerana ) ;\n";
        let tree = parse(text).unwrap();
        assert_eq!(
            tree.leaf_names(),
            vec!["Apis mellifera", "it's", "Apis_cerana"]
        );
        let first = tree.clade(tree.children(tree.root())[0]).unwrap();
        assert_eq!(first.branch_length, Some(1.5));
        assert_eq!(tree.clade(tree.children(tree.root())[2]).unwrap().branch_length, None);
    }

    #[test]
    fn test_write_is_stable() {
        let text = "((A:0.1,B:0.2):0.3,'x y':1e-3);";
        let tree = parse(text).unwrap();
        let written = write(&tree);
        assert_eq!(written, "((A:0.1,B:0.2):0.3,'x y':0.001);");
        assert_eq!(parse(&written).unwrap(), tree);
    }

    #[test]
    fn test_only_first_tree_is_read() {
        let tree = parse("(A,B);(C,D,E);").unwrap();
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn test_malformed_inputs() {
        for text in ["", "   ", "((A,B);", "(A,B)) ;", "(A:abc,B);", "(A[x,B);", "('A,B);"] {
            let err = parse(text).unwrap_err();
            assert_eq!(err.code, crate::error::ErrorCode::Configuration, "{text}");
        }
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let depth = 100_000;
        let text = format!("{}A:1{};", "(".repeat(depth), ")".repeat(depth));
        let tree = parse(&text).unwrap();
        assert_eq!(tree.clade_count(), depth + 1);
        assert_eq!(tree.leaf_names(), vec!["A"]);
        assert_eq!(write(&tree), text);
    }

    #[test]
    fn test_long_ladder_round_trips() {
        let leaves = 20_000;
        let mut text = "(".repeat(leaves - 1);
        text.push_str("L0:1");
        for i in 1..leaves {
            text.push_str(&format!(",L{i}:1)"));
            if i < leaves - 1 {
                text.push_str(":1");
            }
        }
        text.push(';');
        let tree = parse(&text).unwrap();
        assert_eq!(tree.leaf_count(), leaves);
        assert_eq!(write(&tree), text);
    }

    #[test]
    fn test_deep_tree_on_small_worker_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let depth = 50_000;
                let text = format!("{}X{};", "(".repeat(depth), ")".repeat(depth));
                let mut tree = parse(&text).unwrap();
                tree.insert_branch("X", "Y", 0.1).unwrap();
                tree.leaf_count()
            })
            .unwrap();
        assert_eq!(handle.join().unwrap(), 2);
    }

    #[test]
    fn test_negative_length_rejected() {
        assert!(parse("(A:-1,B:1);").is_err());
    }
}
