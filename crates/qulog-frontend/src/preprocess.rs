//! AST preprocessing before code generation
//!
//! One walk over the tree rejects unimplemented constructs, collects every
//! atom name mentioned outside predicate-head position, assigns the atoms
//! stable integer encodings, picks the atom and integer bit widths, and
//! groups clauses by `name/arity` in textual order.

use crate::ast::{Node, NodeKind};
use crate::error::{CompileError, Result};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Caller-supplied compilation parameters
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of this program, for generated-file headers
    pub prog_name: String,
    /// Name of the input file, for headers and diagnostics
    pub in_file_name: String,
    /// Minimum integer width in bits
    pub int_bits: u32,
}

/// Derived program state, written once here and read-only thereafter
#[derive(Debug)]
pub struct Analysis<'a> {
    /// All atom names except predicate-head names, sorted; the index is the
    /// atom's hardware encoding
    pub int_to_sym: Vec<String>,
    /// Reverse of `int_to_sym`
    pub sym_to_int: HashMap<String, usize>,
    /// Bits used to encode one atom
    pub sym_bits: u32,
    /// Bits used to encode one unsigned integer
    pub int_bits: u32,
    /// Clauses grouped by `name/arity`, preserving source order within and
    /// across groups
    pub top_level: IndexMap<String, Vec<&'a Node>>,
}

/// Number of bits needed to represent the nonnegative value `n`
fn bits_for(n: u64) -> u32 {
    if n == 0 {
        0
    } else {
        u64::BITS - n.leading_zeros()
    }
}

/// Preprocess a parsed program
pub fn preprocess<'a>(program: &'a Node, config: &Config) -> Result<Analysis<'a>> {
    reject_unimplemented(program)?;

    let mut names = BTreeSet::new();
    collect_atom_names(program, &mut names);
    let int_to_sym: Vec<String> = names.into_iter().collect();
    let sym_to_int: HashMap<String, usize> = int_to_sym
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect();

    let max_sym = (int_to_sym.len() as u64).saturating_sub(1);
    let sym_bits = bits_for(max_sym).max(1);
    let int_bits = config
        .int_bits
        .max(bits_for(program.max_numeral()))
        .max(bits_for(max_sym))
        .max(1);

    let mut top_level = IndexMap::new();
    group_clauses(program, &mut top_level)?;

    debug!(
        symbols = int_to_sym.len(),
        sym_bits,
        int_bits,
        groups = top_level.len(),
        "preprocessed program"
    );

    Ok(Analysis {
        int_to_sym,
        sym_to_int,
        sym_bits,
        int_bits,
        top_level,
    })
}

/// Fail on constructs the hardware translation does not handle
fn reject_unimplemented(node: &Node) -> Result<()> {
    let construct = match node.kind {
        NodeKind::List => Some("lists"),
        NodeKind::Structure => Some("compound structures"),
        _ => None,
    };
    if let Some(construct) = construct {
        return Err(CompileError::Unimplemented {
            construct,
            span: node.span,
        });
    }
    for child in &node.children {
        reject_unimplemented(child)?;
    }
    Ok(())
}

/// Collect every atom name except the head name of each clause and query
fn collect_atom_names(node: &Node, names: &mut BTreeSet<String>) {
    match node.kind {
        NodeKind::Atom => {
            if let Ok(name) = node.str_value() {
                names.insert(name.to_string());
            }
        }
        NodeKind::Clause | NodeKind::Query => {
            for (i, child) in node.children.iter().enumerate() {
                if i == 0 {
                    // The head predicate: its name atom does not become a
                    // symbol, but its argument atoms do.
                    for arg in child.children.iter().skip(1) {
                        collect_atom_names(arg, names);
                    }
                } else {
                    collect_atom_names(child, names);
                }
            }
        }
        _ => {
            for child in &node.children {
                collect_atom_names(child, names);
            }
        }
    }
}

/// Append each clause and query to its `name/arity` bucket in source order
fn group_clauses<'a>(node: &'a Node, top_level: &mut IndexMap<String, Vec<&'a Node>>) -> Result<()> {
    match node.kind {
        NodeKind::Clause | NodeKind::Query => {
            node.head()?;
            let name = node.name_arity()?.to_string();
            top_level.entry(name).or_default().push(node);
            Ok(())
        }
        _ => {
            for child in &node.children {
                group_clauses(child, top_level)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn config(int_bits: u32) -> Config {
        Config {
            prog_name: "qulog".to_string(),
            in_file_name: "<test>".to_string(),
            int_bits,
        }
    }

    #[test]
    fn atoms_exclude_predicate_head_names() {
        let ast = parse("color(red). color(green). :- color(C).").unwrap();
        let analysis = preprocess(&ast, &config(0)).unwrap();
        assert_eq!(analysis.int_to_sym, vec!["green", "red"]);
        assert_eq!(analysis.sym_to_int["green"], 0);
        assert_eq!(analysis.sym_to_int["red"], 1);
        assert_eq!(analysis.sym_bits, 1);
    }

    #[test]
    fn body_atoms_and_head_argument_atoms_are_collected() {
        let ast = parse("likes(alice, bob). p(X) :- X = carol.").unwrap();
        let analysis = preprocess(&ast, &config(0)).unwrap();
        assert_eq!(analysis.int_to_sym, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn zero_atoms_and_zero_numerals_clamp_widths_to_one() {
        let ast = parse("p(X) :- X = X.").unwrap();
        let analysis = preprocess(&ast, &config(0)).unwrap();
        assert!(analysis.int_to_sym.is_empty());
        assert_eq!(analysis.sym_bits, 1);
        assert_eq!(analysis.int_bits, 1);
    }

    #[test]
    fn widths_grow_with_literals_symbols_and_user_minimum() {
        // 5 atoms and a 100 literal: sym_bits = bits(4) = 3 and
        // int_bits = bits(100) = 7, despite the requested 3.
        let ast = parse("p(a). p(b). p(c). p(d). p(e). q(N) :- N < 100.").unwrap();
        let analysis = preprocess(&ast, &config(3)).unwrap();
        assert_eq!(analysis.sym_bits, 3);
        assert_eq!(analysis.int_bits, 7);

        let ast = parse("p(N) :- N < 2.").unwrap();
        let analysis = preprocess(&ast, &config(14)).unwrap();
        assert_eq!(analysis.int_bits, 14);
    }

    #[test]
    fn clause_groups_preserve_textual_order() {
        let ast = parse("b(1). a(2). b(3). :- a(X).").unwrap();
        let analysis = preprocess(&ast, &config(0)).unwrap();
        let groups: Vec<&str> = analysis.top_level.keys().map(String::as_str).collect();
        assert_eq!(groups, vec!["b/1", "a/1", "Query/1"]);
        assert_eq!(analysis.top_level["b/1"].len(), 2);
        assert_eq!(analysis.top_level["b/1"][0].children[0].children[1].text, "1");
        assert_eq!(analysis.top_level["b/1"][1].children[0].children[1].text, "3");
    }

    #[test]
    fn lists_are_rejected_with_their_position() {
        let ast = parse("p(X) :-\n  X = [a].").unwrap();
        let err = preprocess(&ast, &config(0)).unwrap_err();
        match err {
            CompileError::Unimplemented { construct, span } => {
                assert_eq!(construct, "lists");
                assert_eq!(span.line, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn structures_are_rejected() {
        let ast = parse("p(X) :- X = f(a).").unwrap();
        let err = preprocess(&ast, &config(0)).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Unimplemented {
                construct: "compound structures",
                ..
            }
        ));
    }

    #[test]
    fn bits_for_counts_binary_digits() {
        assert_eq!(bits_for(0), 0);
        assert_eq!(bits_for(1), 1);
        assert_eq!(bits_for(2), 2);
        assert_eq!(bits_for(3), 2);
        assert_eq!(bits_for(4), 3);
        assert_eq!(bits_for(100), 7);
    }
}
