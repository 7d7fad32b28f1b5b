//! Clause-level type inference
//!
//! Every clause argument lives in one of two hardware domains: atoms
//! (encoded symbols) or numerals (unsigned integers). Inference runs over
//! the call-dependency graph in leaves-first order so that a callee's
//! signature is final before any caller consults it. Types form the lattice
//! `Unknown ⊑ Atom`, `Unknown ⊑ Numeral`, with `Atom` and `Numeral`
//! incomparable; recursion and polymorphism are rejected.

use crate::ast::{Node, NodeId, NodeKind, Value};
use crate::error::{CompileError, Result};
use crate::preprocess::Analysis;
use crate::span::Span;
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

/// The inferred domain of a variable or argument slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Unknown,
    Numeral,
    Atom,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Unknown => write!(f, "*"),
            VarType::Numeral => write!(f, "num"),
            VarType::Atom => write!(f, "atom"),
        }
    }
}

/// Lattice join of two types; `None` on `Atom`/`Numeral` disagreement
fn join(a: VarType, b: VarType) -> Option<VarType> {
    match (a, b) {
        _ if a == b => Some(a),
        (VarType::Unknown, _) => Some(b),
        (_, VarType::Unknown) => Some(a),
        _ => None,
    }
}

/// Mapping from variable name to its type within one clause
pub type TypeInfo = HashMap<String, VarType>;

/// Positional argument types of a clause group
pub type ArgTypes = Vec<VarType>;

/// Output of the inference pass
#[derive(Debug)]
pub struct Typing {
    /// `name/arity` → argument domains; no slot is `Unknown` on success
    pub clause_arg_types: IndexMap<String, ArgTypes>,
    /// Per-clause variable domains, keyed by clause node identity
    pub clause_var_types: HashMap<NodeId, TypeInfo>,
}

/// Infer argument and variable types for every clause group
pub fn infer(analysis: &Analysis<'_>) -> Result<Typing> {
    let deps = dependencies(analysis)?;
    let order = order_groups(&deps, &analysis.top_level)?;
    debug!(?order, "clause groups ordered leaves-first");

    let mut arg_types: IndexMap<String, ArgTypes> = IndexMap::new();
    arg_types.insert("integer/1".to_string(), vec![VarType::Numeral]);
    arg_types.insert("atom/1".to_string(), vec![VarType::Atom]);
    let mut var_types: HashMap<NodeId, TypeInfo> = HashMap::new();

    for name in &order {
        let Some(clauses) = analysis.top_level.get(name) else {
            continue;
        };
        for clause in clauses {
            infer_clause(clause, &mut arg_types, &mut var_types)?;
        }
    }

    for (name, tys) in &arg_types {
        // Built-in signatures are concrete by construction.
        let Some(clauses) = analysis.top_level.get(name) else {
            continue;
        };
        for (i, ty) in tys.iter().enumerate() {
            if *ty == VarType::Unknown {
                return Err(CompileError::PolymorphicArgument {
                    name: name.clone(),
                    argument: i + 1,
                    span: clauses.first().map(|c| c.span).unwrap_or_default(),
                });
            }
        }
    }

    Ok(Typing {
        clause_arg_types: arg_types,
        clause_var_types: var_types,
    })
}

/// Map each clause group to the set of groups its bodies call
fn dependencies(analysis: &Analysis<'_>) -> Result<IndexMap<String, BTreeSet<String>>> {
    let mut deps: IndexMap<String, BTreeSet<String>> = IndexMap::new();
    for (name, clauses) in &analysis.top_level {
        let callees = deps.entry(name.clone()).or_default();
        for clause in clauses {
            for pred in &clause.children[1..] {
                // Body predicates with fewer than two children are
                // expressions, not calls.
                if pred.children.len() >= 2 && pred.children[0].kind == NodeKind::Atom {
                    callees.insert(format!(
                        "{}/{}",
                        pred.children[0].str_value()?,
                        pred.children.len() - 1
                    ));
                }
            }
        }
    }
    Ok(deps)
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    InProgress,
    Done,
}

/// Topologically order the dependency graph, callees before callers.
/// Re-entering a group already on the walk's current path is recursion.
fn order_groups(
    deps: &IndexMap<String, BTreeSet<String>>,
    top_level: &IndexMap<String, Vec<&Node>>,
) -> Result<Vec<String>> {
    fn visit<'d>(
        name: &'d str,
        deps: &'d IndexMap<String, BTreeSet<String>>,
        top_level: &IndexMap<String, Vec<&Node>>,
        marks: &mut HashMap<&'d str, Mark>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                return Err(CompileError::Recursion {
                    name: name.to_string(),
                    span: group_span(top_level, name),
                })
            }
            None => {}
        }
        marks.insert(name, Mark::InProgress);
        if let Some(callees) = deps.get(name) {
            for callee in callees {
                visit(callee, deps, top_level, marks, order)?;
            }
        }
        marks.insert(name, Mark::Done);
        order.push(name.to_string());
        Ok(())
    }

    let mut marks = HashMap::new();
    let mut order = Vec::new();
    for name in deps.keys() {
        visit(name, deps, top_level, &mut marks, &mut order)?;
    }
    Ok(order)
}

/// The position of a clause group's first clause
fn group_span(top_level: &IndexMap<String, Vec<&Node>>, name: &str) -> Span {
    top_level
        .get(name)
        .and_then(|clauses| clauses.first())
        .map(|clause| clause.span)
        .unwrap_or_default()
}

/// Infer one clause and fold its signature into the group's
fn infer_clause(
    clause: &Node,
    arg_types: &mut IndexMap<String, ArgTypes>,
    var_types: &mut HashMap<NodeId, TypeInfo>,
) -> Result<()> {
    let head = clause.head()?;
    let arg_names: Vec<&str> = head.children[1..].iter().map(|t| t.text.as_str()).collect();

    // Seed each head argument from its spelling: a literal atom, a literal
    // numeral, or a variable of as-yet-unknown type.
    let mut tys: ArgTypes = arg_names.iter().map(|name| seed_type(name)).collect();

    let vtypes = clause_variable_types(clause, arg_types)?;

    for (i, ty) in tys.iter_mut().enumerate() {
        if *ty == VarType::Unknown {
            if let Some(found) = vtypes.get(arg_names[i]) {
                *ty = *found;
            }
        }
    }

    let name = clause.name_arity()?.to_string();
    let merged = match arg_types.get(&name) {
        Some(old) => {
            if old.len() != tys.len() {
                return Err(CompileError::Internal(format!(
                    "signature length mismatch for {}: {} vs {}",
                    name,
                    old.len(),
                    tys.len()
                )));
            }
            old.iter()
                .zip(tys.iter())
                .map(|(&a, &b)| join(a, b))
                .collect::<Option<ArgTypes>>()
                .ok_or_else(|| CompileError::PolymorphicSignature {
                    name: name.clone(),
                    span: clause.span,
                })?
        }
        None => tys,
    };
    arg_types.insert(name, merged);

    var_types.insert(clause.id, vtypes);
    Ok(())
}

fn seed_type(text: &str) -> VarType {
    match text.chars().next() {
        Some(c) if c.is_ascii_lowercase() => VarType::Atom,
        Some(c) if c.is_ascii_digit() => VarType::Numeral,
        _ => VarType::Unknown,
    }
}

/// Compute the type of every variable appearing in a clause body
fn clause_variable_types(
    clause: &Node,
    arg_types: &IndexMap<String, ArgTypes>,
) -> Result<TypeInfo> {
    let mut tm = TypeInfo::new();
    for pred in &clause.children[1..] {
        let inner = pred.children.first().ok_or_else(|| {
            CompileError::Internal(format!("body predicate at {} has no children", pred.span))
        })?;
        if inner.kind == NodeKind::Atom && pred.children.len() >= 2 {
            // A call: constrain this clause's argument terms by the
            // callee's declared domains.
            let callee = format!("{}/{}", inner.str_value()?, pred.children.len() - 1);
            let tys = arg_types.get(&callee).ok_or_else(|| {
                CompileError::Internal(format!("failed to find clause {}", callee))
            })?;
            let mut new_tm = TypeInfo::new();
            for (i, ty) in tys.iter().enumerate() {
                argument_variable_types(&pred.children[i + 1], *ty, &mut new_tm);
            }
            merge_into(&mut tm, new_tm, pred)?;
        } else {
            // An expression: every variable in it takes the expression's
            // type.
            let ty = expr_type(inner)?;
            let mut new_tm = TypeInfo::new();
            inner.for_each_variable(&mut |var| {
                if let Some(Value::Str(name)) = &var.value {
                    new_tm.insert(name.clone(), ty);
                }
            });
            merge_into(&mut tm, new_tm, pred)?;
        }
    }
    Ok(tm)
}

/// Constrain the variables of one call argument. A bare variable takes the
/// callee's declared domain; a compound argument is an arithmetic
/// expression, so every variable inside it is a numeral.
fn argument_variable_types(arg: &Node, domain: VarType, tm: &mut TypeInfo) {
    match bare_variable(arg) {
        Some(name) => {
            tm.insert(name.to_string(), domain);
        }
        None => {
            arg.for_each_variable(&mut |var| {
                if let Some(Value::Str(name)) = &var.value {
                    tm.insert(name.clone(), VarType::Numeral);
                }
            });
        }
    }
}

/// The variable a term consists of, if it wraps nothing else
fn bare_variable(term: &Node) -> Option<&str> {
    match term.kind {
        NodeKind::Variable => match &term.value {
            Some(Value::Str(name)) => Some(name),
            _ => None,
        },
        NodeKind::Term => term.children.first().and_then(bare_variable),
        _ => None,
    }
}

/// Merge newly inferred variable types into the clause's accumulated map
fn merge_into(tm: &mut TypeInfo, other: TypeInfo, at: &Node) -> Result<()> {
    for (name, ty) in other {
        let slot = tm.entry(name.clone()).or_insert(VarType::Unknown);
        match join(*slot, ty) {
            Some(joined) => *slot = joined,
            None => {
                return Err(CompileError::TypeConflict {
                    variable: name,
                    span: at.span,
                })
            }
        }
    }
    Ok(())
}

/// The domain of an expression node
fn expr_type(node: &Node) -> Result<VarType> {
    match node.kind {
        NodeKind::Numeral => Ok(VarType::Numeral),
        NodeKind::Atom => Ok(VarType::Atom),
        NodeKind::Variable => Ok(VarType::Unknown),
        // Arithmetic applies only to numerals.
        NodeKind::PrimaryExpr
        | NodeKind::UnaryExpr
        | NodeKind::MultiplicativeExpr
        | NodeKind::AdditiveExpr => Ok(VarType::Numeral),
        NodeKind::Term => {
            let inner = node.children.first().ok_or_else(|| {
                CompileError::Internal(format!("term at {} has no children", node.span))
            })?;
            expr_type(inner)
        }
        NodeKind::Relation => {
            let (lhs, op, rhs) = relation_parts(node)?;
            let spelling = op.str_value()?;
            if spelling == "=" || spelling == "\\=" {
                // Equality and inequality are polymorphic; the two sides
                // must agree.
                let t1 = expr_type(lhs)?;
                let t2 = expr_type(rhs)?;
                join(t1, t2).ok_or(CompileError::MixedEquality {
                    op: spelling.to_string(),
                    lhs: t1,
                    rhs: t2,
                    span: node.span,
                })
            } else {
                Ok(VarType::Numeral)
            }
        }
        _ => Err(CompileError::Internal(format!(
            "expression type of {:?} node at {} is undefined",
            node.kind, node.span
        ))),
    }
}

fn relation_parts(node: &Node) -> Result<(&Node, &Node, &Node)> {
    match node.children.as_slice() {
        [lhs, op, rhs] => Ok((lhs, op, rhs)),
        _ => Err(CompileError::Internal(format!(
            "malformed relation at {}",
            node.span
        ))),
    }
}
