//! Verilog emission
//!
//! Each clause group becomes one combinational module whose `Valid` output
//! asserts exactly when some clause of the group is satisfied by the input
//! arguments. Clause bodies become validity buses: one bit per conjunct,
//! AND-reduced per clause and OR-combined across clauses. Predicate calls
//! instantiate the callee's module and wire its `Valid` into the caller's
//! bus.

use crate::names::{instance_suffix, num_to_varname};
use crate::EmitError;
use qulog_frontend::ast::{Node, NodeKind, Value};
use qulog_frontend::preprocess::{Analysis, Config};
use qulog_frontend::typeinf::{ArgTypes, TypeInfo, Typing, VarType};
use rand::Rng;
use std::collections::HashMap;
use std::io::Write;
use tracing::debug;

/// Write the whole program as Verilog to the caller's sink
pub fn write_verilog<W: Write, R: Rng>(
    out: &mut W,
    config: &Config,
    analysis: &Analysis<'_>,
    typing: &Typing,
    rng: &mut R,
) -> Result<(), EmitError> {
    writeln!(out, "// Verilog version of Prolog program {}", config.in_file_name)?;
    writeln!(out, "// Generated by {}", config.prog_name)?;
    writeln!(out, "//")?;
    writeln!(out, "// This code is intended to be synthesized to a netlist, converted to a")?;
    writeln!(out, "// QUBO, and executed on a quantum annealer.")?;
    writeln!(out, "//")?;
    writeln!(
        out,
        "// Note: This program uses {} bit(s) for atoms and {} bit(s) for (unsigned)",
        analysis.sym_bits, analysis.int_bits
    )?;
    writeln!(out, "// integers.")?;
    writeln!(out)?;

    write_symbols(out, analysis)?;

    for (name, clauses) in &analysis.top_level {
        let tys = typing.clause_arg_types.get(name).ok_or_else(|| {
            EmitError::Internal(format!("no argument types for clause group {}", name))
        })?;
        writeln!(out)?;
        write_clause_group(out, analysis, typing, name, clauses, tys, rng)?;
    }
    Ok(())
}

/// Define all of the program's symbols as Verilog constants
fn write_symbols<W: Write>(out: &mut W, analysis: &Analysis<'_>) -> Result<(), EmitError> {
    // Column-align the names to the longest symbol.
    let width = analysis
        .int_to_sym
        .iter()
        .map(|s| s.len())
        .max()
        .unwrap_or(1)
        .max(1);
    writeln!(out, "// Define all of the symbols used in this program.")?;
    for (i, name) in analysis.int_to_sym.iter().enumerate() {
        writeln!(
            out,
            "`define {:<width$} {}'d{}",
            name,
            analysis.sym_bits,
            i,
            width = width
        )?;
    }
    Ok(())
}

/// A clause's argument terms in source-text form, paired with their port
/// names. Clause arguments are renamed positionally to `A`, `B`, `C`, …;
/// query arguments keep their source names so that solver results can be
/// reported in the user's own terms.
fn clause_args(clause: &Node) -> Result<(Vec<String>, Vec<String>), EmitError> {
    let head = clause.head()?;
    let mut p_args = Vec::new();
    let mut v_args = Vec::new();
    for (i, term) in head.children[1..].iter().enumerate() {
        p_args.push(term.text.clone());
        if clause.kind == NodeKind::Clause {
            v_args.push(num_to_varname(i)?);
        } else {
            v_args.push(term.text.clone());
        }
    }
    Ok((p_args, v_args))
}

/// Write one module covering every clause of a `name/arity` group
fn write_clause_group<W: Write, R: Rng>(
    out: &mut W,
    analysis: &Analysis<'_>,
    typing: &Typing,
    name: &str,
    clauses: &[&Node],
    tys: &ArgTypes,
    rng: &mut R,
) -> Result<(), EmitError> {
    debug!(module = name, clauses = clauses.len(), "emitting clause group");
    let (_, v_args) = clause_args(clauses[0])?;
    write_group_header(out, analysis, name, &v_args, tys)?;

    // One fresh-name counter for the whole module so local wires never
    // collide across clauses.
    let mut var_counter = v_args.len();
    for (i, clause) in clauses.iter().enumerate() {
        let var_types = typing.clause_var_types.get(&clause.id).ok_or_else(|| {
            EmitError::Internal(format!("no variable types for a clause of {}", name))
        })?;
        write_clause_body(out, analysis, clause, i, &mut var_counter, var_types, rng)?;
    }

    // Any clause satisfied makes the group valid.
    write!(out, "  assign Valid = ")?;
    for i in 0..clauses.len() {
        if i > 0 {
            write!(out, " | ")?;
        }
        write!(out, "&$v{}", i + 1)?;
    }
    writeln!(out, ";")?;
    writeln!(out, "endmodule")?;
    Ok(())
}

fn write_group_header<W: Write>(
    out: &mut W,
    analysis: &Analysis<'_>,
    name: &str,
    v_args: &[String],
    tys: &ArgTypes,
) -> Result<(), EmitError> {
    let raw_name = name.split('/').next().unwrap_or(name);
    if tys.is_empty() {
        writeln!(out, "// Define {}.", raw_name)?;
    } else {
        let domains: Vec<String> = tys.iter().map(|t| t.to_string()).collect();
        writeln!(out, "// Define {}({}).", raw_name, domains.join(", "))?;
    }

    if raw_name == "Query" {
        // The arity is suppressed on the top-level query module.
        write!(out, "module Query (")?;
    } else {
        write!(out, "module \\{} (", name)?;
    }
    if v_args.is_empty() {
        writeln!(out, "Valid);")?;
    } else {
        writeln!(out, "{}, Valid);", v_args.join(", "))?;
    }

    for (arg, ty) in v_args.iter().zip(tys.iter()) {
        let bits = port_width(analysis, *ty);
        if bits == 1 {
            writeln!(out, "  input {};", arg)?;
        } else {
            writeln!(out, "  input [{}:0] {};", bits - 1, arg)?;
        }
    }
    writeln!(out, "  output Valid;")?;
    Ok(())
}

fn port_width(analysis: &Analysis<'_>, ty: VarType) -> u32 {
    if ty == VarType::Atom {
        analysis.sym_bits
    } else {
        analysis.int_bits
    }
}

/// Write the wires and validity bus for the `clause_num`-th clause of a
/// group
fn write_clause_body<W: Write, R: Rng>(
    out: &mut W,
    analysis: &Analysis<'_>,
    clause: &Node,
    clause_num: usize,
    var_counter: &mut usize,
    var_types: &TypeInfo,
    rng: &mut R,
) -> Result<(), EmitError> {
    let (p_args, v_args) = clause_args(clause)?;

    // Match the head: literal arguments and repeated variables become
    // equality constraints; fresh variables bind their port.
    let mut valid: Vec<String> = Vec::new();
    let mut p2v: HashMap<String, String> = HashMap::new();
    for (i, p_arg) in p_args.iter().enumerate() {
        match p_arg.chars().next() {
            Some(c) if c.is_ascii_lowercase() => {
                valid.push(format!("{} == `{}", v_args[i], p_arg));
            }
            Some(c) if c.is_ascii_digit() => {
                valid.push(format!("{} == {}'d{}", v_args[i], analysis.int_bits, p_arg));
            }
            Some(c) if c.is_ascii_uppercase() || c == '_' => match p2v.get(p_arg) {
                Some(first) => valid.push(format!("{} == {}", v_args[i], first)),
                None => {
                    p2v.insert(p_arg.clone(), v_args[i].clone());
                }
            },
            _ => {
                return Err(EmitError::Internal(format!(
                    "cannot process head argument {:?}",
                    p_arg
                )))
            }
        }
    }

    // Declare a wire for each body variable the head did not bind, sized by
    // its inferred domain. The keep attribute stops synthesis from eliding
    // wires the solver must report.
    let mut locals: Vec<String> = Vec::new();
    for pred in &clause.children[1..] {
        pred.for_each_variable(&mut |var| {
            if let Some(Value::Str(name)) = &var.value {
                if !p2v.contains_key(name) && !locals.iter().any(|l| l == name) {
                    locals.push(name.clone());
                }
            }
        });
    }
    for name in locals {
        let wire = num_to_varname(*var_counter)?;
        *var_counter += 1;
        let ty = var_types.get(&name).copied().unwrap_or(VarType::Numeral);
        let bits = port_width(analysis, ty);
        if bits == 1 {
            writeln!(out, "  (* keep *) wire {};", wire)?;
        } else {
            writeln!(out, "  (* keep *) wire [{}:0] {};", bits - 1, wire)?;
        }
        p2v.insert(name, wire);
    }

    // Translate the body; the type witnesses atom/1 and integer/1 erase to
    // 1'b1 and drop out of the bus.
    for pred in &clause.children[1..] {
        let expr = translate(pred, analysis, &p2v, rng)?;
        if expr != "1'b1" {
            valid.push(expr);
        }
    }
    if valid.is_empty() {
        // A clause that accepts all inputs.
        valid.push("1'b1".to_string());
    }

    let bus = format!("$v{}", clause_num + 1);
    if valid.len() == 1 {
        writeln!(out, "  wire {};", bus)?;
    } else {
        writeln!(out, "  wire [{}:0] {};", valid.len() - 1, bus)?;
    }
    for (i, expr) in valid.iter().enumerate() {
        let bit = if valid.len() == 1 {
            bus.clone()
        } else {
            format!("{}[{}]", bus, i)
        };
        if expr.contains("%s") {
            // A module instantiation: route the callee's Valid to this bit.
            writeln!(out, "  {};", expr.replace("%s", &bit))?;
        } else {
            writeln!(out, "  assign {} = {};", bit, expr)?;
        }
    }
    Ok(())
}

/// Convert a body predicate (or any expression under one) to Verilog text.
/// Predicate calls come back with a `%s` placeholder for the validity bit
/// they will drive.
fn translate<R: Rng>(
    node: &Node,
    analysis: &Analysis<'_>,
    p2v: &HashMap<String, String>,
    rng: &mut R,
) -> Result<String, EmitError> {
    match node.kind {
        NodeKind::Numeral => Ok(format!("{}'d{}", analysis.int_bits, node.text)),
        NodeKind::Atom => Ok(format!("`{}", node.str_value()?)),
        NodeKind::Variable => {
            let name = node.str_value()?;
            p2v.get(name).cloned().ok_or_else(|| {
                EmitError::Internal(format!("failed to map variable {} to a wire", name))
            })
        }
        NodeKind::UnaryOp => op_spelling(node, &[("-", "-")]),
        NodeKind::AdditiveOp => op_spelling(node, &[("+", "+"), ("-", "-")]),
        NodeKind::MultiplicativeOp => op_spelling(node, &[("*", "*")]),
        NodeKind::RelationOp => op_spelling(
            node,
            &[
                ("=<", "<="),
                (">=", ">="),
                ("<", "<"),
                (">", ">"),
                ("=", "=="),
                ("\\=", "!="),
                ("is", "=="),
            ],
        ),
        NodeKind::PrimaryExpr => {
            let inner = translate(only_child(node)?, analysis, p2v, rng)?;
            if matches!(&node.value, Some(Value::Str(s)) if s == "()") {
                Ok(format!("({})", inner))
            } else {
                Ok(inner)
            }
        }
        NodeKind::Term => translate(only_child(node)?, analysis, p2v, rng),
        NodeKind::UnaryExpr => match node.children.as_slice() {
            [child] => translate(child, analysis, p2v, rng),
            [op, operand] => Ok(format!(
                "{}{}",
                translate(op, analysis, p2v, rng)?,
                translate(operand, analysis, p2v, rng)?
            )),
            _ => Err(malformed(node)),
        },
        NodeKind::MultiplicativeExpr => match node.children.as_slice() {
            [child] => translate(child, analysis, p2v, rng),
            [lhs, op, rhs] => Ok(format!(
                "{}{}{}",
                translate(lhs, analysis, p2v, rng)?,
                translate(op, analysis, p2v, rng)?,
                translate(rhs, analysis, p2v, rng)?
            )),
            _ => Err(malformed(node)),
        },
        NodeKind::AdditiveExpr | NodeKind::Relation => match node.children.as_slice() {
            [child] => translate(child, analysis, p2v, rng),
            [lhs, op, rhs] => Ok(format!(
                "{} {} {}",
                translate(lhs, analysis, p2v, rng)?,
                translate(op, analysis, p2v, rng)?,
                translate(rhs, analysis, p2v, rng)?
            )),
            _ => Err(malformed(node)),
        },
        NodeKind::Predicate => {
            if node.children.len() == 1 {
                // A wrapper around an expression.
                return translate(&node.children[0], analysis, p2v, rng);
            }
            let callee = node.children[0].str_value()?;
            if node.children.len() == 2 && (callee == "atom" || callee == "integer") {
                // Type witnesses exist solely for inference.
                return Ok("1'b1".to_string());
            }
            let arity = node.children.len() - 1;
            let suffix = instance_suffix(rng);
            let args: Vec<String> = node.children[1..]
                .iter()
                .map(|arg| translate(arg, analysis, p2v, rng))
                .collect::<Result<_, _>>()?;
            Ok(format!(
                "\\{}/{} \\{}_{}/{} ({}, %s)",
                callee,
                arity,
                callee,
                suffix,
                arity,
                args.join(", ")
            ))
        }
        _ => Err(EmitError::Internal(format!(
            "unexpected {:?} node during emission",
            node.kind
        ))),
    }
}

fn only_child(node: &Node) -> Result<&Node, EmitError> {
    node.children.first().ok_or_else(|| malformed(node))
}

fn malformed(node: &Node) -> EmitError {
    EmitError::Internal(format!("malformed {:?} node at {}", node.kind, node.span))
}

fn op_spelling(node: &Node, table: &[(&str, &str)]) -> Result<String, EmitError> {
    let spelling = node.str_value()?;
    table
        .iter()
        .find(|(from, _)| *from == spelling)
        .map(|(_, to)| to.to_string())
        .ok_or_else(|| {
            EmitError::Internal(format!("failed to translate operator {:?}", spelling))
        })
}
