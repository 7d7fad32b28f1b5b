//! Rendering solver output in terms of the query's variables
//!
//! The annealing toolchain reports satisfying assignments as lines of the
//! form `Query.<name> = <int>`. Numeric variables print as-is; atom-typed
//! variables are decoded through the symbol table; a query that binds no
//! variables reduces to a `true`/`false` verdict read off `Query.Valid`.

use qulog_frontend::typeinf::{TypeInfo, VarType};

/// Whether the query binds at least one variable. If not, the program is a
/// ground claim and only its truth is reported.
pub fn query_has_variables(var_types: &TypeInfo) -> bool {
    var_types
        .keys()
        .any(|name| name.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
}

/// Render one solver record. Returns `None` for lines that are not records
/// of the query's variables or that carry nothing worth reporting.
pub fn render_record(
    line: &str,
    int_to_sym: &[String],
    var_types: &TypeInfo,
    have_var: bool,
) -> Option<String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 3 {
        return None;
    }
    let name = fields[0].strip_prefix("Query.")?;
    if name.is_empty() {
        return None;
    }
    let value: i64 = fields[2].parse().ok()?;

    if name == "Valid" {
        if have_var {
            return None;
        }
        return match value {
            0 => Some("false".to_string()),
            1 => Some("true".to_string()),
            _ => None,
        };
    }

    match var_types.get(name)? {
        VarType::Numeral => Some(format!("{} = {}", name, value)),
        VarType::Atom => {
            let sym = usize::try_from(value)
                .ok()
                .and_then(|i| int_to_sym.get(i))
                .map(String::as_str)
                .unwrap_or("[invalid]");
            Some(format!("{} = {}", name, sym))
        }
        VarType::Unknown => None,
    }
}

/// Render a whole solver transcript. Lines before the first `Solution #`
/// marker are preamble; solutions are separated by blank lines.
pub fn render_solutions(output: &str, int_to_sym: &[String], var_types: &TypeInfo) -> Vec<String> {
    let have_var = query_has_variables(var_types);
    let mut rendered = Vec::new();
    let mut in_solution = false;
    for line in output.lines() {
        if line.starts_with("Solution #") {
            if in_solution {
                rendered.push(String::new());
            }
            in_solution = true;
            continue;
        }
        if !in_solution {
            continue;
        }
        if let Some(record) = render_record(line, int_to_sym, var_types, have_var) {
            rendered.push(record);
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syms(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn atom_values_decode_through_the_symbol_table() {
        let mut tys = TypeInfo::new();
        tys.insert("C".to_string(), VarType::Atom);
        let table = syms(&["green", "red"]);
        assert_eq!(
            render_record("Query.C = 0", &table, &tys, true).unwrap(),
            "C = green"
        );
        assert_eq!(
            render_record("Query.C = 1", &table, &tys, true).unwrap(),
            "C = red"
        );
    }

    #[test]
    fn out_of_range_atom_values_are_invalid() {
        let mut tys = TypeInfo::new();
        tys.insert("C".to_string(), VarType::Atom);
        let table = syms(&["green", "red"]);
        assert_eq!(
            render_record("Query.C = 2", &table, &tys, true).unwrap(),
            "C = [invalid]"
        );
        assert_eq!(
            render_record("Query.C = -1", &table, &tys, true).unwrap(),
            "C = [invalid]"
        );
    }

    #[test]
    fn numeral_values_print_directly() {
        let mut tys = TypeInfo::new();
        tys.insert("N".to_string(), VarType::Numeral);
        assert_eq!(
            render_record("Query.N = 14", &[], &tys, true).unwrap(),
            "N = 14"
        );
    }

    #[test]
    fn ground_queries_reduce_to_a_verdict() {
        let mut tys = TypeInfo::new();
        tys.insert("3".to_string(), VarType::Numeral);
        assert!(!query_has_variables(&tys));
        assert_eq!(
            render_record("Query.Valid = 1", &[], &tys, false).unwrap(),
            "true"
        );
        assert_eq!(
            render_record("Query.Valid = 0", &[], &tys, false).unwrap(),
            "false"
        );
        // With variables present, Valid itself is noise.
        assert_eq!(render_record("Query.Valid = 1", &[], &tys, true), None);
    }

    #[test]
    fn non_record_lines_are_ignored() {
        let tys = TypeInfo::new();
        assert_eq!(render_record("", &[], &tys, true), None);
        assert_eq!(render_record("energy -42.5", &[], &tys, true), None);
        assert_eq!(render_record("Other.X = 3", &[], &tys, true), None);
        assert_eq!(render_record("Query.X = ?", &[], &tys, true), None);
    }

    #[test]
    fn transcripts_split_solutions_on_markers() {
        let mut tys = TypeInfo::new();
        tys.insert("C".to_string(), VarType::Atom);
        let table = syms(&["green", "red"]);
        let output = "\
preamble noise
Solution #1 (energy = -1.0):
Query.C = 0
Solution #2 (energy = -0.5):
Query.C = 1
";
        assert_eq!(
            render_solutions(output, &table, &tys),
            vec!["C = green", "", "C = red"]
        );
    }
}
