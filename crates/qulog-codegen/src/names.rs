//! Port and instance naming

use crate::EmitError;
use rand::Rng;

/// Map an argument index to a stable port name: `A`…`Z`, then two-letter
/// names `AA`…`ZZ`. The scheme is source-independent, so module ports are
/// identical across runs.
pub fn num_to_varname(n: usize) -> Result<String, EmitError> {
    const ALPHABET: usize = 26;
    if n < ALPHABET {
        Ok(((b'A' + n as u8) as char).to_string())
    } else if n < ALPHABET * (ALPHABET + 1) {
        let m = n - ALPHABET;
        let first = (b'A' + (m / ALPHABET) as u8) as char;
        let second = (b'A' + (m % ALPHABET) as u8) as char;
        Ok(format!("{}{}", first, second))
    } else {
        Err(EmitError::TooManyParameters)
    }
}

/// Five random letters, mixed case, to keep module instantiations distinct
pub fn instance_suffix<R: Rng>(rng: &mut R) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    (0..5)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn single_letters_then_two_letter_blocks() {
        assert_eq!(num_to_varname(0).unwrap(), "A");
        assert_eq!(num_to_varname(25).unwrap(), "Z");
        assert_eq!(num_to_varname(26).unwrap(), "AA");
        assert_eq!(num_to_varname(27).unwrap(), "AB");
        assert_eq!(num_to_varname(51).unwrap(), "AZ");
        assert_eq!(num_to_varname(52).unwrap(), "BA");
        assert_eq!(num_to_varname(26 * 27 - 1).unwrap(), "ZZ");
    }

    #[test]
    fn names_never_collide() {
        let names: Vec<String> = (0..26 * 27).map(|n| num_to_varname(n).unwrap()).collect();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }

    #[test]
    fn index_past_the_last_block_is_an_error() {
        assert!(matches!(
            num_to_varname(26 * 27),
            Err(EmitError::TooManyParameters)
        ));
    }

    #[test]
    fn suffixes_are_five_letters_and_seed_stable() {
        let mut rng = StdRng::seed_from_u64(42);
        let a = instance_suffix(&mut rng);
        assert_eq!(a.len(), 5);
        assert!(a.chars().all(|c| c.is_ascii_alphabetic()));

        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(instance_suffix(&mut rng), a);
    }
}
