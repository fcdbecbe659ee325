//! `TOP`'s second argument is restricted to the literal value `0` (no
//! partial-body retrieval in this engine); this is split out from
//! [`crate::parse`] because its grammar ("`<digits> 0`", exactly one
//! space, nothing else) is specific to this one command.

#[derive(Debug, PartialEq, Eq)]
pub enum TopArgError {
    /// Couldn't find a leading decimal index at all.
    MissingArgs,
    /// A second argument was present but wasn't the literal `0`.
    NonzeroSecondArg,
}

/// Split a `TOP` argument string (everything after `TOP `) into its
/// decimal index portion. The caller still has to bounds-check/parse the
/// returned digits with [`crate::parse::parse_index`].
pub fn split_top_arg(arg: &str) -> Result<&str, TopArgError> {
    let split = arg
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(arg.len());
    if split == 0 {
        return Err(TopArgError::MissingArgs);
    }
    let (digits, rest) = arg.split_at(split);
    if rest.is_empty() {
        return Err(TopArgError::MissingArgs);
    }
    if rest != " 0" {
        return Err(TopArgError::NonzeroSecondArg);
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_index_and_literal_zero() {
        assert_eq!(split_top_arg("2 0"), Ok("2"));
    }

    #[test]
    fn rejects_missing_index() {
        assert_eq!(split_top_arg(""), Err(TopArgError::MissingArgs));
        assert_eq!(split_top_arg(" 0"), Err(TopArgError::MissingArgs));
    }

    #[test]
    fn rejects_index_with_no_second_arg() {
        assert_eq!(split_top_arg("2"), Err(TopArgError::MissingArgs));
    }

    #[test]
    fn rejects_nonzero_second_arg() {
        assert_eq!(split_top_arg("2 5"), Err(TopArgError::NonzeroSecondArg));
        assert_eq!(split_top_arg("2 00"), Err(TopArgError::NonzeroSecondArg));
    }
}
