//! Symbolic references into the model (§4.2 of the kernel spec).
//!
//! Refs are case-insensitive and use a fixed prefix alphabet: `V`/`C`/`S`
//! (input groups, with an optional `.{item}` sub-form), `F`/`I` (flag and
//! indexation inputs), `R` (calculation results) and `M` (module outputs,
//! always in `M{instance}.{k}` form).

use std::fmt;
use std::str::FromStr;

/// A parsed, canonical reference. Equality and hashing are on the parsed
/// fields, so `v1` and `V1` are the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ref {
    Values { group: u32, item: Option<u32> },
    Constant { group: u32, item: Option<u32> },
    Series { group: u32, item: Option<u32> },
    Flag { id: u32 },
    Indexation { id: u32 },
    Calculation { id: u32 },
    Module { instance: u32, output: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefParseError(pub String);

impl fmt::Display for RefParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a valid reference: {:?}", self.0)
    }
}

impl std::error::Error for RefParseError {}

impl Ref {
    /// The single-letter prefix used in canonical string form.
    pub fn prefix(&self) -> char {
        match self {
            Ref::Values { .. } => 'V',
            Ref::Constant { .. } => 'C',
            Ref::Series { .. } => 'S',
            Ref::Flag { .. } => 'F',
            Ref::Indexation { .. } => 'I',
            Ref::Calculation { .. } => 'R',
            Ref::Module { .. } => 'M',
        }
    }

    pub fn is_calculation(&self) -> bool {
        matches!(self, Ref::Calculation { .. })
    }

    /// Whether this ref names a whole group (`V1`) as opposed to one of its
    /// sub-items (`V1.3`).
    pub fn is_group_total(&self) -> bool {
        matches!(
            self,
            Ref::Values { item: None, .. } | Ref::Constant { item: None, .. } | Ref::Series { item: None, .. }
        )
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Values { group, item } | Ref::Constant { group, item } | Ref::Series { group, item } => {
                match item {
                    Some(i) => write!(f, "{}{}.{}", self.prefix(), group, i),
                    None => write!(f, "{}{}", self.prefix(), group),
                }
            }
            Ref::Flag { id } => write!(f, "F{id}"),
            Ref::Indexation { id } => write!(f, "I{id}"),
            Ref::Calculation { id } => write!(f, "R{id}"),
            Ref::Module { instance, output } => write!(f, "M{instance}.{output}"),
        }
    }
}

impl FromStr for Ref {
    type Err = RefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let mut chars = upper.chars();
        let prefix = chars.next().ok_or_else(|| RefParseError(s.to_string()))?;
        let rest = chars.as_str();

        let (group_str, item_str) = match rest.split_once('.') {
            Some((g, i)) => (g, Some(i)),
            None => (rest, None),
        };
        let parse_u32 = |x: &str| x.parse::<u32>().map_err(|_| RefParseError(s.to_string()));

        let group = parse_u32(group_str)?;
        let item = item_str.map(parse_u32).transpose()?;

        match prefix {
            'V' => Ok(Ref::Values { group, item }),
            'C' => Ok(Ref::Constant { group, item }),
            'S' => Ok(Ref::Series { group, item }),
            'F' if item.is_none() => Ok(Ref::Flag { id: group }),
            'I' if item.is_none() => Ok(Ref::Indexation { id: group }),
            'R' if item.is_none() => Ok(Ref::Calculation { id: group }),
            'M' => {
                let output = item.ok_or_else(|| RefParseError(s.to_string()))?;
                Ok(Ref::Module { instance: group, output })
            }
            _ => Err(RefParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_and_sub_forms() {
        assert_eq!("V1".parse::<Ref>().unwrap(), Ref::Values { group: 1, item: None });
        assert_eq!(
            "v1.3".parse::<Ref>().unwrap(),
            Ref::Values { group: 1, item: Some(3) }
        );
        assert_eq!("M57.2".parse::<Ref>().unwrap(), Ref::Module { instance: 57, output: 2 });
        assert_eq!(Ref::Calculation { id: 9 }.to_string(), "R9");
    }

    #[test]
    fn case_insensitive() {
        assert_eq!("r57".parse::<Ref>().unwrap(), "R57".parse::<Ref>().unwrap());
    }

    #[test]
    fn rejects_dotted_flag() {
        assert!("F1.2".parse::<Ref>().is_err());
    }

    #[test]
    fn rejects_unknown_prefix() {
        assert!("X1".parse::<Ref>().is_err());
    }
}
