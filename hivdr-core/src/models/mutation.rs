use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ParseError;

/// Marker that closes a deletion token, e.g. `E/^` or `T69T/^`.
pub const DELETION_MARKER: &str = "/^";

/// Table key used for insertions.
pub const INSERTION_KEY: &str = "ins";
/// Table key used for deletions.
pub const DELETION_KEY: &str = "del";

///
/// One atomic observed unit at a position: a single amino acid, or one of
/// the insertion/deletion sentinels.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Residue {
    AminoAcid(char),
    Insertion,
    Deletion,
}

impl Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Residue::AminoAcid(aa) => write!(f, "{}", aa),
            Residue::Insertion => write!(f, "{}", INSERTION_KEY),
            Residue::Deletion => write!(f, "{}", DELETION_KEY),
        }
    }
}

impl FromStr for Residue {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            INSERTION_KEY => Ok(Residue::Insertion),
            DELETION_KEY => Ok(Residue::Deletion),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(aa), None) if aa.is_ascii_uppercase() => Ok(Residue::AminoAcid(aa)),
                    (Some(aa), None) => Err(ParseError::InvalidResidue {
                        token: s.to_string(),
                        residue: aa,
                    }),
                    _ => Err(ParseError::MissingAminoAcid(s.to_string())),
                }
            }
        }
    }
}

impl Serialize for Residue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Residue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

///
/// A parsed mutation token.
///
/// The wild-type residue that leads every token is only used to anchor the
/// position and is not kept.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationToken {
    /// Plain substitution (one unit) or a mixture of several units, in
    /// reported order.
    Substitution { position: u32, units: Vec<char> },
    /// Amino-acid insertion, e.g. `T69T/S/SSS`. By convention assigned to
    /// the codon it is reported at.
    Insertion { position: u32 },
    /// Amino-acid deletion, e.g. `T69T/^`. Bare deletions such as `E/^`
    /// carry no position of their own.
    Deletion { position: Option<u32> },
}

impl MutationToken {
    pub fn position(&self) -> Option<u32> {
        match self {
            MutationToken::Substitution { position, .. } => Some(*position),
            MutationToken::Insertion { position } => Some(*position),
            MutationToken::Deletion { position } => *position,
        }
    }

    /// Observed units in mixture order. Indels yield their single sentinel.
    pub fn residues(&self) -> Vec<Residue> {
        match self {
            MutationToken::Substitution { units, .. } => {
                units.iter().map(|aa| Residue::AminoAcid(*aa)).collect()
            }
            MutationToken::Insertion { .. } => vec![Residue::Insertion],
            MutationToken::Deletion { .. } => vec![Residue::Deletion],
        }
    }

    pub fn mixture_size(&self) -> usize {
        match self {
            MutationToken::Substitution { units, .. } => units.len(),
            _ => 1,
        }
    }

    pub fn is_mixture(&self) -> bool {
        self.mixture_size() > 1
    }

    ///
    /// Re-join the units of a substitution with `/`.
    ///
    /// Returns `None` for insertions and deletions, whose original segment
    /// is not recoverable from the sentinel.
    ///
    pub fn amino_acid_segment(&self) -> Option<String> {
        match self {
            MutationToken::Substitution { units, .. } => Some(
                units
                    .iter()
                    .map(|aa| aa.to_string())
                    .collect::<Vec<String>>()
                    .join("/"),
            ),
            _ => None,
        }
    }

    pub fn is_bare_deletion(&self) -> bool {
        matches!(self, MutationToken::Deletion { position: None })
    }
}

impl FromStr for MutationToken {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_token(s)
    }
}

///
/// Parse a single mutation token into its position and observed units.
///
/// Accepted shapes:
/// - `M184V`: substitution, one unit
/// - `Q58Q/E`: mixture, units in reported order
/// - `T69SS`, `T69T/S/SSS`: insertion (any multi-letter component)
/// - `T69T/^`, `E/^`: deletion (the second has no position)
///
/// # Arguments
/// - token: the raw token, surrounding whitespace is ignored
///
pub fn parse_token(token: &str) -> Result<MutationToken, ParseError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ParseError::EmptyToken);
    }

    if let Some(stem) = token.strip_suffix(DELETION_MARKER) {
        let (position, _) = split_reference_and_position(stem, token, true)?;
        return Ok(MutationToken::Deletion { position });
    }

    let (position, segment) = split_reference_and_position(token, token, false)?;
    // split_reference_and_position only returns None when digits are optional
    let position = position.ok_or_else(|| ParseError::MissingPosition(token.to_string()))?;

    if segment.is_empty() {
        return Err(ParseError::MissingAminoAcid(token.to_string()));
    }

    let mut units = Vec::new();
    let mut insertion = false;
    for component in segment.split('/') {
        if component.is_empty() {
            return Err(ParseError::MalformedMixture(token.to_string()));
        }
        if let Some(bad) = component.chars().find(|c| !c.is_ascii_uppercase()) {
            return Err(ParseError::InvalidResidue {
                token: token.to_string(),
                residue: bad,
            });
        }
        if component.len() > 1 {
            insertion = true;
        } else if let Some(aa) = component.chars().next() {
            units.push(aa);
        }
    }

    if insertion {
        Ok(MutationToken::Insertion { position })
    } else {
        Ok(MutationToken::Substitution { position, units })
    }
}

/// Returns the position and the amino-acid segment that follows it.
fn split_reference_and_position<'a>(
    stem: &'a str,
    token: &str,
    position_optional: bool,
) -> Result<(Option<u32>, &'a str), ParseError> {
    let mut chars = stem.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_uppercase() => {}
        _ => return Err(ParseError::MissingReferenceResidue(token.to_string())),
    }

    let rest = &stem[1..];
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..digits_end];
    let segment = &rest[digits_end..];

    if digits.is_empty() {
        if position_optional {
            return Ok((None, segment));
        }
        return Err(ParseError::MissingPosition(token.to_string()));
    }

    match digits.parse::<u32>() {
        Ok(0) | Err(_) => Err(ParseError::InvalidPosition(token.to_string())),
        Ok(position) => Ok((Some(position), segment)),
    }
}
