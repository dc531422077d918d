use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use hivdr_core::errors::ConfigurationError;

///
/// Complexity tier of a reference score table.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleTier {
    Simple,
    Complex,
}

impl Display for RuleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleTier::Simple => write!(f, "simple"),
            RuleTier::Complex => write!(f, "complex"),
        }
    }
}

impl FromStr for RuleTier {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(RuleTier::Simple),
            "complex" => Ok(RuleTier::Complex),
            _ => Err(ConfigurationError::UnknownTier(s.to_string())),
        }
    }
}

///
/// One row of a wide score table as read from disk: the rule label and
/// the penalty for every drug column that has a value.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRow {
    pub rule: String,
    pub penalties: BTreeMap<String, i32>,
}

impl RuleRow {
    pub fn new(rule: &str, penalties: &[(&str, i32)]) -> Self {
        RuleRow {
            rule: rule.trim().to_string(),
            penalties: penalties
                .iter()
                .map(|(drug, penalty)| (drug.to_string(), *penalty))
                .collect(),
        }
    }
}

/// Add `incoming` into `target`, refusing two different values for one drug.
pub(crate) fn merge_penalties(
    rule: &str,
    target: &mut BTreeMap<String, i32>,
    incoming: &BTreeMap<String, i32>,
) -> Result<(), ConfigurationError> {
    for (drug, penalty) in incoming {
        match target.get(drug) {
            Some(existing) if existing != penalty => {
                return Err(ConfigurationError::ConflictingPenalty {
                    rule: rule.to_string(),
                    drug: drug.clone(),
                    first: *existing,
                    second: *penalty,
                });
            }
            Some(_) => {}
            None => {
                target.insert(drug.clone(), *penalty);
            }
        }
    }
    Ok(())
}

/// Union of two drug column lists, keeping first-seen order.
pub(crate) fn merge_drug_columns(left: &[String], right: &[String]) -> Vec<String> {
    let mut drugs = left.to_vec();
    for drug in right {
        if !drugs.contains(drug) {
            drugs.push(drug.clone());
        }
    }
    drugs
}
