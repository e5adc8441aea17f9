//! Outcomes, issues and discrete outcome spaces

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

// ============================================================================
// VALUES AND OUTCOMES
// ============================================================================

/// A single issue value
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl Value {
    /// Numeric reading of the value.
    ///
    /// Tokens such as `"v3"` are read by their trailing number, anything else
    /// that does not parse is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Text(s) => s
                .parse::<f64>()
                .ok()
                .or_else(|| s.get(1..).and_then(|rest| rest.parse::<f64>().ok())),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Fixed-arity tuple of issue values
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Outcome(pub Vec<Value>);

impl Outcome {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Outcome made only of integer values
    pub fn ints(values: &[i64]) -> Self {
        Self(values.iter().copied().map(Value::Int).collect())
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn get(&self, issue: usize) -> Option<&Value> {
        self.0.get(issue)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

// ============================================================================
// ISSUES
// ============================================================================

/// A named, finite and ordered set of values
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub name: String,
    pub values: Vec<Value>,
}

impl Issue {
    /// Integer issue with values `0..n_values`
    pub fn integer(name: &str, n_values: usize) -> Self {
        Self {
            name: name.to_string(),
            values: (0..n_values as i64).map(Value::Int).collect(),
        }
    }

    /// Categorical issue over the given tokens
    pub fn categorical(name: &str, tokens: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            values: tokens.iter().map(|t| Value::from(*t)).collect(),
        }
    }

    pub fn cardinality(&self) -> usize {
        self.values.len()
    }

    /// Position of a value inside this issue
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }
}

// ============================================================================
// OUTCOME SPACE
// ============================================================================

/// Discrete Cartesian outcome space
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSpace {
    pub name: String,
    pub issues: Vec<Issue>,
}

impl OutcomeSpace {
    pub fn new(name: &str, issues: Vec<Issue>) -> Self {
        Self {
            name: name.to_string(),
            issues,
        }
    }

    /// Space of `n_issues` integer issues with `n_values` values each
    pub fn integers(name: &str, n_issues: usize, n_values: usize) -> Self {
        let issues = (0..n_issues)
            .map(|i| Issue::integer(&format!("i{}", i + 1), n_values))
            .collect();
        Self::new(name, issues)
    }

    /// Flattened product of several spaces, one block of issues per space
    pub fn product(spaces: &[OutcomeSpace]) -> Self {
        let issues = spaces
            .iter()
            .enumerate()
            .flat_map(|(i, space)| {
                let prefix = if space.name.is_empty() {
                    format!("t{}", i)
                } else {
                    space.name.clone()
                };
                space.issues.iter().map(move |issue| Issue {
                    name: format!("{}:{}", prefix, issue.name),
                    values: issue.values.clone(),
                })
            })
            .collect();
        Self::new("product", issues)
    }

    pub fn n_issues(&self) -> usize {
        self.issues.len()
    }

    /// Number of outcomes in the space
    pub fn cardinality(&self) -> usize {
        if self.issues.is_empty() {
            return 0;
        }
        self.issues.iter().map(Issue::cardinality).product()
    }

    /// Check membership: right arity and every value legal for its issue
    pub fn contains(&self, outcome: &Outcome) -> bool {
        outcome.len() == self.issues.len()
            && self
                .issues
                .iter()
                .zip(outcome.values())
                .all(|(issue, v)| issue.index_of(v).is_some())
    }

    /// Two spaces are compatible if they list the same values in the same order
    pub fn is_compatible(&self, other: &OutcomeSpace) -> bool {
        self.issues.len() == other.issues.len()
            && self
                .issues
                .iter()
                .zip(&other.issues)
                .all(|(a, b)| a.values == b.values)
    }

    /// All outcomes in lexicographic issue order
    pub fn enumerate(&self) -> Vec<Outcome> {
        if self.issues.is_empty() {
            return Vec::new();
        }

        let mut outcomes: Vec<Vec<Value>> = vec![Vec::with_capacity(self.issues.len())];
        for issue in &self.issues {
            let mut next = Vec::with_capacity(outcomes.len() * issue.cardinality());
            for prefix in &outcomes {
                for value in &issue.values {
                    let mut o = prefix.clone();
                    o.push(value.clone());
                    next.push(o);
                }
            }
            outcomes = next;
        }

        outcomes.into_iter().map(Outcome).collect()
    }

    /// Uniformly sample one outcome
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Outcome> {
        if self.cardinality() == 0 {
            return None;
        }
        let values = self
            .issues
            .iter()
            .map(|issue| issue.values[rng.gen_range(0..issue.values.len())].clone())
            .collect();
        Some(Outcome(values))
    }
}
