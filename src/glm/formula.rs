//! Model formulas in the familiar `response ~ terms` notation.
//!
//! Supported syntax: `+` separates terms, `a:b` is an interaction,
//! `a*b` expands to `a + b + a:b`, `log(x)` takes the natural log of a
//! numeric column, and `- 1` (or `+ 0`) drops the intercept.

use serde::{Deserialize, Serialize};

use crate::error::GlmError;

/// A single variable reference, optionally log-transformed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predictor {
    Variable(String),
    Log(String),
}

impl Predictor {
    pub fn column(&self) -> &str {
        match self {
            Predictor::Variable(name) | Predictor::Log(name) => name,
        }
    }

    fn parse(text: &str) -> Result<Self, GlmError> {
        let text = text.trim();
        if let Some(inner) = text
            .strip_prefix("log(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let inner = inner.trim();
            check_identifier(inner)?;
            return Ok(Predictor::Log(inner.to_string()));
        }
        check_identifier(text)?;
        Ok(Predictor::Variable(text.to_string()))
    }
}

impl std::fmt::Display for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predictor::Variable(name) => write!(f, "{name}"),
            Predictor::Log(name) => write!(f, "log({name})"),
        }
    }
}

fn check_identifier(name: &str) -> Result<(), GlmError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(GlmError::ParseError(format!(
            "Invalid variable name '{name}' in formula"
        )))
    }
}

/// A main effect (one predictor) or an interaction of several.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub predictors: Vec<Predictor>,
}

impl Term {
    pub fn order(&self) -> usize {
        self.predictors.len()
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<String> = self.predictors.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", labels.join(":"))
    }
}

/// A parsed model formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub response: String,
    pub terms: Vec<Term>,
    pub intercept: bool,
}

impl Formula {
    /// Parse a formula such as `Foliage ~ Origin * log(DBH)`.
    pub fn parse(text: &str) -> Result<Self, GlmError> {
        let (lhs, rhs) = text.split_once('~').ok_or_else(|| {
            GlmError::ParseError(format!("Formula '{text}' is missing '~'"))
        })?;
        if rhs.contains('~') {
            return Err(GlmError::ParseError(format!(
                "Formula '{text}' has more than one '~'"
            )));
        }
        let response = lhs.trim();
        check_identifier(response)?;

        let mut intercept = true;
        let mut terms: Vec<Term> = Vec::new();

        for (negated, body) in split_signed(rhs) {
            let body = body.trim();
            match body {
                "" => return Err(GlmError::ParseError("Empty term in formula".to_string())),
                "1" => intercept = !negated,
                "0" if !negated => intercept = false,
                _ if negated => {
                    return Err(GlmError::ParseError(format!(
                        "Removing term '{body}' is not supported; only '- 1' is"
                    )))
                }
                _ => {
                    for term in expand_term(body)? {
                        if !terms.contains(&term) {
                            terms.push(term);
                        }
                    }
                }
            }
        }

        // Main effects first, then two-way interactions, and so on.
        terms.sort_by_key(Term::order);

        Ok(Self {
            response: response.to_string(),
            terms,
            intercept,
        })
    }

    /// Formula restricted to its first `count` terms.
    pub fn truncated(&self, count: usize) -> Self {
        Self {
            response: self.response.clone(),
            terms: self.terms.iter().take(count).cloned().collect(),
            intercept: self.intercept,
        }
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        let rhs = match (parts.is_empty(), self.intercept) {
            (true, true) => "1".to_string(),
            (true, false) => "-1".to_string(),
            (false, true) => parts.join(" + "),
            (false, false) => format!("{} - 1", parts.join(" + ")),
        };
        write!(f, "{} ~ {rhs}", self.response)
    }
}

impl std::str::FromStr for Formula {
    type Err = GlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s)
    }
}

/// Split the right-hand side on top-level `+` and `-`, keeping the sign of each piece.
fn split_signed(rhs: &str) -> Vec<(bool, String)> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut negated = false;
    let mut depth = 0usize;

    for c in rhs.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '+' | '-' if depth == 0 => {
                if !(current.trim().is_empty() && pieces.is_empty() && !negated) {
                    pieces.push((negated, std::mem::take(&mut current)));
                } else {
                    current.clear();
                }
                negated = c == '-';
            }
            _ => current.push(c),
        }
    }
    pieces.push((negated, current));
    pieces
}

/// Expand `a*b:c` style products into the list of terms they denote.
fn expand_term(body: &str) -> Result<Vec<Term>, GlmError> {
    let factors: Vec<Vec<Predictor>> = body
        .split('*')
        .map(|group| {
            group
                .split(':')
                .map(Predictor::parse)
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<_, _>>()?;

    // Every non-empty subset of the crossed groups, smallest first.
    let n = factors.len();
    let mut terms = Vec::new();
    for mask in 1usize..(1 << n) {
        let mut predictors: Vec<Predictor> = Vec::new();
        for (i, group) in factors.iter().enumerate() {
            if mask & (1 << i) != 0 {
                for p in group {
                    if !predictors.contains(p) {
                        predictors.push(p.clone());
                    }
                }
            }
        }
        terms.push(Term { predictors });
    }
    terms.sort_by_key(Term::order);
    Ok(terms)
}
