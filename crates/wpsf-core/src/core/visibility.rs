// crates/wpsf-core/src/core/visibility.rs
// ============================================================================
// Module: WPSF Visibility Rules
// Description: Conditional-visibility sources, expression tree, and evaluator.
// Purpose: Compile show_if/hide_if conditions into a portable boolean tree.
// Dependencies: serde, serde_json, smallvec, thiserror
// ============================================================================

//! ## Overview
//! Schemas declare visibility with `show_if` and `hide_if` condition lists.
//! A condition is either a single clause (`{field, value: [..]}`, matching
//! when the field equals any listed value) or a sequence of clauses that must
//! all match. Entries of a list combine with OR.
//!
//! [`compile`] lowers both lists into one [`VisibilityExpr`]:
//! `visible = show AND NOT hide`, where an absent or empty `show_if` is
//! `true` and an absent or empty `hide_if` is `false`. The structured tree is
//! the canonical form and serializes as JSON; [`visibility_classes`] produces
//! the class-name encoding consumed by the browser script.
//!
//! Clause `field` values name derived setting keys, which are also the
//! element ids of rendered inputs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use smallvec::SmallVec;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum nesting depth accepted for untrusted expression trees.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Class slug marking an element with show rules.
const SHOW_IF_SLUG: &str = "show-if";

/// Class slug marking an element with hide rules.
const HIDE_IF_SLUG: &str = "hide-if";

// ============================================================================
// SECTION: Condition Sources
// ============================================================================

/// One field-equality clause as written in a schema source.
///
/// # Invariants
/// - A clause without a field or without values contributes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Setting key whose value is tested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Accepted values; the clause matches when any one is present.
    #[serde(default, deserialize_with = "deserialize_condition_values")]
    pub value: Vec<String>,
}

impl Clause {
    /// Returns the field and values when the clause constrains anything.
    fn constraint(&self) -> Option<(&str, &[String])> {
        match self.field.as_deref() {
            Some(field) if !field.is_empty() && !self.value.is_empty() => {
                Some((field, self.value.as_slice()))
            }
            _ => None,
        }
    }
}

/// One entry of a `show_if`/`hide_if` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// Clauses that must all match.
    All(Vec<Clause>),
    /// A single clause.
    Clause(Clause),
}

/// Schema elements carrying visibility conditions.
pub trait Conditional {
    /// Returns the `show_if` list, if declared.
    fn show_if(&self) -> Option<&[Condition]>;

    /// Returns the `hide_if` list, if declared.
    fn hide_if(&self) -> Option<&[Condition]>;
}

/// Accepts a list of scalars or a single scalar for clause values.
fn deserialize_condition_values<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let values = match raw {
        Value::Array(items) => items.iter().filter_map(match_text).collect(),
        other => match_text(&other).into_iter().collect(),
    };
    Ok(values)
}

/// Returns the text a scalar value is compared as.
///
/// Strings compare verbatim, booleans as `"1"`/`"0"`, numbers by their
/// decimal text. Null, arrays, and objects have no text.
#[must_use]
pub fn match_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some("0".to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// ============================================================================
// SECTION: Expression Tree
// ============================================================================

/// Leaf predicate: a field equals one of the listed values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueMatch {
    /// Setting key whose value is tested.
    pub field: String,
    /// Accepted values (OR).
    pub values: Vec<String>,
}

impl ValueMatch {
    /// Returns true when the value (or any element of an array value) is listed.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match value {
            Value::Array(items) => items.iter().any(|item| self.matches_scalar(item)),
            other => self.matches_scalar(other),
        }
    }

    /// Compares one scalar against the listed values.
    fn matches_scalar(&self, value: &Value) -> bool {
        match_text(value).is_some_and(|text| self.values.iter().any(|candidate| *candidate == text))
    }
}

/// Structured visibility expression.
///
/// Empty `And` is true and empty `Or` is false, matching the identities for
/// absent `show_if` and `hide_if` lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityExpr {
    /// All children must hold.
    And(SmallVec<[Box<Self>; 4]>),
    /// At least one child must hold.
    Or(SmallVec<[Box<Self>; 4]>),
    /// Inverts the child.
    Not(Box<Self>),
    /// Field value comparison.
    Match(ValueMatch),
}

impl VisibilityExpr {
    /// Returns the always-true expression.
    #[must_use]
    pub fn always() -> Self {
        Self::And(SmallVec::new())
    }

    /// Returns the always-false expression.
    #[must_use]
    pub fn never() -> Self {
        Self::Or(SmallVec::new())
    }

    /// Builds a conjunction.
    #[must_use]
    pub fn and(children: impl IntoIterator<Item = Self>) -> Self {
        Self::And(children.into_iter().map(Box::new).collect())
    }

    /// Builds a disjunction.
    #[must_use]
    pub fn or(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(children.into_iter().map(Box::new).collect())
    }

    /// Builds a field comparison leaf.
    #[must_use]
    pub fn matches(field: impl Into<String>, values: impl IntoIterator<Item = String>) -> Self {
        Self::Match(ValueMatch {
            field: field.into(),
            values: values.into_iter().collect(),
        })
    }

    /// Evaluates the expression against current field values.
    ///
    /// Absent fields never match.
    pub fn eval<V>(&self, values: &V) -> bool
    where
        V: FieldValues + ?Sized,
    {
        match self {
            Self::Match(leaf) => values.field_value(&leaf.field).is_some_and(|value| leaf.matches(value)),
            Self::Not(inner) => !inner.eval(values),
            Self::And(children) => children.iter().all(|child| child.eval(values)),
            Self::Or(children) => children.iter().any(|child| child.eval(values)),
        }
    }

    /// Returns true when the expression holds regardless of field values.
    #[must_use]
    pub fn is_trivially_satisfied(&self) -> bool {
        match self {
            Self::And(children) => children.iter().all(|child| child.is_trivially_satisfied()),
            Self::Or(children) => children.iter().any(|child| child.is_trivially_satisfied()),
            Self::Not(inner) => inner.is_trivially_unsatisfiable(),
            Self::Match(_) => false,
        }
    }

    /// Returns true when the expression fails regardless of field values.
    #[must_use]
    pub fn is_trivially_unsatisfiable(&self) -> bool {
        match self {
            Self::And(children) => children.iter().any(|child| child.is_trivially_unsatisfiable()),
            Self::Or(children) => children.iter().all(|child| child.is_trivially_unsatisfiable()),
            Self::Not(inner) => inner.is_trivially_satisfied(),
            Self::Match(_) => false,
        }
    }

    /// Returns the nesting depth (a leaf or empty group has depth 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::And(children) | Self::Or(children) => {
                1 + children.iter().map(|child| child.depth()).max().unwrap_or(0)
            }
            Self::Not(inner) => 1 + inner.depth(),
            Self::Match(_) => 1,
        }
    }

    /// Serializes the expression as canonical JSON.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::Serialize`] when encoding fails.
    pub fn to_json(&self) -> Result<String, VisibilityError> {
        let bytes = serde_jcs::to_vec(self).map_err(|err| VisibilityError::Serialize(err.to_string()))?;
        String::from_utf8(bytes).map_err(|err| VisibilityError::Serialize(err.to_string()))
    }
}

impl std::ops::Not for VisibilityExpr {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

// ============================================================================
// SECTION: Field Values
// ============================================================================

/// Read access to current field values keyed by setting key.
pub trait FieldValues {
    /// Returns the current value of a field, if any.
    fn field_value(&self, field: &str) -> Option<&Value>;
}

impl FieldValues for BTreeMap<String, Value> {
    fn field_value(&self, field: &str) -> Option<&Value> {
        self.get(field)
    }
}

impl FieldValues for Map<String, Value> {
    fn field_value(&self, field: &str) -> Option<&Value> {
        self.get(field)
    }
}

// ============================================================================
// SECTION: Compilation
// ============================================================================

/// Compiles an element's `show_if` and `hide_if` lists into one expression.
#[must_use]
pub fn compile<C>(element: &C) -> VisibilityExpr
where
    C: Conditional + ?Sized,
{
    let show = element.show_if().and_then(compile_list).unwrap_or_else(VisibilityExpr::always);
    let hide = element.hide_if().and_then(compile_list).unwrap_or_else(VisibilityExpr::never);
    VisibilityExpr::and([show, !hide])
}

/// Compiles one condition list; `None` when no entry constrains anything.
#[must_use]
pub fn compile_list(conditions: &[Condition]) -> Option<VisibilityExpr> {
    let mut rules: Vec<VisibilityExpr> = conditions.iter().filter_map(compile_condition).collect();
    match rules.len() {
        0 => None,
        1 => rules.pop(),
        _ => Some(VisibilityExpr::or(rules)),
    }
}

/// Compiles one condition entry.
fn compile_condition(condition: &Condition) -> Option<VisibilityExpr> {
    match condition {
        Condition::Clause(clause) => compile_clause(clause),
        Condition::All(clauses) => {
            let mut parts: Vec<VisibilityExpr> = clauses.iter().filter_map(compile_clause).collect();
            match parts.len() {
                0 => None,
                1 => parts.pop(),
                _ => Some(VisibilityExpr::and(parts)),
            }
        }
    }
}

/// Compiles one clause into a match leaf.
fn compile_clause(clause: &Clause) -> Option<VisibilityExpr> {
    clause
        .constraint()
        .map(|(field, values)| VisibilityExpr::matches(field, values.iter().cloned()))
}

// ============================================================================
// SECTION: Class Encoding
// ============================================================================

/// Returns the class-name encoding of an element's visibility rules.
///
/// Each declared list adds a marker class (` show-if`, ` hide-if`) followed by
/// one class per constraining entry: `show-if--{field}==={v1||v2}` for a
/// clause and `show-if--{f}==={a}&&{g}==={b}` for a clause sequence. The
/// result is empty when neither list is declared.
#[must_use]
pub fn visibility_classes<C>(element: &C) -> String
where
    C: Conditional + ?Sized,
{
    let mut classes = String::new();
    if let Some(conditions) = element.show_if() {
        encode_class_list(SHOW_IF_SLUG, conditions, &mut classes);
    }
    if let Some(conditions) = element.hide_if() {
        encode_class_list(HIDE_IF_SLUG, conditions, &mut classes);
    }
    classes
}

/// Appends the marker and per-entry classes for one list.
fn encode_class_list(slug: &str, conditions: &[Condition], out: &mut String) {
    let _ = write!(out, " {slug}");
    for condition in conditions {
        let encoded = match condition {
            Condition::Clause(clause) => clause.constraint().map(encode_clause),
            Condition::All(clauses) => {
                let parts: Vec<String> =
                    clauses.iter().filter_map(Clause::constraint).map(encode_clause).collect();
                if parts.is_empty() { None } else { Some(parts.join("&&")) }
            }
        };
        if let Some(encoded) = encoded {
            let _ = write!(out, " {slug}--{encoded}");
        }
    }
}

/// Encodes one constraining clause as `{field}==={v1||v2}`.
fn encode_clause((field, values): (&str, &[String])) -> String {
    format!("{field}==={}", values.join("||"))
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Visibility expression errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VisibilityError {
    /// Expression nesting exceeds the configured limit.
    #[error("visibility expression too deep: {actual_depth} > {max_depth}")]
    TooDeep {
        /// Maximum permitted depth.
        max_depth: usize,
        /// Depth of the rejected expression.
        actual_depth: usize,
    },
    /// Expression JSON failed to parse.
    #[error("visibility expression parse error: {0}")]
    Parse(String),
    /// Expression failed to serialize.
    #[error("visibility expression serialization error: {0}")]
    Serialize(String),
}

/// Structural validator for expression trees received from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityValidator {
    /// Maximum permitted nesting depth.
    max_depth: usize,
}

impl Default for VisibilityValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl VisibilityValidator {
    /// Creates a validator with the given depth limit.
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
        }
    }

    /// Validates expression depth.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::TooDeep`] when the tree exceeds the limit.
    pub fn validate(&self, expr: &VisibilityExpr) -> Result<(), VisibilityError> {
        let actual_depth = expr.depth();
        if actual_depth > self.max_depth {
            return Err(VisibilityError::TooDeep {
                max_depth: self.max_depth,
                actual_depth,
            });
        }
        Ok(())
    }

    /// Parses and validates an expression from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError`] when parsing or validation fails.
    pub fn parse_json(&self, input: &str) -> Result<VisibilityExpr, VisibilityError> {
        let expr: VisibilityExpr =
            serde_json::from_str(input).map_err(|err| VisibilityError::Parse(err.to_string()))?;
        self.validate(&expr)?;
        Ok(expr)
    }
}
