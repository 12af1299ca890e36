//! Named numeric parameters shared by all expressions.
//!
//! Compiled functions take the plotting parameter first and then the variable values in
//! the order of [`VariableSet::names`]; both lists are produced from the same storage so
//! they never drift apart.
use crate::errors::PlotError;
use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// axis symbols and the Euler constant cannot be variables
const RESERVED: [&str; 3] = ["x", "y", "e"];

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]$").expect("valid regex literal"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: f64,
    /// slider range, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vrange: Option<[f64; 2]>,
}

/// What a mutation of the set means for the expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableChange {
    /// only values changed: replot with the existing functions
    Values,
    /// the ordered name list changed: every expression must be recompiled
    Names,
}

/// Checks that `name` is a single ASCII letter other than `x`, `y` and `e`.
pub fn validate_name(name: &str) -> Result<(), PlotError> {
    if !NAME_RE.is_match(name) || RESERVED.contains(&name) {
        return Err(PlotError::InvalidVariable(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSet {
    vars: Vec<Variable>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the set from persisted records; invalid or duplicate names are dropped.
    pub fn from_records(records: Vec<Variable>) -> Self {
        let mut set = VariableSet::new();
        for var in records {
            let Variable { name, value, vrange } = var;
            match set.add(&name, value) {
                Ok(_) => {
                    if let Some(last) = set.vars.last_mut() {
                        last.vrange = vrange;
                    }
                }
                Err(e) => warn!("skipping stored variable: {}", e),
            }
        }
        set
    }

    pub fn records(&self) -> &[Variable] {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// ordered variable names, the symbol list handed to the compiler
    pub fn names(&self) -> Vec<String> {
        self.vars.iter().map(|v| v.name.clone()).collect()
    }

    /// ordered values, aligned with [`Self::names`]
    pub fn values(&self) -> Vec<f64> {
        self.vars.iter().map(|v| v.value).collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.vars.iter().find(|v| v.name == name).map(|v| v.value)
    }

    /// Adds a new variable.
    ///
    /// # Returns
    /// `VariableChange::Names`, or `InvalidVariable` for a bad or already used name.
    pub fn add(&mut self, name: &str, value: f64) -> Result<VariableChange, PlotError> {
        validate_name(name)?;
        if self.get(name).is_some() {
            return Err(PlotError::InvalidVariable(name.to_string()));
        }
        info!("variable {} = {} added", name, value);
        self.vars.push(Variable {
            name: name.to_string(),
            value,
            vrange: None,
        });
        Ok(VariableChange::Names)
    }

    pub fn set_value(&mut self, name: &str, value: f64) -> Result<VariableChange, PlotError> {
        let var = self
            .vars
            .iter_mut()
            .find(|v| v.name == name)
            .ok_or_else(|| PlotError::UndefinedVariable(vec![name.to_string()]))?;
        var.value = value;
        Ok(VariableChange::Values)
    }

    pub fn set_range(&mut self, name: &str, range: [f64; 2]) -> Result<(), PlotError> {
        let var = self
            .vars
            .iter_mut()
            .find(|v| v.name == name)
            .ok_or_else(|| PlotError::UndefinedVariable(vec![name.to_string()]))?;
        var.vrange = Some(range);
        Ok(())
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<VariableChange, PlotError> {
        if old == new {
            return Ok(VariableChange::Values);
        }
        validate_name(new)?;
        if self.get(new).is_some() {
            return Err(PlotError::InvalidVariable(new.to_string()));
        }
        let var = self
            .vars
            .iter_mut()
            .find(|v| v.name == old)
            .ok_or_else(|| PlotError::UndefinedVariable(vec![old.to_string()]))?;
        var.name = new.to_string();
        Ok(VariableChange::Names)
    }

    pub fn remove(&mut self, name: &str) -> Option<VariableChange> {
        let before = self.vars.len();
        self.vars.retain(|v| v.name != name);
        (self.vars.len() != before).then_some(VariableChange::Names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert!(validate_name("a").is_ok());
        assert!(validate_name("Q").is_ok());
        for bad in ["x", "y", "e", "ab", "", "1", "_"] {
            assert!(validate_name(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn test_names_and_values_aligned() {
        let mut set = VariableSet::new();
        set.add("b", 2.0).unwrap();
        set.add("a", 1.0).unwrap();
        assert_eq!(set.names(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(set.values(), vec![2.0, 1.0]);
        assert_eq!(set.set_value("a", 5.0).unwrap(), VariableChange::Values);
        assert_eq!(set.values(), vec![2.0, 5.0]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut set = VariableSet::new();
        set.add("k", 1.0).unwrap();
        assert_eq!(
            set.add("k", 2.0),
            Err(PlotError::InvalidVariable("k".to_string()))
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_rename_and_remove_change_names() {
        let mut set = VariableSet::new();
        set.add("a", 1.0).unwrap();
        assert_eq!(set.rename("a", "c").unwrap(), VariableChange::Names);
        assert_eq!(set.get("c"), Some(1.0));
        assert!(set.rename("c", "y").is_err());
        assert_eq!(set.remove("c"), Some(VariableChange::Names));
        assert_eq!(set.remove("c"), None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_from_records_skips_invalid() {
        let set = VariableSet::from_records(vec![
            Variable {
                name: "a".into(),
                value: 1.0,
                vrange: Some([0.0, 10.0]),
            },
            Variable {
                name: "x".into(),
                value: 2.0,
                vrange: None,
            },
        ]);
        assert_eq!(set.names(), vec!["a".to_string()]);
        assert_eq!(set.records()[0].vrange, Some([0.0, 10.0]));
    }
}
