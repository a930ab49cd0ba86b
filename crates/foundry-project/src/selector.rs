//! The tag-selector language.
//!
//! Selectors pick groups of tasks, variants, or axis values by name and
//! tag. A selector is a whitespace-delimited list of criteria; each
//! criterion is a name or a tag with optional modifiers:
//!
//! ```text
//! Selector  := Criterion ( WS+ Criterion )*
//! Criterion := '!'? '.'? Name
//! ```
//!
//! where `!` negates the criterion and `.` selects by tag instead of name.
//! The result is the intersection of the per-criterion sets:
//!
//! - `red` returns the item named "red"
//! - `.primary` returns every item tagged "primary"
//! - `!.primary` returns every item NOT tagged "primary"
//! - `.cool !blue` returns every item tagged "cool" except "blue"
//!
//! `*` selects everything and admits no modifiers.

use foundry_core::error::CompileError;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// The all-selector.
pub const SELECT_ALL: &str = "*";

/// A parsed selector: one or more criteria to intersect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub criteria: Vec<Criterion>,
}

impl Selector {
    /// Parse a selector string. Parsing never fails; invalid criteria are
    /// reported at evaluation time. An empty string yields no criteria.
    pub fn parse(input: &str) -> Selector {
        Selector {
            criteria: input.split_whitespace().map(Criterion::parse).collect(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, criterion) in self.criteria.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{criterion}")?;
        }
        Ok(())
    }
}

/// One criterion of a selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criterion {
    pub name: String,
    pub tagged: bool,
    pub negated: bool,
}

impl Criterion {
    /// Parse a single criterion. Assumes `input` holds no whitespace.
    fn parse(input: &str) -> Criterion {
        let mut rest = input;
        let mut criterion = Criterion::default();
        if let Some(stripped) = rest.strip_prefix('!') {
            criterion.negated = true;
            rest = stripped;
        }
        if let Some(stripped) = rest.strip_prefix('.') {
            criterion.tagged = true;
            rest = stripped;
        }
        criterion.name = rest.to_string();
        criterion
    }

    /// Check that the criterion is well formed.
    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("name is empty".to_string());
        }
        if let Some(first) = self.name.chars().next()
            && (first == '!' || first == '.')
        {
            return Err(format!("name starts with invalid character '{first}'"));
        }
        if self.name == SELECT_ALL {
            if self.tagged {
                return Err(format!("cannot use '.' with special name '{SELECT_ALL}'"));
            }
            if self.negated {
                return Err(format!("cannot use '!' with special name '{SELECT_ALL}'"));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!")?;
        }
        if self.tagged {
            write!(f, ".")?;
        }
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone)]
struct Selectee {
    name: String,
    tags: Vec<String>,
}

/// Evaluates selectors against a fixed cohort of named, tagged items.
///
/// The cohort is captured up front as `(name, tags)` pairs; name and tag
/// indices are precomputed and evaluation is read-only. Results come back
/// in cohort order.
#[derive(Debug)]
pub struct TagSelectorEvaluator {
    items: Vec<Selectee>,
    by_name: HashMap<String, usize>,
    by_tag: HashMap<String, Vec<usize>>,
}

impl TagSelectorEvaluator {
    pub fn new(cohort: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        let items: Vec<Selectee> = cohort
            .into_iter()
            .map(|(name, tags)| Selectee { name, tags })
            .collect();
        let mut by_name = HashMap::new();
        let mut by_tag: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, item) in items.iter().enumerate() {
            by_name.insert(item.name.clone(), i);
            for tag in &item.tags {
                by_tag.entry(tag.clone()).or_default().push(i);
            }
        }
        Self {
            items,
            by_name,
            by_tag,
        }
    }

    /// Evaluate a selector, returning the matching names in cohort order.
    /// A selector that matches nothing is an error, not an empty set.
    pub fn eval(&self, selector: &Selector) -> Result<Vec<String>, CompileError> {
        if selector.criteria.is_empty() {
            return Err(CompileError::Selector {
                selector: selector.to_string(),
                message: "selector has no criteria".to_string(),
            });
        }
        let mut result: Option<Vec<usize>> = None;
        for criterion in &selector.criteria {
            let indices = self
                .eval_criterion(criterion)
                .map_err(|message| CompileError::Selector {
                    selector: selector.to_string(),
                    message,
                })?;
            result = Some(match result {
                None => indices,
                Some(previous) => {
                    let keep: HashSet<usize> = indices.into_iter().collect();
                    previous.into_iter().filter(|i| keep.contains(i)).collect()
                }
            });
        }
        let result = result.unwrap_or_default();
        if result.is_empty() {
            return Err(CompileError::Selector {
                selector: selector.to_string(),
                message: "no items satisfy the selector".to_string(),
            });
        }
        Ok(result
            .into_iter()
            .map(|i| self.items[i].name.clone())
            .collect())
    }

    /// Resolve one criterion to a set of cohort indices.
    fn eval_criterion(&self, criterion: &Criterion) -> Result<Vec<usize>, String> {
        if let Err(why) = criterion.validate() {
            return Err(format!("criterion '{criterion}' is invalid: {why}"));
        }

        if criterion.name == SELECT_ALL {
            return Ok((0..self.items.len()).collect());
        }

        match (criterion.tagged, criterion.negated) {
            // a regular name
            (false, false) => match self.by_name.get(&criterion.name) {
                Some(&i) => Ok(vec![i]),
                None => Err(format!("nothing named '{}'", criterion.name)),
            },

            // expand a tag
            (true, false) => match self.by_tag.get(&criterion.name) {
                Some(indices) => Ok(indices.clone()),
                None => Err(format!("nothing has the tag '{}'", criterion.name)),
            },

            // everything but a specific name
            (false, true) => match self.by_name.get(&criterion.name) {
                Some(&skip) => Ok((0..self.items.len()).filter(|&i| i != skip).collect()),
                None => Err(format!("nothing named '{}'", criterion.name)),
            },

            // everything but a tag
            (true, true) => match self.by_tag.get(&criterion.name) {
                Some(indices) => {
                    let tagged: HashSet<usize> = indices.iter().copied().collect();
                    Ok((0..self.items.len())
                        .filter(|i| !tagged.contains(i))
                        .collect())
                }
                None => Err(format!("nothing has the tag '{}'", criterion.name)),
            },
        }
    }
}
