//! The matrix engine: expanding matrix stubs into concrete build variants.
//!
//! Each matrix stub names a spec (axis id to value selectors), an optional
//! exclude list, and variant-level settings. The engine evaluates the spec
//! against the declared axes, enumerates every surviving cell, and builds
//! one synthesized variant per cell by merging the cell's axis values in
//! axis-declaration order. Tags and variables accumulate across the merge;
//! `run_on` and `modules` overwrite.

use crate::parser::{
    AxisValue, Matrix, MatrixAxis, MatrixCell, MatrixDefinition, ParserDependency, ParserVariant,
    ParserVariantTask, TaskSelector, VariantSelector,
};
use crate::selector::{Selector, TagSelectorEvaluator};
use foundry_core::error::CompileError;
use foundry_core::expansion::Expansions;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Evaluates axis-value selectors, one cohort per declared axis.
#[derive(Debug)]
pub struct AxisSelectorEvaluator {
    axes: HashMap<String, TagSelectorEvaluator>,
}

impl AxisSelectorEvaluator {
    pub fn new(axes: &[MatrixAxis]) -> Self {
        let axes = axes
            .iter()
            .map(|axis| {
                let cohort = axis
                    .values
                    .iter()
                    .map(|value| (value.id.clone(), value.tags.clone()));
                (axis.id.clone(), TagSelectorEvaluator::new(cohort))
            })
            .collect();
        Self { axes }
    }

    /// Evaluate a selector against one axis's values.
    pub fn eval(&self, axis: &str, selector: &Selector) -> Result<Vec<String>, CompileError> {
        let Some(evaluator) = self.axes.get(axis) else {
            return Err(CompileError::Matrix {
                context: format!("axis '{axis}'"),
                message: "unknown axis".to_string(),
            });
        };
        evaluator.eval(selector)
    }
}

/// Expand a list of value selectors for one axis into concrete value ids,
/// deduplicated in first-seen order.
fn evaluate_axis_tags(
    ase: &AxisSelectorEvaluator,
    axis: &str,
    selectors: &[String],
) -> (Vec<String>, Vec<CompileError>) {
    let mut ids = Vec::new();
    let mut errors = Vec::new();
    for selector in selectors {
        match ase.eval(axis, &Selector::parse(selector)) {
            Ok(names) => {
                for name in names {
                    if !ids.contains(&name) {
                        ids.push(name);
                    }
                }
            }
            Err(e) => errors.push(e),
        }
    }
    (ids, errors)
}

impl MatrixDefinition {
    /// Return a copy with every value selector evaluated to concrete ids.
    /// Axes that fail to evaluate are dropped and reported.
    pub fn evaluated(&self, ase: &AxisSelectorEvaluator) -> (MatrixDefinition, Vec<CompileError>) {
        let mut evaluated = IndexMap::new();
        let mut errors = Vec::new();
        for (axis, selectors) in &self.0 {
            let (ids, axis_errors) = evaluate_axis_tags(ase, axis, selectors);
            if !axis_errors.is_empty() {
                errors.extend(axis_errors);
                continue;
            }
            evaluated.insert(axis.clone(), ids);
        }
        (MatrixDefinition(evaluated), errors)
    }

    /// Enumerate every cell of the definition in odometer order: the first
    /// listed axis varies most rapidly. Assumes selectors are already
    /// evaluated.
    pub fn all_cells(&self) -> Result<Vec<MatrixCell>, String> {
        if self.0.is_empty() {
            return Ok(Vec::new());
        }
        let axes: Vec<(&String, &Vec<String>)> = self.0.iter().collect();
        for (axis, values) in &axes {
            if values.is_empty() {
                return Err(format!("axis '{axis}' has an empty values list"));
            }
        }
        let mut counters = vec![0usize; axes.len()];
        let mut cells = Vec::new();
        loop {
            let mut cell = IndexMap::new();
            for (i, (axis, values)) in axes.iter().enumerate() {
                cell.insert((*axis).clone(), values[counters[i]].clone());
            }
            cells.push(MatrixCell(cell));

            // carry into the next axis when a counter wraps
            let mut i = 0;
            loop {
                counters[i] += 1;
                if counters[i] < axes[i].1.len() {
                    break;
                }
                counters[i] = 0;
                i += 1;
                if i == axes.len() {
                    return Ok(cells);
                }
            }
        }
    }

    /// Whether a cell is contained by this definition: for every axis the
    /// definition constrains, the cell's value must appear in the
    /// definition's list. Axes the definition omits match any value.
    pub fn contains(&self, cell: &MatrixCell) -> bool {
        self.0.iter().all(|(axis, values)| {
            cell.0
                .get(axis)
                .is_some_and(|value| values.contains(value))
        })
    }
}

/// Whether any of the definitions contain the given cell.
pub fn any_contains(definitions: &[MatrixDefinition], cell: &MatrixCell) -> bool {
    definitions.iter().any(|d| d.contains(cell))
}

/// Evaluate every definition in a list, accumulating errors.
pub fn evaluated_copies(
    definitions: &[MatrixDefinition],
    ase: &AxisSelectorEvaluator,
) -> (Vec<MatrixDefinition>, Vec<CompileError>) {
    let mut out = Vec::new();
    let mut errors = Vec::new();
    for definition in definitions {
        let (evaluated, eval_errors) = definition.evaluated(ase);
        errors.extend(eval_errors);
        out.push(evaluated);
    }
    (out, errors)
}

fn unique_strings(values: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

impl ParserVariant {
    /// Merge one axis value into the variant. Variables and tags
    /// accumulate; `run_on`, `modules`, `stepback`, and `batchtime`
    /// overwrite when the axis value sets them. Every merged field is
    /// expanded against the variant's current expansion map first.
    fn merge_axis_value(&mut self, value: &AxisValue) -> Result<(), String> {
        if !value.variables.is_empty() {
            let expanded = self
                .expansions
                .expanded_map(&value.variables)
                .map_err(|e| format!("expanding variables: {e}"))?;
            self.expansions.update(expanded);
        }
        if !value.tags.is_empty() {
            let expanded = self
                .expansions
                .expand_all(&value.tags)
                .map_err(|e| format!("expanding tags: {e}"))?;
            let mut tags = std::mem::take(&mut self.tags);
            tags.extend(expanded);
            self.tags = unique_strings(tags);
        }
        if !value.run_on.is_empty() {
            self.run_on = self
                .expansions
                .expand_all(&value.run_on)
                .map_err(|e| format!("expanding run_on: {e}"))?;
        }
        if !value.modules.is_empty() {
            self.modules = self
                .expansions
                .expand_all(&value.modules)
                .map_err(|e| format!("expanding modules: {e}"))?;
        }
        if value.stepback.is_some() {
            self.stepback = value.stepback;
        }
        if value.batch_time.is_some() {
            self.batch_time = value.batch_time;
        }
        Ok(())
    }
}

/// Expand a variant task's name, distros, and embedded selectors against
/// an expansion map.
fn expand_variant_task(
    task: &ParserVariantTask,
    expansions: &Expansions,
) -> Result<ParserVariantTask, String> {
    let mut expanded = task.clone();
    expanded.name = expansions
        .expand(&task.name)
        .map_err(|e| format!("expanding name: {e}"))?;
    expanded.distros = expansions
        .expand_all(&task.distros)
        .map_err(|e| format!("expanding distros: {e}"))?;
    let mut deps = Vec::with_capacity(task.depends_on.len());
    for (i, dep) in task.depends_on.iter().enumerate() {
        deps.push(ParserDependency {
            selector: expand_task_selector(&dep.selector, expansions)
                .map_err(|e| format!("expanding depends_on[{i}]: {e}"))?,
            status: expansions
                .expand(&dep.status)
                .map_err(|e| format!("expanding depends_on[{i}].status: {e}"))?,
            patch_optional: dep.patch_optional,
        });
    }
    expanded.depends_on = deps;
    let mut reqs = Vec::with_capacity(task.requires.len());
    for (i, req) in task.requires.iter().enumerate() {
        reqs.push(
            expand_task_selector(req, expansions)
                .map_err(|e| format!("expanding requires[{i}]: {e}"))?,
        );
    }
    expanded.requires = reqs;
    Ok(expanded)
}

fn expand_task_selector(
    selector: &TaskSelector,
    expansions: &Expansions,
) -> Result<TaskSelector, String> {
    let name = expansions
        .expand(&selector.name)
        .map_err(|e| format!("expanding name: {e}"))?;
    let variant = match &selector.variant {
        None => None,
        Some(VariantSelector::Selector(s)) => Some(VariantSelector::Selector(
            expansions
                .expand(s)
                .map_err(|e| format!("expanding variant: {e}"))?,
        )),
        Some(VariantSelector::Matrix(definition)) => {
            let mut expanded = IndexMap::new();
            for (axis, values) in &definition.0 {
                expanded.insert(
                    axis.clone(),
                    expansions
                        .expand_all(values)
                        .map_err(|e| format!("expanding variant: {e}"))?,
                );
            }
            Some(VariantSelector::Matrix(MatrixDefinition(expanded)))
        }
    };
    Ok(TaskSelector { name, variant })
}

/// Expand every matrix stub into synthesized variants. Errors accumulate;
/// an errored cell is dropped and the rest continue, while a spec or
/// exclude that fails to evaluate skips its whole matrix.
pub fn build_matrix_variants(
    axes: &[MatrixAxis],
    ase: &AxisSelectorEvaluator,
    matrices: &[Matrix],
) -> (Vec<ParserVariant>, Vec<CompileError>) {
    let mut variants = Vec::new();
    let mut errors = Vec::new();
    for matrix in matrices {
        let (spec, spec_errors) = matrix.spec.evaluated(ase);
        if !spec_errors.is_empty() {
            errors.extend(spec_errors);
            continue;
        }
        let (excludes, exclude_errors) = evaluated_copies(&matrix.exclude, ase);
        if !exclude_errors.is_empty() {
            errors.extend(exclude_errors);
            continue;
        }
        let unpruned = match spec.all_cells() {
            Ok(cells) => cells,
            Err(message) => {
                errors.push(CompileError::Matrix {
                    context: matrix.id.clone(),
                    message,
                });
                continue;
            }
        };
        let mut excluded = 0usize;
        let mut pruned = Vec::new();
        for cell in &unpruned {
            if any_contains(&excludes, cell) {
                excluded += 1;
                continue;
            }
            match build_matrix_variant(axes, cell, matrix, ase) {
                Ok(variant) => pruned.push(variant),
                Err(message) => errors.push(CompileError::Matrix {
                    context: matrix.id.clone(),
                    message: format!("error building matrix cell {cell}: {message}"),
                }),
            }
        }
        if !matrix.exclude.is_empty() {
            if excluded == 0 {
                errors.push(CompileError::Matrix {
                    context: matrix.id.clone(),
                    message: "exclude field did not exclude anything".to_string(),
                });
            } else if excluded == unpruned.len() {
                errors.push(CompileError::Matrix {
                    context: matrix.id.clone(),
                    message: "exclude field excluded every cell".to_string(),
                });
            }
        }
        variants.extend(pruned);
    }
    (variants, errors)
}

/// Build the synthesized variant for one matrix cell.
pub fn build_matrix_variant(
    axes: &[MatrixAxis],
    cell: &MatrixCell,
    matrix: &Matrix,
    ase: &AxisSelectorEvaluator,
) -> Result<ParserVariant, String> {
    let mut variant = ParserVariant {
        matrix_id: matrix.id.clone(),
        matrix_cell: Some(cell.clone()),
        stepback: matrix.stepback,
        batch_time: matrix.batch_time,
        modules: matrix.modules.clone(),
        run_on: matrix.run_on.clone(),
        expansions: cell
            .0
            .iter()
            .map(|(axis, value)| (axis.clone(), value.clone()))
            .collect(),
        ..Default::default()
    };

    // The axis declaration list drives iteration so cell names come out
    // in a consistent order regardless of how the spec was written.
    let mut display_expansions = Expansions::new();
    let mut name = format!("{}__", matrix.id);
    let mut used_axes = 0;
    for axis in axes {
        let Some(value_id) = cell.0.get(&axis.id) else {
            continue;
        };
        used_axes += 1;
        let Some(axis_value) = axis.find(value_id) else {
            return Err(format!(
                "axis '{}' does not contain value '{}'",
                axis.id, value_id
            ));
        };
        variant.merge_axis_value(axis_value).map_err(|e| {
            format!("processing axis value {},{}: {e}", axis.id, axis_value.id)
        })?;
        // display names fall back to the value id so we always have something
        if axis_value.display_name.is_empty() {
            display_expansions.put(axis.id.clone(), axis_value.id.clone());
        } else {
            display_expansions.put(axis.id.clone(), axis_value.display_name.clone());
        }

        name.push_str(&axis.id);
        name.push('~');
        name.push_str(value_id);
        if used_axes < cell.0.len() {
            name.push('_');
        }
    }
    if used_axes != cell.0.len() {
        return Err(format!("cell {cell} uses undefined axes"));
    }
    variant.name = name;
    variant.display_name = display_expansions
        .expand(&matrix.display_name)
        .map_err(|e| format!("processing display name: {e}"))?;

    // matrix-level tags merge last, after every axis value
    let matrix_tags = AxisValue {
        tags: matrix.tags.clone(),
        ..Default::default()
    };
    variant
        .merge_axis_value(&matrix_tags)
        .map_err(|e| format!("processing matrix tags: {e}"))?;

    for task in &matrix.tasks {
        let expanded = expand_variant_task(task, &variant.expansions)
            .map_err(|e| format!("processing task {}: {e}", task.name))?;
        variant.tasks.push(expanded);
    }

    for (i, rule) in matrix.rules.iter().enumerate() {
        let (matchers, errors) = evaluated_copies(&rule.matchers, ase);
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(format!("evaluating rules: {}", messages.join("; ")));
        }
        if any_contains(&matchers, cell) {
            if let Some(set) = &rule.action.set {
                variant
                    .merge_axis_value(set)
                    .map_err(|e| format!("evaluating rule {i}: {e}"))?;
            }
            // add/remove rules run later, when variant tasks are evaluated
            if !rule.action.remove_tasks.is_empty() || !rule.action.add_tasks.is_empty() {
                variant.matrix_rules.push(rule.action.clone());
            }
        }
    }
    Ok(variant)
}
