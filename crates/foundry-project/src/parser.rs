//! The surface decoder: YAML bytes to the intermediate project.
//!
//! Project configuration is deliberately loose on the surface: most fields
//! accept a bare string where a list or an object is expected, so users can
//! write `tags: "single_tag"` instead of `tags: ["single_tag"]`, or refer
//! to a task by a single selector string. The decoder reads the document
//! into a [`serde_yaml::Value`] first (so syntax errors keep the parser's
//! line numbers) and then walks the tree node by node, trying the accepted
//! shapes for each field in order and accumulating an error per field that
//! matches none of them.
//!
//! Matrix definitions live inside the `buildvariants` list on the surface;
//! after the walk they are sieved into their own list for the matrix
//! engine. Nothing here evaluates selectors or matrices: that is the
//! translator's job, and code outside this crate never sees these types.

use foundry_core::error::CompileError;
use foundry_core::expansion::Expansions;
use foundry_core::project::{Command, CommandSet, Module};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::fmt;

/// The decoded-but-not-yet-evaluated form of a project document.
#[derive(Debug, Clone, Default)]
pub struct ParserProject {
    pub enabled: bool,
    pub stepback: bool,
    pub disable_cleanup: bool,
    pub batch_time: i64,
    pub owner: String,
    pub repo: String,
    pub remote_path: String,
    pub repo_kind: String,
    pub branch: String,
    pub identifier: String,
    pub display_name: String,
    pub command_type: String,
    pub ignore: Vec<String>,
    pub pre: Option<CommandSet>,
    pub post: Option<CommandSet>,
    pub timeout: Option<CommandSet>,
    pub callback_timeout_secs: i64,
    pub modules: Vec<Module>,
    pub build_variants: Vec<ParserVariant>,
    pub functions: IndexMap<String, CommandSet>,
    pub tasks: Vec<ParserTask>,
    pub exec_timeout_secs: i64,
    pub axes: Vec<MatrixAxis>,
    /// Matrix stubs sieved out of `buildvariants`.
    pub matrices: Vec<Matrix>,
}

/// An intermediate task definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserTask {
    pub name: String,
    pub priority: i64,
    pub exec_timeout_secs: i64,
    pub disable_cleanup: bool,
    pub depends_on: Vec<ParserDependency>,
    pub requires: Vec<TaskSelector>,
    pub commands: Vec<Command>,
    pub tags: Vec<String>,
    pub stepback: Option<bool>,
}

/// An intermediate dependency: a task selector plus edge attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserDependency {
    pub selector: TaskSelector,
    pub status: String,
    pub patch_optional: bool,
}

/// Selects task/variant combinations in dependency and requirement fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskSelector {
    pub name: String,
    pub variant: Option<VariantSelector>,
}

/// A variant reference: either a selector string or a matrix sub-definition.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantSelector {
    Selector(String),
    Matrix(MatrixDefinition),
}

/// An intermediate build variant. Matrix-synthesized variants carry their
/// originating matrix id, cell, and any deferred task rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserVariant {
    pub name: String,
    pub display_name: String,
    pub expansions: Expansions,
    pub tags: Vec<String>,
    pub modules: Vec<String>,
    pub disabled: bool,
    pub push: bool,
    pub batch_time: Option<i64>,
    pub stepback: Option<bool>,
    pub run_on: Vec<String>,
    pub tasks: Vec<ParserVariantTask>,

    pub matrix_id: String,
    pub matrix_cell: Option<MatrixCell>,
    pub matrix_rules: Vec<RuleAction>,
}

/// An intermediate task-in-variant definition. `run_on` is accepted as a
/// synonym for `distros` on the surface and folded in during decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserVariantTask {
    pub name: String,
    pub patchable: Option<bool>,
    pub priority: i64,
    pub depends_on: Vec<ParserDependency>,
    pub requires: Vec<TaskSelector>,
    pub exec_timeout_secs: i64,
    pub stepback: Option<bool>,
    pub distros: Vec<String>,
}

/// A matrix axis: one dimension of variation with ordered discrete values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixAxis {
    pub id: String,
    pub display_name: String,
    pub values: Vec<AxisValue>,
}

impl MatrixAxis {
    pub fn find(&self, id: &str) -> Option<&AxisValue> {
        self.values.iter().find(|v| v.id == id)
    }
}

/// One value of a matrix axis, with the settings it contributes to a cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisValue {
    pub id: String,
    pub display_name: String,
    pub variables: Expansions,
    pub run_on: Vec<String>,
    pub tags: Vec<String>,
    pub modules: Vec<String>,
    pub batch_time: Option<i64>,
    pub stepback: Option<bool>,
}

/// A mapping from axis id to a list of axis-value selectors, in document
/// order. Doubles as the shape of matrix specs, excludes, and rule matchers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixDefinition(pub IndexMap<String, Vec<String>>);

impl fmt::Display for MatrixDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(json) => write!(f, "{json}"),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

/// One cell of a matrix: a concrete axis-value id per axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixCell(pub IndexMap<String, String>);

impl fmt::Display for MatrixCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(json) => write!(f, "{json}"),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

/// A matrix stub: a template that fans out into one variant per cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix {
    pub id: String,
    pub spec: MatrixDefinition,
    pub exclude: Vec<MatrixDefinition>,
    pub display_name: String,
    pub tags: Vec<String>,
    pub modules: Vec<String>,
    pub batch_time: Option<i64>,
    pub stepback: Option<bool>,
    pub run_on: Vec<String>,
    pub tasks: Vec<ParserVariantTask>,
    pub rules: Vec<MatrixRule>,
}

/// A conditional per-cell rule inside a matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixRule {
    pub matchers: Vec<MatrixDefinition>,
    pub action: RuleAction,
}

/// What a matched rule does to the cell's variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleAction {
    pub set: Option<AxisValue>,
    pub remove_tasks: Vec<String>,
    pub add_tasks: Vec<ParserVariantTask>,
}

/// Decode YAML bytes into an intermediate project.
///
/// A YAML syntax error is terminal and returned alone; shape and
/// validation errors accumulate across the whole document. Any error at
/// this stage means no usable project.
pub fn create_intermediate_project(data: &[u8]) -> Result<ParserProject, Vec<CompileError>> {
    let root: Value = serde_yaml::from_slice(data).map_err(|e| {
        vec![CompileError::Yaml {
            message: e.to_string(),
        }]
    })?;
    let mut decoder = Decoder::default();
    let project = decoder.project(&root);
    if decoder.errors.is_empty() {
        Ok(project)
    } else {
        Err(decoder.errors)
    }
}

/// A decoded `buildvariants` entry, before sieving.
enum VariantEntry {
    Regular(ParserVariant),
    Stub(Matrix),
}

/// Partition decoded buildvariant entries into regular variants and
/// matrix stubs.
fn sieve_matrix_variants(entries: Vec<VariantEntry>) -> (Vec<ParserVariant>, Vec<Matrix>) {
    let mut regular = Vec::new();
    let mut matrices = Vec::new();
    for entry in entries {
        match entry {
            VariantEntry::Regular(variant) => regular.push(variant),
            VariantEntry::Stub(matrix) => matrices.push(matrix),
        }
    }
    (regular, matrices)
}

fn entry<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a Value> {
    mapping.get(Value::String(key.to_string()))
}

fn present<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a Value> {
    entry(mapping, key).filter(|v| !v.is_null())
}

/// Walks a parsed YAML document, accumulating shape errors as it goes.
#[derive(Default)]
struct Decoder {
    errors: Vec<CompileError>,
}

impl Decoder {
    fn shape_error(&mut self, context: &str, message: impl Into<String>) {
        self.errors.push(CompileError::Shape {
            context: context.to_string(),
            message: message.into(),
        });
    }

    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn string(&mut self, value: &Value, context: &str) -> String {
        match Self::scalar(value) {
            Some(s) => s,
            None => {
                self.shape_error(context, "expected a string");
                String::new()
            }
        }
    }

    fn string_field(&mut self, mapping: &Mapping, key: &str, context: &str) -> String {
        match present(mapping, key) {
            Some(value) => self.string(value, &format!("{context}.{key}")),
            None => String::new(),
        }
    }

    fn bool_field(&mut self, mapping: &Mapping, key: &str, context: &str) -> bool {
        self.opt_bool_field(mapping, key, context).unwrap_or(false)
    }

    fn opt_bool_field(&mut self, mapping: &Mapping, key: &str, context: &str) -> Option<bool> {
        let value = present(mapping, key)?;
        match value.as_bool() {
            Some(b) => Some(b),
            None => {
                self.shape_error(&format!("{context}.{key}"), "expected a boolean");
                None
            }
        }
    }

    fn i64_field(&mut self, mapping: &Mapping, key: &str, context: &str) -> i64 {
        self.opt_i64_field(mapping, key, context).unwrap_or(0)
    }

    fn opt_i64_field(&mut self, mapping: &Mapping, key: &str, context: &str) -> Option<i64> {
        let value = present(mapping, key)?;
        match value.as_i64() {
            Some(n) => Some(n),
            None => {
                self.shape_error(&format!("{context}.{key}"), "expected an integer");
                None
            }
        }
    }

    /// A bare string is accepted as a one-element list.
    fn string_slice(&mut self, value: &Value, context: &str) -> Vec<String> {
        if let Some(single) = Self::scalar(value) {
            return vec![single];
        }
        match value {
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.string(item, &format!("{context}[{i}]")))
                .collect(),
            _ => {
                self.shape_error(context, "expected a string or list of strings");
                Vec::new()
            }
        }
    }

    fn string_slice_field(&mut self, mapping: &Mapping, key: &str, context: &str) -> Vec<String> {
        match present(mapping, key) {
            Some(value) => self.string_slice(value, &format!("{context}.{key}")),
            None => Vec::new(),
        }
    }

    fn project(&mut self, root: &Value) -> ParserProject {
        let mut project = ParserProject::default();
        let mapping = match root {
            Value::Mapping(m) => m,
            Value::Null => return project,
            _ => {
                self.shape_error("project", "expected a mapping at the document root");
                return project;
            }
        };
        let ctx = "project";
        project.enabled = self.bool_field(mapping, "enabled", ctx);
        project.stepback = self.bool_field(mapping, "stepback", ctx);
        project.disable_cleanup = self.bool_field(mapping, "disable_cleanup", ctx);
        project.batch_time = self.i64_field(mapping, "batchtime", ctx);
        project.owner = self.string_field(mapping, "owner", ctx);
        project.repo = self.string_field(mapping, "repo", ctx);
        project.remote_path = self.string_field(mapping, "remote_path", ctx);
        project.repo_kind = self.string_field(mapping, "repokind", ctx);
        project.branch = self.string_field(mapping, "branch", ctx);
        project.identifier = self.string_field(mapping, "identifier", ctx);
        project.display_name = self.string_field(mapping, "display_name", ctx);
        project.command_type = self.string_field(mapping, "command_type", ctx);
        project.ignore = self.string_slice_field(mapping, "ignore", ctx);
        project.pre = self.command_set_field(mapping, "pre", ctx);
        project.post = self.command_set_field(mapping, "post", ctx);
        project.timeout = self.command_set_field(mapping, "timeout", ctx);
        project.callback_timeout_secs = self.i64_field(mapping, "callback_timeout_secs", ctx);
        project.exec_timeout_secs = self.i64_field(mapping, "exec_timeout_secs", ctx);

        if let Some(value) = present(mapping, "modules") {
            project.modules = self.modules(value, "modules");
        }
        if let Some(value) = present(mapping, "functions") {
            project.functions = self.functions(value, "functions");
        }
        if let Some(value) = present(mapping, "tasks") {
            project.tasks = self.tasks(value, "tasks");
        }
        if let Some(value) = present(mapping, "axes") {
            project.axes = self.axes(value, "axes");
        }
        if let Some(value) = present(mapping, "buildvariants") {
            let entries = self.variant_entries(value, "buildvariants");
            let (regular, matrices) = sieve_matrix_variants(entries);
            project.build_variants = regular;
            project.matrices = matrices;
        }
        project
    }

    fn modules(&mut self, value: &Value, context: &str) -> Vec<Module> {
        let Some(items) = value.as_sequence() else {
            self.shape_error(context, "expected a list of modules");
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let ctx = format!("{context}[{i}]");
                let Some(mapping) = item.as_mapping() else {
                    self.shape_error(&ctx, "expected a module mapping");
                    return None;
                };
                Some(Module {
                    name: self.string_field(mapping, "name", &ctx),
                    branch: self.string_field(mapping, "branch", &ctx),
                    repo: self.string_field(mapping, "repo", &ctx),
                    prefix: self.string_field(mapping, "prefix", &ctx),
                })
            })
            .collect()
    }

    fn functions(&mut self, value: &Value, context: &str) -> IndexMap<String, CommandSet> {
        let Some(mapping) = value.as_mapping() else {
            self.shape_error(context, "expected a mapping of function names to commands");
            return IndexMap::new();
        };
        let mut functions = IndexMap::new();
        for (key, body) in mapping {
            let Some(name) = Self::scalar(key) else {
                self.shape_error(context, "function names must be strings");
                continue;
            };
            let commands = self.command_set(body, &format!("{context}.{name}"));
            functions.insert(name, commands);
        }
        functions
    }

    fn command_set_field(&mut self, mapping: &Mapping, key: &str, context: &str) -> Option<CommandSet> {
        let value = present(mapping, key)?;
        Some(self.command_set(value, &format!("{context}.{key}")))
    }

    /// Commands are opaque; a single command mapping is accepted in place
    /// of a list.
    fn command_set(&mut self, value: &Value, context: &str) -> CommandSet {
        match value {
            Value::Sequence(items) => CommandSet(items.to_vec()),
            Value::Mapping(_) => CommandSet(vec![value.clone()]),
            _ => {
                self.shape_error(context, "expected a command or list of commands");
                CommandSet::default()
            }
        }
    }

    fn tasks(&mut self, value: &Value, context: &str) -> Vec<ParserTask> {
        let Some(items) = value.as_sequence() else {
            self.shape_error(context, "expected a list of tasks");
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.task(item, &format!("{context}[{i}]")))
            .collect()
    }

    fn task(&mut self, value: &Value, context: &str) -> ParserTask {
        let mut task = ParserTask::default();
        let Some(mapping) = value.as_mapping() else {
            self.shape_error(context, "expected a task mapping");
            return task;
        };
        task.name = self.string_field(mapping, "name", context);
        task.priority = self.i64_field(mapping, "priority", context);
        task.exec_timeout_secs = self.i64_field(mapping, "exec_timeout_secs", context);
        task.disable_cleanup = self.bool_field(mapping, "disable_cleanup", context);
        task.tags = self.string_slice_field(mapping, "tags", context);
        task.stepback = self.opt_bool_field(mapping, "stepback", context);
        if let Some(deps) = present(mapping, "depends_on") {
            task.depends_on = self.dependencies(deps, &format!("{context}.depends_on"));
        }
        if let Some(reqs) = present(mapping, "requires") {
            task.requires = self.task_selectors(reqs, &format!("{context}.requires"));
        }
        if let Some(commands) = present(mapping, "commands") {
            task.commands = self.command_set(commands, &format!("{context}.commands")).0;
        }
        task
    }

    /// A single dependency is accepted in place of a list.
    fn dependencies(&mut self, value: &Value, context: &str) -> Vec<ParserDependency> {
        match value {
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| self.dependency(item, &format!("{context}[{i}]")))
                .collect(),
            _ => self.dependency(value, context).into_iter().collect(),
        }
    }

    /// A dependency is a bare selector string or a mapping with a name.
    fn dependency(&mut self, value: &Value, context: &str) -> Option<ParserDependency> {
        if let Some(selector) = self.task_selector(value, context) {
            let mut dependency = ParserDependency {
                selector,
                ..Default::default()
            };
            if let Some(mapping) = value.as_mapping() {
                dependency.status = self.string_field(mapping, "status", context);
                dependency.patch_optional = self.bool_field(mapping, "patch_optional", context);
            }
            return Some(dependency);
        }
        None
    }

    /// A single selector is accepted in place of a list.
    fn task_selectors(&mut self, value: &Value, context: &str) -> Vec<TaskSelector> {
        match value {
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| self.task_selector(item, &format!("{context}[{i}]")))
                .collect(),
            _ => self.task_selector(value, context).into_iter().collect(),
        }
    }

    /// A task selector is a bare non-empty string or a mapping with a
    /// required name and an optional variant selector.
    fn task_selector(&mut self, value: &Value, context: &str) -> Option<TaskSelector> {
        if let Some(single) = Self::scalar(value) {
            if single.is_empty() {
                self.shape_error(context, "task selector must have a name");
                return None;
            }
            return Some(TaskSelector {
                name: single,
                variant: None,
            });
        }
        let Some(mapping) = value.as_mapping() else {
            self.shape_error(context, "expected a task selector string or mapping");
            return None;
        };
        let name = self.string_field(mapping, "name", context);
        if name.is_empty() {
            self.shape_error(context, "task selector must have a name");
            return None;
        }
        let variant = match present(mapping, "variant") {
            Some(v) => self.variant_selector(v, &format!("{context}.variant")),
            None => None,
        };
        Some(TaskSelector { name, variant })
    }

    /// A variant selector is a non-empty selector string or a non-empty
    /// matrix sub-definition.
    fn variant_selector(&mut self, value: &Value, context: &str) -> Option<VariantSelector> {
        if let Some(single) = Self::scalar(value) {
            if single.is_empty() {
                self.shape_error(context, "variant selector must not be empty");
                return None;
            }
            return Some(VariantSelector::Selector(single));
        }
        if value.is_mapping() {
            let definition = self.matrix_definition(value, context);
            if definition.0.is_empty() {
                self.shape_error(context, "variant selector must not be empty");
                return None;
            }
            return Some(VariantSelector::Matrix(definition));
        }
        self.shape_error(
            context,
            "expected a selector string or matrix sub-definition",
        );
        None
    }

    fn variant_entries(&mut self, value: &Value, context: &str) -> Vec<VariantEntry> {
        let Some(items) = value.as_sequence() else {
            self.shape_error(context, "expected a list of build variants");
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| self.variant_entry(item, &format!("{context}[{i}]")))
            .collect()
    }

    /// A `buildvariants` entry is a matrix stub when it carries
    /// `matrix_name`, and a regular variant otherwise.
    fn variant_entry(&mut self, value: &Value, context: &str) -> Option<VariantEntry> {
        let Some(mapping) = value.as_mapping() else {
            self.shape_error(context, "expected a build variant mapping");
            return None;
        };
        if present(mapping, "matrix_name").is_some() {
            return self.matrix(mapping, context).map(VariantEntry::Stub);
        }
        self.variant(mapping, context).map(VariantEntry::Regular)
    }

    fn variant(&mut self, mapping: &Mapping, context: &str) -> Option<ParserVariant> {
        let name = self.string_field(mapping, "name", context);
        if name.is_empty() {
            self.shape_error(context, "buildvariant must have a name");
            return None;
        }
        let mut variant = ParserVariant {
            name,
            ..Default::default()
        };
        variant.display_name = self.string_field(mapping, "display_name", context);
        variant.tags = self.string_slice_field(mapping, "tags", context);
        variant.modules = self.string_slice_field(mapping, "modules", context);
        variant.disabled = self.bool_field(mapping, "disabled", context);
        variant.push = self.bool_field(mapping, "push", context);
        variant.batch_time = self.opt_i64_field(mapping, "batchtime", context);
        variant.stepback = self.opt_bool_field(mapping, "stepback", context);
        variant.run_on = self.string_slice_field(mapping, "run_on", context);
        if let Some(value) = present(mapping, "expansions") {
            variant.expansions = self.variables(value, &format!("{context}.expansions"));
        }
        if let Some(value) = present(mapping, "tasks") {
            variant.tasks = self.variant_tasks(value, &format!("{context}.tasks"));
        }
        Some(variant)
    }

    fn variables(&mut self, value: &Value, context: &str) -> Expansions {
        let Some(mapping) = value.as_mapping() else {
            self.shape_error(context, "expected a mapping of strings to strings");
            return Expansions::new();
        };
        let mut expansions = Expansions::new();
        for (key, val) in mapping {
            let (Some(key), Some(val)) = (Self::scalar(key), Self::scalar(val)) else {
                self.shape_error(context, "expected a mapping of strings to strings");
                continue;
            };
            expansions.put(key, val);
        }
        expansions
    }

    /// A single task is accepted in place of a list.
    fn variant_tasks(&mut self, value: &Value, context: &str) -> Vec<ParserVariantTask> {
        match value {
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| self.variant_task(item, &format!("{context}[{i}]")))
                .collect(),
            _ => self.variant_task(value, context).into_iter().collect(),
        }
    }

    /// A task-in-variant is a bare selector string or a mapping with a
    /// required name.
    fn variant_task(&mut self, value: &Value, context: &str) -> Option<ParserVariantTask> {
        if let Some(single) = Self::scalar(value) {
            if single.is_empty() {
                self.shape_error(context, "task selector must have a name");
                return None;
            }
            return Some(ParserVariantTask {
                name: single,
                ..Default::default()
            });
        }
        let Some(mapping) = value.as_mapping() else {
            self.shape_error(context, "expected a task selector string or mapping");
            return None;
        };
        let name = self.string_field(mapping, "name", context);
        if name.is_empty() {
            self.shape_error(context, "task selector must have a name");
            return None;
        }
        let mut task = ParserVariantTask {
            name,
            ..Default::default()
        };
        task.patchable = self.opt_bool_field(mapping, "patchable", context);
        task.priority = self.i64_field(mapping, "priority", context);
        task.exec_timeout_secs = self.i64_field(mapping, "exec_timeout_secs", context);
        task.stepback = self.opt_bool_field(mapping, "stepback", context);
        if let Some(deps) = present(mapping, "depends_on") {
            task.depends_on = self.dependencies(deps, &format!("{context}.depends_on"));
        }
        if let Some(reqs) = present(mapping, "requires") {
            task.requires = self.task_selectors(reqs, &format!("{context}.requires"));
        }
        task.distros = self.string_slice_field(mapping, "distros", context);
        let run_on = self.string_slice_field(mapping, "run_on", context);
        if !run_on.is_empty() {
            if !task.distros.is_empty() {
                self.errors.push(CompileError::Validation {
                    context: context.to_string(),
                    message: "cannot use both 'run_on' and 'distros' fields".to_string(),
                });
                return None;
            }
            task.distros = run_on;
        }
        Some(task)
    }

    fn axes(&mut self, value: &Value, context: &str) -> Vec<MatrixAxis> {
        let Some(items) = value.as_sequence() else {
            self.shape_error(context, "expected a list of axes");
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.axis(item, &format!("{context}[{i}]")))
            .collect()
    }

    fn axis(&mut self, value: &Value, context: &str) -> MatrixAxis {
        let mut axis = MatrixAxis::default();
        let Some(mapping) = value.as_mapping() else {
            self.shape_error(context, "expected an axis mapping");
            return axis;
        };
        axis.id = self.string_field(mapping, "id", context);
        axis.display_name = self.string_field(mapping, "display_name", context);
        if let Some(values) = present(mapping, "values") {
            let Some(items) = values.as_sequence() else {
                self.shape_error(&format!("{context}.values"), "expected a list of axis values");
                return axis;
            };
            axis.values = items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| {
                    let ctx = format!("{context}.values[{i}]");
                    let Some(mapping) = item.as_mapping() else {
                        self.shape_error(&ctx, "expected an axis value mapping");
                        return None;
                    };
                    Some(self.axis_value(mapping, &ctx))
                })
                .collect();
        }
        axis
    }

    fn axis_value(&mut self, mapping: &Mapping, context: &str) -> AxisValue {
        let mut value = AxisValue {
            id: self.string_field(mapping, "id", context),
            display_name: self.string_field(mapping, "display_name", context),
            ..Default::default()
        };
        if let Some(vars) = present(mapping, "variables") {
            value.variables = self.variables(vars, &format!("{context}.variables"));
        }
        value.run_on = self.string_slice_field(mapping, "run_on", context);
        value.tags = self.string_slice_field(mapping, "tags", context);
        value.modules = self.string_slice_field(mapping, "modules", context);
        value.batch_time = self.opt_i64_field(mapping, "batchtime", context);
        value.stepback = self.opt_bool_field(mapping, "stepback", context);
        value
    }

    fn matrix(&mut self, mapping: &Mapping, context: &str) -> Option<Matrix> {
        let id = self.string_field(mapping, "matrix_name", context);
        if id.is_empty() {
            self.shape_error(context, "matrix must have a name");
            return None;
        }
        let mut matrix = Matrix {
            id,
            ..Default::default()
        };
        if let Some(spec) = present(mapping, "matrix_spec") {
            matrix.spec = self.matrix_definition(spec, &format!("{context}.matrix_spec"));
        }
        if let Some(exclude) = present(mapping, "exclude_spec") {
            matrix.exclude = self.matrix_definitions(exclude, &format!("{context}.exclude_spec"));
        }
        matrix.display_name = self.string_field(mapping, "display_name", context);
        matrix.tags = self.string_slice_field(mapping, "tags", context);
        matrix.modules = self.string_slice_field(mapping, "modules", context);
        matrix.batch_time = self.opt_i64_field(mapping, "batchtime", context);
        matrix.stepback = self.opt_bool_field(mapping, "stepback", context);
        matrix.run_on = self.string_slice_field(mapping, "run_on", context);
        if let Some(tasks) = present(mapping, "tasks") {
            matrix.tasks = self.variant_tasks(tasks, &format!("{context}.tasks"));
        }
        if let Some(rules) = present(mapping, "rules") {
            matrix.rules = self.rules(rules, &format!("{context}.rules"));
        }
        Some(matrix)
    }

    fn matrix_definition(&mut self, value: &Value, context: &str) -> MatrixDefinition {
        let Some(mapping) = value.as_mapping() else {
            self.shape_error(context, "expected a mapping of axes to value selectors");
            return MatrixDefinition::default();
        };
        let mut definition = IndexMap::new();
        for (key, selectors) in mapping {
            let Some(axis) = Self::scalar(key) else {
                self.shape_error(context, "axis names must be strings");
                continue;
            };
            let values = self.string_slice(selectors, &format!("{context}.{axis}"));
            definition.insert(axis, values);
        }
        MatrixDefinition(definition)
    }

    /// A single definition is accepted in place of a list.
    fn matrix_definitions(&mut self, value: &Value, context: &str) -> Vec<MatrixDefinition> {
        match value {
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.matrix_definition(item, &format!("{context}[{i}]")))
                .collect(),
            _ => vec![self.matrix_definition(value, context)],
        }
    }

    fn rules(&mut self, value: &Value, context: &str) -> Vec<MatrixRule> {
        let Some(items) = value.as_sequence() else {
            self.shape_error(context, "expected a list of rules");
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.rule(item, &format!("{context}[{i}]")))
            .collect()
    }

    fn rule(&mut self, value: &Value, context: &str) -> MatrixRule {
        let mut rule = MatrixRule::default();
        let Some(mapping) = value.as_mapping() else {
            self.shape_error(context, "expected a rule mapping");
            return rule;
        };
        if let Some(matchers) = present(mapping, "if") {
            rule.matchers = self.matrix_definitions(matchers, &format!("{context}.if"));
        }
        if let Some(then) = present(mapping, "then") {
            let ctx = format!("{context}.then");
            let Some(then) = then.as_mapping() else {
                self.shape_error(&ctx, "expected a rule action mapping");
                return rule;
            };
            if let Some(set) = present(then, "set") {
                let set_ctx = format!("{ctx}.set");
                match set.as_mapping() {
                    Some(mapping) => rule.action.set = Some(self.axis_value(mapping, &set_ctx)),
                    None => self.shape_error(&set_ctx, "expected an axis value mapping"),
                }
            }
            rule.action.remove_tasks = self.string_slice_field(then, "remove_tasks", &ctx);
            if let Some(add) = present(then, "add_tasks") {
                rule.action.add_tasks = self.variant_tasks(add, &format!("{ctx}.add_tasks"));
            }
        }
        rule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(config: &str) -> ParserProject {
        match create_intermediate_project(config.as_bytes()) {
            Ok(project) => project,
            Err(errors) => panic!("unexpected errors: {errors:?}"),
        }
    }

    fn parse_errors(config: &str) -> Vec<CompileError> {
        match create_intermediate_project(config.as_bytes()) {
            Ok(project) => panic!("expected errors, got {project:?}"),
            Err(errors) => errors,
        }
    }

    #[test]
    fn test_simple_dependencies_parse() {
        let project = parse(
            r#"
tasks:
- name: "compile"
- name: task0
- name: task1
  tags: ["tag1", "tag2"]
  depends_on:
  - compile
  - name: "task0"
    status: "failed"
    patch_optional: true
"#,
        );
        let deps = &project.tasks[2].depends_on;
        assert_eq!(deps[0].selector.name, "compile");
        assert!(!deps[0].patch_optional);
        assert_eq!(deps[1].selector.name, "task0");
        assert_eq!(deps[1].status, "failed");
        assert!(deps[1].patch_optional);
    }

    #[test]
    fn test_single_dependency_parses() {
        let project = parse(
            r#"
tasks:
- name: "compile"
- name: task0
- name: task1
  depends_on: task0
"#,
        );
        assert_eq!(project.tasks[2].depends_on[0].selector.name, "task0");
    }

    #[test]
    fn test_nameless_dependency_errors() {
        let errors = parse_errors(
            r#"
tasks:
- name: "compile"
  depends_on: ""
"#,
        );
        assert_eq!(errors.len(), 1);

        let errors = parse_errors(
            r#"
tasks:
- name: "compile"
  depends_on:
  - name: "task1"
  - status: "failed"
"#,
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_unused_depends_on_is_fine() {
        let project = parse(
            r#"
tasks:
- name: "compile"
"#,
        );
        assert!(project.tasks[0].depends_on.is_empty());
    }

    #[test]
    fn test_requirements_parse() {
        let project = parse(
            r#"
tasks:
- name: task0
- name: task1
  requires:
  - name: "task0"
    variant: "v1"
  - "task2"
"#,
        );
        let reqs = &project.tasks[1].requires;
        assert_eq!(reqs[0].name, "task0");
        assert_eq!(
            reqs[0].variant,
            Some(VariantSelector::Selector("v1".to_string()))
        );
        assert_eq!(reqs[1].name, "task2");
        assert_eq!(reqs[1].variant, None);
    }

    #[test]
    fn test_single_requirement_parses() {
        let project = parse(
            r#"
tasks:
- name: task1
  requires:
    name: "task0"
    variant: "v1"
"#,
        );
        let reqs = &project.tasks[0].requires;
        assert_eq!(reqs[0].name, "task0");
        assert_eq!(
            reqs[0].variant,
            Some(VariantSelector::Selector("v1".to_string()))
        );
    }

    #[test]
    fn test_matrix_variant_selector_parses() {
        let project = parse(
            r#"
tasks:
- name: task1
  requires:
    name: "task0"
    variant:
     cool: "shoes"
     colors:
      - red
      - green
      - blue
"#,
        );
        let reqs = &project.tasks[0].requires;
        assert_eq!(reqs[0].name, "task0");
        let Some(VariantSelector::Matrix(definition)) = &reqs[0].variant else {
            panic!("expected a matrix sub-definition");
        };
        assert_eq!(definition.0["cool"], vec!["shoes"]);
        assert_eq!(definition.0["colors"], vec!["red", "green", "blue"]);
    }

    #[test]
    fn test_build_variants_parse() {
        let project = parse(
            r#"
buildvariants:
- name: "v1"
  stepback: true
  batchtime: 123
  modules: ["wow", "cool"]
  run_on:
  - "windows2000"
  tasks:
  - name: "t1"
  - name: "t2"
    depends_on:
    - name: "t3"
      variant: "v0"
    requires:
    - name: "t4"
    stepback: false
    priority: 77
"#,
        );
        let bv = &project.build_variants[0];
        assert_eq!(bv.name, "v1");
        assert_eq!(bv.stepback, Some(true));
        assert_eq!(bv.batch_time, Some(123));
        assert_eq!(bv.run_on, vec!["windows2000"]);
        assert_eq!(bv.modules.len(), 2);
        assert_eq!(bv.tasks[0].name, "t1");
        assert_eq!(bv.tasks[1].name, "t2");
        assert_eq!(
            bv.tasks[1].depends_on[0].selector,
            TaskSelector {
                name: "t3".to_string(),
                variant: Some(VariantSelector::Selector("v0".to_string())),
            }
        );
        assert_eq!(
            bv.tasks[1].requires[0],
            TaskSelector {
                name: "t4".to_string(),
                variant: None,
            }
        );
        assert_eq!(bv.tasks[1].stepback, Some(false));
        assert_eq!(bv.tasks[1].priority, 77);
    }

    #[test]
    fn test_oneline_variant_tasks_parse() {
        let project = parse(
            r#"
buildvariants:
- name: "v1"
  tasks:
  - "t1"
  - name: "t2"
    depends_on: "t3"
    requires: "t4"
"#,
        );
        let bv = &project.build_variants[0];
        assert_eq!(bv.tasks[0].name, "t1");
        assert_eq!(bv.tasks[1].name, "t2");
        assert_eq!(bv.tasks[1].depends_on[0].selector.name, "t3");
        assert_eq!(bv.tasks[1].requires[0].name, "t4");
    }

    #[test]
    fn test_single_variant_task_parses() {
        let project = parse(
            r#"
buildvariants:
- name: "v1"
  tasks: "*"
- name: "v2"
  tasks:
    name: "t1"
"#,
        );
        assert_eq!(project.build_variants.len(), 2);
        assert_eq!(project.build_variants[0].tasks.len(), 1);
        assert_eq!(project.build_variants[0].tasks[0].name, "*");
        assert_eq!(project.build_variants[1].tasks.len(), 1);
        assert_eq!(project.build_variants[1].tasks[0].name, "t1");
    }

    #[test]
    fn test_scalar_string_slices_parse() {
        let project = parse(
            r#"
ignore: "*.md"
tasks:
- name: "t1"
  tags: wow
buildvariants:
- name: "v1"
  run_on: "distro1"
  tasks: "*"
"#,
        );
        assert_eq!(project.ignore, vec!["*.md"]);
        assert_eq!(project.tasks[0].tags, vec!["wow"]);
        assert_eq!(project.build_variants[0].run_on, vec!["distro1"]);
    }

    #[test]
    fn test_variant_task_run_on_is_distro_alias() {
        let project = parse(
            r#"
buildvariants:
- name: "v1"
  tasks:
  - name: "t1"
    run_on: "test"
"#,
        );
        assert_eq!(project.build_variants[0].tasks[0].distros, vec!["test"]);
    }

    #[test]
    fn test_run_on_with_distros_errors() {
        let errors = parse_errors(
            r#"
buildvariants:
- name: "v1"
  tasks:
  - name: "t1"
    run_on: "test"
    distros: "something"
"#,
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .contains("cannot use both 'run_on' and 'distros'"));
    }

    #[test]
    fn test_axes_parse() {
        let project = parse(
            r#"
axes:
- id: os
  display_name: Operating System
  values:
  - id: ubuntu
    display_name: Ubuntu
    tags: "linux"
    variables:
      user: root
    run_on: ubuntu_small
  - id: rhel
    display_name: Red Hat
    tags: ["linux", "enterprise"]
    run_on:
    - rhel55
    - rhel62
"#,
        );
        let axis = &project.axes[0];
        assert_eq!(axis.id, "os");
        assert_eq!(axis.display_name, "Operating System");
        assert_eq!(axis.values.len(), 2);
        assert_eq!(axis.values[0].id, "ubuntu");
        assert_eq!(axis.values[0].display_name, "Ubuntu");
        assert_eq!(axis.values[0].tags, vec!["linux"]);
        assert_eq!(axis.values[0].variables.get("user"), Some("root"));
        assert_eq!(axis.values[0].run_on, vec!["ubuntu_small"]);
        assert_eq!(axis.values[1].id, "rhel");
        assert_eq!(axis.values[1].tags, vec!["linux", "enterprise"]);
        assert_eq!(axis.values[1].run_on, vec!["rhel55", "rhel62"]);
    }

    #[test]
    fn test_matrix_stubs_are_sieved() {
        let project = parse(
            r#"
buildvariants:
- matrix_name: "test"
  matrix_spec: {"os": ".linux", "bits": ["32", "64"]}
  exclude_spec: [{"os": "ubuntu", "bits": "32"}]
- matrix_name: "test2"
  matrix_spec:
    os: "windows95"
    color:
    - red
    - blue
    - green
"#,
        );
        assert!(project.build_variants.is_empty());
        assert_eq!(project.matrices.len(), 2);
        let m1 = &project.matrices[0];
        assert_eq!(m1.id, "test");
        assert_eq!(m1.spec.0["os"], vec![".linux"]);
        assert_eq!(m1.spec.0["bits"], vec!["32", "64"]);
        assert_eq!(m1.exclude.len(), 1);
        assert_eq!(m1.exclude[0].0["os"], vec!["ubuntu"]);
        assert_eq!(m1.exclude[0].0["bits"], vec!["32"]);
        let m2 = &project.matrices[1];
        assert_eq!(m2.id, "test2");
        assert_eq!(m2.spec.0["os"], vec!["windows95"]);
        assert_eq!(m2.spec.0["color"], vec!["red", "blue", "green"]);
    }

    #[test]
    fn test_mixed_variants_and_stubs_sieve() {
        let project = parse(
            r#"
buildvariants:
- matrix_name: "test"
  matrix_spec: {"os": "*", "bits": "*"}
- name: "single_variant"
  tasks: "*"
"#,
        );
        assert_eq!(project.matrices.len(), 1);
        assert_eq!(project.matrices[0].id, "test");
        assert_eq!(project.build_variants.len(), 1);
        assert_eq!(project.build_variants[0].name, "single_variant");
        assert_eq!(project.build_variants[0].tasks[0].name, "*");
    }

    #[test]
    fn test_matrix_rules_parse() {
        let project = parse(
            r#"
buildvariants:
- matrix_name: "test"
  matrix_spec: {"os": "*"}
  rules:
  - if:
      os: ubuntu
    then:
      set:
        tags: "fast"
      remove_tasks: "slow_task"
      add_tasks:
      - "extra_task"
"#,
        );
        let rule = &project.matrices[0].rules[0];
        assert_eq!(rule.matchers.len(), 1);
        assert_eq!(rule.matchers[0].0["os"], vec!["ubuntu"]);
        let action = &rule.action;
        assert_eq!(action.set.as_ref().map(|s| s.tags.clone()), Some(vec!["fast".to_string()]));
        assert_eq!(action.remove_tasks, vec!["slow_task"]);
        assert_eq!(action.add_tasks[0].name, "extra_task");
    }

    #[test]
    fn test_top_level_fields_parse() {
        let project = parse(
            r#"
enabled: true
batchtime: 120
owner: "foundry-ci"
repo: "widgets"
branch: "main"
display_name: "Widgets"
command_type: "system"
callback_timeout_secs: 300
exec_timeout_secs: 1200
pre:
  command: shell.exec
post:
- command: attach.results
- command: shell.exec
modules:
- name: "toolchain"
  repo: "git@github.com:foundry-ci/toolchain.git"
  branch: "stable"
  prefix: "vendor"
functions:
  "fetch source":
    command: git.get_project
"#,
        );
        assert!(project.enabled);
        assert_eq!(project.batch_time, 120);
        assert_eq!(project.owner, "foundry-ci");
        assert_eq!(project.branch, "main");
        assert_eq!(project.callback_timeout_secs, 300);
        assert_eq!(project.exec_timeout_secs, 1200);
        assert_eq!(project.pre.as_ref().map(|p| p.0.len()), Some(1));
        assert_eq!(project.post.as_ref().map(|p| p.0.len()), Some(2));
        assert_eq!(project.modules[0].name, "toolchain");
        assert_eq!(project.modules[0].prefix, "vendor");
        assert_eq!(project.functions["fetch source"].0.len(), 1);
    }

    #[test]
    fn test_invalid_yaml_is_terminal() {
        let errors = parse_errors("tasks:\n- name: \"un\nterminated");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_fatal());
    }

    #[test]
    fn test_empty_document_is_an_empty_project() {
        let project = parse("");
        assert!(project.tasks.is_empty());
        assert!(project.build_variants.is_empty());
    }
}
