//! Fully-expanded project definition types.
//!
//! These are the types downstream schedulers consume. By the time a
//! [`Project`] exists, every selector has been resolved to literal task and
//! variant names and every matrix has been expanded into concrete build
//! variants; nothing here requires further evaluation.

use crate::expansion::Expansions;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Dependency name meaning "every task in the project".
pub const ALL_DEPENDENCIES: &str = "*";

/// A single opaque command; the compiler passes these through untouched.
pub type Command = serde_yaml::Value;

/// A block of commands: `pre`/`post`/`timeout` hooks and function bodies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandSet(pub Vec<Command>);

/// A module checked out next to the main repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub stepback: bool,
    #[serde(default)]
    pub disable_cleanup: bool,
    #[serde(default)]
    pub batch_time: i64,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub remote_path: String,
    #[serde(default)]
    pub repo_kind: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub command_type: String,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub pre: Option<CommandSet>,
    #[serde(default)]
    pub post: Option<CommandSet>,
    #[serde(default)]
    pub timeout: Option<CommandSet>,
    #[serde(default)]
    pub callback_timeout_secs: i64,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub functions: IndexMap<String, CommandSet>,
    #[serde(default)]
    pub tasks: Vec<ProjectTask>,
    #[serde(default)]
    pub build_variants: Vec<BuildVariant>,
    #[serde(default)]
    pub exec_timeout_secs: i64,
}

impl Project {
    pub fn find_task(&self, name: &str) -> Option<&ProjectTask> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn find_build_variant(&self, name: &str) -> Option<&BuildVariant> {
        self.build_variants.iter().find(|bv| bv.name == name)
    }
}

/// A unit of work, with its selectors resolved to concrete references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectTask {
    pub name: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub exec_timeout_secs: i64,
    #[serde(default)]
    pub disable_cleanup: bool,
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub stepback: Option<bool>,
    #[serde(default)]
    pub depends_on: Vec<TaskDependency>,
    #[serde(default)]
    pub requires: Vec<TaskRequirement>,
}

/// A concrete dependency edge. An empty variant means "the same variant
/// as the depending task", resolved downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub name: String,
    #[serde(default)]
    pub variant: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub patch_optional: bool,
}

/// A concrete co-scheduling requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequirement {
    pub name: String,
    #[serde(default)]
    pub variant: String,
}

/// An execution environment, explicit or matrix-synthesized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildVariant {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub expansions: Expansions,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub batch_time: Option<i64>,
    #[serde(default)]
    pub stepback: Option<bool>,
    #[serde(default)]
    pub run_on: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<BuildVariantTask>,
}

impl BuildVariant {
    pub fn find_task(&self, name: &str) -> Option<&BuildVariantTask> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// One task scheduled inside a build variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildVariantTask {
    pub name: String,
    #[serde(default)]
    pub patchable: Option<bool>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub exec_timeout_secs: i64,
    #[serde(default)]
    pub stepback: Option<bool>,
    #[serde(default)]
    pub distros: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<TaskDependency>,
    #[serde(default)]
    pub requires: Vec<TaskRequirement>,
}
