//! Translation of the intermediate project into the final model.
//!
//! Runs after the matrix engine has appended its synthesized variants.
//! Every selector in dependency, requirement, and variant-task lists is
//! expanded to literal names; duplicate expansions are folded together and
//! contradictory ones are reported as conflicts. Translation always
//! returns a project, possibly partial, alongside the accumulated errors;
//! whether a partial project is acceptable is the caller's policy.

use crate::matrix::{self, AxisSelectorEvaluator};
use crate::parser::{
    MatrixCell, ParserDependency, ParserProject, ParserTask, ParserVariant, ParserVariantTask,
    TaskSelector, VariantSelector,
};
use crate::selector::{Selector, TagSelectorEvaluator};
use foundry_core::error::CompileError;
use foundry_core::project::{
    ALL_DEPENDENCIES, BuildVariant, BuildVariantTask, Project, ProjectTask, TaskDependency,
    TaskRequirement,
};
use std::collections::{HashMap, HashSet};

/// Evaluates variant selectors: either a selector string over variant
/// names and tags, or a matrix sub-definition matched against the cells
/// of matrix-synthesized variants.
pub struct VariantSelectorEvaluator {
    string_eval: TagSelectorEvaluator,
    cells: Vec<(String, MatrixCell)>,
    ase: AxisSelectorEvaluator,
}

impl VariantSelectorEvaluator {
    pub fn new(variants: &[ParserVariant], ase: AxisSelectorEvaluator) -> Self {
        let string_eval = TagSelectorEvaluator::new(
            variants.iter().map(|v| (v.name.clone(), v.tags.clone())),
        );
        let cells = variants
            .iter()
            .filter_map(|v| v.matrix_cell.as_ref().map(|c| (v.name.clone(), c.clone())))
            .collect();
        Self {
            string_eval,
            cells,
            ase,
        }
    }

    pub fn eval(&self, selector: &VariantSelector) -> Result<Vec<String>, CompileError> {
        match selector {
            VariantSelector::Selector(s) => self.string_eval.eval(&Selector::parse(s)),
            VariantSelector::Matrix(definition) => {
                let (evaluated, errors) = definition.evaluated(&self.ase);
                if !errors.is_empty() {
                    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                    return Err(CompileError::Selector {
                        selector: definition.to_string(),
                        message: messages.join("; "),
                    });
                }
                let names: Vec<String> = self
                    .cells
                    .iter()
                    .filter(|(_, cell)| evaluated.contains(cell))
                    .map(|(name, _)| name.clone())
                    .collect();
                if names.is_empty() {
                    return Err(CompileError::Selector {
                        selector: definition.to_string(),
                        message: "no variants match the matrix selector".to_string(),
                    });
                }
                Ok(names)
            }
        }
    }
}

/// Convert an intermediate project into the final model. Expands matrix
/// stubs first (appending their variants to the intermediate project),
/// then evaluates every selector.
pub fn translate_project(pp: &mut ParserProject) -> (Project, Vec<CompileError>) {
    let mut project = Project {
        enabled: pp.enabled,
        stepback: pp.stepback,
        disable_cleanup: pp.disable_cleanup,
        batch_time: pp.batch_time,
        owner: pp.owner.clone(),
        repo: pp.repo.clone(),
        remote_path: pp.remote_path.clone(),
        repo_kind: pp.repo_kind.clone(),
        branch: pp.branch.clone(),
        identifier: pp.identifier.clone(),
        display_name: pp.display_name.clone(),
        command_type: pp.command_type.clone(),
        ignore: pp.ignore.clone(),
        pre: pp.pre.clone(),
        post: pp.post.clone(),
        timeout: pp.timeout.clone(),
        callback_timeout_secs: pp.callback_timeout_secs,
        modules: pp.modules.clone(),
        functions: pp.functions.clone(),
        exec_timeout_secs: pp.exec_timeout_secs,
        ..Default::default()
    };

    let tse = TagSelectorEvaluator::new(pp.tasks.iter().map(|t| (t.name.clone(), t.tags.clone())));
    let ase = AxisSelectorEvaluator::new(&pp.axes);
    let mut errors = Vec::new();

    let (matrix_variants, matrix_errors) =
        matrix::build_matrix_variants(&pp.axes, &ase, &pp.matrices);
    errors.extend(matrix_errors);
    pp.build_variants.extend(matrix_variants);

    let vse = VariantSelectorEvaluator::new(&pp.build_variants, ase);

    let (tasks, task_errors) = evaluate_tasks(&tse, &vse, &pp.tasks);
    project.tasks = tasks;
    errors.extend(task_errors);

    let (variants, variant_errors) = evaluate_build_variants(&tse, &vse, &pp.build_variants);
    project.build_variants = variants;
    errors.extend(variant_errors);

    (project, errors)
}

/// Translate intermediate tasks, evaluating the selectors in their
/// `depends_on` and `requires` fields.
fn evaluate_tasks(
    tse: &TagSelectorEvaluator,
    vse: &VariantSelectorEvaluator,
    tasks: &[ParserTask],
) -> (Vec<ProjectTask>, Vec<CompileError>) {
    let mut out = Vec::with_capacity(tasks.len());
    let mut errors = Vec::new();
    for task in tasks {
        let context = format!("task '{}'", task.name);
        let mut translated = ProjectTask {
            name: task.name.clone(),
            priority: task.priority,
            exec_timeout_secs: task.exec_timeout_secs,
            disable_cleanup: task.disable_cleanup,
            commands: task.commands.clone(),
            tags: task.tags.clone(),
            stepback: task.stepback,
            ..Default::default()
        };
        let (deps, dep_errors) = evaluate_depends_on(tse, vse, &task.depends_on, &context);
        translated.depends_on = deps;
        errors.extend(dep_errors);
        let (reqs, req_errors) = evaluate_requires(tse, vse, &task.requires, &context);
        translated.requires = reqs;
        errors.extend(req_errors);
        out.push(translated);
    }
    (out, errors)
}

/// Expand the selectors in a dependency list. Every expanded
/// `(variant, name)` pair must agree on the remaining fields; identical
/// duplicates collapse, contradictions are conflicts.
fn evaluate_depends_on(
    tse: &TagSelectorEvaluator,
    vse: &VariantSelectorEvaluator,
    deps: &[ParserDependency],
    context: &str,
) -> (Vec<TaskDependency>, Vec<CompileError>) {
    let mut out = Vec::new();
    let mut errors = Vec::new();
    let mut by_name_and_variant: HashMap<(String, String), TaskDependency> = HashMap::new();
    for dep in deps {
        // `*` is preserved literally rather than evaluated
        let names = if dep.selector.name == ALL_DEPENDENCIES {
            vec![ALL_DEPENDENCIES.to_string()]
        } else {
            match tse.eval(&Selector::parse(&dep.selector.name)) {
                Ok(names) => names,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            }
        };
        // the empty variant means "same variant as the owner"
        let variants = match &dep.selector.variant {
            Some(selector) => match vse.eval(selector) {
                Ok(variants) => variants,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            },
            None => vec![String::new()],
        };
        for name in &names {
            for variant in &variants {
                let new_dep = TaskDependency {
                    name: name.clone(),
                    variant: variant.clone(),
                    status: dep.status.clone(),
                    patch_optional: dep.patch_optional,
                };
                let key = (variant.clone(), name.clone());
                match by_name_and_variant.get(&key) {
                    None => {
                        by_name_and_variant.insert(key, new_dep.clone());
                        out.push(new_dep);
                    }
                    Some(existing) if *existing != new_dep => {
                        errors.push(CompileError::Conflict {
                            context: context.to_string(),
                            name: name.clone(),
                            message: format!("dependency {new_dep:?} != {existing:?}"),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
    }
    (out, errors)
}

/// Expand the selectors in a requirement list. Duplicates collapse
/// silently; requirements carry no extra fields to contradict.
fn evaluate_requires(
    tse: &TagSelectorEvaluator,
    vse: &VariantSelectorEvaluator,
    reqs: &[TaskSelector],
    _context: &str,
) -> (Vec<TaskRequirement>, Vec<CompileError>) {
    let mut out = Vec::new();
    let mut errors = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for req in reqs {
        let names = match tse.eval(&Selector::parse(&req.name)) {
            Ok(names) => names,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        let variants = match &req.variant {
            Some(selector) => match vse.eval(selector) {
                Ok(variants) => variants,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            },
            None => vec![String::new()],
        };
        for name in &names {
            for variant in &variants {
                if seen.insert((variant.clone(), name.clone())) {
                    out.push(TaskRequirement {
                        name: name.clone(),
                        variant: variant.clone(),
                    });
                }
            }
        }
    }
    (out, errors)
}

/// Translate intermediate build variants, expanding each variant's task
/// selectors and applying any task rules deferred by the matrix engine.
fn evaluate_build_variants(
    tse: &TagSelectorEvaluator,
    vse: &VariantSelectorEvaluator,
    variants: &[ParserVariant],
) -> (Vec<BuildVariant>, Vec<CompileError>) {
    let mut out = Vec::with_capacity(variants.len());
    let mut errors = Vec::new();
    for variant in variants {
        let mut translated = BuildVariant {
            name: variant.name.clone(),
            display_name: variant.display_name.clone(),
            expansions: variant.expansions.clone(),
            modules: variant.modules.clone(),
            disabled: variant.disabled,
            push: variant.push,
            batch_time: variant.batch_time,
            stepback: variant.stepback,
            run_on: variant.run_on.clone(),
            tags: variant.tags.clone(),
            ..Default::default()
        };
        let (tasks, task_errors) = evaluate_bv_tasks(tse, vse, variant);
        translated.tasks = tasks;
        errors.extend(task_errors);
        out.push(translated);
    }
    (out, errors)
}

/// Expand one variant's task list. Tasks selected more than once must be
/// selected identically; the variant's deferred matrix rules add and
/// remove entries after the declared list is expanded.
fn evaluate_bv_tasks(
    tse: &TagSelectorEvaluator,
    vse: &VariantSelectorEvaluator,
    variant: &ParserVariant,
) -> (Vec<BuildVariantTask>, Vec<CompileError>) {
    let mut tasks: Vec<BuildVariantTask> = Vec::new();
    let mut by_name: HashMap<String, BuildVariantTask> = HashMap::new();
    let mut errors = Vec::new();
    let context = format!("variant '{}'", variant.name);

    for task in &variant.tasks {
        append_bv_task(tse, vse, task, &context, &mut tasks, &mut by_name, &mut errors);
    }
    for rule in &variant.matrix_rules {
        for task in &rule.add_tasks {
            append_bv_task(tse, vse, task, &context, &mut tasks, &mut by_name, &mut errors);
        }
        for selector in &rule.remove_tasks {
            match tse.eval(&Selector::parse(selector)) {
                Ok(names) => {
                    tasks.retain(|t| !names.contains(&t.name));
                    for name in names {
                        by_name.remove(&name);
                    }
                }
                Err(e) => errors.push(e),
            }
        }
    }
    (tasks, errors)
}

fn append_bv_task(
    tse: &TagSelectorEvaluator,
    vse: &VariantSelectorEvaluator,
    task: &ParserVariantTask,
    context: &str,
    tasks: &mut Vec<BuildVariantTask>,
    by_name: &mut HashMap<String, BuildVariantTask>,
    errors: &mut Vec<CompileError>,
) {
    let names = match tse.eval(&Selector::parse(&task.name)) {
        Ok(names) => names,
        Err(e) => {
            errors.push(e);
            return;
        }
    };
    for name in names {
        // copy the task that selected this name so its settings carry over
        let mut translated = BuildVariantTask {
            name: name.clone(),
            patchable: task.patchable,
            priority: task.priority,
            exec_timeout_secs: task.exec_timeout_secs,
            stepback: task.stepback,
            distros: task.distros.clone(),
            ..Default::default()
        };
        let (deps, dep_errors) = evaluate_depends_on(tse, vse, &task.depends_on, context);
        translated.depends_on = deps;
        errors.extend(dep_errors);
        let (reqs, req_errors) = evaluate_requires(tse, vse, &task.requires, context);
        translated.requires = reqs;
        errors.extend(req_errors);

        match by_name.get(&name) {
            None => {
                by_name.insert(name, translated.clone());
                tasks.push(translated);
            }
            Some(existing) if *existing != translated => {
                errors.push(CompileError::Conflict {
                    context: context.to_string(),
                    name,
                    message: format!("build variant task {translated:?} != {existing:?}"),
                });
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, tags: &[&str]) -> ParserTask {
        ParserTask {
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn dependency(name: &str) -> ParserDependency {
        ParserDependency {
            selector: TaskSelector {
                name: name.to_string(),
                variant: None,
            },
            ..Default::default()
        }
    }

    fn dependency_on_variant(name: &str, variant: &str) -> ParserDependency {
        ParserDependency {
            selector: TaskSelector {
                name: name.to_string(),
                variant: Some(VariantSelector::Selector(variant.to_string())),
            },
            ..Default::default()
        }
    }

    fn variant(name: &str, tags: &[&str]) -> ParserVariant {
        ParserVariant {
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_tag_free_dependencies_are_unchanged() {
        let mut pp = ParserProject {
            build_variants: vec![variant("v1", &[])],
            tasks: vec![
                task("t1", &[]),
                task("t2", &[]),
                ParserTask {
                    depends_on: vec![dependency("t1"), dependency_on_variant("t2", "v1")],
                    ..task("t3", &[])
                },
            ],
            ..Default::default()
        };
        let (out, errors) = translate_project(&mut pp);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        let deps = &out.tasks[2].depends_on;
        assert_eq!(deps[0].name, "t1");
        assert_eq!(deps[0].variant, "");
        assert_eq!(deps[1].name, "t2");
        assert_eq!(deps[1].variant, "v1");
    }

    #[test]
    fn test_dependency_tag_selectors_evaluate() {
        let mut pp = ParserProject {
            build_variants: vec![variant("v1", &["cool"]), variant("v2", &["cool"])],
            tasks: vec![
                task("t1", &["a", "b"]),
                ParserTask {
                    depends_on: vec![dependency("*")],
                    ..task("t2", &["a", "c"])
                },
                ParserTask {
                    depends_on: vec![
                        dependency_on_variant(".b", ".cool !v2"),
                        dependency_on_variant(".a !.b", ".cool"),
                    ],
                    ..task("t3", &[])
                },
            ],
            ..Default::default()
        };
        let (out, errors) = translate_project(&mut pp);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(out.tasks[1].depends_on[0].name, "*");
        let deps = &out.tasks[2].depends_on;
        assert_eq!((deps[0].name.as_str(), deps[0].variant.as_str()), ("t1", "v1"));
        assert_eq!((deps[1].name.as_str(), deps[1].variant.as_str()), ("t2", "v1"));
        assert_eq!((deps[2].name.as_str(), deps[2].variant.as_str()), ("t2", "v2"));
    }

    #[test]
    fn test_erroneous_dependency_selectors_accumulate() {
        let mut pp = ParserProject {
            build_variants: vec![variant("v1", &[])],
            tasks: vec![
                task("t1", &["a", "b"]),
                task("t2", &["a", "c"]),
                ParserTask {
                    depends_on: vec![
                        dependency(".cool"),
                        dependency("!!.cool"),
                        dependency_on_variant("t1", ".nope"),
                        ParserDependency {
                            status: "*".to_string(),
                            ..dependency("t1")
                        },
                        dependency(".b"),
                    ],
                    ..task("t3", &[])
                },
            ],
            ..Default::default()
        };
        let (out, errors) = translate_project(&mut pp);
        assert_eq!(out.tasks.len(), 3);
        assert_eq!(errors.len(), 4, "errors: {errors:?}");
    }

    #[test]
    fn test_valid_requirements_translate() {
        let mut pp = ParserProject {
            build_variants: vec![variant("v1", &[])],
            tasks: vec![
                task("t1", &[]),
                task("t2", &[]),
                ParserTask {
                    requires: vec![
                        TaskSelector {
                            name: "t1".to_string(),
                            variant: None,
                        },
                        TaskSelector {
                            name: "t2".to_string(),
                            variant: Some(VariantSelector::Selector("v1".to_string())),
                        },
                    ],
                    ..task("t3", &[])
                },
            ],
            ..Default::default()
        };
        let (out, errors) = translate_project(&mut pp);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        let reqs = &out.tasks[2].requires;
        assert_eq!(reqs[0].name, "t1");
        assert_eq!(reqs[1].name, "t2");
        assert_eq!(reqs[1].variant, "v1");
    }

    #[test]
    fn test_erroneous_requirements_accumulate() {
        let mut pp = ParserProject {
            build_variants: vec![variant("v1", &[])],
            tasks: vec![
                task("t1", &[]),
                task("t2", &["taggy"]),
                ParserTask {
                    requires: vec![
                        TaskSelector {
                            name: "!!!!!".to_string(),
                            variant: None,
                        },
                        TaskSelector {
                            name: ".taggy !t2".to_string(),
                            variant: Some(VariantSelector::Selector("v1".to_string())),
                        },
                        TaskSelector {
                            name: "t1".to_string(),
                            variant: Some(VariantSelector::Selector("!v1".to_string())),
                        },
                        TaskSelector {
                            name: "t1 t2".to_string(),
                            variant: None,
                        },
                    ],
                    ..task("t3", &[])
                },
            ],
            ..Default::default()
        };
        let (out, errors) = translate_project(&mut pp);
        assert_eq!(out.tasks.len(), 3);
        assert_eq!(errors.len(), 4, "errors: {errors:?}");
    }

    #[test]
    fn test_variant_task_selectors_evaluate() {
        let mut pp = ParserProject {
            tasks: vec![task("t1", &[]), task("t2", &["a", "z"]), task("t3", &["a", "b"])],
            build_variants: vec![ParserVariant {
                tasks: vec![
                    ParserVariantTask {
                        name: "t1".to_string(),
                        ..Default::default()
                    },
                    ParserVariantTask {
                        name: ".z".to_string(),
                        depends_on: vec![dependency(".b")],
                        ..Default::default()
                    },
                    ParserVariantTask {
                        name: "* !t1 !t2".to_string(),
                        requires: vec![TaskSelector {
                            name: "!.a".to_string(),
                            variant: None,
                        }],
                        ..Default::default()
                    },
                ],
                ..variant("v1", &[])
            }],
            ..Default::default()
        };
        let (out, errors) = translate_project(&mut pp);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        let bvts = &out.build_variants[0].tasks;
        assert_eq!(bvts[0].name, "t1");
        assert_eq!(bvts[1].name, "t2");
        assert_eq!(bvts[2].name, "t3");
        assert_eq!(bvts[1].depends_on[0].name, "t3");
        assert_eq!(bvts[2].requires[0].name, "t1");
    }

    #[test]
    fn test_variant_task_requirement_errors_accumulate() {
        let mut pp = ParserProject {
            tasks: vec![task("t1", &[])],
            build_variants: vec![ParserVariant {
                tasks: vec![ParserVariantTask {
                    name: "t1".to_string(),
                    requires: vec![TaskSelector {
                        name: ".b".to_string(),
                        variant: None,
                    }],
                    ..Default::default()
                }],
                ..variant("v1", &[])
            }],
            ..Default::default()
        };
        let (out, errors) = translate_project(&mut pp);
        assert_eq!(out.build_variants.len(), 1);
        assert_eq!(errors.len(), 1, "errors: {errors:?}");
    }

    fn colors() -> Vec<ParserTask> {
        vec![
            task("red", &["primary", "warm"]),
            task("orange", &["secondary", "warm"]),
            task("yellow", &["primary", "warm"]),
            task("green", &["secondary", "cool"]),
            task("blue", &["primary", "cool"]),
            task("purple", &["secondary", "cool"]),
            task("brown", &["tertiary"]),
            task("black", &["special"]),
            task("white", &["special"]),
        ]
    }

    fn eval_variant_tasks(
        tasks: Vec<ParserVariantTask>,
    ) -> (Vec<BuildVariantTask>, Vec<CompileError>) {
        let cohort = colors();
        let tse =
            TagSelectorEvaluator::new(cohort.iter().map(|t| (t.name.clone(), t.tags.clone())));
        let vse = VariantSelectorEvaluator::new(&[], AxisSelectorEvaluator::new(&[]));
        let pbv = ParserVariant {
            name: "v1".to_string(),
            tasks,
            ..Default::default()
        };
        evaluate_bv_tasks(&tse, &vse, &pbv)
    }

    fn bv_task(name: &str, priority: i64, distros: &[&str]) -> ParserVariantTask {
        ParserVariantTask {
            name: name.to_string(),
            priority,
            distros: distros.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    fn names_of(tasks: &[BuildVariantTask]) -> Vec<&str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_variant_task_expansion_table() {
        let (tasks, errors) = eval_variant_tasks(vec![bv_task("white", 0, &[])]);
        assert!(errors.is_empty());
        assert_eq!(names_of(&tasks), vec!["white"]);

        let (tasks, errors) =
            eval_variant_tasks(vec![bv_task("red", 500, &[]), bv_task(".secondary", 0, &[])]);
        assert!(errors.is_empty());
        let mut names = names_of(&tasks);
        names.sort();
        assert_eq!(names, vec!["green", "orange", "purple", "red"]);
        assert_eq!(tasks[0].priority, 500);

        // identical duplicate selections fold together
        let (tasks, errors) = eval_variant_tasks(vec![
            bv_task("orange", 0, &["d1"]),
            bv_task(".warm .secondary", 0, &["d1"]),
        ]);
        assert!(errors.is_empty());
        assert_eq!(names_of(&tasks), vec!["orange"]);

        let (tasks, errors) = eval_variant_tasks(vec![
            bv_task("orange", 0, &["d1"]),
            bv_task("!.warm .secondary", 0, &["d1"]),
        ]);
        assert!(errors.is_empty());
        let mut names = names_of(&tasks);
        names.sort();
        assert_eq!(names, vec!["green", "orange", "purple"]);

        let (tasks, errors) = eval_variant_tasks(vec![bv_task("*", 0, &[])]);
        assert!(errors.is_empty());
        assert_eq!(tasks.len(), 9);
    }

    #[test]
    fn test_conflicting_variant_task_selections_error() {
        // orange is selected twice with different priorities
        let (_, errors) = eval_variant_tasks(vec![
            bv_task("orange", 0, &["d1"]),
            bv_task(".warm .secondary", 99, &["d1"]),
        ]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("conflicting definitions"));
    }

    #[test]
    fn test_matrix_rules_add_and_remove_tasks() {
        let mut pp = ParserProject {
            tasks: vec![task("compile", &[]), task("lint", &["slow"]), task("bench", &[])],
            build_variants: vec![ParserVariant {
                tasks: vec![
                    ParserVariantTask {
                        name: "compile".to_string(),
                        ..Default::default()
                    },
                    ParserVariantTask {
                        name: "lint".to_string(),
                        ..Default::default()
                    },
                ],
                matrix_rules: vec![crate::parser::RuleAction {
                    add_tasks: vec![ParserVariantTask {
                        name: "bench".to_string(),
                        ..Default::default()
                    }],
                    remove_tasks: vec![".slow".to_string()],
                    ..Default::default()
                }],
                ..variant("v1", &[])
            }],
            ..Default::default()
        };
        let (out, errors) = translate_project(&mut pp);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(names_of(&out.build_variants[0].tasks), vec!["compile", "bench"]);
    }

    #[test]
    fn test_top_level_fields_carry_over() {
        let mut pp = ParserProject {
            enabled: true,
            owner: "foundry-ci".to_string(),
            repo: "widgets".to_string(),
            branch: "main".to_string(),
            identifier: "widgets-main".to_string(),
            batch_time: 60,
            ..Default::default()
        };
        let (out, errors) = translate_project(&mut pp);
        assert!(errors.is_empty());
        assert!(out.enabled);
        assert_eq!(out.owner, "foundry-ci");
        assert_eq!(out.repo, "widgets");
        assert_eq!(out.branch, "main");
        assert_eq!(out.identifier, "widgets-main");
        assert_eq!(out.batch_time, 60);
    }
}
