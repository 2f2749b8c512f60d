use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::thread;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{InheritedConfig, ProjectConfig};
use crate::context::HydroContext;
use crate::domain::CommitRecord;
use crate::error::{HydroError, NodeError, Result};
use crate::git::Vcs;
use crate::project::{NodeLocation, ProjectNode};

/// Flattened view of one node, parents listed before their children
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub identifier: String,
    pub path: String,
    pub display_name: String,
    pub description: Option<String>,
    pub level: usize,
    pub skip: bool,
}

/// A built tree plus the per-node failures of its commit computation
#[derive(Debug)]
pub struct LoadReport {
    pub tree: ProjectTree,
    pub errors: Vec<NodeError>,
}

/// Root projects, each owning its subtree
#[derive(Debug, Default)]
pub struct ProjectTree {
    roots: Vec<ProjectNode>,
}

impl ProjectTree {
    pub fn new(roots: Vec<ProjectNode>) -> Self {
        ProjectTree { roots }
    }

    pub fn roots(&self) -> &[ProjectNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Every node, depth first with parents before children
    pub fn all_projects(&self) -> Vec<&ProjectNode> {
        fn collect<'a>(nodes: &'a [ProjectNode], out: &mut Vec<&'a ProjectNode>) {
            for node in nodes {
                out.push(node);
                collect(node.children(), out);
            }
        }
        let mut out = Vec::new();
        collect(&self.roots, &mut out);
        out
    }

    pub fn listing(&self) -> Vec<TreeEntry> {
        self.all_projects()
            .into_iter()
            .map(|node| TreeEntry {
                identifier: node.identifier().to_string(),
                path: node.path().to_string(),
                display_name: node.display_name().to_string(),
                description: node.description().map(String::from),
                level: node.level(),
                skip: node.is_skipped(),
            })
            .collect()
    }

    /// Projects with at least one commit since their latest release
    pub fn changed_projects(&self) -> Vec<&ProjectNode> {
        self.all_projects()
            .into_iter()
            .filter(|node| node.has_changed())
            .collect()
    }

    /// Look a project up by path, identifier or display name
    pub fn find(&self, query: &str) -> Option<&ProjectNode> {
        self.all_projects()
            .into_iter()
            .find(|node| matches_query(node, query))
    }

    pub fn find_mut(&mut self, query: &str) -> Option<&mut ProjectNode> {
        fn search<'a>(nodes: &'a mut [ProjectNode], query: &str) -> Option<&'a mut ProjectNode> {
            for node in nodes.iter_mut() {
                if matches_query(node, query) {
                    return Some(node);
                }
                if let Some(found) = search(node.children_mut(), query) {
                    return Some(found);
                }
            }
            None
        }
        search(&mut self.roots, query)
    }

    fn visit_mut(&mut self, f: &mut impl FnMut(&mut ProjectNode)) {
        fn walk(nodes: &mut [ProjectNode], f: &mut impl FnMut(&mut ProjectNode)) {
            for node in nodes {
                f(&mut *node);
                walk(node.children_mut(), &mut *f);
            }
        }
        walk(&mut self.roots, f);
    }

    /// Compute the commits of every non-skipped node.
    ///
    /// Nodes are processed in batches of at most `jobs` threads. A failing
    /// node leaves its commits uncomputed and is reported; the others are
    /// unaffected.
    pub fn compute_commits(&mut self, vcs: &dyn Vcs, jobs: usize) -> Vec<NodeError> {
        let mut results: HashMap<String, Result<Vec<CommitRecord>>> = HashMap::new();
        {
            let targets: Vec<&ProjectNode> = self
                .all_projects()
                .into_iter()
                .filter(|node| !node.is_skipped())
                .collect();
            debug!(count = targets.len(), jobs, "Computing commits");

            for batch in targets.chunks(jobs.max(1)) {
                thread::scope(|scope| {
                    let handles: Vec<_> = batch
                        .iter()
                        .map(|node| scope.spawn(move || node.fetch_commits(vcs)))
                        .collect();
                    for (node, handle) in batch.iter().zip(handles) {
                        let result = handle.join().unwrap_or_else(|_| {
                            Err(HydroError::ingestion("commit computation panicked"))
                        });
                        results.insert(node.path().to_string(), result);
                    }
                });
            }
        }

        let mut errors = Vec::new();
        self.visit_mut(&mut |node: &mut ProjectNode| match results.remove(node.path()) {
            Some(Ok(commits)) => node.set_commits(commits),
            Some(Err(error)) => {
                warn!(project = %node.path(), error = %error, "Failed to compute commits");
                errors.push(NodeError {
                    project: node.path().to_string(),
                    error,
                });
            }
            None => {}
        });
        errors
    }
}

fn matches_query(node: &ProjectNode, query: &str) -> bool {
    node.path() == query || node.identifier() == query || node.display_name() == query
}

/// Case-insensitive order, ties broken by exact comparison
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Join a declared path onto the parent's path, rejecting escapes
pub fn join_project_path(parent: &str, declared: &str) -> Result<String> {
    if declared.starts_with('/') {
        return Err(HydroError::config(format!(
            "Project path '{}' must be relative",
            declared
        )));
    }

    let mut segments: Vec<&str> = parent
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    for segment in declared.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(HydroError::config(format!(
                    "Project path '{}' must not contain '..'",
                    declared
                )))
            }
            segment => segments.push(segment),
        }
    }

    if segments.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(segments.join("/"))
    }
}

/// Builds the project tree described by a context's configuration
pub struct ProjectTreeBuilder<'a> {
    context: &'a HydroContext,
}

impl<'a> ProjectTreeBuilder<'a> {
    pub fn new(context: &'a HydroContext) -> Self {
        ProjectTreeBuilder { context }
    }

    /// Build the tree without touching the repository history
    pub fn build(&self) -> Result<ProjectTree> {
        let config = self.context.config();
        let mut seen = HashMap::new();
        let roots = self.build_level(
            &config.projects,
            &config.config.inherited(),
            ".",
            1,
            &mut seen,
        )?;
        debug!(projects = seen.len(), "Project tree built");
        Ok(ProjectTree::new(roots))
    }

    /// Build the tree and compute the commits of every node
    pub fn load(&self) -> Result<LoadReport> {
        let mut tree = self.build()?;
        let errors = tree.compute_commits(self.context.vcs(), self.context.jobs());
        Ok(LoadReport { tree, errors })
    }

    fn build_level(
        &self,
        declarations: &BTreeMap<String, ProjectConfig>,
        context: &InheritedConfig,
        parent_path: &str,
        level: usize,
        seen: &mut HashMap<String, String>,
    ) -> Result<Vec<ProjectNode>> {
        let mut nodes = Vec::with_capacity(declarations.len());
        for (key, declaration) in declarations {
            if key.trim().is_empty() {
                return Err(HydroError::config(format!(
                    "Empty project key below '{}'",
                    parent_path
                )));
            }

            let declared = declaration.path.as_deref().unwrap_or(key);
            let path = join_project_path(parent_path, declared)?;
            if let Some(other) = seen.insert(path.clone(), key.clone()) {
                return Err(HydroError::config(format!(
                    "Projects '{}' and '{}' both resolve to path '{}'",
                    other, key, path
                )));
            }

            let merged = context.merge(declaration);
            let child_context = match &declaration.subconfig {
                Some(subconfig) => merged.merge(subconfig),
                None => merged.clone(),
            };
            let location = NodeLocation::new(self.context.root(), path.clone());
            let mut node = ProjectNode::new(
                key,
                declaration,
                merged,
                location,
                level,
                self.context.registry(),
            )?;
            *node.children_mut() = self.build_level(
                &declaration.subprojects,
                &child_context,
                &path,
                level + 1,
                seen,
            )?;
            nodes.push(node);
        }

        nodes.sort_by(|a, b| compare_names(a.display_name(), b.display_name()));
        Ok(nodes)
    }
}
