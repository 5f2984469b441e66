//! Dependency graph over calculations (§4.4.2): node `k` (a calculation's
//! `ref`) has an edge to every `R`-prefixed ref its formula mentions.
//! Non-`R` refs are external seeds and never become graph nodes.

use rustc_hash::{FxHashMap, FxHashSet};

use pf_common::{Diagnostic, DiagnosticCode};
use pf_model::Calculation;

pub struct DependencyGraph {
    /// Declaration order of nodes, used as a stable DFS root order so that
    /// topological soundness doesn't depend on HashMap iteration order.
    nodes: Vec<String>,
    edges: FxHashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn build(calculations: &[Calculation]) -> Self {
        let nodes: Vec<String> = calculations.iter().map(|c| c.reference()).collect();
        let node_set: FxHashSet<&str> = nodes.iter().map(|s| s.as_str()).collect();

        let mut edges = FxHashMap::default();
        for calc in calculations {
            let refs = pf_parse::extract_references(&calc.formula);
            let deps: Vec<String> = refs
                .into_iter()
                .filter(|r| r.starts_with('R') && node_set.contains(r.as_str()))
                .collect();
            edges.insert(calc.reference(), deps);
        }
        Self { nodes, edges }
    }

    /// Produces a topological order plus any circular-dependency
    /// diagnostics. Nodes involved in a cycle are omitted from the order —
    /// callers must zero their output (§4.4.2, §7, §8 seed scenario 6).
    pub fn topological_order(&self) -> (Vec<String>, FxHashSet<String>, Vec<Diagnostic>) {
        let mut state: FxHashMap<&str, u8> = FxHashMap::default(); // 0 unvisited, 1 visiting, 2 done
        let mut order = Vec::new();
        let mut cyclic = FxHashSet::default();
        let mut diagnostics = Vec::new();
        let mut path: Vec<String> = Vec::new();

        for root in &self.nodes {
            if state.get(root.as_str()).copied().unwrap_or(0) == 0 {
                self.visit(root, &mut state, &mut order, &mut cyclic, &mut diagnostics, &mut path);
            }
        }
        (order, cyclic, diagnostics)
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        state: &mut FxHashMap<&'a str, u8>,
        order: &mut Vec<String>,
        cyclic: &mut FxHashSet<String>,
        diagnostics: &mut Vec<Diagnostic>,
        path: &mut Vec<String>,
    ) {
        state.insert(node, 1);
        path.push(node.to_string());

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                match state.get(dep.as_str()).copied().unwrap_or(0) {
                    0 => self.visit(dep, state, order, cyclic, diagnostics, path),
                    1 => {
                        if let Some(start) = path.iter().position(|n| n == dep) {
                            for n in &path[start..] {
                                cyclic.insert(n.clone());
                            }
                        }
                        diagnostics.push(
                            Diagnostic::error(
                                DiagnosticCode::CircularDependency,
                                format!("circular dependency detected involving {node}"),
                            )
                            .with_ref(node.to_string()),
                        );
                    }
                    _ => {}
                }
            }
        }

        path.pop();
        state.insert(node, 2);
        if !cyclic.contains(node) {
            order.push(node.to_string());
        }
    }
}
