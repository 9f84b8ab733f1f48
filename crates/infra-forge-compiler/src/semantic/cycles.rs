//! Strongly connected components over declaration reference edges.

/// Finds every cycle in a directed graph given as adjacency lists.
///
/// Returns one entry per strongly connected component that contains a cycle:
/// components of two or more nodes, and single nodes with a self-edge. Nodes
/// within a component are sorted, and components are ordered by their
/// smallest node, so the result is deterministic.
pub fn find_cycles(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut tarjan = Tarjan {
        edges,
        index: vec![None; edges.len()],
        low: vec![0; edges.len()],
        on_stack: vec![false; edges.len()],
        stack: Vec::new(),
        next: 0,
        components: Vec::new(),
    };
    for node in 0..edges.len() {
        if tarjan.index[node].is_none() {
            tarjan.visit(node);
        }
    }

    let mut cycles: Vec<Vec<usize>> = tarjan
        .components
        .into_iter()
        .filter(|c| c.len() > 1 || edges[c[0]].contains(&c[0]))
        .map(|mut c| {
            c.sort_unstable();
            c
        })
        .collect();
    cycles.sort_unstable_by_key(|c| c[0]);
    cycles
}

struct Tarjan<'a> {
    edges: &'a [Vec<usize>],
    index: Vec<Option<usize>>,
    low: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next: usize,
    components: Vec<Vec<usize>>,
}

impl Tarjan<'_> {
    /// Depth-first search from `root` with an explicit call stack of
    /// `(node, next edge)` frames, so long reference chains need no recursion.
    fn visit(&mut self, root: usize) {
        let mut frames = vec![(root, 0usize)];
        self.open(root);

        while let Some(frame) = frames.last_mut() {
            let (node, edge) = *frame;
            if let Some(&target) = self.edges[node].get(edge) {
                frame.1 += 1;
                match self.index[target] {
                    None => {
                        self.open(target);
                        frames.push((target, 0));
                    }
                    Some(target_index) if self.on_stack[target] => {
                        self.low[node] = self.low[node].min(target_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                self.low[parent] = self.low[parent].min(self.low[node]);
            }
            if Some(self.low[node]) == self.index[node] {
                self.close(node);
            }
        }
    }

    fn open(&mut self, node: usize) {
        self.index[node] = Some(self.next);
        self.low[node] = self.next;
        self.next += 1;
        self.stack.push(node);
        self.on_stack[node] = true;
    }

    /// Pops the component rooted at `node`.
    fn close(&mut self, node: usize) {
        let mut component = Vec::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack[member] = false;
            component.push(member);
            if member == node {
                break;
            }
        }
        self.components.push(component);
    }
}
