//! Shared, lock-protected graphs.
//!
//! Every `GraphHandle` owns one reader/writer lock. Operations touching two
//! graphs acquire both locks in handle-id order, whichever graph plays the
//! role of A or B, so two callers working on the same pair in opposite roles
//! cannot deadlock.

use super::LineageGraph;
use crate::error::GraphError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(0);

/// Shared graph plus its lock. Clones refer to the same graph.
#[derive(Debug, Clone)]
pub struct GraphHandle {
    id: u64,
    graph: Arc<RwLock<LineageGraph>>,
}

impl GraphHandle {
    pub fn new(graph: LineageGraph) -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            graph: Arc::new(RwLock::new(graph)),
        }
    }

    /// Position of this graph in the global lock order
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn same_graph(&self, other: &GraphHandle) -> bool {
        Arc::ptr_eq(&self.graph, &other.graph)
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, LineageGraph>, GraphError> {
        self.graph.read().map_err(|_| GraphError::LockPoisoned)
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, LineageGraph>, GraphError> {
        self.graph.write().map_err(|_| GraphError::LockPoisoned)
    }

    /// Runs `f` with read access to both graphs.
    ///
    /// When both handles refer to the same graph the lock is taken once and
    /// `f` sees the same graph twice.
    pub fn with_read_pair<R>(
        a: &GraphHandle,
        b: &GraphHandle,
        f: impl FnOnce(&LineageGraph, &LineageGraph) -> R,
    ) -> Result<R, GraphError> {
        if a.same_graph(b) {
            let g = a.read()?;
            return Ok(f(&g, &g));
        }
        if a.id < b.id {
            let ga = a.read()?;
            let gb = b.read()?;
            Ok(f(&ga, &gb))
        } else {
            let gb = b.read()?;
            let ga = a.read()?;
            Ok(f(&ga, &gb))
        }
    }

    /// Runs `f` with read access to `source` and write access to `target`.
    pub fn with_read_write<R>(
        source: &GraphHandle,
        target: &GraphHandle,
        f: impl FnOnce(&LineageGraph, &mut LineageGraph) -> R,
    ) -> Result<R, GraphError> {
        if source.same_graph(target) {
            return Err(GraphError::SameGraph);
        }
        if source.id < target.id {
            let gs = source.read()?;
            let mut gt = target.write()?;
            Ok(f(&gs, &mut gt))
        } else {
            let mut gt = target.write()?;
            let gs = source.read()?;
            Ok(f(&gs, &mut gt))
        }
    }

    /// Runs `f` with write access to both graphs.
    pub fn with_write_pair<R>(
        a: &GraphHandle,
        b: &GraphHandle,
        f: impl FnOnce(&mut LineageGraph, &mut LineageGraph) -> R,
    ) -> Result<R, GraphError> {
        if a.same_graph(b) {
            return Err(GraphError::SameGraph);
        }
        if a.id < b.id {
            let mut ga = a.write()?;
            let mut gb = b.write()?;
            Ok(f(&mut ga, &mut gb))
        } else {
            let mut gb = b.write()?;
            let mut ga = a.write()?;
            Ok(f(&mut ga, &mut gb))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;
    use std::thread;

    fn single_spot_graph(label: &str) -> LineageGraph {
        let mut graph = LineageGraph::new();
        graph.add_spot(label, 0, Vec3::zeros());
        graph
    }

    #[test]
    fn test_ids_are_ordered_and_shared_by_clones() {
        let a = GraphHandle::new(LineageGraph::new());
        let b = GraphHandle::new(LineageGraph::new());
        assert!(a.id() < b.id());
        let a2 = a.clone();
        assert_eq!(a.id(), a2.id());
        assert!(a.same_graph(&a2));
        assert!(!a.same_graph(&b));
    }

    #[test]
    fn test_read_pair_on_same_graph() {
        let a = GraphHandle::new(single_spot_graph("x"));
        let count = GraphHandle::with_read_pair(&a, &a.clone(), |ga, gb| {
            ga.spot_count() + gb.spot_count()
        })
        .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_read_write_rejects_same_graph() {
        let a = GraphHandle::new(LineageGraph::new());
        let result = GraphHandle::with_read_write(&a, &a, |_, _| ());
        assert_eq!(result, Err(GraphError::SameGraph));
    }

    #[test]
    fn test_opposite_roles_do_not_deadlock() {
        let a = GraphHandle::new(single_spot_graph("a"));
        let b = GraphHandle::new(single_spot_graph("b"));

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let (a, b) = (a.clone(), b.clone());
                thread::spawn(move || {
                    for _ in 0..200 {
                        let (source, target) = if i % 2 == 0 { (&a, &b) } else { (&b, &a) };
                        GraphHandle::with_read_write(source, target, |gs, gt| {
                            let n = gs.spot_count() as u32;
                            gt.add_spot("x", n, Vec3::zeros());
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        let total = a.read().unwrap().spot_count() + b.read().unwrap().spot_count();
        assert_eq!(total, 2 + 4 * 200);
    }
}
