//! Learning Path Sequencer
//!
//! Decides which KC a student works on next and keeps the path in step with
//! the catalog.
//!
//! Entry state machine: `pending -> in_progress -> completed`, forward only.
//! A KC is eligible once every prerequisite has a completed entry. Mastery
//! regressing below the threshold never reopens a completed entry.
//!
//! Path layout after reconciliation: committed entries keep their relative
//! order at the front, pending entries follow in prerequisite order with ties
//! broken by curriculum position. The layout is a pure function of the
//! committed sequence and the pending set, which makes reconciliation
//! idempotent.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bkt::MasteryPolicy;
use crate::catalog::{Catalog, CurriculumScope};
use crate::graph::{CycleReport, PrereqGraph};
use crate::sanitize::clamp_probability;
use crate::types::{
    EntryStatus, KcId, KnowledgeState, LearningPath, PathEntry, PathStatus, StudentId,
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PathError {
    #[error("learning path for student {0} is archived")]
    Archived(StudentId),
}

// ==================== Results ====================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub kc_id: KcId,
    pub from: EntryStatus,
    pub to: EntryStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathOutcome {
    /// A KC is selected
    InProgress,
    /// Every entry is completed, or the path is empty
    AllCaughtUp,
    /// Entries remain but none is eligible
    Blocked,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Advance {
    pub next: Option<KcId>,
    pub outcome: PathOutcome,
    /// Transitions applied by this call, in order
    pub changes: Vec<StatusChange>,
    pub path: LearningPath,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    UnknownKc,
    Retired,
    OutOfScope,
    /// On a prerequisite cycle or downstream of one
    PrerequisiteCycle,
    /// A transitive prerequisite is missing from the catalog or retired
    UnavailablePrerequisite { prerequisite: KcId },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedKc {
    pub kc_id: KcId,
    #[serde(flatten)]
    pub reason: RejectReason,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub path: LearningPath,
    /// KCs added as new pending entries, in path order
    pub inserted: Vec<KcId>,
    pub rejected: Vec<RejectedKc>,
    pub cycles: CycleReport,
    pub changed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Supersession {
    pub archived: LearningPath,
    pub path: LearningPath,
    /// Completed entries carried over from the archived path
    pub carried: Vec<KcId>,
    pub rejected: Vec<RejectedKc>,
    pub cycles: CycleReport,
}

// ==================== Sequencer ====================

#[derive(Clone, Copy, Debug, Default)]
pub struct PathSequencer {
    mastery: MasteryPolicy,
}

impl PathSequencer {
    pub fn new(mastery: MasteryPolicy) -> Self {
        Self { mastery }
    }

    pub fn mastery_policy(&self) -> MasteryPolicy {
        self.mastery
    }

    /// Current estimate for a KC; the KC's pL0 when no state exists yet
    fn current_mastery(
        &self,
        catalog: &Catalog,
        states: &HashMap<KcId, KnowledgeState>,
        kc_id: &str,
    ) -> f64 {
        states
            .get(kc_id)
            .map(|s| s.p_mastery)
            .or_else(|| catalog.get(kc_id).map(|kc| clamp_probability(kc.params.p_init)))
            .unwrap_or(0.0)
    }

    /// Whether every prerequisite of this KC is completed on the path
    pub fn is_eligible(&self, catalog: &Catalog, path: &LearningPath, kc_id: &str) -> bool {
        let completed = completed_set(path);
        eligible(catalog, &completed, kc_id)
    }

    fn select_index(
        &self,
        catalog: &Catalog,
        path: &LearningPath,
        states: &HashMap<KcId, KnowledgeState>,
    ) -> Option<usize> {
        let completed = completed_set(path);

        let resume = path
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.status == EntryStatus::InProgress)
            .filter(|(_, e)| eligible(catalog, &completed, &e.kc_id))
            .map(|(i, e)| (self.current_mastery(catalog, states, &e.kc_id), i))
            .min_by(|(pa, ia), (pb, ib)| pa.total_cmp(pb).then(ia.cmp(ib)));
        if let Some((_, i)) = resume {
            return Some(i);
        }

        path.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.status == EntryStatus::Pending)
            .filter_map(|(i, e)| catalog.get(&e.kc_id).map(|kc| (kc, i)))
            .filter(|(kc, _)| kc.is_active())
            .filter(|(kc, _)| eligible(catalog, &completed, &kc.id))
            .min_by(|(a, _), (b, _)| a.order_key().cmp(&b.order_key()))
            .map(|(_, i)| i)
    }

    /// The KC the student should work on now, if any. Read-only.
    pub fn next_step(
        &self,
        catalog: &Catalog,
        path: &LearningPath,
        states: &HashMap<KcId, KnowledgeState>,
    ) -> Option<KcId> {
        if !path.is_active() {
            return None;
        }
        self.select_index(catalog, path, states)
            .map(|i| path.entries[i].kc_id.clone())
    }

    /// Record completions, then select and commit to the next KC.
    pub fn advance(
        &self,
        catalog: &Catalog,
        path: &LearningPath,
        states: &HashMap<KcId, KnowledgeState>,
    ) -> Result<Advance, PathError> {
        if !path.is_active() {
            return Err(PathError::Archived(path.student_id.clone()));
        }

        let mut path = path.clone();
        let mut changes = Vec::new();

        // An in-progress KC can gain prerequisites from a catalog change; it
        // completes only once those are completed.
        loop {
            let completed = completed_set(&path);
            let ready: Vec<usize> = path
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.status == EntryStatus::InProgress)
                .filter(|(_, e)| eligible(catalog, &completed, &e.kc_id))
                .filter(|(_, e)| {
                    self.mastery
                        .is_mastered(self.current_mastery(catalog, states, &e.kc_id))
                })
                .map(|(i, _)| i)
                .collect();
            if ready.is_empty() {
                break;
            }
            for i in ready {
                let entry = &mut path.entries[i];
                entry.status = EntryStatus::Completed;
                changes.push(StatusChange {
                    kc_id: entry.kc_id.clone(),
                    from: EntryStatus::InProgress,
                    to: EntryStatus::Completed,
                });
            }
        }

        // Each pass either stops or completes one entry, so this is bounded.
        let mut next = None;
        for _ in 0..=path.entries.len() {
            let Some(i) = self.select_index(catalog, &path, states) else {
                break;
            };
            let p_mastery = self.current_mastery(catalog, states, &path.entries[i].kc_id);
            let entry = &mut path.entries[i];

            if entry.status == EntryStatus::Pending {
                entry.status = EntryStatus::InProgress;
                changes.push(StatusChange {
                    kc_id: entry.kc_id.clone(),
                    from: EntryStatus::Pending,
                    to: EntryStatus::InProgress,
                });
            }

            if self.mastery.is_mastered(p_mastery) {
                entry.status = EntryStatus::Completed;
                changes.push(StatusChange {
                    kc_id: entry.kc_id.clone(),
                    from: EntryStatus::InProgress,
                    to: EntryStatus::Completed,
                });
                continue;
            }

            next = Some(entry.kc_id.clone());
            break;
        }

        if !changes.is_empty() {
            path.version += 1;
        }

        let outcome = match &next {
            Some(_) => PathOutcome::InProgress,
            None if path
                .entries
                .iter()
                .all(|e| e.status == EntryStatus::Completed) =>
            {
                PathOutcome::AllCaughtUp
            }
            None => PathOutcome::Blocked,
        };

        debug!(
            student_id = %path.student_id,
            next = ?next,
            outcome = ?outcome,
            changes = changes.len(),
            "path advanced"
        );

        Ok(Advance {
            next,
            outcome,
            changes,
            path,
        })
    }

    /// Fold new or changed KCs into the path.
    ///
    /// Each requested KC is validated on its own: a cycle, an unavailable
    /// prerequisite or an unknown id rejects that KC only. Accepted KCs, and
    /// requested KCs already open on the path, bring along any transitive
    /// prerequisites not yet on the path.
    pub fn reconcile(
        &self,
        catalog: &Catalog,
        path: &LearningPath,
        new_or_changed: &[KcId],
        scope: &CurriculumScope,
    ) -> Result<Reconciliation, PathError> {
        if !path.is_active() {
            return Err(PathError::Archived(path.student_id.clone()));
        }
        Ok(self.fold_in(catalog, path, new_or_changed, scope))
    }

    fn fold_in(
        &self,
        catalog: &Catalog,
        path: &LearningPath,
        new_or_changed: &[KcId],
        scope: &CurriculumScope,
    ) -> Reconciliation {
        let graph = PrereqGraph::build(catalog);
        let cycles = graph.cycle_report(catalog);
        let cycle_affected = graph.cycle_affected();
        if !cycles.is_empty() {
            warn!(
                student_id = %path.student_id,
                cycles = ?cycles.cycles,
                blocked = ?cycles.blocked,
                "prerequisite cycle detected; affected KCs are not sequenced"
            );
        }

        let on_path: HashSet<&str> = path.entries.iter().map(|e| e.kc_id.as_str()).collect();
        let requested: BTreeSet<&str> = new_or_changed.iter().map(String::as_str).collect();

        let mut rejected = Vec::new();
        let mut additions: BTreeSet<usize> = BTreeSet::new();

        for kc_id in requested {
            let reject = |reason| RejectedKc {
                kc_id: kc_id.to_string(),
                reason,
            };

            let Some(idx) = catalog.index_of(kc_id) else {
                rejected.push(reject(RejectReason::UnknownKc));
                continue;
            };
            if let Some(entry) = path.entry(kc_id) {
                // Open entries may have gained prerequisites since they were added.
                if entry.status != EntryStatus::Completed {
                    if cycle_affected.contains(&idx) {
                        rejected.push(reject(RejectReason::PrerequisiteCycle));
                    } else {
                        match closure(catalog, &graph, idx, &on_path) {
                            Ok(nodes) => additions.extend(nodes),
                            Err(prerequisite) => rejected.push(reject(
                                RejectReason::UnavailablePrerequisite { prerequisite },
                            )),
                        }
                    }
                }
                continue;
            }

            let kc = catalog.at(idx);
            if !kc.is_active() {
                rejected.push(reject(RejectReason::Retired));
                continue;
            }
            if !scope.includes(kc) {
                rejected.push(reject(RejectReason::OutOfScope));
                continue;
            }
            if cycle_affected.contains(&idx) {
                rejected.push(reject(RejectReason::PrerequisiteCycle));
                continue;
            }

            match closure(catalog, &graph, idx, &on_path) {
                Ok(nodes) => additions.extend(nodes),
                Err(prerequisite) => {
                    rejected.push(reject(RejectReason::UnavailablePrerequisite { prerequisite }));
                }
            }
        }

        let mut inserted: Vec<KcId> = Vec::new();
        let mut entries = path.entries.clone();
        for &idx in &additions {
            let id = catalog.at(idx).id.clone();
            inserted.push(id.clone());
            entries.push(PathEntry::pending(id));
        }

        let entries = arrange(catalog, &graph, &cycle_affected, entries);
        inserted.sort_by_key(|id| entries.iter().position(|e| &e.kc_id == id));

        let changed = entries != path.entries;
        let mut next_path = path.clone();
        if changed {
            next_path.entries = entries;
            next_path.version += 1;
        }

        if !inserted.is_empty() || !rejected.is_empty() {
            info!(
                student_id = %path.student_id,
                inserted = inserted.len(),
                rejected = rejected.len(),
                "learning path reconciled"
            );
        }

        Reconciliation {
            path: next_path,
            inserted,
            rejected,
            cycles,
            changed,
        }
    }

    /// A fresh path holding every in-scope KC
    pub fn build_path(
        &self,
        student_id: &str,
        catalog: &Catalog,
        scope: &CurriculumScope,
    ) -> Reconciliation {
        let ids = catalog.scoped_ids(scope);
        self.fold_in(catalog, &LearningPath::new(student_id), &ids, scope)
    }

    /// Archive a path and activate a rebuilt one.
    ///
    /// Completed entries carry over only when all of their prerequisites
    /// carry over as completed too.
    pub fn supersede(
        &self,
        old: &LearningPath,
        catalog: &Catalog,
        scope: &CurriculumScope,
    ) -> Result<Supersession, PathError> {
        if !old.is_active() {
            return Err(PathError::Archived(old.student_id.clone()));
        }

        let mut archived = old.clone();
        archived.status = PathStatus::Archived;
        archived.version += 1;

        let fresh = self.build_path(&old.student_id, catalog, scope);
        let graph = PrereqGraph::build(catalog);
        let cycle_affected = graph.cycle_affected();

        let mut entries = fresh.path.entries;
        let mut completed: HashSet<KcId> = HashSet::new();
        let mut carried = Vec::new();

        // Pending entries of a fresh path are already in prerequisite order.
        for entry in entries.iter_mut() {
            if old.status_of(&entry.kc_id) != Some(EntryStatus::Completed) {
                continue;
            }
            let ready = catalog
                .get(&entry.kc_id)
                .map(|kc| kc.prerequisites.iter().all(|p| completed.contains(p)))
                .unwrap_or(false);
            if ready {
                entry.status = EntryStatus::Completed;
                completed.insert(entry.kc_id.clone());
                carried.push(entry.kc_id.clone());
            }
        }

        let path = LearningPath {
            student_id: old.student_id.clone(),
            entries: arrange(catalog, &graph, &cycle_affected, entries),
            status: PathStatus::Active,
            version: old.version + 1,
            updated_at: old.updated_at,
        };

        info!(
            student_id = %old.student_id,
            carried = carried.len(),
            entries = path.entries.len(),
            "learning path superseded"
        );

        Ok(Supersession {
            archived,
            path,
            carried,
            rejected: fresh.rejected,
            cycles: fresh.cycles,
        })
    }
}

// ==================== Helpers ====================

fn completed_set(path: &LearningPath) -> HashSet<&str> {
    path.entries
        .iter()
        .filter(|e| e.status == EntryStatus::Completed)
        .map(|e| e.kc_id.as_str())
        .collect()
}

fn eligible(catalog: &Catalog, completed: &HashSet<&str>, kc_id: &str) -> bool {
    catalog
        .get(kc_id)
        .map(|kc| kc.prerequisites.iter().all(|p| completed.contains(p.as_str())))
        .unwrap_or(false)
}

/// The KC plus its transitive prerequisites that still need entries.
/// Errs with the first unavailable prerequisite found.
fn closure(
    catalog: &Catalog,
    graph: &PrereqGraph,
    idx: usize,
    on_path: &HashSet<&str>,
) -> Result<Vec<usize>, KcId> {
    let mut nodes = vec![idx];
    nodes.extend(graph.ancestors(idx));

    for &node in &nodes {
        if let Some(missing) = graph.missing_prerequisites(node).first() {
            return Err(missing.clone());
        }
    }

    let mut needed = Vec::with_capacity(nodes.len());
    for node in nodes {
        let kc = catalog.at(node);
        if on_path.contains(kc.id.as_str()) {
            continue;
        }
        if node != idx && !kc.is_active() {
            return Err(kc.id.clone());
        }
        needed.push(node);
    }
    Ok(needed)
}

/// Committed entries first in their existing order, then pending entries in
/// prerequisite order. Pending entries that cannot be ordered (cycle or
/// unknown KC) keep their relative order at the end.
fn arrange(
    catalog: &Catalog,
    graph: &PrereqGraph,
    cycle_affected: &HashSet<usize>,
    entries: Vec<PathEntry>,
) -> Vec<PathEntry> {
    let (committed, pending): (Vec<PathEntry>, Vec<PathEntry>) = entries
        .into_iter()
        .partition(|e| e.status.is_committed());

    let mut orderable: BTreeSet<usize> = BTreeSet::new();
    let mut leftover = Vec::new();
    for entry in pending {
        match catalog.index_of(&entry.kc_id) {
            Some(idx) if !cycle_affected.contains(&idx) => {
                orderable.insert(idx);
            }
            _ => leftover.push(entry),
        }
    }

    let mut arranged = committed;
    arranged.extend(
        graph
            .topo_order(catalog, &orderable)
            .into_iter()
            .map(|idx| PathEntry::pending(catalog.at(idx).id.clone())),
    );
    arranged.extend(leftover);
    arranged
}
