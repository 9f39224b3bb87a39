//! Grouping engine.
//!
//! Clusters significant terms that co-occur on largely the same
//! documents. Two terms join the same group when their document overlap
//! ratio (intersection over the smaller term's doc count) exceeds the
//! configured threshold; connectivity is transitive via union-find.
//! After clustering, groups subsumed by a superset group are dropped and
//! the remainder is ordered deterministically.
//!
//! The engine may run multiple passes as terms accumulate; each pass
//! returns only groups not emitted by a prior pass.

use std::collections::BTreeSet;
use tracing::debug;

use lsa_common::types::{GroupMember, SignificantTerm, TermGroup, TimeWindow};
use lsa_common::group_id;

use crate::executor::{FieldConstraint, QueryError, QueryExecutor};

/// Disjoint-set forest over term indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

/// Stateful grouping engine for one session.
pub struct GroupingEngine {
    overlap_ratio: f64,
    emitted: BTreeSet<String>,
}

impl GroupingEngine {
    pub fn new(overlap_ratio: f64) -> Self {
        Self {
            overlap_ratio,
            emitted: BTreeSet::new(),
        }
    }

    /// Run one grouping pass over `terms` and return the newly
    /// stabilized groups, ordered by doc count descending then id.
    pub fn pass(
        &mut self,
        terms: &[SignificantTerm],
        executor: &dyn QueryExecutor,
        window: TimeWindow,
    ) -> Result<Vec<TermGroup>, QueryError> {
        if terms.len() < 2 {
            return Ok(Vec::new());
        }

        let mut dsu = UnionFind::new(terms.len());
        for i in 0..terms.len() {
            for j in (i + 1)..terms.len() {
                let smaller = terms[i].doc_count.min(terms[j].doc_count);
                if smaller == 0 {
                    continue;
                }
                let overlap = executor.overlap_count(
                    &[constraint(&terms[i]), constraint(&terms[j])],
                    window,
                )?;
                let ratio = overlap as f64 / smaller as f64;
                if ratio > self.overlap_ratio {
                    debug!(
                        a = %terms[i].key(),
                        b = %terms[j].key(),
                        ratio,
                        "terms connected"
                    );
                    dsu.union(i, j);
                }
            }
        }

        // Collect clusters with at least two members; singletons stay
        // standalone significant terms rather than one-member groups.
        let mut clusters: Vec<Vec<usize>> = vec![Vec::new(); terms.len()];
        for i in 0..terms.len() {
            let root = dsu.find(i);
            clusters[root].push(i);
        }

        let mut groups = Vec::new();
        for members in clusters.into_iter().filter(|c| c.len() >= 2) {
            let mut group_members: Vec<GroupMember> =
                members.iter().map(|&i| GroupMember::from(&terms[i])).collect();
            group_members.sort();

            let constraints: Vec<FieldConstraint> = group_members
                .iter()
                .map(|m| FieldConstraint::new(m.field_name.clone(), m.field_value.clone()))
                .collect();
            let doc_count = executor.overlap_count(&constraints, window)?;

            groups.push(TermGroup {
                id: group_id(&group_members),
                group: group_members,
                doc_count,
            });
        }

        let mut groups = apply_subsumption(groups);
        groups.sort_by(|a, b| b.doc_count.cmp(&a.doc_count).then(a.id.cmp(&b.id)));
        groups.retain(|g| self.emitted.insert(g.id.clone()));
        Ok(groups)
    }
}

/// Drop every group whose member set is a strict subset of another
/// group's with a doc count no larger than the superset's.
pub fn apply_subsumption(groups: Vec<TermGroup>) -> Vec<TermGroup> {
    let keep: Vec<bool> = groups
        .iter()
        .map(|g| {
            !groups
                .iter()
                .any(|other| g.is_strict_subset_of(other) && g.doc_count <= other.doc_count)
        })
        .collect();
    groups
        .into_iter()
        .zip(keep)
        .filter_map(|(g, k)| k.then_some(g))
        .collect()
}

fn constraint(term: &SignificantTerm) -> FieldConstraint {
    FieldConstraint::new(term.field_name.clone(), term.field_value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::dataset::{Dataset, Document, InMemoryExecutor};

    fn doc(ts_ms: i64, pairs: &[(&str, &str)]) -> Document {
        Document {
            ts_ms,
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn term(field: &str, value: &str, doc_count: u64) -> SignificantTerm {
        SignificantTerm {
            field_name: field.to_string(),
            field_value: value.to_string(),
            doc_count,
            bg_count: 0,
            score: 10.0,
            p_value: 0.001,
        }
    }

    fn member(field: &str, value: &str) -> GroupMember {
        GroupMember {
            field_name: field.to_string(),
            field_value: value.to_string(),
        }
    }

    /// 95 docs carry both user=alice and host=web-1; five docs carry only
    /// one of them; ten unrelated docs carry dc=east.
    fn overlap_dataset() -> InMemoryExecutor {
        let mut docs = Vec::new();
        for i in 0..95 {
            docs.push(doc(i, &[("user", "alice"), ("host", "web-1")]));
        }
        for i in 95..100 {
            docs.push(doc(i, &[("user", "alice")]));
        }
        for i in 100..105 {
            docs.push(doc(i, &[("host", "web-1")]));
        }
        for i in 105..115 {
            docs.push(doc(i, &[("dc", "east")]));
        }
        InMemoryExecutor::new(Dataset::new(docs))
    }

    fn window() -> TimeWindow {
        TimeWindow::new(0, 1000)
    }

    #[test]
    fn test_overlapping_terms_grouped_outsider_excluded() {
        let mut engine = GroupingEngine::new(0.75);
        let terms = vec![
            term("user", "alice", 100),
            term("host", "web-1", 100),
            term("dc", "east", 10),
        ];
        let groups = engine.pass(&terms, &overlap_dataset(), window()).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group.len(), 2);
        assert_eq!(groups[0].doc_count, 95);
        assert_eq!(
            groups[0].group,
            vec![member("host", "web-1"), member("user", "alice")]
        );
    }

    #[test]
    fn test_grouping_deterministic_across_runs() {
        let terms = vec![
            term("user", "alice", 100),
            term("host", "web-1", 100),
            term("dc", "east", 10),
        ];
        let executor = overlap_dataset();
        let first = GroupingEngine::new(0.75)
            .pass(&terms, &executor, window())
            .unwrap();
        let second = GroupingEngine::new(0.75)
            .pass(&terms, &executor, window())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_second_pass_emits_only_new_groups() {
        let mut engine = GroupingEngine::new(0.75);
        let terms = vec![term("user", "alice", 100), term("host", "web-1", 100)];
        let executor = overlap_dataset();

        let first = engine.pass(&terms, &executor, window()).unwrap();
        assert_eq!(first.len(), 1);

        // Same terms again: the group was already emitted.
        let second = engine.pass(&terms, &executor, window()).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn test_fewer_than_two_terms_yield_no_groups() {
        let mut engine = GroupingEngine::new(0.75);
        let executor = overlap_dataset();
        assert!(engine.pass(&[], &executor, window()).unwrap().is_empty());
        assert!(engine
            .pass(&[term("user", "alice", 100)], &executor, window())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_subsumption_drops_subset_group() {
        let subset = TermGroup {
            id: "sub".into(),
            group: vec![member("a", "1"), member("b", "2")],
            doc_count: 40,
        };
        let superset = TermGroup {
            id: "super".into(),
            group: vec![member("a", "1"), member("b", "2"), member("c", "3")],
            doc_count: 50,
        };
        let kept = apply_subsumption(vec![subset.clone(), superset.clone()]);
        assert_eq!(kept, vec![superset]);
    }

    #[test]
    fn test_subsumption_keeps_larger_subset() {
        // Subset with a strictly larger doc count survives.
        let subset = TermGroup {
            id: "sub".into(),
            group: vec![member("a", "1")],
            doc_count: 90,
        };
        let superset = TermGroup {
            id: "super".into(),
            group: vec![member("a", "1"), member("b", "2")],
            doc_count: 50,
        };
        let kept = apply_subsumption(vec![subset.clone(), superset.clone()]);
        assert_eq!(kept.len(), 2);
        let _ = (subset, kept);
    }
}
