//! KC Catalog
//!
//! Flat table of knowledge components addressed by stable index. The
//! prerequisite graph refers to KCs by these indices, never by pointer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{KcId, KnowledgeComponent};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    #[error("curriculum code {code} already used by KC {existing}")]
    DuplicateCurriculumCode { code: String, existing: KcId },
    #[error("KC id must not be empty")]
    EmptyId,
}

/// Which KCs are relevant to a student
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumScope {
    /// Grade levels to include; KCs without a grade are always included
    #[serde(default)]
    pub grade_levels: Option<Vec<u8>>,
    /// Curriculum code prefix; KCs without a code are always included
    #[serde(default)]
    pub code_prefix: Option<String>,
}

impl CurriculumScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn grades(levels: impl IntoIterator<Item = u8>) -> Self {
        Self {
            grade_levels: Some(levels.into_iter().collect()),
            code_prefix: None,
        }
    }

    pub fn includes(&self, kc: &KnowledgeComponent) -> bool {
        let grade_ok = match (&self.grade_levels, kc.grade_level) {
            (Some(levels), Some(grade)) => levels.contains(&grade),
            _ => true,
        };
        let code_ok = match (&self.code_prefix, &kc.curriculum_code) {
            (Some(prefix), Some(code)) => code.starts_with(prefix.as_str()),
            _ => true,
        };
        grade_ok && code_ok
    }
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    kcs: Vec<KnowledgeComponent>,
    index: HashMap<KcId, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list; later duplicates of an id replace earlier ones
    pub fn from_components(components: impl IntoIterator<Item = KnowledgeComponent>) -> Self {
        let mut catalog = Self::new();
        for kc in components {
            catalog.insert_unchecked(kc);
        }
        catalog
    }

    /// Insert or replace a KC. Returns true when the stored value changed.
    pub fn upsert(&mut self, kc: KnowledgeComponent) -> Result<bool, CatalogError> {
        if kc.id.trim().is_empty() {
            return Err(CatalogError::EmptyId);
        }
        if let Some(code) = &kc.curriculum_code {
            let clash = self
                .kcs
                .iter()
                .find(|other| other.id != kc.id && other.curriculum_code.as_ref() == Some(code));
            if let Some(other) = clash {
                return Err(CatalogError::DuplicateCurriculumCode {
                    code: code.clone(),
                    existing: other.id.clone(),
                });
            }
        }

        if self.get(&kc.id) == Some(&kc) {
            return Ok(false);
        }
        self.insert_unchecked(kc);
        Ok(true)
    }

    /// Upsert a batch as a unit. Either every KC is stored and the changed
    /// ids come back, or the catalog is left untouched.
    pub fn upsert_all(
        &mut self,
        components: impl IntoIterator<Item = KnowledgeComponent>,
    ) -> Result<Vec<KcId>, CatalogError> {
        let mut staged = self.clone();
        let mut changed = Vec::new();
        for kc in components {
            let id = kc.id.clone();
            if staged.upsert(kc)? && !changed.contains(&id) {
                changed.push(id);
            }
        }
        *self = staged;
        Ok(changed)
    }

    fn insert_unchecked(&mut self, kc: KnowledgeComponent) {
        match self.index.get(&kc.id) {
            Some(&idx) => self.kcs[idx] = kc,
            None => {
                self.index.insert(kc.id.clone(), self.kcs.len());
                self.kcs.push(kc);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&KnowledgeComponent> {
        self.index.get(id).map(|&idx| &self.kcs[idx])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn at(&self, idx: usize) -> &KnowledgeComponent {
        &self.kcs[idx]
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.kcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kcs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KnowledgeComponent> {
        self.kcs.iter()
    }

    /// Active KCs selected by the scope, in curriculum order
    pub fn scoped_ids(&self, scope: &CurriculumScope) -> Vec<KcId> {
        let mut selected: Vec<&KnowledgeComponent> = self
            .kcs
            .iter()
            .filter(|kc| kc.is_active() && scope.includes(kc))
            .collect();
        selected.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        selected.into_iter().map(|kc| kc.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KcStatus;

    fn coded(id: &str, code: &str, grade: u8) -> KnowledgeComponent {
        let mut kc = KnowledgeComponent::new(id, 0);
        kc.curriculum_code = Some(code.to_string());
        kc.grade_level = Some(grade);
        kc
    }

    #[test]
    fn test_upsert_reports_changes() {
        let mut catalog = Catalog::new();
        assert_eq!(catalog.upsert(KnowledgeComponent::new("a", 1)), Ok(true));
        assert_eq!(catalog.upsert(KnowledgeComponent::new("a", 1)), Ok(false));
        assert_eq!(catalog.upsert(KnowledgeComponent::new("a", 2)), Ok(true));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a").map(|kc| kc.position), Some(2));
    }

    #[test]
    fn test_duplicate_curriculum_code_rejected() {
        let mut catalog = Catalog::new();
        catalog.upsert(coded("a", "MATH.3.1", 3)).unwrap();
        let err = catalog.upsert(coded("b", "MATH.3.1", 3)).unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateCurriculumCode {
                code: "MATH.3.1".to_string(),
                existing: "a".to_string()
            }
        );
        assert!(catalog.upsert(coded("a", "MATH.3.1", 4)).is_ok());
    }

    #[test]
    fn test_upsert_all_is_all_or_nothing() {
        let mut catalog = Catalog::from_components(vec![coded("a", "MATH.3.1", 3)]);
        let err = catalog
            .upsert_all(vec![KnowledgeComponent::new("fresh", 1), coded("b", "MATH.3.1", 3)])
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCurriculumCode { .. }));
        assert!(!catalog.contains("fresh"));
        assert_eq!(catalog.len(), 1);

        let changed = catalog
            .upsert_all(vec![KnowledgeComponent::new("fresh", 1), coded("b", "MATH.3.2", 3)])
            .unwrap();
        assert_eq!(changed, vec!["fresh", "b"]);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_scope_filters_by_grade_and_prefix() {
        let catalog = Catalog::from_components(vec![
            coded("a", "MATH.3.1", 3),
            coded("b", "MATH.4.1", 4),
            coded("c", "READ.3.1", 3),
            KnowledgeComponent::new("d", 0),
        ]);

        let scope = CurriculumScope {
            grade_levels: Some(vec![3]),
            code_prefix: Some("MATH".to_string()),
        };
        let mut ids = catalog.scoped_ids(&scope);
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "d".to_string()]);
        assert_eq!(catalog.scoped_ids(&CurriculumScope::all()).len(), 4);
    }

    #[test]
    fn test_scoped_ids_skip_retired_and_follow_position() {
        let mut retired = KnowledgeComponent::new("r", 0);
        retired.status = KcStatus::Retired;
        let catalog = Catalog::from_components(vec![
            KnowledgeComponent::new("late", 9),
            retired,
            KnowledgeComponent::new("early", 1),
        ]);
        assert_eq!(
            catalog.scoped_ids(&CurriculumScope::all()),
            vec!["early".to_string(), "late".to_string()]
        );
    }
}
