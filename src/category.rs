use std::collections::BTreeMap;

use crate::error::SeedError;

/// Category label to database id. Categories are created by the schema
/// tooling; this table only has to agree with it.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    ids: BTreeMap<String, u64>,
}

impl CategoryTable {
    pub fn new(ids: BTreeMap<String, u64>) -> Self {
        Self { ids }
    }

    pub fn resolve(&self, label: &str) -> Result<u64, SeedError> {
        self.ids
            .get(label)
            .copied()
            .ok_or_else(|| SeedError::UnknownCategory(label.to_string()))
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for CategoryTable {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_labels() {
        let table: CategoryTable = [("GPU", 1), ("CPU", 2)].into_iter().collect();
        assert_eq!(table.resolve("GPU").unwrap(), 1);
        assert_eq!(table.resolve("CPU").unwrap(), 2);
    }

    #[test]
    fn labels_are_case_sensitive() {
        let table: CategoryTable = [("GPU", 1)].into_iter().collect();
        let err = table.resolve("gpu").unwrap_err();
        assert!(matches!(err, SeedError::UnknownCategory(l) if l == "gpu"));
    }
}
