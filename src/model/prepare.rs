use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{Column, PrepareId};

/// A prepared statement and the columns captured for its `?` placeholders,
/// in the order they appeared in the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedStatement {
    pub id: PrepareId,
    pub name: String,
    /// Snapshots of the parameter columns; a later `alter` on the source
    /// table does not retype already-captured parameters.
    pub params: Vec<Column>,
}

impl PreparedStatement {
    pub fn new(id: PrepareId) -> Self {
        Self {
            id,
            name: format!("p{id}"),
            params: Vec::new(),
        }
    }

    pub fn append_param(&mut self, column: Column) {
        self.params.push(column);
    }

    /// `set @u<k> = <literal>` for each captured parameter.
    pub fn gen_assignments(&self, rng: &mut ChaCha8Rng) -> Vec<String> {
        self.params
            .iter()
            .enumerate()
            .map(|(i, col)| format!("set @u{} = {}", i + 1, col.random_value(rng)))
            .collect()
    }

    /// `@u1`, `@u2`, … matching [`Self::gen_assignments`].
    pub fn user_vars(&self) -> Vec<String> {
        (1..=self.params.len()).map(|i| format!("@u{i}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnId, ColumnType};
    use rand::SeedableRng;

    fn param(id: u64) -> Column {
        Column {
            id: ColumnId(id),
            name: format!("c{id}"),
            tp: ColumnType::Int,
            len: 0,
            scale: 0,
            nullable: false,
            default_value: None,
            is_partition_key: false,
            members: Vec::new(),
        }
    }

    #[test]
    fn assignments_match_user_vars() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut p = PreparedStatement::new(PrepareId(4));
        assert_eq!(p.name, "p4");
        p.append_param(param(0));
        p.append_param(param(1));
        let assignments = p.gen_assignments(&mut rng);
        assert_eq!(assignments.len(), 2);
        assert!(assignments[0].starts_with("set @u1 = "));
        assert!(assignments[1].starts_with("set @u2 = "));
        assert_eq!(p.user_vars(), vec!["@u1".to_string(), "@u2".to_string()]);
    }

    #[test]
    fn no_params_means_no_assignments() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let p = PreparedStatement::new(PrepareId(0));
        assert!(p.gen_assignments(&mut rng).is_empty());
        assert!(p.user_vars().is_empty());
    }
}
