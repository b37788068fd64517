use indexmap::IndexSet;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use super::ColumnId;
use crate::rng::{pick, pick_index, random_bool, random_int};

/// Member pool for generated `enum` and `set` columns.
const SET_MEMBER_POOL: &[&str] = &["north", "south", "east", "west", "up", "down"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Char,
    Varchar,
    Text,
    Date,
    Datetime,
    Timestamp,
    Blob,
    Enum,
    Set,
}

impl ColumnType {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Int | ColumnType::BigInt
        )
    }

    pub fn is_string(self) -> bool {
        matches!(self, ColumnType::Char | ColumnType::Varchar | ColumnType::Text)
    }

    /// MySQL requires a key-part length for text/blob index columns.
    pub fn needs_index_prefix(self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::Blob)
    }

    fn can_have_default(self) -> bool {
        !matches!(self, ColumnType::Text | ColumnType::Blob)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    pub tp: ColumnType,
    /// Char/varchar length, or decimal precision.
    pub len: u32,
    /// Decimal scale.
    pub scale: u32,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_partition_key: bool,
    /// Enum/set member list, in declaration order.
    pub members: Vec<String>,
}

impl Column {
    pub fn random_new(id: ColumnId, rng: &mut ChaCha8Rng) -> Self {
        let types: Vec<ColumnType> = ColumnType::iter().collect();
        let tp = *pick(&types, rng);
        let (len, scale) = match tp {
            ColumnType::Char => (random_int(rng, 1, 20) as u32, 0),
            ColumnType::Varchar => (random_int(rng, 1, 60) as u32, 0),
            ColumnType::Decimal => {
                let precision = random_int(rng, 10, 20) as u32;
                (precision, random_int(rng, 0, 5) as u32)
            }
            _ => (0, 0),
        };
        let members = if matches!(tp, ColumnType::Enum | ColumnType::Set) {
            let cnt = random_int(rng, 2, SET_MEMBER_POOL.len() as i64) as usize;
            SET_MEMBER_POOL[..cnt].iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        };
        let nullable = random_int(rng, 0, 3) != 0;
        let mut col = Self {
            id,
            name: format!("c{id}"),
            tp,
            len,
            scale,
            nullable,
            default_value: None,
            is_partition_key: false,
            members,
        };
        if tp.can_have_default() && random_bool(rng) {
            col.default_value = Some(col.random_value_non_null(rng));
        }
        col
    }

    /// The column definition type text, e.g. `varchar(32)` or `decimal(12,6)`.
    pub fn sql_type(&self) -> String {
        match self.tp {
            ColumnType::TinyInt => "tinyint".to_string(),
            ColumnType::SmallInt => "smallint".to_string(),
            ColumnType::Int => "int".to_string(),
            ColumnType::BigInt => "bigint".to_string(),
            ColumnType::Float => "float".to_string(),
            ColumnType::Double => "double".to_string(),
            ColumnType::Decimal => format!("decimal({},{})", self.len, self.scale),
            ColumnType::Char => format!("char({})", self.len),
            ColumnType::Varchar => format!("varchar({})", self.len),
            ColumnType::Text => "text".to_string(),
            ColumnType::Date => "date".to_string(),
            ColumnType::Datetime => "datetime".to_string(),
            ColumnType::Timestamp => "timestamp".to_string(),
            ColumnType::Blob => "blob".to_string(),
            ColumnType::Enum => format!("enum({})", self.members_list()),
            ColumnType::Set => format!("set({})", self.members_list()),
        }
    }

    /// Full definition fragment: type plus nullability and default clauses.
    pub fn sql_definition(&self) -> String {
        let mut def = self.sql_type();
        if !self.nullable {
            def.push_str(" not null");
        }
        if let Some(dv) = &self.default_value {
            def.push_str(" default ");
            def.push_str(dv);
        }
        def
    }

    fn members_list(&self) -> String {
        self.members
            .iter()
            .map(|m| quote_str(m))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Sample a literal of this column's type; `NULL` shows up occasionally
    /// for nullable columns.
    pub fn random_value(&self, rng: &mut ChaCha8Rng) -> String {
        if self.nullable && random_int(rng, 0, 9) == 0 {
            return "NULL".to_string();
        }
        self.random_value_non_null(rng)
    }

    pub fn random_value_non_null(&self, rng: &mut ChaCha8Rng) -> String {
        match self.tp {
            ColumnType::TinyInt => random_int(rng, -128, 127).to_string(),
            ColumnType::SmallInt => random_int(rng, -32768, 32767).to_string(),
            ColumnType::Int => random_int(rng, i32::MIN as i64, i32::MAX as i64).to_string(),
            ColumnType::BigInt => rng.random_range(i64::MIN..=i64::MAX).to_string(),
            ColumnType::Float | ColumnType::Double => {
                format!("{:.4}", rng.random_range(-1.0e6..1.0e6))
            }
            ColumnType::Decimal => {
                let int_digits = (self.len - self.scale).min(9);
                let bound = 10i64.pow(int_digits) - 1;
                let int_part = random_int(rng, -bound, bound);
                if self.scale == 0 {
                    int_part.to_string()
                } else {
                    let frac_bound = 10i64.pow(self.scale) - 1;
                    let frac = random_int(rng, 0, frac_bound);
                    format!("{}.{:0>width$}", int_part, frac, width = self.scale as usize)
                }
            }
            ColumnType::Char | ColumnType::Varchar => {
                let max = (self.len as usize).min(12);
                let n = random_int(rng, 0, max as i64) as usize;
                quote_str(&crate::rng::random_ascii(rng, n))
            }
            ColumnType::Text => {
                let n = random_int(rng, 0, 20) as usize;
                quote_str(&crate::rng::random_ascii(rng, n))
            }
            ColumnType::Date => quote_str(&random_date(rng)),
            ColumnType::Datetime => {
                quote_str(&format!("{} {}", random_date(rng), random_time(rng)))
            }
            ColumnType::Timestamp => {
                // Stay inside the portable timestamp range.
                let date = format!(
                    "{:04}-{:02}-{:02}",
                    random_int(rng, 1971, 2037),
                    random_int(rng, 1, 12),
                    random_int(rng, 1, 28)
                );
                quote_str(&format!("{} {}", date, random_time(rng)))
            }
            ColumnType::Blob => {
                let n = random_int(rng, 1, 8) as usize;
                let bytes: Vec<u8> = (0..n).map(|_| rng.random_range(0..=255u8)).collect();
                hex_literal(&bytes)
            }
            ColumnType::Enum => quote_str(pick(&self.members, rng).as_str()),
            ColumnType::Set => {
                let mut chosen = Vec::new();
                for m in &self.members {
                    if random_bool(rng) {
                        chosen.push(m.as_str());
                    }
                }
                if chosen.is_empty() {
                    chosen.push(self.members[pick_index(self.members.len(), rng)].as_str());
                }
                quote_str(&chosen.join(","))
            }
        }
    }

    /// `n` distinct non-null literals in ascending order (fewer when the
    /// type's domain runs out).
    pub fn random_values_asc(&self, rng: &mut ChaCha8Rng, n: usize) -> Vec<String> {
        let mut set: IndexSet<String> = IndexSet::with_capacity(n);
        let mut attempts = 0;
        while set.len() < n && attempts < n * 20 {
            attempts += 1;
            set.insert(self.random_value_non_null(rng));
        }
        let mut vals: Vec<String> = set.into_iter().collect();
        self.sort_literals(&mut vals);
        vals
    }

    /// Sort literals by the column's natural order rather than lexically.
    pub fn sort_literals(&self, vals: &mut [String]) {
        if self.tp.is_integer() {
            vals.sort_by_key(|v| v.parse::<i128>().unwrap_or(i128::MIN));
        } else if matches!(
            self.tp,
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal
        ) {
            vals.sort_by(|a, b| {
                let fa = a.parse::<f64>().unwrap_or(f64::MIN);
                let fb = b.parse::<f64>().unwrap_or(f64::MIN);
                fa.partial_cmp(&fb).unwrap_or(std::cmp::Ordering::Equal)
            });
        } else {
            vals.sort();
        }
    }
}

fn random_date(rng: &mut ChaCha8Rng) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        random_int(rng, 1990, 2037),
        random_int(rng, 1, 12),
        random_int(rng, 1, 28)
    )
}

fn random_time(rng: &mut ChaCha8Rng) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        random_int(rng, 0, 23),
        random_int(rng, 0, 59),
        random_int(rng, 0, 59)
    )
}

/// Single-quote a string literal, doubling embedded quotes.
pub fn quote_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    out.push_str(&s.replace('\'', "''"));
    out.push('\'');
    out
}

/// Binary literal in `x'…'` form.
pub fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("x'");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn quote_str_doubles_embedded_quotes() {
        assert_eq!(quote_str("hello"), "'hello'");
        assert_eq!(quote_str("O'Reilly"), "'O''Reilly'");
        assert_eq!(quote_str("a''b"), "'a''''b'");
    }

    #[test]
    fn hex_literal_renders_lowercase_pairs() {
        assert_eq!(hex_literal(&[0x00, 0xff, 0x1a]), "x'00ff1a'");
    }

    #[test]
    fn generated_values_match_type_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            let col = Column::random_new(ColumnId(0), &mut rng);
            let v = col.random_value_non_null(&mut rng);
            match col.tp {
                t if t.is_integer() => {
                    v.parse::<i64>().unwrap();
                }
                ColumnType::Blob => assert!(v.starts_with("x'") && v.ends_with('\'')),
                t if t.is_string() => assert!(v.starts_with('\'') && v.ends_with('\'')),
                ColumnType::Date | ColumnType::Datetime | ColumnType::Timestamp => {
                    assert!(v.starts_with('\'') && v.ends_with('\''))
                }
                _ => {}
            }
        }
    }

    #[test]
    fn ascending_values_are_sorted_and_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let col = Column {
            id: ColumnId(1),
            name: "c1".to_string(),
            tp: ColumnType::Int,
            len: 0,
            scale: 0,
            nullable: false,
            default_value: None,
            is_partition_key: false,
            members: Vec::new(),
        };
        let vals = col.random_values_asc(&mut rng, 6);
        assert_eq!(vals.len(), 6);
        let parsed: Vec<i64> = vals.iter().map(|v| v.parse().unwrap()).collect();
        let mut sorted = parsed.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(parsed, sorted);
    }

    #[test]
    fn nullable_columns_eventually_sample_null() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let col = Column {
            id: ColumnId(2),
            name: "c2".to_string(),
            tp: ColumnType::Int,
            len: 0,
            scale: 0,
            nullable: true,
            default_value: None,
            is_partition_key: false,
            members: Vec::new(),
        };
        let saw_null = (0..500).any(|_| col.random_value(&mut rng) == "NULL");
        assert!(saw_null);
    }
}
