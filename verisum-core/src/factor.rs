use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One value a factor can take. Serializes as a plain JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactorLevel {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FactorLevel {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FactorLevel::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FactorLevel::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FactorLevel::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for FactorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorLevel::Bool(b) => write!(f, "{b}"),
            FactorLevel::Int(i) => write!(f, "{i}"),
            FactorLevel::Text(t) => write!(f, "{t}"),
        }
    }
}

impl From<bool> for FactorLevel {
    fn from(b: bool) -> Self {
        FactorLevel::Bool(b)
    }
}

impl From<i64> for FactorLevel {
    fn from(i: i64) -> Self {
        FactorLevel::Int(i)
    }
}

impl From<&str> for FactorLevel {
    fn from(t: &str) -> Self {
        FactorLevel::Text(t.to_string())
    }
}

/// One independent experimental variable with its declared list of levels.
/// Level order is preserved through design generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub levels: Vec<FactorLevel>,
}

impl Factor {
    pub fn new(name: impl Into<String>, levels: Vec<FactorLevel>) -> Self {
        Self {
            name: name.into(),
            levels,
        }
    }
}

/// One assignment of a level to every factor: one cell of the factorial
/// design. Entries keep the declared factor order; serialized as a map so a
/// trial row carries one column per factor.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    levels: Vec<(String, FactorLevel)>,
}

impl Condition {
    pub fn new(levels: Vec<(String, FactorLevel)>) -> Self {
        Self { levels }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level assigned to the named factor, if the factor is present
    pub fn level(&self, factor: &str) -> Option<&FactorLevel> {
        self.levels
            .iter()
            .find(|(name, _)| name == factor)
            .map(|(_, level)| level)
    }

    /// Boolean level of the named factor; `None` if absent or not boolean
    pub fn bool_level(&self, factor: &str) -> Option<bool> {
        self.level(factor).and_then(FactorLevel::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FactorLevel)> {
        self.levels
            .iter()
            .map(|(name, level)| (name.as_str(), level))
    }

    pub fn factor_names(&self) -> impl Iterator<Item = &str> {
        self.levels.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.levels.len()))?;
        for (name, level) in &self.levels {
            map.serialize_entry(name, level)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        struct ConditionVisitor;

        impl<'de> Visitor<'de> for ConditionVisitor {
            type Value = Condition;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of factor names to levels")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Condition, A::Error> {
                let mut levels = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, level)) = access.next_entry::<String, FactorLevel>()? {
                    levels.push((name, level));
                }
                Ok(Condition { levels })
            }
        }

        deserializer.deserialize_map(ConditionVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_serialize_as_plain_scalars() {
        assert_eq!(
            serde_json::to_string(&FactorLevel::Bool(true)).unwrap(),
            "true"
        );
        assert_eq!(serde_json::to_string(&FactorLevel::Int(3)).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&FactorLevel::from("A")).unwrap(),
            "\"A\""
        );
    }

    #[test]
    fn levels_deserialize_from_plain_scalars() {
        assert_eq!(
            serde_json::from_str::<FactorLevel>("false").unwrap(),
            FactorLevel::Bool(false)
        );
        assert_eq!(
            serde_json::from_str::<FactorLevel>("-2").unwrap(),
            FactorLevel::Int(-2)
        );
        assert_eq!(
            serde_json::from_str::<FactorLevel>("\"B\"").unwrap(),
            FactorLevel::from("B")
        );
    }

    #[test]
    fn condition_lookup_by_factor_name() {
        let condition = Condition::new(vec![
            ("stimulus".into(), FactorLevel::from("A")),
            ("sum_correct".into(), FactorLevel::Bool(true)),
        ]);
        assert_eq!(condition.level("stimulus"), Some(&FactorLevel::from("A")));
        assert_eq!(condition.bool_level("sum_correct"), Some(true));
        assert_eq!(condition.bool_level("stimulus"), None);
        assert_eq!(condition.level("missing"), None);
    }

    #[test]
    fn condition_round_trips_as_ordered_map() {
        let condition = Condition::new(vec![
            ("stimulus".into(), FactorLevel::from("A")),
            ("difficulty".into(), FactorLevel::Int(2)),
            ("sum_correct".into(), FactorLevel::Bool(false)),
        ]);
        let json = serde_json::to_string(&condition).unwrap();
        assert_eq!(
            json,
            "{\"stimulus\":\"A\",\"difficulty\":2,\"sum_correct\":false}"
        );
        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, condition);
    }
}
