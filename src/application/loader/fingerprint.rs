//! Deterministic keys derived from loader parameters.
//!
//! A fingerprint is `"<loader>:<canonical json>"`. Object keys are sorted
//! before rendering so two values that differ only in map order produce the
//! same key, and `None` renders as `null` so an absent optional never collides
//! with a present zero.

use std::fmt;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::application::error::LoadError;

use super::registry::LoaderName;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of<P>(name: LoaderName, params: &P) -> Result<Self, LoadError>
    where
        P: Serialize + ?Sized,
    {
        let value = serde_json::to_value(params).map_err(|err| {
            LoadError::serialization(format!("fingerprint `{name}` params: {err}"))
        })?;
        let body = serde_json::to_string(&canonicalize(value)).map_err(|err| {
            LoadError::serialization(format!("fingerprint `{name}` render: {err}"))
        })?;
        Ok(Self(format!("{}:{body}", name.as_str())))
    }

    pub fn decode<P>(&self, name: LoaderName) -> Result<P, LoadError>
    where
        P: DeserializeOwned,
    {
        let body = self
            .0
            .strip_prefix(name.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| {
                LoadError::serialization(format!(
                    "fingerprint `{}` does not belong to loader `{name}`",
                    self.0
                ))
            })?;
        serde_json::from_str(body).map_err(|err| {
            LoadError::serialization(format!("fingerprint `{name}` decode: {err}"))
        })
    }

    /// Wrap an externally produced key without validating it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(left, _), (right, _)| left.cmp(right));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, canonicalize(value)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use serde::{Deserialize, Serializer, ser::Error as _};

    use super::*;
    use crate::application::error::ErrorKind;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        id: String,
        limit: Option<i64>,
    }

    struct Unrepresentable;

    impl Serialize for Unrepresentable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot reduce to primitives"))
        }
    }

    #[test]
    fn equal_params_produce_equal_fingerprints() {
        let a = Probe {
            id: "7".into(),
            limit: Some(3),
        };
        let b = Probe {
            id: "7".into(),
            limit: Some(3),
        };
        assert_eq!(
            Fingerprint::of(LoaderName::Article, &a).expect("a"),
            Fingerprint::of(LoaderName::Article, &b).expect("b")
        );
    }

    #[test]
    fn absent_optional_differs_from_zero() {
        let absent = Probe {
            id: "7".into(),
            limit: None,
        };
        let zero = Probe {
            id: "7".into(),
            limit: Some(0),
        };
        assert_ne!(
            Fingerprint::of(LoaderName::Article, &absent).expect("absent"),
            Fingerprint::of(LoaderName::Article, &zero).expect("zero")
        );
    }

    #[test]
    fn map_insertion_order_does_not_matter() {
        let mut first = HashMap::new();
        first.insert("zeta", 1);
        first.insert("alpha", 2);
        let mut second = BTreeMap::new();
        second.insert("alpha", 2);
        second.insert("zeta", 1);

        assert_eq!(
            Fingerprint::of(LoaderName::Categories, &first).expect("first"),
            Fingerprint::of(LoaderName::Categories, &second).expect("second")
        );
    }

    #[test]
    fn loader_name_is_part_of_the_key() {
        let params = Probe {
            id: "1".into(),
            limit: None,
        };
        let article = Fingerprint::of(LoaderName::Article, &params).expect("article");
        let section = Fingerprint::of(LoaderName::Section, &params).expect("section");
        assert_ne!(article, section);
        assert!(article.as_str().starts_with("article:"));
    }

    #[test]
    fn decode_reverses_encode() {
        let params = Probe {
            id: "33456710".into(),
            limit: Some(5),
        };
        let fingerprint = Fingerprint::of(LoaderName::Article, &params).expect("encode");
        let decoded: Probe = fingerprint.decode(LoaderName::Article).expect("decode");
        assert_eq!(decoded, params);
    }

    #[test]
    fn unrepresentable_params_fail_with_internal_serialization() {
        let err = Fingerprint::of(LoaderName::Article, &Unrepresentable).expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::InternalSerialization);
    }

    #[test]
    fn decode_rejects_foreign_or_malformed_keys() {
        let foreign = Fingerprint::from_raw("section:{\"id\":\"1\",\"limit\":null}");
        let err = foreign
            .decode::<Probe>(LoaderName::Article)
            .expect_err("wrong loader");
        assert_eq!(err.kind(), ErrorKind::InternalSerialization);

        let malformed = Fingerprint::from_raw("article:{not json");
        let err = malformed
            .decode::<Probe>(LoaderName::Article)
            .expect_err("malformed");
        assert_eq!(err.kind(), ErrorKind::InternalSerialization);
    }
}
