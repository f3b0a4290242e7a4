use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One field of a partial update.
///
/// `Absent` leaves the stored value alone, `Null` clears it, `Value` replaces it.
/// Use with `#[serde(default)]` so a missing key deserializes to `Absent`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)),
        }
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Patch<U>, E> {
        Ok(match self {
            Patch::Absent => Patch::Absent,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)?),
        })
    }

    /// Apply onto a nullable field.
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Null => *target = None,
            Patch::Value(v) => *target = Some(v),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            None => Patch::Null,
            Some(v) => Patch::Value(v),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Into::into)
    }
}

/// `Value` serializes as the value, `Absent` and `Null` both as `null`.
impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Value(v) => serializer.serialize_some(v),
            Patch::Absent | Patch::Null => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default)]
        name: Patch<String>,
    }

    #[test]
    fn distinguishes_absent_null_and_value() {
        let b: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(b.name, Patch::Absent);
        let b: Body = serde_json::from_str(r#"{"name":null}"#).unwrap();
        assert_eq!(b.name, Patch::Null);
        let b: Body = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(b.name, Patch::Value("x".to_string()));
    }

    #[test]
    fn serializes_as_nullable_value() {
        assert_eq!(
            serde_json::to_value(Patch::Value("x")).unwrap(),
            serde_json::json!("x")
        );
        assert_eq!(
            serde_json::to_value(Patch::<String>::Null).unwrap(),
            serde_json::Value::Null
        );
        assert_eq!(
            serde_json::to_value(Patch::<String>::Absent).unwrap(),
            serde_json::Value::Null
        );
    }

    #[test]
    fn apply_to_follows_variant() {
        let mut field = Some(1);
        Patch::Absent.apply_to(&mut field);
        assert_eq!(field, Some(1));
        Patch::Value(2).apply_to(&mut field);
        assert_eq!(field, Some(2));
        Patch::Null.apply_to(&mut field);
        assert_eq!(field, None);
    }

    #[test]
    fn try_map_short_circuits() {
        let p: Patch<&str> = Patch::Value("x");
        let r: Result<Patch<u8>, &str> = p.try_map(|_| Err("bad"));
        assert_eq!(r, Err("bad"));
        let p: Patch<&str> = Patch::Null;
        assert_eq!(p.try_map(|_| Err::<u8, _>("bad")), Ok(Patch::Null));
    }
}
