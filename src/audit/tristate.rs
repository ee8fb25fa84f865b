// src/audit/tristate.rs
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A value that can be missing from the source, explicitly empty, or set.
///
/// `Absent` means the document never mentioned the field (row or column
/// missing). `Null` means the document stated there is no value, e.g. a
/// position cell reading "Not ranked". Collapsing the two would turn
/// "not tracked" into "unranked".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tristate<T> {
    Absent,
    Null,
    Present(T),
}

impl<T> Default for Tristate<T> {
    fn default() -> Self {
        Tristate::Absent
    }
}

impl<T> Tristate<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Tristate::Absent)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Tristate::Present(_))
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Tristate::Present(value) => Some(value),
            _ => None,
        }
    }

}

impl<T: Copy> Tristate<T> {
    pub fn value(&self) -> Option<T> {
        self.as_option().copied()
    }
}

// Absent fields are skipped by the containing struct (`skip_serializing_if`),
// so only Null and Present ever reach the serializer.
impl<T: Serialize> Serialize for Tristate<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Tristate::Present(value) => serializer.serialize_some(value),
            Tristate::Absent | Tristate::Null => serializer.serialize_none(),
        }
    }
}

// Pair with `#[serde(default)]` so a missing key comes back as Absent.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Tristate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Tristate::Present(value),
            None => Tristate::Null,
        })
    }
}
