//! Key values, group headers and the item contract.
//!
//! Sort and group levels never inspect items themselves. They go through a
//! key extractor that turns an item into a [`KeyValue`], or, when a level has
//! no extractor, through [`ViewItem::sort_value`].

use std::cmp::Ordering;
use std::fmt;

/// Display name of the header used for groups whose key is null.
pub const NULL_GROUP_NAME: &str = "Nulls";

/// A comparable, groupable key extracted from an item.
///
/// Ordering between keys is partial: values of the same kind order
/// naturally, `Int` and `Float` order numerically, and every other pairing
/// (including NaN) does not support ordering. `Null` is handled by the sort
/// level rather than by `KeyValue` itself.
///
/// Equality agrees with ordering for numbers: `Int(1)` and `Float(1.0)` are
/// the same key, so they tie when sorting and share a group. Mixed
/// comparisons are exact, even past 2^53 where `i64 as f64` rounds.
///
/// # Example
///
/// ```
/// use collection_view::view::KeyValue;
/// use std::cmp::Ordering;
///
/// assert_eq!(KeyValue::from(1).try_cmp(&KeyValue::from(2.5)), Some(Ordering::Less));
/// assert_eq!(KeyValue::from(1).try_cmp(&KeyValue::from("a")), None);
/// assert_eq!(KeyValue::from(1), KeyValue::from(1.0));
/// ```
#[derive(Debug, Clone, Default)]
pub enum KeyValue {
    /// No value.
    #[default]
    Null,
    /// Boolean key.
    Bool(bool),
    /// Integer key.
    Int(i64),
    /// Floating point key.
    Float(f64),
    /// Text key.
    Text(String),
}

impl KeyValue {
    /// Returns `true` if this is `KeyValue::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, KeyValue::Null)
    }

    /// Attempts to get the key as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            KeyValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to get the key as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            KeyValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the key as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            KeyValue::Float(n) => Some(*n),
            KeyValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Attempts to get the key as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            KeyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            KeyValue::Null => "null",
            KeyValue::Bool(_) => "bool",
            KeyValue::Int(_) => "int",
            KeyValue::Float(_) => "float",
            KeyValue::Text(_) => "text",
        }
    }

    /// Orders two non-null keys, or returns `None` if they do not support
    /// ordering against each other.
    pub fn try_cmp(&self, other: &KeyValue) -> Option<Ordering> {
        match (self, other) {
            (KeyValue::Bool(a), KeyValue::Bool(b)) => Some(a.cmp(b)),
            (KeyValue::Int(a), KeyValue::Int(b)) => Some(a.cmp(b)),
            (KeyValue::Float(a), KeyValue::Float(b)) => a.partial_cmp(b),
            (KeyValue::Int(a), KeyValue::Float(b)) => cmp_int_float(*a, *b),
            (KeyValue::Float(a), KeyValue::Int(b)) => cmp_int_float(*b, *a).map(Ordering::reverse),
            (KeyValue::Text(a), KeyValue::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub(crate) fn describe(&self) -> String {
        format!("{self:?}")
    }
}

/// Compares an integer with a float without rounding either one.
fn cmp_int_float(int: i64, float: f64) -> Option<Ordering> {
    // 2^63; every f64 in [-2^63, 2^63) truncates to a representable i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if float.is_nan() {
        return None;
    }
    if float >= LIMIT {
        return Some(Ordering::Less);
    }
    if float < -LIMIT {
        return Some(Ordering::Greater);
    }
    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(float - whole)),
        unequal => Some(unequal),
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KeyValue::Null, KeyValue::Null) => true,
            (KeyValue::Bool(a), KeyValue::Bool(b)) => a == b,
            (KeyValue::Int(a), KeyValue::Int(b)) => a == b,
            // NaN keys still land in one group.
            (KeyValue::Float(a), KeyValue::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (KeyValue::Text(a), KeyValue::Text(b)) => a == b,
            (KeyValue::Int(a), KeyValue::Float(b)) | (KeyValue::Float(b), KeyValue::Int(a)) => {
                cmp_int_float(*a, *b) == Some(Ordering::Equal)
            }
            _ => false,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Null => write!(f, "null"),
            KeyValue::Bool(b) => write!(f, "{b}"),
            KeyValue::Int(n) => write!(f, "{n}"),
            KeyValue::Float(n) => write!(f, "{n}"),
            KeyValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        KeyValue::Text(s)
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::Text(s.to_string())
    }
}

impl From<i64> for KeyValue {
    fn from(n: i64) -> Self {
        KeyValue::Int(n)
    }
}

impl From<i32> for KeyValue {
    fn from(n: i32) -> Self {
        KeyValue::Int(n as i64)
    }
}

impl From<u32> for KeyValue {
    fn from(n: u32) -> Self {
        KeyValue::Int(n as i64)
    }
}

impl From<f64> for KeyValue {
    fn from(n: f64) -> Self {
        KeyValue::Float(n)
    }
}

impl From<f32> for KeyValue {
    fn from(n: f32) -> Self {
        KeyValue::Float(n as f64)
    }
}

impl From<bool> for KeyValue {
    fn from(b: bool) -> Self {
        KeyValue::Bool(b)
    }
}

impl<V: Into<KeyValue>> From<Option<V>> for KeyValue {
    fn from(opt: Option<V>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => KeyValue::Null,
        }
    }
}

/// Contract for items held by a collection view.
///
/// Item equality (`PartialEq`) is what the view uses to locate an item it has
/// been told was removed or replaced. Wrap items in a newtype whose
/// `PartialEq` uses `Arc::ptr_eq` to get identity semantics instead.
///
/// `sort_value` is consulted by sort levels and group levels that have no
/// key extractor. The default returns `None`, meaning the item does not
/// support direct ordering; sorting such items by themselves is reported as
/// an error.
pub trait ViewItem: Clone + PartialEq + Send + Sync + 'static {
    /// The value this item sorts by when no key extractor is configured.
    fn sort_value(&self) -> Option<KeyValue> {
        None
    }
}

macro_rules! impl_view_item_via_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ViewItem for $ty {
                fn sort_value(&self) -> Option<KeyValue> {
                    Some(KeyValue::from(self.clone()))
                }
            }
        )*
    };
}

impl_view_item_via_from!(i32, i64, u32, f32, f64, bool, String, &'static str);

impl ViewItem for KeyValue {
    fn sort_value(&self) -> Option<KeyValue> {
        Some(self.clone())
    }
}

impl<T: ViewItem> ViewItem for Option<T> {
    fn sort_value(&self) -> Option<KeyValue> {
        match self {
            Some(inner) => inner.sort_value(),
            None => Some(KeyValue::Null),
        }
    }
}

/// Identifies a group at one grouping level.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupHeader {
    /// Sentinel header for items whose group key is null.
    Nulls,
    /// A non-null group key.
    Key(KeyValue),
}

impl GroupHeader {
    /// Maps a group key to its header; null keys map to [`GroupHeader::Nulls`].
    pub fn from_key(key: KeyValue) -> Self {
        if key.is_null() {
            GroupHeader::Nulls
        } else {
            GroupHeader::Key(key)
        }
    }

    /// Returns the key, or `None` for the null-key sentinel.
    pub fn key(&self) -> Option<&KeyValue> {
        match self {
            GroupHeader::Nulls => None,
            GroupHeader::Key(key) => Some(key),
        }
    }

    /// Returns `true` for the null-key sentinel.
    pub fn is_nulls(&self) -> bool {
        matches!(self, GroupHeader::Nulls)
    }
}

impl fmt::Display for GroupHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupHeader::Nulls => f.write_str(NULL_GROUP_NAME),
            GroupHeader::Key(key) => write!(f, "{key}"),
        }
    }
}

impl From<&str> for GroupHeader {
    fn from(s: &str) -> Self {
        GroupHeader::from_key(KeyValue::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_cmp_same_kind() {
        assert_eq!(KeyValue::from("a").try_cmp(&KeyValue::from("b")), Some(Ordering::Less));
        assert_eq!(KeyValue::from(3).try_cmp(&KeyValue::from(3)), Some(Ordering::Equal));
        assert_eq!(KeyValue::from(true).try_cmp(&KeyValue::from(false)), Some(Ordering::Greater));
    }

    #[test]
    fn test_try_cmp_mixed_numeric() {
        assert_eq!(KeyValue::from(2).try_cmp(&KeyValue::from(1.5)), Some(Ordering::Greater));
        assert_eq!(KeyValue::from(1.0).try_cmp(&KeyValue::from(1)), Some(Ordering::Equal));
    }

    #[test]
    fn test_try_cmp_unsupported() {
        assert_eq!(KeyValue::from(1).try_cmp(&KeyValue::from("1")), None);
        assert_eq!(KeyValue::from(f64::NAN).try_cmp(&KeyValue::from(1.0)), None);
        assert_eq!(KeyValue::Null.try_cmp(&KeyValue::Null), None);
    }

    #[test]
    fn test_nan_keys_are_equal() {
        assert_eq!(KeyValue::from(f64::NAN), KeyValue::from(f64::NAN));
        assert_ne!(KeyValue::from(1), KeyValue::from(f64::NAN));
    }

    #[test]
    fn test_mixed_numeric_equality_matches_ordering() {
        let pairs = [(1i64, 1.0f64), (1, 1.5), (-3, -3.0), (-3, -2.5), (0, -0.0)];
        for (int, float) in pairs {
            let (int, float) = (KeyValue::from(int), KeyValue::from(float));
            let tied = int.try_cmp(&float) == Some(Ordering::Equal);
            assert_eq!(int == float, tied, "{int:?} vs {float:?}");
            assert_eq!(float == int, tied, "{float:?} vs {int:?}");
        }
        assert_eq!(KeyValue::from(1), KeyValue::from(1.0));
    }

    #[test]
    fn test_mixed_numeric_compare_is_exact_past_2_pow_53() {
        let big = 1i64 << 53;
        // (2^53 + 1) as f64 rounds down to 2^53.
        let above = KeyValue::from(big + 1);
        let float = KeyValue::from(big as f64);
        assert_eq!(above.try_cmp(&float), Some(Ordering::Greater));
        assert_eq!(float.try_cmp(&above), Some(Ordering::Less));
        assert_ne!(above, float);
        assert_eq!(KeyValue::from(big), float);

        assert_eq!(
            KeyValue::from(i64::MAX).try_cmp(&KeyValue::from(i64::MAX as f64)),
            Some(Ordering::Less)
        );
        assert_eq!(
            KeyValue::from(i64::MIN).try_cmp(&KeyValue::from(i64::MIN as f64)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            KeyValue::from(i64::MIN).try_cmp(&KeyValue::from(f64::NEG_INFINITY)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_option_conversion() {
        assert!(KeyValue::from(None::<i32>).is_null());
        assert_eq!(KeyValue::from(Some("x")).as_str(), Some("x"));
        assert_eq!(Some(4).sort_value(), Some(KeyValue::Int(4)));
        assert_eq!(None::<i32>.sort_value(), Some(KeyValue::Null));
    }

    #[test]
    fn test_group_header_from_null_key() {
        let header = GroupHeader::from_key(KeyValue::Null);
        assert!(header.is_nulls());
        assert_eq!(header.to_string(), NULL_GROUP_NAME);
        assert_eq!(GroupHeader::from("a").key(), Some(&KeyValue::from("a")));
    }

    #[test]
    fn test_default_sort_value_is_none() {
        #[derive(Clone, PartialEq)]
        struct Opaque;
        impl ViewItem for Opaque {}

        assert!(Opaque.sort_value().is_none());
    }
}
