use std::fmt::{self, Display};

/// Canonical key for a full argument tuple.
///
/// Every element is rendered through `Display` and written as `<byte length>:<text>`, elements
/// joined by `|`. The length prefix keeps the encoding injective even when an element itself
/// contains the separator, so two tuples share a key only if they render identically element
/// by element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub const SEPARATOR: char = '|';

    pub fn encode<T: Display>(args: &[T]) -> Self {
        let mut key = String::new();
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                key.push(Self::SEPARATOR);
            }
            let text = arg.to_string();
            key.push_str(&text.len().to_string());
            key.push(':');
            key.push_str(&text);
        }
        CacheKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
