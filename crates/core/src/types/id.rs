//! Newtype keys for type-safe entity references.
//!
//! Use the `define_key!` macro to create string key wrappers that prevent
//! accidentally mixing keys from different entity types. Backends own the
//! format of every key, so no validation happens here.

/// Macro to define a type-safe string key wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use boutique_core::define_key;
/// define_key!(SessionId);
/// define_key!(Username);
///
/// let session = SessionId::new("3f0c");
/// let user = Username::new("alice");
///
/// // These are different types, so this won't compile:
/// // let _: SessionId = user;
/// assert_eq!(session.as_str(), "3f0c");
/// ```
#[macro_export]
macro_rules! define_key {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new key.
            #[must_use]
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// Get the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper, returning the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Returns `true` if the key is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Anonymous visitor session, minted by the frontend.
define_key!(SessionId);
// Authenticated user name, owned by the auth backend.
define_key!(Username);
define_key!(ProductId);
define_key!(OrderId);

impl SessionId {
    /// Mint a fresh random session id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_key_serializes_transparently() {
        let id = ProductId::new("OLJCESPC7Z");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"OLJCESPC7Z\"");

        let back: ProductId = serde_json::from_str("\"66VCHSJNUP\"").unwrap();
        assert_eq!(back.as_str(), "66VCHSJNUP");
    }

    #[test]
    fn test_key_display_and_conversions() {
        let user = Username::from("alice");
        assert_eq!(user.to_string(), "alice");
        assert_eq!(user.clone().into_inner(), "alice");
        assert!(!user.is_empty());
        assert!(SessionId::new(String::new()).is_empty());
    }

    #[test]
    fn test_generated_sessions_are_distinct_uuids() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
    }
}
