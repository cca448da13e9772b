//! Macros for declaring identifier newtypes

/// Declare a string-backed identifier newtype.
///
/// The generated type serializes transparently as a JSON string and converts
/// from `String` and `&str`.
///
/// # Examples
///
/// ```rust
/// docfactory_registry::string_id! {
///     /// Identifier of an export job
///     pub struct ExportId;
/// }
///
/// let id = ExportId::from("export-1");
/// assert_eq!(id.as_ref(), "export-1");
/// assert_eq!(id.to_string(), "export-1");
/// ```
#[macro_export]
macro_rules! string_id {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub String);

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}
