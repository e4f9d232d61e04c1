//! Service identity carried by call sites.

use std::any::TypeId;
use std::fmt;

/// Identifies the service a call site produces.
///
/// Call sites never look services up by key; the key is carried so that
/// diagnostics, observers and graph exports can name what each node of a
/// plan builds.
///
/// # Examples
///
/// ```rust
/// use ferrous_callsite::{Key, key_of_type, key_of_trait};
///
/// struct Database;
/// trait Logger {}
///
/// let db = key_of_type::<Database>();
/// assert!(db.display_name().ends_with("Database"));
/// assert_eq!(db.service_name(), None);
///
/// let logger = key_of_trait::<dyn Logger>();
/// assert!(logger.display_name().contains("Logger"));
///
/// let port = Key::TypeNamed(std::any::TypeId::of::<u16>(), "u16", "port");
/// assert_eq!(port.service_name(), Some("port"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Concrete type with its TypeId and name for diagnostics
    Type(TypeId, &'static str),
    /// Trait binding, identified by the trait object's type name
    Trait(&'static str),
    /// Named concrete type: TypeId, type name, service name
    TypeNamed(TypeId, &'static str, &'static str),
    /// Named trait binding: trait name, service name
    TraitNamed(&'static str, &'static str),
}

impl Key {
    /// Returns the type or trait name, as produced by `std::any::type_name`.
    pub fn display_name(&self) -> &'static str {
        match self {
            Key::Type(_, name) => name,
            Key::Trait(name) => name,
            Key::TypeNamed(_, name, _) => name,
            Key::TraitNamed(name, _) => name,
        }
    }

    /// Returns the service name for named registrations.
    pub fn service_name(&self) -> Option<&'static str> {
        match self {
            Key::TypeNamed(_, _, name) | Key::TraitNamed(_, name) => Some(*name),
            Key::Type(..) | Key::Trait(_) => None,
        }
    }

    /// Returns the TypeId for concrete type keys.
    pub fn concrete_type_id(&self) -> Option<TypeId> {
        match self {
            Key::Type(id, _) | Key::TypeNamed(id, _, _) => Some(*id),
            Key::Trait(_) | Key::TraitNamed(..) => None,
        }
    }

    /// Short form of the display name with module paths stripped.
    ///
    /// `alloc::vec::Vec<my_app::User>` becomes `Vec<User>`. Used for compact
    /// graph labels.
    pub fn short_name(&self) -> String {
        let name = self.display_name();
        let mut out = String::with_capacity(name.len());
        let mut segment = String::new();
        for ch in name.chars() {
            match ch {
                '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                    out.push_str(last_path_segment(&segment));
                    segment.clear();
                    out.push(ch);
                }
                _ => segment.push(ch),
            }
        }
        out.push_str(last_path_segment(&segment));
        out
    }
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.service_name() {
            Some(name) => write!(f, "{}[{}]", self.display_name(), name),
            None => f.write_str(self.display_name()),
        }
    }
}

/// Key for a concrete type.
pub fn key_of_type<T: 'static + ?Sized>() -> Key {
    Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
}

/// Key for a trait object type such as `dyn Logger`.
pub fn key_of_trait<T: ?Sized + 'static>() -> Key {
    Key::Trait(std::any::type_name::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Repository;

    #[test]
    fn test_type_key() {
        let key = key_of_type::<Repository>();
        assert_eq!(key.concrete_type_id(), Some(TypeId::of::<Repository>()));
        assert!(key.display_name().ends_with("Repository"));
        assert_eq!(key.service_name(), None);
    }

    #[test]
    fn test_named_keys() {
        let key = Key::TraitNamed("dyn Cache", "redis");
        assert_eq!(key.service_name(), Some("redis"));
        assert_eq!(key.concrete_type_id(), None);
        assert_eq!(key.to_string(), "dyn Cache[redis]");
    }

    #[test]
    fn test_short_name_strips_paths() {
        let key = Key::Type(TypeId::of::<u8>(), "alloc::vec::Vec<my_app::model::User>");
        assert_eq!(key.short_name(), "Vec<User>");

        let key = Key::Trait("dyn my_app::Logger");
        assert_eq!(key.short_name(), "dyn Logger");
    }
}
