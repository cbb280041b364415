//! Route key parsing.
//!
//! A route key is either `METHOD@/path` or a bare `/path`. Only the fixed
//! method set below is recognized as a prefix; anything else is treated as
//! part of the path and the route answers every method not claimed
//! explicitly.

use std::fmt;
use std::str::FromStr;

use axum::http::Method;

/// Methods that may prefix a route key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl RouteMethod {
    /// All recognized methods, in declaration order.
    pub const ALL: [RouteMethod; 7] = [
        RouteMethod::Get,
        RouteMethod::Head,
        RouteMethod::Post,
        RouteMethod::Put,
        RouteMethod::Delete,
        RouteMethod::Options,
        RouteMethod::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Head => "HEAD",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Delete => "DELETE",
            RouteMethod::Options => "OPTIONS",
            RouteMethod::Patch => "PATCH",
        }
    }

    /// Returns true if the request method is this method (exact, case-sensitive).
    pub fn matches(&self, method: &Method) -> bool {
        method.as_str() == self.as_str()
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RouteMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or(())
    }
}

/// The method side of a route key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodSlot {
    /// Catches every method not registered explicitly for the path.
    Any,
    Method(RouteMethod),
}

impl MethodSlot {
    pub fn method(&self) -> Option<RouteMethod> {
        match self {
            MethodSlot::Any => None,
            MethodSlot::Method(m) => Some(*m),
        }
    }
}

impl fmt::Display for MethodSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodSlot::Any => f.write_str("any"),
            MethodSlot::Method(m) => m.fmt(f),
        }
    }
}

/// A route key split into its method slot and path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteKey {
    pub slot: MethodSlot,
    pub path: String,
}

impl RouteKey {
    /// Split a key at the `@` that directly follows a recognized method.
    pub fn parse(key: &str) -> Self {
        for method in RouteMethod::ALL {
            if let Some(rest) = key
                .strip_prefix(method.as_str())
                .and_then(|r| r.strip_prefix('@'))
            {
                // `GET@` alone leaves no path; the whole key becomes the path.
                if !rest.is_empty() {
                    return Self {
                        slot: MethodSlot::Method(method),
                        path: rest.to_string(),
                    };
                }
            }
        }

        Self {
            slot: MethodSlot::Any,
            path: key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_method_prefix() {
        let key = RouteKey::parse("GET@/users/:id");
        assert_eq!(key.slot, MethodSlot::Method(RouteMethod::Get));
        assert_eq!(key.path, "/users/:id");

        let key = RouteKey::parse("PATCH@/items");
        assert_eq!(key.slot, MethodSlot::Method(RouteMethod::Patch));
    }

    #[test]
    fn bare_path_is_any() {
        let key = RouteKey::parse("/users/:id");
        assert_eq!(key.slot, MethodSlot::Any);
        assert_eq!(key.path, "/users/:id");
    }

    #[test]
    fn unknown_prefix_stays_in_path() {
        let key = RouteKey::parse("FETCH@/x");
        assert_eq!(key.slot, MethodSlot::Any);
        assert_eq!(key.path, "FETCH@/x");

        // Lowercase methods are not recognized.
        let key = RouteKey::parse("get@/x");
        assert_eq!(key.slot, MethodSlot::Any);
    }

    #[test]
    fn only_first_at_splits() {
        let key = RouteKey::parse("POST@/a@b");
        assert_eq!(key.slot, MethodSlot::Method(RouteMethod::Post));
        assert_eq!(key.path, "/a@b");
    }

    #[test]
    fn method_matching_is_exact() {
        assert!(RouteMethod::Get.matches(&Method::GET));
        assert!(!RouteMethod::Get.matches(&Method::HEAD));
        assert_eq!("DELETE".parse::<RouteMethod>(), Ok(RouteMethod::Delete));
        assert!("TRACE".parse::<RouteMethod>().is_err());
    }
}
