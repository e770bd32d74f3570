//! Hierarchical resource addresses.

use std::fmt;

/// Path of a resource relative to the service root.
///
/// `ancestor` is where the resource is created, `own` is where it is read,
/// updated and deleted. Without a name both are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Address {
    ancestor: String,
    own: String,
}

impl Address {
    /// The service root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build an address from the parent chain, the type segment and the name.
    ///
    /// Each parent contributes its own `(segment, name)` pair, in order.
    pub fn new<'a, I>(parents: I, segment: Option<&str>, name: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (Option<&'a str>, Option<&'a str>)>,
    {
        parents
            .into_iter()
            .fold(Self::root(), |address, (segment, name)| {
                address.child(segment, name)
            })
            .child(segment, name)
    }

    /// Address of a resource nested under this one.
    #[must_use]
    pub fn child(&self, segment: Option<&str>, name: Option<&str>) -> Self {
        let mut ancestor = self.own.clone();
        if let Some(segment) = segment {
            ancestor.push('/');
            ancestor.push_str(&segment.to_lowercase());
        }
        let mut own = ancestor.clone();
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            own.push('/');
            own.push_str(&urlencoding::encode(name));
        }
        Self { ancestor, own }
    }

    /// Parent path plus type segment.
    pub fn ancestor(&self) -> &str {
        &self.ancestor
    }

    /// Full path of the resource itself.
    pub fn own(&self) -> &str {
        &self.own
    }

    /// A sub-path of the resource, such as `reload` or `install`.
    pub fn join(&self, sub: &str) -> String {
        format!("{}/{}", self.own, sub)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.own)
    }
}
