//! Property paths connecting one resource type to another

use std::fmt;

use crate::model::Iri;

/// A directed relation between two resources, possibly composite.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    /// A single predicate followed forward.
    Predicate(Iri),
    /// The wrapped path followed backward.
    Inverse(Box<PropertyPath>),
    /// Paths followed one after the other.
    Sequence(Vec<PropertyPath>),
    /// Any one of the paths.
    Alternative(Vec<PropertyPath>),
}

impl PropertyPath {
    pub fn predicate(iri: impl Into<Iri>) -> Self {
        PropertyPath::Predicate(iri.into())
    }

    /// `^iri`
    pub fn inverse_of(iri: impl Into<Iri>) -> Self {
        PropertyPath::Inverse(Box::new(PropertyPath::Predicate(iri.into())))
    }

    /// Build a sequence, flattening nested sequences. A single part is
    /// returned unchanged.
    pub fn sequence(parts: impl IntoIterator<Item = PropertyPath>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                PropertyPath::Sequence(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            PropertyPath::Sequence(flat)
        }
    }

    /// Build an alternative, flattening nested alternatives and dropping
    /// duplicates. A single part is returned unchanged.
    pub fn alternative(parts: impl IntoIterator<Item = PropertyPath>) -> Self {
        let mut flat: Vec<PropertyPath> = Vec::new();
        for part in parts {
            let inner = match part {
                PropertyPath::Alternative(inner) => inner,
                other => vec![other],
            };
            for path in inner {
                if !flat.contains(&path) {
                    flat.push(path);
                }
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            PropertyPath::Alternative(flat)
        }
    }

    /// `self/next`
    pub fn then(self, next: PropertyPath) -> Self {
        PropertyPath::sequence([self, next])
    }

    /// The same relation walked in the opposite direction.
    pub fn inverse(&self) -> Self {
        match self {
            PropertyPath::Predicate(_) => PropertyPath::Inverse(Box::new(self.clone())),
            PropertyPath::Inverse(inner) => (**inner).clone(),
            PropertyPath::Sequence(parts) => {
                PropertyPath::Sequence(parts.iter().rev().map(PropertyPath::inverse).collect())
            }
            PropertyPath::Alternative(parts) => {
                PropertyPath::Alternative(parts.iter().map(PropertyPath::inverse).collect())
            }
        }
    }

    /// True when the path contains no predicate at all.
    pub fn is_empty(&self) -> bool {
        match self {
            PropertyPath::Predicate(_) => false,
            PropertyPath::Inverse(inner) => inner.is_empty(),
            PropertyPath::Sequence(parts) | PropertyPath::Alternative(parts) => {
                parts.iter().all(PropertyPath::is_empty)
            }
        }
    }

    /// Every predicate mentioned anywhere in the path.
    pub fn predicates(&self) -> Vec<&Iri> {
        let mut found = Vec::new();
        self.collect_predicates(&mut found);
        found
    }

    fn collect_predicates<'a>(&'a self, found: &mut Vec<&'a Iri>) {
        match self {
            PropertyPath::Predicate(iri) => found.push(iri),
            PropertyPath::Inverse(inner) => inner.collect_predicates(found),
            PropertyPath::Sequence(parts) | PropertyPath::Alternative(parts) => {
                for part in parts {
                    part.collect_predicates(found);
                }
            }
        }
    }
}

/// SPARQL 1.1 property path syntax.
impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyPath::Predicate(iri) => write!(f, "<{}>", iri),
            PropertyPath::Inverse(inner) => match inner.as_ref() {
                PropertyPath::Predicate(iri) => write!(f, "^<{}>", iri),
                other => write!(f, "^({})", other),
            },
            PropertyPath::Sequence(parts) => {
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        f.write_str("/")?;
                    }
                    match part {
                        PropertyPath::Alternative(_) => write!(f, "({})", part)?,
                        _ => write!(f, "{}", part)?,
                    }
                }
                Ok(())
            }
            PropertyPath::Alternative(parts) => {
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
        }
    }
}
