//! Document paths into nested item attributes

use crate::{AttributeValue, Item};

/// One step of a document path
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// Descend into a map (or the item itself) by attribute name
    Attribute(String),
    /// Descend into a list by position
    Index(usize),
}

/// A parsed document path such as `parent.children[0].#name`
///
/// Paths always start with an attribute segment. Resolution distinguishes a
/// missing step (`None`) from a stored null value; the two behave
/// differently in every expression context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentPath {
    segments: Vec<PathSegment>,
}

impl DocumentPath {
    pub(crate) fn new(segments: Vec<PathSegment>) -> Self {
        debug_assert!(matches!(
            segments.first(),
            Some(PathSegment::Attribute(_))
        ));
        Self { segments }
    }

    /// The path's segments, in order
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The top-level attribute the path descends from
    pub fn root(&self) -> &str {
        match self.segments.first() {
            Some(PathSegment::Attribute(name)) => name,
            _ => "",
        }
    }

    /// Whether the path is exactly one attribute deep
    pub fn is_top_level(&self) -> bool {
        self.segments.len() == 1
    }

    /// Walk the path through an item; `None` means the path is MISSING
    pub fn resolve<'a>(&self, item: &'a Item) -> Option<&'a AttributeValue> {
        let mut segments = self.segments.iter();
        let mut current = match segments.next()? {
            PathSegment::Attribute(name) => item.get(name)?,
            PathSegment::Index(_) => return None,
        };
        for segment in segments {
            current = match (current, segment) {
                (AttributeValue::M(map), PathSegment::Attribute(name)) => map.get(name)?,
                (AttributeValue::L(list), PathSegment::Index(idx)) => list.get(*idx)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Attribute(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn attr(name: &str) -> PathSegment {
        PathSegment::Attribute(name.to_owned())
    }

    fn nested_item() -> Item {
        let mut inner = HashMap::new();
        inner.insert("city".to_owned(), AttributeValue::S("Oslo".to_owned()));
        let mut item = Item::new();
        item.insert("address".to_owned(), AttributeValue::M(inner));
        item.insert(
            "tags".to_owned(),
            AttributeValue::L(vec![
                AttributeValue::S("a".to_owned()),
                AttributeValue::S("b".to_owned()),
            ]),
        );
        item.insert("gone".to_owned(), AttributeValue::Null(true));
        item
    }

    #[test]
    fn resolves_nested_maps_and_lists() {
        let item = nested_item();
        let path = DocumentPath::new(vec![attr("address"), attr("city")]);
        assert_eq!(
            path.resolve(&item),
            Some(&AttributeValue::S("Oslo".to_owned()))
        );

        let path = DocumentPath::new(vec![attr("tags"), PathSegment::Index(1)]);
        assert_eq!(path.resolve(&item), Some(&AttributeValue::S("b".to_owned())));
    }

    #[test]
    fn missing_is_distinct_from_null() {
        let item = nested_item();
        let null = DocumentPath::new(vec![attr("gone")]);
        assert_eq!(null.resolve(&item), Some(&AttributeValue::Null(true)));

        let missing = DocumentPath::new(vec![attr("absent")]);
        assert_eq!(missing.resolve(&item), None);
    }

    #[test]
    fn any_missing_step_resolves_to_missing() {
        let item = nested_item();
        for segments in [
            vec![attr("address"), attr("zip")],
            vec![attr("tags"), PathSegment::Index(9)],
            vec![attr("address"), PathSegment::Index(0)],
            vec![attr("tags"), attr("city")],
        ] {
            assert_eq!(DocumentPath::new(segments).resolve(&item), None);
        }
    }

    #[test]
    fn display_reconstructs_the_path() {
        let path = DocumentPath::new(vec![
            attr("a"),
            PathSegment::Index(0),
            attr("b"),
            PathSegment::Index(2),
        ]);
        assert_eq!(path.to_string(), "a[0].b[2]");
    }
}
