//! Reference resolution shared by the container and the section codecs.
//!
//! Section codecs never see the object list itself, only the two index
//! tables: the object count (the `Object` space) and the sub-reference
//! entries (the `SubReference` space). This keeps the object list free to be
//! borrowed mutably while each object is populated.

use super::index::{self, IndexSpace, ObjectId, NO_OBJECT};
use super::manifest::SubReference;
use super::section::SectionInfo;
use crate::util::{Error, Result};

/// Resolves reference values to objects and objects to reference values.
pub trait IndexTable {
    /// Number of objects in the `Object` index space.
    fn object_count(&self) -> usize;

    /// Entries of the `SubReference` index space.
    fn sub_references(&self) -> &[SubReference];

    /// Resolve a reference value.
    ///
    /// `NoObject` resolves to `None`; a slot outside its table is an error.
    fn get(&self, value: u32) -> Result<Option<ObjectId>> {
        match index::decode(value)? {
            (IndexSpace::Object, slot) if (slot as usize) < self.object_count() => {
                Ok(Some(ObjectId(slot as usize)))
            }
            (IndexSpace::SubReference, slot) => self
                .sub_references()
                .get(slot as usize)
                .map(|r| Some(r.object))
                .ok_or(Error::InvalidIndex(value)),
            (IndexSpace::NoObject, _) => Ok(None),
            (IndexSpace::Object, _) => Err(Error::InvalidIndex(value)),
        }
    }

    /// Reference value of `object` in the `Object` space.
    ///
    /// `None` encodes as the null reference.
    fn index_of(&self, object: Option<ObjectId>) -> Result<u32> {
        self.index_of_in(object, IndexSpace::Object)
    }

    /// Reference value of `object` in a specific space.
    ///
    /// For `SubReference`, the first entry targeting `object` is used.
    fn index_of_in(&self, object: Option<ObjectId>, space: IndexSpace) -> Result<u32> {
        let Some(id) = object else {
            return Ok(NO_OBJECT);
        };

        match space {
            IndexSpace::Object if id.0 < self.object_count() => {
                Ok(index::encode(IndexSpace::Object, id.0 as u32))
            }
            IndexSpace::Object => Err(Error::DanglingObject(id.0)),
            IndexSpace::SubReference => self
                .sub_references()
                .iter()
                .position(|r| r.object == id)
                .map(|slot| index::encode(IndexSpace::SubReference, slot as u32))
                .ok_or(Error::DanglingObject(id.0)),
            IndexSpace::NoObject => Ok(NO_OBJECT),
        }
    }
}

/// Read-only view over the two index tables.
#[derive(Debug, Clone, Copy)]
pub struct IndexView<'a> {
    object_count: usize,
    sub_references: &'a [SubReference],
}

impl<'a> IndexView<'a> {
    pub fn new(object_count: usize, sub_references: &'a [SubReference]) -> Self {
        Self { object_count, sub_references }
    }
}

impl IndexTable for IndexView<'_> {
    fn object_count(&self) -> usize {
        self.object_count
    }

    fn sub_references(&self) -> &[SubReference] {
        self.sub_references
    }
}

/// Context handed to a section codec while it is read.
#[derive(Debug, Clone, Copy)]
pub struct ReadContext<'a> {
    view: IndexView<'a>,
    section: SectionInfo,
}

impl<'a> ReadContext<'a> {
    pub fn new(view: IndexView<'a>, section: SectionInfo) -> Self {
        Self { view, section }
    }

    /// Placement record of the section being read.
    pub fn section(&self) -> &SectionInfo {
        &self.section
    }
}

impl IndexTable for ReadContext<'_> {
    fn object_count(&self) -> usize {
        self.view.object_count
    }

    fn sub_references(&self) -> &[SubReference] {
        self.view.sub_references
    }
}

/// Context handed to a section codec while it is written.
///
/// Besides resolving indices it lets the codec register sub-references,
/// which the container writes into the manifest table after all sections.
#[derive(Debug)]
pub struct WriteContext<'a> {
    object_count: usize,
    sub_references: &'a mut Vec<SubReference>,
    current: ObjectId,
}

impl<'a> WriteContext<'a> {
    pub fn new(object_count: usize, sub_references: &'a mut Vec<SubReference>, current: ObjectId) -> Self {
        Self { object_count, sub_references, current }
    }

    /// The object being written.
    pub fn current(&self) -> ObjectId {
        self.current
    }

    /// Register a pointer to byte `offset` of `object`'s payload and return
    /// its `SubReference` index.
    pub fn add_reference(&mut self, object: ObjectId, offset: u32) -> Result<u32> {
        push_reference(self.sub_references, self.object_count, object, offset)
    }
}

impl IndexTable for WriteContext<'_> {
    fn object_count(&self) -> usize {
        self.object_count
    }

    fn sub_references(&self) -> &[SubReference] {
        self.sub_references
    }
}

/// Append a sub-reference entry and return its encoded index.
pub(crate) fn push_reference(
    references: &mut Vec<SubReference>,
    object_count: usize,
    object: ObjectId,
    offset: u32,
) -> Result<u32> {
    if object.0 >= object_count {
        return Err(Error::DanglingObject(object.0));
    }
    references.push(SubReference { object, offset });
    Ok(index::encode(IndexSpace::SubReference, (references.len() - 1) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get() {
        let refs = [SubReference { object: ObjectId(2), offset: 16 }];
        let view = IndexView::new(3, &refs);

        assert_eq!(view.get(0).unwrap(), Some(ObjectId(0)));
        assert_eq!(view.get(2).unwrap(), Some(ObjectId(2)));
        assert_eq!(view.get(NO_OBJECT).unwrap(), None);
        assert_eq!(view.get(0x0080_0000).unwrap(), Some(ObjectId(2)));

        assert!(matches!(view.get(3), Err(Error::InvalidIndex(3))));
        assert!(matches!(view.get(0x0080_0001), Err(Error::InvalidIndex(_))));
        assert!(view.get(0xFFFF_FFFF).is_err());
    }

    #[test]
    fn test_index_of() {
        let refs = [
            SubReference { object: ObjectId(1), offset: 0 },
            SubReference { object: ObjectId(0), offset: 8 },
        ];
        let view = IndexView::new(2, &refs);

        assert_eq!(view.index_of(None).unwrap(), NO_OBJECT);
        assert_eq!(view.index_of(Some(ObjectId(1))).unwrap(), 1);
        assert!(matches!(view.index_of(Some(ObjectId(2))), Err(Error::DanglingObject(2))));
        assert_eq!(
            view.index_of_in(Some(ObjectId(0)), IndexSpace::SubReference).unwrap(),
            0x0080_0001
        );
        assert_eq!(view.index_of_in(Some(ObjectId(0)), IndexSpace::NoObject).unwrap(), NO_OBJECT);
    }

    #[test]
    fn test_add_reference() {
        let mut refs = Vec::new();
        let mut ctx = WriteContext::new(2, &mut refs, ObjectId(1));

        let first = ctx.add_reference(ctx.current(), 16).unwrap();
        let second = ctx.add_reference(ObjectId(0), 4).unwrap();
        assert_eq!(first, 0x0080_0000);
        assert_eq!(second, 0x0080_0001);
        assert_eq!(ctx.get(first).unwrap(), Some(ObjectId(1)));
        assert!(ctx.add_reference(ObjectId(5), 0).is_err());

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0], SubReference { object: ObjectId(1), offset: 16 });
    }
}
