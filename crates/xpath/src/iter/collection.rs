use super::{NameTest, NodeIterator, StepTest};
use crate::error::XPathError;
use crate::pointer::{ElementIndex, NodePointer};

/// Children (or attributes) of every element of a collection, in element
/// order. The list is collected on first use.
pub(crate) struct CollectionChildIterator {
    pointers: Vec<NodePointer>,
    position: usize,
}

impl CollectionChildIterator {
    pub(crate) fn children(
        collection: &NodePointer,
        test: &StepTest,
        reverse: bool,
        start_with: Option<&NodePointer>,
    ) -> Result<Self, XPathError> {
        Self::collect(collection, |element| element.child_iterator(test, reverse, start_with))
    }

    pub(crate) fn attributes(collection: &NodePointer, name: &NameTest) -> Result<Self, XPathError> {
        Self::collect(collection, |element| element.attribute_iterator(name))
    }

    fn collect<F>(collection: &NodePointer, mut iterator_for: F) -> Result<Self, XPathError>
    where
        F: FnMut(&NodePointer) -> Result<Option<Box<dyn NodeIterator>>, XPathError>,
    {
        let mut pointers = Vec::new();
        let mut element = collection.fresh();
        for i in 0..collection.length() {
            element.set_index(ElementIndex::At(i));
            let value = element.value_pointer()?;
            let Some(mut children) = iterator_for(&value)? else {
                continue;
            };
            let mut position = 1;
            while children.set_position(position)? {
                if let Some(pointer) = children.node_pointer()? {
                    pointers.push(pointer);
                }
                position += 1;
            }
        }
        Ok(Self { pointers, position: 0 })
    }
}

impl NodeIterator for CollectionChildIterator {
    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) -> Result<bool, XPathError> {
        self.position = position;
        Ok(position >= 1 && position <= self.pointers.len())
    }

    fn node_pointer(&mut self) -> Result<Option<NodePointer>, XPathError> {
        Ok(self.pointers.get(self.position.max(1) - 1).cloned())
    }
}
