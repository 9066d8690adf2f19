//! Binary tree of named values.

use std::any::Any;

use tessera_core::component::{CapabilitySet, Component, ComponentBox, ComponentHeader};
use tessera_core::host::HostApi;
use tessera_core::ids::CLID_TREENODE;
use tessera_core::stream::{Stream, StreamError};
use tessera_core::value::Value;

/// Node of a binary tree carrying a named value payload.
///
/// A node owns its payload and both subtrees; the root node stands in
/// for the whole tree. Finalization releases every owned payload in the
/// subtree through the host.
pub struct TreeNodeObj {
    header: ComponentHeader,
    name: String,
    node_id: String,
    value: Value,
    left: Option<Box<TreeNodeObj>>,
    right: Option<Box<TreeNodeObj>>,
}

impl TreeNodeObj {
    /// Creates an unnamed leaf with a void payload.
    pub fn new() -> Self {
        TreeNodeObj {
            header: ComponentHeader::new(CLID_TREENODE),
            name: String::new(),
            node_id: String::new(),
            value: Value::Void,
            left: None,
            right: None,
        }
    }

    /// Node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names the node.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Node identifier string.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Sets the node identifier string.
    pub fn set_node_id(&mut self, id: impl Into<String>) {
        self.node_id = id.into();
    }

    /// Payload.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replaces the payload, releasing the old one through `host`.
    pub fn set_value(&mut self, value: Value, host: &dyn HostApi) {
        let mut old = std::mem::replace(&mut self.value, value);
        old.unset(host);
    }

    /// Left subtree root.
    pub fn left(&self) -> Option<&TreeNodeObj> {
        self.left.as_deref()
    }

    /// Right subtree root.
    pub fn right(&self) -> Option<&TreeNodeObj> {
        self.right.as_deref()
    }

    /// Attaches a left subtree, returning the one it replaces.
    pub fn set_left(&mut self, node: Option<TreeNodeObj>) -> Option<TreeNodeObj> {
        std::mem::replace(&mut self.left, node.map(Box::new)).map(|n| *n)
    }

    /// Attaches a right subtree, returning the one it replaces.
    pub fn set_right(&mut self, node: Option<TreeNodeObj>) -> Option<TreeNodeObj> {
        std::mem::replace(&mut self.right, node.map(Box::new)).map(|n| *n)
    }

    /// Number of nodes in the subtree rooted here.
    pub fn node_count(&self) -> usize {
        1 + self.left.as_ref().map_or(0, |n| n.node_count())
            + self.right.as_ref().map_or(0, |n| n.node_count())
    }

    fn collect_in_order(&self, out: &mut Vec<Value>) {
        if let Some(left) = &self.left {
            left.collect_in_order(out);
        }
        out.push(self.value.clone_ref());
        if let Some(right) = &self.right {
            right.collect_in_order(out);
        }
    }

    fn same_shape(&self, other: &TreeNodeObj) -> bool {
        fn child_eq(a: &Option<Box<TreeNodeObj>>, b: &Option<Box<TreeNodeObj>>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a.same_shape(b),
                (None, None) => true,
                _ => false,
            }
        }
        self.name == other.name
            && self.node_id == other.node_id
            && self.value.eq_value(&other.value)
            && child_eq(&self.left, &other.left)
            && child_eq(&self.right, &other.right)
    }

    fn release_subtree(&mut self, host: &dyn HostApi) {
        self.value.unset(host);
        if let Some(mut left) = self.left.take() {
            left.release_subtree(host);
        }
        if let Some(mut right) = self.right.take() {
            right.release_subtree(host);
        }
    }

    fn write_subtree(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        stream.write_len_string(&self.name)?;
        stream.write_len_string(&self.node_id)?;
        self.value.serialize_into(stream)?;
        for child in [&self.left, &self.right] {
            match child {
                Some(node) => {
                    stream.write_u8(1)?;
                    node.write_subtree(stream)?;
                }
                None => stream.write_u8(0)?,
            }
        }
        Ok(())
    }

    fn read_subtree(
        stream: &mut dyn Stream,
        host: &dyn HostApi,
    ) -> Result<TreeNodeObj, StreamError> {
        let mut node = TreeNodeObj::new();
        node.name = stream.read_len_string(u32::MAX as usize)?;
        node.node_id = stream.read_len_string(u32::MAX as usize)?;
        node.value = Value::deserialize_from(stream, host)?;
        if stream.read_u8()? != 0 {
            node.left = Some(Box::new(TreeNodeObj::read_subtree(stream, host)?));
        }
        if stream.read_u8()? != 0 {
            node.right = Some(Box::new(TreeNodeObj::read_subtree(stream, host)?));
        }
        Ok(node)
    }
}

impl Default for TreeNodeObj {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for TreeNodeObj {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }

    fn class_name(&self) -> &str {
        "TreeNode"
    }

    fn parent_class_name(&self) -> Option<&str> {
        Some("Object")
    }

    fn spawn(&self) -> ComponentBox {
        let mut obj = TreeNodeObj::new();
        obj.header.set_class_id(self.header.class_id());
        Box::new(obj)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::ITERATOR | CapabilitySet::SERIALIZATION
    }

    fn equals(&self, other: &dyn Component) -> bool {
        other
            .as_any()
            .downcast_ref::<TreeNodeObj>()
            .is_some_and(|o| self.same_shape(o))
    }

    fn to_string_value(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn finalize(&mut self, host: &dyn HostApi) {
        self.release_subtree(host);
    }

    fn serialize_fields(&self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        self.write_subtree(stream)
    }

    fn deserialize_fields(
        &mut self,
        stream: &mut dyn Stream,
        host: &dyn HostApi,
    ) -> Result<(), StreamError> {
        let node = TreeNodeObj::read_subtree(stream, host)?;
        // Whatever this instance held is replaced wholesale.
        self.release_subtree(host);
        self.name = node.name;
        self.node_id = node.node_id;
        self.value = node.value;
        self.left = node.left;
        self.right = node.right;
        Ok(())
    }

    fn value_iter(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        let mut values = Vec::with_capacity(self.node_count());
        self.collect_in_order(&mut values);
        Some(Box::new(values.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, value: i32) -> TreeNodeObj {
        let mut node = TreeNodeObj::new();
        node.set_name(name);
        node.value = Value::Int(value);
        node
    }

    #[test]
    fn test_in_order_iteration() {
        let mut root = leaf("root", 2);
        root.set_left(Some(leaf("low", 1)));
        root.set_right(Some(leaf("high", 3)));
        assert_eq!(root.node_count(), 3);

        let values: Vec<i32> = root
            .value_iter()
            .into_iter()
            .flatten()
            .map(|v| v.get_i32())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_structural_equality() {
        let mut a = leaf("root", 2);
        a.set_left(Some(leaf("low", 1)));
        let mut b = leaf("root", 2);
        b.set_left(Some(leaf("low", 1)));
        assert!(a.equals(&b));

        b.set_right(Some(leaf("high", 3)));
        assert!(!a.equals(&b));
    }
}
