//! Abstract hierarchical key-value tree
//!
//! A node has a name, an ordered multimap of string values and an ordered
//! list of child nodes whose names act as tags. The concrete text encoding is
//! somebody else's job; the crate only builds and reads this tree.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<ConfigNode>,
}

impl ConfigNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Append a value, keeping any existing ones with the same key
    pub fn add_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.push((key.into(), value.into()));
    }

    /// Replace the first value with this key, or append it
    pub fn set_value(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((key.to_string(), value)),
        }
    }

    /// First value stored under `key`
    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.values
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_value(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    pub fn remove_values(&mut self, key: &str) -> usize {
        let before = self.values.len();
        self.values.retain(|(k, _)| k != key);
        before - self.values.len()
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    pub fn add_node(&mut self, node: ConfigNode) -> &mut ConfigNode {
        self.nodes.push(node);
        let last = self.nodes.len() - 1;
        &mut self.nodes[last]
    }

    /// Children with the given tag, in insertion order
    pub fn get_nodes<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a ConfigNode> + 'a {
        self.nodes.iter().filter(move |n| n.name == tag)
    }

    pub fn get_node(&self, tag: &str) -> Option<&ConfigNode> {
        self.nodes.iter().find(|n| n.name == tag)
    }

    pub fn nodes(&self) -> &[ConfigNode] {
        &self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_an_ordered_multimap() {
        let mut node = ConfigNode::new("ROOT");
        node.add_value("key", "a");
        node.add_value("key", "b");
        node.add_value("other", "c");

        assert_eq!(node.get_value("key"), Some("a"));
        assert_eq!(node.get_values("key").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(node.get_value("missing"), None);

        node.set_value("key", "z");
        assert_eq!(node.get_values("key").collect::<Vec<_>>(), vec!["z", "b"]);

        assert_eq!(node.remove_values("key"), 2);
        assert!(!node.has_value("key"));
        assert!(node.has_value("other"));
    }

    #[test]
    fn test_children_grouped_by_tag() {
        let mut root = ConfigNode::new("ROOT");
        root.add_node(ConfigNode::new("POI")).add_value("n", "1");
        root.add_node(ConfigNode::new("OTHER"));
        root.add_node(ConfigNode::new("POI")).add_value("n", "2");

        let pois: Vec<_> = root.get_nodes("POI").map(|n| n.get_value("n").unwrap()).collect();
        assert_eq!(pois, vec!["1", "2"]);
        assert!(root.get_node("OTHER").is_some());
        assert!(root.get_node("NOPE").is_none());
        assert_eq!(root.nodes().len(), 3);
    }

    #[test]
    fn test_json_round_trip() {
        let mut root = ConfigNode::new("ROOT");
        root.add_value("a", "1");
        root.add_node(ConfigNode::new("CHILD")).add_value("b", "2");
        let json = serde_json::to_string(&root).unwrap();
        let back: ConfigNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, root);
    }
}
