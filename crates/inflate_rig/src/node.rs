//! A minimal bone hierarchy, enough to find bones by name and scale them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigNode {
    pub name: String,
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub children: Vec<RigNode>,
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl RigNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale: unit_scale(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: RigNode) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first search of the descendants for `name`, ignoring case.
    pub fn find_child(&self, name: &str) -> Option<&RigNode> {
        self.find_path(name).map(|path| self.at(&path))
    }

    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut RigNode> {
        let path = self.find_path(name)?;
        Some(self.at_mut(&path))
    }

    /// Child indices leading from this node to the first descendant named
    /// `name` (case-insensitive), in depth-first order.
    pub fn find_path(&self, name: &str) -> Option<Vec<usize>> {
        for (i, child) in self.children.iter().enumerate() {
            if child.name.eq_ignore_ascii_case(name) {
                return Some(vec![i]);
            }
            if let Some(mut rest) = child.find_path(name) {
                rest.insert(0, i);
                return Some(rest);
            }
        }
        None
    }

    /// Node at a path produced by [`RigNode::find_path`].
    ///
    /// Panics if the path does not exist in this tree.
    pub fn at(&self, path: &[usize]) -> &RigNode {
        path.iter().fold(self, |node, &i| &node.children[i])
    }

    pub fn at_mut(&mut self, path: &[usize]) -> &mut RigNode {
        path.iter().fold(self, |node, &i| &mut node.children[i])
    }

    pub fn set_uniform_scale(&mut self, s: f32) {
        self.scale = [s, s, s];
    }
}
