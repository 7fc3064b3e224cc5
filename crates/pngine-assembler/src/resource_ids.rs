use std::collections::HashMap;

use pngine_analyzer::Namespace;
use pngine_parser::NodeIndex;

/// Assigns dense per-namespace `u16` ids to macro nodes, in first-seen
/// order. Ids are only meaningful within a namespace: a `Buffer` id 0 and a
/// `Texture` id 0 are unrelated resources.
#[derive(Debug, Default)]
pub struct ResourceIds {
    tables: HashMap<Namespace, HashMap<NodeIndex, u16>>,
}

impl ResourceIds {
    pub fn assign(&mut self, namespace: Namespace, node: NodeIndex) -> u16 {
        let table = self.tables.entry(namespace).or_default();
        let next = table.len() as u16;
        *table.entry(node).or_insert(next)
    }

    pub fn get(&self, namespace: Namespace, node: NodeIndex) -> Option<u16> {
        self.tables.get(&namespace)?.get(&node).copied()
    }
}
