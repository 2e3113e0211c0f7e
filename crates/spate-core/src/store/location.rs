//! Directory-location rollups.
//!
//! Every torrent contributes its size and a count of one to its own
//! directory node and to every ancestor, exactly once per torrent. The
//! tree is rebuilt bottom-up with children sorted by name so traversal
//! order is deterministic.

use std::collections::BTreeMap;

use serde::Serialize;

/// One node of the directory rollup tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationNode {
    /// Final path component; empty for the synthetic root.
    pub directory_name: String,
    /// Absolute path of this node; empty for the synthetic root.
    pub full_path: String,
    /// Torrents contained in this directory or any descendant.
    pub contained_count: u64,
    /// Total bytes of those torrents.
    pub contained_size: u64,
    /// Child directories, sorted by name.
    pub children: Vec<LocationNode>,
}

impl LocationNode {
    /// An empty rollup (no torrents known).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            directory_name: String::new(),
            full_path: String::new(),
            contained_count: 0,
            contained_size: 0,
            children: Vec::new(),
        }
    }
}

#[derive(Default)]
struct TrieNode {
    count: u64,
    size: u64,
    children: BTreeMap<String, TrieNode>,
}

/// Build the rollup tree from `(directory, size)` pairs, one per torrent.
pub(crate) fn build_tree<'a>(entries: impl Iterator<Item = (&'a str, u64)>) -> LocationNode {
    let mut root = TrieNode::default();
    for (directory, size) in entries {
        root.count += 1;
        root.size += size;
        let mut node = &mut root;
        for component in directory.split('/').filter(|part| !part.is_empty()) {
            node = node.children.entry(component.to_string()).or_default();
            node.count += 1;
            node.size += size;
        }
    }
    convert(String::new(), String::new(), root)
}

fn convert(name: String, path: String, node: TrieNode) -> LocationNode {
    let children = node
        .children
        .into_iter()
        .map(|(child_name, child)| {
            let child_path = format!("{path}/{child_name}");
            convert(child_name, child_path, child)
        })
        .collect();
    LocationNode {
        directory_name: name,
        full_path: path,
        contained_count: node.count,
        contained_size: node.size,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_accumulate_each_torrent_once() {
        let entries = vec![
            ("/data/downloads/movies", 100_u64),
            ("/data/downloads/movies", 200),
            ("/data/downloads/shows", 50),
            ("/data/other", 10),
        ];
        let tree = build_tree(entries.iter().map(|(dir, size)| (*dir, *size)));

        assert_eq!(tree.contained_count, 4);
        assert_eq!(tree.contained_size, 360);

        let data = &tree.children[0];
        assert_eq!(data.directory_name, "data");
        assert_eq!(data.full_path, "/data");
        assert_eq!(data.contained_count, 4);

        let downloads = data
            .children
            .iter()
            .find(|child| child.directory_name == "downloads")
            .expect("downloads node");
        assert_eq!(downloads.contained_count, 3);
        assert_eq!(downloads.contained_size, 350);

        let movies = &downloads.children[0];
        assert_eq!(movies.directory_name, "movies");
        assert_eq!(movies.contained_count, 2);
        assert_eq!(movies.contained_size, 300);
    }

    #[test]
    fn children_are_sorted_by_name() {
        let entries = vec![("/b", 1_u64), ("/a", 1), ("/c", 1)];
        let tree = build_tree(entries.iter().map(|(dir, size)| (*dir, *size)));
        let names: Vec<&str> = tree
            .children
            .iter()
            .map(|child| child.directory_name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
