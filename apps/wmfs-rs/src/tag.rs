//! Per-screen virtual workspaces.

use tracing::warn;
use wmfs_rs_config::TagConfig;

use crate::layout::{Layout, LayoutParams, TileSide};

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub layout: Layout,
    pub params: LayoutParams,
}

impl Tag {
    pub fn from_config(config: &TagConfig) -> Self {
        let layout = Layout::from_name(&config.layout).unwrap_or_else(|| {
            warn!("Tag {:?}: unknown layout {:?}, using tile_left", config.name, config.layout);
            Layout::Tile(TileSide::Left)
        });
        let params = LayoutParams {
            nmaster: config.nmaster as usize,
            mirror: config.mirror,
            resizehint: config.resizehint,
            ..LayoutParams::default()
        }
        .with_mwfact(config.mwfact);
        Self { name: config.name.clone(), layout, params }
    }
}

/// The tags of one screen; exactly one is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct TagSet {
    tags: Vec<Tag>,
    selected: usize,
}

impl TagSet {
    /// Build from configuration; an empty list still yields one tag.
    pub fn from_config(configs: &[TagConfig]) -> Self {
        let mut tags: Vec<Tag> = configs.iter().map(Tag::from_config).collect();
        if tags.is_empty() {
            tags.push(Tag::from_config(&TagConfig { name: "1".into(), ..TagConfig::default() }));
        }
        Self { tags, selected: 0 }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn current(&self) -> &Tag {
        &self.tags[self.selected]
    }

    pub fn current_mut(&mut self) -> &mut Tag {
        &mut self.tags[self.selected]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    /// Returns false for an out-of-range index.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.tags.len() {
            return false;
        }
        self.selected = index;
        true
    }

    pub fn next_index(&self) -> usize {
        (self.selected + 1) % self.tags.len()
    }

    pub fn prev_index(&self) -> usize {
        (self.selected + self.tags.len() - 1) % self.tags.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(n: usize) -> Vec<TagConfig> {
        (1..=n).map(|i| TagConfig { name: i.to_string(), ..TagConfig::default() }).collect()
    }

    #[test]
    fn test_unknown_layout_falls_back() {
        let config = TagConfig { layout: "spiral".into(), ..TagConfig::default() };
        assert_eq!(Tag::from_config(&config).layout, Layout::Tile(TileSide::Left));
    }

    #[test]
    fn test_mwfact_is_clamped() {
        let config = TagConfig { mwfact: 0.99, ..TagConfig::default() };
        assert_eq!(Tag::from_config(&config).params.mwfact, 0.95);
    }

    #[test]
    fn test_cycle_wraps() {
        let mut set = TagSet::from_config(&tags(3));
        assert_eq!(set.prev_index(), 2);
        assert!(set.select(2));
        assert_eq!(set.next_index(), 0);
        assert!(!set.select(3));
        assert_eq!(set.selected(), 2);
    }

    #[test]
    fn test_empty_config_keeps_one_tag() {
        assert_eq!(TagSet::from_config(&[]).len(), 1);
    }
}
