use std::collections::BTreeMap;
use glam::Vec3;
use crate::nearest::NearestIndex;

/// A user-placed seed for interactive segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Click {
    pub position: Vec3,
    pub obj_idx: u32,
    pub obj_name: String,
    pub time_idx: u32,
    pub is_positive: bool,
    pub cube_size: f32,
    nearest: Option<usize>,
}

impl Click {
    pub fn new(position: Vec3, obj_idx: u32, time_idx: u32, cube_size: f32) -> Self {
        Self {
            position,
            obj_idx,
            obj_name: Self::object_name(obj_idx),
            time_idx,
            is_positive: true,
            cube_size,
            nearest: None,
        }
    }

    pub fn object_name(obj_idx: u32) -> String {
        if obj_idx == 0 {
            "background".to_string()
        } else {
            format!("object_{obj_idx}")
        }
    }

    /// Snaps the click to the closest point of the cloud. The first lookup wins.
    pub fn attach_nearest(&mut self, index: &NearestIndex) -> Option<usize> {
        if self.nearest.is_none() {
            self.nearest = index.nearest(self.position).map(|(i, _)| i);
        }
        self.nearest
    }

    pub fn nearest(&self) -> Option<usize> {
        self.nearest
    }
}

/// Clicks of a single inference request.
#[derive(Debug, Clone, Default)]
pub struct ClickSet {
    clicks: Vec<Click>,
}

impl ClickSet {
    pub fn push(&mut self, click: Click) {
        self.clicks.push(click);
    }

    pub fn len(&self) -> usize {
        self.clicks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clicks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Click> {
        self.clicks.iter()
    }

    pub fn attach_nearest(&mut self, index: &NearestIndex) {
        for click in &mut self.clicks {
            click.attach_nearest(index);
        }
    }

    /// Clicks grouped by object, each group ordered by time index.
    pub fn by_object(&self) -> BTreeMap<u32, Vec<&Click>> {
        let mut groups: BTreeMap<u32, Vec<&Click>> = BTreeMap::new();
        for click in &self.clicks {
            groups.entry(click.obj_idx).or_default().push(click);
        }
        for group in groups.values_mut() {
            group.sort_by_key(|c| c.time_idx);
        }
        groups
    }

    pub fn into_vec(self) -> Vec<Click> {
        self.clicks
    }
}
