use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use crate::error::{Result, SceneError};
use crate::npy;

/// Per-point object labels. `0` is background, every positive value names one object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mask {
    labels: Vec<u32>,
}

impl Mask {
    pub fn from_labels(labels: Vec<u32>) -> Self {
        Self { labels }
    }

    pub fn from_signed(labels: &[i64]) -> Result<Self> {
        labels
            .iter()
            .map(|&l| npy::signed_label(l))
            .collect::<Result<Vec<_>>>()
            .map(Self::from_labels)
    }

    pub fn zeros(len: usize) -> Self {
        Self { labels: vec![0; len] }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let is_npy = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("npy"));
        if !is_npy {
            return Err(SceneError::UnsupportedFormat(format!(
                "unsupported mask file format: {}",
                path.display()
            )));
        }
        Ok(Self::from_labels(npy::read_labels(path)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        npy::write_labels(path, &self.labels)
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn into_labels(self) -> Vec<u32> {
        self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn ensure_len(&self, points: usize) -> Result<()> {
        if self.labels.len() != points {
            return Err(SceneError::MaskLength {
                mask: self.labels.len(),
                points,
            });
        }
        Ok(())
    }

    /// Selects the points carrying `id`.
    pub fn object(&self, id: u32) -> ObjectMask {
        ObjectMask::from_bools(self.labels.iter().map(|&l| l == id).collect())
    }

    /// Distinct object ids present, background excluded, ascending.
    pub fn object_ids(&self) -> Vec<u32> {
        self.labels
            .iter()
            .copied()
            .filter(|&l| l > 0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of points assigned to any object.
    pub fn foreground_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l > 0).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMask {
    selected: Vec<bool>,
}

impl ObjectMask {
    pub fn from_bools(selected: Vec<bool>) -> Self {
        Self { selected }
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn count(&self) -> usize {
        self.selected.iter().filter(|&&s| s).count()
    }

    pub fn any(&self) -> bool {
        self.selected.contains(&true)
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ids_skip_background() {
        let mask = Mask::from_labels(vec![0, 3, 1, 3, 0, 1]);
        assert_eq!(mask.object_ids(), vec![1, 3]);
        assert_eq!(mask.foreground_count(), 4);
        assert!(Mask::zeros(4).object_ids().is_empty());
    }

    #[test]
    fn object_selects_matching_points() {
        let mask = Mask::from_labels(vec![0, 2, 2, 1]);
        let object = mask.object(2);
        assert_eq!(object.count(), 2);
        assert_eq!(object.indices().collect::<Vec<_>>(), vec![1, 2]);
        assert!(!mask.object(5).any());
    }

    #[test]
    fn length_is_validated() {
        let mask = Mask::zeros(3);
        assert!(mask.ensure_len(3).is_ok());
        assert!(matches!(
            mask.ensure_len(4),
            Err(SceneError::MaskLength { mask: 3, points: 4 })
        ));
    }

    #[test]
    fn signed_labels_must_be_non_negative() {
        assert_eq!(Mask::from_signed(&[0, 2]).unwrap().labels(), &[0, 2]);
        assert!(matches!(Mask::from_signed(&[1, -1]), Err(SceneError::NegativeLabel(-1))));
        let too_large = i64::from(u32::MAX) + 1;
        assert!(matches!(
            Mask::from_signed(&[too_large]),
            Err(SceneError::LabelOutOfRange(l)) if l == too_large as u64
        ));
    }

    #[test]
    fn saved_masks_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.npy");
        let mask = Mask::from_labels(vec![0, 1, 0, 4]);
        mask.save(&path).unwrap();
        assert_eq!(Mask::load(&path).unwrap(), mask);
    }

    #[test]
    fn only_npy_masks_are_loaded() {
        let result = Mask::load(Path::new("mask.txt"));
        assert!(matches!(result, Err(SceneError::UnsupportedFormat(_))));
    }
}
