//! 明細選取集合

use std::collections::HashSet;

/// 明細選取集合
///
/// 永遠是工單目前明細ID的子集；不存在的ID無法加入。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    selected: HashSet<String>,
}

impl SelectionSet {
    /// 創建空集合
    pub fn new() -> Self {
        Self {
            selected: HashSet::new(),
        }
    }

    /// 全選
    pub fn all<'a, I>(ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            selected: ids.into_iter().map(str::to_string).collect(),
        }
    }

    /// 由已存選取還原，丟棄已不存在的ID
    pub fn restore<'a, I>(stored: &[String], current: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let current: HashSet<&str> = current.into_iter().collect();
        Self {
            selected: stored
                .iter()
                .filter(|id| current.contains(id.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// 切換選取狀態，回傳切換後是否選取
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        }
    }

    /// 檢查是否選取
    pub fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// 依明細順序列出已選取ID（寫入文件庫用）
    pub fn ordered_ids<'a, I>(&self, order: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        order
            .into_iter()
            .filter(|id| self.selected.contains(*id))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_membership() {
        let mut selection = SelectionSet::new();

        assert!(selection.toggle("S1"));
        assert!(selection.contains("S1"));
        assert!(!selection.toggle("S1"));
        assert!(!selection.contains("S1"));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_restore_drops_unknown_ids() {
        let stored = vec!["P1".to_string(), "GONE".to_string()];
        let selection = SelectionSet::restore(&stored, ["P1", "P2"]);

        assert!(selection.contains("P1"));
        assert!(!selection.contains("GONE"));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_ordered_ids_follow_line_order() {
        let selection = SelectionSet::all(["S3", "S1"]);
        assert_eq!(selection.ordered_ids(["S1", "S2", "S3"]), vec!["S1", "S3"]);
    }
}
