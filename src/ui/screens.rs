use crate::models::Record;

/// A loaded table plus the filter and selection the user applied to it. The
/// filtered view stores indices into `items` so reloads never clone rows.
pub(crate) struct RecordList<T> {
    pub(crate) items: Vec<T>,
    pub(crate) visible: Vec<usize>,
    pub(crate) filter: Option<String>,
    pub(crate) selected: usize,
}

impl<T: Record> RecordList<T> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        let mut list = Self {
            items,
            visible: Vec::new(),
            filter: None,
            selected: 0,
        };
        list.apply_filter();
        list
    }

    fn apply_filter(&mut self) {
        let needle = self
            .filter
            .as_ref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        self.visible = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| needle.as_ref().map_or(true, |q| item.matches(q)))
            .map(|(idx, _)| idx)
            .collect();

        self.ensure_in_bounds();
    }

    fn ensure_in_bounds(&mut self) {
        if self.visible.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.visible.len() {
            self.selected = self.visible.len() - 1;
        }
    }

    /// Replace the rows after a reload, keeping the cursor on `focus_id` when
    /// it is still visible.
    pub(crate) fn set_items(&mut self, items: Vec<T>, focus_id: Option<i64>) {
        let previous = focus_id.or_else(|| self.current().map(Record::id));
        self.items = items;
        self.apply_filter();
        if let Some(id) = previous {
            self.focus(id);
        }
    }

    pub(crate) fn current(&self) -> Option<&T> {
        self.visible
            .get(self.selected)
            .and_then(|&idx| self.items.get(idx))
    }

    pub(crate) fn visible_items(&self) -> impl Iterator<Item = &T> {
        self.visible.iter().filter_map(|&idx| self.items.get(idx))
    }

    pub(crate) fn has_filter(&self) -> bool {
        self.filter
            .as_ref()
            .map(|q| !q.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Navigation shared by every list screen, object safe so the app can drive
/// whichever tab is active without matching on its row type.
pub(crate) trait ListNav {
    fn move_selection(&mut self, offset: isize);
    fn select_first(&mut self);
    fn select_last(&mut self);
    fn set_filter(&mut self, filter: Option<String>);
    fn current_id(&self) -> Option<i64>;
    /// Select the row with `id`, clearing the filter if it hides that row.
    fn focus(&mut self, id: i64) -> bool;
    fn len(&self) -> usize;
}

impl<T: Record> ListNav for RecordList<T> {
    fn move_selection(&mut self, offset: isize) {
        if self.visible.is_empty() {
            return;
        }
        let len = self.visible.len() as isize;
        let new = (self.selected as isize + offset).clamp(0, len - 1);
        self.selected = new as usize;
    }

    fn select_first(&mut self) {
        self.selected = 0;
    }

    fn select_last(&mut self) {
        self.selected = self.visible.len().saturating_sub(1);
    }

    fn set_filter(&mut self, filter: Option<String>) {
        self.filter = filter;
        self.apply_filter();
    }

    fn current_id(&self) -> Option<i64> {
        self.current().map(Record::id)
    }

    fn focus(&mut self, id: i64) -> bool {
        let Some(item_idx) = self.items.iter().position(|item| item.id() == id) else {
            return false;
        };
        if !self.visible.contains(&item_idx) {
            self.filter = None;
            self.apply_filter();
        }
        match self.visible.iter().position(|&idx| idx == item_idx) {
            Some(pos) => {
                self.selected = pos;
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
