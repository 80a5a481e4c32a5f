/// Cursor plus scroll window over a list whose length changes under it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub selected: Option<usize>,
    pub scroll_offset: usize,
}

impl Selection {
    /// Forgets the cursor; the next reclamp lands on the first row.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn reclamp(&mut self, len: usize, page_size: usize) {
        if len == 0 {
            self.reset();
            return;
        }
        let page = page_size.max(1);
        let selected = self.selected.map_or(0, |i| i.min(len - 1));
        self.selected = Some(selected);

        if selected < self.scroll_offset {
            self.scroll_offset = selected;
        } else if selected >= self.scroll_offset + page {
            self.scroll_offset = selected + 1 - page;
        }
        // Never leave blank space below the last row when the list shrank.
        let max_offset = len.saturating_sub(page);
        if self.scroll_offset > max_offset {
            self.scroll_offset = max_offset;
        }
    }

    pub fn move_up(&mut self, len: usize, page_size: usize) {
        self.step_back(1, len, page_size);
    }

    pub fn move_down(&mut self, len: usize, page_size: usize) {
        self.step_forward(1, len, page_size);
    }

    pub fn page_up(&mut self, len: usize, page_size: usize) {
        self.step_back(page_size.max(1), len, page_size);
    }

    pub fn page_down(&mut self, len: usize, page_size: usize) {
        self.step_forward(page_size.max(1), len, page_size);
    }

    fn step_back(&mut self, by: usize, len: usize, page_size: usize) {
        if let Some(i) = self.selected {
            self.selected = Some(i.saturating_sub(by));
        }
        self.reclamp(len, page_size);
    }

    fn step_forward(&mut self, by: usize, len: usize, page_size: usize) {
        if let Some(i) = self.selected {
            self.selected = Some(i.saturating_add(by));
        }
        self.reclamp(len, page_size);
    }

    /// Half-open range of list indices currently on screen.
    pub fn window(&self, len: usize, page_size: usize) -> std::ops::Range<usize> {
        let start = self.scroll_offset.min(len);
        let end = (start + page_size.max(1)).min(len);
        start..end
    }
}
