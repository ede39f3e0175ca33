use super::Canvas;

use log::trace;

use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub(crate) struct CachedFrame {
    pub(crate) canvas: Canvas,
    /// Pre-paint snapshot, kept only for restore-to-previous frames.
    pub(crate) restore_point: Option<Canvas>,
}

/// Composited canvases keyed by frame index.
///
/// Holds at most `capacity` entries; when full, the lowest frame index goes first.
#[derive(Debug)]
pub(crate) struct FrameCache {
    capacity: usize,
    entries: BTreeMap<usize, CachedFrame>,
}

impl FrameCache {
    pub(crate) const DEFAULT_CAPACITY: usize = 50;

    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: BTreeMap::new(),
        }
    }

    pub(crate) fn get(&self, index: usize) -> Option<&CachedFrame> {
        self.entries.get(&index)
    }

    /// The closest cached frame strictly before `index`.
    pub(crate) fn nearest_before(&self, index: usize) -> Option<(usize, &CachedFrame)> {
        self.entries
            .range(..index)
            .next_back()
            .map(|(&cached, frame)| (cached, frame))
    }

    /// Stores a copy of a freshly composited frame.
    ///
    /// Optional entries are only taken while there is room; a required entry always
    /// goes in and pushes out the lowest other index if the cache overflows.
    pub(crate) fn offer(
        &mut self,
        index: usize,
        canvas: &Canvas,
        restore_point: Option<&Canvas>,
        required: bool,
    ) {
        if !required && self.entries.len() >= self.capacity {
            return;
        }

        self.entries.insert(
            index,
            CachedFrame {
                canvas: canvas.clone(),
                restore_point: restore_point.cloned(),
            },
        );

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.entries.keys().copied().find(|&cached| cached != index) else {
                break;
            };
            trace!("evicting frame {oldest} from cache");
            self.entries.remove(&oldest);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }
}
