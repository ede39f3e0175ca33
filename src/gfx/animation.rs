use super::compositor::Compositor;
use super::frame_cache::FrameCache;
use super::Canvas;
use crate::parser::{FrameDescriptor, GifHeader};

use log::debug;
use serde::Serialize;

/// Tuning for an [`Animation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Most composited frames kept in memory. Values below 1 are treated as 1.
    pub cache_capacity: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            cache_capacity: FrameCache::DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GifInfo {
    pub frame_count: usize,
    pub width: u16,
    pub height: u16,
}

/// A parsed GIF that composites its frames on demand.
#[derive(Debug)]
pub struct Animation {
    header: GifHeader,
    frames: Vec<FrameDescriptor>,
    cache: FrameCache,
}

impl Animation {
    pub fn new(header: GifHeader, frames: Vec<FrameDescriptor>) -> Self {
        Self::with_options(header, frames, DecodeOptions::default())
    }

    pub fn with_options(header: GifHeader, frames: Vec<FrameDescriptor>, options: DecodeOptions) -> Self {
        Self {
            header,
            frames,
            cache: FrameCache::new(options.cache_capacity),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn header(&self) -> &GifHeader {
        &self.header
    }

    pub fn frames(&self) -> &[FrameDescriptor] {
        &self.frames
    }

    pub fn info(&self) -> GifInfo {
        GifInfo {
            frame_count: self.frame_count(),
            width: self.header.width,
            height: self.header.height,
        }
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache.capacity()
    }

    /// Frame indices currently held by the cache, in ascending order.
    pub fn cached_indices(&self) -> Vec<usize> {
        self.cache.indices().collect()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// The full logical screen as it looks once frame `index` has been drawn.
    ///
    /// Composition resumes from the closest cached frame before `index`, or from the
    /// blank screen. Returns `None` when `index` is not a frame of this animation.
    pub fn get_frame(&mut self, index: usize) -> Option<Canvas> {
        if index >= self.frames.len() {
            debug!("frame {index} requested, animation has {}", self.frames.len());
            return None;
        }

        if let Some(cached) = self.cache.get(index) {
            return Some(cached.canvas.clone());
        }

        let compositor = Compositor::new(&self.header, &self.frames);
        let (start, mut canvas, mut restore_point) = match self.cache.nearest_before(index) {
            Some((cached_index, cached)) => (
                cached_index + 1,
                cached.canvas.clone(),
                cached.restore_point.clone(),
            ),
            None => (0, compositor.blank_canvas(), None),
        };

        debug!("compositing frames {start}..={index}");

        for i in start..=index {
            restore_point = compositor.composite(&mut canvas, i, restore_point.as_ref());
            self.cache.offer(i, &canvas, restore_point.as_ref(), i == index);
        }

        Some(canvas)
    }
}
