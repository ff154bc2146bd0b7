use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::RenderError;

#[derive(Default)]
struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[derive(Default)]
struct Shared {
    frame: Mutex<Frame>,
    dirty: AtomicBool,
    closed: AtomicBool,
}

/// Producer side of a dynamic texture.
///
/// `push` may be called from any thread. It only copies into a shared buffer
/// and raises the dirty latch; the render thread uploads the latest frame on
/// the next draw of the owning drawable.
#[derive(Clone, Default)]
pub struct PixelFeed {
    shared: Arc<Shared>,
}

impl PixelFeed {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Publishes a `width × height` BGRA8 frame.
    ///
    /// Fails with [`RenderError::Disposed`] once the drawable is gone.
    pub fn push(&self, width: u32, height: u32, bgra: &[u8]) -> Result<(), RenderError> {
        if self.is_closed() {
            return Err(RenderError::Disposed);
        }

        let expected = width as usize * height as usize * 4;
        if bgra.len() != expected {
            return Err(RenderError::PixelBufferSize {
                expected,
                actual: bgra.len(),
            });
        }

        {
            let mut frame = self.shared.frame.lock().unwrap_or_else(PoisonError::into_inner);
            frame.width = width;
            frame.height = height;
            frame.pixels.clear();
            frame.pixels.extend_from_slice(bgra);
        }

        self.shared.dirty.store(true, Ordering::Release);
        Ok(())
    }

    /// `true` while a pushed frame has not been uploaded yet.
    pub fn is_dirty(&self) -> bool {
        self.shared.dirty.load(Ordering::Acquire)
    }

    /// `true` once the owning drawable was disposed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }

    /// Hands the latest frame to `upload` if one arrived since the last call,
    /// clearing the latch.
    pub(crate) fn consume<R>(&self, upload: impl FnOnce(u32, u32, &[u8]) -> R) -> Option<R> {
        if !self.shared.dirty.swap(false, Ordering::AcqRel) {
            return None;
        }
        let frame = self.shared.frame.lock().unwrap_or_else(PoisonError::into_inner);
        Some(upload(frame.width, frame.height, &frame.pixels))
    }
}

impl std::fmt::Debug for PixelFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelFeed")
            .field("dirty", &self.is_dirty())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_sets_latch_and_consume_clears_it() {
        let feed = PixelFeed::new();
        assert!(feed.consume(|_, _, _| ()).is_none());

        feed.push(1, 1, &[1, 2, 3, 4]).unwrap();
        assert!(feed.is_dirty());

        let seen = feed.consume(|w, h, px| (w, h, px.to_vec())).unwrap();
        assert_eq!(seen, (1, 1, vec![1, 2, 3, 4]));
        assert!(!feed.is_dirty());
        assert!(feed.consume(|_, _, _| ()).is_none());
    }

    #[test]
    fn wrong_length_is_rejected() {
        let feed = PixelFeed::new();
        let err = feed.push(2, 2, &[0; 15]).unwrap_err();
        assert!(matches!(err, RenderError::PixelBufferSize { expected: 16, actual: 15 }));
        assert!(!feed.is_dirty());
    }

    #[test]
    fn push_from_another_thread() {
        let feed = PixelFeed::new();
        let producer = feed.clone();
        std::thread::spawn(move || producer.push(2, 1, &[9; 8]))
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(feed.consume(|w, _, px| (w, px[0])), Some((2, 9)));
    }

    #[test]
    fn closed_feed_rejects_push() {
        let feed = PixelFeed::new();
        feed.close();
        assert!(matches!(feed.push(1, 1, &[0; 4]), Err(RenderError::Disposed)));
    }
}
