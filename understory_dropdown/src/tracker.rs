// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport-based visibility tracking over a [`Document`].
//!
//! A [`ViewportTracker`] compares an element's world-space bounds with the
//! document viewport and reports which corners are on screen. It re-checks on
//! every [`Document::notify_layout`] until stopped, and immediately on
//! [`VisibilityTracker::recalculate`].
//!
//! Edges are inclusive: a corner lying exactly on the viewport boundary counts
//! as visible.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use core::fmt;

use kurbo::{Point, Rect};

use crate::document::Document;
use crate::host::{TrackerFactory, VisibilityCallback, VisibilityTracker};
use crate::types::{ElementId, ListenerId, Visibility};

/// Corner visibility of `bounds` within `viewport`.
///
/// ```
/// use kurbo::Rect;
/// use understory_dropdown::tracker::corner_visibility;
///
/// let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
/// let v = corner_visibility(Rect::new(80.0, 10.0, 130.0, 40.0), viewport);
/// assert!(v.top_left && v.bottom_left);
/// assert!(v.is_clipped_right());
/// ```
pub fn corner_visibility(bounds: Rect, viewport: Rect) -> Visibility {
    let vp = viewport.abs();
    let b = bounds.abs();
    let inside = |p: Point| p.x >= vp.x0 && p.x <= vp.x1 && p.y >= vp.y0 && p.y <= vp.y1;
    Visibility {
        top_left: inside(Point::new(b.x0, b.y0)),
        top_right: inside(Point::new(b.x1, b.y0)),
        bottom_left: inside(Point::new(b.x0, b.y1)),
        bottom_right: inside(Point::new(b.x1, b.y1)),
    }
}

/// Shared measurement state of one tracker; also captured by its layout observer.
struct Probe {
    document: Weak<Document>,
    element: ElementId,
    callback: VisibilityCallback,
}

impl Probe {
    fn report(&self) {
        let Some(document) = self.document.upgrade() else {
            return;
        };
        // Stale elements have no bounds; nothing to report.
        let Some(bounds) = document.bounds(self.element) else {
            return;
        };
        let snapshot = corner_visibility(bounds, document.viewport());
        log::trace!("tracker {:?}: {:?}", self.element, snapshot);
        (self.callback)(snapshot);
    }
}

/// Tracks one element's corner visibility against a [`Document`] viewport.
pub struct ViewportTracker {
    probe: Rc<Probe>,
    observer: Option<ListenerId>,
}

impl fmt::Debug for ViewportTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportTracker")
            .field("element", &self.probe.element)
            .field("observer", &self.observer)
            .finish_non_exhaustive()
    }
}

impl ViewportTracker {
    /// Start tracking `element`; snapshots go to `callback` on layout changes.
    ///
    /// No snapshot is reported until the next layout notification or an
    /// explicit [`VisibilityTracker::recalculate`].
    pub fn start(document: &Rc<Document>, element: ElementId, callback: VisibilityCallback) -> Self {
        let probe = Rc::new(Probe {
            document: Rc::downgrade(document),
            element,
            callback,
        });
        let weak = Rc::downgrade(&probe);
        let observer = document.observe_layout(Rc::new(move || {
            if let Some(probe) = weak.upgrade() {
                probe.report();
            }
        }));
        Self {
            probe,
            observer: Some(observer),
        }
    }

    /// The tracked element.
    pub fn element(&self) -> ElementId {
        self.probe.element
    }

    /// Returns `true` until [`VisibilityTracker::stop`] is called.
    pub fn is_running(&self) -> bool {
        self.observer.is_some()
    }
}

impl VisibilityTracker for ViewportTracker {
    fn recalculate(&mut self) {
        if self.is_running() {
            self.probe.report();
        }
    }

    fn stop(&mut self) {
        let Some(id) = self.observer.take() else {
            return;
        };
        if let Some(document) = self.probe.document.upgrade() {
            document.unobserve_layout(id);
        }
    }
}

impl Drop for ViewportTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// [`TrackerFactory`] producing [`ViewportTracker`]s over one document.
#[derive(Clone, Debug)]
pub struct ViewportTrackers {
    document: Rc<Document>,
}

impl ViewportTrackers {
    /// Create a factory for trackers over `document`.
    pub fn new(document: Rc<Document>) -> Self {
        Self { document }
    }
}

impl TrackerFactory for ViewportTrackers {
    fn create(
        &self,
        element: ElementId,
        callback: VisibilityCallback,
    ) -> Box<dyn VisibilityTracker> {
        Box::new(ViewportTracker::start(&self.document, element, callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    fn collecting() -> (Rc<RefCell<Vec<Visibility>>>, VisibilityCallback) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, Rc::new(move |v: Visibility| sink.borrow_mut().push(v)))
    }

    #[test]
    fn corners_on_the_edge_are_visible() {
        let vp = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(corner_visibility(vp, vp), Visibility::FULL);
        let below = corner_visibility(Rect::new(10.0, 90.0, 20.0, 110.0), vp);
        assert!(below.top_left && below.top_right);
        assert!(!below.bottom_left && !below.bottom_right);
    }

    #[test]
    fn reports_on_recalculate_and_layout_until_stopped() {
        let doc = Rc::new(Document::with_viewport(Rect::new(0.0, 0.0, 100.0, 100.0)));
        let el = doc.insert(None);
        doc.set_bounds(el, Rect::new(10.0, 10.0, 50.0, 50.0));

        let (seen, cb) = collecting();
        let mut tracker = ViewportTrackers::new(doc.clone()).create(el, cb);
        assert!(seen.borrow().is_empty());

        tracker.recalculate();
        assert_eq!(seen.borrow().as_slice(), &[Visibility::FULL]);

        doc.set_bounds(el, Rect::new(60.0, 10.0, 140.0, 50.0));
        doc.notify_layout();
        assert!(seen.borrow()[1].is_clipped_right());

        tracker.stop();
        tracker.stop();
        assert_eq!(doc.layout_observer_count(), 0);
        doc.notify_layout();
        tracker.recalculate();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn drop_releases_observer() {
        let doc = Rc::new(Document::new());
        let el = doc.insert(None);
        let (_seen, cb) = collecting();
        let tracker = ViewportTracker::start(&doc, el, cb);
        assert!(tracker.is_running());
        assert_eq!(tracker.element(), el);
        assert_eq!(doc.layout_observer_count(), 1);
        drop(tracker);
        assert_eq!(doc.layout_observer_count(), 0);
    }

    #[test]
    fn stale_element_reports_nothing() {
        let doc = Rc::new(Document::new());
        let el = doc.insert(None);
        let (seen, cb) = collecting();
        let mut tracker = ViewportTracker::start(&doc, el, cb);
        doc.remove(el);
        tracker.recalculate();
        doc.notify_layout();
        assert!(seen.borrow().is_empty());
    }
}
