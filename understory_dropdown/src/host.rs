// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Seams to the host environment.
//!
//! The dropdown does not render, measure, or own elements. It consumes two
//! collaborators through the traits in this module:
//!
//! - a [`DocumentHost`], which accepts document-level listeners and answers
//!   containment queries over the element tree, and
//! - a [`TrackerFactory`], which creates [`VisibilityTracker`]s that report
//!   corner visibility of an element relative to the viewport.
//!
//! [`Document`](crate::document::Document) and
//! [`ViewportTrackers`](crate::tracker::ViewportTrackers) are in-memory
//! implementations of both, suitable for tests and simple hosts.

use alloc::boxed::Box;
use alloc::rc::Rc;

use crate::types::{ElementId, EventKinds, InputEvent, ListenerId, Outcome, Phase, Visibility};

/// A document-level or element-level event listener.
pub type Listener = Rc<dyn Fn(&InputEvent) -> Outcome>;

/// Callback receiving corner visibility snapshots.
pub type VisibilityCallback = Rc<dyn Fn(Visibility)>;

/// Document-level event subscription and element containment.
///
/// All methods take `&self`; implementations use interior mutability because
/// listeners may subscribe or unsubscribe while an event is being dispatched.
pub trait DocumentHost {
    /// Subscribe `listener` to events of `kinds` at the document root, in `phase`.
    ///
    /// A [`Phase::Capture`] listener must observe events before any element
    /// handler on the path can stop propagation.
    fn add_listener(&self, kinds: EventKinds, phase: Phase, listener: Listener) -> ListenerId;

    /// Unsubscribe a listener. Returns `false` if `id` was not subscribed.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Returns `true` if `node` is `ancestor` or one of its descendants.
    ///
    /// Stale identifiers are never contained.
    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool;
}

/// A live corner-visibility observation of one element.
pub trait VisibilityTracker {
    /// Re-check visibility now and report through the callback.
    fn recalculate(&mut self);

    /// Release all observation resources. Calling `stop` twice is a no-op.
    fn stop(&mut self);
}

/// Creates visibility trackers.
pub trait TrackerFactory {
    /// Start observing `element`, reporting snapshots to `callback`.
    fn create(&self, element: ElementId, callback: VisibilityCallback)
    -> Box<dyn VisibilityTracker>;
}
