// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory document: element tree, listeners, and event dispatch.
//!
//! [`Document`] is a small reference host for the dropdown. It keeps a
//! generational element tree (parent/children links plus world-space bounds),
//! a listener registry for both document-level and element-level handlers,
//! and a viewport rectangle.
//!
//! ## Dispatch
//!
//! [`Document::dispatch`] walks the event through the tree in the usual order:
//!
//! 1. document-level [`Phase::Capture`] listeners,
//! 2. capture handlers on ancestors, root → parent of target,
//! 3. every handler on the target itself,
//! 4. bubble handlers on ancestors, parent of target → root,
//! 5. document-level [`Phase::Bubble`] listeners.
//!
//! Any listener returning [`Outcome::Stop`] aborts the walk. Because
//! document capture listeners run first, no element handler can hide an event
//! from them.
//!
//! Listeners removed during a dispatch do not run if they had not been
//! reached yet; listeners added during a dispatch only see later events.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use understory_dropdown::document::Document;
//! use understory_dropdown::{DocumentHost, EventKinds, InputEvent, Outcome, Phase};
//!
//! let doc = Document::new();
//! let root = doc.insert(None);
//! let button = doc.insert(Some(root));
//!
//! // An inner handler swallows every click…
//! doc.on(button, EventKinds::CLICK, Phase::Target, Rc::new(|_: &InputEvent| Outcome::Stop));
//!
//! // …but a document capture listener still sees it.
//! let seen = Rc::new(Cell::new(0));
//! let counter = seen.clone();
//! doc.add_listener(EventKinds::CLICK, Phase::Capture, Rc::new(move |_: &InputEvent| {
//!     counter.set(counter.get() + 1);
//!     Outcome::Continue
//! }));
//!
//! doc.dispatch(&InputEvent::click(button));
//! assert_eq!(seen.get(), 1);
//! ```

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use hashbrown::HashMap;
use kurbo::Rect;
use smallvec::SmallVec;

use crate::host::{DocumentHost, Listener};
use crate::types::{ElementId, EventKinds, InputEvent, ListenerId, Outcome, Phase};

/// Callback run when layout (scroll, resize, reflow) changes.
pub type LayoutObserver = Rc<dyn Fn()>;

/// Where a dispatch was stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StopPoint {
    /// Phase of the listener that stopped propagation.
    pub phase: Phase,
    /// Element the listener was attached to, or `None` for a document listener.
    pub element: Option<ElementId>,
}

#[derive(Clone, Debug)]
struct Node {
    generation: u32,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    bounds: Rect,
}

#[derive(Clone)]
struct Entry {
    owner: Option<ElementId>,
    kinds: EventKinds,
    phase: Phase,
    listener: Listener,
}

#[derive(Debug, Default)]
struct Elements {
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl Elements {
    fn is_alive(&self, id: ElementId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .is_some_and(|n| n.generation == id.generation())
    }

    fn node(&self, id: ElementId) -> Option<&Node> {
        if !self.is_alive(id) {
            return None;
        }
        self.nodes.get(id.idx()).and_then(|n| n.as_ref())
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        if !self.is_alive(id) {
            return None;
        }
        self.nodes.get_mut(id.idx()).and_then(|n| n.as_mut())
    }

    /// Root → `target` path; empty for stale ids.
    fn path_to(&self, target: ElementId) -> SmallVec<[ElementId; 8]> {
        let mut out = SmallVec::new();
        let mut cur = Some(target);
        while let Some(id) = cur {
            let Some(node) = self.node(id) else {
                break;
            };
            out.push(id);
            cur = node.parent;
        }
        out.reverse();
        out
    }
}

/// In-memory document host.
///
/// See the [module docs](self) for dispatch order.
pub struct Document {
    elements: RefCell<Elements>,
    listeners: RefCell<BTreeMap<ListenerId, Entry>>,
    observers: RefCell<HashMap<ListenerId, LayoutObserver>>,
    viewport: Cell<Rect>,
    next_id: Cell<u64>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("elements", &self.elements.borrow().nodes.len())
            .field("listeners", &self.listeners.borrow().len())
            .field("observers", &self.observers.borrow().len())
            .field("viewport", &self.viewport.get())
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a zero-sized viewport.
    pub fn new() -> Self {
        Self::with_viewport(Rect::ZERO)
    }

    /// Create an empty document with the given viewport.
    pub fn with_viewport(viewport: Rect) -> Self {
        Self {
            elements: RefCell::new(Elements::default()),
            listeners: RefCell::new(BTreeMap::new()),
            observers: RefCell::new(HashMap::new()),
            viewport: Cell::new(viewport),
            next_id: Cell::new(1),
        }
    }

    fn mint_id(&self) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ListenerId(id)
    }

    // --- elements ---

    /// Insert a new element under `parent` (or as a root if `None`).
    ///
    /// A stale `parent` makes the new element a root.
    pub fn insert(&self, parent: Option<ElementId>) -> ElementId {
        let mut els = self.elements.borrow_mut();
        let parent = parent.filter(|p| els.is_alive(*p));
        let (idx, generation) = if let Some(idx) = els.free_list.pop() {
            let generation = els.generations[idx].saturating_add(1);
            els.generations[idx] = generation;
            (idx, generation)
        } else {
            els.nodes.push(None);
            els.generations.push(1);
            (els.nodes.len() - 1, 1)
        };
        els.nodes[idx] = Some(Node {
            generation,
            parent,
            children: Vec::new(),
            bounds: Rect::ZERO,
        });
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ElementId uses 32-bit indices by design."
        )]
        let id = ElementId::new(idx as u32, generation);
        if let Some(p) = parent
            && let Some(node) = els.node_mut(p)
        {
            node.children.push(id);
        }
        id
    }

    /// Remove an element and its subtree, along with their handlers.
    pub fn remove(&self, id: ElementId) {
        let mut removed: SmallVec<[ElementId; 8]> = SmallVec::new();
        {
            let mut els = self.elements.borrow_mut();
            let Some(parent) = els.node(id).map(|n| n.parent) else {
                return;
            };
            if let Some(p) = parent
                && let Some(node) = els.node_mut(p)
            {
                node.children.retain(|c| *c != id);
            }
            let mut stack: SmallVec<[ElementId; 8]> = SmallVec::new();
            stack.push(id);
            while let Some(cur) = stack.pop() {
                if let Some(node) = els.nodes.get_mut(cur.idx()).and_then(Option::take) {
                    stack.extend(node.children);
                    els.free_list.push(cur.idx());
                    removed.push(cur);
                }
            }
        }
        self.listeners
            .borrow_mut()
            .retain(|_, e| e.owner.is_none_or(|o| !removed.contains(&o)));
    }

    /// Returns `true` if `id` refers to a live element.
    pub fn is_alive(&self, id: ElementId) -> bool {
        self.elements.borrow().is_alive(id)
    }

    /// Returns the parent of a live element, or `None` for roots or stale ids.
    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.elements.borrow().node(id).and_then(|n| n.parent)
    }

    /// Returns the children of a live element (empty for stale ids).
    pub fn children_of(&self, id: ElementId) -> Vec<ElementId> {
        self.elements
            .borrow()
            .node(id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Set the world-space bounds of an element. Stale ids are ignored.
    pub fn set_bounds(&self, id: ElementId, bounds: Rect) {
        if let Some(node) = self.elements.borrow_mut().node_mut(id) {
            node.bounds = bounds;
        }
    }

    /// World-space bounds of a live element.
    pub fn bounds(&self, id: ElementId) -> Option<Rect> {
        self.elements.borrow().node(id).map(|n| n.bounds)
    }

    /// Current viewport rectangle.
    pub fn viewport(&self) -> Rect {
        self.viewport.get()
    }

    /// Replace the viewport rectangle.
    ///
    /// This does not notify layout observers; call [`Document::notify_layout`]
    /// once a batch of geometry changes is complete.
    pub fn set_viewport(&self, viewport: Rect) {
        self.viewport.set(viewport);
    }

    // --- layout observers ---

    /// Register a callback run on every [`Document::notify_layout`].
    pub fn observe_layout(&self, observer: LayoutObserver) -> ListenerId {
        let id = self.mint_id();
        self.observers.borrow_mut().insert(id, observer);
        id
    }

    /// Unregister a layout observer. Returns `false` if `id` was unknown.
    pub fn unobserve_layout(&self, id: ListenerId) -> bool {
        self.observers.borrow_mut().remove(&id).is_some()
    }

    /// Number of registered layout observers.
    pub fn layout_observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Run all layout observers (after a scroll, resize, or reflow).
    pub fn notify_layout(&self) {
        let snapshot: SmallVec<[(ListenerId, LayoutObserver); 4]> = self
            .observers
            .borrow()
            .iter()
            .map(|(id, o)| (*id, o.clone()))
            .collect();
        for (id, observer) in snapshot {
            // Skip observers removed by an earlier one in this pass.
            if self.observers.borrow().contains_key(&id) {
                observer();
            }
        }
    }

    // --- listeners ---

    /// Attach a handler to an element.
    ///
    /// Handlers with [`Phase::Capture`] run while the event descends through
    /// the element, [`Phase::Bubble`] while it ascends. When the element is
    /// the target, all of its handlers run regardless of phase.
    /// Returns `None` if `element` is stale.
    pub fn on(
        &self,
        element: ElementId,
        kinds: EventKinds,
        phase: Phase,
        listener: Listener,
    ) -> Option<ListenerId> {
        if !self.is_alive(element) {
            return None;
        }
        let id = self.mint_id();
        self.listeners.borrow_mut().insert(
            id,
            Entry {
                owner: Some(element),
                kinds,
                phase,
                listener,
            },
        );
        Some(id)
    }

    /// Number of document-level listeners currently subscribed.
    pub fn document_listener_count(&self) -> usize {
        self.listeners
            .borrow()
            .values()
            .filter(|e| e.owner.is_none())
            .count()
    }

    /// Dispatch an event through the document.
    ///
    /// Returns where propagation was stopped, or `None` if every listener ran.
    pub fn dispatch(&self, event: &InputEvent) -> Option<StopPoint> {
        let path = self.elements.borrow().path_to(event.target());
        let plan = self.plan(event.kind(), &path);
        for (id, phase, element) in plan {
            // Re-check: an earlier listener may have unsubscribed this one.
            let Some(listener) = self.listeners.borrow().get(&id).map(|e| e.listener.clone())
            else {
                continue;
            };
            if listener(event) == Outcome::Stop {
                return Some(StopPoint { phase, element });
            }
        }
        None
    }

    /// Listener ids in dispatch order for an event of `kind` along `path`.
    fn plan(
        &self,
        kind: EventKinds,
        path: &[ElementId],
    ) -> Vec<(ListenerId, Phase, Option<ElementId>)> {
        let listeners = self.listeners.borrow();
        let mut out = Vec::new();
        let mut push = |owner: Option<ElementId>, phases: &[Phase], reported: Phase| {
            for (id, e) in listeners.iter() {
                if e.owner == owner && e.kinds.contains(kind) && phases.contains(&e.phase) {
                    out.push((*id, reported, owner));
                }
            }
        };

        push(None, &[Phase::Capture], Phase::Capture);
        if let Some((&target, ancestors)) = path.split_last() {
            for &n in ancestors {
                push(Some(n), &[Phase::Capture], Phase::Capture);
            }
            for phase in [Phase::Capture, Phase::Target, Phase::Bubble] {
                push(Some(target), &[phase], Phase::Target);
            }
            for &n in ancestors.iter().rev() {
                push(Some(n), &[Phase::Bubble], Phase::Bubble);
            }
        }
        // Document listeners not registered for capture observe the bubble tail.
        push(None, &[Phase::Target, Phase::Bubble], Phase::Bubble);
        out
    }
}

impl DocumentHost for Document {
    fn add_listener(&self, kinds: EventKinds, phase: Phase, listener: Listener) -> ListenerId {
        let id = self.mint_id();
        self.listeners.borrow_mut().insert(
            id,
            Entry {
                owner: None,
                kinds,
                phase,
                listener,
            },
        );
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }

    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let els = self.elements.borrow();
        if !els.is_alive(ancestor) {
            return false;
        }
        let mut cur = Some(node);
        while let Some(id) = cur {
            let Some(n) = els.node(id) else {
                return false;
            };
            if id == ancestor {
                return true;
            }
            cur = n.parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn recorder(log: &Log, name: &'static str, outcome: Outcome) -> Listener {
        let log = log.clone();
        Rc::new(move |_: &InputEvent| {
            log.borrow_mut().push(name);
            outcome
        })
    }

    fn names(log: &Log) -> Vec<&'static str> {
        log.borrow().clone()
    }

    #[test]
    fn dispatch_order_is_capture_target_bubble() {
        let doc = Document::new();
        let root = doc.insert(None);
        let mid = doc.insert(Some(root));
        let leaf = doc.insert(Some(mid));

        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let all = EventKinds::all();
        doc.add_listener(all, Phase::Bubble, recorder(&log, "doc-bubble", Outcome::Continue));
        doc.on(root, all, Phase::Bubble, recorder(&log, "root-bubble", Outcome::Continue));
        doc.on(leaf, all, Phase::Bubble, recorder(&log, "leaf", Outcome::Continue));
        doc.on(mid, all, Phase::Capture, recorder(&log, "mid-capture", Outcome::Continue));
        doc.add_listener(all, Phase::Capture, recorder(&log, "doc-capture", Outcome::Continue));

        assert!(doc.dispatch(&InputEvent::click(leaf)).is_none());
        assert_eq!(
            names(&log),
            vec!["doc-capture", "mid-capture", "leaf", "root-bubble", "doc-bubble"]
        );
    }

    #[test]
    fn inner_stop_cannot_hide_event_from_document_capture() {
        let doc = Document::new();
        let root = doc.insert(None);
        let leaf = doc.insert(Some(root));

        let log: Log = Rc::new(RefCell::new(Vec::new()));
        doc.on(leaf, EventKinds::CLICK, Phase::Target, recorder(&log, "leaf", Outcome::Stop));
        doc.add_listener(
            EventKinds::CLICK,
            Phase::Capture,
            recorder(&log, "doc-capture", Outcome::Continue),
        );
        doc.add_listener(
            EventKinds::CLICK,
            Phase::Bubble,
            recorder(&log, "doc-bubble", Outcome::Continue),
        );

        let stop = doc.dispatch(&InputEvent::click(leaf));
        assert_eq!(
            stop,
            Some(StopPoint {
                phase: Phase::Target,
                element: Some(leaf)
            })
        );
        assert_eq!(names(&log), vec!["doc-capture", "leaf"]);
    }

    #[test]
    fn kinds_filter_listeners() {
        let doc = Document::new();
        let el = doc.insert(None);
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        doc.add_listener(
            EventKinds::KEY_UP,
            Phase::Capture,
            recorder(&log, "keys", Outcome::Continue),
        );
        doc.dispatch(&InputEvent::click(el));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn listener_removed_mid_dispatch_does_not_run() {
        let doc = Rc::new(Document::new());
        let el = doc.insert(None);
        let log: Log = Rc::new(RefCell::new(Vec::new()));

        let victim = Rc::new(Cell::new(None));
        let d = Rc::downgrade(&doc);
        let v = victim.clone();
        doc.add_listener(
            EventKinds::CLICK,
            Phase::Capture,
            Rc::new(move |_: &InputEvent| {
                if let (Some(doc), Some(id)) = (d.upgrade(), v.get()) {
                    doc.remove_listener(id);
                }
                Outcome::Continue
            }),
        );
        let id = doc.add_listener(
            EventKinds::CLICK,
            Phase::Capture,
            recorder(&log, "victim", Outcome::Continue),
        );
        victim.set(Some(id));

        doc.dispatch(&InputEvent::click(el));
        assert!(log.borrow().is_empty());
        assert_eq!(doc.document_listener_count(), 1);
    }

    #[test]
    fn containment_and_stale_ids() {
        let doc = Document::new();
        let root = doc.insert(None);
        let panel = doc.insert(Some(root));
        let item = doc.insert(Some(panel));
        let other = doc.insert(Some(root));

        assert!(doc.contains(panel, panel));
        assert!(doc.contains(panel, item));
        assert!(doc.contains(root, item));
        assert!(!doc.contains(panel, other));
        assert!(!doc.contains(item, panel));

        doc.remove(panel);
        assert!(!doc.is_alive(item));
        assert!(!doc.contains(panel, item));
        assert!(!doc.contains(root, item));
        assert_eq!(doc.children_of(root), vec![other]);

        // Slot reuse bumps the generation; old ids stay stale.
        let fresh = doc.insert(Some(root));
        assert_ne!(fresh, panel);
        assert_ne!(fresh, item);
        assert!(!doc.contains(panel, fresh));
        assert_eq!(doc.parent_of(fresh), Some(root));
    }

    #[test]
    fn removing_element_drops_its_handlers() {
        let doc = Document::new();
        let el = doc.insert(None);
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        assert!(
            doc.on(el, EventKinds::CLICK, Phase::Target, recorder(&log, "x", Outcome::Continue))
                .is_some()
        );
        doc.remove(el);
        let again = doc.insert(None);
        doc.dispatch(&InputEvent::click(again));
        assert!(log.borrow().is_empty());
        assert!(
            doc.on(el, EventKinds::CLICK, Phase::Target, recorder(&log, "y", Outcome::Continue))
                .is_none()
        );
    }

    #[test]
    fn layout_observers_run_until_removed() {
        let doc = Document::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = doc.observe_layout(Rc::new(move || h.set(h.get() + 1)));
        doc.notify_layout();
        doc.notify_layout();
        assert!(doc.unobserve_layout(id));
        assert!(!doc.unobserve_layout(id));
        doc.notify_layout();
        assert_eq!(hits.get(), 2);
        assert_eq!(doc.layout_observer_count(), 0);
    }

    #[test]
    fn bounds_and_viewport() {
        let doc = Document::with_viewport(Rect::new(0.0, 0.0, 100.0, 50.0));
        let el = doc.insert(None);
        doc.set_bounds(el, Rect::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(doc.bounds(el), Some(Rect::new(10.0, 10.0, 20.0, 20.0)));
        doc.remove(el);
        assert_eq!(doc.bounds(el), None);
        doc.set_viewport(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(doc.viewport(), Rect::new(0.0, 0.0, 10.0, 10.0));
    }
}
