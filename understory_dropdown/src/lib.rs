// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Dropdown: a headless dropdown/toggle interaction state machine.
//!
//! ## Overview
//!
//! A dropdown is a [`Dropdown`] controller with two kinds of [`Child`]: a trigger that
//! opens and closes it, and an items panel that is only rendered while it is open.
//! The crate owns the interaction logic and produces plain element descriptions
//! ([`RootView`], [`ChildView`]); drawing them is left to the host.
//!
//! ## Behavior
//!
//! - Activating the trigger (a click, or releasing `Enter`) toggles the dropdown.
//! - While open, one capture-phase listener on the document closes it on a click
//!   outside both the trigger and the items panel, or on `Escape` released outside
//!   the panel. Capture phase means handlers that stop propagation further in
//!   cannot prevent dismissal.
//! - When the panel opens, it measures which of its corners are on screen. If
//!   both right corners are clipped, the root gets a `{prefix}-right` modifier
//!   class so styling can realign the panel.
//!
//! ## Host seams
//!
//! The controller talks to its surroundings through two traits:
//!
//! - [`DocumentHost`] subscribes document listeners and answers containment queries.
//! - [`TrackerFactory`] creates a [`VisibilityTracker`] for the items panel.
//!
//! The [`document`] module provides an in-memory [`Document`](document::Document)
//! implementing the first, with capture → target → bubble dispatch over a
//! generational element tree. The [`tracker`] module measures elements against
//! that document's viewport.
//!
//! ## Workflow
//!
//! 1) Create a [`Dropdown`] and construct its children in [`Dropdown::scope`];
//!    each child registers itself with the controller.
//! 2) Render: [`Dropdown::render`] propagates the open state into the children's
//!    props, and [`Child::render`] describes each child's element.
//! 3) Mount: attach the trigger's [`ChildView::on_activate`] handler and
//!    [`Child::bind`] each child to its element.
//! 4) Update: hand each child its propagated props with [`Child::update`]. This is
//!    where the items panel starts measuring itself.
//! 5) Repeat from 2) whenever the callback set with [`Dropdown::set_on_change`] runs.
//!
//! ```
//! use std::rc::Rc;
//! use kurbo::Rect;
//! use understory_dropdown::document::Document;
//! use understory_dropdown::tracker::ViewportTrackers;
//! use understory_dropdown::{
//!     Child, ChildProps, Dropdown, DropdownNode, DropdownProps, EventKinds, InputEvent, Phase,
//! };
//!
//! let doc = Rc::new(Document::with_viewport(Rect::new(0.0, 0.0, 200.0, 200.0)));
//! let root = doc.insert(None);
//! let dropdown = Dropdown::new(
//!     DropdownProps::new(),
//!     doc.clone(),
//!     Rc::new(ViewportTrackers::new(doc.clone())),
//! );
//! let scope = dropdown.scope();
//! let mut trigger = Child::new(&scope, ChildProps::trigger());
//! let mut items = Child::new(&scope, ChildProps::items());
//!
//! // Mount the trigger.
//! let button = doc.insert(Some(root));
//! let view = trigger.render().unwrap();
//! doc.on(button, EventKinds::CLICK, Phase::Target, view.on_activate.unwrap());
//! trigger.bind(Some(button));
//!
//! // A click on the trigger opens the dropdown.
//! doc.dispatch(&InputEvent::click(button));
//! assert!(dropdown.is_active());
//!
//! // Re-render: the items panel now renders and gets an element that hangs off the right edge.
//! let root_view = dropdown
//!     .render([DropdownNode::from(items.props().clone())])
//!     .unwrap();
//! let DropdownNode::Child(next) = &root_view.children[0] else { unreachable!() };
//! let panel = doc.insert(Some(root));
//! doc.set_bounds(panel, Rect::new(150.0, 40.0, 260.0, 120.0));
//! items.bind(Some(panel));
//! items.update(next.clone());
//! assert!(items.render().is_some());
//! assert!(dropdown.is_flipped_right());
//!
//! // Clicking elsewhere closes it again.
//! doc.dispatch(&InputEvent::click(root));
//! assert!(!dropdown.is_active());
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod attrs;
mod child;
mod controller;
pub mod document;
mod error;
mod host;
pub mod tracker;
mod types;

pub use child::{
    Child, ChildProps, ChildRef, ChildView, DEFAULT_CHILD_PREFIX, accepts_activation,
};
pub use controller::{
    DEFAULT_PREFIX, Dropdown, DropdownContext, DropdownNode, DropdownProps, DropdownScope,
    ForeignNode, RootView, TriggerPolicy,
};
pub use error::DropdownError;
pub use host::{DocumentHost, Listener, TrackerFactory, VisibilityCallback, VisibilityTracker};
pub use types::{ElementId, EventKinds, InputEvent, Key, ListenerId, Outcome, Phase, Role, Visibility};
