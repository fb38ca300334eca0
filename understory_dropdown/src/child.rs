// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dropdown children: the trigger and the items panel.
//!
//! A [`Child`] is created inside a [`DropdownScope`] and registers itself with
//! the controller right away. Its [`Role`] is fixed by
//! [`ChildProps::is_trigger`] at construction.
//!
//! ## Lifecycle
//!
//! The host drives a child through the same steps a declarative framework
//! would:
//!
//! 1. [`Child::render`] describes the element to show (or nothing, for a
//!    closed items panel).
//! 2. [`Child::bind`] hands the child the element the host created for that
//!    description (or `None` once it is gone).
//! 3. [`Child::update`] delivers the props the controller propagated on its
//!    latest render. The items panel restarts its visibility tracker here.
//! 4. [`Child::unmount`] (or dropping the child) stops any tracker.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use core::cell::Cell;
use core::fmt;

use crate::attrs::{Attributes, class_names, parse_flag};
use crate::controller::DropdownScope;
use crate::host::{Listener, VisibilityTracker};
use crate::types::{ElementId, InputEvent, Key, Outcome, Role, Visibility};

/// Default modifier prefix for children.
pub const DEFAULT_CHILD_PREFIX: &str = "child";

/// Options of a dropdown child.
///
/// `active` is injected by the controller when it propagates its state and
/// cannot be set by callers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChildProps {
    /// Selects the trigger role; otherwise the child is the items panel.
    pub is_trigger: bool,
    /// Prefix for the `-active` modifier class (default `"child"`).
    pub class_prefix: Option<String>,
    /// Element kind override (default `"a"` for the trigger, `"div"` for items).
    pub tag_name: Option<String>,
    /// Base class name, kept ahead of modifiers.
    pub class_name: Option<String>,
    /// Attributes passed through unmodified.
    pub attrs: Attributes,
    active: bool,
}

impl ChildProps {
    /// Props for the trigger.
    pub fn trigger() -> Self {
        Self {
            is_trigger: true,
            ..Self::default()
        }
    }

    /// Props for the items panel.
    pub fn items() -> Self {
        Self::default()
    }

    /// Set the modifier class prefix.
    pub fn class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = Some(prefix.into());
        self
    }

    /// Override the element kind.
    pub fn tag_name(mut self, tag: impl Into<String>) -> Self {
        self.tag_name = Some(tag.into());
        self
    }

    /// Set the base class name.
    pub fn class_name(mut self, class: impl Into<String>) -> Self {
        self.class_name = Some(class.into());
        self
    }

    /// Set an attribute by name.
    ///
    /// Option names (`isTrigger`, `classPrefix`, `tagName`, `className`) are
    /// routed to their typed fields; `active` is controller-owned and dropped.
    /// Everything else is passed through.
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match name {
            "isTrigger" => match parse_flag(&value) {
                Some(flag) => self.is_trigger = flag,
                None => log::warn!("ignoring unrecognized `isTrigger` value {value:?}"),
            },
            "classPrefix" => self.class_prefix = Some(value),
            "tagName" => self.tag_name = Some(value),
            "className" | "class" => self.class_name = Some(value),
            "active" | "defaultActive" => {
                log::debug!("ignoring caller-supplied `{name}` on a dropdown child");
            }
            _ => {
                self.attrs.insert(name, value);
            }
        }
        self
    }

    /// Whether the controller last propagated an open state.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Copy of these props with the controller's `active` flag applied.
    pub(crate) fn with_active(&self, active: bool) -> Self {
        Self {
            active,
            ..self.clone()
        }
    }
}

/// Element description produced by [`Child::render`].
#[derive(Clone)]
pub struct ChildView {
    /// Role of the child that rendered this view.
    pub role: Role,
    /// Element kind.
    pub tag: String,
    /// Composed class name, including the `-active` modifier when open.
    pub class_name: String,
    /// Pass-through attributes.
    pub attrs: Attributes,
    /// Handler to attach for click and key-up events (trigger only).
    pub on_activate: Option<Listener>,
}

impl fmt::Debug for ChildView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildView")
            .field("role", &self.role)
            .field("tag", &self.tag)
            .field("class_name", &self.class_name)
            .field("attrs", &self.attrs)
            .field("on_activate", &self.on_activate.is_some())
            .finish()
    }
}

/// Shared part of a child, reachable from the controller through [`ChildRef`].
#[derive(Debug)]
pub(crate) struct Slot {
    element: Cell<Option<ElementId>>,
}

/// Read-only back-reference to a registered child.
///
/// Does not keep the child alive; once the child is dropped, [`ChildRef::element`]
/// returns `None`.
#[derive(Clone, Debug)]
pub struct ChildRef {
    role: Role,
    slot: Weak<Slot>,
}

impl ChildRef {
    /// Role of the referenced child.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Element currently bound by the child, if it is alive and mounted.
    pub fn element(&self) -> Option<ElementId> {
        self.slot.upgrade().and_then(|s| s.element.get())
    }

    /// Returns `true` while the referenced child exists.
    pub fn is_live(&self) -> bool {
        self.slot.strong_count() > 0
    }

    /// Returns `true` if both references point at the same child.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.slot, &other.slot)
    }
}

/// Returns `true` if `event` should activate a trigger.
///
/// Any click qualifies; key releases only for [`Key::Enter`].
pub fn accepts_activation(event: &InputEvent) -> bool {
    match event {
        InputEvent::Click { .. } => true,
        InputEvent::KeyUp { key, .. } => *key == Key::Enter,
    }
}

/// A trigger or items panel inside a dropdown.
pub struct Child {
    role: Role,
    props: ChildProps,
    scope: DropdownScope,
    slot: Rc<Slot>,
    tracker: Option<Box<dyn VisibilityTracker>>,
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Child")
            .field("role", &self.role)
            .field("props", &self.props)
            .field("element", &self.slot.element.get())
            .field("tracker", &self.tracker.is_some())
            .finish_non_exhaustive()
    }
}

impl Child {
    /// Create a child and register it with the scope's controller.
    pub fn new(scope: &DropdownScope, props: ChildProps) -> Self {
        let role = Role::from_is_trigger(props.is_trigger);
        let child = Self {
            role,
            props,
            scope: scope.clone(),
            slot: Rc::new(Slot {
                element: Cell::new(None),
            }),
            tracker: None,
        };
        scope.context().register(child.handle());
        child
    }

    /// Role fixed at construction.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Props from construction or the latest [`Child::update`].
    pub fn props(&self) -> &ChildProps {
        &self.props
    }

    /// Whether the controller last propagated an open state.
    pub fn is_active(&self) -> bool {
        self.props.active
    }

    /// A read-only reference to this child, as registered with the controller.
    pub fn handle(&self) -> ChildRef {
        ChildRef {
            role: self.role,
            slot: Rc::downgrade(&self.slot),
        }
    }

    /// Element currently bound to this child.
    pub fn element(&self) -> Option<ElementId> {
        self.slot.element.get()
    }

    /// Returns `true` while a visibility tracker is live.
    pub fn has_tracker(&self) -> bool {
        self.tracker.is_some()
    }

    /// Bind (or clear) the element the host rendered for this child.
    pub fn bind(&mut self, element: Option<ElementId>) {
        self.slot.element.set(element);
    }

    /// Describe the element to render.
    ///
    /// A closed items panel renders nothing at all.
    pub fn render(&self) -> Option<ChildView> {
        let active = self.props.active;
        if self.role == Role::Items && !active {
            return None;
        }
        let prefix = self
            .props
            .class_prefix
            .as_deref()
            .unwrap_or(DEFAULT_CHILD_PREFIX);
        let tag = self.props.tag_name.clone().unwrap_or_else(|| {
            match self.role {
                Role::Trigger => "a",
                Role::Items => "div",
            }
            .into()
        });
        Some(ChildView {
            role: self.role,
            tag,
            class_name: class_names(
                self.props.class_name.as_deref(),
                [(format!("{prefix}-active"), active)],
            ),
            attrs: self.props.attrs.clone(),
            on_activate: self.activation_listener(),
        })
    }

    /// Handler reporting accepted activations to the controller (trigger only).
    pub fn activation_listener(&self) -> Option<Listener> {
        if self.role != Role::Trigger {
            return None;
        }
        // Hosts store this handler on their elements; it must not keep the controller alive.
        let context = Rc::downgrade(self.scope.context());
        Some(Rc::new(move |event: &InputEvent| {
            if accepts_activation(event)
                && let Some(context) = context.upgrade()
            {
                context.on_trigger_event();
            }
            Outcome::Continue
        }))
    }

    /// Handle an event aimed at this child. Returns `true` if it activated the trigger.
    pub fn handle_event(&self, event: &InputEvent) -> bool {
        if self.role != Role::Trigger || !accepts_activation(event) {
            return false;
        }
        self.scope.context().on_trigger_event();
        true
    }

    /// Apply props propagated by the controller after a render.
    ///
    /// Any running tracker is stopped. If this is the items panel and it has
    /// just become active, a fresh tracker is started on the bound element and
    /// asked for an immediate snapshot.
    pub fn update(&mut self, next: ChildProps) {
        let was_active = self.props.active;
        if Role::from_is_trigger(next.is_trigger) != self.role {
            log::debug!("dropdown child role is fixed at construction; keeping {:?}", self.role);
        }
        self.props = ChildProps {
            is_trigger: self.role == Role::Trigger,
            ..next
        };
        self.stop_tracker();

        if self.role != Role::Items || !self.props.active || self.props.active == was_active {
            return;
        }
        let Some(element) = self.slot.element.get() else {
            log::debug!("items panel opened without a bound element; not tracking");
            return;
        };
        let context = Rc::downgrade(self.scope.context());
        let mut tracker = self.scope.trackers().create(
            element,
            Rc::new(move |visibility: Visibility| {
                if let Some(context) = context.upgrade() {
                    context.on_visibility_update(visibility);
                }
            }),
        );
        tracker.recalculate();
        self.tracker = Some(tracker);
    }

    /// Release the tracker. Safe to call more than once.
    pub fn unmount(&mut self) {
        self.stop_tracker();
        self.slot.element.set(None);
    }

    fn stop_tracker(&mut self) {
        if let Some(mut tracker) = self.tracker.take() {
            tracker.stop();
        }
    }
}

impl Drop for Child {
    fn drop(&mut self) {
        self.stop_tracker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::DropdownContext;
    use crate::host::{TrackerFactory, VisibilityCallback};
    use alloc::vec::Vec;
    use core::cell::RefCell;

    /// Context that records calls instead of acting on them.
    #[derive(Default)]
    struct Recorder {
        registered: RefCell<Vec<ChildRef>>,
        triggers: Cell<u32>,
        snapshots: RefCell<Vec<Visibility>>,
    }

    impl DropdownContext for Recorder {
        fn register(&self, child: ChildRef) {
            self.registered.borrow_mut().push(child);
        }

        fn on_trigger_event(&self) {
            self.triggers.set(self.triggers.get() + 1);
        }

        fn on_visibility_update(&self, visibility: Visibility) {
            self.snapshots.borrow_mut().push(visibility);
        }
    }

    #[derive(Default)]
    struct Counts {
        created: Cell<u32>,
        recalculated: Cell<u32>,
        stopped: Cell<u32>,
    }

    struct FakeTracker {
        counts: Rc<Counts>,
        callback: VisibilityCallback,
        running: bool,
    }

    impl VisibilityTracker for FakeTracker {
        fn recalculate(&mut self) {
            self.counts.recalculated.set(self.counts.recalculated.get() + 1);
            (self.callback)(Visibility {
                top_right: false,
                bottom_right: false,
                ..Visibility::FULL
            });
        }

        fn stop(&mut self) {
            if core::mem::take(&mut self.running) {
                self.counts.stopped.set(self.counts.stopped.get() + 1);
            }
        }
    }

    struct FakeTrackers(Rc<Counts>);

    impl TrackerFactory for FakeTrackers {
        fn create(
            &self,
            _element: ElementId,
            callback: VisibilityCallback,
        ) -> Box<dyn VisibilityTracker> {
            self.0.created.set(self.0.created.get() + 1);
            Box::new(FakeTracker {
                counts: self.0.clone(),
                callback,
                running: true,
            })
        }
    }

    fn setup() -> (Rc<Recorder>, Rc<Counts>, DropdownScope) {
        let recorder = Rc::new(Recorder::default());
        let counts = Rc::new(Counts::default());
        let scope = DropdownScope::new(recorder.clone(), Rc::new(FakeTrackers(counts.clone())));
        (recorder, counts, scope)
    }

    const EL: ElementId = ElementId::new(0, 1);

    #[test]
    fn registers_on_construction() {
        let (recorder, _, scope) = setup();
        let trigger = Child::new(&scope, ChildProps::trigger());
        let items = Child::new(&scope, ChildProps::items());
        let registered = recorder.registered.borrow();
        assert_eq!(registered.len(), 2);
        assert!(registered[0].ptr_eq(&trigger.handle()));
        assert_eq!(registered[0].role(), Role::Trigger);
        assert_eq!(registered[1].role(), Role::Items);
        assert!(!registered[1].ptr_eq(&trigger.handle()));
        drop(items);
        assert!(!registered[1].is_live());
    }

    #[test]
    fn closed_items_render_nothing_and_track_nothing() {
        let (_, counts, scope) = setup();
        let mut items = Child::new(&scope, ChildProps::items());
        assert!(items.render().is_none());
        items.bind(Some(EL));
        items.update(ChildProps::items().with_active(false));
        assert!(items.render().is_none());
        assert!(!items.has_tracker());
        assert_eq!(counts.created.get(), 0);
    }

    #[test]
    fn trigger_renders_anchor_with_active_modifier() {
        let (_, _, scope) = setup();
        let mut trigger = Child::new(
            &scope,
            ChildProps::trigger()
                .class_name("btn")
                .attr("id", "menu-button")
                .attr("active", "true"),
        );
        let view = trigger.render().expect("trigger always renders");
        assert_eq!(view.tag, "a");
        assert_eq!(view.class_name, "btn");
        assert_eq!(view.attrs.get("id"), Some("menu-button"));
        assert!(view.attrs.get("active").is_none());
        assert!(view.on_activate.is_some());

        trigger.update(trigger.props().with_active(true));
        let view = trigger.render().expect("trigger always renders");
        assert_eq!(view.class_name, "btn child-active");
    }

    #[test]
    fn items_use_configured_prefix_and_tag() {
        let (_, _, scope) = setup();
        let mut items = Child::new(
            &scope,
            ChildProps::items().class_prefix("menu").tag_name("ul"),
        );
        items.update(items.props().with_active(true));
        let view = items.render().expect("open items render");
        assert_eq!(view.tag, "ul");
        assert_eq!(view.class_name, "menu-active");
        assert!(view.on_activate.is_none());
    }

    #[test]
    fn activation_filter_accepts_clicks_and_enter_only() {
        let (recorder, _, scope) = setup();
        let trigger = Child::new(&scope, ChildProps::trigger());
        assert!(trigger.handle_event(&InputEvent::click(EL)));
        assert!(trigger.handle_event(&InputEvent::key_up(EL, Key::Enter)));
        assert!(!trigger.handle_event(&InputEvent::key_up(EL, Key::Escape)));
        assert!(!trigger.handle_event(&InputEvent::key_up(EL, Key::Character('a'))));
        assert_eq!(recorder.triggers.get(), 2);

        let listener = trigger.activation_listener().expect("trigger has a listener");
        assert_eq!(listener(&InputEvent::key_up(EL, Key::Space)), Outcome::Continue);
        assert_eq!(listener(&InputEvent::click(EL)), Outcome::Continue);
        assert_eq!(recorder.triggers.get(), 3);
    }

    #[test]
    fn items_never_activate() {
        let (recorder, _, scope) = setup();
        let items = Child::new(&scope, ChildProps::items());
        assert!(!items.handle_event(&InputEvent::click(EL)));
        assert!(items.activation_listener().is_none());
        assert_eq!(recorder.triggers.get(), 0);
    }

    #[test]
    fn tracker_starts_on_open_and_stops_on_every_update() {
        let (recorder, counts, scope) = setup();
        let mut items = Child::new(&scope, ChildProps::items());
        items.bind(Some(EL));

        items.update(ChildProps::items().with_active(true));
        assert!(items.has_tracker());
        assert_eq!(counts.created.get(), 1);
        assert_eq!(counts.recalculated.get(), 1);
        assert_eq!(recorder.snapshots.borrow().len(), 1);

        // Same active flag: the tracker is stopped and not replaced.
        items.update(ChildProps::items().with_active(true));
        assert!(!items.has_tracker());
        assert_eq!(counts.created.get(), 1);
        assert_eq!(counts.stopped.get(), 1);

        items.update(ChildProps::items().with_active(false));
        items.bind(None);
        items.update(ChildProps::items().with_active(false));
        assert_eq!(counts.created.get(), 1);

        // Reopening starts a fresh one.
        items.bind(Some(EL));
        items.update(ChildProps::items().with_active(true));
        assert_eq!(counts.created.get(), 2);
        assert!(items.has_tracker());
    }

    #[test]
    fn open_without_element_is_a_no_op() {
        let (_, counts, scope) = setup();
        let mut items = Child::new(&scope, ChildProps::items());
        items.update(ChildProps::items().with_active(true));
        assert!(!items.has_tracker());
        assert_eq!(counts.created.get(), 0);
    }

    #[test]
    fn unmount_and_drop_stop_the_tracker() {
        let (_, counts, scope) = setup();
        let mut items = Child::new(&scope, ChildProps::items());
        items.bind(Some(EL));
        items.update(ChildProps::items().with_active(true));
        items.unmount();
        items.unmount();
        assert_eq!(counts.stopped.get(), 1);
        assert_eq!(items.element(), None);

        items.bind(Some(EL));
        items.update(ChildProps::items().with_active(false));
        items.update(ChildProps::items().with_active(true));
        drop(items);
        assert_eq!(counts.stopped.get(), 2);
    }

    #[test]
    fn role_is_fixed_at_construction() {
        let (_, _, scope) = setup();
        let mut trigger = Child::new(&scope, ChildProps::trigger());
        trigger.update(ChildProps::items().with_active(false));
        assert_eq!(trigger.role(), Role::Trigger);
        assert!(trigger.props().is_trigger);
        assert!(trigger.render().is_some());
    }

    #[test]
    fn attr_routes_option_names() {
        let props = ChildProps::items()
            .attr("isTrigger", "true")
            .attr("classPrefix", "x")
            .attr("tagName", "button")
            .attr("className", "base")
            .attr("data-id", "7");
        assert!(props.is_trigger);
        assert!(props.clone().attr("isTrigger", "nope").is_trigger);
        assert!(!props.clone().attr("isTrigger", "0").is_trigger);
        assert_eq!(props.class_prefix.as_deref(), Some("x"));
        assert_eq!(props.tag_name.as_deref(), Some("button"));
        assert_eq!(props.class_name.as_deref(), Some("base"));
        assert_eq!(props.attrs.len(), 1);
        assert!(!props.is_active());
    }
}
