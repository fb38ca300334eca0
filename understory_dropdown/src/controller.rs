// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dropdown controller.
//!
//! [`Dropdown`] owns the open/closed state, the corner visibility snapshot of
//! the items panel, and the document listeners used for outside dismissal.
//! Children reach it through a [`DropdownScope`], which carries the
//! [`DropdownContext`] interface and the tracker factory down the tree.
//!
//! ## State transitions
//!
//! - [`DropdownContext::on_trigger_event`] flips `active` (subject to
//!   [`TriggerPolicy`]). Opening resets the snapshot to [`Visibility::FULL`]
//!   and subscribes one capture-phase document listener for clicks and key
//!   releases; closing unsubscribes it.
//! - While open, a click outside both the trigger and the items panel closes
//!   the dropdown, as does `Escape` released outside the items panel.
//! - [`DropdownContext::on_visibility_update`] stores a new snapshot unless it
//!   equals the current one or reports every corner visible.
//!
//! Every state change bumps [`Dropdown::revision`] and runs the callback set
//! with [`Dropdown::set_on_change`], which is the host's cue to re-render.
//!
//! ## Registration
//!
//! The first child of each [`Role`] to register is wired; later ones are
//! ignored (with a warning in the log).

use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::attrs::{Attributes, class_names, parse_flag};
use crate::child::{ChildProps, ChildRef};
use crate::error::DropdownError;
use crate::host::{DocumentHost, Listener, TrackerFactory};
use crate::types::{EventKinds, InputEvent, Key, ListenerId, Outcome, Phase, Role, Visibility};

/// Default modifier prefix for the controller.
pub const DEFAULT_PREFIX: &str = "dropdown";

/// Interface children use to reach their controller.
pub trait DropdownContext {
    /// Register a child. The first registration per [`Role`] wins.
    fn register(&self, child: ChildRef);

    /// Report an accepted trigger activation.
    fn on_trigger_event(&self);

    /// Report a corner visibility snapshot of the items panel.
    fn on_visibility_update(&self, visibility: Visibility);
}

/// What an activation does while the dropdown is already open.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TriggerPolicy {
    /// The trigger toggles in both directions.
    #[default]
    Toggle,
    /// The trigger only opens; closing is left to outside clicks and `Escape`.
    OpenOnly,
}

/// Options of a [`Dropdown`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropdownProps {
    /// Initial open state.
    pub default_active: bool,
    /// Prefix for the `-active` and `-right` modifier classes.
    pub class_prefix: String,
    /// Element kind of the root.
    pub tag_name: String,
    /// Base class name, kept ahead of modifiers.
    pub class_name: Option<String>,
    /// Attributes passed through unmodified to the root element.
    pub attrs: Attributes,
    /// Behavior of activations while open.
    pub trigger_policy: TriggerPolicy,
    /// Reject non-child nodes in [`Dropdown::render`] instead of passing them through.
    ///
    /// Defaults to on in debug builds and off in release builds.
    pub strict_children: bool,
}

impl Default for DropdownProps {
    fn default() -> Self {
        Self {
            default_active: false,
            class_prefix: DEFAULT_PREFIX.into(),
            tag_name: "div".into(),
            class_name: None,
            attrs: Attributes::new(),
            trigger_policy: TriggerPolicy::default(),
            strict_children: cfg!(debug_assertions),
        }
    }
}

impl DropdownProps {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start open (or closed).
    pub fn default_active(mut self, active: bool) -> Self {
        self.default_active = active;
        self
    }

    /// Set the modifier class prefix.
    pub fn class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    /// Override the root element kind.
    pub fn tag_name(mut self, tag: impl Into<String>) -> Self {
        self.tag_name = tag.into();
        self
    }

    /// Set the base class name.
    pub fn class_name(mut self, class: impl Into<String>) -> Self {
        self.class_name = Some(class.into());
        self
    }

    /// Choose the trigger policy.
    pub fn trigger_policy(mut self, policy: TriggerPolicy) -> Self {
        self.trigger_policy = policy;
        self
    }

    /// Enable or disable strict child validation.
    pub fn strict_children(mut self, strict: bool) -> Self {
        self.strict_children = strict;
        self
    }

    /// Set an attribute by name.
    ///
    /// Option names (`defaultActive`, `classPrefix`, `tagName`, `className`)
    /// are routed to their typed fields; child-only names are dropped.
    /// Everything else is passed through.
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match name {
            "defaultActive" => match parse_flag(&value) {
                Some(flag) => self.default_active = flag,
                None => log::warn!("ignoring unrecognized `defaultActive` value {value:?}"),
            },
            "classPrefix" => self.class_prefix = value,
            "tagName" => self.tag_name = value,
            "className" | "class" => self.class_name = Some(value),
            "active" | "isTrigger" => {
                log::debug!("ignoring child option `{name}` on a dropdown root");
            }
            _ => {
                self.attrs.insert(name, value);
            }
        }
        self
    }
}

/// A node that is not a dropdown child.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignNode {
    /// Element kind, used in diagnostics.
    pub kind: String,
    /// Attributes of the node.
    pub attrs: Attributes,
    /// Open state propagated by [`Dropdown::render`] in lenient mode.
    pub active: bool,
}

/// A direct child handed to [`Dropdown::render`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropdownNode {
    /// A trigger or items panel.
    Child(ChildProps),
    /// Anything else; structural misuse.
    Foreign(ForeignNode),
}

impl From<ChildProps> for DropdownNode {
    fn from(props: ChildProps) -> Self {
        Self::Child(props)
    }
}

/// Root element description produced by [`Dropdown::render`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootView {
    /// Element kind.
    pub tag: String,
    /// Composed class name with `-active` and `-right` modifiers.
    pub class_name: String,
    /// Pass-through attributes.
    pub attrs: Attributes,
    /// Open state the children were rendered with.
    pub active: bool,
    /// Direct children, with the open state propagated into each child's props.
    pub children: Vec<DropdownNode>,
}

/// What children receive from their controller.
#[derive(Clone)]
pub struct DropdownScope {
    context: Rc<dyn DropdownContext>,
    trackers: Rc<dyn TrackerFactory>,
}

impl fmt::Debug for DropdownScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropdownScope").finish_non_exhaustive()
    }
}

impl DropdownScope {
    /// Bundle a controller interface with a tracker factory.
    pub fn new(context: Rc<dyn DropdownContext>, trackers: Rc<dyn TrackerFactory>) -> Self {
        Self { context, trackers }
    }

    /// The controller interface.
    pub fn context(&self) -> &Rc<dyn DropdownContext> {
        &self.context
    }

    /// The tracker factory for the items panel.
    pub fn trackers(&self) -> &Rc<dyn TrackerFactory> {
        &self.trackers
    }
}

#[derive(Debug)]
struct State {
    active: bool,
    visibility: Visibility,
    trigger: Option<ChildRef>,
    items: Option<ChildRef>,
    subscription: Option<ListenerId>,
    revision: u64,
    mounted: bool,
}

struct Inner {
    props: DropdownProps,
    document: Rc<dyn DocumentHost>,
    trackers: Rc<dyn TrackerFactory>,
    state: RefCell<State>,
    on_change: RefCell<Option<Rc<dyn Fn()>>>,
    this: Weak<Self>,
}

impl Inner {
    fn set_active(&self, active: bool) {
        {
            let mut state = self.state.borrow_mut();
            if !state.mounted || state.active == active {
                return;
            }
            state.active = active;
            if active {
                state.visibility = Visibility::FULL;
            }
            state.revision += 1;
        }
        log::debug!("dropdown {}", if active { "opened" } else { "closed" });
        self.subscribe(active);
        self.changed();
    }

    /// Attach or detach the document listener; at most one is ever attached.
    fn subscribe(&self, on: bool) {
        let current = self.state.borrow().subscription;
        match (on, current) {
            (true, None) => {
                let this = self.this.clone();
                let listener: Listener = Rc::new(move |event: &InputEvent| {
                    if let Some(inner) = this.upgrade() {
                        inner.on_document_event(event);
                    }
                    Outcome::Continue
                });
                let id = self.document.add_listener(
                    EventKinds::CLICK | EventKinds::KEY_UP,
                    Phase::Capture,
                    listener,
                );
                log::debug!("subscribed document listener {id:?}");
                self.state.borrow_mut().subscription = Some(id);
            }
            (false, Some(id)) => {
                self.state.borrow_mut().subscription = None;
                self.document.remove_listener(id);
                log::debug!("unsubscribed document listener {id:?}");
            }
            _ => {}
        }
    }

    fn on_document_event(&self, event: &InputEvent) {
        let (trigger, items) = {
            let state = self.state.borrow();
            if !state.active {
                return;
            }
            (
                state.trigger.as_ref().and_then(ChildRef::element),
                state.items.as_ref().and_then(ChildRef::element),
            )
        };
        // Without a mounted panel there is nothing to dismiss against.
        let Some(items) = items else {
            return;
        };
        let target = event.target();
        let outside_items = !self.document.contains(items, target);
        let dismiss = match event {
            InputEvent::Click { .. } => {
                // The trigger's own activation governs clicks on it.
                let on_trigger = trigger.is_some_and(|t| self.document.contains(t, target));
                outside_items && !on_trigger
            }
            InputEvent::KeyUp { key, .. } => *key == Key::Escape && outside_items,
        };
        if dismiss {
            self.set_active(false);
        }
    }

    fn changed(&self) {
        let callback = self.on_change.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl DropdownContext for Inner {
    fn register(&self, child: ChildRef) {
        let mut state = self.state.borrow_mut();
        let slot = match child.role() {
            Role::Trigger => &mut state.trigger,
            Role::Items => &mut state.items,
        };
        if slot.is_some() {
            log::warn!(
                "a {:?} child is already registered with this dropdown; ignoring the new one",
                child.role()
            );
            return;
        }
        log::trace!("registered {:?} child", child.role());
        *slot = Some(child);
    }

    fn on_trigger_event(&self) {
        let active = self.state.borrow().active;
        if active && self.props.trigger_policy == TriggerPolicy::OpenOnly {
            log::trace!("trigger activation ignored while open");
            return;
        }
        self.set_active(!active);
    }

    fn on_visibility_update(&self, visibility: Visibility) {
        {
            let mut state = self.state.borrow_mut();
            if !state.active {
                log::trace!("visibility ignored while closed: {visibility:?}");
                return;
            }
            if visibility == state.visibility || visibility.is_fully_visible() {
                log::trace!("visibility unchanged or fully visible: {visibility:?}");
                return;
            }
            log::trace!("visibility changed: {visibility:?}");
            state.visibility = visibility;
            state.revision += 1;
        }
        self.changed();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(id) = self.state.get_mut().subscription.take() {
            self.document.remove_listener(id);
        }
    }
}

/// The dropdown controller.
///
/// Cloning a `Dropdown` yields another handle to the same controller.
///
/// ```
/// use std::rc::Rc;
/// use understory_dropdown::document::Document;
/// use understory_dropdown::tracker::ViewportTrackers;
/// use understory_dropdown::{Child, ChildProps, Dropdown, DropdownContext, DropdownProps};
///
/// let doc = Rc::new(Document::new());
/// let dropdown = Dropdown::new(
///     DropdownProps::new(),
///     doc.clone(),
///     Rc::new(ViewportTrackers::new(doc.clone())),
/// );
/// let scope = dropdown.scope();
/// let trigger = Child::new(&scope, ChildProps::trigger());
///
/// dropdown.on_trigger_event();
/// assert!(dropdown.is_active());
/// assert!(dropdown.trigger().is_some_and(|t| t.ptr_eq(&trigger.handle())));
/// ```
#[derive(Clone)]
pub struct Dropdown {
    inner: Rc<Inner>,
}

impl fmt::Debug for Dropdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dropdown")
            .field("props", &self.inner.props)
            .field("state", &self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Dropdown {
    /// Create a controller.
    ///
    /// If `props.default_active` is set the dropdown starts open and its
    /// document listener is attached immediately.
    pub fn new(
        props: DropdownProps,
        document: Rc<dyn DocumentHost>,
        trackers: Rc<dyn TrackerFactory>,
    ) -> Self {
        let active = props.default_active;
        let inner = Rc::new_cyclic(|this| Inner {
            props,
            document,
            trackers,
            state: RefCell::new(State {
                active,
                visibility: Visibility::FULL,
                trigger: None,
                items: None,
                subscription: None,
                revision: 0,
                mounted: true,
            }),
            on_change: RefCell::new(None),
            this: this.clone(),
        });
        if active {
            inner.subscribe(true);
        }
        Self { inner }
    }

    /// The scope to construct children in.
    pub fn scope(&self) -> DropdownScope {
        DropdownScope::new(self.context(), self.inner.trackers.clone())
    }

    /// This controller as a [`DropdownContext`].
    pub fn context(&self) -> Rc<dyn DropdownContext> {
        self.inner.clone()
    }

    /// Options the controller was created with.
    pub fn props(&self) -> &DropdownProps {
        &self.inner.props
    }

    /// Whether the panel is open.
    pub fn is_active(&self) -> bool {
        self.inner.state.borrow().active
    }

    /// Last corner visibility snapshot of the items panel.
    pub fn visibility(&self) -> Visibility {
        self.inner.state.borrow().visibility
    }

    /// Returns `true` if the open panel is clipped on the right and should be realigned.
    pub fn is_flipped_right(&self) -> bool {
        let state = self.inner.state.borrow();
        state.active && state.visibility.is_clipped_right()
    }

    /// Counter bumped on every state change.
    pub fn revision(&self) -> u64 {
        self.inner.state.borrow().revision
    }

    /// The registered trigger, if any.
    pub fn trigger(&self) -> Option<ChildRef> {
        self.inner.state.borrow().trigger.clone()
    }

    /// The registered items panel, if any.
    pub fn items(&self) -> Option<ChildRef> {
        self.inner.state.borrow().items.clone()
    }

    /// Returns `true` while the document listener is attached.
    pub fn is_subscribed(&self) -> bool {
        self.inner.state.borrow().subscription.is_some()
    }

    /// Set the callback run after every state change.
    pub fn set_on_change(&self, callback: impl Fn() + 'static) {
        *self.inner.on_change.borrow_mut() = Some(Rc::new(callback));
    }

    /// Open or close the dropdown directly.
    ///
    /// Does nothing if the state already matches or the dropdown is unmounted.
    pub fn set_active(&self, active: bool) {
        self.inner.set_active(active);
    }

    /// Describe the root element and propagate the open state into `children`.
    ///
    /// Each [`DropdownNode::Child`] gets a copy of its props with `active`
    /// overridden. A [`DropdownNode::Foreign`] node is rejected with
    /// [`DropdownError::InvalidChild`] when
    /// [`strict_children`](DropdownProps::strict_children) is set, and passed
    /// through with only its `active` flag overridden otherwise.
    pub fn render(
        &self,
        children: impl IntoIterator<Item = DropdownNode>,
    ) -> Result<RootView, DropdownError> {
        let props = &self.inner.props;
        let (active, flip) = {
            let state = self.inner.state.borrow();
            (state.active, state.active && state.visibility.is_clipped_right())
        };
        let children = children
            .into_iter()
            .enumerate()
            .map(|(index, node)| match node {
                DropdownNode::Child(child) => Ok(DropdownNode::Child(child.with_active(active))),
                DropdownNode::Foreign(foreign) if props.strict_children => {
                    Err(DropdownError::InvalidChild {
                        index,
                        kind: foreign.kind,
                    })
                }
                DropdownNode::Foreign(foreign) => {
                    log::warn!("invalid dropdown child at position {index}: `{}`", foreign.kind);
                    Ok(DropdownNode::Foreign(ForeignNode { active, ..foreign }))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let prefix = &props.class_prefix;
        Ok(RootView {
            tag: props.tag_name.clone(),
            class_name: class_names(
                props.class_name.as_deref(),
                [
                    (format!("{prefix}-active"), active),
                    (format!("{prefix}-right"), flip),
                ],
            ),
            attrs: props.attrs.clone(),
            active,
            children,
        })
    }

    /// Detach the document listener and stop reacting to events.
    ///
    /// Safe to call more than once; also happens when the last handle is dropped.
    pub fn unmount(&self) {
        self.inner.subscribe(false);
        self.inner.state.borrow_mut().mounted = false;
    }
}

impl DropdownContext for Dropdown {
    fn register(&self, child: ChildRef) {
        self.inner.register(child);
    }

    fn on_trigger_event(&self) {
        self.inner.on_trigger_event();
    }

    fn on_visibility_update(&self, visibility: Visibility) {
        self.inner.on_visibility_update(visibility);
    }
}
