// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types shared by the controller, its children, and the host seams.

use alloc::string::String;

/// Identifier for a rendered element (generational).
///
/// Elements are owned by the host. The dropdown only stores these handles
/// for containment checks and tracker attachment; a stale handle is never
/// an error, it simply stops matching.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElementId(pub(crate) u32, pub(crate) u32);

impl ElementId {
    /// Create an element identifier from a slot index and a generation.
    ///
    /// Hosts that keep their own element storage use this to mint handles.
    pub const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// Generation of the slot this identifier refers to.
    pub const fn generation(self) -> u32 {
        self.1
    }
}

/// Role of a dropdown child, fixed at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The element that opens and closes the panel.
    Trigger,
    /// The panel itself, present only while the dropdown is open.
    Items,
}

impl Role {
    /// Role selected by the `isTrigger` option.
    pub const fn from_is_trigger(is_trigger: bool) -> Self {
        if is_trigger { Self::Trigger } else { Self::Items }
    }
}

/// Corner visibility snapshot of the items panel.
///
/// Each flag says whether that corner of the panel's bounding box lies within
/// the viewport.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Visibility {
    /// Top-left corner is on screen.
    pub top_left: bool,
    /// Top-right corner is on screen.
    pub top_right: bool,
    /// Bottom-left corner is on screen.
    pub bottom_left: bool,
    /// Bottom-right corner is on screen.
    pub bottom_right: bool,
}

impl Visibility {
    /// All four corners visible.
    pub const FULL: Self = Self {
        top_left: true,
        top_right: true,
        bottom_left: true,
        bottom_right: true,
    };

    /// Returns `true` if no corner is clipped.
    pub const fn is_fully_visible(&self) -> bool {
        self.top_left && self.top_right && self.bottom_left && self.bottom_right
    }

    /// Returns `true` if both right-hand corners are off screen.
    ///
    /// This is the condition under which an open panel should be realigned.
    pub const fn is_clipped_right(&self) -> bool {
        !self.top_right && !self.bottom_right
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::FULL
    }
}

/// A keyboard key, decoded at the event source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// The Enter/Return key.
    Enter,
    /// The Escape key.
    Escape,
    /// The Tab key.
    Tab,
    /// The space bar.
    Space,
    /// A key producing a single printable character.
    Character(char),
    /// Any other named key, kept verbatim.
    Named(String),
}

impl Key {
    /// Decode a DOM-style key name (`KeyboardEvent.key`).
    ///
    /// ```
    /// use understory_dropdown::Key;
    ///
    /// assert_eq!(Key::from_name("Enter"), Key::Enter);
    /// assert_eq!(Key::from_name("Esc"), Key::Escape);
    /// assert_eq!(Key::from_name("a"), Key::Character('a'));
    /// assert_eq!(Key::from_name("F5"), Key::Named("F5".into()));
    /// ```
    pub fn from_name(name: &str) -> Self {
        match name {
            "Enter" => Self::Enter,
            // Older engines report "Esc".
            "Escape" | "Esc" => Self::Escape,
            "Tab" => Self::Tab,
            " " | "Spacebar" => Self::Space,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Character(c),
                    _ => Self::Named(name.into()),
                }
            }
        }
    }
}

bitflags::bitflags! {
    /// Kinds of input events a listener is interested in.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EventKinds: u8 {
        /// Pointer click (any button, any origin).
        const CLICK  = 0b0000_0001;
        /// Key released.
        const KEY_UP = 0b0000_0010;
    }
}

/// An input event, discriminated by kind at the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// A click on `target`.
    Click {
        /// Innermost element under the pointer.
        target: ElementId,
    },
    /// A key released while `target` had focus.
    KeyUp {
        /// Focused element.
        target: ElementId,
        /// Decoded key.
        key: Key,
    },
}

impl InputEvent {
    /// Convenience constructor for a click.
    pub const fn click(target: ElementId) -> Self {
        Self::Click { target }
    }

    /// Convenience constructor for a key release.
    pub const fn key_up(target: ElementId, key: Key) -> Self {
        Self::KeyUp { target, key }
    }

    /// The element the event is aimed at.
    pub const fn target(&self) -> ElementId {
        match self {
            Self::Click { target } | Self::KeyUp { target, .. } => *target,
        }
    }

    /// The kind flag matching this event.
    pub const fn kind(&self) -> EventKinds {
        match self {
            Self::Click { .. } => EventKinds::CLICK,
            Self::KeyUp { .. } => EventKinds::KEY_UP,
        }
    }

    /// The decoded key, for keyboard events.
    pub const fn key(&self) -> Option<&Key> {
        match self {
            Self::Click { .. } => None,
            Self::KeyUp { key, .. } => Some(key),
        }
    }
}

/// Propagation phase of a listener.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Root → target, before the target sees the event.
    Capture,
    /// At the target element.
    Target,
    /// Target → root, after the target.
    Bubble,
}

/// Listener result controlling propagation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Keep propagating.
    #[default]
    Continue,
    /// Stop propagation immediately; no later listeners run.
    Stop,
}

/// Handle for a subscribed listener, used to unsubscribe it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);
