//! Action identifiers used to route packages to handlers.

use std::{fmt, hash::Hash};

/// Numeric identifier carried by every package on the wire.
///
/// `ActionId(0)` is reserved: a reply addressed to it is never sent.
///
/// ```
/// use wirelink::ActionId;
///
/// assert_eq!(ActionId::new(7).to_string(), "7");
/// assert!(ActionId::NONE.is_none());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u32);

impl ActionId {
    /// The reserved "no reply expected" identifier.
    pub const NONE: ActionId = ActionId(0);

    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: u32) -> Self { Self(id) }

    /// Return the raw `u32` value.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }

    /// Whether this is the reserved identifier.
    #[must_use]
    pub const fn is_none(self) -> bool { self.0 == 0 }
}

impl From<u32> for ActionId {
    fn from(value: u32) -> Self { Self(value) }
}

impl From<ActionId> for u32 {
    fn from(value: ActionId) -> Self { value.0 }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// An application-level message kind.
///
/// The name is diagnostic only; two actions are equal when their ids match.
///
/// ```
/// use wirelink::Action;
///
/// let login = Action::new(1, "login");
/// assert_eq!(login.to_string(), "1:login");
/// assert_eq!(login, Action::new(1, "renamed"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Action {
    id: ActionId,
    name: String,
}

impl Action {
    /// Create an action from an id and a diagnostic name.
    #[must_use]
    pub fn new(id: impl Into<ActionId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// An action that suppresses replies.
    #[must_use]
    pub fn none() -> Self { Self::default() }

    #[must_use]
    pub const fn id(&self) -> ActionId { self.id }

    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Whether a reply addressed to this action should be sent.
    #[must_use]
    pub const fn expects_reply(&self) -> bool { !self.id.is_none() }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for Action {}

impl Hash for Action {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { self.id.hash(state); }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.name)
    }
}
