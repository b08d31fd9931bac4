//! Action routing table.

use std::{marker::PhantomData, sync::Arc};

use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};

use super::ServiceError;
use crate::{Action, ActionId, data::DataBuilder};

/// What a handler asks the dispatcher to send back.
///
/// A reply addressed to an action with id `0` is not sent.
///
/// ```
/// use wirelink::{Action, service::Reply};
///
/// let reply = Reply::to(Action::new(2, "pong"), "ok");
/// assert_eq!(reply.action().id().get(), 2);
/// assert!(!Reply::<()>::none().action().expects_reply());
/// ```
#[derive(Clone, Debug)]
pub struct Reply<R = ()> {
    action: Action,
    data: Option<R>,
}

impl<R> Reply<R> {
    /// Reply with `data` addressed to `action`.
    #[must_use]
    pub fn to(action: Action, data: R) -> Self {
        Self {
            action,
            data: Some(data),
        }
    }

    /// Reply with an empty payload.
    #[must_use]
    pub fn empty(action: Action) -> Self { Self { action, data: None } }

    /// Do not reply.
    #[must_use]
    pub fn none() -> Self {
        Self {
            action: Action::none(),
            data: None,
        }
    }

    #[must_use]
    pub fn action(&self) -> &Action { &self.action }

    #[must_use]
    pub fn data(&self) -> Option<&R> { self.data.as_ref() }
}

/// A reply whose data has been serialized but not yet packaged.
pub(crate) struct ReplyPayload {
    pub(crate) action: Action,
    pub(crate) payload: Vec<u8>,
}

/// Type-erased `{factory, handler}` pair.
pub(crate) trait Route<D>: Send + Sync {
    fn action(&self) -> &Action;

    /// Decode `payload` into a fresh value, run the handler and serialize its
    /// reply. `None` means no reply is due.
    fn call(&self, data: &D, payload: &[u8]) -> Result<Option<ReplyPayload>, ServiceError>;
}

pub(crate) struct HandlerRoute<T, R, F, H> {
    action: Action,
    factory: F,
    handler: H,
    _types: PhantomData<fn(T) -> R>,
}

impl<T, R, F, H> HandlerRoute<T, R, F, H> {
    pub(crate) fn new(action: Action, factory: F, handler: H) -> Self {
        Self {
            action,
            factory,
            handler,
            _types: PhantomData,
        }
    }
}

impl<D, T, R, F, H> Route<D> for HandlerRoute<T, R, F, H>
where
    D: DataBuilder,
    T: DeserializeOwned,
    R: Serialize,
    F: Fn() -> T + Send + Sync,
    H: Fn(T) -> Reply<R> + Send + Sync,
{
    fn action(&self) -> &Action { &self.action }

    fn call(&self, data: &D, payload: &[u8]) -> Result<Option<ReplyPayload>, ServiceError> {
        let mut value = (self.factory)();
        data.unpack_into(payload, &mut value)
            .map_err(|source| ServiceError::UnpackData {
                action: self.action.clone(),
                source,
            })?;

        let Reply { action, data: reply } = (self.handler)(value);
        if !action.expects_reply() {
            return Ok(None);
        }
        let payload = match reply {
            Some(reply) => data.pack(&reply).map_err(|source| ServiceError::PackData {
                action: action.clone(),
                source,
            })?,
            None => Vec::new(),
        };
        Ok(Some(ReplyPayload { action, payload }))
    }
}

/// Concurrent map from action id to route. Last insert for an id wins.
pub(crate) struct Registry<D>(DashMap<ActionId, Arc<dyn Route<D>>>);

impl<D> Default for Registry<D> {
    fn default() -> Self { Self(DashMap::new()) }
}

impl<D> Registry<D> {
    pub(crate) fn insert(&self, route: Arc<dyn Route<D>>) {
        self.0.insert(route.action().id(), route);
    }

    pub(crate) fn remove(&self, id: ActionId) -> bool { self.0.remove(&id).is_some() }

    /// Clone the route out so no shard lock is held while it runs.
    pub(crate) fn get(&self, id: ActionId) -> Option<Arc<dyn Route<D>>> {
        self.0.get(&id).map(|route| Arc::clone(route.value()))
    }

    pub(crate) fn len(&self) -> usize { self.0.len() }
}
