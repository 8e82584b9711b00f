//! Event types and channels for graph and canvas changes
//!
//! Producers publish on an [`EventChannel`], a multicast broadcast channel
//! that never blocks the producer. Consumers hold an [`EventStream`], which
//! sees every event published after it subscribed and can narrow a channel
//! down to a single concern (e.g. only operator deletions).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::constants;
use crate::types::{Link, Operator, OperatorId, Point};

/// Semantic graph changes, emitted by the workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphEvent {
    /// An operator was inserted
    OperatorAdded { operator: Operator },

    /// An operator was removed (after all of its links)
    OperatorDeleted { operator: Operator },

    /// A link was inserted
    LinkAdded { link: Link },

    /// A link was removed
    LinkDeleted { link: Link },

    /// An operator's property bag was replaced with a different value
    #[serde(rename_all = "camelCase")]
    PropertyChanged {
        old_operator: Operator,
        new_operator: Operator,
    },

    /// An operator's advanced-options flag flipped
    #[serde(rename_all = "camelCase")]
    AdvancedToggled {
        operator_id: OperatorId,
        show_advanced: bool,
    },
}

impl GraphEvent {
    /// Operator deleted by this event, if any
    pub fn deleted_operator(self) -> Option<Operator> {
        match self {
            Self::OperatorDeleted { operator } => Some(operator),
            _ => None,
        }
    }

    /// Link deleted by this event, if any
    pub fn deleted_link(self) -> Option<Link> {
        match self {
            Self::LinkDeleted { link } => Some(link),
            _ => None,
        }
    }

    /// Old and new operator of a property change, if any
    pub fn property_change(self) -> Option<(Operator, Operator)> {
        match self {
            Self::PropertyChanged {
                old_operator,
                new_operator,
            } => Some((old_operator, new_operator)),
            _ => None,
        }
    }
}

/// Canvas-side changes, emitted by the visual graph adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VisualEvent {
    #[serde(rename_all = "camelCase")]
    OperatorCellAdded { operator_id: OperatorId, position: Point },

    #[serde(rename_all = "camelCase")]
    OperatorCellDeleted { operator_id: OperatorId },

    LinkCellAdded { link: Link },

    LinkCellDeleted { link: Link },

    #[serde(rename_all = "camelCase")]
    OperatorMoved { operator_id: OperatorId, position: Point },

    #[serde(rename_all = "camelCase")]
    Highlighted { operator_id: OperatorId },

    #[serde(rename_all = "camelCase")]
    Unhighlighted { operator_id: OperatorId },

    ZoomChanged { ratio: f64 },

    PanChanged { offset: Point },

    /// Zoom and pan were reset together
    ViewportRestored { zoom: f64, offset: Point },
}

impl VisualEvent {
    pub fn highlighted(self) -> Option<OperatorId> {
        match self {
            Self::Highlighted { operator_id } => Some(operator_id),
            _ => None,
        }
    }

    pub fn unhighlighted(self) -> Option<OperatorId> {
        match self {
            Self::Unhighlighted { operator_id } => Some(operator_id),
            _ => None,
        }
    }

    pub fn zoom(self) -> Option<f64> {
        match self {
            Self::ZoomChanged { ratio } => Some(ratio),
            _ => None,
        }
    }

    pub fn restored(self) -> Option<(f64, Point)> {
        match self {
            Self::ViewportRestored { zoom, offset } => Some((zoom, offset)),
            _ => None,
        }
    }

    pub fn deleted_operator_cell(self) -> Option<OperatorId> {
        match self {
            Self::OperatorCellDeleted { operator_id } => Some(operator_id),
            _ => None,
        }
    }

    pub fn deleted_link_cell(self) -> Option<Link> {
        match self {
            Self::LinkCellDeleted { link } => Some(link),
            _ => None,
        }
    }
}

/// Result of validating one operator after a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationEvent {
    pub operator_id: OperatorId,
    pub valid: bool,
}

/// Multicast channel for one event type
pub struct EventChannel<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> EventChannel<E> {
    pub fn new() -> Self {
        Self::with_capacity(constants::events::CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to every current subscriber
    ///
    /// Publishing with no subscribers is not an error.
    pub fn emit(&self, event: E) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to every event published from now on
    pub fn subscribe(&self) -> EventStream<E, E> {
        EventStream::new(self.sender.subscribe(), Some)
    }

    /// Subscribe to the events `select` maps to `Some`
    pub fn subscribe_filtered<T>(&self, select: fn(E) -> Option<T>) -> EventStream<E, T> {
        EventStream::new(self.sender.subscribe(), select)
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<E: Clone> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber side of an [`EventChannel`], optionally narrowed by a selector
pub struct EventStream<E, T> {
    receiver: broadcast::Receiver<E>,
    select: fn(E) -> Option<T>,
}

impl<E: Clone, T> EventStream<E, T> {
    fn new(receiver: broadcast::Receiver<E>, select: fn(E) -> Option<T>) -> Self {
        Self { receiver, select }
    }

    /// Next already-published matching event, without waiting
    pub fn try_next(&mut self) -> Option<T> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if let Some(item) = (self.select)(event) {
                        return Some(item);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("Event subscriber lagged, {} events dropped", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next matching event; `None` once the channel is gone
    pub async fn next(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if let Some(item) = (self.select)(event) {
                        return Some(item);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Event subscriber lagged, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// All matching events published so far
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
