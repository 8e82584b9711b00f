//! Debounced coalescing of rapid edits
//!
//! Property forms fire on every keystroke. [`debounce`] turns such a burst
//! into one value: the quiet-period timer restarts on every input, and only
//! the last value is emitted once the window passes without input. A settled
//! value equal to the previously emitted one (or to the seed) is dropped.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::constants::FORM_INPUT_DEBOUNCE;
use crate::types::PropertyBag;

/// Buffer size of the input and output channels
const CHANNEL_BUFFER: usize = 64;

/// Debounce a channel of values
///
/// `seed` is the value consumers already have (e.g. the operator's current
/// properties). The returned receiver closes once `input` closes and any
/// pending value has been flushed. Must be called inside a tokio runtime.
pub fn debounce<T>(mut input: mpsc::Receiver<T>, window: Duration, seed: Option<T>) -> mpsc::Receiver<T>
where
    T: PartialEq + Clone + Send + 'static,
{
    let (output, rx) = mpsc::channel(CHANNEL_BUFFER);

    tokio::spawn(async move {
        let mut last_emitted = seed;

        while let Some(mut pending) = input.recv().await {
            let input_closed = loop {
                tokio::select! {
                    next = input.recv() => match next {
                        Some(value) => pending = value,
                        None => break true,
                    },
                    _ = tokio::time::sleep(window) => break false,
                }
            };

            if last_emitted.as_ref() == Some(&pending) {
                log::trace!("Settled value unchanged, not emitting");
            } else {
                if output.send(pending.clone()).await.is_err() {
                    return;
                }
                last_emitted = Some(pending);
            }

            if input_closed {
                return;
            }
        }
    });

    rx
}

/// Channel pair for a property form
///
/// Push every form change into the sender; the receiver yields settled
/// property bags that differ from `current` and from each other.
pub fn form_input_channel(current: PropertyBag) -> (mpsc::Sender<PropertyBag>, mpsc::Receiver<PropertyBag>) {
    let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
    (tx, debounce(rx, FORM_INPUT_DEBOUNCE, Some(current)))
}
