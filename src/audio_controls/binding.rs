//! Attach/detach glue shared by faders and volmeters.

use std::sync::{Arc, Weak};

use crate::audio_controls::errors::ControlError;
use crate::audio_controls::signal::ListenerId;
use crate::audio_controls::source::AudioSource;
use crate::messages::SourceSignal;

/// Non-owning reference to an attached source.
pub(crate) type SourceRef = Weak<dyn AudioSource>;

/// The attachment slot of a fader or volmeter, guarded by the owner's mutex.
#[derive(Default)]
pub(crate) struct SourceSlot {
    source: Option<SourceRef>,
}

impl SourceSlot {
    /// Upgrades the attached source, if it is still alive.
    pub fn get(&self) -> Option<Arc<dyn AudioSource>> {
        self.source.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_attached(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.strong_count() > 0)
    }

    pub fn set(&mut self, source: SourceRef) {
        self.source = Some(source);
    }

    pub fn take(&mut self) -> Option<SourceRef> {
        self.source.take()
    }
}

/// Connects `owner` to every signal in `names` on the source's handler.
///
/// Listeners hold `owner` weakly, so a dropped owner stops receiving without
/// having to disconnect first. If any connection fails, the ones already made
/// are undone.
pub(crate) fn connect_listeners<T>(
    source: &dyn AudioSource,
    listener: ListenerId,
    owner: &Arc<T>,
    names: &[&'static str],
    on_signal: fn(&T, &SourceSignal),
) -> Result<(), ControlError>
where
    T: Send + Sync + 'static,
{
    let handler = source.signal_handler();

    for (index, name) in names.iter().enumerate() {
        let owner = Arc::downgrade(owner);
        let result = handler.connect(name, listener, move |signal| {
            if let Some(owner) = owner.upgrade() {
                on_signal(&owner, signal);
            }
        });

        if let Err(err) = result {
            for connected in &names[..index] {
                handler.disconnect(connected, listener);
            }
            return Err(err);
        }
    }

    Ok(())
}

/// Disconnects `listener` from every signal in `names`, if the source still exists.
pub(crate) fn disconnect_listeners(
    source: &SourceRef,
    listener: ListenerId,
    names: &[&'static str],
) {
    let Some(source) = source.upgrade() else {
        return;
    };

    let handler = source.signal_handler();
    for name in names {
        handler.disconnect(name, listener);
    }
}
