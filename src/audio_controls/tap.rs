//! Ring-buffer bridge from synchronous signal dispatch to a polling consumer.
//!
//! Sources usually signal from the audio thread. A UI that should not run inside
//! that dispatch can [`tap`] a fader or volmeter handler and poll the resulting
//! [`SignalReceiver`] at its own pace. The audio side never blocks: when the ring
//! is full the payload is dropped and counted. Dropping the receiver disconnects
//! the tap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rtrb::{Consumer, RingBuffer};

use crate::audio_controls::errors::ControlError;
use crate::audio_controls::signal::{ListenerId, Signal, SignalHandler, WeakSignalHandler};

/// Consumer end of a signal tap.
pub struct SignalReceiver<S> {
    consumer: Consumer<S>,
    listener: ListenerId,
    name: String,
    handler: WeakSignalHandler<S>,
    dropped: Arc<AtomicU64>,
}

/// Connects a ring buffer of `capacity` slots to the signal `name` on `handler`.
///
/// # Returns
///
/// - `Ok(SignalReceiver)`: Receiver for every payload signalled from now on
/// - `Err(ControlError)`: `name` is not registered on `handler`
pub fn tap<S>(
    handler: &SignalHandler<S>,
    name: &str,
    capacity: usize,
) -> Result<SignalReceiver<S>, ControlError>
where
    S: Signal + Clone,
{
    let (producer, consumer) = RingBuffer::new(capacity.max(1));
    let producer = Mutex::new(producer);
    let dropped = Arc::new(AtomicU64::new(0));
    let listener = ListenerId::next();

    let counter = Arc::clone(&dropped);
    handler.connect(name, listener, move |signal: &S| {
        let mut producer = producer.lock().unwrap_or_else(PoisonError::into_inner);
        if producer.is_abandoned() {
            return;
        }

        if producer.push(signal.clone()).is_err() {
            let total = counter.fetch_add(1, Ordering::Relaxed) + 1;
            if total == 1 {
                log::warn!("Signal tap {listener} is full, dropping \"{}\"", signal.name());
            } else {
                log::trace!("Signal tap {listener} dropped {total} payloads");
            }
        }
    })?;

    Ok(SignalReceiver {
        consumer,
        listener,
        name: name.to_string(),
        handler: handler.downgrade(),
        dropped,
    })
}

impl<S: Signal> SignalReceiver<S> {
    /// Takes the oldest pending payload.
    pub fn poll(&mut self) -> Option<S> {
        self.consumer.pop().ok()
    }

    /// Takes every pending payload, oldest first.
    pub fn drain(&mut self) -> Vec<S> {
        std::iter::from_fn(|| self.poll()).collect()
    }

    /// Discards everything but the newest pending payload and returns it.
    pub fn latest(&mut self) -> Option<S> {
        std::iter::from_fn(|| self.poll()).last()
    }

    /// Number of payloads dropped because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Identity the tap is connected under.
    pub fn listener(&self) -> ListenerId {
        self.listener
    }

    /// Disconnects the tap, returning `false` if the handler is already gone.
    pub fn close(self) -> bool {
        self.handler.disconnect(&self.name, self.listener)
    }
}

impl<S> Drop for SignalReceiver<S> {
    fn drop(&mut self) {
        self.handler.disconnect(&self.name, self.listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_controls::constants::DEFAULT_TAP_CAPACITY;
    use crate::audio_controls::curves::FaderType;
    use crate::audio_controls::fader::Fader;
    use crate::audio_controls::source::{AudioSource, MemorySource};
    use crate::audio_controls::volmeter::Volmeter;
    use crate::messages::{FaderSignal, SIGNAL_LEVELS_UPDATED, SIGNAL_VOLUME_CHANGED};
    use std::thread;

    #[test]
    fn test_tap_unknown_signal() {
        let fader = Fader::new(FaderType::Cubic).unwrap();
        let result = tap(fader.signal_handler(), "levels", 4);

        assert!(matches!(result, Err(ControlError::UnknownSignal(_))));
    }

    #[test]
    fn test_tap_preserves_order() {
        let source = Arc::new(MemorySource::new().unwrap());
        let fader = Fader::new(FaderType::Cubic).unwrap();
        fader.attach_source(&source).unwrap();
        let mut receiver =
            tap(fader.signal_handler(), SIGNAL_VOLUME_CHANGED, DEFAULT_TAP_CAPACITY).unwrap();

        for mul in [0.5, 0.25, 0.125] {
            source.set_volume(mul);
        }

        let received: Vec<f32> = receiver.drain().iter().map(FaderSignal::db).collect();
        assert_eq!(received.len(), 3);
        assert!(received.windows(2).all(|pair| pair[1] < pair[0]));
        assert!(receiver.poll().is_none());
    }

    #[test]
    fn test_tap_counts_overflow() {
        let source = Arc::new(MemorySource::new().unwrap());
        let fader = Fader::new(FaderType::Cubic).unwrap();
        fader.attach_source(&source).unwrap();
        let mut receiver = tap(fader.signal_handler(), SIGNAL_VOLUME_CHANGED, 2).unwrap();

        for mul in [0.9, 0.8, 0.7, 0.6] {
            source.set_volume(mul);
        }

        assert_eq!(receiver.dropped(), 2);
        assert_eq!(receiver.drain().len(), 2);
    }

    #[test]
    fn test_latest_keeps_newest() {
        let source = Arc::new(MemorySource::new().unwrap());
        let volmeter = Volmeter::new(FaderType::Iec).unwrap();
        volmeter.attach_source(&source).unwrap();
        let mut receiver = tap(volmeter.signal_handler(), SIGNAL_LEVELS_UPDATED, 8).unwrap();

        source.emit_levels(0.1, 0.1, 0.1);
        source.emit_levels(1.0, 1.0, 1.0);

        let latest = receiver.latest().unwrap();
        assert_eq!(latest.levels(), (1.0, 1.0, 1.0));
        assert!(receiver.latest().is_none());
    }

    #[test]
    fn test_close_disconnects() {
        let volmeter = Volmeter::new(FaderType::Log).unwrap();
        let receiver = tap(volmeter.signal_handler(), SIGNAL_LEVELS_UPDATED, 8).unwrap();
        assert_eq!(volmeter.signal_handler().connection_count(SIGNAL_LEVELS_UPDATED), 1);

        assert!(receiver.close());
        assert_eq!(volmeter.signal_handler().connection_count(SIGNAL_LEVELS_UPDATED), 0);
    }

    #[test]
    fn test_dropped_receiver_disconnects() {
        let source = Arc::new(MemorySource::new().unwrap());
        let volmeter = Volmeter::new(FaderType::Log).unwrap();
        volmeter.attach_source(&source).unwrap();

        for _ in 0..100 {
            let receiver = tap(volmeter.signal_handler(), SIGNAL_LEVELS_UPDATED, 1).unwrap();
            drop(receiver);
        }
        assert_eq!(volmeter.signal_handler().connection_count(SIGNAL_LEVELS_UPDATED), 0);

        source.emit_levels(0.5, 0.5, 0.5);
    }

    #[test]
    fn test_receiver_outlives_handler() {
        let fader = Fader::new(FaderType::Iec).unwrap();
        let receiver = tap(fader.signal_handler(), SIGNAL_VOLUME_CHANGED, 4).unwrap();

        drop(fader);

        assert!(!receiver.close());
    }

    #[test]
    fn test_levels_cross_threads() {
        let source = Arc::new(MemorySource::new().unwrap());
        let volmeter = Volmeter::new(FaderType::Cubic).unwrap();
        volmeter.attach_source(&source).unwrap();
        let mut receiver = tap(volmeter.signal_handler(), SIGNAL_LEVELS_UPDATED, 128).unwrap();

        let audio_source = Arc::clone(&source);
        thread::spawn(move || {
            for _ in 0..100 {
                audio_source.emit_levels(0.5, 0.5, 0.5);
            }
        })
        .join()
        .unwrap();

        assert_eq!(receiver.drain().len(), 100);
        assert_eq!(receiver.dropped(), 0);
    }
}
