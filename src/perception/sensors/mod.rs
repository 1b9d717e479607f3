//! Sensor interfaces for the Scout robot.
//!
//! Background samplers own the hardware and publish their latest reading on
//! a sample bus; the control thread only ever reads the most recent value.
//! The bus is a single-writer/multi-reader `tokio::sync::watch` channel, so a
//! read is a lock-free snapshot and never races a half-written sample.
//! Every sample carries the instant it was taken so readers can refuse data
//! that has gone stale.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

/// Downward light sensor over the floor grid
pub trait LineDetector: Send + Sync {
    /// True while the sensor is over a floor line
    fn black_line(&self) -> bool;
}

/// Forward distance sensor used to spot objects
pub trait DistanceSensor: Send + Sync {
    /// Latest distance reading; `f64::INFINITY` when nothing is in range
    fn distance(&self) -> f64;

    /// Suspend or resume readings
    fn set_enabled(&self, enabled: bool);
}

/// Colour sensor in front of the claw
pub trait MaterialClassifier: Send + Sync {
    /// An object is directly in front of the claw
    fn is_object(&self) -> bool;

    /// The object in front of the claw is a collectible block
    fn is_block(&self) -> bool;
}

/// Classifier output published by the colour sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialReading {
    pub object: bool,
    pub block: bool,
}

/// A sample together with the instant it was taken
#[derive(Debug, Clone, Copy)]
pub struct Stamped<T> {
    pub value: T,
    pub at: Instant,
}

impl<T> Stamped<T> {
    pub fn now(value: T) -> Self {
        Stamped {
            value,
            at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.at.elapsed()
    }
}

/// Writing half of a sample bus, held by one sampler
#[derive(Debug)]
pub struct SamplePublisher<T> {
    tx: watch::Sender<Stamped<T>>,
}

impl<T> SamplePublisher<T> {
    /// Publish a new latest sample
    pub fn publish(&self, value: T) {
        // send_replace succeeds even when every reader is gone
        self.tx.send_replace(Stamped::now(value));
    }

    pub fn reader(&self) -> SampleReader<T> {
        SampleReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Reading half of a sample bus
#[derive(Debug, Clone)]
pub struct SampleReader<T> {
    rx: watch::Receiver<Stamped<T>>,
}

impl<T: Copy> SampleReader<T> {
    pub fn latest(&self) -> Stamped<T> {
        *self.rx.borrow()
    }

    /// Latest value, or `None` if it is older than `max_age`
    pub fn fresh(&self, max_age: Option<Duration>) -> Option<T> {
        let sample = self.latest();
        match max_age {
            Some(limit) if sample.age() > limit => None,
            _ => Some(sample.value),
        }
    }
}

/// Create a sample bus seeded with an initial value
pub fn sample_channel<T>(initial: T) -> (SamplePublisher<T>, SampleReader<T>) {
    let (tx, rx) = watch::channel(Stamped::now(initial));
    (SamplePublisher { tx }, SampleReader { rx })
}

/// Line detector reading from the light sampler's bus
#[derive(Debug, Clone)]
pub struct BusLineDetector {
    reader: SampleReader<bool>,
    max_age: Option<Duration>,
}

impl BusLineDetector {
    pub fn new(reader: SampleReader<bool>) -> Self {
        BusLineDetector {
            reader,
            max_age: None,
        }
    }

    /// Treat samples older than `max_age` as "no line"
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

impl LineDetector for BusLineDetector {
    fn black_line(&self) -> bool {
        self.reader.fresh(self.max_age).unwrap_or(false)
    }
}

/// Distance sensor reading from the ultrasonic sampler's bus.
///
/// The enable flag is shared with the sampler so it can stop pinging while
/// the sensor is suspended; readers also see `INFINITY` while suspended.
#[derive(Debug, Clone)]
pub struct BusDistanceSensor {
    reader: SampleReader<f64>,
    enabled: Arc<AtomicBool>,
    max_age: Option<Duration>,
}

impl BusDistanceSensor {
    pub fn new(reader: SampleReader<f64>) -> Self {
        BusDistanceSensor {
            reader,
            enabled: Arc::new(AtomicBool::new(true)),
            max_age: None,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Flag the sampler should check before publishing
    pub fn enabled_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.enabled)
    }
}

impl DistanceSensor for BusDistanceSensor {
    fn distance(&self) -> f64 {
        if !self.enabled.load(Ordering::SeqCst) {
            return f64::INFINITY;
        }
        self.reader.fresh(self.max_age).unwrap_or(f64::INFINITY)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

/// Material classifier reading from the colour sampler's bus
#[derive(Debug, Clone)]
pub struct BusMaterialClassifier {
    reader: SampleReader<MaterialReading>,
    max_age: Option<Duration>,
}

impl BusMaterialClassifier {
    pub fn new(reader: SampleReader<MaterialReading>) -> Self {
        BusMaterialClassifier {
            reader,
            max_age: None,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    fn reading(&self) -> MaterialReading {
        self.reader.fresh(self.max_age).unwrap_or_default()
    }
}

impl MaterialClassifier for BusMaterialClassifier {
    fn is_object(&self) -> bool {
        self.reading().object
    }

    fn is_block(&self) -> bool {
        let reading = self.reading();
        reading.object && reading.block
    }
}
