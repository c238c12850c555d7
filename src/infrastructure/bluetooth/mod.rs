//! Platform radio adapters.
//!
//! Each adapter implements [`RadioAdapter`](crate::domain::ports::RadioAdapter)
//! and reports what the OS tells it through an [`AdapterEventSender`]. Platform
//! callbacks may fire on any thread; they only ever send into the channel.
//!
//! - [`winrt`] - Windows Runtime Bluetooth LE APIs

use crate::domain::models::AdapterEvent;
use tokio::sync::mpsc;

#[cfg(windows)]
pub mod winrt;

#[cfg(windows)]
pub use winrt::WinRtAdapter;

pub type AdapterEventSender = mpsc::UnboundedSender<AdapterEvent>;
pub type AdapterEventReceiver = mpsc::UnboundedReceiver<AdapterEvent>;

pub fn event_channel() -> (AdapterEventSender, AdapterEventReceiver) {
    mpsc::unbounded_channel()
}
