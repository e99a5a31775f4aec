// MIT License - Copyright (c) 2026 Peter Wright
// AlarmDecoder bridge

pub mod listener;
pub mod rest;

use std::future::Future;
use std::sync::Arc;

use crate::devices::system::{RawPanelStatus, TargetState};
use crate::error::Result;

pub use listener::NotificationListener;
pub use rest::AlarmDecoderClient;

/// Access to the panel controller's control API.
///
/// [`AlarmDecoderClient`] is the REST implementation. Callers bound every
/// call with their own timeout.
pub trait PanelApi: Send + Sync {
    /// Read the raw panel status.
    fn read_status(&self) -> impl Future<Output = Result<RawPanelStatus>> + Send;

    /// Send the key sequence configured for a target state.
    ///
    /// `Ok` only means the controller accepted the request; the panel may
    /// still end up in a different state.
    fn send_command(&self, target: TargetState) -> impl Future<Output = Result<()>> + Send;
}

impl<T: PanelApi> PanelApi for Arc<T> {
    fn read_status(&self) -> impl Future<Output = Result<RawPanelStatus>> + Send {
        (**self).read_status()
    }

    fn send_command(&self, target: TargetState) -> impl Future<Output = Result<()>> + Send {
        (**self).send_command(target)
    }
}
