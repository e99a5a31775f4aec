// MIT License - Copyright (c) 2026 Peter Wright
// AlarmDecoder bridge

pub mod registry;
pub mod system;
pub mod zone;

pub use registry::ZoneRegistry;
pub use system::{PanelState, PanelStatusFlags, RawPanelStatus, TargetState};
pub use zone::{ZoneDescriptor, ZoneType, ZoneValue};
