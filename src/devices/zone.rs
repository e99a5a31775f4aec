// MIT License - Copyright (c) 2026 Peter Wright
// AlarmDecoder zones

use std::fmt;

/// Accessory kind a zone is exposed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneType {
    /// Door/window contact sensor
    Contact,
    /// Motion (PIR) sensor
    Motion,
    /// Carbon monoxide sensor
    CarbonMonoxide,
    /// Smoke sensor; also driven by fire alarms and panel status changes
    Smoke,
}

impl ZoneType {
    /// Parse the configuration name (`contact`, `motion`, `co`, `smoke`).
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "contact" => Some(Self::Contact),
            "motion" => Some(Self::Motion),
            "co" => Some(Self::CarbonMonoxide),
            "smoke" => Some(Self::Smoke),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Motion => "motion",
            Self::CarbonMonoxide => "co",
            Self::Smoke => "smoke",
        }
    }

    /// Encode a zone state (faulted/detected = true) for this accessory kind.
    ///
    /// Contact sensors are inverted: a faulted (open) contact reports
    /// "not detected".
    pub fn encode(&self, faulted: bool) -> ZoneValue {
        match (self, faulted) {
            (Self::Contact, true) => ZoneValue::ContactNotDetected,
            (Self::Contact, false) => ZoneValue::ContactDetected,
            (Self::Motion, true) => ZoneValue::MotionDetected,
            (Self::Motion, false) => ZoneValue::MotionNotDetected,
            (Self::CarbonMonoxide, true) => ZoneValue::CoLevelsAbnormal,
            (Self::CarbonMonoxide, false) => ZoneValue::CoLevelsNormal,
            (Self::Smoke, true) => ZoneValue::SmokeDetected,
            (Self::Smoke, false) => ZoneValue::SmokeNotDetected,
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific accessory value published for a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneValue {
    ContactDetected,
    ContactNotDetected,
    MotionDetected,
    MotionNotDetected,
    CoLevelsNormal,
    CoLevelsAbnormal,
    SmokeDetected,
    SmokeNotDetected,
}

impl ZoneValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContactDetected | Self::MotionDetected | Self::SmokeDetected => "detected",
            Self::ContactNotDetected | Self::MotionNotDetected | Self::SmokeNotDetected => {
                "not detected"
            }
            Self::CoLevelsNormal => "normal",
            Self::CoLevelsAbnormal => "abnormal",
        }
    }

    /// HomeKit characteristic value (ContactSensorState, MotionDetected,
    /// CarbonMonoxideDetected, SmokeDetected).
    pub fn hap_value(&self) -> u8 {
        match self {
            Self::ContactDetected => 0,
            Self::ContactNotDetected => 1,
            Self::MotionDetected => 1,
            Self::MotionNotDetected => 0,
            Self::CoLevelsNormal => 0,
            Self::CoLevelsAbnormal => 1,
            Self::SmokeDetected => 1,
            Self::SmokeNotDetected => 0,
        }
    }
}

impl fmt::Display for ZoneValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDescriptor {
    /// Zone number as written by the panel, compared as a string ("012" != "12")
    pub id: String,
    pub zone_type: ZoneType,
    /// Accessory display name
    pub name: String,
    /// Name the panel uses in its notifications, if configured
    pub full_name: Option<String>,
}

impl ZoneDescriptor {
    pub fn new(id: impl Into<String>, zone_type: ZoneType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            zone_type,
            name: name.into(),
            full_name: None,
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }
}
