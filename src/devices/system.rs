// MIT License - Copyright (c) 2026 Peter Wright
// AlarmDecoder panel status and arm states

use std::fmt;

use bitflags::bitflags;
use serde::Deserialize;

bitflags! {
    /// Panel status flags reduced from the AlarmDecoder status body.
    ///
    /// `NIGHT` has no field of its own: it is set when the last keypad
    /// message mentions `NIGHT` or `INSTANT`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PanelStatusFlags: u8 {
        /// panel_alarming
        const ALARMING   = 1 << 0;
        /// panel_armed (away)
        const ARMED_AWAY = 1 << 1;
        /// panel_armed_stay
        const ARMED_STAY = 1 << 2;
        /// Keypad reports NIGHT or INSTANT mode
        const NIGHT      = 1 << 3;
        /// panel_fire_detected
        const FIRE       = 1 << 4;
        /// panel_panicked
        const PANICKED   = 1 << 5;
        /// panel_on_battery
        const ON_BATTERY = 1 << 6;
        /// panel_powered
        const POWERED    = 1 << 7;
    }
}

impl PanelStatusFlags {
    /// Get the flags that changed between old and new status.
    pub fn changed(old: Self, new: Self) -> Self {
        old ^ new
    }

    /// Get human-readable event names for flags that became set.
    pub fn set_event_names(changed: Self, new: Self) -> Vec<&'static str> {
        let became_set = changed & new;
        let mut events = Vec::new();
        if became_set.contains(Self::ALARMING) { events.push("Alarm"); }
        if became_set.contains(Self::ARMED_AWAY) { events.push("ArmedAway"); }
        if became_set.contains(Self::ARMED_STAY) { events.push("ArmedStay"); }
        if became_set.contains(Self::NIGHT) { events.push("NightMode"); }
        if became_set.contains(Self::FIRE) { events.push("Fire"); }
        if became_set.contains(Self::PANICKED) { events.push("Panic"); }
        if became_set.contains(Self::ON_BATTERY) { events.push("OnBattery"); }
        if became_set.contains(Self::POWERED) { events.push("Powered"); }
        events
    }

    /// Get human-readable event names for flags that became unset.
    pub fn unset_event_names(changed: Self, new: Self) -> Vec<&'static str> {
        let became_unset = changed & !new;
        let mut events = Vec::new();
        if became_unset.contains(Self::ALARMING) { events.push("StandBy"); }
        if became_unset.contains(Self::ARMED_AWAY) { events.push("DisarmedAway"); }
        if became_unset.contains(Self::ARMED_STAY) { events.push("DisarmedStay"); }
        if became_unset.contains(Self::NIGHT) { events.push("NightModeOff"); }
        if became_unset.contains(Self::FIRE) { events.push("FireCleared"); }
        if became_unset.contains(Self::PANICKED) { events.push("NoPanic"); }
        if became_unset.contains(Self::ON_BATTERY) { events.push("AcRestored"); }
        if became_unset.contains(Self::POWERED) { events.push("PowerLost"); }
        events
    }
}

/// Status body returned by the AlarmDecoder REST API.
///
/// ```text
/// {"last_message_received": "[10000001100000003A--],008,[f72...],\" DISARMED CHIME   Ready to Arm  \"",
///  "panel_alarming": false, "panel_armed": false, "panel_armed_stay": false,
///  "panel_fire_detected": false, "panel_on_battery": false, "panel_panicked": false,
///  "panel_powered": true, "panel_type": "ADEMCO", "panel_zones_faulted": []}
/// ```
///
/// Absent or `null` fields read as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawPanelStatus {
    #[serde(rename = "panel_alarming", default, deserialize_with = "null_as_false")]
    pub alarming: bool,
    #[serde(rename = "panel_armed", default, deserialize_with = "null_as_false")]
    pub armed_away: bool,
    #[serde(rename = "panel_armed_stay", default, deserialize_with = "null_as_false")]
    pub armed_stay: bool,
    #[serde(rename = "last_message_received", default)]
    pub last_message: Option<String>,
    #[serde(rename = "panel_fire_detected", default, deserialize_with = "null_as_false")]
    pub fire_detected: bool,
    #[serde(rename = "panel_panicked", default, deserialize_with = "null_as_false")]
    pub panicked: bool,
    #[serde(rename = "panel_on_battery", default, deserialize_with = "null_as_false")]
    pub on_battery: bool,
    #[serde(rename = "panel_powered", default, deserialize_with = "null_as_false")]
    pub powered: bool,
}

fn null_as_false<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl RawPanelStatus {
    /// Whether the last keypad message indicates night/instant arming.
    pub fn is_night(&self) -> bool {
        self.last_message
            .as_deref()
            .is_some_and(|msg| msg.contains("NIGHT") || msg.contains("INSTANT"))
    }

    pub fn flags(&self) -> PanelStatusFlags {
        let mut flags = PanelStatusFlags::empty();
        flags.set(PanelStatusFlags::ALARMING, self.alarming);
        flags.set(PanelStatusFlags::ARMED_AWAY, self.armed_away);
        flags.set(PanelStatusFlags::ARMED_STAY, self.armed_stay);
        flags.set(PanelStatusFlags::NIGHT, self.is_night());
        flags.set(PanelStatusFlags::FIRE, self.fire_detected);
        flags.set(PanelStatusFlags::PANICKED, self.panicked);
        flags.set(PanelStatusFlags::ON_BATTERY, self.on_battery);
        flags.set(PanelStatusFlags::POWERED, self.powered);
        flags
    }
}

/// Current state of the security system accessory.
///
/// Discriminants are the HomeKit `SecuritySystemCurrentState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PanelState {
    StayArm = 0,
    AwayArm = 1,
    NightArm = 2,
    Disarmed = 3,
    AlarmTriggered = 4,
}

impl PanelState {
    /// Reduce panel status flags to a single state.
    ///
    /// Precedence: alarm, then night/instant mode (which wins over the
    /// armed-away/armed-stay flags), then away, then stay, else disarmed.
    pub fn from_flags(flags: PanelStatusFlags) -> Self {
        if flags.contains(PanelStatusFlags::ALARMING) {
            Self::AlarmTriggered
        } else if flags.contains(PanelStatusFlags::NIGHT) {
            Self::NightArm
        } else if flags.contains(PanelStatusFlags::ARMED_AWAY)
            && !flags.contains(PanelStatusFlags::ARMED_STAY)
        {
            Self::AwayArm
        } else if flags.contains(PanelStatusFlags::ARMED_STAY) {
            Self::StayArm
        } else {
            Self::Disarmed
        }
    }

    pub fn hap_value(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StayArm => "STAY_ARM",
            Self::AwayArm => "AWAY_ARM",
            Self::NightArm => "NIGHT_ARM",
            Self::Disarmed => "DISARMED",
            Self::AlarmTriggered => "ALARM_TRIGGERED",
        }
    }
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-requested target state.
///
/// Discriminants are the HomeKit `SecuritySystemTargetState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TargetState {
    StayArm = 0,
    AwayArm = 1,
    NightArm = 2,
    Disarm = 3,
}

impl TargetState {
    /// Parse a target state name (`"AWAY_ARM"`) or HomeKit value (`"1"`).
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "STAY_ARM" | "STAY" | "0" => Some(Self::StayArm),
            "AWAY_ARM" | "AWAY" | "1" => Some(Self::AwayArm),
            "NIGHT_ARM" | "NIGHT" | "2" => Some(Self::NightArm),
            "DISARM" | "DISARMED" | "3" => Some(Self::Disarm),
            _ => None,
        }
    }

    pub fn hap_value(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StayArm => "STAY_ARM",
            Self::AwayArm => "AWAY_ARM",
            Self::NightArm => "NIGHT_ARM",
            Self::Disarm => "DISARM",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
