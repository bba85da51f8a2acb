//! Control item codes.
//!
//! Each control message addresses one receiver parameter through a 16-bit
//! item code carried little-endian after the header.

/// Receiver parameters addressable through control messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlItem {
    /// Receiver run/stop state and capture configuration.
    ReceiverState,
    /// Receiver NCO frequency for one channel.
    ReceiverFrequency,
    /// RF filter selection (0 = automatic).
    RfFilter,
    /// A/D converter modes (dither, gain).
    AdModes,
    /// IQ output data sample rate in Hz.
    IqOutputSampleRate,
}

impl ControlItem {
    /// Every item the codec accepts.
    pub const ALL: [ControlItem; 5] = [
        ControlItem::ReceiverState,
        ControlItem::ReceiverFrequency,
        ControlItem::RfFilter,
        ControlItem::AdModes,
        ControlItem::IqOutputSampleRate,
    ];

    /// Wire code for this item.
    pub fn code(self) -> u16 {
        match self {
            ControlItem::ReceiverState => 0x0018,
            ControlItem::ReceiverFrequency => 0x0020,
            ControlItem::RfFilter => 0x0044,
            ControlItem::AdModes => 0x008A,
            ControlItem::IqOutputSampleRate => 0x00B8,
        }
    }

    /// Look up an item by wire code.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|item| item.code() == code)
    }

    /// Returns a human-readable name for the item.
    pub fn name(self) -> &'static str {
        match self {
            ControlItem::ReceiverState => "receiver-state",
            ControlItem::ReceiverFrequency => "receiver-frequency",
            ControlItem::RfFilter => "rf-filter",
            ControlItem::AdModes => "ad-modes",
            ControlItem::IqOutputSampleRate => "iq-sample-rate",
        }
    }

    /// Parse an item from its human-readable name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|item| item.name() == name)
    }
}

impl std::fmt::Display for ControlItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
