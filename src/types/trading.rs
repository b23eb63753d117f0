use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling granularity requested from the prediction process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Minute,
    Hour,
    Day,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Minute => "minute",
            Frequency::Hour => "hour",
            Frequency::Day => "day",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Minute => "Minute",
            Frequency::Hour => "Hour",
            Frequency::Day => "Day",
        }
    }

    pub fn all() -> [Frequency; 3] {
        [Frequency::Minute, Frequency::Hour, Frequency::Day]
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "minute" | "m" | "1m" => Some(Frequency::Minute),
            "hour" | "h" | "1h" => Some(Frequency::Hour),
            "day" | "d" | "1d" => Some(Frequency::Day),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Frequency::from_str(s).ok_or_else(|| format!("unknown frequency '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Buy => "Buy",
            SignalKind::Sell => "Sell",
            SignalKind::Hold => "Hold",
        }
    }

    /// CSS class used by the feed entries.
    pub fn css_class(&self) -> &'static str {
        match self {
            SignalKind::Buy => "positive",
            SignalKind::Sell => "negative",
            SignalKind::Hold => "neutral",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// `/is_running` response. The backend names the flag `message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunningStatus {
    pub message: bool,
}

impl RunningStatus {
    pub fn is_running(&self) -> bool {
        self.message
    }
}

/// Start or stop command for the remote prediction process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessCommand {
    Start,
    Stop,
}

impl ProcessCommand {
    /// Command the button issues for the last known running flag.
    pub fn toggle_from(running: bool) -> Self {
        if running {
            ProcessCommand::Stop
        } else {
            ProcessCommand::Start
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            ProcessCommand::Start => "/start_fetch",
            ProcessCommand::Stop => "/stop_fetch",
        }
    }

    /// Running flag the backend is in once the command is acknowledged.
    pub fn target_running(&self) -> bool {
        matches!(self, ProcessCommand::Start)
    }
}

impl fmt::Display for ProcessCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessCommand::Start => f.pad("Start"),
            ProcessCommand::Stop => f.pad("Stop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_wire_format() {
        assert_eq!(serde_json::to_string(&Frequency::Hour).unwrap(), "\"hour\"");
        let parsed: Frequency = serde_json::from_str("\"day\"").unwrap();
        assert_eq!(parsed, Frequency::Day);
        assert_eq!(Frequency::default(), Frequency::Minute);
    }

    #[test]
    fn test_frequency_from_str() {
        assert_eq!(Frequency::from_str("MINUTE"), Some(Frequency::Minute));
        assert_eq!(Frequency::from_str(" h "), Some(Frequency::Hour));
        assert_eq!(Frequency::from_str("week"), None);
    }

    #[test]
    fn test_toggle_picks_opposite_command() {
        assert_eq!(ProcessCommand::toggle_from(true), ProcessCommand::Stop);
        assert_eq!(ProcessCommand::toggle_from(false), ProcessCommand::Start);
        assert_eq!(ProcessCommand::Stop.endpoint(), "/stop_fetch");
        assert!(ProcessCommand::Start.target_running());
    }

    #[test]
    fn test_display_honors_width() {
        assert_eq!(format!("{:<6}|", SignalKind::Buy), "Buy   |");
        assert_eq!(format!("{:>6}|", Frequency::Day), "   day|");
        assert_eq!(format!("{:^7}|", ProcessCommand::Stop), " Stop  |");
    }
}
