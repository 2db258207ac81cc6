//! Textual bus configuration as handed over by KaCanOpen.

use std::{fmt, str::FromStr, time::Duration};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// ZLG device type of the USBCAN-II family.
pub const USBCAN2: u32 = 4;

/// Baud rate token as accepted by the KaCanOpen driver interface.
///
/// Unknown tokens are kept apart from [`Baudrate::None`] so callers can tell
/// them apart, even though both resolve to a rate of 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baudrate {
    B1M,
    B500K,
    B250K,
    B125K,
    B100K,
    B50K,
    B20K,
    B10K,
    B5K,
    None,
    Unrecognized(String),
}

impl Baudrate {
    pub const NAMED: [Baudrate; 10] = [
        Baudrate::B1M,
        Baudrate::B500K,
        Baudrate::B250K,
        Baudrate::B125K,
        Baudrate::B100K,
        Baudrate::B50K,
        Baudrate::B20K,
        Baudrate::B10K,
        Baudrate::B5K,
        Baudrate::None,
    ];

    /// Lenient parsing, never fails.
    pub fn parse(token: &str) -> Self {
        match token {
            "1M" => Baudrate::B1M,
            "500K" => Baudrate::B500K,
            "250K" => Baudrate::B250K,
            "125K" => Baudrate::B125K,
            "100K" => Baudrate::B100K,
            "50K" => Baudrate::B50K,
            "20K" => Baudrate::B20K,
            "10K" => Baudrate::B10K,
            "5K" => Baudrate::B5K,
            "none" => Baudrate::None,
            other => Baudrate::Unrecognized(other.to_string()),
        }
    }

    /// Like [`Baudrate::parse`] but rejects unknown tokens.
    pub fn parse_strict(token: &str) -> Result<Self> {
        match Self::parse(token) {
            Baudrate::Unrecognized(token) => Err(Error::UnrecognizedBaudrate(token)),
            baudrate => Ok(baudrate),
        }
    }

    pub fn bits_per_second(&self) -> u32 {
        match self {
            Baudrate::B1M => 1_000_000,
            Baudrate::B500K => 500_000,
            Baudrate::B250K => 250_000,
            Baudrate::B125K => 125_000,
            Baudrate::B100K => 100_000,
            Baudrate::B50K => 50_000,
            Baudrate::B20K => 20_000,
            Baudrate::B10K => 10_000,
            Baudrate::B5K => 5_000,
            Baudrate::None | Baudrate::Unrecognized(_) => 0,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Baudrate::Unrecognized(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Baudrate::B1M => "1M",
            Baudrate::B500K => "500K",
            Baudrate::B250K => "250K",
            Baudrate::B125K => "125K",
            Baudrate::B100K => "100K",
            Baudrate::B50K => "50K",
            Baudrate::B20K => "20K",
            Baudrate::B10K => "10K",
            Baudrate::B5K => "5K",
            Baudrate::None => "none",
            Baudrate::Unrecognized(token) => token,
        }
    }
}

impl FromStr for Baudrate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_strict(s)
    }
}

impl fmt::Display for Baudrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bus name and baud rate, e.g. `("0", "500K")`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    pub busname: String,
    pub baudrate: String,
}

impl BusConfig {
    pub fn new(busname: impl Into<String>, baudrate: impl Into<String>) -> Self {
        Self {
            busname: busname.into(),
            baudrate: baudrate.into(),
        }
    }

    /// Device index encoded in the bus name.
    pub fn bus_index(&self) -> Result<u32> {
        parse_bus_index(&self.busname)
    }

    pub fn baudrate(&self) -> Baudrate {
        Baudrate::parse(&self.baudrate)
    }
}

/// Parses a base-10 device index. Signs and whitespace are rejected.
pub fn parse_bus_index(busname: &str) -> Result<u32> {
    if busname.is_empty() || !busname.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidBusName(busname.to_string()));
    }
    busname
        .parse()
        .map_err(|_| Error::InvalidBusName(busname.to_string()))
}

/// Tuning knobs of a session that KaCanOpen has no way to express.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionOptions {
    /// ZLG device type passed to `ZCAN_OpenDevice`.
    pub device_type: u32,
    /// Sleep between two queue checks of a blocking receive.
    pub poll_interval: Duration,
    /// Wait time in milliseconds handed to the vendor receive call.
    pub fetch_wait_ms: i32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            device_type: USBCAN2,
            poll_interval: Duration::from_millis(1),
            fetch_wait_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_tokens() {
        let rates: Vec<u32> = Baudrate::NAMED.iter().map(Baudrate::bits_per_second).collect();
        assert_eq!(
            rates,
            [1_000_000, 500_000, 250_000, 125_000, 100_000, 50_000, 20_000, 10_000, 5_000, 0]
        );

        for baudrate in Baudrate::NAMED.iter() {
            assert_eq!(&Baudrate::parse(baudrate.as_str()), baudrate);
        }
    }

    #[test]
    fn unknown_token_resolves_like_none() {
        for token in ["", "500k", "1000K", "fast", " 1M"] {
            let baudrate = Baudrate::parse(token);
            assert_eq!(baudrate.bits_per_second(), Baudrate::None.bits_per_second());
            assert!(!baudrate.is_recognized());
            assert_ne!(baudrate, Baudrate::None);
        }
    }

    #[test]
    fn strict_parsing_rejects_unknown_token() {
        assert_eq!("250K".parse::<Baudrate>(), Ok(Baudrate::B250K));
        assert_eq!("none".parse::<Baudrate>(), Ok(Baudrate::None));
        assert_eq!(
            "2M".parse::<Baudrate>(),
            Err(Error::UnrecognizedBaudrate("2M".into()))
        );
    }

    #[test]
    fn bus_index() {
        assert_eq!(parse_bus_index("0"), Ok(0));
        assert_eq!(parse_bus_index("12"), Ok(12));
        assert_eq!(BusConfig::new("3", "1M").bus_index(), Ok(3));

        for name in ["", "-1", "+1", "can0", " 1", "99999999999"] {
            assert_eq!(
                parse_bus_index(name),
                Err(Error::InvalidBusName(name.into())),
                "{:?}",
                name
            );
        }
    }
}
