use super::errors::{ErrorKind, Result};
use error_chain::{bail, ensure};
use serde::de::{Deserialize, Deserializer, Error as SerdeDeError};
use std::borrow::Borrow;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::ops::Deref;
use std::result::Result as StdResult;
use std::str::{self, FromStr};

/// An 8-byte, NUL-padded lump or texture name. Case is preserved exactly as
/// stored; everything after the first NUL is dropped.
#[derive(Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash, Default)]
pub struct WadName([u8; 8]);

impl WadName {
    pub fn from_bytes(value: &[u8]) -> Result<WadName> {
        let mut name = [0u8; 8];
        let mut nulled = false;
        for (dest, &src) in name.iter_mut().zip(value.iter()) {
            match src {
                b'\0' => {
                    nulled = true;
                    break;
                }
                b if b.is_ascii_graphic() => *dest = b,
                b => bail!(ErrorKind::invalid_byte_in_wad_name(b, value)),
            }
        }

        ensure!(
            nulled || value.len() <= 8,
            ErrorKind::wad_name_too_long(value)
        );
        Ok(WadName(name))
    }

    pub fn len(&self) -> usize {
        self.0.iter().position(|&byte| byte == 0).unwrap_or(8)
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    /// Lookup key: lumps and textures are matched regardless of case.
    pub fn to_ascii_uppercase(&self) -> WadName {
        let mut bytes = self.0;
        bytes.make_ascii_uppercase();
        WadName(bytes)
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII graphic bytes are ever stored.
        str::from_utf8(&self.0[..self.len()]).unwrap_or("")
    }
}

impl FromStr for WadName {
    type Err = super::errors::Error;
    fn from_str(value: &str) -> Result<WadName> {
        WadName::from_bytes(value.as_bytes())
    }
}

impl Display for WadName {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.pad(self.as_str())
    }
}

impl Deref for WadName {
    type Target = [u8; 8];
    fn deref(&self) -> &[u8; 8] {
        &self.0
    }
}

impl Debug for WadName {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "WadName({:?})", self.as_str())
    }
}

impl PartialEq<[u8; 8]> for WadName {
    fn eq(&self, rhs: &[u8; 8]) -> bool {
        self.deref() == rhs
    }
}

impl Borrow<[u8; 8]> for WadName {
    fn borrow(&self) -> &[u8; 8] {
        self.deref()
    }
}

impl AsRef<str> for WadName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<'de> Deserialize<'de> for WadName {
    fn deserialize<D>(deserializer: D) -> StdResult<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        WadName::from_bytes(&<[u8; 8]>::deserialize(deserializer)?).map_err(D::Error::custom)
    }
}

pub trait IntoWadName {
    fn into_wad_name(self) -> Result<WadName>;
}

impl IntoWadName for &[u8] {
    fn into_wad_name(self) -> Result<WadName> {
        WadName::from_bytes(self)
    }
}

impl IntoWadName for &[u8; 8] {
    fn into_wad_name(self) -> Result<WadName> {
        WadName::from_bytes(self)
    }
}

impl IntoWadName for &str {
    fn into_wad_name(self) -> Result<WadName> {
        WadName::from_str(self)
    }
}

impl IntoWadName for WadName {
    fn into_wad_name(self) -> Result<WadName> {
        Ok(self)
    }
}

impl IntoWadName for &WadName {
    fn into_wad_name(self) -> Result<WadName> {
        Ok(*self)
    }
}

#[cfg(test)]
mod test {
    use super::WadName;
    use std::str::FromStr;

    #[test]
    fn test_wad_name() {
        assert_eq!(&WadName::from_str("").unwrap(), b"\0\0\0\0\0\0\0\0");
        assert_eq!(&WadName::from_str("\0").unwrap(), b"\0\0\0\0\0\0\0\0");
        assert_eq!(
            &WadName::from_str("\01234567").unwrap(),
            b"\0\0\0\0\0\0\0\0"
        );
        assert_eq!(&WadName::from_str("A").unwrap(), b"A\0\0\0\0\0\0\0");
        assert_eq!(&WadName::from_str("1234567").unwrap(), b"1234567\0");
        assert_eq!(&WadName::from_str("12345678").unwrap(), b"12345678");
        assert_eq!(&WadName::from_str("123\05678").unwrap(), b"123\0\0\0\0\0");
        assert_eq!(&WadName::from_str("SKY1").unwrap(), b"SKY1\0\0\0\0");
        assert_eq!(&WadName::from_str("-").unwrap(), b"-\0\0\0\0\0\0\0");
        assert_eq!(&WadName::from_str("e1m1").unwrap(), b"e1m1\0\0\0\0");

        assert!(WadName::from_bytes(b"123456789").is_err());
        assert!(WadName::from_bytes(b"1234\xfb").is_err());
        assert!(WadName::from_bytes(b"\xff123").is_err());
        assert!(WadName::from_bytes(b"AB CD").is_err());
        assert!(WadName::from_bytes(b"123456789\0").is_err());
    }

    #[test]
    fn test_display_trims_padding() {
        let name = WadName::from_bytes(b"STARTAN3").unwrap();
        assert_eq!(name.to_string(), "STARTAN3");
        assert_eq!(name.len(), 8);

        let name = WadName::from_bytes(b"Flat5\0\0\0").unwrap();
        assert_eq!(name.as_str(), "Flat5");
        assert_eq!(format!("{:?}", name), "WadName(\"Flat5\")");
        assert!(WadName::default().is_empty());
    }

    #[test]
    fn test_uppercase_keeps_original() {
        let name = WadName::from_bytes(b"w94_1").unwrap();
        assert_eq!(name.to_ascii_uppercase().as_str(), "W94_1");
        assert_eq!(name.as_str(), "w94_1");
        assert_eq!(
            WadName::from_bytes(b"W94_1").unwrap(),
            name.to_ascii_uppercase()
        );
    }
}
