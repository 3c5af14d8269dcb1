//! # Telegram Header
//!
//! Parses the link layer header of a wireless M-Bus telegram (CRCs already
//! removed) and the transport header selected by its CI field, and hands back
//! the application body for the descriptor chain reader.
//!
//! ```text
//! L | C | M M | A A A A | V | T | CI | [transport header] | body ...
//! ```

use crate::constants::*;
use crate::drivers::manufacturer::id_to_manufacturer;
use crate::error::DecodeError;
use nom::{
    bytes::complete::take,
    number::complete::{be_u8, le_u16},
    sequence::tuple,
    IResult,
};
use serde::Serialize;

/// Manufacturer, id, version and media of a device, from either the link
/// layer or the long transport header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceAddress {
    pub manufacturer: u16,
    /// Device id digits, most significant first.
    pub id: String,
    pub version: u8,
    pub media: u8,
}

impl DeviceAddress {
    pub fn manufacturer_code(&self) -> String {
        id_to_manufacturer(self.manufacturer)
    }
}

/// Name of a device type (media) byte.
pub fn media_name(media: u8) -> &'static str {
    match media {
        0x00 => "other",
        0x01 => "oil",
        0x02 => "electricity",
        0x03 => "gas",
        0x04 => "heat",
        0x05 => "steam",
        0x06 => "warm water",
        0x07 => "water",
        0x08 => "heat cost allocation",
        0x09 => "compressed air",
        0x0A | 0x0B => "cooling",
        0x0C => "heat",
        0x0D => "heat/cooling",
        0x0E => "bus/system component",
        0x15 => "hot water",
        0x16 => "cold water",
        0x1A => "smoke detector",
        0x37 => "radio converter (meter side)",
        _ => "unknown",
    }
}

/// Access number, status and configuration word of a transport header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransportInfo {
    pub access_number: u8,
    pub status: u8,
    pub configuration: u16,
}

impl TransportInfo {
    pub fn security_mode(&self) -> u8 {
        ((self.configuration >> 8) & WMBUS_CONFIG_SECURITY_MODE_MASK) as u8
    }
}

/// The L-field and the number of bytes actually supplied disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LengthMismatch {
    pub claimed: usize,
    pub available: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelegramHeader {
    pub length: u8,
    pub control: u8,
    pub link: DeviceAddress,
    pub ci: u8,
    /// Address from a long transport header (CI 0x72).
    pub transport_address: Option<DeviceAddress>,
    pub transport: Option<TransportInfo>,
    pub body_offset: usize,
    /// Set when the L-field claims more bytes than were supplied.
    pub length_mismatch: Option<LengthMismatch>,
}

impl TelegramHeader {
    /// The address identifying the meter: the transport header's if present.
    pub fn address(&self) -> &DeviceAddress {
        self.transport_address.as_ref().unwrap_or(&self.link)
    }

    /// Addresses to try against the driver registry, in order.
    pub fn detection_candidates(&self, prefer_transport_header: bool) -> Vec<&DeviceAddress> {
        match &self.transport_address {
            Some(tpl) if prefer_transport_header => vec![tpl, &self.link],
            Some(tpl) => vec![&self.link, tpl],
            None => vec![&self.link],
        }
    }
}

fn device_id(bytes: &[u8]) -> String {
    bytes.iter().rev().map(|b| format!("{:02X}", b)).collect()
}

fn address_fields(input: &[u8]) -> IResult<&[u8], (u16, &[u8])> {
    tuple((le_u16, take(4usize)))(input)
}

fn link_header(input: &[u8]) -> IResult<&[u8], (u8, u8, DeviceAddress, u8)> {
    let (input, (length, control)) = tuple((be_u8, be_u8))(input)?;
    let (input, (manufacturer, id)) = address_fields(input)?;
    let (input, (version, media, ci)) = tuple((be_u8, be_u8, be_u8))(input)?;
    let link = DeviceAddress {
        manufacturer,
        id: device_id(id),
        version,
        media,
    };
    Ok((input, (length, control, link, ci)))
}

fn transport_info(input: &[u8]) -> IResult<&[u8], TransportInfo> {
    let (input, (access_number, status, configuration)) = tuple((be_u8, be_u8, le_u16))(input)?;
    Ok((
        input,
        TransportInfo {
            access_number,
            status,
            configuration,
        },
    ))
}

fn long_transport_header(input: &[u8]) -> IResult<&[u8], (DeviceAddress, TransportInfo)> {
    let (input, id) = take(4usize)(input)?;
    let (input, (manufacturer, version, media)) = tuple((le_u16, be_u8, be_u8))(input)?;
    let (input, info) = transport_info(input)?;
    let address = DeviceAddress {
        manufacturer,
        id: device_id(id),
        version,
        media,
    };
    Ok((input, (address, info)))
}

fn too_short(len: usize, needed: usize) -> DecodeError {
    DecodeError::HeaderTooShort { len, needed }
}

/// Parses the telegram header and returns it with the application body.
pub fn parse_telegram(bytes: &[u8]) -> Result<(TelegramHeader, &[u8]), DecodeError> {
    let claimed = bytes.first().map(|l| usize::from(*l) + 1);
    let (bytes, length_mismatch) = match claimed {
        Some(claimed) if claimed < bytes.len() => (&bytes[..claimed], None),
        Some(claimed) if claimed > bytes.len() => (
            bytes,
            Some(LengthMismatch {
                claimed,
                available: bytes.len(),
            }),
        ),
        _ => (bytes, None),
    };

    let (rest, (length, control, link, ci)) =
        link_header(bytes).map_err(|_| too_short(bytes.len(), WMBUS_LINK_HEADER_LENGTH))?;

    let (body, transport_address, transport) = match ci {
        WMBUS_CI_NO_HEADER => (rest, None, None),
        WMBUS_CI_SHORT_HEADER => {
            let (body, info) = transport_info(rest).map_err(|_| {
                too_short(bytes.len(), WMBUS_LINK_HEADER_LENGTH + WMBUS_SHORT_TPL_LENGTH)
            })?;
            (body, None, Some(info))
        }
        WMBUS_CI_LONG_HEADER => {
            let (body, (address, info)) = long_transport_header(rest).map_err(|_| {
                too_short(bytes.len(), WMBUS_LINK_HEADER_LENGTH + WMBUS_LONG_TPL_LENGTH)
            })?;
            (body, Some(address), Some(info))
        }
        other => return Err(DecodeError::UnsupportedCi(other)),
    };

    if let Some(info) = transport {
        let mode = info.security_mode();
        if mode != 0 {
            return Err(DecodeError::EncryptedPayload { mode });
        }
    }

    let header = TelegramHeader {
        length,
        control,
        link,
        ci,
        transport_address,
        transport,
        body_offset: bytes.len() - body.len(),
        length_mismatch,
    };

    Ok((header, body))
}
