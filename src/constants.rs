//! M-Bus Protocol Constants
//!
//! Bit masks and marker values for the wireless M-Bus header and the
//! DIF/DIFE/VIF/VIFE descriptor chain, based on the EN 13757 standard.

/// DIF (Data Information Field) mask for data length/type
pub const MBUS_DATA_RECORD_DIF_MASK_DATA: u8 = 0x0F;

/// DIF mask for function
pub const MBUS_DATA_RECORD_DIF_MASK_FUNCTION: u8 = 0x30;

/// DIF mask for storage number
pub const MBUS_DATA_RECORD_DIF_MASK_STORAGE_NO: u8 = 0x40;

/// DIFE (Data Information Field Extension) mask for storage number
pub const MBUS_DATA_RECORD_DIFE_MASK_STORAGE_NO: u8 = 0x0F;

/// DIFE mask for tariff
pub const MBUS_DATA_RECORD_DIFE_MASK_TARIFF: u8 = 0x30;

/// DIFE mask for subunit (device)
pub const MBUS_DATA_RECORD_DIFE_MASK_DEVICE: u8 = 0x40;

/// DIF idle filler
pub const MBUS_DIB_DIF_IDLE_FILLER: u8 = 0x2F;

/// DIF manufacturer specific
pub const MBUS_DIB_DIF_MANUFACTURER_SPECIFIC: u8 = 0x0F;

/// DIF more records follow
pub const MBUS_DIB_DIF_MORE_RECORDS_FOLLOW: u8 = 0x1F;

/// DIF extension bit
pub const MBUS_DIB_DIF_EXTENSION_BIT: u8 = 0x80;

/// VIF without extension
pub const MBUS_DIB_VIF_WITHOUT_EXTENSION: u8 = 0x7F;

/// Plain text VIF (length byte and ASCII follow the VIF)
pub const MBUS_DIB_VIF_PLAIN_TEXT: u8 = 0x7C;

/// First VIFE selects the 0xFB extension table
pub const MBUS_VIF_EXTENSION_TABLE_FB: u8 = 0xFB;

/// First VIFE selects the 0xFD extension table
pub const MBUS_VIF_EXTENSION_TABLE_FD: u8 = 0xFD;

/// Maximum number of DIFE or VIFE bytes in one chain
pub const MBUS_MAX_EXTENSIONS: usize = 10;

// ----------------------------------------------------------------------------
// Wireless M-Bus header layout
// ----------------------------------------------------------------------------

/// L, C, M(2), A(6) and CI
pub const WMBUS_LINK_HEADER_LENGTH: usize = 11;

/// CI: application data without transport header
pub const WMBUS_CI_NO_HEADER: u8 = 0x78;

/// CI: application data with short transport header
pub const WMBUS_CI_SHORT_HEADER: u8 = 0x7A;

/// CI: application data with long transport header
pub const WMBUS_CI_LONG_HEADER: u8 = 0x72;

/// Access, status and configuration word
pub const WMBUS_SHORT_TPL_LENGTH: usize = 4;

/// Id, manufacturer, version, type, access, status and configuration word
pub const WMBUS_LONG_TPL_LENGTH: usize = 12;

/// Security mode bits in the configuration word (after shifting right by 8)
pub const WMBUS_CONFIG_SECURITY_MODE_MASK: u16 = 0x1F;
