use std::{
    io::{Cursor, Read},
    sync::LazyLock,
};

use base64::{
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{DashcapError, DashcapResult};

/// edef8ba9-79d6-4ace-a3c8-27dcd51d21ed
pub const WIDEVINE_SYSTEM_ID: [u8; 16] = [
    0xed, 0xef, 0x8b, 0xa9, 0x79, 0xd6, 0x4a, 0xce, 0xa3, 0xc8, 0x27, 0xdc, 0xd5, 0x1d, 0x21, 0xed,
];

// Manifests in the wild carry both padded and unpadded payloads.
static ENGINE: LazyLock<GeneralPurpose> = LazyLock::new(|| {
    GeneralPurpose::new(
        &base64::alphabet::STANDARD,
        GeneralPurposeConfig::new()
            .with_encode_padding(true)
            .with_decode_padding_mode(DecodePaddingMode::Indifferent)
            .with_decode_allow_trailing_bits(true),
    )
});

pub fn base64_decode<T: AsRef<[u8]>>(input: T) -> DashcapResult<Vec<u8>> {
    Ok(ENGINE.decode(input)?)
}

pub fn base64_encode<T: AsRef<[u8]>>(input: T) -> String {
    ENGINE.encode(input)
}

/// A `pssh` box (ISO/IEC 23001-7, 8.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsshBox {
    pub version: u8,
    pub system_id: [u8; 16],
    /// Only present in version 1 boxes.
    pub key_ids: Vec<[u8; 16]>,
    pub data: Vec<u8>,
}

impl PsshBox {
    pub fn from_base64(payload: &str) -> DashcapResult<Self> {
        let bytes = base64_decode(payload.trim())?;
        Self::try_from(bytes.as_slice())
    }

    pub fn is_widevine(&self) -> bool {
        self.system_id == WIDEVINE_SYSTEM_ID
    }

    pub fn system_id_hex(&self) -> String {
        hex::encode(self.system_id)
    }

    pub fn key_ids_hex(&self) -> Vec<String> {
        self.key_ids.iter().map(hex::encode).collect()
    }
}

impl TryFrom<&[u8]> for PsshBox {
    type Error = DashcapError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() < 32 || &value[4..8] != b"pssh" {
            return Err(DashcapError::InvalidPssh("missing pssh header".to_string()));
        }

        let mut buf = Cursor::new(value);
        let size = buf.read_u32::<BigEndian>()? as usize;
        if size > value.len() {
            return Err(DashcapError::InvalidPssh(format!(
                "box size {size} exceeds payload length {}",
                value.len()
            )));
        }
        buf.set_position(8);

        let version = buf.read_u8()?;
        // flags
        buf.read_u24::<BigEndian>()?;

        let mut system_id = [0u8; 16];
        buf.read_exact(&mut system_id)?;

        let mut key_ids = Vec::new();
        if version > 0 {
            let kid_count = buf.read_u32::<BigEndian>()?;
            for _ in 0..kid_count {
                let mut kid = [0u8; 16];
                buf.read_exact(&mut kid)?;
                key_ids.push(kid);
            }
        }

        let data_length = buf.read_u32::<BigEndian>()? as usize;
        let remaining = value.len().saturating_sub(buf.position() as usize);
        if data_length > remaining {
            return Err(DashcapError::InvalidPssh(format!(
                "data size {data_length} exceeds remaining {remaining} bytes"
            )));
        }
        let mut data = vec![0u8; data_length];
        buf.read_exact(&mut data)?;

        Ok(Self {
            version,
            system_id,
            key_ids,
            data,
        })
    }
}

#[cfg(test)]
pub(crate) fn build_pssh_box(version: u8, key_ids: &[[u8; 16]], data: &[u8]) -> Vec<u8> {
    let mut body = vec![version, 0, 0, 0];
    body.extend_from_slice(&WIDEVINE_SYSTEM_ID);
    if version > 0 {
        body.extend_from_slice(&(key_ids.len() as u32).to_be_bytes());
        for kid in key_ids {
            body.extend_from_slice(kid);
        }
    }
    body.extend_from_slice(&(data.len() as u32).to_be_bytes());
    body.extend_from_slice(data);

    let mut pssh = ((body.len() + 8) as u32).to_be_bytes().to_vec();
    pssh.extend_from_slice(b"pssh");
    pssh.extend_from_slice(&body);
    pssh
}
