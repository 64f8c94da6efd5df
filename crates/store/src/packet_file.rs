// SPDX-License-Identifier: MIT

//! Packet file format: a delimiter line, a single JSON meta object, a
//! delimiter line, then free-form body text (spec §6.1).

use agentbus_core::{BusError, PacketMeta};

const DELIMITER: &str = "---";

/// A packet as read from (or about to be written to) disk.
#[derive(Debug, Clone)]
pub struct Packet {
    pub meta: PacketMeta,
    pub body: String,
}

impl Packet {
    pub fn new(meta: PacketMeta, body: impl Into<String>) -> Self {
        Self {
            meta,
            body: body.into(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, BusError> {
        let meta_json = serde_json::to_string_pretty(&self.meta)?;
        let mut out = String::with_capacity(meta_json.len() + self.body.len() + 16);
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(&meta_json);
        out.push('\n');
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(&self.body);
        Ok(out.into_bytes())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BusError> {
        let text = String::from_utf8_lossy(bytes);
        let mut parts = text.splitn(2, '\n');
        let first_line = parts.next().unwrap_or_default();
        if first_line.trim() != DELIMITER {
            return Err(BusError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "packet file missing leading delimiter",
            )));
        }
        let rest = parts.next().unwrap_or_default();
        let Some((meta_text, body)) = rest.split_once(&format!("\n{DELIMITER}\n")) else {
            return Err(BusError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "packet file missing body delimiter",
            )));
        };
        let meta: PacketMeta = serde_json::from_str(meta_text)?;
        Ok(Packet {
            meta,
            body: body.to_string(),
        })
    }

    /// Append a body fragment, used by `update` (spec §4.1).
    pub fn append_body(&mut self, fragment: &str) {
        if !self.body.is_empty() {
            self.body.push('\n');
        }
        self.body.push_str(fragment);
    }
}
