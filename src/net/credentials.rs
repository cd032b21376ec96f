//! Candidate network credentials.

use core::net::Ipv4Addr;

use crate::error::{CredentialError, LinkError};

/// Number of candidate slots held by the connector.
pub const MAX_CANDIDATES: usize = 2;

pub type Ssid = heapless::String<32>;
pub type Secret = heapless::String<64>;
pub type Identity = heapless::String<64>;

/// One network the device may join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkCredential {
    /// Direct association: WPA2-Personal, or an open network when the
    /// password is empty.
    Open {
        ssid: Ssid,
        password: Secret,
        endpoint: Option<Ipv4Addr>,
    },
    /// WPA2-Enterprise (PEAP/TTLS) with an identity and password.
    Enterprise {
        ssid: Ssid,
        identity: Identity,
        password: Secret,
        endpoint: Option<Ipv4Addr>,
    },
}

fn copy_into<const N: usize>(
    value: &str,
    err: CredentialError,
) -> Result<heapless::String<N>, CredentialError> {
    let mut s = heapless::String::new();
    s.push_str(value).map_err(|()| err)?;
    Ok(s)
}

impl NetworkCredential {
    pub fn open(ssid: &str, password: &str) -> Result<Self, CredentialError> {
        Ok(Self::Open {
            ssid: copy_into(ssid, CredentialError::SsidTooLong)?,
            password: copy_into(password, CredentialError::SecretTooLong)?,
            endpoint: None,
        })
    }

    pub fn enterprise(ssid: &str, identity: &str, password: &str) -> Result<Self, CredentialError> {
        Ok(Self::Enterprise {
            ssid: copy_into(ssid, CredentialError::SsidTooLong)?,
            identity: copy_into(identity, CredentialError::IdentityTooLong)?,
            password: copy_into(password, CredentialError::SecretTooLong)?,
            endpoint: None,
        })
    }

    /// Attach the broker address known to live on this network.
    #[must_use]
    pub fn with_endpoint(mut self, addr: Ipv4Addr) -> Self {
        match &mut self {
            Self::Open { endpoint, .. } | Self::Enterprise { endpoint, .. } => {
                *endpoint = Some(addr);
            }
        }
        self
    }

    pub fn ssid(&self) -> &str {
        match self {
            Self::Open { ssid, .. } | Self::Enterprise { ssid, .. } => ssid.as_str(),
        }
    }

    pub fn endpoint(&self) -> Option<Ipv4Addr> {
        match self {
            Self::Open { endpoint, .. } | Self::Enterprise { endpoint, .. } => *endpoint,
        }
    }

    pub fn is_enterprise(&self) -> bool {
        matches!(self, Self::Enterprise { .. })
    }
}

/// Fixed, ordered table of candidate slots.
#[derive(Debug, Clone, Default)]
pub struct CandidateTable {
    slots: [Option<NetworkCredential>; MAX_CANDIDATES],
}

impl CandidateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `credential` at `slot`, replacing whatever was there.
    pub fn register(&mut self, slot: usize, credential: NetworkCredential) -> Result<(), LinkError> {
        let entry = self.slots.get_mut(slot).ok_or(LinkError::SlotOutOfRange)?;
        *entry = Some(credential);
        Ok(())
    }

    pub fn get(&self, slot: usize) -> Option<&NetworkCredential> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Slot count, including empty slots.
    pub const fn capacity(&self) -> usize {
        MAX_CANDIDATES
    }

    /// Occupied slots in round-robin order beginning at `start`.
    pub fn rotation(&self, start: usize) -> impl Iterator<Item = (usize, &NetworkCredential)> + '_ {
        let n = self.slots.len();
        (0..n)
            .map(move |i| (start + i) % n)
            .filter_map(|idx| self.slots[idx].as_ref().map(|c| (idx, c)))
    }
}
