//! NDN names: ordered sequences of binary components with a canonical wire
//! encoding and a canonical total order (§3 of the spec).

use crate::error::Error;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Maximum length of an NDN name component, in bytes.
pub const MAX_NAME_COMPONENT_LENGTH: usize = 255;
/// Default maximum number of components the FIB will accept (§4.3).
pub const MAX_NAME_DEPTH: usize = 32;
/// Size, in bytes, of the implicit digest appended to form a full name.
pub const IMPLICIT_DIGEST_LEN: usize = 32;

/// One component of a [`Name`]. Components are compared first by length,
/// then lexicographically on their bytes — the NDN canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameComponent(pub Bytes);

impl NameComponent {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_tlv(&self) -> TlvElement {
        TlvElement::new(tlv::TLV_COMPONENT, self.0.clone())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_COMPONENT {
            return Err(Error::NdnPacket(format!(
                "expected name component TLV type {}, got {}",
                tlv::TLV_COMPONENT,
                element.tlv_type
            )));
        }
        Ok(Self(element.value.clone()))
    }

    /// The next component in canonical order: the value treated as a
    /// big-endian number, incremented by one, overflowing by prepending a
    /// zero byte. An empty component's successor is a single zero byte.
    pub fn successor(&self) -> Self {
        if self.0.is_empty() {
            return Self(Bytes::from_static(&[0u8]));
        }
        let mut bytes = self.0.to_vec();
        let mut i = bytes.len();
        loop {
            if i == 0 {
                bytes.insert(0, 0);
                break;
            }
            i -= 1;
            if bytes[i] == 0xff {
                bytes[i] = 0;
                if i == 0 {
                    bytes.insert(0, 0);
                    break;
                }
                continue;
            } else {
                bytes[i] += 1;
                break;
            }
        }
        Self(Bytes::from(bytes))
    }
}

impl PartialOrd for NameComponent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NameComponent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printable = self.0.iter().all(|&b| b.is_ascii_graphic() || b == b' ');
        if printable {
            write!(f, "{}", String::from_utf8_lossy(&self.0))
        } else {
            write!(f, "0x")?;
            for &b in &self.0 {
                write!(f, "{:02x}", b)?;
            }
            Ok(())
        }
    }
}

/// An ordered sequence of [`NameComponent`]s.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    pub fn new() -> Self {
        Self { components: Vec::new() }
    }

    pub fn from_components(components: Vec<NameComponent>) -> Self {
        Self { components }
    }

    pub fn from_str(s: &str) -> Self {
        let components = s
            .split('/')
            .filter(|comp| !comp.is_empty())
            .map(|comp| NameComponent::new(comp.as_bytes().to_vec()))
            .collect();
        Self { components }
    }

    pub fn push(&mut self, component: NameComponent) -> &mut Self {
        self.components.push(component);
        self
    }

    pub fn append(mut self, component: NameComponent) -> Self {
        self.components.push(component);
        self
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[NameComponent] {
        &self.components
    }

    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    /// The first `len` components (or the whole name if `len` exceeds it).
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            components: self.components.iter().take(len).cloned().collect(),
        }
    }

    /// All but the last `n` components, as ndn-cxx's `getPrefix(-n)`.
    pub fn drop_last(&self, n: usize) -> Self {
        let keep = self.components.len().saturating_sub(n);
        self.prefix(keep)
    }

    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    /// The smallest name that is strictly greater than every name having
    /// `self` as a prefix; used to bound a canonical-order range scan
    /// (CS `find`, §4.5).
    pub fn successor(&self) -> Self {
        if self.components.is_empty() {
            return Self { components: vec![NameComponent::new(Bytes::from_static(&[0u8]))] };
        }
        let mut components = self.components.clone();
        let last = components.pop().unwrap();
        components.push(last.successor());
        Self { components }
    }

    pub fn to_tlv(&self) -> TlvElement {
        let mut buf = BytesMut::new();
        for component in &self.components {
            component.to_tlv().encode(&mut buf);
        }
        TlvElement::new(tlv::TLV_NAME, buf.freeze())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_NAME {
            return Err(Error::NdnPacket(format!(
                "expected name TLV type {}, got {}",
                tlv::TLV_NAME,
                element.tlv_type
            )));
        }

        let mut components = Vec::new();
        let mut buf = element.value.clone();
        while buf.has_remaining() {
            let e = TlvElement::decode(&mut buf)?;
            components.push(NameComponent::from_tlv(&e)?);
        }
        Ok(Self { components })
    }

    pub fn wire_encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.to_tlv().encode(&mut buf);
        buf.freeze()
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    /// Canonical NDN ordering: component-by-component; a strict prefix
    /// sorts before any name it is a prefix of.
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.components.iter().zip(other.components.iter()) {
            let ord = a.cmp(b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.components.len().cmp(&other.components.len())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

/// A [`Name`] plus the 32-byte implicit digest of a Data packet's encoded
/// form — the identity under which the Content Store orders entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullName {
    pub name: Name,
    pub digest: [u8; IMPLICIT_DIGEST_LEN],
}

impl FullName {
    pub fn new(name: Name, digest: [u8; IMPLICIT_DIGEST_LEN]) -> Self {
        Self { name, digest }
    }

    /// The name portion as a [`Name`] with the digest appended as a final
    /// component, for canonical-order comparisons against a plain `Name`.
    pub fn as_name(&self) -> Name {
        self.name.clone().append(NameComponent::new(Bytes::copy_from_slice(&self.digest)))
    }
}

impl PartialOrd for FullName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FullName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_name().cmp(&other.as_name())
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/sha256digest={}", self.name, hex(&self.digest))
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays() {
        let name = Name::from_str("/a/b/c");
        assert_eq!(name.len(), 3);
        assert_eq!(name.to_string(), "/a/b/c");
        assert_eq!(Name::new().to_string(), "/");
    }

    #[test]
    fn prefix_and_order() {
        let root = Name::new();
        let a = Name::from_str("/a");
        let ab = Name::from_str("/a/b");
        assert!(root.is_prefix_of(&a));
        assert!(a.is_prefix_of(&ab));
        assert!(!ab.is_prefix_of(&a));
        assert!(a < ab);
        assert!(root < a);
    }

    #[test]
    fn successor_bounds_prefix_range() {
        let name = Name::from_str("/a");
        let succ = name.successor();
        let child = Name::from_str("/a/b");
        let sibling = Name::from_str("/b");
        assert!(name <= child);
        assert!(child < succ);
        assert!(succ <= sibling);
    }

    #[test]
    fn wire_round_trips() {
        let name = Name::from_str("/hello/world/42");
        let tlv = name.to_tlv();
        let decoded = Name::from_tlv(&tlv).unwrap();
        assert_eq!(name, decoded);
    }
}
