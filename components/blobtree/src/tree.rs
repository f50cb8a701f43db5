use crate::blob::{Blob, NodeKind};
use apdu::{command, CardTransport, PublicKeyEncoder};
use error::{CardError, CardResult};
use registry::{self, DoKind, MF_TAG, TAG_EXPONENT, TAG_MODULUS, TAG_PUBLIC_KEY_TEMPLATE};

/// Response buffer size requested from the card under short-APDU mode.
const SHORT_BUF: usize = 256;
/// Response buffer size requested from the card under extended-APDU
/// mode.
const EXTENDED_BUF: usize = 2048;

/// The virtual filesystem tree: one `Blob` rooted at the Master File
/// (tag `0x3F00`), with every DO reachable as a descendant path of
/// 16-bit tags.
pub struct BlobTree {
    root: Blob,
}

impl BlobTree {
    /// Creates a fresh tree with only the MF, no children yet.
    pub fn new() -> Self {
        BlobTree {
            root: Blob::new(MF_TAG, NodeKind::Df, None, vec![MF_TAG]),
        }
    }

    /// Session-init step: eagerly creates a blob for every entry in the
    /// static DO registry as a child of MF, in registry order.
    pub fn populate_registry(&mut self) {
        self.root.children = registry::ROOT_REGISTRY
            .iter()
            .map(|d| Blob::from_descriptor(*d, &[MF_TAG]))
            .collect();
        self.root.enumerated = true;
    }

    pub fn root(&self) -> &Blob {
        &self.root
    }

    pub fn root_path(&self) -> Vec<u16> {
        vec![self.root.tag]
    }

    /// Looks up a node by absolute path (first element must be the MF
    /// tag).
    pub fn node(&self, path: &[u16]) -> Option<&Blob> {
        let (first, rest) = path.split_first()?;
        if *first != self.root.tag {
            return None;
        }
        let mut cur = &self.root;
        for tag in rest {
            cur = cur.child(*tag)?;
        }
        Some(cur)
    }

    fn node_mut(&mut self, path: &[u16]) -> Option<&mut Blob> {
        let (first, rest) = path.split_first()?;
        if *first != self.root.tag {
            return None;
        }
        let mut cur = &mut self.root;
        for tag in rest {
            cur = cur.child_mut(*tag)?;
        }
        Some(cur)
    }

    /// Ensures `path`'s node has cached bytes, fetching them through the
    /// transport (or synthesizing a PEM view) if not.
    pub fn fetch<T: CardTransport, E: PublicKeyEncoder>(
        &mut self,
        transport: &mut T,
        encoder: &E,
        path: &[u16],
        extended: bool,
    ) -> CardResult<()> {
        let node = self.node_mut(path).ok_or(CardError::FileNotFound)?;
        if node.cached.is_some() {
            return Ok(());
        }
        let descriptor = match node.descriptor {
            Some(d) => d,
            None => return Err(node.status.unwrap_or(CardError::FileNotFound)),
        };
        let tag = node.tag;
        let buf_len = if extended { EXTENDED_BUF } else { SHORT_BUF };

        match descriptor.kind {
            DoKind::StandardGetPut => {
                let apdu = command::get_data(tag, buf_len, extended);
                self.transmit_and_store(transport, path, &apdu)
            }
            DoKind::PublicKey => {
                let apdu = command::get_public_key(tag, buf_len, extended);
                self.transmit_and_store(transport, path, &apdu)
            }
            DoKind::PublicKeyPem => {
                log::trace!("synthesizing PEM view for tag {:04X}", tag);
                match self.synthesize_pem(transport, encoder, path, extended) {
                    Ok(bytes) => {
                        let node = self.node_mut(path).expect("path checked above");
                        node.cached = Some(bytes);
                        node.status = None;
                        Ok(())
                    }
                    Err(e) => {
                        let node = self.node_mut(path).expect("path checked above");
                        node.status = Some(e);
                        Err(e)
                    }
                }
            }
        }
    }

    fn transmit_and_store<T: CardTransport>(
        &mut self,
        transport: &mut T,
        path: &[u16],
        apdu: &command::Apdu,
    ) -> CardResult<()> {
        match transport.transmit(apdu) {
            Ok(bytes) => {
                log::debug!(
                    "fetched {} bytes for DO at depth {}",
                    bytes.len(),
                    path.len()
                );
                let node = self.node_mut(path).expect("path checked by caller");
                node.cached = Some(bytes);
                node.status = None;
                Ok(())
            }
            Err(e) => {
                log::warn!("fetch failed for DO path {:?}: {}", path, e);
                let node = self.node_mut(path).expect("path checked by caller");
                node.status = Some(e);
                Err(e)
            }
        }
    }

    /// Ensures `path`'s node (which must be a DF) has its children
    /// materialized. Idempotent.
    pub fn enumerate<T: CardTransport, E: PublicKeyEncoder>(
        &mut self,
        transport: &mut T,
        encoder: &E,
        path: &[u16],
        extended: bool,
    ) -> CardResult<()> {
        if self.node(path).ok_or(CardError::FileNotFound)?.enumerated {
            return Ok(());
        }
        self.fetch(transport, encoder, path, extended)?;
        let bytes = self
            .node(path)
            .expect("fetch above guarantees the node exists")
            .cached
            .clone()
            .expect("fetch above guarantees cached bytes on success");

        let mut children = Vec::new();
        for item in tlv::TlvIter::new(&bytes) {
            let tlv = item?;
            if tlv.header.tag > u16::MAX as u32 {
                return Err(CardError::ObjectNotValid);
            }
            let tag = tlv.header.tag as u16;
            let descriptor = registry::find(tag).copied();
            let kind = if tlv.header.constructed {
                NodeKind::Df
            } else {
                NodeKind::Ef
            };
            let mut child_path = path.to_vec();
            child_path.push(tag);
            let mut child = Blob::new(tag, kind, descriptor, child_path);
            child.cached = Some(tlv.value.to_vec());
            children.push(child);
        }

        let node = self.node_mut(path).expect("checked above");
        node.children = children;
        node.enumerated = true;
        Ok(())
    }

    /// Ensures `parent_path` is enumerated, finds its child with `tag`,
    /// fetches it, and returns the child's absolute path.
    pub fn get_child<T: CardTransport, E: PublicKeyEncoder>(
        &mut self,
        transport: &mut T,
        encoder: &E,
        parent_path: &[u16],
        tag: u16,
        extended: bool,
    ) -> CardResult<Vec<u16>> {
        self.enumerate(transport, encoder, parent_path, extended)?;
        let parent = self.node(parent_path).ok_or(CardError::FileNotFound)?;
        if parent.child(tag).is_none() {
            return Err(CardError::FileNotFound);
        }
        let mut child_path = parent_path.to_vec();
        child_path.push(tag);
        self.fetch(transport, encoder, &child_path, extended)?;
        Ok(child_path)
    }

    /// Resolves `B601`/`B801`/`A401` by descending into the real key
    /// DO's public key template and handing the modulus/exponent to the
    /// public-key encoder collaborator.
    fn synthesize_pem<T: CardTransport, E: PublicKeyEncoder>(
        &mut self,
        transport: &mut T,
        encoder: &E,
        path: &[u16],
        extended: bool,
    ) -> CardResult<Vec<u8>> {
        let pem_tag = self.node(path).ok_or(CardError::FileNotFound)?.tag;
        let real_tag = registry::real_key_tag(pem_tag);

        let root_path = self.root_path();
        let key_path = self.get_child(transport, encoder, &root_path, real_tag, extended)?;
        let template_path =
            self.get_child(transport, encoder, &key_path, TAG_PUBLIC_KEY_TEMPLATE, extended)?;
        let modulus_path =
            self.get_child(transport, encoder, &template_path, TAG_MODULUS, extended)?;
        let exponent_path =
            self.get_child(transport, encoder, &template_path, TAG_EXPONENT, extended)?;

        let modulus = self
            .node(&modulus_path)
            .and_then(|b| b.cached.as_ref())
            .ok_or(CardError::ObjectNotValid)?
            .clone();
        let exponent = self
            .node(&exponent_path)
            .and_then(|b| b.cached.as_ref())
            .ok_or(CardError::ObjectNotValid)?
            .clone();

        encoder.encode_rsa_public_key(&modulus, &exponent)
    }
}

impl Default for BlobTree {
    fn default() -> Self {
        Self::new()
    }
}
