pub mod blob;
pub mod tree;

pub use blob::{Blob, NodeKind};
pub use tree::BlobTree;

#[cfg(test)]
mod tests {
    use super::*;
    use apdu::{command::Apdu, CardTransport, IsoFileDescriptor, IsoFileKind, PinKind, PublicKeyEncoder};
    use error::{CardError, CardResult};
    use std::collections::HashMap;

    /// A minimal in-memory transport standing in for a real card: each
    /// DO tag maps to canned response bytes, keyed the same way GET DATA
    /// keys them.
    struct FakeTransport {
        responses: HashMap<u16, Vec<u8>>,
        fetch_counts: HashMap<u16, u32>,
    }

    impl FakeTransport {
        fn new() -> Self {
            FakeTransport {
                responses: HashMap::new(),
                fetch_counts: HashMap::new(),
            }
        }

        fn with(mut self, tag: u16, bytes: Vec<u8>) -> Self {
            self.responses.insert(tag, bytes);
            self
        }
    }

    impl CardTransport for FakeTransport {
        fn select_file_by_aid(&mut self, aid: &[u8]) -> CardResult<IsoFileDescriptor> {
            Ok(IsoFileDescriptor {
                aid: aid.to_vec(),
                kind: IsoFileKind::Df,
            })
        }

        fn transmit(&mut self, apdu: &Apdu) -> CardResult<Vec<u8>> {
            let tag = if apdu.ins == 0x47 {
                // GET PUBLIC KEY carries the tag as 2-byte data instead
                // of splitting it across P1/P2.
                ((apdu.data[0] as u16) << 8) | apdu.data[1] as u16
            } else {
                ((apdu.p1 as u16) << 8) | apdu.p2 as u16
            };
            *self.fetch_counts.entry(tag).or_insert(0) += 1;
            self.responses
                .get(&tag)
                .cloned()
                .ok_or(CardError::FileNotFound)
        }

        fn pin_cmd(&mut self, _kind: PinKind, _pin_ref: u8, _data: &[u8]) -> CardResult<Option<u8>> {
            unimplemented!("not exercised by blob tree tests")
        }
    }

    struct NoopEncoder;
    impl PublicKeyEncoder for NoopEncoder {
        fn encode_rsa_public_key(&self, modulus: &[u8], exponent: &[u8]) -> CardResult<Vec<u8>> {
            let mut out = b"PEM:".to_vec();
            out.extend_from_slice(modulus);
            out.extend_from_slice(exponent);
            Ok(out)
        }
    }

    #[test]
    fn root_has_every_registry_tag_as_an_immediate_child_in_order() {
        let mut tree = BlobTree::new();
        tree.populate_registry();
        let tags: Vec<u16> = tree.root().children.iter().map(|c| c.tag).collect();
        let expected: Vec<u16> = registry::ROOT_REGISTRY.iter().map(|d| d.tag).collect();
        assert_eq!(tags, expected);
        assert_eq!(tree.root().tag, registry::MF_TAG);
        assert!(tree.root().is_df());
    }

    #[test]
    fn get_child_fetches_a_simple_do_exactly_once() {
        let mut tree = BlobTree::new();
        tree.populate_registry();
        let mut transport = FakeTransport::new().with(0x004F, vec![0xAA, 0xBB]);
        let encoder = NoopEncoder;
        let root = tree.root_path();

        let path = tree
            .get_child(&mut transport, &encoder, &root, 0x004F, false)
            .unwrap();
        assert_eq!(tree.node(&path).unwrap().cached, Some(vec![0xAA, 0xBB]));

        // A second traversal of the same path must not re-hit the card.
        tree.get_child(&mut transport, &encoder, &root, 0x004F, false)
            .unwrap();
        assert_eq!(*transport.fetch_counts.get(&0x004F).unwrap(), 1);
    }

    #[test]
    fn enumerate_splits_a_constructed_do_into_its_children() {
        let mut tree = BlobTree::new();
        tree.populate_registry();
        // 0x006E (Application Related Data) containing 0x4F (len 1) and
        // 0x5F52 (len 2), both primitive.
        let bytes = vec![0x4F, 0x01, 0x99, 0x5F, 0x52, 0x02, 0x10, 0x20];
        let mut transport = FakeTransport::new().with(0x006E, bytes);
        let encoder = NoopEncoder;
        let root = tree.root_path();

        let path = tree
            .get_child(&mut transport, &encoder, &root, 0x006E, false)
            .unwrap();
        tree.enumerate(&mut transport, &encoder, &path, false)
            .unwrap();
        let node = tree.node(&path).unwrap();
        let child_tags: Vec<u16> = node.children.iter().map(|c| c.tag).collect();
        assert_eq!(child_tags, vec![0x004F, 0x5F52]);
        assert_eq!(node.child(0x004F).unwrap().cached, Some(vec![0x99]));
        assert_eq!(node.child(0x5F52).unwrap().cached, Some(vec![0x10, 0x20]));
    }

    #[test]
    fn get_child_reports_file_not_found_for_unknown_tag() {
        let mut tree = BlobTree::new();
        tree.populate_registry();
        let mut transport = FakeTransport::new();
        let encoder = NoopEncoder;
        let root = tree.root_path();
        let err = tree
            .get_child(&mut transport, &encoder, &root, 0x9999, false)
            .unwrap_err();
        assert_eq!(err, CardError::FileNotFound);
    }

    #[test]
    fn fetch_failure_is_sticky_until_a_successful_refetch() {
        let mut tree = BlobTree::new();
        tree.populate_registry();
        let mut transport = FakeTransport::new(); // 0x004F has no canned response.
        let encoder = NoopEncoder;
        let root = tree.root_path();

        let err = tree
            .get_child(&mut transport, &encoder, &root, 0x004F, false)
            .unwrap_err();
        assert_eq!(err, CardError::FileNotFound);
        let path = vec![registry::MF_TAG, 0x004F];
        assert_eq!(tree.node(&path).unwrap().status, Some(CardError::FileNotFound));

        transport.responses.insert(0x004F, vec![0x01]);
        tree.get_child(&mut transport, &encoder, &root, 0x004F, false)
            .unwrap();
        assert_eq!(tree.node(&path).unwrap().status, None);
        assert_eq!(tree.node(&path).unwrap().cached, Some(vec![0x01]));
    }

    #[test]
    fn pem_view_is_synthesized_from_the_key_templates_children() {
        let mut tree = BlobTree::new();
        tree.populate_registry();
        // B600's value, once fetched, is itself a TLV stream holding the
        // 7F49 public key template, which in turn holds 0081 (modulus)
        // and 0082 (exponent).
        let template = vec![
            0x81, 0x02, 0x11, 0x22, // modulus
            0x82, 0x01, 0x03, // exponent
        ];
        let mut key_do = vec![0x7F, 0x49, template.len() as u8];
        key_do.extend(template);

        let mut transport = FakeTransport::new().with(0xB600, key_do);
        let encoder = NoopEncoder;
        let root = tree.root_path();

        let path = tree
            .get_child(&mut transport, &encoder, &root, 0xB601, false)
            .unwrap();
        let pem = tree.node(&path).unwrap().cached.clone().unwrap();
        assert_eq!(pem, b"PEM:\x11\x22\x03".to_vec());
    }
}
