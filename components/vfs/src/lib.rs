//! The virtual filesystem surface a PKCS#15-style consumer actually
//! calls: `select_file`, `list_files`, `read_binary`, `write_binary`,
//! plus the tag-addressed `get_data`/`put_data` pair, all mapped onto
//! the lazily-materialized [`blobtree::BlobTree`].

use apdu::{CardTransport, PublicKeyEncoder};
use blobtree::{BlobTree, NodeKind};
use error::{CardError, CardResult};
use sys::push_tag;

/// What kind of path a caller hands `select_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectPath {
    /// Select the OpenPGP application itself by AID; delegated straight
    /// to the ISO 7816-4 collaborator, bypassing the blob tree.
    Aid(Vec<u8>),
    /// A sequence of 2-byte DO tags walked from the Master File. A
    /// leading `0x3F00` (MF) segment is stripped if present.
    Hierarchical(Vec<u16>),
}

/// A copy of the selected node's identity, safe to hold onto after the
/// tree has moved on to a different selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub id: u16,
    pub kind: NodeKind,
    pub path: Vec<u16>,
}

/// The filesystem surface. Holds the blob tree and the "current
/// directory" pointer a sequence of `select_file` calls walks.
pub struct Vfs {
    tree: BlobTree,
    current: Option<Vec<u16>>,
}

impl Vfs {
    pub fn new(tree: BlobTree) -> Self {
        Vfs {
            tree,
            current: None,
        }
    }

    pub fn tree(&self) -> &BlobTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut BlobTree {
        &mut self.tree
    }

    /// Walks `path`, lazily fetching and enumerating along the way. On
    /// failure the current-node pointer becomes undefined; the next
    /// `select_file` must start over from MF.
    pub fn select_file<T: CardTransport, E: PublicKeyEncoder>(
        &mut self,
        transport: &mut T,
        encoder: &E,
        path: &SelectPath,
        extended: bool,
    ) -> CardResult<FileDescriptor> {
        match path {
            SelectPath::Aid(aid) => {
                let iso = transport.select_file_by_aid(aid)?;
                self.current = None;
                let kind = match iso.kind {
                    apdu::IsoFileKind::Df => NodeKind::Df,
                    apdu::IsoFileKind::Ef => NodeKind::Ef,
                };
                Ok(FileDescriptor {
                    id: 0,
                    kind,
                    path: Vec::new(),
                })
            }
            SelectPath::Hierarchical(tags) => {
                let mut segments = tags.as_slice();
                if segments.first() == Some(&registry::MF_TAG) {
                    segments = &segments[1..];
                }
                let mut cur_path = self.tree.root_path();
                for &tag in segments {
                    match self.tree.get_child(transport, encoder, &cur_path, tag, extended) {
                        Ok(child_path) => cur_path = child_path,
                        Err(e) => {
                            self.current = None;
                            return Err(e);
                        }
                    }
                }
                self.current = Some(cur_path.clone());
                let node = self.tree.node(&cur_path).expect("just resolved above");
                Ok(FileDescriptor {
                    id: node.tag,
                    kind: node.kind,
                    path: cur_path,
                })
            }
        }
    }

    /// Enumerates the current node's children and writes each tag as
    /// two big-endian bytes into `out`, stopping when it's full. Returns
    /// the number of bytes written.
    pub fn list_files<T: CardTransport, E: PublicKeyEncoder>(
        &mut self,
        transport: &mut T,
        encoder: &E,
        extended: bool,
        out: &mut [u8],
    ) -> CardResult<usize> {
        let path = self.current.clone().ok_or(CardError::InvalidArguments)?;
        if !self
            .tree
            .node(&path)
            .ok_or(CardError::FileNotFound)?
            .is_df()
        {
            return Err(CardError::InvalidArguments);
        }
        self.tree.enumerate(transport, encoder, &path, extended)?;
        let node = self.tree.node(&path).expect("just enumerated");

        let mut written = 0usize;
        let mut buf = Vec::new();
        for child in &node.children {
            if written + 2 > out.len() {
                break;
            }
            buf.clear();
            push_tag(&mut buf, child.tag);
            out[written..written + 2].copy_from_slice(&buf);
            written += 2;
        }
        Ok(written)
    }

    /// Reads up to `count` bytes starting at `offset` from the current
    /// node, which must be an `EF`.
    pub fn read_binary<T: CardTransport, E: PublicKeyEncoder>(
        &mut self,
        transport: &mut T,
        encoder: &E,
        extended: bool,
        offset: usize,
        count: usize,
        out: &mut [u8],
    ) -> CardResult<usize> {
        let path = self.current.clone().ok_or(CardError::InvalidArguments)?;
        if self
            .tree
            .node(&path)
            .ok_or(CardError::FileNotFound)?
            .is_df()
        {
            return Err(CardError::InvalidArguments);
        }
        self.tree.fetch(transport, encoder, &path, extended)?;
        let node = self.tree.node(&path).expect("just fetched");
        let bytes = node.cached.as_ref().expect("fetch guarantees this");

        if offset > bytes.len() {
            return Err(CardError::IncorrectParameters);
        }
        let available = bytes.len() - offset;
        let n = count.min(available).min(out.len());
        out[..n].copy_from_slice(&bytes[offset..offset + n]);
        Ok(n)
    }

    /// Always fails: the core refuses write operations.
    pub fn write_binary(&mut self, _offset: usize, _data: &[u8]) -> CardResult<usize> {
        Err(CardError::NotSupported)
    }

    /// Reads a DO's full value by tag, independent of the current
    /// selection.
    pub fn get_data<T: CardTransport, E: PublicKeyEncoder>(
        &mut self,
        transport: &mut T,
        encoder: &E,
        extended: bool,
        tag: u16,
        out: &mut [u8],
    ) -> CardResult<usize> {
        let root = self.tree.root_path();
        let path = self.tree.get_child(transport, encoder, &root, tag, extended)?;
        let bytes = self
            .tree
            .node(&path)
            .and_then(|b| b.cached.as_ref())
            .expect("get_child guarantees cached bytes on success");
        let n = bytes.len().min(out.len());
        out[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }

    /// Always fails: the core refuses to personalize/write DOs.
    pub fn put_data(&mut self, _tag: u16, _data: &[u8]) -> CardResult<()> {
        Err(CardError::NotSupported)
    }
}
