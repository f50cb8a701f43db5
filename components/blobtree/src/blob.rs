use error::CardError;
use registry::DoDescriptor;

/// `DF` (directory-like, constructed) or `EF` (elementary, primitive), in
/// ISO 7816-4 terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Df,
    Ef,
}

/// One node of the virtual filesystem tree.
///
/// Children are owned directly by their parent (an ordered `Vec`, not an
/// intrusive sibling chain): dropping a `Blob` drops its whole subtree
/// and every cached buffer in it for free, and nothing needs a parent
/// back-reference at runtime since the tree is only ever walked starting
/// from the root by path.
#[derive(Debug, Clone)]
pub struct Blob {
    pub tag: u16,
    pub kind: NodeKind,
    pub descriptor: Option<DoDescriptor>,
    pub cached: Option<Vec<u8>>,
    pub status: Option<CardError>,
    pub path: Vec<u16>,
    pub children: Vec<Blob>,
    /// Whether `children` reflects a completed enumeration. Distinct from
    /// `children.is_empty()`: a constructed DO whose value happens to
    /// contain zero TLVs is still "enumerated".
    pub enumerated: bool,
}

impl Blob {
    pub fn new(tag: u16, kind: NodeKind, descriptor: Option<DoDescriptor>, path: Vec<u16>) -> Self {
        Blob {
            tag,
            kind,
            descriptor,
            cached: None,
            status: None,
            path,
            children: Vec::new(),
            enumerated: false,
        }
    }

    pub fn from_descriptor(descriptor: DoDescriptor, parent_path: &[u16]) -> Self {
        let mut path = parent_path.to_vec();
        path.push(descriptor.tag);
        let kind = if descriptor.constructed {
            NodeKind::Df
        } else {
            NodeKind::Ef
        };
        Blob::new(descriptor.tag, kind, Some(descriptor), path)
    }

    pub fn is_df(&self) -> bool {
        matches!(self.kind, NodeKind::Df)
    }

    pub fn len(&self) -> usize {
        self.cached.as_ref().map_or(0, |b| b.len())
    }

    pub fn is_fetched(&self) -> bool {
        self.cached.is_some()
    }

    pub fn child(&self, tag: u16) -> Option<&Blob> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn child_mut(&mut self, tag: u16) -> Option<&mut Blob> {
        self.children.iter_mut().find(|c| c.tag == tag)
    }
}
