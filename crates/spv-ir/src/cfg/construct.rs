/// Kind of a structured control-flow construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructKind {
    Selection,
    Continue,
    Loop,
    Case,
}

/// A structured region of the CFG, delimited by a header and an exit.
///
/// Built while registering blocks that carry `OpSelectionMerge` /
/// `OpLoopMerge` or terminate in `OpSwitch`. `corresponding` links a Loop
/// to its Continue construct (and back), and a Case to its sibling Cases.
#[derive(Debug, Clone)]
pub struct Construct {
    pub kind: ConstructKind,
    /// Block id of the construct's entry (header / continue target / case
    /// target).
    pub entry: u32,
    /// Exit block id: the merge block, or for Continue constructs the
    /// back-edge block, which is only known once back-edges are detected.
    pub exit: Option<u32>,
    /// Indices of corresponding constructs within the owning CFG.
    pub corresponding: Vec<usize>,
}

impl Construct {
    #[must_use]
    pub fn new(kind: ConstructKind, entry: u32, exit: Option<u32>) -> Self {
        Self {
            kind,
            entry,
            exit,
            corresponding: Vec::new(),
        }
    }
}
